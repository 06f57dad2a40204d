//! Ledger-consistency checks for the FundMe contract.
//!
//! [`LedgerConsistencyChecker`] drives fund and withdraw calls through the
//! [`FundingContract`] trait and asserts that the contract's balance matches
//! what its funders are credited with, that a withdrawal conserves value net
//! of gas, and that only the owner can withdraw. [`Suite`] runs the standard
//! cases against a fresh [`Fixture`] deployment each, and [`LocalChain`] is
//! the fixture backed by a local Soroban environment.

pub mod checker;
pub mod config;
pub mod contract;
pub mod local;
pub mod observability;
pub mod suite;


pub use checker::{CheckResult, CheckerConfig, LedgerConsistencyChecker, Violation, WithdrawOutcome};
pub use config::{ChainConstants, GasSchedule, NetworkConfig};
pub use contract::{CallError, CallResult, FundingContract, Receipt, WithdrawMode};
pub use local::{LocalChain, LocalFixture};
pub use suite::{
    staging_scenarios, unit_scenarios, CaseOutcome, CaseStatus, Deployment, Fixture, Roles,
    Scenario, Stage, Suite, SuiteReport,
};
