//! Scripted fund/withdraw sequences with ledger assertions after every step.

use std::fmt::Debug;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SEND_VALUE;
use crate::contract::{CallError, FundingContract, Receipt, WithdrawMode};

pub type CheckResult<T = ()> = Result<T, Violation>;

/// An assertion about the contract's ledger that did not hold.
#[derive(Debug, Error)]
pub enum Violation {
    #[error("{operation}: expected `{expected}`, but the call succeeded")]
    UnexpectedSuccess {
        operation: &'static str,
        expected: CallError,
    },

    #[error("{operation}: expected `{expected}`, got `{actual}`")]
    WrongFailure {
        operation: &'static str,
        expected: CallError,
        actual: CallError,
    },

    #[error("{operation} failed")]
    CallFailed {
        operation: &'static str,
        #[source]
        source: CallError,
    },

    #[error("{what}: expected {expected}, found {actual}")]
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error(
        "value not conserved: {starting_contract} + {starting_owner} != {ending_owner} + {gas_cost}"
    )]
    NotConserved {
        starting_contract: i128,
        starting_owner: i128,
        ending_owner: i128,
        gas_cost: i128,
    },

    #[error("funder list not cleared: index 0 still resolves to {0}")]
    FundersNotCleared(String),

    #[error("fixture setup failed")]
    Setup(#[source] CallError),
}

impl Violation {
    fn mismatch(what: impl Into<String>, expected: impl Debug, actual: impl Debug) -> Self {
        Self::Mismatch {
            what: what.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

fn call_failed(operation: &'static str) -> impl FnOnce(CallError) -> Violation {
    move |source| Violation::CallFailed { operation, source }
}

fn ensure_eq<T: PartialEq + Debug>(what: impl Into<String>, expected: T, actual: T) -> CheckResult {
    if expected == actual {
        Ok(())
    } else {
        Err(Violation::mismatch(what, expected, actual))
    }
}

fn expect_failure<T>(
    operation: &'static str,
    expected: CallError,
    result: Result<T, CallError>,
) -> CheckResult {
    match result {
        Ok(_) => Err(Violation::UnexpectedSuccess {
            operation,
            expected,
        }),
        Err(actual) if actual == expected => Ok(()),
        Err(actual) => Err(Violation::WrongFailure {
            operation,
            expected,
            actual,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Amount each funder contributes in multi-funder scenarios.
    pub send_value: i128,
    /// Amount the underfunded check sends.
    pub underfunded_amount: i128,
    pub withdraw_mode: WithdrawMode,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            send_value: SEND_VALUE,
            underfunded_amount: 0,
            withdraw_mode: WithdrawMode::Standard,
        }
    }
}

/// Balances of one withdrawal, as the conservation check saw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawOutcome {
    pub receipt: Receipt,
    pub starting_contract_balance: i128,
    pub starting_owner_balance: i128,
    pub ending_owner_balance: i128,
}

/// Everything a rejected call must leave untouched.
#[derive(Debug, Clone, PartialEq)]
struct LedgerSnapshot<A> {
    contract_balance: i128,
    funders: Vec<(A, i128)>,
    subject_funded: i128,
}

/// Drives a [`FundingContract`] through fund/withdraw sequences and checks
/// that value is conserved and only the owner can withdraw.
pub struct LedgerConsistencyChecker<C: FundingContract> {
    contract: C,
    deployer: C::Account,
    config: CheckerConfig,
}

impl<C: FundingContract> LedgerConsistencyChecker<C> {
    /// `deployer` sends every call that does not name its own sender.
    pub fn new(contract: C, deployer: C::Account) -> Self {
        Self {
            contract,
            deployer,
            config: CheckerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CheckerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_withdraw_mode(&mut self, mode: WithdrawMode) {
        self.config.withdraw_mode = mode;
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn contract_mut(&mut self) -> &mut C {
        &mut self.contract
    }

    /// The contract reports `expected` as its price feed.
    pub fn verify_price_feed(&self, expected: &C::Account) -> CheckResult {
        let actual = self
            .contract
            .price_feed()
            .map_err(call_failed("price_feed"))?;
        ensure_eq("price feed", expected, &actual)
    }

    /// Funding below the minimum reverts and changes nothing.
    pub fn verify_rejects_underfunded(&mut self) -> CheckResult {
        let sender = self.deployer.clone();
        let amount = self.config.underfunded_amount;
        let before = self.snapshot(&sender)?;

        debug!(amount, "funding below the minimum");
        let result = self.contract.fund(&sender, amount);
        expect_failure("fund", CallError::InsufficientContribution, result)?;

        let after = self.snapshot(&sender)?;
        ensure_eq("ledger after rejected fund", before, after)
    }

    /// Funding succeeds, credits `sender` with exactly `amount` and lists it.
    pub fn verify_fund_records_contribution(
        &mut self,
        amount: i128,
        sender: &C::Account,
    ) -> CheckResult<Receipt> {
        let contract = self.contract.address();
        let funded_before = self.amount_funded(sender)?;
        let balance_before = self.balance_of(&contract)?;

        let receipt = self
            .contract
            .fund(sender, amount)
            .map_err(call_failed("fund"))?;
        debug!(?sender, amount, gas_used = receipt.gas_used, "funded");

        ensure_eq(
            format!("amount funded by {sender:?}"),
            funded_before + amount,
            self.amount_funded(sender)?,
        )?;
        ensure_eq(
            "contract balance after fund",
            balance_before + amount,
            self.balance_of(&contract)?,
        )?;

        let funders = self.funders()?;
        if !funders.contains(sender) {
            return Err(Violation::mismatch("funder list", sender, funders));
        }
        Ok(receipt)
    }

    /// The funder list holds `expected` at `index`.
    pub fn verify_funder_at(&self, index: u32, expected: &C::Account) -> CheckResult {
        let actual = self
            .contract
            .funder_at(index)
            .map_err(call_failed("funder_at"))?;
        ensure_eq(format!("funder at {index}"), expected, &actual)
    }

    /// The contract holds exactly what its funders are credited with.
    pub fn verify_ledger_balanced(&self) -> CheckResult {
        let credited: i128 = self.funder_ledger()?.iter().map(|(_, amount)| amount).sum();
        let held = self.balance_of(&self.contract.address())?;
        ensure_eq("contract balance vs amounts funded", credited, held)
    }

    /// A withdrawal by `non_owner` reverts through either entry point and
    /// leaves the ledger untouched.
    pub fn verify_owner_only_withdraw(&mut self, non_owner: &C::Account) -> CheckResult {
        let before = self.snapshot(non_owner)?;

        for mode in [WithdrawMode::Standard, WithdrawMode::Cheaper] {
            let result = self.contract.withdraw_with(mode, non_owner);
            expect_failure(mode.label(), CallError::Unauthorized, result)?;
        }

        let after = self.snapshot(non_owner)?;
        ensure_eq("ledger after rejected withdraw", before, after)
    }

    /// The owner withdraws everything funded so far; value is conserved net
    /// of gas and every funder is reset.
    pub fn verify_single_funder_withdraw(
        &mut self,
        owner: &C::Account,
    ) -> CheckResult<WithdrawOutcome> {
        self.withdraw_and_verify(owner)
    }

    /// Funds from every account in `funders`, then withdraws as `owner` and
    /// checks the same post-conditions as a single-funder withdrawal.
    pub fn verify_multi_funder_withdraw(
        &mut self,
        owner: &C::Account,
        funders: &[C::Account],
    ) -> CheckResult<WithdrawOutcome> {
        let amount = self.config.send_value;
        for funder in funders {
            self.verify_fund_records_contribution(amount, funder)?;
        }
        self.verify_ledger_balanced()?;

        self.withdraw_and_verify(owner)
    }

    /// Fund once and withdraw; the contract ends empty.
    pub fn verify_fund_then_withdraw(
        &mut self,
        sender: &C::Account,
        owner: &C::Account,
        amount: i128,
    ) -> CheckResult {
        self.contract
            .fund(sender, amount)
            .map_err(call_failed("fund"))?;
        let mode = self.config.withdraw_mode;
        self.contract
            .withdraw_with(mode, owner)
            .map_err(call_failed(mode.label()))?;

        let ending = self.balance_of(&self.contract.address())?;
        ensure_eq("ending contract balance", 0, ending)
    }

    fn withdraw_and_verify(&mut self, owner: &C::Account) -> CheckResult<WithdrawOutcome> {
        let mode = self.config.withdraw_mode;
        let contract = self.contract.address();
        let prior_funders = self.funders()?;

        let starting_contract_balance = self.balance_of(&contract)?;
        let starting_owner_balance = self.balance_of(owner)?;

        let receipt = self
            .contract
            .withdraw_with(mode, owner)
            .map_err(call_failed(mode.label()))?;
        let gas_cost = receipt.cost();

        let ending_contract_balance = self.balance_of(&contract)?;
        let ending_owner_balance = self.balance_of(owner)?;
        info!(
            mode = mode.label(),
            funders = prior_funders.len(),
            starting_contract_balance,
            gas_cost,
            "withdrawn"
        );

        ensure_eq("ending contract balance", 0, ending_contract_balance)?;
        if starting_contract_balance + starting_owner_balance != ending_owner_balance + gas_cost {
            return Err(Violation::NotConserved {
                starting_contract: starting_contract_balance,
                starting_owner: starting_owner_balance,
                ending_owner: ending_owner_balance,
                gas_cost,
            });
        }

        self.verify_funders_cleared(&prior_funders)?;

        Ok(WithdrawOutcome {
            receipt,
            starting_contract_balance,
            starting_owner_balance,
            ending_owner_balance,
        })
    }

    fn verify_funders_cleared(&self, prior_funders: &[C::Account]) -> CheckResult {
        for funder in prior_funders {
            ensure_eq(
                format!("amount funded by {funder:?} after withdraw"),
                0,
                self.amount_funded(funder)?,
            )?;
        }

        match self.contract.funder_at(0) {
            Ok(funder) => Err(Violation::FundersNotCleared(format!("{funder:?}"))),
            Err(CallError::IndexOutOfRange) => Ok(()),
            Err(actual) => Err(Violation::WrongFailure {
                operation: "funder_at",
                expected: CallError::IndexOutOfRange,
                actual,
            }),
        }
    }

    /// Funders in list order, read until the first out-of-range index.
    fn funders(&self) -> CheckResult<Vec<C::Account>> {
        let mut funders = Vec::new();
        for index in 0u32.. {
            match self.contract.funder_at(index) {
                Ok(funder) => funders.push(funder),
                Err(CallError::IndexOutOfRange) => break,
                Err(source) => {
                    return Err(Violation::CallFailed {
                        operation: "funder_at",
                        source,
                    })
                }
            }
        }
        Ok(funders)
    }

    fn funder_ledger(&self) -> CheckResult<Vec<(C::Account, i128)>> {
        self.funders()?
            .into_iter()
            .map(|funder| {
                let amount = self.amount_funded(&funder)?;
                Ok::<_, Violation>((funder, amount))
            })
            .collect()
    }

    fn snapshot(&self, subject: &C::Account) -> CheckResult<LedgerSnapshot<C::Account>> {
        Ok(LedgerSnapshot {
            contract_balance: self.balance_of(&self.contract.address())?,
            funders: self.funder_ledger()?,
            subject_funded: self.amount_funded(subject)?,
        })
    }

    fn amount_funded(&self, funder: &C::Account) -> CheckResult<i128> {
        self.contract
            .amount_funded(funder)
            .map_err(call_failed("amount_funded"))
    }

    fn balance_of(&self, account: &C::Account) -> CheckResult<i128> {
        self.contract
            .balance_of(account)
            .map_err(call_failed("balance_of"))
    }
}
