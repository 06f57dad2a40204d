//! Named cases, each run against a freshly deployed contract.

use tracing::{info, warn};

use crate::checker::{CheckResult, CheckerConfig, LedgerConsistencyChecker, Violation};
use crate::config::NetworkConfig;
use crate::contract::{CallError, CallResult, FundingContract, WithdrawMode};

/// Accounts of a deployment, handed to every case.
#[derive(Debug, Clone, PartialEq)]
pub struct Roles<A> {
    /// Deploys and owns the contract.
    pub deployer: A,
    pub others: Vec<A>,
    /// The price feed the contract was deployed against.
    pub price_feed: A,
}

pub struct Deployment<C: FundingContract> {
    pub contract: C,
    pub roles: Roles<C::Account>,
}

/// Produces a fresh deployment for one case. Teardown is dropping it.
pub trait Fixture {
    type Contract: FundingContract;

    fn setup(&self) -> CallResult<Deployment<Self::Contract>>;
}

/// Which networks a case applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Development chains with mocked dependencies.
    Unit,
    /// Live networks.
    Staging,
}

impl Stage {
    pub fn applies_to(&self, network: &NetworkConfig) -> bool {
        match self {
            Stage::Unit => network.is_development(),
            Stage::Staging => !network.is_development(),
        }
    }
}

type CaseFn<C> =
    fn(&mut LedgerConsistencyChecker<C>, &Roles<<C as FundingContract>::Account>) -> CheckResult;

pub struct Scenario<C: FundingContract> {
    pub name: &'static str,
    pub stage: Stage,
    run: CaseFn<C>,
}

impl<C: FundingContract> Scenario<C> {
    pub fn new(name: &'static str, stage: Stage, run: CaseFn<C>) -> Self {
        Self { name, stage, run }
    }
}

/// Number of extra accounts funding in the multi-funder cases.
pub const MULTI_FUNDER_COUNT: usize = 5;

fn fund_from_deployer<C: FundingContract>(
    checker: &mut LedgerConsistencyChecker<C>,
    roles: &Roles<C::Account>,
) -> CheckResult {
    let amount = checker.config().send_value;
    checker.verify_fund_records_contribution(amount, &roles.deployer)?;
    Ok(())
}

fn multi_funder_withdraw<C: FundingContract>(
    checker: &mut LedgerConsistencyChecker<C>,
    roles: &Roles<C::Account>,
) -> CheckResult {
    fund_from_deployer(checker, roles)?;
    let count = MULTI_FUNDER_COUNT.min(roles.others.len());
    checker.verify_multi_funder_withdraw(&roles.deployer, &roles.others[..count])?;
    Ok(())
}

/// Cases for development chains, one per behaviour of the contract.
pub fn unit_scenarios<C: FundingContract>() -> Vec<Scenario<C>> {
    vec![
        Scenario::<C>::new("constructor sets the price feed address", Stage::Unit, |checker, roles| {
            checker.verify_price_feed(&roles.price_feed)
        }),
        Scenario::<C>::new("fund fails without enough value", Stage::Unit, |checker, _| {
            checker.verify_rejects_underfunded()
        }),
        Scenario::<C>::new("fund updates the amount funded", Stage::Unit, fund_from_deployer),
        Scenario::<C>::new("fund adds the funder to the funder list", Stage::Unit, |checker, roles| {
            fund_from_deployer(checker, roles)?;
            checker.verify_funder_at(0, &roles.deployer)
        }),
        Scenario::<C>::new("withdraw from a single funder", Stage::Unit, |checker, roles| {
            fund_from_deployer(checker, roles)?;
            checker.verify_single_funder_withdraw(&roles.deployer)?;
            Ok(())
        }),
        Scenario::<C>::new("withdraw from multiple funders", Stage::Unit, multi_funder_withdraw),
        Scenario::<C>::new("only the owner can withdraw", Stage::Unit, |checker, roles| {
            fund_from_deployer(checker, roles)?;
            match roles.others.first() {
                Some(attacker) => checker.verify_owner_only_withdraw(attacker),
                None => Err(Violation::Setup(CallError::reverted("no account besides the owner"))),
            }
        }),
        Scenario::<C>::new("cheaper withdraw from multiple funders", Stage::Unit, |checker, roles| {
            checker.set_withdraw_mode(WithdrawMode::Cheaper);
            multi_funder_withdraw(checker, roles)
        }),
    ]
}

/// Cases for live networks, where only a short fund/withdraw round trip runs.
pub fn staging_scenarios<C: FundingContract>() -> Vec<Scenario<C>> {
    vec![Scenario::<C>::new(
        "funders can fund and the owner can withdraw",
        Stage::Staging,
        |checker, roles| {
            let amount = checker.config().send_value;
            checker.verify_fund_then_withdraw(&roles.deployer, &roles.deployer, amount)
        },
    )]
}

#[derive(Debug)]
pub enum CaseStatus {
    Passed,
    Failed(Violation),
    /// The case does not apply to the selected network.
    Skipped,
}

#[derive(Debug)]
pub struct CaseOutcome {
    pub name: &'static str,
    pub status: CaseStatus,
}

#[derive(Debug, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(|status| matches!(status, CaseStatus::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, CaseStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, CaseStatus::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &Violation)> + '_ {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            CaseStatus::Failed(violation) => Some((outcome.name, violation)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&CaseStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| pred(&outcome.status)).count()
    }
}

/// Runs every case that applies to the network, each on its own deployment.
/// A failing case is recorded and the rest still run.
pub struct Suite<F: Fixture> {
    fixture: F,
    network: NetworkConfig,
    config: CheckerConfig,
    scenarios: Vec<Scenario<F::Contract>>,
}

impl<F: Fixture> Suite<F> {
    /// A suite with the unit and staging cases.
    pub fn new(fixture: F, network: NetworkConfig) -> Self {
        let mut scenarios = unit_scenarios();
        scenarios.extend(staging_scenarios());
        Self::with_scenarios(fixture, network, scenarios)
    }

    pub fn with_scenarios(
        fixture: F,
        network: NetworkConfig,
        scenarios: Vec<Scenario<F::Contract>>,
    ) -> Self {
        Self {
            fixture,
            network,
            config: CheckerConfig::default(),
            scenarios,
        }
    }

    pub fn with_config(mut self, config: CheckerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::default();
        for scenario in &self.scenarios {
            let status = if scenario.stage.applies_to(&self.network) {
                self.run_case(scenario)
            } else {
                CaseStatus::Skipped
            };
            report.outcomes.push(CaseOutcome {
                name: scenario.name,
                status,
            });
        }

        info!(
            network = %self.network.name,
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "suite finished"
        );
        report
    }

    fn run_case(&self, scenario: &Scenario<F::Contract>) -> CaseStatus {
        let deployment = match self.fixture.setup() {
            Ok(deployment) => deployment,
            Err(err) => {
                warn!(case = scenario.name, error = %err, "fixture setup failed");
                return CaseStatus::Failed(Violation::Setup(err));
            }
        };

        let Deployment { contract, roles } = deployment;
        let mut checker = LedgerConsistencyChecker::new(contract, roles.deployer.clone())
            .with_config(self.config);
        match (scenario.run)(&mut checker, &roles) {
            Ok(()) => {
                info!(case = scenario.name, "passed");
                CaseStatus::Passed
            }
            Err(violation) => {
                warn!(case = scenario.name, %violation, "failed");
                CaseStatus::Failed(violation)
            }
        }
    }
}
