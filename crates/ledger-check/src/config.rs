//! Network selection and the constants local deployments are built from.

use crate::contract::{Receipt, WithdrawMode};

/// Networks on which the unit scenarios run against mocks.
pub const DEVELOPMENT_CHAINS: &[&str] = &["local", "standalone"];

/// Environment variable naming the target network.
pub const NETWORK_ENV: &str = "FUND_ME_NETWORK";

/// Answer decimals of the mock price feed.
pub const DECIMALS: u32 = 8;

/// 2000 USD per unit of the native asset.
pub const INITIAL_ANSWER: i128 = 2_000_0000_0000;

/// 50 USD with 18 decimals.
pub const MINIMUM_USD: i128 = 50 * 1_000_000_000_000_000_000;

/// 0.1 of the native asset, in stroops.
pub const SEND_VALUE: i128 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub development_chains: Vec<String>,
}

impl NetworkConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            development_chains: DEVELOPMENT_CHAINS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn local() -> Self {
        Self::named(DEVELOPMENT_CHAINS[0])
    }

    /// Reads the network name from `FUND_ME_NETWORK`, defaulting to `local`.
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(NETWORK_ENV).ok().as_deref())
    }

    /// An unset or blank setting selects `local`; names are trimmed.
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting.map(str::trim) {
            Some(name) if !name.is_empty() => Self::named(name),
            _ => Self::local(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.development_chains.iter().any(|c| *c == self.name)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::local()
    }
}

/// Parameters of a fresh local deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConstants {
    pub feed_decimals: u32,
    pub initial_answer: i128,
    pub minimum_usd: i128,
    /// Native balance minted to the deployer and every extra account.
    pub initial_balance: i128,
    /// Accounts generated besides the deployer.
    pub extra_accounts: usize,
}

impl Default for ChainConstants {
    fn default() -> Self {
        Self {
            feed_decimals: DECIMALS,
            initial_answer: INITIAL_ANSWER,
            minimum_usd: MINIMUM_USD,
            initial_balance: 10_000 * 10_000_000,
            extra_accounts: 19,
        }
    }
}

/// Deterministic gas charged by the local chain per confirmed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    /// Charged on every transaction.
    pub base: u64,
    pub fund: u64,
    pub withdraw: u64,
    pub withdraw_per_funder: u64,
    pub cheaper_withdraw_per_funder: u64,
    /// Stroops per unit of gas.
    pub gas_price: u64,
}

impl GasSchedule {
    pub fn fund(&self) -> Receipt {
        self.receipt(self.fund)
    }

    pub fn withdraw(&self, mode: WithdrawMode, funders: u32) -> Receipt {
        let per_funder = match mode {
            WithdrawMode::Standard => self.withdraw_per_funder,
            WithdrawMode::Cheaper => self.cheaper_withdraw_per_funder,
        };
        self.receipt(self.withdraw.saturating_add(per_funder.saturating_mul(u64::from(funders))))
    }

    fn receipt(&self, call: u64) -> Receipt {
        Receipt {
            gas_used: self.base.saturating_add(call),
            effective_gas_price: self.gas_price,
        }
    }
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            base: 21_000,
            fund: 70_000,
            withdraw: 30_000,
            withdraw_per_funder: 7_000,
            cheaper_withdraw_per_funder: 5_000,
            gas_price: 10,
        }
    }
}
