//! The calls the checker makes into a funding contract and its chain.

use std::fmt::Debug;

use thiserror::Error;

/// Result of a single contract call.
pub type CallResult<T> = Result<T, CallError>;

/// Why a contract call was rejected.
///
/// Every variant means the call reverted and left no state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The contribution is below the contract's minimum.
    #[error("insufficient contribution")]
    InsufficientContribution,

    /// The caller may not withdraw.
    #[error("not authorized")]
    Unauthorized,

    /// No funder is stored at the requested index.
    #[error("funder index out of range")]
    IndexOutOfRange,

    /// Any other revert, with whatever reason the chain reported.
    #[error("reverted: {0}")]
    Reverted(String),
}

impl CallError {
    pub fn reverted(reason: impl Into<String>) -> Self {
        Self::Reverted(reason.into())
    }
}

/// Gas accounting of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub gas_used: u64,
    pub effective_gas_price: u64,
}

impl Receipt {
    /// What the sender paid for the transaction.
    pub fn cost(&self) -> i128 {
        i128::from(self.gas_used) * i128::from(self.effective_gas_price)
    }
}

/// Which withdraw entry point to exercise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WithdrawMode {
    #[default]
    Standard,
    /// Reads the funder list once instead of once per funder.
    Cheaper,
}

impl WithdrawMode {
    pub fn label(&self) -> &'static str {
        match self {
            WithdrawMode::Standard => "withdraw",
            WithdrawMode::Cheaper => "cheaper_withdraw",
        }
    }
}

/// A deployed FundMe contract together with the chain it lives on.
///
/// State-changing calls wait for confirmation and return the receipt; a
/// failed call returns its [`CallError`] and changes nothing.
pub trait FundingContract {
    type Account: Clone + Debug + PartialEq;

    /// The contract's own account, for balance queries.
    fn address(&self) -> Self::Account;

    fn fund(&mut self, sender: &Self::Account, amount: i128) -> CallResult<Receipt>;

    fn withdraw(&mut self, caller: &Self::Account) -> CallResult<Receipt>;

    fn cheaper_withdraw(&mut self, caller: &Self::Account) -> CallResult<Receipt>;

    fn price_feed(&self) -> CallResult<Self::Account>;

    fn amount_funded(&self, funder: &Self::Account) -> CallResult<i128>;

    /// Fails with [`CallError::IndexOutOfRange`] past the last funder.
    fn funder_at(&self, index: u32) -> CallResult<Self::Account>;

    /// Native balance of any account, the contract included.
    fn balance_of(&self, account: &Self::Account) -> CallResult<i128>;

    fn withdraw_with(&mut self, mode: WithdrawMode, caller: &Self::Account) -> CallResult<Receipt> {
        match mode {
            WithdrawMode::Standard => self.withdraw(caller),
            WithdrawMode::Cheaper => self.cheaper_withdraw(caller),
        }
    }
}
