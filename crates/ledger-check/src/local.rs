//! A local Soroban chain with FundMe, a mock price feed and funded accounts.

use fund_me::{ContractError, FundMe, FundMeClient};
use mock_price_feed::{FeedError, MockPriceFeed, MockPriceFeedClient};
use soroban_sdk::{testutils::Address as _, token, Address, Env, InvokeError};
use tracing::{debug, info};

use crate::config::{ChainConstants, GasSchedule};
use crate::contract::{CallError, CallResult, FundingContract, Receipt, WithdrawMode};
use crate::suite::{Deployment, Fixture, Roles};

impl From<ContractError> for CallError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::InsufficientContribution => CallError::InsufficientContribution,
            ContractError::NotOwner => CallError::Unauthorized,
            ContractError::IndexOutOfRange => CallError::IndexOutOfRange,
            other => CallError::reverted(format!("{other:?}")),
        }
    }
}

impl From<FeedError> for CallError {
    fn from(err: FeedError) -> Self {
        CallError::reverted(format!("price feed: {err:?}"))
    }
}

impl From<soroban_sdk::Error> for CallError {
    fn from(err: soroban_sdk::Error) -> Self {
        CallError::reverted(format!("{err:?}"))
    }
}

/// Flattens the nested result of a `try_` client call.
fn settle<T, D, E>(result: Result<Result<T, D>, Result<E, InvokeError>>) -> CallResult<T>
where
    D: std::fmt::Debug,
    E: Into<CallError>,
{
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CallError::reverted(format!("undecodable return value: {err:?}"))),
        Err(Ok(err)) => Err(err.into()),
        Err(Err(err)) => Err(CallError::reverted(format!("{err:?}"))),
    }
}

/// A fresh chain per instance; every confirmed call is charged gas from the
/// [`GasSchedule`] by burning the sender's native balance.
pub struct LocalChain {
    fund_me: FundMeClient<'static>,
    feed: MockPriceFeedClient<'static>,
    token: token::Client<'static>,
    deployer: Address,
    accounts: Vec<Address>,
    gas: GasSchedule,
}

impl LocalChain {
    /// Deploys the native token, the mock feed and FundMe, and mints
    /// `initial_balance` to the deployer and each extra account.
    pub fn deploy(constants: &ChainConstants, gas: GasSchedule) -> CallResult<Self> {
        let env = Env::default();
        env.mock_all_auths();

        let deployer = Address::generate(&env);
        let accounts: Vec<Address> = (0..constants.extra_accounts)
            .map(|_| Address::generate(&env))
            .collect();

        let issuer = Address::generate(&env);
        let token_address = env.register_stellar_asset_contract_v2(issuer).address();
        let minter = token::StellarAssetClient::new(&env, &token_address);
        for account in std::iter::once(&deployer).chain(&accounts) {
            minter.mint(account, &constants.initial_balance);
        }

        let feed_id = env.register(MockPriceFeed, ());
        let feed = MockPriceFeedClient::new(&env, &feed_id);
        settle(feed.try_initialize(&constants.feed_decimals, &constants.initial_answer))?;

        let fund_me_id = env.register(FundMe, ());
        let fund_me = FundMeClient::new(&env, &fund_me_id);
        settle(fund_me.try_initialize(
            &deployer,
            &token_address,
            &feed_id,
            &constants.minimum_usd,
        ))?;

        info!(
            accounts = accounts.len() + 1,
            minimum_usd = constants.minimum_usd,
            "deployed FundMe to local chain"
        );

        let token = token::Client::new(&env, &token_address);
        Ok(Self {
            fund_me,
            feed,
            token,
            deployer,
            accounts,
            gas,
        })
    }

    /// The account that deployed FundMe and owns it.
    pub fn deployer(&self) -> &Address {
        &self.deployer
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn price_feed_address(&self) -> Address {
        self.feed.address.clone()
    }

    /// Moves the mock feed to a new answer.
    pub fn update_price(&mut self, answer: i128) -> CallResult<()> {
        settle(self.feed.try_update_answer(&answer))
    }

    pub fn funders_count(&self) -> CallResult<u32> {
        settle(self.fund_me.try_get_funders_count())
    }

    /// Refuses calls the sender cannot pay for up front, otherwise runs
    /// `call` and charges `receipt` once it has succeeded.
    fn submit<F>(
        &mut self,
        sender: &Address,
        value: i128,
        receipt: Receipt,
        call: F,
    ) -> CallResult<Receipt>
    where
        F: FnOnce(&FundMeClient<'static>) -> CallResult<()>,
    {
        let cost = receipt.cost();
        let affordable = value
            .checked_add(cost)
            .is_some_and(|needed| self.token.balance(sender) >= needed);
        if !affordable {
            return Err(CallError::reverted("insufficient funds for value and gas"));
        }

        call(&self.fund_me)?;
        if cost > 0 {
            self.token.burn(sender, &cost);
        }
        debug!(gas_used = receipt.gas_used, cost, "confirmed");
        Ok(receipt)
    }

    fn withdraw_as(&mut self, mode: WithdrawMode, caller: &Address) -> CallResult<Receipt> {
        let receipt = self.gas.withdraw(mode, self.funders_count()?);
        self.submit(caller, 0, receipt, |fund_me| {
            let paid = match mode {
                WithdrawMode::Standard => settle(fund_me.try_withdraw(caller)),
                WithdrawMode::Cheaper => settle(fund_me.try_cheaper_withdraw(caller)),
            }?;
            debug!(paid, mode = mode.label(), "paid out");
            Ok(())
        })
    }
}

impl FundingContract for LocalChain {
    type Account = Address;

    fn address(&self) -> Address {
        self.fund_me.address.clone()
    }

    fn fund(&mut self, sender: &Address, amount: i128) -> CallResult<Receipt> {
        let receipt = self.gas.fund();
        self.submit(sender, amount.max(0), receipt, |fund_me| {
            settle(fund_me.try_fund(sender, &amount))
        })
    }

    fn withdraw(&mut self, caller: &Address) -> CallResult<Receipt> {
        self.withdraw_as(WithdrawMode::Standard, caller)
    }

    fn cheaper_withdraw(&mut self, caller: &Address) -> CallResult<Receipt> {
        self.withdraw_as(WithdrawMode::Cheaper, caller)
    }

    fn price_feed(&self) -> CallResult<Address> {
        settle(self.fund_me.try_get_price_feed())
    }

    fn amount_funded(&self, funder: &Address) -> CallResult<i128> {
        settle(self.fund_me.try_get_address_to_amount_funded(funder))
    }

    fn funder_at(&self, index: u32) -> CallResult<Address> {
        settle(self.fund_me.try_get_funder(&index))
    }

    fn balance_of(&self, account: &Address) -> CallResult<i128> {
        Ok(self.token.balance(account))
    }
}

/// Deploys a fresh [`LocalChain`] for every case.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFixture {
    pub constants: ChainConstants,
    pub gas: GasSchedule,
}

impl Fixture for LocalFixture {
    type Contract = LocalChain;

    fn setup(&self) -> CallResult<Deployment<LocalChain>> {
        let chain = LocalChain::deploy(&self.constants, self.gas)?;
        let roles = Roles {
            deployer: chain.deployer().clone(),
            others: chain.accounts().to_vec(),
            price_feed: chain.price_feed_address(),
        };
        Ok(Deployment {
            contract: chain,
            roles,
        })
    }
}
