#![no_std]

use soroban_sdk::{
    contract, contractclient, contracterror, contractimpl, contracttype, token, Address, Env, Vec,
};

mod price;

#[cfg(test)]
mod test;

pub use price::{conversion_rate, TOKEN_DECIMALS, USD_DECIMALS};

// ── Data Types ──────────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    /// The contribution is worth less than the minimum in USD.
    InsufficientContribution = 3,
    /// Only the owner may withdraw.
    NotOwner = 4,
    /// No funder is stored at the requested index.
    IndexOutOfRange = 5,
    Overflow = 6,
    /// The feed reported a non-positive price.
    StalePrice = 7,
}

/// Latest round as reported by the price feed contract.
#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// The only address allowed to withdraw.
    Owner,
    /// The native asset contract contributions are paid in.
    Token,
    /// The USD price feed used for the minimum check.
    PriceFeed,
    /// Minimum contribution in USD, 18 decimals.
    MinimumUsd,
    /// Cumulative amount funded by an address since the last withdrawal.
    AddressToAmountFunded(Address),
    /// Funder addresses in order of first contribution.
    Funders,
}

/// The subset of the aggregator interface FundMe reads.
#[contractclient(name = "PriceFeedClient")]
pub trait PriceFeed {
    fn latest_round_data(env: Env) -> RoundData;
    fn decimals(env: Env) -> u32;
    fn version(env: Env) -> u32;
}

// ── Contract ────────────────────────────────────────────────────────────────

#[contract]
pub struct FundMe;

#[contractimpl]
impl FundMe {
    /// Wires the contract to its owner, payment asset and price feed.
    ///
    /// # Arguments
    /// * `owner`       – The address allowed to withdraw.
    /// * `token`       – The native asset contract used for contributions.
    /// * `price_feed`  – The USD price feed contract.
    /// * `minimum_usd` – The minimum contribution in USD with 18 decimals.
    pub fn initialize(
        env: Env,
        owner: Address,
        token: Address,
        price_feed: Address,
        minimum_usd: i128,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(ContractError::AlreadyInitialized);
        }

        owner.require_auth();

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::PriceFeed, &price_feed);
        env.storage().instance().set(&DataKey::MinimumUsd, &minimum_usd);

        let empty_funders: Vec<Address> = Vec::new(&env);
        env.storage().instance().set(&DataKey::Funders, &empty_funders);
        Ok(())
    }

    /// Contribute `amount` of the native asset.
    ///
    /// The funder must authorize the call. Contributions worth less than the
    /// configured minimum at the feed's latest price are rejected.
    pub fn fund(env: Env, funder: Address, amount: i128) -> Result<(), ContractError> {
        funder.require_auth();

        if amount <= 0 {
            return Err(ContractError::InsufficientContribution);
        }

        let minimum_usd: i128 = read(&env, &DataKey::MinimumUsd)?;
        let feed = PriceFeedClient::new(&env, &read(&env, &DataKey::PriceFeed)?);
        let round = feed.latest_round_data();
        if conversion_rate(amount, round.answer, feed.decimals())? < minimum_usd {
            return Err(ContractError::InsufficientContribution);
        }

        let token_client = token::Client::new(&env, &read(&env, &DataKey::Token)?);
        token_client.transfer(&funder, &env.current_contract_address(), &amount);

        // Update the funder's running total.
        let key = DataKey::AddressToAmountFunded(funder.clone());
        let prev: i128 = env.storage().instance().get(&key).unwrap_or(0);
        let next = prev
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        env.storage().instance().set(&key, &next);

        // Track the funder address if new.
        let mut funders: Vec<Address> = read(&env, &DataKey::Funders)?;
        if !funders.contains(&funder) {
            funders.push_back(funder.clone());
            env.storage().instance().set(&DataKey::Funders, &funders);
        }

        env.events().publish(("fund_me", "funded"), (funder, amount));
        Ok(())
    }

    /// Pays the whole balance to the owner and resets every funder.
    ///
    /// Re-reads the funder list from storage for each funder it clears. See
    /// [`FundMe::cheaper_withdraw`] for the variant that reads it once.
    /// Returns the amount paid out.
    pub fn withdraw(env: Env, caller: Address) -> Result<i128, ContractError> {
        let owner = require_owner(&env, &caller)?;

        let count = read::<Vec<Address>>(&env, &DataKey::Funders)?.len();
        for index in 0..count {
            let funders: Vec<Address> = read(&env, &DataKey::Funders)?;
            if let Some(funder) = funders.get(index) {
                env.storage()
                    .instance()
                    .set(&DataKey::AddressToAmountFunded(funder), &0i128);
            }
        }

        pay_out(&env, &owner)
    }

    /// Same outcome as [`FundMe::withdraw`], reading the funder list once.
    pub fn cheaper_withdraw(env: Env, caller: Address) -> Result<i128, ContractError> {
        let owner = require_owner(&env, &caller)?;

        let funders: Vec<Address> = read(&env, &DataKey::Funders)?;
        for funder in funders.iter() {
            env.storage()
                .instance()
                .set(&DataKey::AddressToAmountFunded(funder), &0i128);
        }

        pay_out(&env, &owner)
    }

    // ── View helpers ────────────────────────────────────────────────────

    pub fn get_owner(env: Env) -> Result<Address, ContractError> {
        read(&env, &DataKey::Owner)
    }

    pub fn get_price_feed(env: Env) -> Result<Address, ContractError> {
        read(&env, &DataKey::PriceFeed)
    }

    pub fn get_minimum_usd(env: Env) -> Result<i128, ContractError> {
        read(&env, &DataKey::MinimumUsd)
    }

    /// Returns the version of the wired price feed.
    pub fn get_version(env: Env) -> Result<u32, ContractError> {
        let feed = PriceFeedClient::new(&env, &read(&env, &DataKey::PriceFeed)?);
        Ok(feed.version())
    }

    /// Returns the amount funded by `funder` since the last withdrawal.
    pub fn get_address_to_amount_funded(env: Env, funder: Address) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::AddressToAmountFunded(funder))
            .unwrap_or(0)
    }

    /// Returns the funder at `index`, in order of first contribution.
    pub fn get_funder(env: Env, index: u32) -> Result<Address, ContractError> {
        let funders: Vec<Address> = read(&env, &DataKey::Funders)?;
        funders.get(index).ok_or(ContractError::IndexOutOfRange)
    }

    pub fn get_funders_count(env: Env) -> Result<u32, ContractError> {
        Ok(read::<Vec<Address>>(&env, &DataKey::Funders)?.len())
    }

    /// Returns the native asset balance held by the contract.
    pub fn balance(env: Env) -> Result<i128, ContractError> {
        let token_client = token::Client::new(&env, &read(&env, &DataKey::Token)?);
        Ok(token_client.balance(&env.current_contract_address()))
    }
}

fn read<V>(env: &Env, key: &DataKey) -> Result<V, ContractError>
where
    V: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>,
{
    env.storage()
        .instance()
        .get(key)
        .ok_or(ContractError::NotInitialized)
}

fn require_owner(env: &Env, caller: &Address) -> Result<Address, ContractError> {
    caller.require_auth();

    let owner: Address = read(env, &DataKey::Owner)?;
    if *caller != owner {
        return Err(ContractError::NotOwner);
    }
    Ok(owner)
}

fn pay_out(env: &Env, owner: &Address) -> Result<i128, ContractError> {
    let empty_funders: Vec<Address> = Vec::new(env);
    env.storage().instance().set(&DataKey::Funders, &empty_funders);

    let token_client = token::Client::new(env, &read(env, &DataKey::Token)?);
    let balance = token_client.balance(&env.current_contract_address());
    if balance > 0 {
        token_client.transfer(&env.current_contract_address(), owner, &balance);
    }

    env.events()
        .publish(("fund_me", "withdrawn"), (owner.clone(), balance));
    Ok(balance)
}
