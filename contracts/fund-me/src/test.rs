#![cfg(test)]

extern crate std;

use mock_price_feed::{MockPriceFeed, MockPriceFeedClient};
use soroban_sdk::{testutils::Address as _, token, Address, Env};

use crate::{conversion_rate, ContractError, FundMe, FundMeClient};

const DECIMALS: u32 = 8;
const INITIAL_ANSWER: i128 = 2_000_0000_0000;
const MINIMUM_USD: i128 = 50 * 1_000_000_000_000_000_000;
/// 0.1 of the native asset.
const SEND_VALUE: i128 = 1_000_000;
/// Exactly 50 USD at the initial answer.
const MINIMUM_AMOUNT: i128 = 250_000;

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Set up a fresh environment with a price feed, a native token and an
/// initialized FundMe contract owned by the returned owner.
fn setup_env() -> (
    Env,
    FundMeClient<'static>,
    MockPriceFeedClient<'static>,
    Address,
    Address,
) {
    let env = Env::default();
    env.mock_all_auths();

    let feed_id = env.register(MockPriceFeed, ());
    let feed = MockPriceFeedClient::new(&env, &feed_id);
    feed.initialize(&DECIMALS, &INITIAL_ANSWER);

    let token_admin = Address::generate(&env);
    let token_address = env
        .register_stellar_asset_contract_v2(token_admin)
        .address();

    let owner = Address::generate(&env);
    let contract_id = env.register(FundMe, ());
    let client = FundMeClient::new(&env, &contract_id);
    client.initialize(&owner, &token_address, &feed_id, &MINIMUM_USD);

    (env, client, feed, owner, token_address)
}

/// Generate an account holding `amount` of the native token.
fn funded_account(env: &Env, token_address: &Address, amount: i128) -> Address {
    let account = Address::generate(env);
    token::StellarAssetClient::new(env, token_address).mint(&account, &amount);
    account
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn test_initialize_sets_price_feed() {
    let (_env, client, feed, owner, _token) = setup_env();

    assert_eq!(client.get_price_feed(), feed.address);
    assert_eq!(client.get_owner(), owner);
    assert_eq!(client.get_minimum_usd(), MINIMUM_USD);
    assert_eq!(client.get_funders_count(), 0);
    assert_eq!(client.balance(), 0);
}

#[test]
fn test_double_initialize_returns_error() {
    let (_env, client, feed, owner, token_address) = setup_env();

    let result = client.try_initialize(&owner, &token_address, &feed.address, &1);

    assert_eq!(result.unwrap_err().unwrap(), ContractError::AlreadyInitialized);
    assert_eq!(client.get_minimum_usd(), MINIMUM_USD);
}

#[test]
fn test_fund_without_value_returns_error() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    let result = client.try_fund(&funder, &0);

    assert_eq!(
        result.unwrap_err().unwrap(),
        ContractError::InsufficientContribution
    );
    assert_eq!(client.get_funders_count(), 0);
}

#[test]
fn test_fund_below_minimum_leaves_state_unchanged() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    let result = client.try_fund(&funder, &(MINIMUM_AMOUNT - 1));

    assert_eq!(
        result.unwrap_err().unwrap(),
        ContractError::InsufficientContribution
    );
    assert_eq!(client.get_address_to_amount_funded(&funder), 0);
    assert_eq!(client.balance(), 0);
    assert_eq!(
        token::Client::new(&env, &token_address).balance(&funder),
        SEND_VALUE
    );
}

#[test]
fn test_fund_exact_minimum() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    client.fund(&funder, &MINIMUM_AMOUNT);

    assert_eq!(client.get_address_to_amount_funded(&funder), MINIMUM_AMOUNT);
}

#[test]
fn test_fund_updates_amount_funded() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    client.fund(&funder, &SEND_VALUE);

    assert_eq!(client.get_address_to_amount_funded(&funder), SEND_VALUE);
    assert_eq!(client.balance(), SEND_VALUE);
}

#[test]
fn test_fund_adds_funder_to_list() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    client.fund(&funder, &SEND_VALUE);

    assert_eq!(client.get_funder(&0), funder);
    assert_eq!(
        client.try_get_funder(&1).unwrap_err().unwrap(),
        ContractError::IndexOutOfRange
    );
}

#[test]
fn test_repeat_funding_accumulates_once_in_list() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let alice = funded_account(&env, &token_address, 3 * SEND_VALUE);
    let bob = funded_account(&env, &token_address, SEND_VALUE);

    client.fund(&alice, &SEND_VALUE);
    client.fund(&bob, &SEND_VALUE);
    client.fund(&alice, &(2 * SEND_VALUE));

    assert_eq!(client.get_address_to_amount_funded(&alice), 3 * SEND_VALUE);
    assert_eq!(client.get_funders_count(), 2);
    assert_eq!(client.get_funder(&0), alice);
    assert_eq!(client.get_funder(&1), bob);
    assert_eq!(client.balance(), 4 * SEND_VALUE);
}

#[test]
fn test_withdraw_from_single_funder() {
    let (env, client, _feed, owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);
    client.fund(&funder, &SEND_VALUE);

    let paid = client.withdraw(&owner);

    let token_client = token::Client::new(&env, &token_address);
    assert_eq!(paid, SEND_VALUE);
    assert_eq!(client.balance(), 0);
    assert_eq!(token_client.balance(&owner), SEND_VALUE);
    assert_eq!(client.get_address_to_amount_funded(&funder), 0);
    assert_eq!(
        client.try_get_funder(&0).unwrap_err().unwrap(),
        ContractError::IndexOutOfRange
    );
}

#[test]
fn test_withdraw_with_no_funds() {
    let (_env, client, _feed, owner, _token) = setup_env();

    assert_eq!(client.withdraw(&owner), 0);
    assert_eq!(client.get_funders_count(), 0);
}

#[test]
fn test_withdraw_by_non_owner_returns_error() {
    let (env, client, _feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);
    client.fund(&funder, &SEND_VALUE);

    let attacker = Address::generate(&env);
    let result = client.try_withdraw(&attacker);

    assert_eq!(result.unwrap_err().unwrap(), ContractError::NotOwner);
    assert_eq!(
        client.try_cheaper_withdraw(&attacker).unwrap_err().unwrap(),
        ContractError::NotOwner
    );
    assert_eq!(client.balance(), SEND_VALUE);
    assert_eq!(client.get_address_to_amount_funded(&funder), SEND_VALUE);
    assert_eq!(client.get_funder(&0), funder);
}

#[test]
fn test_cheaper_withdraw_from_multiple_funders() {
    let (env, client, _feed, owner, token_address) = setup_env();

    let mut funders = std::vec::Vec::new();
    for _ in 0..5 {
        let funder = funded_account(&env, &token_address, SEND_VALUE);
        client.fund(&funder, &SEND_VALUE);
        funders.push(funder);
    }

    let paid = client.cheaper_withdraw(&owner);

    assert_eq!(paid, 5 * SEND_VALUE);
    assert_eq!(client.balance(), 0);
    assert_eq!(client.get_funders_count(), 0);
    for funder in &funders {
        assert_eq!(client.get_address_to_amount_funded(funder), 0);
    }
}

#[test]
fn test_price_drop_raises_minimum_amount() {
    let (env, client, feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    // Halving the price doubles the amount needed for 50 USD.
    feed.update_answer(&(INITIAL_ANSWER / 2));

    assert_eq!(
        client.try_fund(&funder, &MINIMUM_AMOUNT).unwrap_err().unwrap(),
        ContractError::InsufficientContribution
    );
    client.fund(&funder, &(2 * MINIMUM_AMOUNT));
    assert_eq!(client.get_address_to_amount_funded(&funder), 2 * MINIMUM_AMOUNT);
}

#[test]
fn test_non_positive_price_rejects_funding() {
    let (env, client, feed, _owner, token_address) = setup_env();
    let funder = funded_account(&env, &token_address, SEND_VALUE);

    feed.update_answer(&0);

    assert_eq!(
        client.try_fund(&funder, &SEND_VALUE).unwrap_err().unwrap(),
        ContractError::StalePrice
    );
}

#[test]
fn test_get_version_reads_feed() {
    let (_env, client, feed, _owner, _token) = setup_env();

    assert_eq!(client.get_version(), feed.version());
}

#[test]
fn test_conversion_rate() {
    // 1 unit at 2000 USD is 2000 USD with 18 decimals.
    assert_eq!(
        conversion_rate(10_000_000, INITIAL_ANSWER, DECIMALS),
        Ok(2_000 * 1_000_000_000_000_000_000)
    );
    assert_eq!(
        conversion_rate(MINIMUM_AMOUNT, INITIAL_ANSWER, DECIMALS),
        Ok(MINIMUM_USD)
    );
    // Feeds with more than 18 decimals are truncated before scaling.
    assert_eq!(
        conversion_rate(SEND_VALUE, INITIAL_ANSWER, 20),
        Ok(200_000_000)
    );
    assert_eq!(
        conversion_rate(1, -5, DECIMALS),
        Err(ContractError::StalePrice)
    );
    assert_eq!(
        conversion_rate(i128::MAX, INITIAL_ANSWER, DECIMALS),
        Err(ContractError::Overflow)
    );
}

use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_underfunded_contribution_never_recorded(
        amount in -1_000i128..MINIMUM_AMOUNT,
    ) {
        let (env, client, _feed, _owner, token_address) = setup_env();
        let funder = funded_account(&env, &token_address, SEND_VALUE);

        let result = client.try_fund(&funder, &amount);

        prop_assert_eq!(
            result.unwrap_err().unwrap(),
            ContractError::InsufficientContribution
        );
        prop_assert_eq!(client.get_address_to_amount_funded(&funder), 0);
        prop_assert_eq!(client.get_funders_count(), 0);
    }

    #[test]
    fn prop_valid_contribution_recorded(
        amount in MINIMUM_AMOUNT..100_000_000i128,
    ) {
        let (env, client, _feed, _owner, token_address) = setup_env();
        let funder = funded_account(&env, &token_address, amount);

        client.fund(&funder, &amount);

        prop_assert_eq!(client.get_address_to_amount_funded(&funder), amount);
        prop_assert_eq!(client.get_funder(&0), funder);
        prop_assert_eq!(client.balance(), amount);
    }

    #[test]
    fn prop_withdraw_resets_every_funder(
        count in 1usize..8,
        cheaper in any::<bool>(),
    ) {
        let (env, client, _feed, owner, token_address) = setup_env();

        let mut funders = std::vec::Vec::new();
        for _ in 0..count {
            let funder = funded_account(&env, &token_address, SEND_VALUE);
            client.fund(&funder, &SEND_VALUE);
            funders.push(funder);
        }

        let paid = if cheaper {
            client.cheaper_withdraw(&owner)
        } else {
            client.withdraw(&owner)
        };

        prop_assert_eq!(paid, SEND_VALUE * count as i128);
        prop_assert_eq!(client.balance(), 0);
        prop_assert!(client.try_get_funder(&0).is_err());
        for funder in &funders {
            prop_assert_eq!(client.get_address_to_amount_funded(funder), 0);
        }
    }
}
