#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, contracttype, Env, String};


/// Version reported by the feed, matching the aggregator interface revision it mimics.
pub const VERSION: u32 = 4;

// ── Data Types ──────────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FeedError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
}

/// Snapshot of the most recent round, shaped like an aggregator's
/// `latestRoundData` tuple.
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
    /// Number of decimals in every reported answer.
    Decimals,
    /// The latest round.
    Latest,
}

// ── Contract ────────────────────────────────────────────────────────────────

#[contract]
pub struct MockPriceFeed;

#[contractimpl]
impl MockPriceFeed {
    /// Sets the feed precision and publishes the first round.
    ///
    /// # Arguments
    /// * `decimals`       – Decimals carried by every answer (8 for USD pairs).
    /// * `initial_answer` – The first reported price, already scaled.
    pub fn initialize(env: Env, decimals: u32, initial_answer: i128) -> Result<(), FeedError> {
        if env.storage().instance().has(&DataKey::Decimals) {
            return Err(FeedError::AlreadyInitialized);
        }

        env.storage().instance().set(&DataKey::Decimals, &decimals);
        store_round(&env, 1, initial_answer);
        Ok(())
    }

    /// Publishes a new answer as the next round.
    pub fn update_answer(env: Env, answer: i128) -> Result<(), FeedError> {
        let latest = Self::latest_round_data(env.clone())?;
        store_round(&env, latest.round_id + 1, answer);

        env.events()
            .publish(("price_feed", "answer_updated"), (latest.round_id + 1, answer));
        Ok(())
    }

    pub fn latest_round_data(env: Env) -> Result<RoundData, FeedError> {
        env.storage()
            .instance()
            .get(&DataKey::Latest)
            .ok_or(FeedError::NotInitialized)
    }

    pub fn latest_answer(env: Env) -> Result<i128, FeedError> {
        Ok(Self::latest_round_data(env)?.answer)
    }

    pub fn decimals(env: Env) -> Result<u32, FeedError> {
        env.storage()
            .instance()
            .get(&DataKey::Decimals)
            .ok_or(FeedError::NotInitialized)
    }

    pub fn version(_env: Env) -> u32 {
        VERSION
    }

    pub fn description(env: Env) -> String {
        String::from_str(&env, "mock USD price feed")
    }
}

fn store_round(env: &Env, round_id: u64, answer: i128) {
    let now = env.ledger().timestamp();
    let round = RoundData {
        round_id,
        answer,
        started_at: now,
        updated_at: now,
        answered_in_round: round_id,
    };
    env.storage().instance().set(&DataKey::Latest, &round);
}
