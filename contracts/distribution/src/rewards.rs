use morpheus_shared::{rate_increase, reward_for_rate};
use soroban_sdk::{Env, I256};

use crate::errors::DistributionError;
use crate::storage::{Pool, PoolData, UserData};

/// Pool rate as of `now`: the reward emitted since the last checkpoint is
/// spread over everything deposited. An empty pool keeps its rate.
pub fn current_pool_rate(
    env: &Env,
    pool: &Pool,
    data: &PoolData,
    now: u64,
) -> Result<I256, DistributionError> {
    if data.total_deposited == 0 {
        return Ok(data.rate.clone());
    }

    let reward = pool.curve().period_reward(data.last_update, now)?;
    let increase = rate_increase(env, reward, data.total_deposited)?;

    Ok(data.rate.add(&increase))
}

/// Checkpoint of `data` at `now` under the rate computed by
/// `current_pool_rate`.
pub fn checkpoint(data: &PoolData, rate: &I256, now: u64) -> PoolData {
    PoolData {
        last_update: now,
        rate: rate.clone(),
        total_deposited: data.total_deposited,
    }
}

pub fn current_user_reward(
    env: &Env,
    pool_rate: &I256,
    user: &UserData,
) -> Result<i128, DistributionError> {
    let earned = reward_for_rate(env, &pool_rate.sub(&user.rate), user.deposited)?;

    user.pending_rewards
        .checked_add(earned)
        .ok_or(DistributionError::Overflow)
}
