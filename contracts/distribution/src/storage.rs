use morpheus_shared::{
    RewardCurve, INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO,
    PERSISTENT_TTL_THRESHOLD,
};
use soroban_sdk::{contracttype, Address, Env, I256};

use crate::errors::DistributionError;

/// Schema version written by `initialize`. Bump together with a new
/// `migrate` step.
pub const STORAGE_VERSION: u32 = 2;

// ========== Data Types ==========

/// Emission curve and lock rules of one pool.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pool {
    pub payout_start: u64,
    pub decrease_interval: u64,
    pub withdraw_lock_period: u64,
    pub claim_lock_period: u64,
    pub withdraw_lock_after_stake: u64,
    pub initial_reward: i128,
    pub reward_decrease: i128,
    pub minimal_stake: i128,
    pub is_public: bool,
}

impl Pool {
    pub fn curve(&self) -> RewardCurve {
        RewardCurve {
            initial_reward: self.initial_reward,
            reward_decrease: self.reward_decrease,
            payout_start: self.payout_start,
            decrease_interval: self.decrease_interval,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolData {
    pub last_update: u64,
    /// Reward per deposited unit, scaled by `PRECISION`
    pub rate: I256,
    pub total_deposited: i128,
}

impl PoolData {
    pub fn new(env: &Env) -> Self {
        PoolData {
            last_update: 0,
            rate: I256::from_i32(env, 0),
            total_deposited: 0,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserData {
    pub last_stake: u64,
    pub deposited: i128,
    pub rate: I256,
    pub pending_rewards: i128,
}

impl UserData {
    pub fn new(env: &Env) -> Self {
        UserData {
            last_stake: 0,
            deposited: 0,
            rate: I256::from_i32(env, 0),
            pending_rewards: 0,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributionConfig {
    pub deposit_token: Address,
    pub l1_sender: Address,
}

#[contracttype]
pub enum DataKey {
    Owner,
    Config,
    Version,
    PoolCount,
    Pool(u32),
    PoolData(u32),
    UserData(Address, u32),
    TotalDepositedInPublicPools,
}

// ========== Instance ==========

pub fn has_owner(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Owner)
}

pub fn get_owner(env: &Env) -> Result<Address, DistributionError> {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .ok_or(DistributionError::NotInitialized)
}

pub fn set_owner(env: &Env, owner: &Address) {
    env.storage().instance().set(&DataKey::Owner, owner);
}

pub fn get_config(env: &Env) -> Result<DistributionConfig, DistributionError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(DistributionError::NotInitialized)
}

pub fn set_config(env: &Env, config: &DistributionConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_version(env: &Env) -> u32 {
    env.storage().instance().get(&DataKey::Version).unwrap_or(0)
}

pub fn set_version(env: &Env, version: u32) {
    env.storage().instance().set(&DataKey::Version, &version);
}

pub fn get_pool_count(env: &Env) -> u32 {
    env.storage().instance().get(&DataKey::PoolCount).unwrap_or(0)
}

pub fn set_pool_count(env: &Env, count: u32) {
    env.storage().instance().set(&DataKey::PoolCount, &count);
}

pub fn get_total_deposited_in_public_pools(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::TotalDepositedInPublicPools)
        .unwrap_or(0)
}

pub fn set_total_deposited_in_public_pools(env: &Env, amount: i128) {
    env.storage()
        .instance()
        .set(&DataKey::TotalDepositedInPublicPools, &amount);
}

pub fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
}

// ========== Pools ==========

pub fn get_pool(env: &Env, pool_id: u32) -> Result<Pool, DistributionError> {
    env.storage()
        .persistent()
        .get(&DataKey::Pool(pool_id))
        .ok_or(DistributionError::PoolNotFound)
}

pub fn set_pool(env: &Env, pool_id: u32, pool: &Pool) {
    let key = DataKey::Pool(pool_id);
    env.storage().persistent().set(&key, pool);
    extend_persistent(env, &key);
}

pub fn get_pool_data(env: &Env, pool_id: u32) -> PoolData {
    env.storage()
        .persistent()
        .get(&DataKey::PoolData(pool_id))
        .unwrap_or_else(|| PoolData::new(env))
}

pub fn set_pool_data(env: &Env, pool_id: u32, data: &PoolData) {
    let key = DataKey::PoolData(pool_id);
    env.storage().persistent().set(&key, data);
    extend_persistent(env, &key);
}

// ========== Users ==========

pub fn get_user_data(env: &Env, user: &Address, pool_id: u32) -> UserData {
    env.storage()
        .persistent()
        .get(&DataKey::UserData(user.clone(), pool_id))
        .unwrap_or_else(|| UserData::new(env))
}

pub fn set_user_data(env: &Env, user: &Address, pool_id: u32, data: &UserData) {
    let key = DataKey::UserData(user.clone(), pool_id);
    env.storage().persistent().set(&key, data);
    extend_persistent(env, &key);
}

fn extend_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
}
