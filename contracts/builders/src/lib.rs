#![no_std]
use morpheus_shared::interfaces::FeeConfigClient;
use morpheus_shared::{
    mul_div, rate_increase, reward_for_rate, MathError, RewardCurve, CLAIM_OPERATION,
    DEPOSIT_OPERATION, INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO,
    PERSISTENT_TTL_THRESHOLD, PRECISION, WITHDRAW_OPERATION,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, xdr::ToXdr,
    Address, BytesN, Env, String, Symbol, Vec, I256,
};

// ============================================================================
// Data Types
// ============================================================================

/// Emission shared by all builder pools.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmissionCurve {
    pub initial_reward: i128,
    pub reward_decrease: i128,
    pub payout_start: u64,
    pub decrease_interval: u64,
}

impl EmissionCurve {
    fn curve(&self) -> RewardCurve {
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
pub struct BuildersConfig {
    /// Token staked by users and paid out as reward
    pub deposit_token: Address,
    pub fee_config: Address,
    pub emission: EmissionCurve,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderPool {
    pub name: String,
    pub admin: Address,
    pub pool_start: u64,
    pub withdraw_lock_after_deposit: u64,
    pub claim_lock_end: u64,
    pub minimal_deposit: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderPoolData {
    pub deposited: i128,
    pub rate: I256,
    pub pending_rewards: i128,
}

impl BuilderPoolData {
    pub fn new(env: &Env) -> Self {
        BuilderPoolData {
            deposited: 0,
            rate: I256::from_i32(env, 0),
            pending_rewards: 0,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuilderUserData {
    pub last_deposit: u64,
    pub deposited: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildersData {
    pub total_deposited: i128,
    /// Reward per deposited unit across all pools, scaled by `PRECISION`
    pub rate: I256,
    pub last_update: u64,
}

impl BuildersData {
    pub fn new(env: &Env) -> Self {
        BuildersData {
            total_deposited: 0,
            rate: I256::from_i32(env, 0),
            last_update: 0,
        }
    }
}

// ============================================================================
// Storage Keys
// ============================================================================

#[contracttype]
pub enum DataKey {
    Owner,
    Config,
    Totals,
    RewardReserve,
    Pool(BytesN<32>),
    PoolData(BytesN<32>),
    UserData(Address, BytesN<32>),
    Migrated(BytesN<32>, Address),
}

// ============================================================================
// Errors
// ============================================================================

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BuildersError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidName = 4,
    PoolExists = 5,
    PoolNotFound = 6,
    InvalidPoolStart = 7,
    PoolAlreadyStarted = 8,
    PoolNotStarted = 9,
    InvalidAmount = 10,
    AmountTooLow = 11,
    NothingToWithdraw = 12,
    InvalidWithdrawAmount = 13,
    WithdrawLocked = 14,
    ClaimLocked = 15,
    NothingToClaim = 16,
    InsufficientRewardReserve = 17,
    InvalidLength = 18,
    InvalidDecreaseInterval = 19,
    Overflow = 20,
    DivisionByZero = 21,
}

impl From<MathError> for BuildersError {
    fn from(error: MathError) -> Self {
        match error {
            MathError::DivisionByZero => BuildersError::DivisionByZero,
            _ => BuildersError::Overflow,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderDepositEvent {
    pub pool_id: BytesN<32>,
    pub user: Address,
    pub amount: i128,
    pub fee: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderWithdrawEvent {
    pub pool_id: BytesN<32>,
    pub user: Address,
    pub amount: i128,
    pub fee: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderClaimEvent {
    pub pool_id: BytesN<32>,
    pub receiver: Address,
    pub amount: i128,
    pub fee: i128,
}

#[contract]
pub struct Builders;

/// Builder pools (subnets). Users stake the reward token into a builder pool;
/// every pool earns from one global emission in proportion to what it holds,
/// and the pool admin claims the result.
#[contractimpl]
impl Builders {
    /// Initialize the builders contract with its emission curve
    pub fn initialize(env: Env, owner: Address, config: BuildersConfig) -> Result<(), BuildersError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(BuildersError::AlreadyInitialized);
        }

        owner.require_auth();
        if config.emission.decrease_interval == 0 {
            return Err(BuildersError::InvalidDecreaseInterval);
        }

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Config, &config);
        env.storage().instance().set(&DataKey::Totals, &BuildersData::new(&env));
        env.storage().instance().set(&DataKey::RewardReserve, &0i128);
        Self::extend_instance_ttl(&env);

        log!(&env, "Builders initialized by owner: {}", owner);

        Ok(())
    }

    /// Register a pool under the hash of its name. The caller becomes its admin.
    pub fn create_builder_pool(
        env: Env,
        caller: Address,
        pool: BuilderPool,
    ) -> Result<BytesN<32>, BuildersError> {
        caller.require_auth();
        Self::extend_instance_ttl(&env);

        if caller != pool.admin {
            return Err(BuildersError::Unauthorized);
        }
        Self::validate_pool(&pool)?;

        let pool_id = Self::get_pool_id(env.clone(), pool.name.clone());
        let key = DataKey::Pool(pool_id.clone());
        if env.storage().persistent().has(&key) {
            return Err(BuildersError::PoolExists);
        }

        Self::write_persistent(&env, &key, &pool);
        Self::write_persistent(
            &env,
            &DataKey::PoolData(pool_id.clone()),
            &BuilderPoolData::new(&env),
        );

        env.events()
            .publish((symbol_short!("pool_new"), pool_id.clone()), pool.admin);

        log!(&env, "Builder pool created: {}", pool.name);

        Ok(pool_id)
    }

    /// Change a pool before it starts. The name identifies the pool.
    pub fn edit_builder_pool(
        env: Env,
        caller: Address,
        pool: BuilderPool,
    ) -> Result<(), BuildersError> {
        caller.require_auth();
        Self::extend_instance_ttl(&env);

        let pool_id = Self::get_pool_id(env.clone(), pool.name.clone());
        let stored = Self::get_builder_pool(env.clone(), pool_id.clone())?;
        if caller != stored.admin {
            return Err(BuildersError::Unauthorized);
        }
        if env.ledger().timestamp() >= stored.pool_start {
            return Err(BuildersError::PoolAlreadyStarted);
        }
        Self::validate_pool(&pool)?;

        Self::write_persistent(&env, &DataKey::Pool(pool_id.clone()), &pool);

        env.events()
            .publish((symbol_short!("pool_edit"), pool_id), pool.admin);

        Ok(())
    }

    /// Deposit into a builder pool, paying the deposit fee to the treasury
    pub fn deposit(
        env: Env,
        user: Address,
        pool_id: BytesN<32>,
        amount: i128,
    ) -> Result<(), BuildersError> {
        user.require_auth();
        Self::extend_instance_ttl(&env);

        let pool = Self::get_builder_pool(env.clone(), pool_id.clone())?;
        let now = env.ledger().timestamp();
        if now < pool.pool_start {
            return Err(BuildersError::PoolNotStarted);
        }
        if amount <= 0 {
            return Err(BuildersError::InvalidAmount);
        }

        let config = Self::get_config(env.clone())?;
        let (fee, treasury) = Self::fee_for(&env, &config, DEPOSIT_OPERATION, amount)?;
        let net = amount - fee;

        let mut user_data = Self::get_user_data(env.clone(), user.clone(), pool_id.clone());
        if user_data.deposited + net < pool.minimal_deposit {
            return Err(BuildersError::AmountTooLow);
        }

        let deposit_token = token::Client::new(&env, &config.deposit_token);
        if fee > 0 {
            deposit_token.transfer(&user, &treasury, &fee);
        }
        deposit_token.transfer(&user, &env.current_contract_address(), &net);

        Self::update_pool_deposit(&env, &config, &pool_id, net)?;

        user_data.last_deposit = now;
        user_data.deposited += net;
        Self::write_persistent(
            &env,
            &DataKey::UserData(user.clone(), pool_id.clone()),
            &user_data,
        );

        let event = BuilderDepositEvent {
            pool_id,
            user: user.clone(),
            amount: net,
            fee,
        };
        env.events().publish((symbol_short!("deposit"),), event);

        log!(&env, "User {} deposited {} to builder pool", user, net);

        Ok(())
    }

    /// Returns what the user received after the withdraw fee.
    pub fn withdraw(
        env: Env,
        user: Address,
        pool_id: BytesN<32>,
        amount: i128,
    ) -> Result<i128, BuildersError> {
        user.require_auth();
        Self::extend_instance_ttl(&env);

        let pool = Self::get_builder_pool(env.clone(), pool_id.clone())?;
        let mut user_data = Self::get_user_data(env.clone(), user.clone(), pool_id.clone());

        let amount = amount.min(user_data.deposited);
        if amount <= 0 {
            return Err(BuildersError::NothingToWithdraw);
        }

        let now = env.ledger().timestamp();
        if now
            <= user_data
                .last_deposit
                .saturating_add(pool.withdraw_lock_after_deposit)
        {
            return Err(BuildersError::WithdrawLocked);
        }

        let remaining = user_data.deposited - amount;
        if remaining != 0 && remaining < pool.minimal_deposit {
            return Err(BuildersError::InvalidWithdrawAmount);
        }

        let config = Self::get_config(env.clone())?;
        Self::update_pool_deposit(&env, &config, &pool_id, -amount)?;

        user_data.deposited = remaining;
        Self::write_persistent(
            &env,
            &DataKey::UserData(user.clone(), pool_id.clone()),
            &user_data,
        );

        let (fee, treasury) = Self::fee_for(&env, &config, WITHDRAW_OPERATION, amount)?;
        let net = amount - fee;
        let deposit_token = token::Client::new(&env, &config.deposit_token);
        let contract = env.current_contract_address();
        if fee > 0 {
            deposit_token.transfer(&contract, &treasury, &fee);
        }
        deposit_token.transfer(&contract, &user, &net);

        let event = BuilderWithdrawEvent {
            pool_id,
            user: user.clone(),
            amount: net,
            fee,
        };
        env.events().publish((symbol_short!("withdraw"),), event);

        log!(&env, "User {} withdrew {} from builder pool", user, net);

        Ok(net)
    }

    /// Pay everything the pool earned to `receiver`. Pool admin only.
    pub fn claim(
        env: Env,
        caller: Address,
        pool_id: BytesN<32>,
        receiver: Address,
    ) -> Result<i128, BuildersError> {
        caller.require_auth();
        Self::extend_instance_ttl(&env);

        let pool = Self::get_builder_pool(env.clone(), pool_id.clone())?;
        if caller != pool.admin {
            return Err(BuildersError::Unauthorized);
        }
        if env.ledger().timestamp() <= pool.claim_lock_end {
            return Err(BuildersError::ClaimLocked);
        }

        let config = Self::get_config(env.clone())?;
        Self::update_pool_deposit(&env, &config, &pool_id, 0)?;

        let data_key = DataKey::PoolData(pool_id.clone());
        let mut pool_data = Self::get_builder_pool_data(env.clone(), pool_id.clone());
        let reward = pool_data.pending_rewards;
        if reward <= 0 {
            return Err(BuildersError::NothingToClaim);
        }

        let reserve = Self::reward_reserve(env.clone());
        if reserve < reward {
            return Err(BuildersError::InsufficientRewardReserve);
        }
        env.storage()
            .instance()
            .set(&DataKey::RewardReserve, &(reserve - reward));

        pool_data.pending_rewards = 0;
        Self::write_persistent(&env, &data_key, &pool_data);

        let (fee, treasury) = Self::fee_for(&env, &config, CLAIM_OPERATION, reward)?;
        let net = reward - fee;
        let deposit_token = token::Client::new(&env, &config.deposit_token);
        let contract = env.current_contract_address();
        if fee > 0 {
            deposit_token.transfer(&contract, &treasury, &fee);
        }
        deposit_token.transfer(&contract, &receiver, &net);

        let event = BuilderClaimEvent {
            pool_id,
            receiver,
            amount: net,
            fee,
        };
        env.events().publish((symbol_short!("claim"),), event);

        log!(&env, "Builder pool {} claimed {}", pool.name, net);

        Ok(net)
    }

    /// Top up the reserve rewards are paid from.
    pub fn fund_rewards(env: Env, funder: Address, amount: i128) -> Result<(), BuildersError> {
        funder.require_auth();

        if amount <= 0 {
            return Err(BuildersError::InvalidAmount);
        }

        let config = Self::get_config(env.clone())?;
        token::Client::new(&env, &config.deposit_token).transfer(
            &funder,
            &env.current_contract_address(),
            &amount,
        );

        let reserve = Self::reward_reserve(env.clone())
            .checked_add(amount)
            .ok_or(BuildersError::Overflow)?;
        env.storage().instance().set(&DataKey::RewardReserve, &reserve);
        Self::extend_instance_ttl(&env);

        env.events()
            .publish((symbol_short!("funded"), funder), amount);

        Ok(())
    }

    /// Import stakes kept by the previous builders contract. Users already
    /// imported into the pool are skipped, so an interrupted batch can be sent
    /// again. Tokens are moved separately.
    pub fn migrate_user_stakes(
        env: Env,
        owner: Address,
        pool_id: BytesN<32>,
        users: Vec<Address>,
        amounts: Vec<i128>,
    ) -> Result<u32, BuildersError> {
        Self::require_owner(&env, &owner)?;

        Self::get_builder_pool(env.clone(), pool_id.clone())?;
        if users.len() != amounts.len() {
            return Err(BuildersError::InvalidLength);
        }

        let config = Self::get_config(env.clone())?;
        let mut migrated = 0u32;
        for (user, amount) in users.iter().zip(amounts.iter()) {
            if amount < 0 {
                return Err(BuildersError::InvalidAmount);
            }

            let marker = DataKey::Migrated(pool_id.clone(), user.clone());
            if env.storage().persistent().has(&marker) {
                continue;
            }

            Self::update_pool_deposit(&env, &config, &pool_id, amount)?;

            let mut user_data = Self::get_user_data(env.clone(), user.clone(), pool_id.clone());
            user_data.deposited += amount;
            Self::write_persistent(
                &env,
                &DataKey::UserData(user.clone(), pool_id.clone()),
                &user_data,
            );
            Self::write_persistent(&env, &marker, &true);

            migrated += 1;
        }

        env.events()
            .publish((symbol_short!("migrated"), pool_id), migrated);

        log!(&env, "Migrated {} user stakes", migrated);

        Ok(migrated)
    }

    /// Admin function to hand the contract to a new owner
    pub fn transfer_ownership(
        env: Env,
        owner: Address,
        new_owner: Address,
    ) -> Result<(), BuildersError> {
        Self::require_owner(&env, &owner)?;

        env.storage().instance().set(&DataKey::Owner, &new_owner);

        log!(&env, "Ownership transferred from {} to {}", owner, new_owner);

        Ok(())
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Pool id for a builder pool name
    pub fn get_pool_id(env: Env, name: String) -> BytesN<32> {
        env.crypto().sha256(&name.to_xdr(&env)).into()
    }

    /// Get builder pool parameters
    pub fn get_builder_pool(env: Env, pool_id: BytesN<32>) -> Result<BuilderPool, BuildersError> {
        env.storage()
            .persistent()
            .get(&DataKey::Pool(pool_id))
            .ok_or(BuildersError::PoolNotFound)
    }

    pub fn get_builder_pool_data(env: Env, pool_id: BytesN<32>) -> BuilderPoolData {
        env.storage()
            .persistent()
            .get(&DataKey::PoolData(pool_id))
            .unwrap_or_else(|| BuilderPoolData::new(&env))
    }

    pub fn get_user_data(env: Env, user: Address, pool_id: BytesN<32>) -> BuilderUserData {
        env.storage()
            .persistent()
            .get(&DataKey::UserData(user, pool_id))
            .unwrap_or_default()
    }

    /// Get the emission ledger shared by all builder pools
    pub fn get_totals(env: Env) -> BuildersData {
        env.storage()
            .instance()
            .get(&DataKey::Totals)
            .unwrap_or_else(|| BuildersData::new(&env))
    }

    /// Reward the pool could claim right now, before the claim fee.
    pub fn get_current_builder_reward(
        env: Env,
        pool_id: BytesN<32>,
    ) -> Result<i128, BuildersError> {
        let config = Self::get_config(env.clone())?;
        let rate = Self::current_rate(&env, &config, &Self::get_totals(env.clone()))?;

        Self::pool_reward(&env, &rate, &Self::get_builder_pool_data(env.clone(), pool_id))
    }

    /// Rewards funded and not yet claimed
    pub fn reward_reserve(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::RewardReserve)
            .unwrap_or(0)
    }

    pub fn is_migrated(env: Env, pool_id: BytesN<32>, user: Address) -> bool {
        env.storage()
            .persistent()
            .has(&DataKey::Migrated(pool_id, user))
    }

    /// Get contract configuration
    pub fn get_config(env: Env) -> Result<BuildersConfig, BuildersError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(BuildersError::NotInitialized)
    }

    // ============================================================================
    // Internal helper functions
    // ============================================================================

    fn require_owner(env: &Env, caller: &Address) -> Result<(), BuildersError> {
        caller.require_auth();

        let owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(BuildersError::NotInitialized)?;
        if *caller != owner {
            return Err(BuildersError::Unauthorized);
        }

        Self::extend_instance_ttl(env);
        Ok(())
    }

    fn validate_pool(pool: &BuilderPool) -> Result<(), BuildersError> {
        if pool.name.len() == 0 {
            return Err(BuildersError::InvalidName);
        }
        if pool.pool_start == 0 {
            return Err(BuildersError::InvalidPoolStart);
        }
        if pool.minimal_deposit < 0 {
            return Err(BuildersError::InvalidAmount);
        }
        Ok(())
    }

    /// Fee on `amount` for `operation` and where it goes.
    fn fee_for(
        env: &Env,
        config: &BuildersConfig,
        operation: Symbol,
        amount: i128,
    ) -> Result<(i128, Address), BuildersError> {
        let (fee, treasury) = FeeConfigClient::new(env, &config.fee_config)
            .get_fee_and_treasury_for_op(&env.current_contract_address(), &operation);

        Ok((mul_div(env, amount, fee, PRECISION)?, treasury))
    }

    fn current_rate(
        env: &Env,
        config: &BuildersConfig,
        totals: &BuildersData,
    ) -> Result<I256, BuildersError> {
        if totals.total_deposited == 0 {
            return Ok(totals.rate.clone());
        }

        let reward = config
            .emission
            .curve()
            .period_reward(totals.last_update, env.ledger().timestamp())?;
        let increase = rate_increase(env, reward, totals.total_deposited)?;

        Ok(totals.rate.add(&increase))
    }

    fn pool_reward(env: &Env, rate: &I256, data: &BuilderPoolData) -> Result<i128, BuildersError> {
        let earned = reward_for_rate(env, &rate.sub(&data.rate), data.deposited)?;

        data.pending_rewards
            .checked_add(earned)
            .ok_or(BuildersError::Overflow)
    }

    /// Checkpoint the global rate and the pool's reward, then apply `delta` to
    /// the pool and the global deposit.
    fn update_pool_deposit(
        env: &Env,
        config: &BuildersConfig,
        pool_id: &BytesN<32>,
        delta: i128,
    ) -> Result<(), BuildersError> {
        let mut totals = Self::get_totals(env.clone());
        let rate = Self::current_rate(env, config, &totals)?;

        let mut pool_data = Self::get_builder_pool_data(env.clone(), pool_id.clone());
        pool_data.pending_rewards = Self::pool_reward(env, &rate, &pool_data)?;
        pool_data.rate = rate.clone();
        pool_data.deposited += delta;
        Self::write_persistent(env, &DataKey::PoolData(pool_id.clone()), &pool_data);

        totals.rate = rate;
        totals.last_update = env.ledger().timestamp();
        totals.total_deposited += delta;
        env.storage().instance().set(&DataKey::Totals, &totals);

        Ok(())
    }

    fn write_persistent<V>(env: &Env, key: &DataKey, value: &V)
    where
        V: soroban_sdk::IntoVal<Env, soroban_sdk::Val>,
    {
        env.storage().persistent().set(key, value);
        env.storage()
            .persistent()
            .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
    }

    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
    }
}
