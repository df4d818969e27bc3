#![no_std]

mod errors;
mod rewards;
mod storage;

use morpheus_shared::interfaces::L1SenderClient;
use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token, Address, BytesN, Env, Vec,
};

pub use errors::DistributionError;
pub use storage::{DistributionConfig, Pool, PoolData, UserData, STORAGE_VERSION};

// ========== Events ==========

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserStakedEvent {
    pub pool_id: u32,
    pub user: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserWithdrawnEvent {
    pub pool_id: u32,
    pub user: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserClaimedEvent {
    pub pool_id: u32,
    pub user: Address,
    pub receiver: Address,
    pub amount: i128,
}

#[contract]
pub struct Distribution;

#[contractimpl]
impl Distribution {
    // ========== Admin Functions ==========

    /// Initialize the distribution contract, optionally with a first set of pools
    pub fn initialize(
        env: Env,
        owner: Address,
        config: DistributionConfig,
        pools: Vec<Pool>,
    ) -> Result<(), DistributionError> {
        if storage::has_owner(&env) {
            return Err(DistributionError::AlreadyInitialized);
        }

        owner.require_auth();

        storage::set_owner(&env, &owner);
        storage::set_config(&env, &config);
        storage::set_version(&env, STORAGE_VERSION);
        storage::set_pool_count(&env, 0);
        storage::extend_instance_ttl(&env);

        for pool in pools.iter() {
            Self::add_pool(&env, &pool)?;
        }

        log!(&env, "Distribution initialized by owner: {}", owner);

        Ok(())
    }

    /// Admin function to add a pool, returns its id
    pub fn create_pool(env: Env, owner: Address, pool: Pool) -> Result<u32, DistributionError> {
        Self::require_owner(&env, &owner)?;

        Self::add_pool(&env, &pool)
    }

    /// Replace the parameters of a pool. Reward accrued so far is settled under
    /// the old parameters first.
    pub fn edit_pool(
        env: Env,
        owner: Address,
        pool_id: u32,
        pool: Pool,
    ) -> Result<(), DistributionError> {
        Self::require_owner(&env, &owner)?;
        Self::validate_pool(&pool)?;

        let old_pool = storage::get_pool(&env, pool_id)?;
        if old_pool.is_public != pool.is_public {
            return Err(DistributionError::InvalidPoolType);
        }

        let now = env.ledger().timestamp();
        let data = storage::get_pool_data(&env, pool_id);
        let rate = rewards::current_pool_rate(&env, &old_pool, &data, now)?;
        storage::set_pool_data(&env, pool_id, &rewards::checkpoint(&data, &rate, now));
        storage::set_pool(&env, pool_id, &pool);

        env.events()
            .publish((symbol_short!("pool_edit"), pool_id), pool);

        log!(&env, "Pool {} edited, checkpoint rate: {}", pool_id, rate);

        Ok(())
    }

    /// Set absolute deposits for users of a private pool. No tokens move.
    pub fn manage_users_in_private_pool(
        env: Env,
        owner: Address,
        pool_id: u32,
        users: Vec<Address>,
        amounts: Vec<i128>,
    ) -> Result<(), DistributionError> {
        Self::require_owner(&env, &owner)?;

        let pool = storage::get_pool(&env, pool_id)?;
        if pool.is_public {
            return Err(DistributionError::PoolIsPublic);
        }
        if users.len() != amounts.len() {
            return Err(DistributionError::InvalidLength);
        }

        for (user, amount) in users.iter().zip(amounts.iter()) {
            if amount < 0 {
                return Err(DistributionError::InvalidAmount);
            }

            let deposited = storage::get_user_data(&env, &user, pool_id).deposited;
            if deposited < amount {
                Self::stake_internal(&env, &user, pool_id, &pool, amount - deposited)?;
            } else if deposited > amount {
                Self::withdraw_internal(&env, &user, pool_id, &pool, deposited - amount)?;
            }
        }

        env.events()
            .publish((symbol_short!("users_set"), pool_id), users.len());

        Ok(())
    }

    /// Send deposit tokens exceeding what public pools owe their stakers to
    /// the L1 sender for bridging.
    pub fn bridge_overplus(env: Env, owner: Address) -> Result<i128, DistributionError> {
        Self::require_owner(&env, &owner)?;

        let overplus = Self::overplus(env.clone())?;
        if overplus <= 0 {
            return Err(DistributionError::OverplusIsZero);
        }

        let config = storage::get_config(&env)?;
        let contract = env.current_contract_address();
        token::Client::new(&env, &config.deposit_token).transfer(
            &contract,
            &config.l1_sender,
            &overplus,
        );
        L1SenderClient::new(&env, &config.l1_sender).send_deposit_token(&contract);

        env.events().publish((symbol_short!("overplus"),), overplus);

        log!(&env, "Bridged overplus: {}", overplus);

        Ok(overplus)
    }

    /// Admin function to replace the deposit token and L1 sender
    pub fn set_config(
        env: Env,
        owner: Address,
        config: DistributionConfig,
    ) -> Result<(), DistributionError> {
        Self::require_owner(&env, &owner)?;

        storage::set_config(&env, &config);

        log!(&env, "Config updated, L1 sender: {}", config.l1_sender);

        Ok(())
    }

    /// Admin function to hand the contract to a new owner
    pub fn transfer_ownership(
        env: Env,
        owner: Address,
        new_owner: Address,
    ) -> Result<(), DistributionError> {
        Self::require_owner(&env, &owner)?;

        storage::set_owner(&env, &new_owner);

        log!(&env, "Ownership transferred from {} to {}", owner, new_owner);

        Ok(())
    }

    /// Admin function to install new contract code
    pub fn upgrade(
        env: Env,
        owner: Address,
        new_wasm_hash: BytesN<32>,
    ) -> Result<(), DistributionError> {
        Self::require_owner(&env, &owner)?;

        env.deployer()
            .update_current_contract_wasm(new_wasm_hash.clone());
        env.events()
            .publish((symbol_short!("upgraded"),), new_wasm_hash);

        Ok(())
    }

    /// Step the stored schema to the next version.
    pub fn migrate(env: Env, owner: Address) -> Result<u32, DistributionError> {
        Self::require_owner(&env, &owner)?;

        let version = storage::get_version(&env);
        match version {
            // version 1 had no public deposit counter
            1 => {
                let mut total = 0i128;
                for pool_id in 0..storage::get_pool_count(&env) {
                    if storage::get_pool(&env, pool_id)?.is_public {
                        total += storage::get_pool_data(&env, pool_id).total_deposited;
                    }
                }
                storage::set_total_deposited_in_public_pools(&env, total);
            }
            _ => return Err(DistributionError::UnsupportedMigration),
        }

        let new_version = version + 1;
        storage::set_version(&env, new_version);
        env.events()
            .publish((symbol_short!("migrated"),), new_version);

        log!(&env, "Storage migrated from version {} to {}", version, new_version);

        Ok(new_version)
    }

    // ========== User Functions ==========

    /// Stake into a public pool. The credited amount is what the contract
    /// actually received.
    pub fn stake(
        env: Env,
        user: Address,
        pool_id: u32,
        amount: i128,
    ) -> Result<(), DistributionError> {
        user.require_auth();
        storage::extend_instance_ttl(&env);

        let pool = storage::get_pool(&env, pool_id)?;
        if !pool.is_public {
            return Err(DistributionError::PoolNotPublic);
        }
        if amount <= 0 {
            return Err(DistributionError::NothingToStake);
        }

        let config = storage::get_config(&env)?;
        let deposit_token = token::Client::new(&env, &config.deposit_token);
        let contract = env.current_contract_address();

        let balance_before = deposit_token.balance(&contract);
        deposit_token.transfer(&user, &contract, &amount);
        let received = deposit_token.balance(&contract) - balance_before;

        Self::stake_internal(&env, &user, pool_id, &pool, received)
    }

    /// Withdraw from a public pool. `WITHDRAW_ALL` takes out the whole deposit.
    pub fn withdraw(
        env: Env,
        user: Address,
        pool_id: u32,
        amount: i128,
    ) -> Result<i128, DistributionError> {
        user.require_auth();
        storage::extend_instance_ttl(&env);

        let pool = storage::get_pool(&env, pool_id)?;
        if !pool.is_public {
            return Err(DistributionError::PoolNotPublic);
        }

        Self::withdraw_internal(&env, &user, pool_id, &pool, amount)
    }

    /// Claim everything earned in a pool. The reward is minted to `receiver`
    /// on L2 through the L1 sender.
    pub fn claim(
        env: Env,
        user: Address,
        pool_id: u32,
        receiver: Address,
    ) -> Result<i128, DistributionError> {
        user.require_auth();
        storage::extend_instance_ttl(&env);

        let pool = storage::get_pool(&env, pool_id)?;
        let now = env.ledger().timestamp();
        if now <= pool.payout_start.saturating_add(pool.claim_lock_period) {
            return Err(DistributionError::ClaimLocked);
        }

        let data = storage::get_pool_data(&env, pool_id);
        let rate = rewards::current_pool_rate(&env, &pool, &data, now)?;

        let mut user_data = storage::get_user_data(&env, &user, pool_id);
        let pending = rewards::current_user_reward(&env, &rate, &user_data)?;
        if pending <= 0 {
            return Err(DistributionError::NothingToClaim);
        }

        storage::set_pool_data(&env, pool_id, &rewards::checkpoint(&data, &rate, now));

        user_data.rate = rate;
        user_data.pending_rewards = 0;
        storage::set_user_data(&env, &user, pool_id, &user_data);

        let config = storage::get_config(&env)?;
        L1SenderClient::new(&env, &config.l1_sender).send_mint_message(
            &env.current_contract_address(),
            &receiver,
            &pending,
        );

        let event = UserClaimedEvent {
            pool_id,
            user: user.clone(),
            receiver,
            amount: pending,
        };
        env.events().publish((symbol_short!("claimed"),), event);

        log!(&env, "User {} claimed {} from pool {}", user, pending, pool_id);

        Ok(pending)
    }

    // ========== View Functions ==========

    /// Get pool parameters
    pub fn get_pool(env: Env, pool_id: u32) -> Result<Pool, DistributionError> {
        storage::get_pool(&env, pool_id)
    }

    /// Get the reward ledger of a pool as of its last checkpoint
    pub fn get_pool_data(env: Env, pool_id: u32) -> PoolData {
        storage::get_pool_data(&env, pool_id)
    }

    pub fn get_pool_count(env: Env) -> u32 {
        storage::get_pool_count(&env)
    }

    /// Reward a pool emits between two timestamps
    pub fn get_period_reward(
        env: Env,
        pool_id: u32,
        start: u64,
        end: u64,
    ) -> Result<i128, DistributionError> {
        let pool = storage::get_pool(&env, pool_id)?;
        Ok(pool.curve().period_reward(start, end)?)
    }

    /// Get user's stake in a pool
    pub fn get_user_data(env: Env, user: Address, pool_id: u32) -> UserData {
        storage::get_user_data(&env, &user, pool_id)
    }

    /// Calculate pending rewards for a user
    pub fn get_current_user_reward(
        env: Env,
        pool_id: u32,
        user: Address,
    ) -> Result<i128, DistributionError> {
        let pool = storage::get_pool(&env, pool_id)?;
        let data = storage::get_pool_data(&env, pool_id);
        let rate = rewards::current_pool_rate(&env, &pool, &data, env.ledger().timestamp())?;

        rewards::current_user_reward(&env, &rate, &storage::get_user_data(&env, &user, pool_id))
    }

    /// Deposit tokens held beyond the public pool deposits, e.g. rebasing yield.
    pub fn overplus(env: Env) -> Result<i128, DistributionError> {
        let config = storage::get_config(&env)?;
        let balance =
            token::Client::new(&env, &config.deposit_token).balance(&env.current_contract_address());
        let deposited = storage::get_total_deposited_in_public_pools(&env);

        if balance <= deposited {
            return Ok(0);
        }
        Ok(balance - deposited)
    }

    /// Get total amount staked in public pools
    pub fn total_deposited_in_public_pools(env: Env) -> i128 {
        storage::get_total_deposited_in_public_pools(&env)
    }

    /// Get contract configuration
    pub fn get_config(env: Env) -> Result<DistributionConfig, DistributionError> {
        storage::get_config(&env)
    }

    pub fn get_owner(env: Env) -> Result<Address, DistributionError> {
        storage::get_owner(&env)
    }

    /// Storage schema version
    pub fn version(env: Env) -> u32 {
        storage::get_version(&env)
    }

    // ========== Internal Functions ==========

    fn require_owner(env: &Env, caller: &Address) -> Result<(), DistributionError> {
        caller.require_auth();

        if *caller != storage::get_owner(env)? {
            return Err(DistributionError::Unauthorized);
        }

        storage::extend_instance_ttl(env);
        Ok(())
    }

    fn validate_pool(pool: &Pool) -> Result<(), DistributionError> {
        if pool.payout_start == 0 {
            return Err(DistributionError::InvalidPayoutStart);
        }
        if pool.decrease_interval == 0 {
            return Err(DistributionError::InvalidDecreaseInterval);
        }
        if pool.initial_reward < 0 || pool.reward_decrease < 0 || pool.minimal_stake < 0 {
            return Err(DistributionError::InvalidPoolParams);
        }
        Ok(())
    }

    fn add_pool(env: &Env, pool: &Pool) -> Result<u32, DistributionError> {
        Self::validate_pool(pool)?;

        let pool_id = storage::get_pool_count(env);
        storage::set_pool(env, pool_id, pool);
        storage::set_pool_data(env, pool_id, &PoolData::new(env));
        storage::set_pool_count(env, pool_id + 1);

        env.events()
            .publish((symbol_short!("pool_new"), pool_id), pool.clone());

        log!(env, "Pool {} created, public: {}", pool_id, pool.is_public);

        Ok(pool_id)
    }

    fn stake_internal(
        env: &Env,
        user: &Address,
        pool_id: u32,
        pool: &Pool,
        amount: i128,
    ) -> Result<(), DistributionError> {
        let now = env.ledger().timestamp();
        let data = storage::get_pool_data(env, pool_id);
        let rate = rewards::current_pool_rate(env, pool, &data, now)?;

        let mut user_data = storage::get_user_data(env, user, pool_id);
        let deposited = user_data
            .deposited
            .checked_add(amount)
            .ok_or(DistributionError::Overflow)?;
        if pool.is_public && deposited < pool.minimal_stake {
            return Err(DistributionError::AmountTooLow);
        }

        user_data.pending_rewards = rewards::current_user_reward(env, &rate, &user_data)?;
        user_data.rate = rate.clone();
        user_data.deposited = deposited;
        user_data.last_stake = now;
        storage::set_user_data(env, user, pool_id, &user_data);

        let mut data = rewards::checkpoint(&data, &rate, now);
        data.total_deposited += amount;
        storage::set_pool_data(env, pool_id, &data);

        if pool.is_public {
            let total = storage::get_total_deposited_in_public_pools(env) + amount;
            storage::set_total_deposited_in_public_pools(env, total);
        }

        let event = UserStakedEvent {
            pool_id,
            user: user.clone(),
            amount,
        };
        env.events().publish((symbol_short!("staked"),), event);

        log!(env, "User {} staked {} in pool {}", user, amount, pool_id);

        Ok(())
    }

    fn withdraw_internal(
        env: &Env,
        user: &Address,
        pool_id: u32,
        pool: &Pool,
        amount: i128,
    ) -> Result<i128, DistributionError> {
        let now = env.ledger().timestamp();
        let mut user_data = storage::get_user_data(env, user, pool_id);
        if user_data.deposited <= 0 {
            return Err(DistributionError::UserNotStaked);
        }

        let mut amount = amount.min(user_data.deposited);

        let config = storage::get_config(env)?;
        let deposit_token = token::Client::new(env, &config.deposit_token);
        let contract = env.current_contract_address();

        if pool.is_public {
            let unlocked = now < pool.payout_start
                || (now > pool.payout_start.saturating_add(pool.withdraw_lock_period)
                    && now
                        > user_data
                            .last_stake
                            .saturating_add(pool.withdraw_lock_after_stake));
            if !unlocked {
                return Err(DistributionError::WithdrawLocked);
            }

            // a negative rebase can leave less than was deposited
            amount = amount.min(deposit_token.balance(&contract));
        }

        if amount <= 0 {
            return Err(DistributionError::NothingToWithdraw);
        }

        let remaining = user_data.deposited - amount;
        if pool.is_public && remaining != 0 && remaining < pool.minimal_stake {
            return Err(DistributionError::InvalidWithdrawAmount);
        }

        let data = storage::get_pool_data(env, pool_id);
        let rate = rewards::current_pool_rate(env, pool, &data, now)?;

        user_data.pending_rewards = rewards::current_user_reward(env, &rate, &user_data)?;
        user_data.rate = rate.clone();
        user_data.deposited = remaining;
        storage::set_user_data(env, user, pool_id, &user_data);

        let mut data = rewards::checkpoint(&data, &rate, now);
        data.total_deposited -= amount;
        storage::set_pool_data(env, pool_id, &data);

        if pool.is_public {
            let total = storage::get_total_deposited_in_public_pools(env) - amount;
            storage::set_total_deposited_in_public_pools(env, total);

            deposit_token.transfer(&contract, user, &amount);
        }

        let event = UserWithdrawnEvent {
            pool_id,
            user: user.clone(),
            amount,
        };
        env.events().publish((symbol_short!("withdrawn"),), event);

        log!(env, "User {} withdrew {} from pool {}", user, amount, pool_id);

        Ok(amount)
    }
}

mod test;
