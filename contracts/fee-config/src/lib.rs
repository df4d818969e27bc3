#![no_std]
use morpheus_shared::{
    INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO,
    PERSISTENT_TTL_THRESHOLD, PRECISION,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, panic_with_error, symbol_short,
    Address, Env, Symbol,
};

// Storage Keys
#[contracttype]
pub enum DataKey {
    Owner,
    Treasury,
    BaseFee,
    BaseFeeForOperation(Symbol),
    Fee(Address),
    FeeForOperation(Address, Symbol),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FeeConfigError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidFee = 4,
    InvalidTreasury = 5,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeSetEvent {
    pub target: Option<Address>,
    pub operation: Option<Symbol>,
    pub fee: i128,
}

#[contract]
pub struct FeeConfig;

#[contractimpl]
impl FeeConfig {
    /// Initialize the fee configuration. The treasury falls back to the owner
    /// until one is set.
    pub fn initialize(
        env: Env,
        owner: Address,
        treasury: Option<Address>,
        base_fee: i128,
    ) -> Result<(), FeeConfigError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(FeeConfigError::AlreadyInitialized);
        }

        owner.require_auth();
        Self::validate_fee(base_fee)?;

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::BaseFee, &base_fee);
        if let Some(treasury) = treasury {
            Self::validate_treasury(&env, &treasury)?;
            env.storage().instance().set(&DataKey::Treasury, &treasury);
        }
        Self::extend_ttl(&env);

        log!(&env, "Fee config initialized by owner: {}, base fee: {}", owner, base_fee);

        Ok(())
    }

    /// Fee charged to `target` for every operation without its own entry
    pub fn set_fee(
        env: Env,
        owner: Address,
        target: Address,
        fee: i128,
    ) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;
        Self::validate_fee(fee)?;

        Self::write_fee(&env, &DataKey::Fee(target.clone()), fee);
        Self::publish_fee(&env, Some(target), None, fee);

        Ok(())
    }

    /// Fee charged to `target` for one operation
    pub fn set_fee_for_operation(
        env: Env,
        owner: Address,
        target: Address,
        operation: Symbol,
        fee: i128,
    ) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;
        Self::validate_fee(fee)?;

        Self::write_fee(
            &env,
            &DataKey::FeeForOperation(target.clone(), operation.clone()),
            fee,
        );
        Self::publish_fee(&env, Some(target), Some(operation), fee);

        Ok(())
    }

    /// Fee for every target without an override
    pub fn set_base_fee(env: Env, owner: Address, fee: i128) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;
        Self::validate_fee(fee)?;

        env.storage().instance().set(&DataKey::BaseFee, &fee);
        Self::publish_fee(&env, None, None, fee);

        Ok(())
    }

    /// Fee for one operation of every target without its own entry
    pub fn set_base_fee_for_operation(
        env: Env,
        owner: Address,
        operation: Symbol,
        fee: i128,
    ) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;
        Self::validate_fee(fee)?;

        Self::write_fee(&env, &DataKey::BaseFeeForOperation(operation.clone()), fee);
        Self::publish_fee(&env, None, Some(operation), fee);

        Ok(())
    }

    /// Drop the override of `target` so it falls back to the base fee again
    pub fn discard_fee(env: Env, owner: Address, target: Address) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;

        env.storage().persistent().remove(&DataKey::Fee(target.clone()));
        log!(&env, "Fee override discarded for {}", target);

        Ok(())
    }

    pub fn discard_fee_for_operation(
        env: Env,
        owner: Address,
        target: Address,
        operation: Symbol,
    ) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;

        env.storage()
            .persistent()
            .remove(&DataKey::FeeForOperation(target.clone(), operation.clone()));
        log!(&env, "Fee override discarded for {} on {}", target, operation);

        Ok(())
    }

    /// Admin function to change where fees are paid
    pub fn set_treasury(env: Env, owner: Address, treasury: Address) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;
        Self::validate_treasury(&env, &treasury)?;

        env.storage().instance().set(&DataKey::Treasury, &treasury);
        env.events()
            .publish((symbol_short!("treasury"),), treasury.clone());

        log!(&env, "Treasury set to: {}", treasury);

        Ok(())
    }

    pub fn transfer_ownership(
        env: Env,
        owner: Address,
        new_owner: Address,
    ) -> Result<(), FeeConfigError> {
        Self::require_owner(&env, &owner)?;

        env.storage().instance().set(&DataKey::Owner, &new_owner);
        log!(&env, "Ownership transferred from {} to {}", owner, new_owner);

        Ok(())
    }

    /// Fee of `target` and the treasury receiving it.
    pub fn get_fee_and_treasury(env: Env, target: Address) -> (i128, Address) {
        let fee = env
            .storage()
            .persistent()
            .get(&DataKey::Fee(target))
            .unwrap_or_else(|| Self::base_fee(&env));

        (fee, Self::treasury(&env))
    }

    /// Fee of `target` for one operation: the `(target, operation)` entry, then
    /// the base fee of the operation, then nothing.
    pub fn get_fee_and_treasury_for_op(
        env: Env,
        target: Address,
        operation: Symbol,
    ) -> (i128, Address) {
        let storage = env.storage().persistent();
        let fee = storage
            .get(&DataKey::FeeForOperation(target, operation.clone()))
            .or_else(|| storage.get(&DataKey::BaseFeeForOperation(operation)))
            .unwrap_or(0);

        (fee, Self::treasury(&env))
    }

    pub fn get_owner(env: Env) -> Result<Address, FeeConfigError> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(FeeConfigError::NotInitialized)
    }

    /// Treasury receiving fees, the owner when none is set
    pub fn get_treasury(env: Env) -> Address {
        Self::treasury(&env)
    }

    pub fn get_base_fee(env: Env) -> i128 {
        Self::base_fee(&env)
    }

    // Internal helper functions
    fn require_owner(env: &Env, caller: &Address) -> Result<(), FeeConfigError> {
        caller.require_auth();

        let owner = Self::get_owner(env.clone())?;
        if *caller != owner {
            return Err(FeeConfigError::Unauthorized);
        }

        Self::extend_ttl(env);
        Ok(())
    }

    fn validate_fee(fee: i128) -> Result<(), FeeConfigError> {
        if fee < 0 || fee >= PRECISION {
            return Err(FeeConfigError::InvalidFee);
        }
        Ok(())
    }

    fn validate_treasury(env: &Env, treasury: &Address) -> Result<(), FeeConfigError> {
        if *treasury == env.current_contract_address() {
            return Err(FeeConfigError::InvalidTreasury);
        }
        Ok(())
    }

    fn base_fee(env: &Env) -> i128 {
        env.storage().instance().get(&DataKey::BaseFee).unwrap_or(0)
    }

    fn treasury(env: &Env) -> Address {
        let storage = env.storage().instance();
        match storage.get(&DataKey::Treasury).or_else(|| storage.get(&DataKey::Owner)) {
            Some(treasury) => treasury,
            None => panic_with_error!(env, FeeConfigError::NotInitialized),
        }
    }

    fn publish_fee(env: &Env, target: Option<Address>, operation: Option<Symbol>, fee: i128) {
        let event = FeeSetEvent {
            target,
            operation,
            fee,
        };
        env.events().publish((symbol_short!("fee_set"),), event);

        log!(env, "Fee set to: {}", fee);
    }

    /// Per-target and per-operation entries are unbounded, so they live in
    /// persistent storage.
    fn write_fee(env: &Env, key: &DataKey, fee: i128) {
        env.storage().persistent().set(key, &fee);
        env.storage()
            .persistent()
            .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
    }

    fn extend_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
    }
}
