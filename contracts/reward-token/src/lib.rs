#![no_std]
use morpheus_shared::{
    INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO,
    PERSISTENT_TTL_THRESHOLD,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, Address, Env, String,
};

// Data Types
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenMetadata {
    pub decimal: u32,
    pub name: String,
    pub symbol: String,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Admin,
    Minter,
    Cap,
    TotalSupply,
    Metadata,
    Balance(Address),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum TokenError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    InvalidCap = 5,
    CapExceeded = 6,
    InsufficientBalance = 7,
    NumericOverflow = 8,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintEvent {
    pub to: Address,
    pub amount: i128,
    pub total_supply: i128,
}

#[contract]
pub struct RewardToken;

/// Reward token with a hard supply cap. Only the configured minter (the L2
/// message receiver) can create new tokens.
#[contractimpl]
impl RewardToken {
    /// Initialize the token with its minter, cap and metadata
    pub fn initialize(
        env: Env,
        admin: Address,
        minter: Address,
        cap: i128,
        decimal: u32,
        name: String,
        symbol: String,
    ) -> Result<(), TokenError> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(TokenError::AlreadyInitialized);
        }
        if cap <= 0 {
            return Err(TokenError::InvalidCap);
        }

        admin.require_auth();

        let metadata = TokenMetadata {
            decimal,
            name,
            symbol,
        };

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Minter, &minter);
        env.storage().instance().set(&DataKey::Cap, &cap);
        env.storage().instance().set(&DataKey::TotalSupply, &0i128);
        env.storage().instance().set(&DataKey::Metadata, &metadata);
        Self::extend_instance_ttl(&env);

        log!(&env, "Reward token initialized with cap {} and minter {}", cap, minter);

        Ok(())
    }

    /// Mint new tokens, minter only and never past the cap
    pub fn mint(env: Env, to: Address, amount: i128) -> Result<(), TokenError> {
        let minter = Self::get_minter(env.clone())?;
        minter.require_auth();

        if amount <= 0 {
            return Err(TokenError::InvalidAmount);
        }

        let total_supply = Self::total_supply(env.clone())
            .checked_add(amount)
            .ok_or(TokenError::NumericOverflow)?;
        if total_supply > Self::cap(env.clone()) {
            return Err(TokenError::CapExceeded);
        }

        let balance = Self::balance(env.clone(), to.clone()) + amount;
        Self::write_balance(&env, &to, balance);
        env.storage().instance().set(&DataKey::TotalSupply, &total_supply);
        Self::extend_instance_ttl(&env);

        let event = MintEvent {
            to: to.clone(),
            amount,
            total_supply,
        };
        env.events().publish((symbol_short!("mint"),), event);

        log!(&env, "Minted {} to {}", amount, to);

        Ok(())
    }

    /// Burning frees room under the cap for future mints
    pub fn burn(env: Env, from: Address, amount: i128) -> Result<(), TokenError> {
        from.require_auth();

        if amount <= 0 {
            return Err(TokenError::InvalidAmount);
        }

        let balance = Self::balance(env.clone(), from.clone());
        if balance < amount {
            return Err(TokenError::InsufficientBalance);
        }

        Self::write_balance(&env, &from, balance - amount);
        let total_supply = Self::total_supply(env.clone()) - amount;
        env.storage().instance().set(&DataKey::TotalSupply, &total_supply);
        Self::extend_instance_ttl(&env);

        env.events()
            .publish((symbol_short!("burn"), from.clone()), amount);

        log!(&env, "Burned {} from {}", amount, from);

        Ok(())
    }

    /// Move tokens between holders
    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) -> Result<(), TokenError> {
        from.require_auth();

        if amount < 0 {
            return Err(TokenError::InvalidAmount);
        }

        let from_balance = Self::balance(env.clone(), from.clone());
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance);
        }

        Self::write_balance(&env, &from, from_balance - amount);
        let to_balance = Self::balance(env.clone(), to.clone())
            .checked_add(amount)
            .ok_or(TokenError::NumericOverflow)?;
        Self::write_balance(&env, &to, to_balance);

        env.events()
            .publish((symbol_short!("transfer"), from, to), amount);

        Ok(())
    }

    /// Admin function to change the minter
    pub fn set_minter(env: Env, admin: Address, minter: Address) -> Result<(), TokenError> {
        admin.require_auth();

        let stored_admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(TokenError::NotInitialized)?;
        if stored_admin != admin {
            return Err(TokenError::Unauthorized);
        }

        env.storage().instance().set(&DataKey::Minter, &minter);
        Self::extend_instance_ttl(&env);

        log!(&env, "Minter set to: {}", minter);

        Ok(())
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Balance(id))
            .unwrap_or(0)
    }

    pub fn total_supply(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalSupply)
            .unwrap_or(0)
    }

    /// Maximum total supply
    pub fn cap(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::Cap).unwrap_or(0)
    }

    pub fn get_minter(env: Env) -> Result<Address, TokenError> {
        env.storage()
            .instance()
            .get(&DataKey::Minter)
            .ok_or(TokenError::NotInitialized)
    }

    pub fn decimals(env: Env) -> Result<u32, TokenError> {
        Ok(Self::metadata(&env)?.decimal)
    }

    pub fn name(env: Env) -> Result<String, TokenError> {
        Ok(Self::metadata(&env)?.name)
    }

    pub fn symbol(env: Env) -> Result<String, TokenError> {
        Ok(Self::metadata(&env)?.symbol)
    }

    // Internal helper functions
    fn metadata(env: &Env) -> Result<TokenMetadata, TokenError> {
        env.storage()
            .instance()
            .get(&DataKey::Metadata)
            .ok_or(TokenError::NotInitialized)
    }

    fn write_balance(env: &Env, id: &Address, balance: i128) {
        let key = DataKey::Balance(id.clone());
        env.storage().persistent().set(&key, &balance);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
    }

    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
    }
}
