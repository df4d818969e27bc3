#![no_std]
use morpheus_shared::interfaces::GatewayClient;
use morpheus_shared::{MintPayload, INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, xdr::ToXdr,
    Address, Env,
};

// Data Types
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SenderConfig {
    /// Only contract allowed to queue messages
    pub distribution: Address,
    pub gateway: Address,
    pub dst_chain_id: u32,
    pub deposit_token: Address,
    pub deposit_token_receiver: Address,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Owner,
    Config,
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum SenderError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    NothingToSend = 5,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintMessageEvent {
    pub receiver: Address,
    pub amount: i128,
    pub dst_chain_id: u32,
    pub nonce: u64,
}

#[contract]
pub struct L1Sender;

#[contractimpl]
impl L1Sender {
    /// Initialize the sender with its distribution, gateway and token routes
    pub fn initialize(env: Env, owner: Address, config: SenderConfig) -> Result<(), SenderError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(SenderError::AlreadyInitialized);
        }

        owner.require_auth();

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Config, &config);
        Self::extend_ttl(&env);

        log!(&env, "L1 sender initialized, destination chain: {}", config.dst_chain_id);

        Ok(())
    }

    /// Admin function to update the sender configuration
    pub fn set_config(env: Env, owner: Address, config: SenderConfig) -> Result<(), SenderError> {
        owner.require_auth();

        let stored_owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(SenderError::NotInitialized)?;
        if stored_owner != owner {
            return Err(SenderError::Unauthorized);
        }

        env.storage().instance().set(&DataKey::Config, &config);
        Self::extend_ttl(&env);

        log!(&env, "L1 sender config updated by: {}", owner);

        Ok(())
    }

    /// Queue a reward mint for `receiver` on the destination chain.
    pub fn send_mint_message(
        env: Env,
        caller: Address,
        receiver: Address,
        amount: i128,
    ) -> Result<u64, SenderError> {
        let config = Self::require_distribution(&env, &caller)?;

        if amount <= 0 {
            return Err(SenderError::InvalidAmount);
        }

        let payload = MintPayload {
            receiver: receiver.clone(),
            amount,
        }
        .to_xdr(&env);

        let nonce = GatewayClient::new(&env, &config.gateway).send(
            &env.current_contract_address(),
            &config.dst_chain_id,
            &payload,
        );

        let event = MintMessageEvent {
            receiver,
            amount,
            dst_chain_id: config.dst_chain_id,
            nonce,
        };
        env.events().publish((symbol_short!("mint_msg"),), event);

        Ok(nonce)
    }

    /// Bridge everything the sender holds of the deposit token.
    pub fn send_deposit_token(env: Env, caller: Address) -> Result<i128, SenderError> {
        let config = Self::require_distribution(&env, &caller)?;

        let deposit_token = token::Client::new(&env, &config.deposit_token);
        let amount = deposit_token.balance(&env.current_contract_address());
        if amount <= 0 {
            return Err(SenderError::NothingToSend);
        }

        deposit_token.transfer(
            &env.current_contract_address(),
            &config.deposit_token_receiver,
            &amount,
        );

        env.events().publish(
            (symbol_short!("bridged"), config.deposit_token_receiver.clone()),
            amount,
        );

        log!(&env, "Bridged {} deposit tokens to {}", amount, config.deposit_token_receiver);

        Ok(amount)
    }

    /// Get contract configuration
    pub fn get_config(env: Env) -> Result<SenderConfig, SenderError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(SenderError::NotInitialized)
    }

    pub fn get_owner(env: Env) -> Result<Address, SenderError> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(SenderError::NotInitialized)
    }

    // Internal helper functions
    fn require_distribution(env: &Env, caller: &Address) -> Result<SenderConfig, SenderError> {
        caller.require_auth();

        let config = Self::get_config(env.clone())?;
        if *caller != config.distribution {
            return Err(SenderError::Unauthorized);
        }

        Self::extend_ttl(env);
        Ok(config)
    }

    fn extend_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
    }
}
