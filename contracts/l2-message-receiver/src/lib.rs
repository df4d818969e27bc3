#![no_std]
use morpheus_shared::interfaces::RewardTokenClient;
use morpheus_shared::{
    Delivery, MintPayload, INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD,
    PERSISTENT_TTL_EXTEND_TO, PERSISTENT_TTL_THRESHOLD,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, xdr::FromXdr, Address,
    Bytes, BytesN, Env,
};

// Data Types
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReceiverConfig {
    pub gateway: Address,
    /// Address of the L1 sender as the gateway reports it
    pub sender: Bytes,
    pub sender_chain_id: u32,
}

/// Why a payload could not be applied.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureReason {
    UndecodablePayload,
    InvalidAmount,
    CapExceeded,
    /// The reward token rejected the mint or could not be reached
    MintFailed,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Owner,
    RewardToken,
    Config,
    LastNonce(u32, Bytes),
    FailedMessage(u32, Bytes, u64),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ReceiverError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidGateway = 4,
    InvalidSenderChainId = 5,
    InvalidSenderAddress = 6,
    InvalidNonce = 7,
    NoStoredMessage = 8,
    InvalidPayload = 9,
    InvalidAmount = 10,
    CapExceeded = 11,
    MintFailed = 12,
}

impl From<FailureReason> for ReceiverError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::UndecodablePayload => ReceiverError::InvalidPayload,
            FailureReason::InvalidAmount => ReceiverError::InvalidAmount,
            FailureReason::CapExceeded => ReceiverError::CapExceeded,
            FailureReason::MintFailed => ReceiverError::MintFailed,
        }
    }
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageFailedEvent {
    pub src_chain_id: u32,
    pub src_address: Bytes,
    pub nonce: u64,
    pub payload: Bytes,
    pub reason: FailureReason,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageDeliveredEvent {
    pub src_chain_id: u32,
    pub src_address: Bytes,
    pub nonce: u64,
    pub receiver: Address,
    pub amount: i128,
}

#[contract]
pub struct L2MessageReceiver;

#[contractimpl]
impl L2MessageReceiver {
    /// Initialize the receiver with the reward token and the trusted route
    pub fn initialize(
        env: Env,
        owner: Address,
        reward_token: Address,
        config: ReceiverConfig,
    ) -> Result<(), ReceiverError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(ReceiverError::AlreadyInitialized);
        }

        owner.require_auth();

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::RewardToken, &reward_token);
        env.storage().instance().set(&DataKey::Config, &config);
        Self::extend_instance_ttl(&env);

        log!(&env, "L2 message receiver initialized by owner: {}", owner);

        Ok(())
    }

    /// Admin function to change the reward token or the trusted route
    pub fn set_params(
        env: Env,
        owner: Address,
        reward_token: Address,
        config: ReceiverConfig,
    ) -> Result<(), ReceiverError> {
        owner.require_auth();

        let stored_owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(ReceiverError::NotInitialized)?;
        if stored_owner != owner {
            return Err(ReceiverError::Unauthorized);
        }

        env.storage().instance().set(&DataKey::RewardToken, &reward_token);
        env.storage().instance().set(&DataKey::Config, &config);
        Self::extend_instance_ttl(&env);

        log!(&env, "Receiver params updated, sender chain: {}", config.sender_chain_id);

        Ok(())
    }

    /// Entry point of the gateway. Routing problems are rejected outright; a
    /// payload that cannot be applied is parked in the failed message table and
    /// reported as `Delivery::Failed` without reverting the delivery.
    pub fn lz_receive(
        env: Env,
        gateway: Address,
        src_chain_id: u32,
        src_address: Bytes,
        nonce: u64,
        payload: Bytes,
    ) -> Result<Delivery, ReceiverError> {
        gateway.require_auth();

        let config = Self::get_config(env.clone())?;
        if gateway != config.gateway {
            return Err(ReceiverError::InvalidGateway);
        }
        Self::validate_sender(&config, src_chain_id, &src_address)?;

        let nonce_key = DataKey::LastNonce(src_chain_id, src_address.clone());
        let last_nonce: u64 = env.storage().persistent().get(&nonce_key).unwrap_or(0);
        if nonce <= last_nonce {
            return Err(ReceiverError::InvalidNonce);
        }

        let failed_key = DataKey::FailedMessage(src_chain_id, src_address.clone(), nonce);

        match Self::apply_payload(&env, &payload) {
            Ok(message) => {
                Self::write_persistent(&env, &nonce_key, &nonce);
                env.storage().persistent().remove(&failed_key);
                Self::publish_delivered(&env, src_chain_id, src_address, nonce, message);

                Ok(Delivery::Delivered)
            }
            Err(reason) => {
                let payload_hash: BytesN<32> = env.crypto().keccak256(&payload).into();
                Self::write_persistent(&env, &failed_key, &payload_hash);

                let event = MessageFailedEvent {
                    src_chain_id,
                    src_address,
                    nonce,
                    payload,
                    reason,
                };
                env.events().publish((symbol_short!("msg_fail"),), event);

                log!(&env, "Message {} parked as failed: {}", nonce, reason);

                Ok(Delivery::Failed)
            }
        }
    }

    /// Apply a previously failed message again. Any failure here reverts.
    pub fn retry_message(
        env: Env,
        src_chain_id: u32,
        src_address: Bytes,
        nonce: u64,
        payload: Bytes,
    ) -> Result<(), ReceiverError> {
        let failed_key = DataKey::FailedMessage(src_chain_id, src_address.clone(), nonce);
        let payload_hash: BytesN<32> = env
            .storage()
            .persistent()
            .get(&failed_key)
            .ok_or(ReceiverError::NoStoredMessage)?;

        let received_hash: BytesN<32> = env.crypto().keccak256(&payload).into();
        if received_hash != payload_hash {
            return Err(ReceiverError::InvalidPayload);
        }

        let config = Self::get_config(env.clone())?;
        Self::validate_sender(&config, src_chain_id, &src_address)?;

        let message = Self::apply_payload(&env, &payload)?;

        env.storage().persistent().remove(&failed_key);

        // A retried nonce can never be delivered again through the gateway
        let nonce_key = DataKey::LastNonce(src_chain_id, src_address.clone());
        let last_nonce: u64 = env.storage().persistent().get(&nonce_key).unwrap_or(0);
        if nonce > last_nonce {
            Self::write_persistent(&env, &nonce_key, &nonce);
        }

        env.events()
            .publish((symbol_short!("msg_retry"), src_chain_id, nonce), payload_hash);
        Self::publish_delivered(&env, src_chain_id, src_address, nonce, message);

        Ok(())
    }

    /// Payload hash of a parked message, if any
    pub fn failed_message(
        env: Env,
        src_chain_id: u32,
        src_address: Bytes,
        nonce: u64,
    ) -> Option<BytesN<32>> {
        env.storage()
            .persistent()
            .get(&DataKey::FailedMessage(src_chain_id, src_address, nonce))
    }

    /// Highest nonce applied for a source
    pub fn last_nonce(env: Env, src_chain_id: u32, src_address: Bytes) -> u64 {
        env.storage()
            .persistent()
            .get(&DataKey::LastNonce(src_chain_id, src_address))
            .unwrap_or(0)
    }

    pub fn get_config(env: Env) -> Result<ReceiverConfig, ReceiverError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(ReceiverError::NotInitialized)
    }

    pub fn get_reward_token(env: Env) -> Result<Address, ReceiverError> {
        env.storage()
            .instance()
            .get(&DataKey::RewardToken)
            .ok_or(ReceiverError::NotInitialized)
    }

    // Internal helper functions
    fn validate_sender(
        config: &ReceiverConfig,
        src_chain_id: u32,
        src_address: &Bytes,
    ) -> Result<(), ReceiverError> {
        if src_chain_id != config.sender_chain_id {
            return Err(ReceiverError::InvalidSenderChainId);
        }
        if *src_address != config.sender {
            return Err(ReceiverError::InvalidSenderAddress);
        }
        Ok(())
    }

    /// Mint the reward described by `payload`. Every token call goes through
    /// the `try_` client so a rejected mint never aborts the caller.
    fn apply_payload(env: &Env, payload: &Bytes) -> Result<MintPayload, FailureReason> {
        let message =
            MintPayload::from_xdr(env, payload).map_err(|_| FailureReason::UndecodablePayload)?;
        if message.amount <= 0 {
            return Err(FailureReason::InvalidAmount);
        }

        let reward_token =
            Self::get_reward_token(env.clone()).map_err(|_| FailureReason::MintFailed)?;
        let token = RewardTokenClient::new(env, &reward_token);

        let headroom = match (token.try_cap(), token.try_total_supply()) {
            (Ok(Ok(cap)), Ok(Ok(total_supply))) => cap - total_supply,
            _ => return Err(FailureReason::MintFailed),
        };
        if message.amount > headroom {
            return Err(FailureReason::CapExceeded);
        }

        match token.try_mint(&message.receiver, &message.amount) {
            Ok(Ok(())) => Ok(message),
            _ => Err(FailureReason::MintFailed),
        }
    }

    fn publish_delivered(
        env: &Env,
        src_chain_id: u32,
        src_address: Bytes,
        nonce: u64,
        message: MintPayload,
    ) {
        log!(env, "Message {} minted {} to {}", nonce, message.amount, message.receiver);

        let event = MessageDeliveredEvent {
            src_chain_id,
            src_address,
            nonce,
            receiver: message.receiver,
            amount: message.amount,
        };
        env.events().publish((symbol_short!("msg_ok"),), event);
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
