#![no_std]
use morpheus_shared::interfaces::MessageReceiverClient;
use morpheus_shared::{Delivery, INSTANCE_TTL_EXTEND_TO, INSTANCE_TTL_THRESHOLD};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, xdr::ToXdr, Address,
    Bytes, Env,
};

// Storage Keys
#[contracttype]
pub enum DataKey {
    ChainId,
    Destination(u32),
    OutboundNonce(u32, Address),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum GatewayError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    UnknownDestination = 3,
}

/// In-ledger stand-in for a cross-chain endpoint: `send` delivers the payload
/// straight to the receiver registered for the destination chain.
#[contract]
pub struct GatewayMock;

#[contractimpl]
impl GatewayMock {
    /// Initialize the gateway with the chain id it reports as source
    pub fn initialize(env: Env, chain_id: u32) -> Result<(), GatewayError> {
        if env.storage().instance().has(&DataKey::ChainId) {
            return Err(GatewayError::AlreadyInitialized);
        }

        env.storage().instance().set(&DataKey::ChainId, &chain_id);
        Self::extend_ttl(&env);

        Ok(())
    }

    /// Register the receiver contract of a destination chain
    pub fn set_destination(env: Env, dst_chain_id: u32, receiver: Address) {
        env.storage()
            .instance()
            .set(&DataKey::Destination(dst_chain_id), &receiver);
        Self::extend_ttl(&env);
    }

    /// Returns the nonce assigned to the message.
    pub fn send(
        env: Env,
        sender: Address,
        dst_chain_id: u32,
        payload: Bytes,
    ) -> Result<u64, GatewayError> {
        sender.require_auth();

        let chain_id: u32 = env
            .storage()
            .instance()
            .get(&DataKey::ChainId)
            .ok_or(GatewayError::NotInitialized)?;
        let receiver: Address = env
            .storage()
            .instance()
            .get(&DataKey::Destination(dst_chain_id))
            .ok_or(GatewayError::UnknownDestination)?;

        let nonce_key = DataKey::OutboundNonce(dst_chain_id, sender.clone());
        let nonce = env.storage().instance().get(&nonce_key).unwrap_or(0u64) + 1;
        env.storage().instance().set(&nonce_key, &nonce);
        Self::extend_ttl(&env);

        let delivery = MessageReceiverClient::new(&env, &receiver).lz_receive(
            &env.current_contract_address(),
            &chain_id,
            &sender.clone().to_xdr(&env),
            &nonce,
            &payload,
        );

        env.events()
            .publish((symbol_short!("sent"), dst_chain_id, nonce), delivery);

        if delivery == Delivery::Failed {
            log!(&env, "Message {} to chain {} failed on delivery", nonce, dst_chain_id);
        }

        Ok(nonce)
    }

    pub fn outbound_nonce(env: Env, dst_chain_id: u32, sender: Address) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::OutboundNonce(dst_chain_id, sender))
            .unwrap_or(0)
    }

    fn extend_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
    }
}
