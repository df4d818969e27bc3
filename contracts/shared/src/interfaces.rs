//! Client bindings for calls between Morpheus contracts. Each trait mirrors the
//! entry points of the contract it names, so callers depend on this crate only.

use soroban_sdk::{contractclient, Address, Bytes, Env, Symbol};

use crate::Delivery;

#[contractclient(name = "FeeConfigClient")]
pub trait FeeConfigInterface {
    fn get_fee_and_treasury(env: Env, target: Address) -> (i128, Address);

    fn get_fee_and_treasury_for_op(env: Env, target: Address, operation: Symbol) -> (i128, Address);
}

#[contractclient(name = "L1SenderClient")]
pub trait L1SenderInterface {
    /// Queue a reward mint for `receiver` on the destination chain.
    /// Returns the gateway nonce of the message.
    fn send_mint_message(env: Env, caller: Address, receiver: Address, amount: i128) -> u64;

    /// Bridge the whole deposit token balance held by the sender.
    fn send_deposit_token(env: Env, caller: Address) -> i128;
}

#[contractclient(name = "GatewayClient")]
pub trait GatewayInterface {
    fn send(env: Env, sender: Address, dst_chain_id: u32, payload: Bytes) -> u64;
}

#[contractclient(name = "MessageReceiverClient")]
pub trait MessageReceiverInterface {
    fn lz_receive(
        env: Env,
        gateway: Address,
        src_chain_id: u32,
        src_address: Bytes,
        nonce: u64,
        payload: Bytes,
    ) -> Delivery;
}

#[contractclient(name = "RewardTokenClient")]
pub trait RewardTokenInterface {
    fn mint(env: Env, to: Address, amount: i128);

    fn burn(env: Env, from: Address, amount: i128);

    fn balance(env: Env, id: Address) -> i128;

    fn total_supply(env: Env) -> i128;

    fn cap(env: Env) -> i128;
}
