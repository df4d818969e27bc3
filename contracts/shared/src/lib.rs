#![no_std]
//! Shared data types used across all Morpheus contracts.
//! Anything that crosses a contract boundary lives here so both ends agree on
//! the encoding.

use soroban_sdk::{contracttype, symbol_short, Address, Symbol};

pub mod interfaces;
pub mod linear_distribution;
pub mod log_exp_math;
pub mod precision;

pub use linear_distribution::RewardCurve;
pub use precision::{mul_div, rate_increase, reward_for_rate, PRECISION};

// ============================================================================
// Errors
// ============================================================================

/// Failures of the fixed-point helpers. Contracts map these into their own
/// error enums.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MathError {
    Overflow,
    DivisionByZero,
    InvalidExponent,
    OutOfBounds,
    XOutOfBounds,
    YOutOfBounds,
    ProductOutOfBounds,
}

// ============================================================================
// Cross-Chain Messaging Types
// ============================================================================

/// Body of a reward mint message sent from L1 to L2.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintPayload {
    pub receiver: Address,
    pub amount: i128,
}

/// Outcome of handing a message to the L2 receiver.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
    Delivered,
    Failed,
}

// ============================================================================
// Fee Operations
// ============================================================================

pub const DEPOSIT_OPERATION: Symbol = symbol_short!("deposit");
pub const WITHDRAW_OPERATION: Symbol = symbol_short!("withdraw");
pub const CLAIM_OPERATION: Symbol = symbol_short!("claim");

// ============================================================================
// Constants
// ============================================================================

/// Seconds in a day
pub const SECONDS_PER_DAY: u64 = 86400;

/// Sentinel amount meaning "everything the user has"
pub const WITHDRAW_ALL: i128 = i128::MAX;

/// Instance storage is kept alive for roughly 30 days of ledgers
pub const INSTANCE_TTL_THRESHOLD: u32 = 17280 * 15;
pub const INSTANCE_TTL_EXTEND_TO: u32 = 17280 * 30;

/// Persistent entries (user ledgers, dead letters) get a longer lease
pub const PERSISTENT_TTL_THRESHOLD: u32 = 17280 * 30;
pub const PERSISTENT_TTL_EXTEND_TO: u32 = 17280 * 90;
