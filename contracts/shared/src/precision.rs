use soroban_sdk::{Env, I256};

use crate::MathError;

/// Fixed-point unit of reward rates and fee rates (25 decimals).
pub const PRECISION: i128 = 10_000_000_000_000_000_000_000_000;

/// `a * b / denominator`, rounding toward zero.
///
/// Stays in `i128` when the product fits and falls back to the host's 256-bit
/// integers otherwise, so `reward * PRECISION` does not overflow for 18-decimal
/// tokens.
pub fn mul_div(env: &Env, a: i128, b: i128, denominator: i128) -> Result<i128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }

    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denominator);
    }

    I256::from_i128(env, a)
        .mul(&I256::from_i128(env, b))
        .div(&I256::from_i128(env, denominator))
        .to_i128()
        .ok_or(MathError::Overflow)
}

/// Rate increase when `reward` is spread over `total`, scaled by `PRECISION`.
///
/// Kept in 256 bits: a dust `total` makes the increase far larger than `i128`.
pub fn rate_increase(env: &Env, reward: i128, total: i128) -> Result<I256, MathError> {
    if total == 0 {
        return Err(MathError::DivisionByZero);
    }

    Ok(I256::from_i128(env, reward)
        .mul(&I256::from_i128(env, PRECISION))
        .div(&I256::from_i128(env, total)))
}

/// Reward owed on `amount` for a rate delta, back in token units.
pub fn reward_for_rate(env: &Env, rate_delta: &I256, amount: i128) -> Result<i128, MathError> {
    rate_delta
        .mul(&I256::from_i128(env, amount))
        .div(&I256::from_i128(env, PRECISION))
        .to_i128()
        .ok_or(MathError::Overflow)
}
