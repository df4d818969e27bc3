use morpheus_shared::MathError;
use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum DistributionError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    PoolNotFound = 4,
    InvalidPayoutStart = 5,
    InvalidDecreaseInterval = 6,
    InvalidPoolType = 7,
    InvalidPoolParams = 8,
    PoolNotPublic = 9,
    PoolIsPublic = 10,
    NothingToStake = 11,
    AmountTooLow = 12,
    UserNotStaked = 13,
    NothingToWithdraw = 14,
    InvalidWithdrawAmount = 15,
    WithdrawLocked = 16,
    ClaimLocked = 17,
    NothingToClaim = 18,
    InvalidLength = 19,
    OverplusIsZero = 20,
    InvalidAmount = 21,
    Overflow = 22,
    DivisionByZero = 23,
    UnsupportedMigration = 24,
}

impl From<MathError> for DistributionError {
    fn from(error: MathError) -> Self {
        match error {
            MathError::DivisionByZero => DistributionError::DivisionByZero,
            _ => DistributionError::Overflow,
        }
    }
}
