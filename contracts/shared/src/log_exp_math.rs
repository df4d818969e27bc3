//! Exponentiation and logarithms on 18-decimal fixed-point numbers.
//!
//! `exp` decomposes its argument into a sum of powers of two whose exponentials
//! are precomputed, then finishes with a Taylor series. `ln` runs the same
//! decomposition backwards and finishes with the `atanh` series; arguments close
//! to one go through a 36-decimal variant of that series for extra precision.
//! Intermediates exceed 128 bits, so all of it runs on host `I256` values.

use soroban_sdk::{Env, I256};

use crate::MathError;

const ONE_18: i128 = 1_000_000_000_000_000_000;
const ONE_20: i128 = 100_000_000_000_000_000_000;
const ONE_36: i128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;

pub const MAX_NATURAL_EXPONENT: i128 = 130 * ONE_18;
pub const MIN_NATURAL_EXPONENT: i128 = -41 * ONE_18;

const LN_36_LOWER_BOUND: i128 = ONE_18 - 100_000_000_000_000_000;
const LN_36_UPPER_BOUND: i128 = ONE_18 + 100_000_000_000_000_000;

// 18 decimal exponents, exponentials without decimals
const X0: i128 = 128_000_000_000_000_000_000; // 2^7
const X1: i128 = 64_000_000_000_000_000_000; // 2^6
const A1: i128 = 6_235_149_080_811_616_882_910_000_000; // e^(x1)

// 20 decimal exponents and exponentials
const X2: i128 = 3_200_000_000_000_000_000_000; // 2^5
const A2: i128 = 7_896_296_018_268_069_516_100_000_000_000_000;
const X3: i128 = 1_600_000_000_000_000_000_000; // 2^4
const A3: i128 = 888_611_052_050_787_263_676_000_000;
const X4: i128 = 800_000_000_000_000_000_000; // 2^3
const A4: i128 = 298_095_798_704_172_827_474_000;
const X5: i128 = 400_000_000_000_000_000_000; // 2^2
const A5: i128 = 5_459_815_003_314_423_907_810;
const X6: i128 = 200_000_000_000_000_000_000; // 2^1
const A6: i128 = 738_905_609_893_065_022_723;
const X7: i128 = 100_000_000_000_000_000_000; // 2^0
const A7: i128 = 271_828_182_845_904_523_536;
const X8: i128 = 50_000_000_000_000_000_000; // 2^-1
const A8: i128 = 164_872_127_070_012_814_685;
const X9: i128 = 25_000_000_000_000_000_000; // 2^-2
const A9: i128 = 128_402_541_668_774_148_407;
const X10: i128 = 12_500_000_000_000_000_000; // 2^-3
const A10: i128 = 113_314_845_306_682_631_683;
const X11: i128 = 6_250_000_000_000_000_000; // 2^-4
const A11: i128 = 106_449_445_891_785_942_956;

const EXP_STEPS: [(i128, i128); 8] = [
    (X2, A2),
    (X3, A3),
    (X4, A4),
    (X5, A5),
    (X6, A6),
    (X7, A7),
    (X8, A8),
    (X9, A9),
];

const LN_STEPS: [(i128, i128); 10] = [
    (X2, A2),
    (X3, A3),
    (X4, A4),
    (X5, A5),
    (X6, A6),
    (X7, A7),
    (X8, A8),
    (X9, A9),
    (X10, A10),
    (X11, A11),
];

fn int(env: &Env, value: i128) -> I256 {
    I256::from_i128(env, value)
}

/// e^(x0) = 38877084059945950922200000000000000000000000000000000000
fn a0(env: &Env) -> I256 {
    I256::from_parts(
        env,
        0,
        114_249_481_722_274_167,
        17_670_479_068_478_958_691,
        171_843_153_341_448_192,
    )
}

/// Remainder with the sign of the dividend.
fn rem(env: &Env, a: &I256, b: i128) -> I256 {
    let b = int(env, b);
    a.sub(&a.div(&b).mul(&b))
}

fn narrow(value: &I256) -> Result<i128, MathError> {
    value.to_i128().ok_or(MathError::Overflow)
}

/// `x^y` for 18-decimal `x >= 0` and `y >= 0`.
pub fn pow(env: &Env, x: i128, y: i128) -> Result<I256, MathError> {
    if y == 0 {
        return Ok(int(env, ONE_18));
    }
    if x == 0 {
        return Ok(int(env, 0));
    }
    if x < 0 {
        return Err(MathError::XOutOfBounds);
    }
    if y < 0 {
        return Err(MathError::YOutOfBounds);
    }

    let one_18 = int(env, ONE_18);
    let y_big = int(env, y);

    let scaled = if LN_36_LOWER_BOUND < x && x < LN_36_UPPER_BOUND {
        let ln_36_x = ln_36(env, x);
        // Split to keep the 36 decimals of precision without overflowing
        ln_36_x
            .div(&one_18)
            .mul(&y_big)
            .add(&rem(env, &ln_36_x, ONE_18).mul(&y_big).div(&one_18))
    } else {
        ln_18(env, int(env, x)).mul(&y_big)
    };
    let logx_times_y = scaled.div(&one_18);

    if logx_times_y < int(env, MIN_NATURAL_EXPONENT) || logx_times_y > int(env, MAX_NATURAL_EXPONENT) {
        return Err(MathError::ProductOutOfBounds);
    }

    exp(env, narrow(&logx_times_y)?)
}

/// `e^x` for 18-decimal `x` in `[MIN_NATURAL_EXPONENT, MAX_NATURAL_EXPONENT]`.
pub fn exp(env: &Env, x: i128) -> Result<I256, MathError> {
    if !(MIN_NATURAL_EXPONENT..=MAX_NATURAL_EXPONENT).contains(&x) {
        return Err(MathError::InvalidExponent);
    }

    if x < 0 {
        // e^(-x) = 1 / e^x
        return Ok(int(env, ONE_18).mul(&int(env, ONE_18)).div(&exp(env, -x)?));
    }

    let mut x = x;
    let first_an = if x >= X0 {
        x -= X0;
        a0(env)
    } else if x >= X1 {
        x -= X1;
        int(env, A1)
    } else {
        int(env, 1)
    };

    // 20 decimals from here on
    x *= 100;

    let one_20 = int(env, ONE_20);
    let mut product = one_20.clone();
    for (xn, an) in EXP_STEPS {
        if x >= xn {
            x -= xn;
            product = product.mul(&int(env, an)).div(&one_20);
        }
    }

    // x < 0.25 now, twelve terms are enough
    let x = int(env, x);
    let mut term = x.clone();
    let mut series_sum = one_20.add(&term);
    for k in 2..=12 {
        term = term.mul(&x).div(&one_20).div(&int(env, k));
        series_sum = series_sum.add(&term);
    }

    Ok(product
        .mul(&series_sum)
        .div(&one_20)
        .mul(&first_an)
        .div(&int(env, 100)))
}

/// Natural logarithm of an 18-decimal `a > 0`.
pub fn ln(env: &Env, a: i128) -> Result<i128, MathError> {
    if a <= 0 {
        return Err(MathError::OutOfBounds);
    }

    if LN_36_LOWER_BOUND < a && a < LN_36_UPPER_BOUND {
        narrow(&ln_36(env, a).div(&int(env, ONE_18)))
    } else {
        narrow(&ln_18(env, int(env, a)))
    }
}

/// Logarithm of `arg` in `base`, both 18-decimal and positive.
pub fn log(env: &Env, arg: i128, base: i128) -> Result<i128, MathError> {
    if arg <= 0 || base <= 0 {
        return Err(MathError::OutOfBounds);
    }

    let log_base = ln_36_scaled(env, base);
    if log_base == int(env, 0) {
        return Err(MathError::DivisionByZero);
    }
    let log_arg = ln_36_scaled(env, arg);

    narrow(&log_arg.mul(&int(env, ONE_18)).div(&log_base))
}

/// `ln(x)` with 36 decimals, using the precise series near one.
fn ln_36_scaled(env: &Env, x: i128) -> I256 {
    if LN_36_LOWER_BOUND < x && x < LN_36_UPPER_BOUND {
        ln_36(env, x)
    } else {
        ln_18(env, int(env, x)).mul(&int(env, ONE_18))
    }
}

fn ln_18(env: &Env, a: I256) -> I256 {
    let one_18 = int(env, ONE_18);
    if a < one_18 {
        // ln(a) = -ln(1/a)
        return int(env, 0).sub(&ln_18(env, one_18.mul(&one_18).div(&a)));
    }

    let mut a = a;
    let mut sum: i128 = 0;

    let first = a0(env);
    if a >= first.mul(&one_18) {
        a = a.div(&first);
        sum += X0;
    }
    let second = int(env, A1);
    if a >= second.mul(&one_18) {
        a = a.div(&second);
        sum += X1;
    }

    // 20 decimals from here on
    sum *= 100;
    a = a.mul(&int(env, 100));

    let one_20 = int(env, ONE_20);
    for (xn, an) in LN_STEPS {
        let an = int(env, an);
        if a >= an {
            a = a.mul(&one_20).div(&an);
            sum += xn;
        }
    }

    // a < 1.07 now: ln(a) = 2 * atanh((a - 1) / (a + 1))
    let z = a.sub(&one_20).mul(&one_20).div(&a.add(&one_20));
    let z_squared = z.mul(&z).div(&one_20);

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for k in [3, 5, 7, 9, 11] {
        num = num.mul(&z_squared).div(&one_20);
        series_sum = series_sum.add(&num.div(&int(env, k)));
    }
    series_sum = series_sum.mul(&int(env, 2));

    int(env, sum).add(&series_sum).div(&int(env, 100))
}

fn ln_36(env: &Env, x: i128) -> I256 {
    let one_36 = int(env, ONE_36);
    let x = int(env, x).mul(&int(env, ONE_18));

    let z = x.sub(&one_36).mul(&one_36).div(&x.add(&one_36));
    let z_squared = z.mul(&z).div(&one_36);

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for k in [3, 5, 7, 9, 11, 13, 15] {
        num = num.mul(&z_squared).div(&one_36);
        series_sum = series_sum.add(&num.div(&int(env, k)));
    }

    series_sum.mul(&int(env, 2))
}
