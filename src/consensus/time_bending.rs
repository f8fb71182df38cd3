//! The time-bending deadline transform.
//!
//! Raw deadlines (`quality / base_target`) are exponentially distributed,
//! which makes block intervals lumpy. Taking the cube root maps them onto a
//! chi-squared shape with the same mean: `deadline = scale ·
//! cbrt(quality / base_target)` with `scale` chosen so the expected block
//! time stays at the target spacing (the Γ(4/3) factor is the mean of the
//! cube-rooted exponential). All arithmetic is 256-bit fixed point with 42
//! fractional bits; results must be bit-identical across nodes.

use primitive_types::U256;

/// Fractional bits of the fixed-point scale.
const Q: usize = 42;
/// Fractional bits given to the quality ratio before the cube root.
const P: usize = 21;
/// Γ(4/3) ≈ 0.892979511 in Q42 fixed point.
const GAMMA_FP: u64 = 3_927_365_422_841;

/// Exact integer cube root: largest `r` with `r³ ≤ x`.
fn cbrt_u256(x: U256) -> U256 {
    if x.is_zero() {
        return U256::zero();
    }

    let mut hi = U256::one();
    while hi * hi * hi < x {
        hi <<= 1;
    }
    let mut lo = hi >> 1;

    while lo < hi {
        let mid = (lo + hi + U256::one()) >> 1;
        if mid * mid * mid <= x {
            lo = mid;
        } else {
            hi = mid - U256::one();
        }
    }
    lo
}

/// Scale factor in Q(P+Q) such that the expected deadline equals
/// `block_time`: `block_time · 2^(2Q) / (cbrt(block_time) · Γ(4/3))`,
/// rounded half up.
fn deadline_scale(block_time: u64) -> U256 {
    let t = U256::from(block_time);

    let t_cbrt = cbrt_u256(t << (3 * Q));

    let numerator = t << (2 * Q);
    let denominator = (t_cbrt * U256::from(GAMMA_FP)) >> Q;

    (numerator + (denominator >> 1)) / denominator
}

/// Difficulty-adjusted, time-bent deadline in seconds.
pub fn time_bended_deadline(quality: u64, base_target: u64, block_time: u64) -> u64 {
    if quality == 0 {
        return 0;
    }

    let scale = deadline_scale(block_time);

    let v = (U256::from(quality) << (3 * P)) / U256::from(base_target.max(1));
    let r = cbrt_u256(v);

    let numer = scale * r;
    let denom = U256::one() << (P + Q);
    let rounded = (numer + (denom >> 1)) / denom;

    rounded.low_u64()
}
