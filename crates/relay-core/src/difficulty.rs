//! Bitcoin difficulty target conversion and the epoch retarget rule.

use crypto_bigint::{Encoding, U256};

use crate::error::ChainError;
use crate::network::ChainParams;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// Fails for encodings Bitcoin Core rejects (a set sign bit or a target
/// that does not fit in 256 bits) and for zero targets.
pub fn bits_to_target(bits: u32) -> Result<U256, ChainError> {
    let exponent = bits >> 24;
    let mantissa = bits & MANTISSA_MASK;

    let negative = bits & SIGN_BIT != 0;
    let overflow = exponent > 34
        || (mantissa > 0xff && exponent > 33)
        || (mantissa > 0xffff && exponent > 32);
    if mantissa == 0 || negative || overflow {
        return Err(ChainError::InvalidDifficultyBits { bits });
    }

    let target = if exponent <= 3 {
        U256::from_u32(mantissa >> (8 * (3 - exponent)))
    } else {
        U256::from_u32(mantissa) << (8 * (exponent as usize - 3))
    };

    if target == U256::ZERO {
        return Err(ChainError::InvalidDifficultyBits { bits });
    }
    Ok(target)
}

/// Convert a 256-bit target back to compact "bits" representation.
///
/// Only the three most significant bytes survive, so this truncates exactly
/// like Bitcoin Core's `GetCompact`.
pub fn target_to_bits(target: &U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;
    let bytes = target.to_be_bytes();

    let mut compact = if size <= 3 {
        low_u32(&bytes) << (8 * (3 - size))
    } else {
        let shifted = target.shr_vartime(8 * (size - 3));
        low_u32(&shifted.to_be_bytes())
    };

    // The mantissa's top bit is a sign flag, move it into the exponent instead
    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | ((size as u32) << 24)
}

fn low_u32(bytes: &[u8; 32]) -> u32 {
    u32::from_be_bytes([bytes[28], bytes[29], bytes[30], bytes[31]])
}

/// Check if a header digest meets the difficulty target.
///
/// The digest is in internal byte order, i.e. a little-endian 256-bit
/// number. Returns true if digest <= target.
#[inline]
pub fn hash_meets_target(digest: &[u8; 32], target: &U256) -> bool {
    U256::from_le_slice(digest) <= *target
}

/// Difficulty of a compact target: `difficulty_one / target`, rounded down.
///
/// Fails if the bits are invalid or the quotient does not fit in 128 bits.
pub fn difficulty_from_bits(bits: u32, params: &ChainParams) -> Result<u128, ChainError> {
    let target = bits_to_target(bits)?;
    let quotient = params.difficulty_one.wrapping_div(&target).to_be_bytes();

    let (high, low) = quotient.split_at(16);
    if high.iter().any(|byte| *byte != 0) {
        return Err(ChainError::InvalidDifficultyBits { bits });
    }

    let mut value = [0u8; 16];
    value.copy_from_slice(low);
    Ok(u128::from_be_bytes(value))
}

/// Epoch duration fed to the retarget rule, clamped to
/// `[target_timespan / 4, target_timespan * 4]`.
pub fn clamped_timespan(first_timestamp: u32, last_timestamp: u32, params: &ChainParams) -> u32 {
    let actual = i64::from(last_timestamp) - i64::from(first_timestamp);
    actual.clamp(
        i64::from(params.min_timespan()),
        i64::from(params.max_timespan()),
    ) as u32
}

/// Target of the next epoch under Bitcoin's retarget rule.
///
/// `new = old * clamped_timespan / target_timespan`, computed exactly in
/// 256-bit integers and capped at the network pow limit. Networks with
/// `no_retargeting` keep the current target.
///
/// # Arguments
/// * `current_bits` - Compact target of the closing epoch's first block
/// * `first_timestamp` - Timestamp of the closing epoch's first block
/// * `last_timestamp` - Timestamp of the closing epoch's last block
pub fn next_target(
    current_bits: u32,
    first_timestamp: u32,
    last_timestamp: u32,
    params: &ChainParams,
) -> Result<U256, ChainError> {
    let current = bits_to_target(current_bits)?;
    if params.no_retargeting {
        return Ok(current);
    }
    let timespan = u64::from(clamped_timespan(first_timestamp, last_timestamp, params));
    let expected = U256::from_u32(params.target_timespan);

    // old * t / T == (old / T) * t + (old % T) * t / T, and the second term fits in a u64
    let quotient = current.wrapping_div(&expected);
    let remainder = u64::from(low_u32(&current.wrapping_rem(&expected).to_be_bytes()));

    // A product this wide is at least 2^255, above every pow limit
    let timespan_bits = (u64::BITS - timespan.leading_zeros()) as usize;
    if quotient.bits() + timespan_bits > 256 {
        return Ok(params.pow_limit);
    }

    let product = quotient.wrapping_mul(&U256::from_u64(timespan));
    if product > params.pow_limit {
        return Ok(params.pow_limit);
    }

    let carry = remainder * timespan / u64::from(params.target_timespan);
    Ok(product.wrapping_add(&U256::from_u64(carry)).min(params.pow_limit))
}

/// Compact bits the next epoch must carry.
pub fn next_bits(
    current_bits: u32,
    first_timestamp: u32,
    last_timestamp: u32,
    params: &ChainParams,
) -> Result<u32, ChainError> {
    // Bits are carried over verbatim, even non-canonical encodings
    if params.no_retargeting {
        return bits_to_target(current_bits).map(|_| current_bits);
    }
    next_target(current_bits, first_timestamp, last_timestamp, params).map(|target| target_to_bits(&target))
}
