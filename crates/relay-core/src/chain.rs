//! Header-chain validation: linkage and proof of work.
//!
//! Validation is a guard. It never mutates relay state and hands the
//! headers back unchanged when every check passes.

use alloc::vec::Vec;
use tracing::debug;

use crate::difficulty::hash_meets_target;
use crate::error::ChainError;
use crate::header::{parse_headers, Header};
use crate::network::ChainParams;

/// Check one header's proof of work and return its digest.
///
/// The declared target must decode, must not exceed the network pow limit,
/// and the digest must not exceed the target.
pub fn check_proof_of_work(
    index: usize,
    header: &Header,
    params: &ChainParams,
) -> Result<[u8; 32], ChainError> {
    let target = header.target()?;
    if target > params.pow_limit {
        return Err(ChainError::TargetAbovePowLimit { index, bits: header.bits });
    }

    let digest = header.digest();
    if !hash_meets_target(&digest, &target) {
        return Err(ChainError::InsufficientProofOfWork { index, digest });
    }
    Ok(digest)
}

/// Validate an ordered header sequence.
///
/// Every header must meet its own target and every header after the first
/// must name its predecessor's digest as `prev_block_hash`. Headers are
/// checked in chain order and the first failure is returned.
pub fn validate_chain<'a>(
    headers: &'a [Header],
    params: &ChainParams,
) -> Result<&'a [Header], ChainError> {
    if headers.is_empty() {
        return Err(ChainError::MalformedHeader { len: 0 });
    }

    let mut prev_digest: Option<[u8; 32]> = None;
    for (index, header) in headers.iter().enumerate() {
        if let Some(expected) = prev_digest {
            if header.prev_block_hash != expected {
                return Err(ChainError::BrokenChainLink {
                    index,
                    expected,
                    found: header.prev_block_hash,
                });
            }
        }
        prev_digest = Some(check_proof_of_work(index, header, params)?);
    }

    debug!(headers = headers.len(), "header chain validated");
    Ok(headers)
}

/// Parse a concatenation of raw headers and validate it as a chain.
pub fn validate_raw_chain(bytes: &[u8], params: &ChainParams) -> Result<Vec<Header>, ChainError> {
    let headers = parse_headers(bytes)?;
    validate_chain(&headers, params)?;
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::serialize_headers;
    use crate::header::tests::MAINNET_HEADERS;
    use crate::network::{MAINNET_PARAMS, REGTEST_PARAMS};
    use crate::test_support::build_chain;

    #[test]
    fn test_mainnet_headers_validate() {
        let raw: Vec<u8> = MAINNET_HEADERS.concat();
        let headers = validate_raw_chain(&raw, &MAINNET_PARAMS).unwrap();
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_validate_returns_input_unchanged() {
        let headers = build_chain([7u8; 32], 5, 0x207fffff, 1_600_000_000, 600);
        let validated = validate_chain(&headers, &REGTEST_PARAMS).unwrap();
        assert_eq!(validated, headers.as_slice());
    }

    #[test]
    fn test_single_header_is_pow_check() {
        let header = Header::parse(&MAINNET_HEADERS[0]).unwrap();
        assert!(validate_chain(&[header], &MAINNET_PARAMS).is_ok());

        let mut tampered = header;
        tampered.nonce = tampered.nonce.wrapping_add(1);
        assert!(matches!(
            validate_chain(&[tampered], &MAINNET_PARAMS),
            Err(ChainError::InsufficientProofOfWork { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert_eq!(
            validate_chain(&[], &MAINNET_PARAMS),
            Err(ChainError::MalformedHeader { len: 0 })
        );
    }

    #[test]
    fn test_broken_link_reports_index() {
        let mut headers = build_chain([1u8; 32], 4, 0x207fffff, 1_600_000_000, 600);
        let expected = headers[1].digest();
        headers[2].prev_block_hash = [9u8; 32];

        assert_eq!(
            validate_chain(&headers, &REGTEST_PARAMS),
            Err(ChainError::BrokenChainLink { index: 2, expected, found: [9u8; 32] })
        );
    }

    #[test]
    fn test_out_of_order_headers_rejected() {
        let mut headers = build_chain([1u8; 32], 3, 0x207fffff, 1_600_000_000, 600);
        headers.swap(0, 1);

        assert!(matches!(
            validate_chain(&headers, &REGTEST_PARAMS),
            Err(ChainError::BrokenChainLink { index: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_bits_rejected() {
        let mut header = Header::parse(&MAINNET_HEADERS[0]).unwrap();
        header.bits = 0x1d80ffff;

        assert_eq!(
            validate_chain(&[header], &MAINNET_PARAMS),
            Err(ChainError::InvalidDifficultyBits { bits: 0x1d80ffff })
        );
    }

    #[test]
    fn test_target_above_pow_limit_rejected() {
        // Valid regtest work is far too easy for mainnet
        let headers = build_chain([1u8; 32], 1, 0x207fffff, 1_600_000_000, 600);

        assert_eq!(
            validate_chain(&headers, &MAINNET_PARAMS),
            Err(ChainError::TargetAbovePowLimit { index: 0, bits: 0x207fffff })
        );
    }

    #[test]
    fn test_any_single_byte_mutation_is_rejected() {
        let raw: Vec<u8> = MAINNET_HEADERS.concat();

        for position in 0..raw.len() {
            let mut mutated = raw.clone();
            mutated[position] ^= 0x01;
            assert!(
                validate_raw_chain(&mutated, &MAINNET_PARAMS).is_err(),
                "mutation at byte {position} was accepted"
            );
        }
    }

    #[test]
    fn test_synthetic_chain_round_trips_through_bytes() {
        let headers = build_chain([3u8; 32], 6, 0x207fffff, 1_600_000_000, 600);
        let raw = serialize_headers(&headers);
        assert_eq!(validate_raw_chain(&raw, &REGTEST_PARAMS).unwrap(), headers);
    }
}
