//! Relay error types.

use thiserror::Error;

use crate::hash::hash_to_display_hex;
use crate::network::BLOCK_HEADER_SIZE;

/// Failures found while decoding or validating a header sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Input is empty or not a whole number of 80-byte headers.
    #[error("malformed header data: {len} bytes is not a non-empty multiple of {}", BLOCK_HEADER_SIZE)]
    MalformedHeader { len: usize },

    /// Compact bits encode a negative, zero or overflowing target.
    #[error("invalid difficulty bits {bits:#010x}")]
    InvalidDifficultyBits { bits: u32 },

    /// Target is easier than the network allows.
    #[error("header {index} target from bits {bits:#010x} exceeds the network pow limit")]
    TargetAbovePowLimit { index: usize, bits: u32 },

    /// `prev_block_hash` of a header does not match its predecessor's digest.
    #[error(
        "header {index} does not extend its predecessor: expected previous hash {}, found {}",
        hash_to_display_hex(.expected),
        hash_to_display_hex(.found)
    )]
    BrokenChainLink {
        index: usize,
        expected: [u8; 32],
        found: [u8; 32],
    },

    /// Header digest is above the target its bits declare.
    #[error("header {index} hash {} does not meet its target", hash_to_display_hex(.digest))]
    InsufficientProofOfWork { index: usize, digest: [u8; 32] },

    /// Retarget window does not hold `2 * proof_length` headers.
    #[error("retarget window holds {actual} headers, expected {expected}")]
    WindowLengthMismatch { expected: usize, actual: usize },

    /// A header in the retarget window carries bits of the wrong epoch.
    #[error("header {index} carries bits {found:#010x}, expected {expected:#010x}")]
    UnexpectedDifficultyBits {
        index: usize,
        expected: u32,
        found: u32,
    },

    /// The new epoch's bits differ from the value recomputed from the closing epoch.
    #[error("new epoch bits {found:#010x} do not match the retarget result {expected:#010x}")]
    RetargetMismatch { expected: u32, found: u32 },
}

/// Failures of relay lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The genesis header itself failed decoding or validation.
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("relay genesis has already been set")]
    AlreadyInitialized,

    #[error("relay genesis has not been set")]
    NotInitialized,

    /// Genesis must sit on an epoch boundary.
    #[error("genesis height {height} is not the first block of a {blocks_per_epoch}-block epoch")]
    MisalignedGenesis { height: u32, blocks_per_epoch: u32 },

    #[error("proof length {proof_length} is outside 1..={max}")]
    InvalidProofLength { proof_length: u32, max: u32 },

    /// Height arithmetic for the next epoch would overflow.
    #[error("height {height} leaves no room for another epoch")]
    HeightOutOfRange { height: u32 },

    /// Retarget targets a boundary other than the one closing the current epoch.
    #[error("retarget at height {found} rejected: the next epoch boundary is height {expected}")]
    EpochNotYetClosed { expected: u32, found: u32 },

    /// Retarget window failed one of its checks.
    #[error("retarget proof rejected: {0}")]
    RetargetProofRejected(#[source] ChainError),

    /// Restored state breaks an invariant genesis and retarget maintain.
    #[error("inconsistent relay state: {reason}")]
    InconsistentState { reason: &'static str },
}

impl RelayError {
    /// Inner validation failure of a rejected retarget or genesis header.
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            RelayError::Chain(err) | RelayError::RetargetProofRejected(err) => Some(err),
            _ => None,
        }
    }
}
