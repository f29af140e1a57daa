//! Epoch difficulty tracking.
//!
//! The tracker starts `Uninitialized`, becomes `Active` through a genesis
//! checkpoint and then advances exactly one epoch per accepted retarget.
//! Every transition computes the full successor state before assigning it,
//! so a failed call leaves the tracker untouched.

use core::slice;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::validate_chain;
use crate::difficulty::{bits_to_target, difficulty_from_bits, next_bits};
use crate::error::{ChainError, RelayError};
use crate::header::Header;
use crate::network::ChainParams;

/// One difficulty epoch known to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// `start_height / blocks_per_epoch`.
    pub index: u32,
    pub start_height: u32,
    /// `start_height + blocks_per_epoch - 1`.
    pub end_height: u32,
    /// Compact target of the epoch's first block.
    pub bits: u32,
    /// Difficulty decoded from `bits`.
    pub difficulty: u128,
    /// Timestamp of the epoch's first block.
    pub start_timestamp: u32,
    /// Timestamp of the epoch's last block, known once the epoch is closed.
    pub end_timestamp: Option<u32>,
}

impl EpochRecord {
    fn open(
        start_height: u32,
        first: &Header,
        difficulty: u128,
        params: &ChainParams,
    ) -> Result<Self, RelayError> {
        let end_height = start_height
            .checked_add(params.blocks_per_epoch - 1)
            .ok_or(RelayError::HeightOutOfRange { height: start_height })?;

        Ok(EpochRecord {
            index: start_height / params.blocks_per_epoch,
            start_height,
            end_height,
            bits: first.bits,
            difficulty,
            start_timestamp: first.timestamp,
            end_timestamp: None,
        })
    }

    /// Check the fields `open` derives from the start height and bits.
    fn check(&self, params: &ChainParams) -> Result<(), RelayError> {
        let inconsistent = |reason| Err(RelayError::InconsistentState { reason });

        if !params.is_epoch_start(self.start_height) {
            return inconsistent("epoch does not start on an epoch boundary");
        }
        if self.index != self.start_height / params.blocks_per_epoch {
            return inconsistent("epoch index does not match its start height");
        }
        if self.start_height.checked_add(params.blocks_per_epoch - 1) != Some(self.end_height) {
            return inconsistent("epoch end height does not match its start height");
        }
        if bits_to_target(self.bits)? > params.pow_limit {
            return inconsistent("epoch target exceeds the network pow limit");
        }
        if difficulty_from_bits(self.bits, params)? != self.difficulty {
            return inconsistent("epoch difficulty does not match its bits");
        }
        Ok(())
    }
}

/// Height range covered by the current epoch, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRange {
    pub current_epoch_start: u32,
    pub current_epoch_end: u32,
}

/// Facts extracted from an accepted retarget window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetargetProof {
    /// Timestamp of the closing epoch's last block.
    pub closing_timestamp: u32,
    /// First block of the new epoch.
    pub opening: Header,
    /// Difficulty decoded from the opening block's bits.
    pub difficulty: u128,
}

/// Check a retarget window against the epoch it closes.
///
/// `window` must hold `proof_length` headers of the closing epoch followed by
/// `proof_length` headers of the new one, linked and each meeting its own
/// target. Closing headers must carry the closing epoch's bits, opening
/// headers the new epoch's bits, and those new bits must equal what
/// Bitcoin's retarget rule yields for the closing epoch.
pub fn verify_retarget_window(
    current: &EpochRecord,
    window: &[Header],
    proof_length: u32,
    params: &ChainParams,
) -> Result<RetargetProof, ChainError> {
    let boundary = proof_length as usize;
    let expected_len = boundary.checked_mul(2).unwrap_or(usize::MAX);
    if boundary == 0 || window.len() != expected_len {
        return Err(ChainError::WindowLengthMismatch {
            expected: expected_len,
            actual: window.len(),
        });
    }

    validate_chain(window, params)?;

    let closing = &window[boundary - 1];
    let opening = &window[boundary];

    for (index, header) in window.iter().enumerate() {
        let expected = if index < boundary { current.bits } else { opening.bits };
        if header.bits == expected {
            continue;
        }
        // Testnet blocks may drop to the pow limit, the epoch's first block may not
        if params.allow_min_difficulty_blocks
            && index != boundary
            && header.bits == params.pow_limit_bits
        {
            continue;
        }
        return Err(ChainError::UnexpectedDifficultyBits {
            index,
            expected,
            found: header.bits,
        });
    }

    let expected_bits = expected_opening_bits(current, closing.timestamp, params)?;
    if opening.bits != expected_bits {
        return Err(ChainError::RetargetMismatch {
            expected: expected_bits,
            found: opening.bits,
        });
    }

    Ok(RetargetProof {
        closing_timestamp: closing.timestamp,
        opening: *opening,
        difficulty: difficulty_from_bits(opening.bits, params)?,
    })
}

/// Bits the epoch after `current` must open with once `current` closes at
/// `closing_timestamp`.
pub fn expected_opening_bits(
    current: &EpochRecord,
    closing_timestamp: u32,
    params: &ChainParams,
) -> Result<u32, ChainError> {
    next_bits(current.bits, current.start_timestamp, closing_timestamp, params)
}

/// Epoch state machine of the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochTracker {
    #[default]
    Uninitialized,
    Active {
        genesis_height: u32,
        /// Headers required on each side of an epoch boundary.
        proof_length: u32,
        current: EpochRecord,
        /// Absent until the first retarget.
        previous: Option<EpochRecord>,
    },
}

impl EpochTracker {
    pub fn is_active(&self) -> bool {
        matches!(self, EpochTracker::Active { .. })
    }

    /// Check a tracker rebuilt from storage against what genesis and
    /// retarget would have produced.
    pub fn check(&self, params: &ChainParams) -> Result<(), RelayError> {
        let EpochTracker::Active {
            genesis_height,
            proof_length,
            current,
            previous,
        } = self
        else {
            return Ok(());
        };
        let inconsistent = |reason| Err(RelayError::InconsistentState { reason });

        if !params.is_epoch_start(*genesis_height) {
            return Err(RelayError::MisalignedGenesis {
                height: *genesis_height,
                blocks_per_epoch: params.blocks_per_epoch,
            });
        }
        if *proof_length == 0 || *proof_length > params.blocks_per_epoch {
            return Err(RelayError::InvalidProofLength {
                proof_length: *proof_length,
                max: params.blocks_per_epoch,
            });
        }

        current.check(params)?;
        if current.end_timestamp.is_some() {
            return inconsistent("current epoch is already closed");
        }
        if current.start_height < *genesis_height {
            return inconsistent("current epoch starts before genesis");
        }

        match previous {
            None if current.start_height != *genesis_height => {
                inconsistent("epochs after genesis need a previous epoch")
            }
            None => Ok(()),
            Some(previous) => {
                previous.check(params)?;
                if previous.end_timestamp.is_none() {
                    return inconsistent("previous epoch is not closed");
                }
                if previous.start_height < *genesis_height
                    || previous.end_height.checked_add(1) != Some(current.start_height)
                {
                    return inconsistent("previous and current epochs are not consecutive");
                }
                Ok(())
            }
        }
    }

    /// Establish the checkpoint the relay builds on.
    ///
    /// `height` must be the first block of an epoch and `header` must meet
    /// its own target. `proof_length` fixes the retarget window size for
    /// the lifetime of the relay.
    pub fn genesis(
        &mut self,
        header: &Header,
        height: u32,
        proof_length: u32,
        params: &ChainParams,
    ) -> Result<EpochRecord, RelayError> {
        if self.is_active() {
            return Err(RelayError::AlreadyInitialized);
        }
        if !params.is_epoch_start(height) {
            return Err(RelayError::MisalignedGenesis {
                height,
                blocks_per_epoch: params.blocks_per_epoch,
            });
        }
        if proof_length == 0 || proof_length > params.blocks_per_epoch {
            return Err(RelayError::InvalidProofLength {
                proof_length,
                max: params.blocks_per_epoch,
            });
        }

        validate_chain(slice::from_ref(header), params)?;
        let difficulty = difficulty_from_bits(header.bits, params)?;
        let current = EpochRecord::open(height, header, difficulty, params)?;

        *self = EpochTracker::Active {
            genesis_height: height,
            proof_length,
            current,
            previous: None,
        };
        Ok(current)
    }

    /// Close the current epoch and open the next one.
    ///
    /// `height` is the height of the new epoch's first block, i.e. of
    /// `window[proof_length]`. It must be exactly one past the current
    /// epoch's end, which rules out skipped and repeated retargets before
    /// the window is even looked at.
    pub fn retarget(
        &mut self,
        window: &[Header],
        height: u32,
        params: &ChainParams,
    ) -> Result<EpochRecord, RelayError> {
        let EpochTracker::Active {
            genesis_height,
            proof_length,
            current,
            ..
        } = *self
        else {
            return Err(RelayError::NotInitialized);
        };

        let expected = self.next_epoch_start()?;
        if height != expected {
            return Err(RelayError::EpochNotYetClosed { expected, found: height });
        }

        let proof = verify_retarget_window(&current, window, proof_length, params)
            .map_err(RelayError::RetargetProofRejected)?;
        let next = EpochRecord::open(height, &proof.opening, proof.difficulty, params)?;

        let closed = EpochRecord {
            end_timestamp: Some(proof.closing_timestamp),
            ..current
        };
        debug!(
            closed_epoch = closed.index,
            opened_epoch = next.index,
            bits = next.bits,
            "epoch advanced"
        );

        *self = EpochTracker::Active {
            genesis_height,
            proof_length,
            current: next,
            previous: Some(closed),
        };
        Ok(next)
    }

    /// Height the next retarget must claim.
    pub fn next_epoch_start(&self) -> Result<u32, RelayError> {
        let current = self.current()?;
        current
            .end_height
            .checked_add(1)
            .ok_or(RelayError::HeightOutOfRange { height: current.end_height })
    }

    pub fn current(&self) -> Result<&EpochRecord, RelayError> {
        match self {
            EpochTracker::Active { current, .. } => Ok(current),
            EpochTracker::Uninitialized => Err(RelayError::NotInitialized),
        }
    }

    pub fn previous(&self) -> Result<Option<&EpochRecord>, RelayError> {
        match self {
            EpochTracker::Active { previous, .. } => Ok(previous.as_ref()),
            EpochTracker::Uninitialized => Err(RelayError::NotInitialized),
        }
    }

    pub fn current_difficulty(&self) -> Result<u128, RelayError> {
        self.current().map(|epoch| epoch.difficulty)
    }

    /// Difficulty of the last closed epoch, `None` before the first retarget.
    pub fn previous_difficulty(&self) -> Result<Option<u128>, RelayError> {
        self.previous().map(|epoch| epoch.map(|epoch| epoch.difficulty))
    }

    pub fn relay_range(&self) -> Result<RelayRange, RelayError> {
        self.current().map(|epoch| RelayRange {
            current_epoch_start: epoch.start_height,
            current_epoch_end: epoch.end_height,
        })
    }

    pub fn proof_length(&self) -> Result<u32, RelayError> {
        match self {
            EpochTracker::Active { proof_length, .. } => Ok(*proof_length),
            EpochTracker::Uninitialized => Err(RelayError::NotInitialized),
        }
    }

    pub fn genesis_height(&self) -> Result<u32, RelayError> {
        match self {
            EpochTracker::Active { genesis_height, .. } => Ok(*genesis_height),
            EpochTracker::Uninitialized => Err(RelayError::NotInitialized),
        }
    }
}
