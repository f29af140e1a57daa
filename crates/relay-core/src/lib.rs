//! Core logic of a Bitcoin header-chain relay.
//!
//! This crate provides pure Rust implementations of:
//! - Block header parsing, serialization and double-SHA256 digests
//! - Compact difficulty decoding and Bitcoin's retarget rule
//! - Header-chain validation (linkage and proof of work)
//! - Epoch tracking from a genesis checkpoint through verified retargets
//! - Block issuance under the halving schedule

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod chain;
pub mod difficulty;
pub mod epoch;
pub mod error;
pub mod hash;
pub mod header;
pub mod issuance;
pub mod network;
pub mod relay;

#[cfg(test)]
mod test_support;

pub use chain::{validate_chain, validate_raw_chain};
pub use difficulty::{bits_to_target, difficulty_from_bits, hash_meets_target, next_target, target_to_bits};
pub use epoch::{EpochRecord, EpochTracker, RelayRange};
pub use error::{ChainError, RelayError};
pub use hash::{double_sha256, hash_to_display_hex};
pub use header::{parse_headers, Header};
pub use issuance::issuance_at_height;
pub use network::{ChainParams, Network};
pub use relay::RelayState;
