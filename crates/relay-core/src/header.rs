//! Bitcoin block header parsing and serialization.

use alloc::string::String;
use alloc::vec::Vec;
use crypto_bigint::U256;
use serde::{Deserialize, Serialize};

use crate::difficulty::bits_to_target;
use crate::error::ChainError;
use crate::hash::{double_sha256, hash_to_display_hex};
use crate::network::BLOCK_HEADER_SIZE;

/// A Bitcoin block header (80 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Block version with BIP9 versionbits.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl Header {
    /// Parse exactly one 80-byte header in wire format.
    pub fn parse(bytes: &[u8]) -> Result<Self, ChainError> {
        let raw: &[u8; BLOCK_HEADER_SIZE] = bytes
            .try_into()
            .map_err(|_| ChainError::MalformedHeader { len: bytes.len() })?;
        Ok(Self::from_bytes(raw))
    }

    /// Decode a header from its fixed-size wire representation.
    pub fn from_bytes(raw: &[u8; BLOCK_HEADER_SIZE]) -> Self {
        let word = |at: usize| [raw[at], raw[at + 1], raw[at + 2], raw[at + 3]];

        let mut prev_block_hash = [0u8; 32];
        prev_block_hash.copy_from_slice(&raw[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&raw[36..68]);

        Header {
            version: i32::from_le_bytes(word(0)),
            prev_block_hash,
            merkle_root,
            timestamp: u32::from_le_bytes(word(68)),
            bits: u32::from_le_bytes(word(72)),
            nonce: u32::from_le_bytes(word(76)),
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];

        // Version (4 bytes, little-endian)
        header[0..4].copy_from_slice(&self.version.to_le_bytes());

        // Previous block hash (32 bytes, internal byte order)
        header[4..36].copy_from_slice(&self.prev_block_hash);

        // Merkle root (32 bytes)
        header[36..68].copy_from_slice(&self.merkle_root);

        // Timestamp (4 bytes, little-endian)
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());

        // Bits (4 bytes, little-endian)
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());

        // Nonce (4 bytes, little-endian)
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Compute the block hash (double SHA256) in internal byte order.
    pub fn digest(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Block hash in the usual reversed-hex display form.
    pub fn block_hash_hex(&self) -> String {
        hash_to_display_hex(&self.digest())
    }

    /// Get the target as a 256-bit number.
    pub fn target(&self) -> Result<U256, ChainError> {
        bits_to_target(self.bits)
    }
}

/// Split a concatenation of raw headers into parsed headers.
///
/// The input must hold at least one header and a whole number of them.
pub fn parse_headers(bytes: &[u8]) -> Result<Vec<Header>, ChainError> {
    if bytes.is_empty() || bytes.len() % BLOCK_HEADER_SIZE != 0 {
        return Err(ChainError::MalformedHeader { len: bytes.len() });
    }

    bytes
        .chunks_exact(BLOCK_HEADER_SIZE)
        .map(Header::parse)
        .collect()
}

/// Concatenate headers back into their raw wire form.
pub fn serialize_headers(headers: &[Header]) -> Vec<u8> {
    let mut out = Vec::with_capacity(headers.len() * BLOCK_HEADER_SIZE);
    for header in headers {
        out.extend_from_slice(&header.serialize());
    }
    out
}
