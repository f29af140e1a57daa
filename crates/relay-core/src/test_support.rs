//! Synthetic header chains for tests.
//!
//! Only easy targets (regtest-range bits) are practical to mine here.

use alloc::vec::Vec;

use crate::difficulty::hash_meets_target;
use crate::hash::double_sha256;
use crate::header::Header;
use crate::network::{ChainParams, REGTEST_PARAMS};

/// Regtest limits under the mainnet retarget rule, without testnet exceptions.
pub(crate) fn retargeting_regtest() -> ChainParams {
    ChainParams {
        no_retargeting: false,
        allow_min_difficulty_blocks: false,
        ..REGTEST_PARAMS
    }
}

/// Grind the nonce until the header meets its own target.
pub(crate) fn mine(mut header: Header) -> Header {
    let target = header.target().expect("test bits must decode");
    while !hash_meets_target(&header.digest(), &target) {
        header.nonce = header.nonce.checked_add(1).expect("nonce space exhausted");
    }
    header
}

/// Mine a header extending `prev_block_hash`.
pub(crate) fn mine_header(prev_block_hash: [u8; 32], timestamp: u32, bits: u32) -> Header {
    mine(Header {
        version: 0x2000_0000,
        prev_block_hash,
        merkle_root: double_sha256(&timestamp.to_le_bytes()),
        timestamp,
        bits,
        nonce: 0,
    })
}

/// Builds a linked chain one header at a time.
pub(crate) struct ChainBuilder {
    tip: [u8; 32],
    headers: Vec<Header>,
}

impl ChainBuilder {
    pub(crate) fn new(prev_block_hash: [u8; 32]) -> Self {
        ChainBuilder { tip: prev_block_hash, headers: Vec::new() }
    }

    pub(crate) fn push(&mut self, timestamp: u32, bits: u32) -> &mut Self {
        let header = mine_header(self.tip, timestamp, bits);
        self.tip = header.digest();
        self.headers.push(header);
        self
    }

    pub(crate) fn build(&mut self) -> Vec<Header> {
        core::mem::take(&mut self.headers)
    }
}

/// `count` linked headers with the same bits, spaced `spacing` seconds apart.
pub(crate) fn build_chain(
    prev_block_hash: [u8; 32],
    count: usize,
    bits: u32,
    start_time: u32,
    spacing: u32,
) -> Vec<Header> {
    let mut builder = ChainBuilder::new(prev_block_hash);
    let mut timestamp = start_time;
    for _ in 0..count {
        builder.push(timestamp, bits);
        timestamp += spacing;
    }
    builder.build()
}
