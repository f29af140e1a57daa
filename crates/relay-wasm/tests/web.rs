//! Tests for the JavaScript relay surface, run with `wasm-pack test`.

#![cfg(target_arch = "wasm32")]

use relay_core::difficulty::hash_meets_target;
use relay_core::header::serialize_headers;
use relay_core::Header;
use relay_wasm::state::{RangeInfo, RelayStatus};
use relay_wasm::BtcRelay;
use wasm_bindgen_test::*;

const GENESIS_HEADER: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";
const REGTEST_BITS: u32 = 0x207fffff;
const START: u32 = 1_700_000_000;

fn mine(prev_block_hash: [u8; 32], timestamp: u32) -> Header {
    let mut header = Header {
        version: 0x2000_0000,
        prev_block_hash,
        merkle_root: [timestamp as u8; 32],
        timestamp,
        bits: REGTEST_BITS,
        nonce: 0,
    };
    let target = header.target().unwrap();
    while !hash_meets_target(&header.digest(), &target) {
        header.nonce += 1;
    }
    header
}

/// Two headers either side of an epoch boundary, on schedule.
fn window_hex(closing_timestamp: u32) -> String {
    let mut headers = Vec::new();
    let mut prev = [1u8; 32];
    for timestamp in [closing_timestamp - 600, closing_timestamp, closing_timestamp + 600, closing_timestamp + 1200] {
        let header = mine(prev, timestamp);
        prev = header.digest();
        headers.push(header);
    }
    hex::encode(serialize_headers(&headers))
}

fn regtest_relay() -> BtcRelay {
    let mut relay = BtcRelay::new("regtest").unwrap();
    let genesis = mine([0u8; 32], START);
    relay.genesis(&hex::encode(genesis.serialize()), 4032, 2).unwrap();
    relay
}

#[wasm_bindgen_test]
fn test_mainnet_genesis() {
    let mut relay = BtcRelay::new("mainnet").unwrap();
    assert!(!relay.is_initialized());
    assert!(relay.current_difficulty().is_err());

    relay.genesis(GENESIS_HEADER, 0, 1).unwrap();

    assert_eq!(relay.current_difficulty().unwrap(), "1");
    assert_eq!(relay.previous_difficulty().unwrap(), None);
    assert_eq!(relay.proof_length().unwrap(), 1);
    assert_eq!(relay.genesis_height().unwrap(), 0);
    assert_eq!(relay.issuance_at_height(0), 5_000_000_000);

    let range: RangeInfo = serde_wasm_bindgen::from_value(relay.relay_range().unwrap()).unwrap();
    assert_eq!(range, RangeInfo { start: 0, end: 2015 });
}

#[wasm_bindgen_test]
fn test_invalid_input() {
    assert!(BtcRelay::new("signet").is_err());

    let mut relay = BtcRelay::new("mainnet").unwrap();
    assert!(relay.genesis("zz", 0, 1).is_err());
    assert!(relay.genesis(&GENESIS_HEADER[..158], 0, 1).is_err());
    assert!(!relay.is_initialized());
}

#[wasm_bindgen_test]
fn test_retarget_and_snapshot() {
    let mut relay = regtest_relay();
    let window = window_hex(START + 1_209_600);

    let err = relay.retarget(&window, 4033).unwrap_err();
    assert!(err.as_string().unwrap().contains("next epoch boundary is height 6048"));

    relay.retarget(&format!("0x{window}"), 6048).unwrap();
    assert_eq!(relay.previous_difficulty().unwrap().as_deref(), Some("1"));
    assert_eq!(relay.current_difficulty().unwrap(), "1");

    let restored = BtcRelay::restore(&relay.snapshot().unwrap()).unwrap();
    assert_eq!(restored.state(), relay.state());

    let status: RelayStatus = serde_wasm_bindgen::from_value(restored.status().unwrap()).unwrap();
    assert_eq!(status.network, "regtest");
    assert_eq!(status.current_epoch.unwrap().start_height, 6048);
    assert_eq!(status.previous_epoch.unwrap().end_timestamp, Some(START + 1_209_600));
}

#[wasm_bindgen_test]
fn test_restore_refuses_edited_snapshot() {
    let relay = regtest_relay();
    let snapshot = relay.snapshot().unwrap();
    let edited = snapshot.replace("\"proof_length\":2", "\"proof_length\":0");
    assert_ne!(edited, snapshot);

    let err = BtcRelay::restore(&edited).err().unwrap();
    assert!(err.as_string().unwrap().starts_with("Invalid snapshot"));
    assert!(BtcRelay::restore("{}").is_err());
}
