//! Serializable views of the relay handed to JavaScript.

use relay_core::{EpochRecord, RelayRange, RelayState};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// One epoch as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    pub index: u32,
    pub start_height: u32,
    pub end_height: u32,
    /// Compact bits of the epoch's first block.
    pub bits: u32,
    /// Decimal string; difficulties overflow a JS number.
    pub difficulty: String,
    pub start_timestamp: u32,
    pub end_timestamp: Option<u32>,
}

impl From<&EpochRecord> for EpochInfo {
    fn from(epoch: &EpochRecord) -> Self {
        EpochInfo {
            index: epoch.index,
            start_height: epoch.start_height,
            end_height: epoch.end_height,
            bits: epoch.bits,
            difficulty: epoch.difficulty.to_string(),
            start_timestamp: epoch.start_timestamp,
            end_timestamp: epoch.end_timestamp,
        }
    }
}

impl EpochInfo {
    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}

/// Inclusive height range of the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInfo {
    pub start: u32,
    pub end: u32,
}

impl From<RelayRange> for RangeInfo {
    fn from(range: RelayRange) -> Self {
        RangeInfo {
            start: range.current_epoch_start,
            end: range.current_epoch_end,
        }
    }
}

impl RangeInfo {
    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}

/// Overview of the relay for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    /// Network name.
    pub network: String,
    pub initialized: bool,
    pub genesis_height: Option<u32>,
    pub proof_length: Option<u32>,
    pub current_epoch: Option<EpochInfo>,
    /// Absent until the first retarget.
    pub previous_epoch: Option<EpochInfo>,
}

impl RelayStatus {
    pub fn from_state(state: &RelayState) -> Self {
        RelayStatus {
            network: state.network().name().to_string(),
            initialized: state.is_initialized(),
            genesis_height: state.genesis_height().ok(),
            proof_length: state.proof_length().ok(),
            current_epoch: state.current_epoch().ok().map(EpochInfo::from),
            previous_epoch: state.previous_epoch().ok().flatten().map(EpochInfo::from),
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}
