//! Relay controller exposed to JavaScript.

use relay_core::{EpochRecord, Network, RelayError, RelayState};
use wasm_bindgen::prelude::*;

use crate::state::{EpochInfo, RangeInfo, RelayStatus};

/// A header-chain relay driven from JavaScript.
///
/// Headers are passed as hex strings of concatenated 80-byte wire
/// serializations, as block explorers return them.
#[wasm_bindgen]
pub struct BtcRelay {
    state: RelayState,
}

#[wasm_bindgen]
impl BtcRelay {
    /// Create an uninitialized relay.
    ///
    /// # Arguments
    /// * `network` - The network ("mainnet", "testnet4" or "regtest")
    #[wasm_bindgen(constructor)]
    pub fn new(network: &str) -> Result<BtcRelay, JsValue> {
        let net = Network::from_str(network)
            .ok_or_else(|| JsValue::from_str("Invalid network"))?;

        Ok(BtcRelay {
            state: RelayState::new(net),
        })
    }

    /// Rebuild a relay from a [`BtcRelay::snapshot`] string.
    #[wasm_bindgen]
    pub fn restore(snapshot: &str) -> Result<BtcRelay, JsValue> {
        let state: RelayState = serde_json::from_str(snapshot)
            .map_err(|e| JsValue::from_str(&format!("Invalid snapshot: {}", e)))?;
        Ok(BtcRelay { state })
    }

    /// Set the genesis checkpoint.
    ///
    /// # Arguments
    /// * `header_hex` - One raw header
    /// * `height` - Height of that header, the first block of an epoch
    /// * `proof_length` - Headers required on each side of future retarget boundaries
    #[wasm_bindgen]
    pub fn genesis(&mut self, header_hex: &str, height: u32, proof_length: u32) -> Result<JsValue, JsValue> {
        let bytes = decode_headers_hex(header_hex)?;
        let epoch = self
            .state
            .genesis(&bytes, height, proof_length)
            .map_err(relay_error)?;

        console_log(&format!(
            "Relay genesis on {} at height {} with difficulty {}",
            self.state.network().display_name(),
            height,
            epoch.difficulty
        ));
        epoch_to_js(&epoch)
    }

    /// Close the current epoch with a retarget window.
    ///
    /// # Arguments
    /// * `window_hex` - `2 * proof_length` raw headers straddling the boundary
    /// * `height` - Height of the new epoch's first block
    #[wasm_bindgen]
    pub fn retarget(&mut self, window_hex: &str, height: u32) -> Result<JsValue, JsValue> {
        let bytes = decode_headers_hex(window_hex)?;
        let epoch = self.state.retarget(&bytes, height).map_err(relay_error)?;

        console_log(&format!(
            "Relay retarget at height {}: difficulty {}",
            height, epoch.difficulty
        ));
        epoch_to_js(&epoch)
    }

    /// Current epoch difficulty as a decimal string.
    #[wasm_bindgen]
    pub fn current_difficulty(&self) -> Result<String, JsValue> {
        self.state
            .current_difficulty()
            .map(|difficulty| difficulty.to_string())
            .map_err(relay_error)
    }

    /// Previous epoch difficulty as a decimal string, `undefined` before the first retarget.
    #[wasm_bindgen]
    pub fn previous_difficulty(&self) -> Result<Option<String>, JsValue> {
        self.state
            .previous_difficulty()
            .map(|difficulty| difficulty.map(|d| d.to_string()))
            .map_err(relay_error)
    }

    /// Current epoch height range as `{ start, end }`.
    #[wasm_bindgen]
    pub fn relay_range(&self) -> Result<JsValue, JsValue> {
        let range = self.state.relay_range().map_err(relay_error)?;
        RangeInfo::from(range).to_js()
    }

    #[wasm_bindgen]
    pub fn proof_length(&self) -> Result<u32, JsValue> {
        self.state.proof_length().map_err(relay_error)
    }

    #[wasm_bindgen]
    pub fn genesis_height(&self) -> Result<u32, JsValue> {
        self.state.genesis_height().map_err(relay_error)
    }

    #[wasm_bindgen]
    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    #[wasm_bindgen]
    pub fn network(&self) -> String {
        self.state.network().name().to_string()
    }

    /// Block subsidy in satoshis at `height` on this relay's network.
    #[wasm_bindgen]
    pub fn issuance_at_height(&self, height: u32) -> u64 {
        self.state.issuance_at_height(height)
    }

    /// Serialize the whole relay state to JSON for persistence.
    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }

    /// Display-oriented overview of the relay.
    #[wasm_bindgen]
    pub fn status(&self) -> Result<JsValue, JsValue> {
        RelayStatus::from_state(&self.state).to_js()
    }
}

impl BtcRelay {
    /// Underlying relay state.
    pub fn state(&self) -> &RelayState {
        &self.state
    }
}

fn relay_error(err: RelayError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn epoch_to_js(epoch: &EpochRecord) -> Result<JsValue, JsValue> {
    EpochInfo::from(epoch).to_js()
}

/// Decode header hex, accepting an optional `0x` prefix.
pub(crate) fn decode_headers_hex(input: &str) -> Result<Vec<u8>, JsValue> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|_| JsValue::from_str("Invalid header hex"))
}

/// Log to the browser console.
#[wasm_bindgen]
pub fn console_log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}
