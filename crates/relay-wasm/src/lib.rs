//! WebAssembly bindings for the Bitcoin header-chain relay.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Setting a genesis checkpoint from a raw header
//! - Applying difficulty retargets from header windows
//! - Querying epoch difficulty, relay range and issuance
//! - Persisting and restoring relay state as JSON

use wasm_bindgen::prelude::*;

pub mod relay;
pub mod state;

// Re-export main types for JS access
pub use relay::BtcRelay;

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
