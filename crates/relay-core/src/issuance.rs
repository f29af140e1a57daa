//! Block issuance under Bitcoin's halving schedule.

/// Subsidy of the first block, 50 BTC in satoshis.
pub const INITIAL_SUBSIDY: u64 = 5_000_000_000;

/// Mainnet halving interval in blocks.
pub const SUBSIDY_HALVING_INTERVAL: u32 = 210_000;

/// Block subsidy at `height` when the reward halves every `halving_interval` blocks.
///
/// Returns 0 once 64 halvings have passed, and for a zero interval.
pub fn subsidy_at_height(height: u32, halving_interval: u32) -> u64 {
    if halving_interval == 0 {
        return 0;
    }
    let halvings = height / halving_interval;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_SUBSIDY >> halvings
}

/// Mainnet block subsidy in satoshis at `height`.
pub fn issuance_at_height(height: u32) -> u64 {
    subsidy_at_height(height, SUBSIDY_HALVING_INTERVAL)
}
