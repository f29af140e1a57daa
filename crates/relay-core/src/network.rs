//! Bitcoin network definitions and consensus parameters.

use crypto_bigint::U256;
use serde::{Deserialize, Serialize};

use crate::issuance::subsidy_at_height;

/// Bitcoin network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet
    Mainnet,
    /// Bitcoin testnet4
    Testnet4,
    /// Local regression-test chains. Like bitcoind, the relay never
    /// retargets them.
    Regtest,
}

impl Network {
    /// Consensus parameters used by the relay for this network.
    pub fn params(&self) -> &'static ChainParams {
        match self {
            Network::Mainnet => &MAINNET_PARAMS,
            Network::Testnet4 => &TESTNET4_PARAMS,
            Network::Regtest => &REGTEST_PARAMS,
        }
    }

    /// Calculate block subsidy in satoshis for a given height.
    ///
    /// The subsidy halves every `subsidy_halving_interval` blocks, starting at 50 BTC.
    pub fn block_subsidy(&self, height: u32) -> u64 {
        self.params().block_subsidy(height)
    }

    /// Parse network from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Some(Network::Mainnet),
            "testnet4" | "testnet" | "test" => Some(Network::Testnet4),
            "regtest" => Some(Network::Regtest),
            _ => None,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet4 => "testnet4",
            Network::Regtest => "regtest",
        }
    }

    /// Get display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "Bitcoin Mainnet",
            Network::Testnet4 => "Bitcoin Testnet4",
            Network::Regtest => "Bitcoin Regtest",
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

/// Consensus constants the relay needs to validate headers and retargets.
///
/// `pow_limit` and `difficulty_one` carry the full 256-bit values; the
/// `*_bits` fields hold the same limits in compact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// Compact form of the easiest allowed target.
    pub pow_limit_bits: u32,
    /// Easiest allowed target. Header targets and retarget results above it are capped or rejected.
    pub pow_limit: U256,
    /// Reference target of difficulty 1. Difficulty is `difficulty_one / target`.
    ///
    /// Mainnet and testnet4 use Bitcoin's `0x1d00ffff` target. Regtest uses
    /// its own pow limit instead, a relay convention that keeps its integer
    /// difficulties above zero; bitcoind's `getdifficulty` reports
    /// fractions there.
    pub difficulty_one: U256,
    /// Blocks sharing one target.
    pub blocks_per_epoch: u32,
    /// Expected duration of one epoch in seconds.
    pub target_timespan: u32,
    /// Bound on how far a single retarget may move the target, in either direction.
    pub max_adjustment_factor: u32,
    /// Blocks between subsidy halvings.
    pub subsidy_halving_interval: u32,
    /// Whether blocks inside an epoch may fall back to `pow_limit_bits` (testnet 20-minute rule).
    pub allow_min_difficulty_blocks: bool,
    /// Whether every epoch keeps the bits of the one before it.
    pub no_retargeting: bool,
}

impl ChainParams {
    /// Shortest epoch duration the retarget rule accounts for.
    pub fn min_timespan(&self) -> u32 {
        self.target_timespan / self.max_adjustment_factor
    }

    /// Longest epoch duration the retarget rule accounts for.
    pub fn max_timespan(&self) -> u32 {
        self.target_timespan * self.max_adjustment_factor
    }

    /// Whether `height` is the first block of a difficulty epoch.
    pub fn is_epoch_start(&self, height: u32) -> bool {
        height % self.blocks_per_epoch == 0
    }

    /// Block subsidy in satoshis under this chain's halving schedule.
    pub fn block_subsidy(&self, height: u32) -> u64 {
        subsidy_at_height(height, self.subsidy_halving_interval)
    }
}

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Number of blocks in a difficulty epoch.
pub const BLOCKS_PER_EPOCH: u32 = 2016;

/// Two weeks: 60 * 60 * 24 * 14.
pub const TARGET_TIMESPAN: u32 = 1_209_600;

/// A retarget moves the target by at most this factor.
pub const MAX_ADJUSTMENT_FACTOR: u32 = 4;

/// Compact bits of the difficulty-1 target on mainnet and testnet4.
pub const DIFFICULTY_ONE_BITS: u32 = 0x1d00ffff;

/// Compact bits of the regtest pow limit.
pub const REGTEST_POW_LIMIT_BITS: u32 = 0x207fffff;

const MAINNET_POW_LIMIT: U256 =
    U256::from_be_hex("00000000ffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
const MAINNET_DIFFICULTY_ONE: U256 =
    U256::from_be_hex("00000000ffff0000000000000000000000000000000000000000000000000000");
const REGTEST_POW_LIMIT: U256 =
    U256::from_be_hex("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
// Relay convention: regtest difficulty counts from its pow limit, not from 0x1d00ffff
const REGTEST_DIFFICULTY_ONE: U256 =
    U256::from_be_hex("7fffff0000000000000000000000000000000000000000000000000000000000");

pub static MAINNET_PARAMS: ChainParams = ChainParams {
    pow_limit_bits: DIFFICULTY_ONE_BITS,
    pow_limit: MAINNET_POW_LIMIT,
    difficulty_one: MAINNET_DIFFICULTY_ONE,
    blocks_per_epoch: BLOCKS_PER_EPOCH,
    target_timespan: TARGET_TIMESPAN,
    max_adjustment_factor: MAX_ADJUSTMENT_FACTOR,
    subsidy_halving_interval: 210_000,
    allow_min_difficulty_blocks: false,
    no_retargeting: false,
};

pub static TESTNET4_PARAMS: ChainParams = ChainParams {
    pow_limit_bits: DIFFICULTY_ONE_BITS,
    pow_limit: MAINNET_POW_LIMIT,
    difficulty_one: MAINNET_DIFFICULTY_ONE,
    blocks_per_epoch: BLOCKS_PER_EPOCH,
    target_timespan: TARGET_TIMESPAN,
    max_adjustment_factor: MAX_ADJUSTMENT_FACTOR,
    subsidy_halving_interval: 210_000,
    allow_min_difficulty_blocks: true,
    no_retargeting: false,
};

pub static REGTEST_PARAMS: ChainParams = ChainParams {
    pow_limit_bits: REGTEST_POW_LIMIT_BITS,
    pow_limit: REGTEST_POW_LIMIT,
    difficulty_one: REGTEST_DIFFICULTY_ONE,
    blocks_per_epoch: BLOCKS_PER_EPOCH,
    target_timespan: TARGET_TIMESPAN,
    max_adjustment_factor: MAX_ADJUSTMENT_FACTOR,
    subsidy_halving_interval: 150,
    allow_min_difficulty_blocks: true,
    no_retargeting: true,
};
