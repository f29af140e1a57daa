//! The relay aggregate: network selection plus epoch state.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::epoch::{EpochRecord, EpochTracker, RelayRange};
use crate::error::RelayError;
use crate::header::{parse_headers, Header};
use crate::network::{ChainParams, Network};

/// Persisted state of a header-chain relay.
///
/// All mutation goes through [`RelayState::genesis`] and
/// [`RelayState::retarget`], which either apply fully or leave the state
/// untouched. Deserializing checks the stored epochs against the same
/// rules, so a snapshot edited by hand is refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRelayState")]
pub struct RelayState {
    network: Network,
    tracker: EpochTracker,
}

#[derive(Deserialize)]
struct StoredRelayState {
    network: Network,
    tracker: EpochTracker,
}

impl TryFrom<StoredRelayState> for RelayState {
    type Error = RelayError;

    fn try_from(stored: StoredRelayState) -> Result<Self, Self::Error> {
        stored.tracker.check(stored.network.params())?;
        Ok(RelayState {
            network: stored.network,
            tracker: stored.tracker,
        })
    }
}

impl RelayState {
    /// Create an uninitialized relay for `network`.
    pub fn new(network: Network) -> Self {
        RelayState {
            network,
            tracker: EpochTracker::Uninitialized,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn params(&self) -> &'static ChainParams {
        self.network.params()
    }

    pub fn is_initialized(&self) -> bool {
        self.tracker.is_active()
    }

    /// Set the genesis checkpoint from one raw 80-byte header.
    pub fn genesis(
        &mut self,
        header_bytes: &[u8],
        height: u32,
        proof_length: u32,
    ) -> Result<EpochRecord, RelayError> {
        let header = Header::parse(header_bytes)?;
        self.genesis_header(&header, height, proof_length)
    }

    /// Set the genesis checkpoint from a parsed header.
    pub fn genesis_header(
        &mut self,
        header: &Header,
        height: u32,
        proof_length: u32,
    ) -> Result<EpochRecord, RelayError> {
        let epoch = self
            .tracker
            .genesis(header, height, proof_length, self.network.params())
            .inspect_err(|err| warn!(%err, height, "genesis rejected"))?;

        info!(
            network = %self.network,
            height,
            proof_length,
            bits = epoch.bits,
            difficulty = epoch.difficulty,
            hash = %header.block_hash_hex(),
            "relay genesis set"
        );
        Ok(epoch)
    }

    /// Apply a retarget from raw window bytes.
    ///
    /// `height` is the height of the new epoch's first block. It is checked
    /// before the window is parsed, so a stale or premature call fails with
    /// [`RelayError::EpochNotYetClosed`] whatever the bytes hold.
    pub fn retarget(&mut self, window_bytes: &[u8], height: u32) -> Result<EpochRecord, RelayError> {
        let expected = self.tracker.next_epoch_start()?;
        if height != expected {
            warn!(height, expected, "retarget for an epoch that is not next");
            return Err(RelayError::EpochNotYetClosed { expected, found: height });
        }

        let window = parse_headers(window_bytes)
            .map_err(RelayError::RetargetProofRejected)
            .inspect_err(|err| warn!(%err, height, "retarget window rejected"))?;
        self.retarget_headers(&window, height)
    }

    /// Apply a retarget from parsed window headers.
    pub fn retarget_headers(
        &mut self,
        window: &[Header],
        height: u32,
    ) -> Result<EpochRecord, RelayError> {
        let epoch = self
            .tracker
            .retarget(window, height, self.network.params())
            .inspect_err(|err| warn!(%err, height, "retarget rejected"))?;

        info!(
            network = %self.network,
            epoch = epoch.index,
            start_height = epoch.start_height,
            bits = epoch.bits,
            difficulty = epoch.difficulty,
            "retarget applied"
        );
        Ok(epoch)
    }

    pub fn current_difficulty(&self) -> Result<u128, RelayError> {
        self.tracker.current_difficulty()
    }

    /// `Ok(None)` until the first retarget closes the genesis epoch.
    pub fn previous_difficulty(&self) -> Result<Option<u128>, RelayError> {
        self.tracker.previous_difficulty()
    }

    pub fn relay_range(&self) -> Result<RelayRange, RelayError> {
        self.tracker.relay_range()
    }

    pub fn proof_length(&self) -> Result<u32, RelayError> {
        self.tracker.proof_length()
    }

    pub fn genesis_height(&self) -> Result<u32, RelayError> {
        self.tracker.genesis_height()
    }

    pub fn current_epoch(&self) -> Result<&EpochRecord, RelayError> {
        self.tracker.current()
    }

    pub fn previous_epoch(&self) -> Result<Option<&EpochRecord>, RelayError> {
        self.tracker.previous()
    }

    /// Block subsidy at `height` under this relay's network schedule.
    pub fn issuance_at_height(&self, height: u32) -> u64 {
        self.network.block_subsidy(height)
    }
}
