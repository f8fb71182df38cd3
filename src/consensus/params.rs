//! Network consensus parameters.

use serde::{Deserialize, Serialize};

/// Compression bounds in force at a given height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionBounds {
    pub min_compression: u32,
    pub target_compression: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Target block spacing in seconds.
    pub target_spacing: u64,
    /// Rolling window for base-target adjustment, in blocks.
    pub rolling_window: i32,
    /// Subsidy halving interval in blocks; one halving is four years and
    /// anchors the compression schedule.
    pub halving_interval: i32,
    /// Calibrate the genesis base target for a tiny development capacity
    /// (16 nonces) instead of the 1 TiB mainnet assumption.
    pub low_capacity_calibration: bool,
    /// Blocks between an assignment transaction and its activation.
    pub assignment_delay: i32,
    /// Blocks between a revocation transaction and its taking effect.
    pub revocation_delay: i32,
    /// Bech32 prefix for the RPC-facing address form.
    pub bech32_hrp: String,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            target_spacing: 240,
            rolling_window: 360,
            halving_interval: 525_600,
            low_capacity_calibration: false,
            assignment_delay: 360,
            revocation_delay: 360,
            bech32_hrp: "pocx".to_string(),
        }
    }
}

impl ConsensusParams {
    /// Parameters for development chains: tiny capacity calibration, short
    /// windows and delays so state transitions are observable in tests.
    pub fn regtest() -> Self {
        ConsensusParams {
            target_spacing: 4,
            rolling_window: 32,
            halving_interval: 150,
            low_capacity_calibration: true,
            assignment_delay: 4,
            revocation_delay: 4,
            bech32_hrp: "pocxrt".to_string(),
        }
    }

    /// Genesis base target.
    ///
    /// A nonce covers 256 KiB, so 1 TiB of network capacity is 2^22 nonces
    /// and its expected best quality is 2^64 / 2^22 = 2^42. Dividing by the
    /// target spacing makes the expected deadline land on one block time.
    /// Low-capacity calibration substitutes 2^60 (16 nonces) so development
    /// networks mine without plotted storage.
    pub fn genesis_base_target(&self) -> u64 {
        let base_power: u64 = if self.low_capacity_calibration {
            1 << 60
        } else {
            1 << 42
        };
        (base_power / self.target_spacing.max(1)).max(1)
    }

    /// Compression bounds at a height. The minimum steps up at halving
    /// multiples 1, 3, 7, 15 and 31 (years 4, 12, 28, 60 and 124); the
    /// target level is always one above the minimum.
    pub fn compression_bounds(&self, height: i64) -> CompressionBounds {
        let halving = self.halving_interval as i64;
        let mut min_compression = 1u32;
        for (step, factor) in [(2u32, 1i64), (3, 3), (4, 7), (5, 15), (6, 31)] {
            if height >= factor * halving {
                min_compression = step;
            }
        }
        CompressionBounds {
            min_compression,
            target_compression: min_compression + 1,
        }
    }
}
