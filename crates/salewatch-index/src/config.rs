//! Backfill configuration.

use serde::{Deserialize, Serialize};

/// How far back to replay and how wide each range query may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Blocks before the head to start from
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
    /// Blocks per `get_logs` call. Providers commonly cap this at 10k.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

fn default_lookback_blocks() -> u64 { 100_000 }
fn default_chunk_size() -> u64 { 10_000 }

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: default_lookback_blocks(),
            chunk_size: default_chunk_size(),
        }
    }
}
