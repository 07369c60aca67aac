//! Fluent builder for backfill runs.
//!
//! # Example
//!
//! ```rust
//! use salewatch_index::BackfillConfigBuilder;
//!
//! let config = BackfillConfigBuilder::new()
//!     .lookback_blocks(25_000)
//!     .chunk_size(2_000)
//!     .build();
//! assert_eq!(config.chunk_size, 2_000);
//! ```

use crate::config::BackfillConfig;

/// Fluent builder for `BackfillConfig`.
#[derive(Debug, Default)]
pub struct BackfillConfigBuilder {
    config: BackfillConfig,
}

impl BackfillConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many blocks before the head the replay starts.
    pub fn lookback_blocks(mut self, blocks: u64) -> Self {
        self.config.lookback_blocks = blocks;
        self
    }

    /// Set the number of blocks per range query.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn build(self) -> BackfillConfig {
        self.config
    }
}
