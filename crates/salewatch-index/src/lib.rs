//! # salewatch-index
//!
//! Historical sale replay under a provider-imposed block-range limit.
//!
//! The `Backfiller` reads the chain head once, splits the lookback window
//! into half-open chunks, queries them strictly in order and yields
//! normalized `SaleRecord`s lazily, chunk by chunk.

pub mod backfill;
pub mod builder;
pub mod config;

pub use backfill::{chunk_ranges, BackfillReport, BackfillStream, Backfiller};
pub use builder::BackfillConfigBuilder;
pub use config::BackfillConfig;
