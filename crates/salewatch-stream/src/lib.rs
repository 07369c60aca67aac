//! # salewatch-stream
//!
//! Live watch dispatcher for Salewatch.
//!
//! Subscribes to every (market, sale event) pair of a registry, runs each
//! delivered log through the `SalePipeline`, and hands the resulting
//! `SaleRecord`s to the consumer on one bounded channel per watch.
//!
//! ## Architecture
//! ```text
//! LedgerClient::subscribe_logs (per market event, Tokio task)
//!       │
//!       ▼
//! Vec<RawLog> batch ── one log at a time
//!       │
//!       ▼
//! SalePipeline (Correlator → SaleNormalizer)
//!       │
//!       ▼
//! mpsc::Sender<SaleRecord>   ← WatchHandle
//! ```

pub mod config;
pub mod dispatcher;

pub use config::WatchConfig;
pub use dispatcher::{WatchDispatcher, WatchExit, WatchHandle, WatchMetrics, WatchState};
