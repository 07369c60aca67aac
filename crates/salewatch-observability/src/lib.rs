//! # salewatch-observability
//!
//! Structured logging for Salewatch.
//!
//! Every crate logs through `tracing` with structured fields (`market`,
//! `event`, `tx`, `kind`, chunk bounds). This crate installs the global
//! subscriber: an `EnvFilter` built from a global level plus per-crate
//! overrides, and either human-readable or JSON output for log shippers.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
