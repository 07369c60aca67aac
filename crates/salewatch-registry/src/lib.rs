//! # salewatch-registry
//!
//! Marketplace registry for Salewatch:
//! - `MemoryRegistry`: ordered, read-only-after-build `MarketRegistry`
//! - `builtin`: the known ethscription marketplaces and their sale events

pub mod builtin;
pub mod memory;

pub use memory::MemoryRegistry;
