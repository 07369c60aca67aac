//! # salewatch-core
//!
//! Data model, error taxonomy and collaborator traits shared by every
//! Salewatch crate. The decoder, the live watch dispatcher and the backfill
//! indexer are all built on the types defined here.

pub mod error;
pub mod ledger;
pub mod log;
pub mod market;
pub mod memory;
pub mod registry;
pub mod sale;
pub mod types;

pub use error::{
    BackfillError, DecodeError, LedgerError, NormalizeError, PipelineError, RegistryError,
};
pub use ledger::{LedgerClient, LogBatchStream, LogSubscription, ReceiptFetcher, SubscriptionHandle};
pub use log::{BlockRange, RawLog};
pub use market::{Correlation, FieldRole, FieldTargets, Market, MarketplaceEventSpec};
pub use memory::MemoryLedger;
pub use registry::MarketRegistry;
pub use sale::{DecodedFields, SaleRecord};
pub use types::FieldValue;
