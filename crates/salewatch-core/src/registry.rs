//! Read-only view of the marketplace table.
//! Concrete implementations live in `salewatch-registry`.

use std::sync::Arc;

use crate::market::{Market, MarketplaceEventSpec};

/// A thread-safe, read-only marketplace registry.
///
/// Iteration order is insertion order, so watch setup and backfill runs
/// are deterministic.
pub trait MarketRegistry: Send + Sync {
    /// All known markets, in insertion order.
    fn markets(&self) -> Vec<Arc<Market>>;

    /// Look up a market by its display name.
    fn get(&self, name: &str) -> Option<Arc<Market>>;

    /// The sale events of `market`, in declaration order.
    fn specs_for<'a>(&self, market: &'a Market) -> &'a [MarketplaceEventSpec] {
        &market.events
    }

    /// Every (market, event) pair, flattened in registry order.
    fn watch_pairs(&self) -> Vec<(Arc<Market>, MarketplaceEventSpec)> {
        self.markets()
            .into_iter()
            .flat_map(|m| {
                let specs = self.specs_for(&m).to_vec();
                specs.into_iter().map(move |s| (Arc::clone(&m), s))
            })
            .collect()
    }
}
