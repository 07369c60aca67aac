//! In-memory `MarketRegistry` implementation.
//!
//! Markets are kept in insertion order. The table is built once at startup
//! and shared read-only across watcher tasks.

use indexmap::IndexMap;
use salewatch_core::{
    error::RegistryError,
    market::{FieldRole, Market},
    registry::MarketRegistry,
};
use std::sync::Arc;

/// Ordered, immutable-after-build marketplace registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    markets: IndexMap<String, Arc<Market>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a market. Names are unique.
    pub fn add(&mut self, market: Market) -> Result<(), RegistryError> {
        validate(&market)?;
        if self.markets.contains_key(&market.name) {
            return Err(RegistryError::AlreadyExists {
                name: market.name.clone(),
            });
        }
        self.markets.insert(market.name.clone(), Arc::new(market));
        Ok(())
    }

    /// Build a registry from a JSON array of markets.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let markets: Vec<Market> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for market in markets {
            registry.add(market)?;
        }
        Ok(registry)
    }

    /// Total number of markets.
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Collects markets keyed by name without validation. A repeated name
/// replaces the earlier market in its original position.
impl FromIterator<Market> for MemoryRegistry {
    fn from_iter<I: IntoIterator<Item = Market>>(iter: I) -> Self {
        let markets = iter
            .into_iter()
            .map(|m| (m.name.clone(), Arc::new(m)))
            .collect();
        Self { markets }
    }
}

impl MarketRegistry for MemoryRegistry {
    fn markets(&self) -> Vec<Arc<Market>> {
        self.markets.values().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<Arc<Market>> {
        self.markets.get(name).cloned()
    }
}

fn validate(market: &Market) -> Result<(), RegistryError> {
    if market.contract_address.is_empty() {
        return Err(RegistryError::ValidationFailed {
            reason: format!("market '{}' has no contract address", market.name),
        });
    }
    if market.events.is_empty() {
        return Err(RegistryError::ValidationFailed {
            reason: format!("market '{}' declares no sale events", market.name),
        });
    }
    for spec in &market.events {
        for role in FieldRole::ALL {
            if spec.field_targets.field(role).is_empty() {
                return Err(RegistryError::ValidationFailed {
                    reason: format!(
                        "event '{}' of '{}' has no target for role {role}",
                        spec.event_name, market.name
                    ),
                });
            }
        }
        if let Some(c) = &spec.correlation {
            if c.contract_address.is_empty() || c.signature.is_empty() {
                return Err(RegistryError::ValidationFailed {
                    reason: format!(
                        "event '{}' of '{}' has an incomplete correlation",
                        spec.event_name, market.name
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salewatch_core::market::{FieldTargets, MarketplaceEventSpec};

    fn market(name: &str) -> Market {
        Market::new(name, "https://example.org", "0x01").with_event(MarketplaceEventSpec::new(
            "Sale",
            "event Sale(bytes32 indexed id, uint256 price, address seller, address buyer)",
            FieldTargets::new("id", "price", "seller", "buyer"),
        ))
    }

    #[test]
    fn preserves_insertion_order() {
        let mut reg = MemoryRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            reg.add(market(name)).unwrap();
        }
        let names: Vec<_> = reg.markets().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn rejects_duplicates() {
        let mut reg = MemoryRegistry::new();
        reg.add(market("a")).unwrap();
        assert!(matches!(
            reg.add(market("a")),
            Err(RegistryError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn rejects_empty_target() {
        let mut m = market("a");
        m.events[0].field_targets.buyer.clear();
        let err = MemoryRegistry::new().add(m).unwrap_err();
        assert!(err.to_string().contains("role buyer"));
    }

    #[test]
    fn loads_from_json() {
        let json = serde_json::to_string(&vec![market("a"), market("b")]).unwrap();
        let reg = MemoryRegistry::from_json(&json).unwrap();
        assert_eq!(reg.len(), 2);
        let a = reg.get("a").unwrap();
        assert_eq!(reg.specs_for(&a).len(), 1);
        assert_eq!(reg.watch_pairs().len(), 2);
    }

    #[test]
    fn collects_in_order_and_replaces_repeated_names() {
        let mut replacement = market("zeta");
        replacement.display_url = "https://zeta.example".into();
        let reg: MemoryRegistry = [market("zeta"), market("alpha"), replacement]
            .into_iter()
            .collect();
        let names: Vec<_> = reg.markets().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(reg.get("zeta").unwrap().display_url, "https://zeta.example");
    }
}
