//! Marketplace descriptions: which contract to watch, which event marks a
//! sale, and where each sale attribute lives in the decoded log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of attributes every sale carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    HashId,
    Value,
    Seller,
    Buyer,
}

impl FieldRole {
    pub const ALL: [FieldRole; 4] = [
        FieldRole::HashId,
        FieldRole::Value,
        FieldRole::Seller,
        FieldRole::Buyer,
    ];
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldRole::HashId => "hash_id",
            FieldRole::Value => "value",
            FieldRole::Seller => "seller",
            FieldRole::Buyer => "buyer",
        };
        write!(f, "{s}")
    }
}

/// Role → decoded field name for one marketplace event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTargets {
    pub hash_id: String,
    pub value: String,
    pub seller: String,
    pub buyer: String,
}

impl FieldTargets {
    pub fn new(
        hash_id: impl Into<String>,
        value: impl Into<String>,
        seller: impl Into<String>,
        buyer: impl Into<String>,
    ) -> Self {
        Self {
            hash_id: hash_id.into(),
            value: value.into(),
            seller: seller.into(),
            buyer: buyer.into(),
        }
    }

    /// The field name that holds `role`.
    pub fn field(&self, role: FieldRole) -> &str {
        match role {
            FieldRole::HashId => &self.hash_id,
            FieldRole::Value => &self.value,
            FieldRole::Seller => &self.seller,
            FieldRole::Buyer => &self.buyer,
        }
    }
}

/// A secondary event that must be found in the same transaction receipt
/// and merged into the primary event before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub signature: String,
    pub contract_address: String,
}

/// Describes one sale event of a marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceEventSpec {
    /// Human-readable signature, e.g.
    /// `event PhunkBought(bytes32 indexed phunkId, uint256 value, ...)`
    pub signature: String,
    /// Logical name for logs
    pub event_name: String,
    pub field_targets: FieldTargets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Correlation>,
    /// Contract that emits the primary event when it is not the market
    /// contract. Only consulted when the primary log has to be located in
    /// a transaction receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitter: Option<String>,
}

impl MarketplaceEventSpec {
    pub fn new(
        event_name: impl Into<String>,
        signature: impl Into<String>,
        field_targets: FieldTargets,
    ) -> Self {
        Self {
            signature: signature.into(),
            event_name: event_name.into(),
            field_targets,
            correlation: None,
            emitter: None,
        }
    }

    pub fn with_correlation(
        mut self,
        signature: impl Into<String>,
        contract_address: impl Into<String>,
    ) -> Self {
        self.correlation = Some(Correlation {
            signature: signature.into(),
            contract_address: contract_address.into(),
        });
        self
    }

    pub fn with_emitter(mut self, address: impl Into<String>) -> Self {
        self.emitter = Some(address.into());
        self
    }

    /// The signature to subscribe to and to query logs with.
    ///
    /// When a correlation exists the secondary event is the one that marks
    /// the sale on the market contract, so it is watched instead of the
    /// primary.
    pub fn watch_signature(&self) -> &str {
        self.correlation
            .as_ref()
            .map(|c| c.signature.as_str())
            .unwrap_or(&self.signature)
    }
}

/// A marketplace and the sale events it emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub name: String,
    pub display_url: String,
    pub contract_address: String,
    pub events: Vec<MarketplaceEventSpec>,
}

impl Market {
    pub fn new(
        name: impl Into<String>,
        display_url: impl Into<String>,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_url: display_url.into(),
            contract_address: contract_address.into(),
            events: vec![],
        }
    }

    pub fn with_event(mut self, spec: MarketplaceEventSpec) -> Self {
        self.events.push(spec);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> FieldTargets {
        FieldTargets::new("_ethscriptionId", "newLeftFill", "_from", "_to")
    }

    #[test]
    fn targets_resolve_by_role() {
        let t = targets();
        assert_eq!(t.field(FieldRole::HashId), "_ethscriptionId");
        assert_eq!(t.field(FieldRole::Value), "newLeftFill");
        assert_eq!(t.field(FieldRole::Seller), "_from");
        assert_eq!(t.field(FieldRole::Buyer), "_to");
    }

    #[test]
    fn watch_signature_prefers_correlation() {
        let plain = MarketplaceEventSpec::new("Match", "event Match(bytes32 a)", targets());
        assert_eq!(plain.watch_signature(), "event Match(bytes32 a)");

        let correlated = plain.with_correlation("event InternalItemTransfer(address indexed _from)", "0x1");
        assert_eq!(
            correlated.watch_signature(),
            "event InternalItemTransfer(address indexed _from)"
        );
    }

    #[test]
    fn market_serde_omits_absent_correlation() {
        let market = Market::new("Etch Market", "https://etch.market", "0x57b8")
            .with_event(MarketplaceEventSpec::new("E", "event E()", targets()));
        let json = serde_json::to_string(&market).unwrap();
        assert!(!json.contains("correlation"));
        let back: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(back, market);
    }
}
