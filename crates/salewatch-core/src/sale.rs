//! Decoded field maps and the canonical sale record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::market::Market;
use crate::types::FieldValue;

/// Field name → decoded value, in signature parameter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFields(IndexMap<String, FieldValue>);

impl DecodedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Overlay `secondary` onto `self`. Secondary values replace primary
    /// ones on a name collision.
    pub fn merge(&mut self, secondary: DecodedFields) {
        self.0.extend(secondary.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FieldValue)> for DecodedFields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One marketplace sale, normalized across marketplaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// `0x` + 64 lowercase hex digits
    pub hash_id: String,
    /// Sale price in whole ETH, exact decimal
    pub value_eth: String,
    /// Lowercase address
    pub seller: String,
    /// Lowercase address
    pub buyer: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u32,
    pub event_name: String,
    pub market: Arc<Market>,
}
