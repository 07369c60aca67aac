//! Raw ledger logs and block ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw, undecoded EVM log as delivered by the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    /// Contract address that emitted the log
    pub address: String,
    /// topics[0] is the event signature hash; topics[1..] are indexed params
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed parameters
    pub data: Vec<u8>,
    /// Hash of the enclosing transaction
    pub transaction_hash: String,
    pub block_number: u64,
    /// Position of the log within its block
    pub log_index: u32,
}

impl RawLog {
    /// Returns topics[0], the event signature hash, if present.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }

    /// Case-insensitive topic0 comparison.
    pub fn has_topic0(&self, fingerprint: &str) -> bool {
        self.topic0()
            .map(|t| t.eq_ignore_ascii_case(fingerprint))
            .unwrap_or(false)
    }

    /// Case-insensitive emitter comparison.
    pub fn emitted_by(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }

    /// Sort key giving ascending chain order.
    pub fn position(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }
}

/// A half-open block interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of blocks covered.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.start && block < self.end
    }

    /// Last block covered, for providers that take inclusive bounds.
    pub fn last_block(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> RawLog {
        RawLog {
            address: "0xC33F8610941bE56fB0d84E25894C0d928CC97ddE".into(),
            topics: vec!["0xABCDEF".into()],
            data: vec![],
            transaction_hash: "0x01".into(),
            block_number: 7,
            log_index: 3,
        }
    }

    #[test]
    fn topic_and_address_matching_ignores_case() {
        let log = sample_log();
        assert!(log.has_topic0("0xabcdef"));
        assert!(!log.has_topic0("0xabcde0"));
        assert!(log.emitted_by("0xc33f8610941be56fb0d84e25894c0d928cc97dde"));
    }

    #[test]
    fn range_bounds() {
        let r = BlockRange::new(95_000, 100_000);
        assert_eq!(r.len(), 5_000);
        assert!(r.contains(95_000));
        assert!(!r.contains(100_000));
        assert_eq!(r.last_block(), Some(99_999));
        assert_eq!(BlockRange::new(5, 5).last_block(), None);
        assert_eq!(r.to_string(), "[95000, 100000)");
    }
}
