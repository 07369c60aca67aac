//! Event fingerprint computation.
//!
//! The fingerprint of an EVM event is the keccak256 hash of its canonical
//! signature string, e.g.:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef
//!
//! For raw logs, topics[0] IS the fingerprint.

use tiny_keccak::{Hasher, Keccak};

/// Compute the keccak256 fingerprint of a canonical signature string
/// (`"EventName(type1,type2,...)"`), as `0x`-prefixed lowercase hex.
pub fn keccak256_signature(canonical: &str) -> String {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(canonical.as_bytes());
    hasher.finalize(&mut output);
    format!("0x{}", hex::encode(output))
}

/// Returns `true` if `topic` looks like a 32-byte hex hash.
pub fn is_topic_hash(topic: &str) -> bool {
    let hex = topic.strip_prefix("0x").unwrap_or(topic);
    hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erc20_transfer_fingerprint() {
        let fp = keccak256_signature("Transfer(address,address,uint256)");
        assert_eq!(
            fp,
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(is_topic_hash(&fp));
    }

    #[test]
    fn rejects_short_topic() {
        assert!(!is_topic_hash("0x1234"));
    }
}
