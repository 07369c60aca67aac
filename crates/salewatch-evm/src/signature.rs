//! Parsed event signatures.
//!
//! Marketplace specs carry human-readable signatures such as
//! `event PhunkBought(bytes32 indexed phunkId, uint256 value, ...)`. The
//! signature alone decides which parameters live in `topics[1..]` and
//! which are packed in `data`.

use alloy_core::dyn_abi::DynSolType;
use alloy_dyn_abi::Specifier;
use alloy_json_abi::Event;
use salewatch_core::error::DecodeError;

use crate::fingerprint;

/// One declared event parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct EventParam {
    pub name: String,
    pub ty: DynSolType,
    pub indexed: bool,
}

impl EventParam {
    /// Occupies exactly one 32-byte word when ABI-encoded.
    pub fn is_single_word(&self) -> bool {
        matches!(
            self.ty,
            DynSolType::Bool
                | DynSolType::Int(_)
                | DynSolType::Uint(_)
                | DynSolType::FixedBytes(_)
                | DynSolType::Address
        )
    }

    /// Indexed reference types are stored as the keccak256 of their value,
    /// so the original is unrecoverable from the topic.
    pub fn is_hashed_in_topic(&self) -> bool {
        self.indexed
            && matches!(
                self.ty,
                DynSolType::String
                    | DynSolType::Bytes
                    | DynSolType::Array(_)
                    | DynSolType::FixedArray(..)
                    | DynSolType::Tuple(_)
            )
    }
}

/// A parsed, non-anonymous event signature.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSignature {
    name: String,
    canonical: String,
    fingerprint: String,
    params: Vec<EventParam>,
}

impl EventSignature {
    /// Parse `event Name(type [indexed] name, ...)`; the `event` keyword is
    /// optional.
    pub fn parse(signature: &str) -> Result<Self, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidSignature {
            signature: signature.to_string(),
            reason,
        };

        let event = Event::parse(signature.trim()).map_err(|e| invalid(e.to_string()))?;
        if event.anonymous {
            return Err(invalid("anonymous events have no topic0".into()));
        }

        let params = event
            .inputs
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let ty = p.resolve().map_err(|e| invalid(e.to_string()))?;
                let name = if p.name.is_empty() {
                    format!("arg{i}")
                } else {
                    p.name.clone()
                };
                Ok(EventParam {
                    name,
                    ty,
                    indexed: p.indexed,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        let canonical = event.signature();
        Ok(Self {
            name: event.name.clone(),
            fingerprint: fingerprint::keccak256_signature(&canonical),
            canonical,
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Name(type1,type2,...)`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The expected topic0, `0x`-prefixed lowercase hex.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All parameters in declaration order.
    pub fn params(&self) -> &[EventParam] {
        &self.params
    }

    /// Parameters carried in `topics[1..]`, in declaration order.
    pub fn indexed_params(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| p.indexed)
    }

    /// Parameters ABI-encoded in `data`, in declaration order.
    pub fn data_params(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| !p.indexed)
    }

    /// Exact `data` length in bytes when every data parameter is a single
    /// static word; `None` when the payload contains dynamic or composite
    /// types.
    pub fn static_data_len(&self) -> Option<usize> {
        let mut words = 0;
        for p in self.data_params() {
            if !p.is_single_word() {
                return None;
            }
            words += 1;
        }
        Some(words * 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indexed_layout() {
        let sig = EventSignature::parse(
            "event PhunkBought(bytes32 indexed phunkId, uint256 value, address indexed fromAddress, address indexed toAddress)",
        )
        .unwrap();
        assert_eq!(sig.name(), "PhunkBought");
        assert_eq!(sig.canonical(), "PhunkBought(bytes32,uint256,address,address)");
        let indexed: Vec<_> = sig.indexed_params().map(|p| p.name.as_str()).collect();
        assert_eq!(indexed, vec!["phunkId", "fromAddress", "toAddress"]);
        let data: Vec<_> = sig.data_params().map(|p| p.name.as_str()).collect();
        assert_eq!(data, vec!["value"]);
        assert_eq!(sig.static_data_len(), Some(32));
    }

    #[test]
    fn fingerprint_matches_canonical_hash() {
        let sig = EventSignature::parse(
            "event Transfer(address indexed from, address indexed to, uint256 value)",
        )
        .unwrap();
        assert_eq!(
            sig.fingerprint(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn keyword_is_optional() {
        let a = EventSignature::parse("Match(bytes32 leftHash, bytes32 rightHash, uint256 newLeftFill, uint256 newRightFill)").unwrap();
        let b = EventSignature::parse("event Match(bytes32 leftHash, bytes32 rightHash, uint256 newLeftFill, uint256 newRightFill)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dynamic_payload_has_no_static_len() {
        let sig = EventSignature::parse("event Note(string text, uint256 n)").unwrap();
        assert_eq!(sig.static_data_len(), None);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = EventSignature::parse("not a signature (").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSignature { .. }));
    }
}
