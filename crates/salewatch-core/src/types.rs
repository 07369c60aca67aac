//! Decoded field values.
//!
//! Marketplace contracts disagree on how they encode the same concept (an
//! ethscription id is a `bytes32` on most markets and a `uint256` on
//! Ordex). The decoder maps every ABI value into `FieldValue` so the sale
//! normalizer can apply one set of conversion rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded log parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Uint(u128),
    /// Uints wider than u128, stored as a decimal string
    BigUint(String),
    Int(i128),
    /// Ints wider than i128, stored as a decimal string
    BigInt(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    /// 20-byte address, `0x`-prefixed hex
    Address(String),
    Array(Vec<FieldValue>),
    Tuple(Vec<(String, FieldValue)>),
    Null,
}

impl FieldValue {
    /// Returns `true` if this value is logically absent.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns `true` for unsigned integers of any width.
    pub fn is_uint(&self) -> bool {
        matches!(self, FieldValue::Uint(_) | FieldValue::BigUint(_))
    }

    /// Returns the inner string if this is an Address value.
    pub fn as_address(&self) -> Option<&str> {
        match self {
            FieldValue::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the raw bytes if this is a Bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Uint(_) | FieldValue::BigUint(_) => "uint",
            FieldValue::Int(_) | FieldValue::BigInt(_) => "int",
            FieldValue::Bool(_) => "bool",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Str(_) => "string",
            FieldValue::Address(_) => "address",
            FieldValue::Array(_) => "array",
            FieldValue::Tuple(_) => "tuple",
            FieldValue::Null => "null",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Uint(v) => write!(f, "{v}"),
            FieldValue::BigUint(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::BigInt(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            FieldValue::Str(s) => write!(f, "{s}"),
            FieldValue::Address(a) => write!(f, "{a}"),
            FieldValue::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            FieldValue::Tuple(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            FieldValue::Null => write!(f, "null"),
        }
    }
}
