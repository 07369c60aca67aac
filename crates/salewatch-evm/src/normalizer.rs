//! Converts alloy-core `DynSolValue` → Salewatch `FieldValue`.

use alloy_core::dyn_abi::DynSolValue;
use salewatch_core::types::FieldValue;

/// Convert a decoded `DynSolValue` into a `FieldValue`.
pub fn normalize(val: DynSolValue) -> FieldValue {
    match val {
        DynSolValue::Bool(b) => FieldValue::Bool(b),

        DynSolValue::Int(i, _bits) => match i128::try_from(i) {
            Ok(v) => FieldValue::Int(v),
            Err(_) => FieldValue::BigInt(i.to_string()),
        },

        // Narrow whenever the value fits, regardless of declared width, so
        // that a uint256 id of 42 and a uint64 id of 42 compare equal.
        DynSolValue::Uint(u, _bits) => match u128::try_from(u) {
            Ok(v) => FieldValue::Uint(v),
            Err(_) => FieldValue::BigUint(u.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => FieldValue::Bytes(word[..size].to_vec()),

        DynSolValue::Bytes(b) => FieldValue::Bytes(b),

        DynSolValue::String(s) => FieldValue::Str(s),

        DynSolValue::Address(a) => FieldValue::Address(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            FieldValue::Array(vals.into_iter().map(normalize).collect())
        }

        DynSolValue::Tuple(fields) => {
            // Unnamed tuple fields get positional names "0", "1", ...
            let named: Vec<(String, FieldValue)> = fields
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), normalize(v)))
                .collect();
            FieldValue::Tuple(named)
        }

        DynSolValue::Function(f) => FieldValue::Bytes(f.to_vec()),
    }
}
