//! `SaleNormalizer`: maps per-market decoded fields onto a `SaleRecord`.

use alloy_primitives::U256;
use salewatch_core::{
    error::NormalizeError,
    log::RawLog,
    market::{FieldRole, Market, MarketplaceEventSpec},
    sale::{DecodedFields, SaleRecord},
    types::FieldValue,
};
use std::sync::Arc;

const WEI_DECIMALS: usize = 18;

/// Stateless normalizer. Every conversion rule lives here so that all
/// markets produce identically shaped records.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaleNormalizer;

impl SaleNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        fields: &DecodedFields,
        spec: &MarketplaceEventSpec,
        market: &Arc<Market>,
        origin: &RawLog,
    ) -> Result<SaleRecord, NormalizeError> {
        let hash_id = hash_id(lookup(fields, spec, FieldRole::HashId)?)?;
        let value_eth = value_eth(lookup(fields, spec, FieldRole::Value)?)?;
        let seller = address(lookup(fields, spec, FieldRole::Seller)?)?;
        let buyer = address(lookup(fields, spec, FieldRole::Buyer)?)?;

        Ok(SaleRecord {
            hash_id,
            value_eth,
            seller,
            buyer,
            tx_hash: origin.transaction_hash.clone(),
            block_number: origin.block_number,
            log_index: origin.log_index,
            event_name: spec.event_name.clone(),
            market: Arc::clone(market),
        })
    }
}

/// A role's value, borrowed together with what is needed to report on it.
struct Target<'a> {
    role: FieldRole,
    field: &'a str,
    value: &'a FieldValue,
}

impl Target<'_> {
    fn mismatch(&self, expected: &'static str) -> NormalizeError {
        NormalizeError::TypeMismatch {
            role: self.role,
            field: self.field.to_string(),
            expected,
            got: self.value.type_name().to_string(),
        }
    }
}

fn lookup<'a>(
    fields: &'a DecodedFields,
    spec: &'a MarketplaceEventSpec,
    role: FieldRole,
) -> Result<Target<'a>, NormalizeError> {
    let field = spec.field_targets.field(role);
    match fields.get(field) {
        Some(value) if !value.is_null() => Ok(Target { role, field, value }),
        _ => Err(NormalizeError::MissingField {
            role,
            field: field.to_string(),
        }),
    }
}

fn as_u256(t: &Target<'_>) -> Result<U256, NormalizeError> {
    match t.value {
        FieldValue::Uint(v) => Ok(U256::from(*v)),
        FieldValue::BigUint(s) => U256::from_str_radix(s, 10).map_err(|_| t.mismatch("uint256")),
        _ => Err(t.mismatch("uint256")),
    }
}

/// `0x` + 64 lowercase hex digits.
fn hash_id(t: Target<'_>) -> Result<String, NormalizeError> {
    match t.value {
        FieldValue::Uint(_) | FieldValue::BigUint(_) => {
            let word = as_u256(&t)?.to_be_bytes::<32>();
            Ok(format!("0x{}", hex::encode(word)))
        }
        FieldValue::Bytes(b) if b.len() == 32 => Ok(format!("0x{}", hex::encode(b))),
        FieldValue::Str(s) if is_hash_hex(s) => Ok(s.to_lowercase()),
        _ => Err(t.mismatch("bytes32 or uint256")),
    }
}

fn is_hash_hex(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

fn value_eth(t: Target<'_>) -> Result<String, NormalizeError> {
    Ok(format_ether(as_u256(&t)?))
}

fn address(t: Target<'_>) -> Result<String, NormalizeError> {
    match t.value.as_address() {
        Some(a) => Ok(a.to_lowercase()),
        None => Err(t.mismatch("address")),
    }
}

/// Exact decimal rendering of `wei / 10^18`, trailing fractional zeros
/// trimmed.
pub fn format_ether(wei: U256) -> String {
    let digits = wei.to_string();
    let padded = format!("{digits:0>width$}", width = WEI_DECIMALS + 1);
    let (whole, frac) = padded.split_at(padded.len() - WEI_DECIMALS);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}
