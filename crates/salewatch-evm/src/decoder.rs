//! `LogDecoder`: turns a `RawLog` into named `DecodedFields` given the
//! event signature it was emitted under.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use salewatch_core::{error::DecodeError, log::RawLog, sale::DecodedFields, types::FieldValue};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    fingerprint, normalizer,
    signature::{EventParam, EventSignature},
};

/// Signature-driven EVM log decoder.
///
/// Parsed signatures are cached by their source string, so the hot path
/// never re-parses. Thread-safe; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct LogDecoder {
    cache: RwLock<HashMap<String, Arc<EventSignature>>>,
}

impl LogDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `signature`, or return the cached parse.
    pub fn signature(&self, signature: &str) -> Result<Arc<EventSignature>, DecodeError> {
        if let Some(sig) = self.cache.read().unwrap().get(signature) {
            return Ok(Arc::clone(sig));
        }
        let parsed = Arc::new(EventSignature::parse(signature)?);
        let mut cache = self.cache.write().unwrap();
        let entry = cache
            .entry(signature.to_string())
            .or_insert_with(|| Arc::clone(&parsed));
        Ok(Arc::clone(entry))
    }

    /// The topic0 a log emitted under `signature` carries.
    pub fn fingerprint(&self, signature: &str) -> Result<String, DecodeError> {
        Ok(self.signature(signature)?.fingerprint().to_string())
    }

    /// Decode `log` against `signature`.
    pub fn decode(&self, log: &RawLog, signature: &str) -> Result<DecodedFields, DecodeError> {
        let sig = self.signature(signature)?;
        decode_with(log, &sig)
    }
}

/// Decode `log` against an already parsed signature.
///
/// Fields come back in declaration order, indexed and data parameters
/// interleaved as the signature lists them.
pub fn decode_with(log: &RawLog, sig: &EventSignature) -> Result<DecodedFields, DecodeError> {
    match log.topic0() {
        Some(t0) if t0.eq_ignore_ascii_case(sig.fingerprint()) => {}
        other => {
            return Err(DecodeError::SignatureMismatch {
                expected: sig.fingerprint().to_string(),
                got: other.unwrap_or("<none>").to_string(),
            })
        }
    }

    let indexed: Vec<&EventParam> = sig.indexed_params().collect();
    let topic_args = &log.topics[1..];
    if topic_args.len() != indexed.len() {
        return Err(DecodeError::ArityMismatch {
            part: "topics",
            expected: indexed.len(),
            got: topic_args.len(),
        });
    }
    if let Some(expected) = sig.static_data_len() {
        if log.data.len() != expected {
            return Err(DecodeError::ArityMismatch {
                part: "data",
                expected,
                got: log.data.len(),
            });
        }
    }

    // Indexed params → topics[1..]
    let mut topic_values = Vec::with_capacity(indexed.len());
    for (param, topic) in indexed.iter().zip(topic_args) {
        topic_values.push(decode_topic(topic, param)?);
    }

    // Non-indexed params → data, one parameter sequence
    let data_values = decode_data(&log.data, sig)?;

    let mut topics = topic_values.into_iter();
    let mut data = data_values.into_iter();
    let mut fields = DecodedFields::new();
    for param in sig.params() {
        let next = if param.indexed {
            topics.next()
        } else {
            data.next()
        };
        fields.insert(param.name.clone(), next.unwrap_or(FieldValue::Null));
    }
    Ok(fields)
}

/// Decode one indexed topic (always a 32-byte word).
///
/// Value types are padded into the word and decode directly. Reference
/// types are stored as the keccak256 of their encoding, so the raw hash
/// comes back as `Bytes`.
fn decode_topic(topic_hex: &str, param: &EventParam) -> Result<FieldValue, DecodeError> {
    if !fingerprint::is_topic_hash(topic_hex) {
        return Err(DecodeError::InvalidRawLog {
            reason: format!("topic for '{}' is not a 32-byte word: {topic_hex}", param.name),
        });
    }
    let hex = topic_hex.strip_prefix("0x").unwrap_or(topic_hex);
    let bytes = hex::decode(hex).map_err(|e| DecodeError::InvalidRawLog {
        reason: format!("invalid topic hex for '{}': {e}", param.name),
    })?;

    if param.is_hashed_in_topic() {
        return Ok(FieldValue::Bytes(bytes));
    }

    param
        .ty
        .abi_decode(&bytes)
        .map(normalizer::normalize)
        .map_err(|e| DecodeError::AbiDecodeFailed {
            reason: format!("topic '{}': {e}", param.name),
        })
}

fn decode_data(data: &[u8], sig: &EventSignature) -> Result<Vec<FieldValue>, DecodeError> {
    let types: Vec<DynSolType> = sig.data_params().map(|p| p.ty.clone()).collect();
    if types.is_empty() {
        return Ok(vec![]);
    }

    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| DecodeError::AbiDecodeFailed {
            reason: e.to_string(),
        })?;

    let values = match decoded {
        DynSolValue::Tuple(vals) => vals,
        other => vec![other],
    };
    Ok(values.into_iter().map(normalizer::normalize).collect())
}
