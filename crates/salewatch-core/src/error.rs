//! Error types for the Salewatch pipeline.

use thiserror::Error;

use crate::log::BlockRange;
use crate::market::FieldRole;

/// Errors that can occur while decoding a single log against a signature.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid event signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("Signature mismatch: expected topic0 {expected}, got {got}")]
    SignatureMismatch { expected: String, got: String },

    #[error("Arity mismatch in {part}: expected {expected}, got {got}")]
    ArityMismatch {
        part: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("Invalid raw log: {reason}")]
    InvalidRawLog { reason: String },
}

/// Errors raised while turning decoded fields into a `SaleRecord`.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Missing field '{field}' for role {role}")]
    MissingField { role: FieldRole, field: String },

    #[error("Field '{field}' for role {role}: expected {expected}, got {got}")]
    TypeMismatch {
        role: FieldRole,
        field: String,
        expected: &'static str,
        got: String,
    },
}

/// Errors from the marketplace registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Market '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("Market validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Parse error in market table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reported by the ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The provider rejected the block range of a log query.
    #[error("Provider rejected range {range}: {reason}")]
    Range { range: BlockRange, reason: String },

    #[error("Receipt unavailable for {tx_hash}: {reason}")]
    Receipt { tx_hash: String, reason: String },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Per-event failures of the correlate → normalize pipeline.
///
/// None of these are fatal to a watcher or a backfill: the event is
/// dropped and the loop continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Receipt fetch failed for {tx_hash}: {source}")]
    ReceiptFetch {
        tx_hash: String,
        #[source]
        source: LedgerError,
    },
}

impl PipelineError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Normalize(NormalizeError::MissingField { .. }) => "missing_field",
            Self::Normalize(NormalizeError::TypeMismatch { .. }) => "type_mismatch",
            Self::ReceiptFetch { .. } => "receipt_fetch",
        }
    }
}

/// Errors that terminate a single backfill call.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Failed to fetch chain head: {0}")]
    Head(#[source] LedgerError),

    #[error("Chunk query failed for {range}: {source}")]
    Chunk {
        range: BlockRange,
        #[source]
        source: LedgerError,
    },

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,
}

impl BackfillError {
    /// The block range that failed, if the error came from a chunk query.
    pub fn failed_range(&self) -> Option<BlockRange> {
        match self {
            Self::Chunk { range, .. } => Some(*range),
            _ => None,
        }
    }
}
