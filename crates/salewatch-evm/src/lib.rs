//! # salewatch-evm
//!
//! Signature-driven EVM log decoding and sale reconstruction.
//!
//! ## Implementation notes
//! - Uses `alloy-json-abi` to parse human-readable event signatures and
//!   `alloy-core` for ABI decode
//! - Topics[0] → event signature fingerprint (keccak256)
//! - Topics[1..] → indexed parameters (each 32 bytes, ABI-encoded)
//! - `data` → non-indexed parameters (ABI-encoded parameter sequence)
//! - Ordex-style sales are rebuilt from two logs of one transaction by the
//!   [`Correlator`]

pub mod correlator;
pub mod decoder;
pub mod fingerprint;
pub mod normalizer;
pub mod pipeline;
pub mod sale;
pub mod signature;

pub use correlator::Correlator;
pub use decoder::LogDecoder;
pub use pipeline::SalePipeline;
pub use sale::{format_ether, SaleNormalizer};
pub use signature::{EventParam, EventSignature};
