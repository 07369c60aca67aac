//! `Correlator`: reconstructs a sale whose fields are split across two
//! logs of the same transaction.

use salewatch_core::{
    error::PipelineError,
    ledger::ReceiptFetcher,
    log::RawLog,
    market::{Correlation, MarketplaceEventSpec},
    sale::DecodedFields,
};
use std::sync::Arc;
use tracing::debug;

use crate::{decoder::decode_with, signature::EventSignature, LogDecoder};

#[derive(Debug, Clone)]
pub struct Correlator {
    decoder: Arc<LogDecoder>,
}

impl Correlator {
    pub fn new(decoder: Arc<LogDecoder>) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &Arc<LogDecoder> {
        &self.decoder
    }

    /// Decode `log` into the complete field set of `spec`.
    ///
    /// Without a correlation this is a plain decode. With one, the receipt
    /// of the log's transaction is fetched and the secondary fields are
    /// merged over the primary ones. `log` is always one half of the pair,
    /// so a transaction settling several items yields one field set per
    /// delivered log. `Ok(None)` means one of the two logs is not in the
    /// transaction.
    pub async fn correlate<R>(
        &self,
        log: &RawLog,
        spec: &MarketplaceEventSpec,
        receipts: &R,
    ) -> Result<Option<DecodedFields>, PipelineError>
    where
        R: ReceiptFetcher + ?Sized,
    {
        let Some(correlation) = &spec.correlation else {
            return Ok(Some(self.decoder.decode(log, &spec.signature)?));
        };

        let primary_sig = self.decoder.signature(&spec.signature)?;
        let secondary_sig = self.decoder.signature(&correlation.signature)?;

        let receipt = receipts
            .transaction_receipt(&log.transaction_hash)
            .await
            .map_err(|source| PipelineError::ReceiptFetch {
                tx_hash: log.transaction_hash.clone(),
                source,
            })?;

        let Some(primary) = find_primary(log, spec, &primary_sig, &receipt) else {
            debug!(
                tx = %log.transaction_hash,
                event = %spec.event_name,
                "no primary log in transaction; skipping"
            );
            return Ok(None);
        };
        let Some(secondary) = find_secondary(log, primary, correlation, &secondary_sig, &receipt)
        else {
            debug!(
                tx = %log.transaction_hash,
                event = %spec.event_name,
                correlation = %secondary_sig.name(),
                "no correlated log in transaction; skipping"
            );
            return Ok(None);
        };

        let mut fields = decode_with(primary, &primary_sig)?;
        fields.merge(decode_with(secondary, &secondary_sig)?);
        Ok(Some(fields))
    }
}

/// The primary log paired with `log`.
///
/// `log` itself when it is a primary from the expected emitter, otherwise
/// the closest primary before it in the receipt, falling back to the
/// closest one after it.
fn find_primary<'a>(
    log: &'a RawLog,
    spec: &MarketplaceEventSpec,
    sig: &EventSignature,
    receipt: &'a [RawLog],
) -> Option<&'a RawLog> {
    let is_primary = |l: &RawLog| {
        l.has_topic0(sig.fingerprint())
            && spec.emitter.as_deref().map_or(true, |e| l.emitted_by(e))
    };
    if is_primary(log) {
        return Some(log);
    }
    closest(receipt, log.log_index, is_primary, Side::Before)
}

/// The secondary log paired with `primary`.
///
/// `log` itself when it is the correlated event, otherwise the closest
/// secondary after `primary`, falling back to the closest one before it.
fn find_secondary<'a>(
    log: &'a RawLog,
    primary: &RawLog,
    correlation: &Correlation,
    sig: &EventSignature,
    receipt: &'a [RawLog],
) -> Option<&'a RawLog> {
    let is_secondary = |l: &RawLog| {
        l.emitted_by(&correlation.contract_address) && l.has_topic0(sig.fingerprint())
    };
    if is_secondary(log) {
        return Some(log);
    }
    closest(receipt, primary.log_index, is_secondary, Side::After)
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

/// The matching receipt log nearest to `anchor` on the preferred side, or
/// nearest on the other side when the preferred side has none.
fn closest<'a>(
    receipt: &'a [RawLog],
    anchor: u32,
    matches: impl Fn(&RawLog) -> bool,
    prefer: Side,
) -> Option<&'a RawLog> {
    let before = || {
        receipt
            .iter()
            .filter(|l| l.log_index < anchor && matches(*l))
            .max_by_key(|l| l.log_index)
    };
    let after = || {
        receipt
            .iter()
            .filter(|l| l.log_index > anchor && matches(*l))
            .min_by_key(|l| l.log_index)
    };
    match prefer {
        Side::Before => before().or_else(after),
        Side::After => after().or_else(before),
    }
}
