//! `SalePipeline`: correlate, decode and normalize one raw log.
//!
//! Both the live dispatcher and the backfill indexer drive logs through
//! this single entry point.

use salewatch_core::{
    error::PipelineError,
    ledger::ReceiptFetcher,
    log::RawLog,
    market::{Market, MarketplaceEventSpec},
    sale::SaleRecord,
};
use std::sync::Arc;

use crate::{Correlator, LogDecoder, SaleNormalizer};

#[derive(Debug, Clone)]
pub struct SalePipeline {
    correlator: Correlator,
    normalizer: SaleNormalizer,
}

impl Default for SalePipeline {
    fn default() -> Self {
        Self::new(Arc::new(LogDecoder::new()))
    }
}

impl SalePipeline {
    pub fn new(decoder: Arc<LogDecoder>) -> Self {
        Self {
            correlator: Correlator::new(decoder),
            normalizer: SaleNormalizer::new(),
        }
    }

    pub fn decoder(&self) -> &Arc<LogDecoder> {
        self.correlator.decoder()
    }

    /// Turn `log` into a `SaleRecord`.
    ///
    /// `Ok(None)` when the sale is incomplete (a correlated log is absent
    /// from the transaction). The record carries the position of `log`,
    /// the log that was delivered by the subscription or range query.
    pub async fn process<R>(
        &self,
        log: &RawLog,
        market: &Arc<Market>,
        spec: &MarketplaceEventSpec,
        receipts: &R,
    ) -> Result<Option<SaleRecord>, PipelineError>
    where
        R: ReceiptFetcher + ?Sized,
    {
        let Some(fields) = self.correlator.correlate(log, spec, receipts).await? else {
            return Ok(None);
        };
        let record = self.normalizer.normalize(&fields, spec, market, log)?;
        Ok(Some(record))
    }
}
