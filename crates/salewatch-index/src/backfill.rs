//! `Backfiller`: replays past sales of one marketplace event.
//!
//! # Plan
//! `head` is read once. The window `[head - lookback, head)` is split into
//! half-open chunks of at most `chunk_size` blocks; the head block itself
//! is left to the live watcher.
//!
//! # Execution
//! Chunks are queried one after another, never concurrently. Each chunk's
//! logs are ordered by `(block_number, log_index)` and run through the
//! `SalePipeline`. Records of a chunk are yielded before the next chunk is
//! queried. A failed chunk query ends the stream with its range attached.

use futures::{stream, Stream, StreamExt};
use salewatch_core::{
    error::BackfillError,
    ledger::LedgerClient,
    log::{BlockRange, RawLog},
    market::{Market, MarketplaceEventSpec},
    registry::MarketRegistry,
    sale::SaleRecord,
};
use salewatch_evm::SalePipeline;
use std::{collections::VecDeque, pin::Pin, sync::Arc};
use tracing::{debug, info, warn};

use crate::config::BackfillConfig;

/// Lazy stream of replayed sales.
pub type BackfillStream = Pin<Box<dyn Stream<Item = Result<SaleRecord, BackfillError>> + Send>>;

/// Outcome of a collected backfill run.
#[derive(Debug)]
pub struct BackfillReport {
    pub market: Arc<Market>,
    pub event_name: String,
    /// Every record yielded before the run ended
    pub records: Vec<SaleRecord>,
    /// Why the run stopped early, if it did
    pub error: Option<BackfillError>,
}

impl BackfillReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// The chunk plan for a head of `head`.
///
/// `[from, min(from + chunk_size, head))` for `from = head - lookback`
/// stepping by `chunk_size` while `from < head`.
pub fn chunk_ranges(
    head: u64,
    lookback_blocks: u64,
    chunk_size: u64,
) -> Result<Vec<BlockRange>, BackfillError> {
    if chunk_size == 0 {
        return Err(BackfillError::InvalidChunkSize);
    }
    let mut ranges = Vec::new();
    let mut from = head.saturating_sub(lookback_blocks);
    while from < head {
        let to = from.saturating_add(chunk_size).min(head);
        ranges.push(BlockRange::new(from, to));
        from = to;
    }
    Ok(ranges)
}

/// Historical replay driver over a [`LedgerClient`].
pub struct Backfiller<C: LedgerClient + ?Sized> {
    client: Arc<C>,
    pipeline: SalePipeline,
}

impl<C: LedgerClient + ?Sized + 'static> Backfiller<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            pipeline: SalePipeline::default(),
        }
    }

    /// Share a pipeline (and its signature cache) with other components.
    pub fn with_pipeline(mut self, pipeline: SalePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replay the last `lookback_blocks` blocks of `spec` on `market`.
    ///
    /// Nothing is queried until the stream is polled, and nothing is
    /// cached between calls.
    pub fn backfill(
        &self,
        market: Arc<Market>,
        spec: MarketplaceEventSpec,
        lookback_blocks: u64,
        chunk_size: u64,
    ) -> BackfillStream {
        let run = Run {
            client: Arc::clone(&self.client),
            pipeline: self.pipeline.clone(),
            market,
            spec,
            lookback_blocks,
            chunk_size,
            ranges: None,
            total_chunks: 0,
            ready: VecDeque::new(),
            done: false,
        };

        Box::pin(stream::unfold(run, |mut run| async move {
            loop {
                if let Some(record) = run.ready.pop_front() {
                    return Some((Ok(record), run));
                }
                if run.done {
                    return None;
                }
                if let Err(e) = run.advance().await {
                    run.done = true;
                    return Some((Err(e), run));
                }
            }
        }))
    }

    /// [`backfill`](Self::backfill) driven by a `BackfillConfig`.
    pub fn backfill_with(
        &self,
        market: Arc<Market>,
        spec: MarketplaceEventSpec,
        config: &BackfillConfig,
    ) -> BackfillStream {
        self.backfill(market, spec, config.lookback_blocks, config.chunk_size)
    }

    /// Run one backfill to the end and collect it.
    pub async fn backfill_all(
        &self,
        market: Arc<Market>,
        spec: MarketplaceEventSpec,
        config: &BackfillConfig,
    ) -> BackfillReport {
        let event_name = spec.event_name.clone();
        let mut stream = self.backfill_with(Arc::clone(&market), spec, config);
        let mut records = Vec::new();
        let mut error = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(record) => records.push(record),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }
        BackfillReport {
            market,
            event_name,
            records,
            error,
        }
    }

    /// Backfill every (market, event) pair of `registry`, in registry order.
    /// A failed pair does not stop the others.
    pub async fn backfill_registry(
        &self,
        registry: &dyn MarketRegistry,
        config: &BackfillConfig,
    ) -> Vec<BackfillReport> {
        let mut reports = Vec::new();
        for (market, spec) in registry.watch_pairs() {
            info!("Backfilling event {} on {}", spec.event_name, market.name);
            let report = self.backfill_all(market, spec, config).await;
            if let Some(e) = &report.error {
                warn!(
                    market = %report.market.name,
                    event = %report.event_name,
                    records = report.records.len(),
                    "Backfill stopped early: {e}"
                );
            }
            reports.push(report);
        }
        reports
    }
}

/// State carried between polls of one backfill stream.
struct Run<C: ?Sized> {
    client: Arc<C>,
    pipeline: SalePipeline,
    market: Arc<Market>,
    spec: MarketplaceEventSpec,
    lookback_blocks: u64,
    chunk_size: u64,
    /// `None` until the head has been read
    ranges: Option<VecDeque<BlockRange>>,
    total_chunks: usize,
    ready: VecDeque<SaleRecord>,
    done: bool,
}

impl<C: LedgerClient + ?Sized> Run<C> {
    /// Plan the run on first call, then query one chunk per call.
    async fn advance(&mut self) -> Result<(), BackfillError> {
        if self.ranges.is_none() {
            if self.chunk_size == 0 {
                return Err(BackfillError::InvalidChunkSize);
            }
            let head = self
                .client
                .block_height()
                .await
                .map_err(BackfillError::Head)?;
            let plan = chunk_ranges(head, self.lookback_blocks, self.chunk_size)?;
            info!(
                market = %self.market.name,
                event = %self.spec.event_name,
                head,
                chunks = plan.len(),
                "Starting backfill"
            );
            self.total_chunks = plan.len();
            self.ranges = Some(plan.into());
            return Ok(());
        }

        let Some(range) = self.ranges.as_mut().and_then(VecDeque::pop_front) else {
            info!(
                market = %self.market.name,
                event = %self.spec.event_name,
                "Backfill complete"
            );
            self.done = true;
            return Ok(());
        };
        let remaining = self.ranges.as_ref().map_or(0, VecDeque::len);
        let chunk = self.total_chunks - remaining;

        let mut logs = self
            .client
            .get_logs(
                &self.market.contract_address,
                self.spec.watch_signature(),
                range,
            )
            .await
            .map_err(|source| BackfillError::Chunk { range, source })?;
        logs.sort_by_key(RawLog::position);

        let mut emitted = 0usize;
        for log in &logs {
            match self
                .pipeline
                .process(log, &self.market, &self.spec, self.client.as_ref())
                .await
            {
                Ok(Some(record)) => {
                    self.ready.push_back(record);
                    emitted += 1;
                }
                Ok(None) => {
                    debug!(tx = %log.transaction_hash, "Incomplete sale dropped");
                }
                Err(e) => {
                    warn!(
                        market = %self.market.name,
                        tx = %log.transaction_hash,
                        kind = e.kind(),
                        "Dropping event: {e}"
                    );
                }
            }
        }

        info!(
            market = %self.market.name,
            chunk,
            total = self.total_chunks,
            from = range.start,
            to = range.end,
            logs = logs.len(),
            sales = emitted,
            "Backfill chunk complete"
        );
        Ok(())
    }
}
