//! Aggregation session: all mutable state for one run, owned in one place

use crate::aggregate::{Aggregates, RunningAggregator};
use crate::config::EtlParams;
use crate::normalize::{NormalizedRecord, Normalizer, RawRow};
use crate::topk::TopKTracker;

/// Row counters kept alongside the accumulators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Rows passed to [`AggregationSession::observe`]
    pub rows_observed: u64,
    /// Rows with no language that were left out of aggregates
    pub rows_without_language: u64,
    /// Rows eligible for top-K (quality and page id present)
    pub rows_rankable: u64,
}

/// Fresh per run. Holds the normalizer, running aggregates and top-K lists.
#[derive(Debug)]
pub struct AggregationSession {
    normalizer: Normalizer,
    aggregator: RunningAggregator,
    topk: TopKTracker,
    unknown_language: Option<String>,
    stats: SessionStats,
}

impl AggregationSession {
    pub fn new(params: &EtlParams) -> Self {
        Self {
            normalizer: Normalizer::new(params),
            aggregator: RunningAggregator::new(),
            topk: TopKTracker::new(params.top_k),
            unknown_language: params.unknown_language.clone(),
            stats: SessionStats::default(),
        }
    }

    pub fn normalize(&self, raw: RawRow) -> NormalizedRecord {
        self.normalizer.normalize(raw)
    }

    /// Feed one normalized record to the aggregator and top-K tracker.
    pub fn observe(&mut self, record: &NormalizedRecord) {
        self.stats.rows_observed += 1;

        let key = record
            .language
            .as_deref()
            .or(self.unknown_language.as_deref());
        let Some(key) = key else {
            self.stats.rows_without_language += 1;
            return;
        };

        self.aggregator.observe(key, record);
        if record.quality.is_some() && record.page_id.is_some() {
            self.stats.rows_rankable += 1;
        }
        self.topk.offer(key, record.quality, record.page_id, &record.title);
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn language_count(&self) -> usize {
        self.aggregator.language_count()
    }

    /// End the session; the only way to read accumulator values.
    pub fn finish(self) -> SessionResult {
        SessionResult {
            aggregates: self.aggregator.finish(),
            topk: self.topk,
            stats: self.stats,
        }
    }
}

/// Frozen state handed to the report emitter
#[derive(Debug)]
pub struct SessionResult {
    pub aggregates: Aggregates,
    pub topk: TopKTracker,
    pub stats: SessionStats,
}
