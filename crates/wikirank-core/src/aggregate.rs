//! Running count/sum accumulators per language and per (language, bin)
//!
//! Bins are nested under their language entry, so one hash lookup on the
//! language string finds all three accumulators for a row. The composite
//! (language, bin) view is materialized only in [`Aggregates`].

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::normalize::NormalizedRecord;

/// Count plus quality signal for one group.
///
/// `count` is row coverage; `quality_sum` only sees rows that had a quality.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupStats {
    pub count: u64,
    pub quality_sum: f64,
    pub high_quality_count: u64,
}

impl GroupStats {
    fn observe(&mut self, quality: Option<f64>, is_high_quality: bool) {
        self.count += 1;
        self.quality_sum += quality.unwrap_or(0.0);
        self.high_quality_count += u64::from(is_high_quality);
    }

    /// `quality_sum / count`, or 0 for an empty group
    pub fn avg_quality(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.quality_sum / self.count as f64
        }
    }

    /// `high_quality_count / count`, or 0 for an empty group
    pub fn high_quality_ratio(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.high_quality_count as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct LanguageEntry {
    totals: GroupStats,
    quality_bins: FxHashMap<i64, u64>,
    title_len_bins: FxHashMap<i64, GroupStats>,
}

impl LanguageEntry {
    fn observe(&mut self, record: &NormalizedRecord) {
        self.totals.observe(record.quality, record.is_high_quality);
        *self.quality_bins.entry(record.quality_bin).or_insert(0) += 1;
        self.title_len_bins
            .entry(record.title_len_bin)
            .or_default()
            .observe(record.quality, record.is_high_quality);
    }
}

/// Write-only accumulator state. Read it through [`RunningAggregator::finish`].
#[derive(Debug, Default)]
pub struct RunningAggregator {
    languages: FxHashMap<String, LanguageEntry>,
}

impl RunningAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the accumulators for `language`.
    pub fn observe(&mut self, language: &str, record: &NormalizedRecord) {
        if let Some(entry) = self.languages.get_mut(language) {
            entry.observe(record);
        } else {
            let mut entry = LanguageEntry::default();
            entry.observe(record);
            self.languages.insert(language.to_string(), entry);
        }
    }

    /// Distinct languages seen so far
    pub fn language_count(&self) -> usize {
        self.languages.len()
    }

    /// Freeze into key-ordered tables.
    pub fn finish(self) -> Aggregates {
        let mut out = Aggregates::default();
        for (lang, entry) in self.languages {
            for (bin, count) in entry.quality_bins {
                out.quality_bins.insert((lang.clone(), bin), count);
            }
            for (bin, stats) in entry.title_len_bins {
                out.title_len_bins.insert((lang.clone(), bin), stats);
            }
            out.languages.insert(lang, entry.totals);
        }
        out
    }
}

/// Final accumulator values, ordered by language then bin
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregates {
    pub languages: BTreeMap<String, GroupStats>,
    pub quality_bins: BTreeMap<(String, i64), u64>,
    pub title_len_bins: BTreeMap<(String, i64), GroupStats>,
}

impl Aggregates {
    /// Sum of per-language counts
    pub fn total_count(&self) -> u64 {
        self.languages.values().map(|s| s.count).sum()
    }
}
