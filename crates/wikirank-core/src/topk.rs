//! Bounded per-language top-K by quality
//!
//! Each language keeps a max-heap ordered "worst on top", capped at K.
//! A new entry only displaces the current worst, so memory per language is
//! O(K) regardless of input size and the kept set is exact at every point.
//!
//! Rank order: quality descending, page id ascending, then arrival order.
//! Arrival order only matters for duplicate (quality, page_id) pairs and is a
//! global row sequence, so it does not depend on chunk boundaries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

/// One ranked article
#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    pub quality: f64,
    pub page_id: i64,
    pub title: String,
    seq: u64,
}


/// `Less` means `a` ranks ahead of `b`.
fn rank_cmp(a_quality: f64, a_id: i64, a_seq: u64, b: &TopEntry) -> Ordering {
    b.quality
        .total_cmp(&a_quality)
        .then(a_id.cmp(&b.page_id))
        .then(a_seq.cmp(&b.seq))
}

/// Heap wrapper: greater = ranks lower, so `peek()` is the worst kept entry.
#[derive(Debug)]
struct HeapItem(TopEntry);

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        rank_cmp(self.0.quality, self.0.page_id, self.0.seq, &other.0)
    }
}

/// Fixed-capacity top-K container for one language
#[derive(Debug)]
pub struct BoundedTopK {
    capacity: usize,
    heap: BinaryHeap<HeapItem>,
}

impl BoundedTopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(1024)),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer an entry; returns true if it was kept.
    ///
    /// `seq` is the arrival number, lower wins among equal (quality, page_id).
    /// The title is only cloned when the entry makes the cut.
    pub fn offer(&mut self, quality: f64, page_id: i64, title: &str, seq: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() >= self.capacity {
            let displaces = self
                .heap
                .peek()
                .is_some_and(|worst| rank_cmp(quality, page_id, seq, &worst.0) == Ordering::Less);
            if !displaces {
                return false;
            }
            self.heap.pop();
        }
        self.heap.push(HeapItem(TopEntry {
            quality,
            page_id,
            title: title.to_string(),
            seq,
        }));
        true
    }

    /// Kept entries in rank order (best first)
    pub fn ranked(&self) -> Vec<&TopEntry> {
        let mut entries: Vec<&TopEntry> = self.heap.iter().map(|item| &item.0).collect();
        entries.sort_by(|a, b| rank_cmp(a.quality, a.page_id, a.seq, b));
        entries
    }
}

/// Per-language collection of [`BoundedTopK`] lists
#[derive(Debug)]
pub struct TopKTracker {
    k: usize,
    lists: FxHashMap<String, BoundedTopK>,
    next_seq: u64,
}

impl TopKTracker {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            lists: FxHashMap::default(),
            next_seq: 0,
        }
    }

    /// Offer one article. No-op when quality or page id is missing.
    pub fn offer(
        &mut self,
        language: &str,
        quality: Option<f64>,
        page_id: Option<i64>,
        title: &str,
    ) -> bool {
        let (Some(quality), Some(page_id)) = (quality, page_id) else {
            return false;
        };
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(list) = self.lists.get_mut(language) {
            return list.offer(quality, page_id, title, seq);
        }
        let mut list = BoundedTopK::new(self.k);
        let kept = list.offer(quality, page_id, title, seq);
        self.lists.insert(language.to_string(), list);
        kept
    }

    /// Ranked entries for one language; empty if none were eligible.
    pub fn ranked(&self, language: &str) -> Vec<&TopEntry> {
        self.lists
            .get(language)
            .map(BoundedTopK::ranked)
            .unwrap_or_default()
    }

    /// Languages with at least one eligible entry, ascending
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self
            .lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(lang, _)| lang.as_str())
            .collect();
        langs.sort_unstable();
        langs
    }

    /// Total entries held across all languages
    pub fn total_entries(&self) -> usize {
        self.lists.values().map(BoundedTopK::len).sum()
    }
}
