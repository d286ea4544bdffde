use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use latentflow_types::{Block, BlockId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::StateConfig;
use crate::dedup::DedupIndex;

/// Number of most recent contents kept per block type after compression.
pub const RECENT_WINDOW: usize = 3;

/// Folded summary of every compressed block of one type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoreSummary {
    pub count: u64,
    pub first_seen: Value,
    pub last: Value,
    pub recent: VecDeque<Value>,
}

impl CoreSummary {
    fn starting_with(content: &Value) -> Self {
        Self {
            count: 0,
            first_seen: content.clone(),
            last: Value::Null,
            recent: VecDeque::with_capacity(RECENT_WINDOW),
        }
    }

    fn fold(&mut self, content: &Value) {
        self.count += 1;
        self.last = content.clone();
        self.recent.push_back(content.clone());
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
    }
}

/// Record of one compression cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionTrace {
    pub before_short: usize,
    pub delta_counts: BTreeMap<String, u64>,
    pub after_short: usize,
    pub compress_count: u64,
}

/// What a single [`LatentState::update`] did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The block id was already known; only `seen_events` moved.
    Deduplicated { block_id: BlockId },
    /// The block was appended to short history.
    Appended,
    /// The block was appended and history was folded into the core.
    Compressed(CompressionTrace),
}

impl UpdateOutcome {
    pub fn is_dedup(&self) -> bool {
        matches!(self, UpdateOutcome::Deduplicated { .. })
    }

    pub fn compression(&self) -> Option<&CompressionTrace> {
        match self {
            UpdateOutcome::Compressed(trace) => Some(trace),
            _ => None,
        }
    }
}

/// Serializable view of a state for traces and audit records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub steps: u64,
    pub seen_events: u64,
    pub dedup_hits: u64,
    pub compress_count: u64,
    pub short_history_len: usize,
    pub core_keys: usize,
    pub dedup_size: usize,
    pub compressed_core: BTreeMap<String, CoreSummary>,
}

/// Raw fields of a state, for replay tooling and tests.
///
/// [`LatentState::from_parts`] does not validate; run the invariant checker
/// on anything built this way.
#[derive(Clone, Debug)]
pub struct StateParts {
    pub short_history: Vec<Block>,
    pub compressed_core: BTreeMap<String, CoreSummary>,
    pub counter: u64,
    pub seen_events: u64,
    pub dedup_hits: u64,
    pub compress_count: u64,
    pub dedup: DedupIndex,
    pub max_history: usize,
}

/// Opaque pre-transaction copy of a state.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSnapshot(LatentState);

impl StateSnapshot {
    /// The captured state, for comparison.
    pub fn state(&self) -> &LatentState {
        &self.0
    }
}

/// Per-session bounded-memory state.
///
/// Mutated only through [`update`](Self::update); restored only through
/// [`rollback`](Self::rollback).
#[derive(Clone, Debug, PartialEq)]
pub struct LatentState {
    short_history: Vec<Arc<Block>>,
    compressed_core: BTreeMap<String, CoreSummary>,
    counter: u64,
    seen_events: u64,
    dedup_hits: u64,
    compress_count: u64,
    dedup: DedupIndex,
    max_history: usize,
}

impl LatentState {
    pub fn new(config: &StateConfig) -> Self {
        Self::with_limits(config.max_history, config.dedup_capacity)
    }

    pub fn with_limits(max_history: usize, dedup_capacity: usize) -> Self {
        Self {
            short_history: Vec::new(),
            compressed_core: BTreeMap::new(),
            counter: 0,
            seen_events: 0,
            dedup_hits: 0,
            compress_count: 0,
            dedup: DedupIndex::new(dedup_capacity),
            max_history,
        }
    }

    pub fn from_parts(parts: StateParts) -> Self {
        Self {
            short_history: parts.short_history.into_iter().map(Arc::new).collect(),
            compressed_core: parts.compressed_core,
            counter: parts.counter,
            seen_events: parts.seen_events,
            dedup_hits: parts.dedup_hits,
            compress_count: parts.compress_count,
            dedup: parts.dedup,
            max_history: parts.max_history,
        }
    }

    /// Ingest one block.
    pub fn update(&mut self, block: Block) -> UpdateOutcome {
        self.seen_events += 1;

        if self.dedup.contains(block.block_id()) {
            self.dedup_hits += 1;
            debug!(block_id = %block.block_id(), "Duplicate block ignored");
            return UpdateOutcome::Deduplicated {
                block_id: block.block_id().clone(),
            };
        }

        if let Some(evicted) = self.dedup.insert(block.block_id().clone()) {
            debug!(evicted = %evicted, "Dedup index evicted oldest id");
        }
        self.counter += 1;
        self.short_history.push(Arc::new(block));

        if self.short_history.len() >= self.max_history {
            UpdateOutcome::Compressed(self.compress())
        } else {
            UpdateOutcome::Appended
        }
    }

    fn compress(&mut self) -> CompressionTrace {
        let before_short = self.short_history.len();
        let mut delta_counts: BTreeMap<String, u64> = BTreeMap::new();

        for block in self.short_history.drain(..) {
            let entry = self
                .compressed_core
                .entry(block.block_type().to_string())
                .or_insert_with(|| CoreSummary::starting_with(block.content()));
            entry.fold(block.content());
            *delta_counts.entry(block.block_type().to_string()).or_default() += 1;
        }

        self.compress_count += 1;
        debug!(
            before_short,
            compress_count = self.compress_count,
            "Short history compressed"
        );

        CompressionTrace {
            before_short,
            delta_counts,
            after_short: 0,
            compress_count: self.compress_count,
        }
    }

    /// Independent copy for rollback.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot(self.clone())
    }

    /// Replace every field from a snapshot.
    pub fn rollback(&mut self, snapshot: StateSnapshot) {
        *self = snapshot.0;
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            steps: self.counter,
            seen_events: self.seen_events,
            dedup_hits: self.dedup_hits,
            compress_count: self.compress_count,
            short_history_len: self.short_history.len(),
            core_keys: self.compressed_core.len(),
            dedup_size: self.dedup.len(),
            compressed_core: self.compressed_core.clone(),
        }
    }

    pub fn short_history(&self) -> impl DoubleEndedIterator<Item = &Block> + ExactSizeIterator {
        self.short_history.iter().map(|b| b.as_ref())
    }

    pub fn short_history_len(&self) -> usize {
        self.short_history.len()
    }

    pub fn compressed_core(&self) -> &BTreeMap<String, CoreSummary> {
        &self.compressed_core
    }

    /// Accepted (non-duplicate) updates.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// All update attempts, duplicates included.
    pub fn seen_events(&self) -> u64 {
        self.seen_events
    }

    pub fn dedup_hits(&self) -> u64 {
        self.dedup_hits
    }

    pub fn compress_count(&self) -> u64 {
        self.compress_count
    }

    pub fn dedup_index(&self) -> &DedupIndex {
        &self.dedup
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}

impl Default for LatentState {
    fn default() -> Self {
        Self::new(&StateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(n: u64) -> Block {
        Block::event(json!({ "n": n }))
    }

    #[test]
    fn third_block_triggers_compression() {
        let mut state = LatentState::with_limits(3, 16);
        assert_eq!(state.update(event(1)), UpdateOutcome::Appended);
        assert_eq!(state.update(event(2)), UpdateOutcome::Appended);

        let outcome = state.update(event(3));
        let trace = outcome.compression().unwrap();
        assert_eq!(trace.before_short, 3);
        assert_eq!(trace.after_short, 0);
        assert_eq!(trace.delta_counts["event"], 3);
        assert_eq!(trace.compress_count, 1);

        assert_eq!(state.short_history_len(), 0);
        let core = &state.compressed_core()["event"];
        assert_eq!(core.count, 3);
        assert_eq!(core.first_seen, json!({"n": 1}));
        assert_eq!(core.last, json!({"n": 3}));
        assert_eq!(
            core.recent,
            VecDeque::from(vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})])
        );
    }

    #[test]
    fn recent_window_keeps_last_three() {
        let mut state = LatentState::with_limits(3, 16);
        for n in 1..=6 {
            state.update(event(n));
        }
        let core = &state.compressed_core()["event"];
        assert_eq!(core.count, 6);
        assert_eq!(core.first_seen, json!({"n": 1}));
        assert_eq!(
            core.recent,
            VecDeque::from(vec![json!({"n": 4}), json!({"n": 5}), json!({"n": 6})])
        );
    }

    #[test]
    fn duplicate_only_moves_seen_events() {
        let mut state = LatentState::with_limits(5, 16);
        state.update(event(1));
        let after_first = state.clone();

        let outcome = state.update(event(1));
        assert!(outcome.is_dedup());
        assert_eq!(state.seen_events(), 2);
        assert_eq!(state.counter(), after_first.counter());
        assert_eq!(state.dedup_hits(), 1);
        assert_eq!(state.short_history_len(), after_first.short_history_len());
        assert_eq!(state.compressed_core(), after_first.compressed_core());
    }

    #[test]
    fn evicted_id_is_accepted_again() {
        let mut state = LatentState::with_limits(10, 2);
        state.update(event(1));
        state.update(event(2));
        state.update(event(3));
        assert!(!state.update(event(1)).is_dedup());
        assert_eq!(state.counter(), 4);
    }

    #[test]
    fn rollback_restores_every_field() {
        let mut state = LatentState::with_limits(3, 4);
        state.update(event(1));
        let snapshot = state.snapshot();

        state.update(event(2));
        state.update(event(3));
        state.update(event(2));
        assert_ne!(&state, snapshot.state());

        state.rollback(snapshot.clone());
        assert_eq!(&state, snapshot.state());
    }

    #[test]
    fn mixed_types_fold_into_separate_keys() {
        let mut state = LatentState::with_limits(2, 16);
        state.update(Block::new(json!("a"), "event"));
        state.update(Block::new(json!("b"), "tool_result"));
        assert_eq!(state.compressed_core().len(), 2);
        assert_eq!(state.compressed_core()["tool_result"].last, json!("b"));
    }
}
