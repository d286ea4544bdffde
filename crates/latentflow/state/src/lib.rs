//! Session state for the LatentFlow runtime.
//!
//! A [`LatentState`] consumes [`Block`](latentflow_types::Block)s and keeps
//! memory bounded by two strict mechanisms:
//!
//! - **Compression**: once `short_history` reaches `max_history` entries it
//!   is folded into a per-type summary (`count`, `first_seen`, `last`, last
//!   three contents) and cleared.
//! - **Dedup index**: a FIFO-evicting set of recently seen block ids.
//!   Re-delivering a known id only bumps `seen_events`.
//!
//! Conservation holds for every reachable state:
//! `sum(core.count) + len(short_history) == counter`.
//!
//! Snapshots are cheap: history entries are shared `Arc<Block>`s, so a
//! snapshot clones pointers and summaries, never block payloads.

pub mod config;
pub mod dedup;
pub mod delta;
pub mod latent;
pub mod store;
pub mod view;

pub use config::StateConfig;
pub use dedup::DedupIndex;
pub use delta::StateDelta;
pub use latent::{
    CompressionTrace, CoreSummary, LatentState, StateParts, StateSnapshot, StateSummary,
    UpdateOutcome, RECENT_WINDOW,
};
pub use store::StateStore;
pub use view::{effective_last, effective_type_count};
