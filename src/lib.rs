//! GPAce task priority engine.
//!
//! Keeps a ranked list of every open study task across subjects, so the
//! app can always answer "what should I work on next".
//!
//! # Architecture
//!
//! A recomputation pass moves through independent stages:
//! - **State**: snapshots subjects, tasks, marks and weightage tables from
//!   the local state directory
//! - **Dispatch**: ranks the snapshot on an isolated worker thread via
//!   [`gpace_scoring`], falling back to the same ranking in place
//! - **Store**: replaces the durable record, broadcasts a
//!   [`store::PriorityEvent`] and optionally mirrors the record remotely
//! - **Runner**: drives passes on an interval and on change triggers
//!
//! Read-side views ([`view`]) group or re-sort a published ranking without
//! modifying it.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gpace_dirs;
pub mod runner;
pub mod state;
pub mod store;
pub mod view;

pub use gpace_scoring;

pub use config::EngineConfig;
pub use dispatch::{Dispatcher, ThreadDispatcher};
pub use engine::{PriorityEngine, Ranking, RecomputeOutcome};
pub use error::{PriorityError, Result};
pub use runner::{RecomputeRunner, RecomputeTrigger, trigger_channel};
pub use state::LocalState;
pub use store::{
    PriorityBus, PriorityEvent, PublishReceipt, RankingRecord, ReconcileOutcome, RecordSource,
    ResultStore,
};
pub use view::{SortDirection, SortField, group_by_interleave, sorted_view};
