//! Recomputation pipeline.
//!
//! One recomputation snapshots local state, ranks it through the
//! [`Dispatcher`], falls back to the in-place calculator when dispatch
//! fails, and publishes the result. Nothing here is fatal: a pass that
//! cannot produce a ranking publishes nothing and leaves the previous
//! record visible.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use gpace_scoring::{CalculationRequest, ScoredTask};

use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, ThreadDispatcher, fallback};
use crate::error::Result;
use crate::state::LocalState;
use crate::store::{HttpMirror, PriorityBus, PublishReceipt, RecordSource, ResultStore};

/// A ranked list and the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub tasks: Vec<ScoredTask>,
    pub source: RecordSource,
}

/// Result of one recomputation pass.
#[derive(Debug)]
pub enum RecomputeOutcome {
    /// A new record was published.
    Published(PublishReceipt),
    /// Nothing was published; consumers keep seeing the previous record.
    Skipped { reason: String },
}

impl RecomputeOutcome {
    /// The ranking this pass produced. Empty when skipped.
    #[must_use]
    pub fn tasks(&self) -> &[ScoredTask] {
        match self {
            Self::Published(receipt) => &receipt.record.tasks,
            Self::Skipped { .. } => &[],
        }
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Ties local state, the dispatcher and the result store together.
pub struct PriorityEngine<D = ThreadDispatcher> {
    state: LocalState,
    dispatcher: D,
    store: Arc<ResultStore>,
}

impl PriorityEngine<ThreadDispatcher> {
    /// Build the default engine from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PriorityError::Config`] if the configuration is
    /// invalid or the mirror cannot be built.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let state_dir = config.store.resolved_state_dir();
        let mut store = ResultStore::open(&state_dir, PriorityBus::new(config.broadcast.capacity));
        if let Some(mirror) = HttpMirror::from_config(&config.mirror)? {
            tracing::info!(endpoint = mirror.endpoint(), "remote mirror enabled");
            store = store.with_mirror(Arc::new(mirror));
        }
        Ok(Self::new(
            LocalState::new(state_dir),
            ThreadDispatcher::new(&config.dispatch),
            Arc::new(store),
        ))
    }
}

impl<D: Dispatcher> PriorityEngine<D> {
    pub fn new(state: LocalState, dispatcher: D, store: Arc<ResultStore>) -> Self {
        Self {
            state,
            dispatcher,
            store,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LocalState {
        &self.state
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Recompute and publish as of the current local time.
    pub async fn recompute(&self) -> RecomputeOutcome {
        self.recompute_at(Local::now().naive_local()).await
    }

    /// Recompute and publish as of `as_of`.
    pub async fn recompute_at(&self, as_of: NaiveDateTime) -> RecomputeOutcome {
        let request = match self.state.snapshot(as_of) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "cannot snapshot local state, keeping previous ranking");
                return RecomputeOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let Some(ranking) = self.rank(request).await else {
            return RecomputeOutcome::Skipped {
                reason: "worker and fallback both failed".to_owned(),
            };
        };

        match self.store.publish(ranking.tasks, ranking.source).await {
            Ok(receipt) => RecomputeOutcome::Published(receipt),
            Err(e) => {
                tracing::error!(error = %e, "cannot publish ranking");
                RecomputeOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Rank `request` through the dispatcher, falling back in place.
    ///
    /// Returns `None` only when both paths failed.
    pub async fn rank(&self, request: CalculationRequest) -> Option<Ranking> {
        match self.dispatcher.dispatch(request.clone()).await {
            Ok(tasks) => Some(Ranking {
                tasks,
                source: RecordSource::Worker,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "worker dispatch failed, ranking in place");
                fallback::try_calculate(&request).ok().map(|tasks| Ranking {
                    tasks,
                    source: RecordSource::Fallback,
                })
            }
        }
    }
}

impl<D> std::fmt::Debug for PriorityEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityEngine")
            .field("state", &self.state)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
