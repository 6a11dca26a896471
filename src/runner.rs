//! Recomputation background loop.
//!
//! Spawns a tokio task that recomputes the ranking on a fixed interval and
//! whenever a [`RecomputeTrigger`] arrives. Triggers are not debounced;
//! callers that change state in bursts coalesce on their side.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::engine::{PriorityEngine, RecomputeOutcome};

/// Why a recomputation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeTrigger {
    /// A subject's task list changed.
    TasksChanged,
    /// The subject list changed.
    SubjectsChanged,
    /// A weightage table changed.
    WeightagesChanged,
    /// The mirrored record changed remotely; reconcile instead of recompute.
    RemoteChanged,
    /// Explicit user or host request.
    Manual,
}

/// Create a bounded trigger channel.
#[must_use]
pub fn trigger_channel(
    capacity: usize,
) -> (mpsc::Sender<RecomputeTrigger>, mpsc::Receiver<RecomputeTrigger>) {
    mpsc::channel(capacity.max(1))
}

/// Background loop driving a [`PriorityEngine`].
pub struct RecomputeRunner<D> {
    engine: Arc<PriorityEngine<D>>,
    interval: Duration,
    triggers: mpsc::Receiver<RecomputeTrigger>,
    cancel: CancellationToken,
}

impl<D: Dispatcher + 'static> RecomputeRunner<D> {
    pub fn new(
        engine: Arc<PriorityEngine<D>>,
        interval: Duration,
        triggers: mpsc::Receiver<RecomputeTrigger>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            interval,
            triggers,
            cancel,
        }
    }

    /// Start the loop. The first recomputation runs immediately.
    ///
    /// Stops when the cancellation token fires or every trigger sender
    /// has been dropped.
    pub fn run(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "recompute runner started");
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                let trigger = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        info!("recompute runner cancelled");
                        break;
                    }
                    received = self.triggers.recv() => match received {
                        Some(trigger) => trigger,
                        None => {
                            info!("trigger channel closed, recompute runner stopping");
                            break;
                        }
                    },
                    _ = interval.tick() => {
                        debug!("periodic recompute");
                        self.recompute().await;
                        continue;
                    }
                };

                debug!(trigger = ?trigger, "recompute triggered");
                if trigger == RecomputeTrigger::RemoteChanged {
                    self.reconcile().await;
                } else {
                    self.recompute().await;
                }
            }
        })
    }

    async fn recompute(&self) {
        if let RecomputeOutcome::Skipped { reason } = self.engine.recompute().await {
            warn!(reason = %reason, "recompute skipped");
        }
    }

    async fn reconcile(&self) {
        match self.engine.store().reconcile().await {
            Ok(outcome) => debug!(outcome = ?outcome, "reconciled with mirror"),
            Err(e) => warn!(error = %e, "cannot reconcile with mirror"),
        }
    }
}
