//! Worker dispatch and the fallback calculator.
//!
//! Scoring runs off the caller's thread. A [`Dispatcher`] sends one job to
//! an isolated context and awaits its single response. When dispatch fails
//! for any reason, the engine falls back to [`fallback::calculate`], which
//! runs the same pure ranking function in place.

pub mod fallback;
pub mod protocol;
pub mod worker;

use std::time::Duration;

use gpace_scoring::{CalculationRequest, ScoredTask};

pub use protocol::{DispatchJob, DispatchResponse};
pub use worker::ThreadDispatcher;

/// Why a dispatched job produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The isolated context could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// The job panicked inside the worker.
    #[error("worker panicked: {0}")]
    Panicked(String),

    /// The worker went away without answering.
    #[error("worker exited without responding")]
    Disconnected,

    /// The answer belonged to a different job.
    #[error("response for request {got} does not match {expected}")]
    Mismatch { expected: String, got: String },

    /// No answer within the configured bound.
    #[error("worker did not respond within {0:?}")]
    TimedOut(Duration),
}

/// Runs one scoring job in an isolated execution context.
///
/// Implementations must answer each call at most once and never mutate
/// shared state. The default is [`ThreadDispatcher`].
pub trait Dispatcher: Send + Sync {
    /// Rank `request` in isolation.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the context could not be started,
    /// failed while scoring, or answered the wrong job.
    fn dispatch(
        &self,
        request: CalculationRequest,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredTask>, DispatchError>> + Send;
}
