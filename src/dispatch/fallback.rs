//! In-place fallback calculator.
//!
//! Runs the same pure ranking the worker runs, on the caller's thread.
//! Used whenever dispatch fails, so identical requests still yield
//! identical rankings.

use std::panic::{AssertUnwindSafe, catch_unwind};

use gpace_scoring::{CalculationRequest, ScoredTask};

use super::worker::panic_message;

/// Rank `request` on the current thread.
///
/// Never fails: a panic during ranking is logged and yields an empty list.
pub fn calculate(request: &CalculationRequest) -> Vec<ScoredTask> {
    try_calculate(request).unwrap_or_default()
}

/// Rank `request` on the current thread, reporting a contained panic.
///
/// # Errors
///
/// Returns the panic message if ranking panicked.
pub fn try_calculate(request: &CalculationRequest) -> Result<Vec<ScoredTask>, String> {
    contained(request, gpace_scoring::rank)
}

fn contained<F>(request: &CalculationRequest, rank: F) -> Result<Vec<ScoredTask>, String>
where
    F: FnOnce(&CalculationRequest) -> Vec<ScoredTask>,
{
    match catch_unwind(AssertUnwindSafe(|| rank(request))) {
        Ok(tasks) => {
            tracing::debug!(tasks = tasks.len(), "fallback ranking complete");
            Ok(tasks)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(error = %message, "fallback ranking failed");
            Err(message)
        }
    }
}
