//! Thread-per-job dispatcher.
//!
//! Every job gets a fresh, named OS thread. The thread ranks the request,
//! answers over a oneshot channel and exits. Nothing is pooled or shared
//! between jobs, so a job that panics or hangs cannot affect the next one.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use gpace_scoring::{CalculationRequest, ScoredTask};
use tokio::sync::oneshot;

use super::protocol::{DispatchJob, DispatchResponse};
use super::{DispatchError, Dispatcher};
use crate::config::DispatchConfig;

/// The scoring function a worker runs.
pub type JobFn = Arc<dyn Fn(&CalculationRequest) -> Vec<ScoredTask> + Send + Sync>;

/// What the worker thread sends back: the response, or the panic message.
type WorkerReply = Result<DispatchResponse, String>;

/// Dispatches each job to its own short-lived OS thread.
#[derive(Clone)]
pub struct ThreadDispatcher {
    thread_name: String,
    timeout: Option<Duration>,
    job: JobFn,
}

impl ThreadDispatcher {
    /// A dispatcher running [`gpace_scoring::rank`] with the given settings.
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            thread_name: config.thread_name.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            job: Arc::new(gpace_scoring::rank),
        }
    }

    /// Replace the function each worker runs.
    #[must_use]
    pub fn with_job<F>(mut self, job: F) -> Self
    where
        F: Fn(&CalculationRequest) -> Vec<ScoredTask> + Send + Sync + 'static,
    {
        self.job = Arc::new(job);
        self
    }

    /// Bound how long [`Dispatcher::dispatch`] waits for an answer.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn(&self, job: DispatchJob) -> Result<oneshot::Receiver<WorkerReply>, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let run = Arc::clone(&self.job);

        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let DispatchJob {
                    request_id,
                    request,
                } = job;
                let outcome = catch_unwind(AssertUnwindSafe(|| run(&request)));
                let reply = match outcome {
                    Ok(tasks) => Ok(DispatchResponse::new(request_id, tasks)),
                    Err(payload) => Err(panic_message(payload.as_ref())),
                };
                let _ = reply_tx.send(reply);
            })
            .map_err(|e| DispatchError::Spawn(e.to_string()))?;

        Ok(reply_rx)
    }
}

impl std::fmt::Debug for ThreadDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadDispatcher")
            .field("thread_name", &self.thread_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher for ThreadDispatcher {
    async fn dispatch(
        &self,
        request: CalculationRequest,
    ) -> Result<Vec<ScoredTask>, DispatchError> {
        let job = DispatchJob::new(request);
        let request_id = job.request_id.clone();
        tracing::debug!(
            request_id = %request_id,
            tasks = job.request.task_count(),
            "dispatching scoring job"
        );

        let reply_rx = self.spawn(job)?;
        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, reply_rx)
                .await
                .map_err(|_| DispatchError::TimedOut(limit))?,
            None => reply_rx.await,
        };

        let response = reply
            .map_err(|_| DispatchError::Disconnected)?
            .map_err(DispatchError::Panicked)?;
        response.ensure_answers(&request_id)?;
        Ok(response.tasks)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
