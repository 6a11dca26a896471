//! One-shot job and response envelopes exchanged with a scoring worker.

use gpace_scoring::{CalculationRequest, ScoredTask};
use serde::{Deserialize, Serialize};

use super::DispatchError;

/// A single scoring job. Answered by exactly one [`DispatchResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchJob {
    pub request_id: String,
    pub request: CalculationRequest,
}

impl DispatchJob {
    /// Wrap `request` with a fresh v4 request id.
    #[must_use]
    pub fn new(request: CalculationRequest) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            request,
        }
    }
}

/// The ranked tasks produced for one [`DispatchJob`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub request_id: String,
    pub tasks: Vec<ScoredTask>,
}

impl DispatchResponse {
    #[must_use]
    pub fn new(request_id: impl Into<String>, tasks: Vec<ScoredTask>) -> Self {
        Self {
            request_id: request_id.into(),
            tasks,
        }
    }

    /// Check that this response answers `request_id`.
    pub fn ensure_answers(&self, request_id: &str) -> Result<(), DispatchError> {
        if self.request_id == request_id {
            Ok(())
        } else {
            Err(DispatchError::Mismatch {
                expected: request_id.to_owned(),
                got: self.request_id.clone(),
            })
        }
    }
}
