//! The published ranking record.

use chrono::{DateTime, Utc};
use gpace_scoring::ScoredTask;
use serde::{Deserialize, Serialize};

/// Which path produced a published ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// The isolated worker answered.
    Worker,
    /// Dispatch failed and the in-place calculator ran.
    Fallback,
    /// Adopted from the remote mirror.
    Remote,
}

impl RecordSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Fallback => "fallback",
            Self::Remote => "remote",
        }
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable ranked list consumers read verbatim.
///
/// Replaced wholesale on every publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRecord {
    /// Publish-time milliseconds, strictly increasing per store.
    pub version: u64,
    pub published_at: DateTime<Utc>,
    pub source: RecordSource,
    pub tasks: Vec<ScoredTask>,
}

impl RankingRecord {
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// `true` when this record should replace `local`.
    #[must_use]
    pub fn supersedes(&self, local: Option<&RankingRecord>) -> bool {
        local.is_none_or(|local| self.version > local.version)
    }
}

/// Version for a record published at `now`, after `previous`.
///
/// Millisecond timestamps keep versions comparable across devices; the bump
/// keeps them strictly increasing when the clock stalls or steps back.
#[must_use]
pub fn next_version(previous: Option<u64>, now: DateTime<Utc>) -> u64 {
    let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    match previous {
        Some(previous) if stamp <= previous => previous.saturating_add(1),
        _ => stamp,
    }
}
