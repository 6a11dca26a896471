//! Result store and broadcaster.
//!
//! Publishing a ranking, in order:
//!
//! 1. replaces the durable record (`calculatedPriorityTasks.json`) wholesale
//! 2. announces a [`PriorityEvent`] on the [`PriorityBus`]
//! 3. pushes the record to the [`RemoteMirror`], if one is configured,
//!    on a detached task
//!
//! Writers are serialized; the last publish to land wins.

pub mod bus;
pub mod mirror;
pub mod record;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use gpace_scoring::ScoredTask;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

pub use bus::{PRIORITY_UPDATE, PriorityBus, PriorityEvent};
pub use mirror::{HttpMirror, RemoteMirror};
pub use record::{RankingRecord, RecordSource, next_version};

use crate::error::{PriorityError, Result};
use crate::state::write_json_atomic;

/// File name of the published ranking inside the state directory.
pub const RECORD_FILE: &str = "calculatedPriorityTasks.json";

/// What a successful publish produced.
#[derive(Debug)]
pub struct PublishReceipt {
    /// The record now visible to readers.
    pub record: Arc<RankingRecord>,
    /// Subscribers that received the update event.
    pub delivered: usize,
    /// The detached mirror push, when a mirror is configured.
    pub mirror: Option<JoinHandle<()>>,
}

/// Result of pulling the mirrored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No mirror is configured.
    NoMirror,
    /// The mirror holds nothing yet.
    RemoteEmpty,
    /// The remote record was newer and replaced the local one.
    Adopted { version: u64 },
    /// The local record is at least as new as the remote one.
    KeptLocal { local: u64, remote: u64 },
}

/// Holds the current ranking and publishes replacements.
pub struct ResultStore {
    path: PathBuf,
    current: RwLock<Option<Arc<RankingRecord>>>,
    bus: PriorityBus,
    mirror: Option<Arc<dyn RemoteMirror>>,
}

impl ResultStore {
    /// Open the store in `state_dir`, loading any previously published record.
    ///
    /// A corrupt record file is logged and ignored.
    pub fn open(state_dir: &Path, bus: PriorityBus) -> Self {
        let path = state_dir.join(RECORD_FILE);
        let current = load_record(&path).map(Arc::new);
        if let Some(record) = &current {
            tracing::info!(
                version = record.version,
                tasks = record.task_count(),
                "loaded published ranking"
            );
        }
        Self {
            path,
            current: RwLock::new(current),
            bus,
            mirror: None,
        }
    }

    /// Mirror every publish to `mirror`.
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn RemoteMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn bus(&self) -> &PriorityBus {
        &self.bus
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PriorityEvent> {
        self.bus.subscribe()
    }

    /// The currently published record, if any.
    pub async fn current(&self) -> Option<Arc<RankingRecord>> {
        self.current.read().await.clone()
    }

    /// Replace the published ranking with `tasks`.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::Store`] if the record cannot be persisted.
    /// The previous record stays visible in that case.
    pub async fn publish(
        &self,
        tasks: Vec<ScoredTask>,
        source: RecordSource,
    ) -> Result<PublishReceipt> {
        let mut current = self.current.write().await;
        let now = Utc::now();
        let record = Arc::new(RankingRecord {
            version: next_version(current.as_ref().map(|r| r.version), now),
            published_at: now,
            source,
            tasks,
        });
        self.persist(&record).await?;
        *current = Some(Arc::clone(&record));
        drop(current);

        let delivered = self.bus.send(PriorityEvent::for_record(&record));
        tracing::info!(
            version = record.version,
            tasks = record.task_count(),
            source = %source,
            subscribers = delivered,
            "published ranking"
        );

        let mirror = self.spawn_mirror(&record);
        Ok(PublishReceipt {
            record,
            delivered,
            mirror,
        })
    }

    /// Adopt the mirrored record if it is strictly newer than the local one.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::Mirror`] if the fetch fails, or
    /// [`PriorityError::Store`] if an adopted record cannot be persisted.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let Some(mirror) = &self.mirror else {
            return Ok(ReconcileOutcome::NoMirror);
        };
        let Some(mut remote) = mirror.fetch().await? else {
            return Ok(ReconcileOutcome::RemoteEmpty);
        };

        let mut current = self.current.write().await;
        if !remote.supersedes(current.as_deref()) {
            let local = current.as_ref().map_or(0, |r| r.version);
            tracing::debug!(local, remote = remote.version, "keeping local ranking");
            return Ok(ReconcileOutcome::KeptLocal {
                local,
                remote: remote.version,
            });
        }

        remote.source = RecordSource::Remote;
        let record = Arc::new(remote);
        self.persist(&record).await?;
        *current = Some(Arc::clone(&record));
        drop(current);

        self.bus.send(PriorityEvent::for_record(&record));
        tracing::info!(version = record.version, "adopted newer mirrored ranking");
        Ok(ReconcileOutcome::Adopted {
            version: record.version,
        })
    }

    /// Write `record` from the blocking pool.
    async fn persist(&self, record: &Arc<RankingRecord>) -> Result<()> {
        let path = self.path.clone();
        let record = Arc::clone(record);
        tokio::task::spawn_blocking(move || write_json_atomic(&path, record.as_ref()))
            .await
            .map_err(|e| PriorityError::Store(format!("persist task failed: {e}")))?
            .map_err(|e| {
                PriorityError::Store(format!("cannot write {}: {e}", self.path.display()))
            })
    }

    fn spawn_mirror(&self, record: &Arc<RankingRecord>) -> Option<JoinHandle<()>> {
        let mirror = Arc::clone(self.mirror.as_ref()?);
        let record = Arc::clone(record);
        Some(tokio::spawn(async move {
            if let Err(e) = mirror.push(&record).await {
                tracing::warn!(version = record.version, error = %e, "ranking mirror failed");
            }
        }))
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("path", &self.path)
            .field("mirror", &self.mirror.is_some())
            .finish_non_exhaustive()
    }
}

fn load_record(path: &Path) -> Option<RankingRecord> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read published ranking");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt published ranking");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use gpace_scoring::Task;

    fn scored(id: &str, score: f64) -> ScoredTask {
        ScoredTask {
            task: Task::new(id, "Task", "Quiz", None),
            priority_score: score,
        }
    }

    fn open(dir: &Path) -> ResultStore {
        ResultStore::open(dir, PriorityBus::new(8))
    }

    #[tokio::test]
    async fn publish_replaces_record_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.current().await.is_none());

        store
            .publish(vec![scored("a", 3.0)], RecordSource::Worker)
            .await
            .unwrap();
        let receipt = store
            .publish(vec![scored("b", 2.0)], RecordSource::Fallback)
            .await
            .unwrap();

        let current = store.current().await.unwrap();
        assert_eq!(current.tasks, vec![scored("b", 2.0)]);
        assert_eq!(current.source, RecordSource::Fallback);
        assert!(receipt.mirror.is_none());

        let on_disk: RankingRecord =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, *current);
    }

    #[tokio::test]
    async fn versions_strictly_increase() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let first = store.publish(Vec::new(), RecordSource::Worker).await.unwrap();
        let second = store.publish(Vec::new(), RecordSource::Worker).await.unwrap();
        assert!(second.record.version > first.record.version);
    }

    #[tokio::test]
    async fn reopen_loads_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let version = {
            let store = open(dir.path());
            let receipt = store
                .publish(vec![scored("a", 1.5)], RecordSource::Worker)
                .await
                .unwrap();
            receipt.record.version
        };

        let reopened = open(dir.path());
        let current = reopened.current().await.unwrap();
        assert_eq!(current.version, version);
        assert_eq!(current.tasks, vec![scored("a", 1.5)]);
    }

    #[tokio::test]
    async fn corrupt_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RECORD_FILE), "{ nope").unwrap();
        let store = open(dir.path());
        assert!(store.current().await.is_none());
        assert!(store.publish(Vec::new(), RecordSource::Worker).await.is_ok());
    }

    #[tokio::test]
    async fn publish_broadcasts_task_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let mut rx = store.subscribe();

        let receipt = store
            .publish(vec![scored("a", 1.0), scored("b", 0.5)], RecordSource::Worker)
            .await
            .unwrap();
        assert_eq!(receipt.delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, PRIORITY_UPDATE);
        assert_eq!(event.task_count, 2);
        assert_eq!(event.version, receipt.record.version);
    }

    #[tokio::test]
    async fn republishing_same_tasks_changes_nothing_but_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let mut rx = store.subscribe();
        let tasks = vec![scored("a", 3.0), scored("b", 1.25)];

        let first = store
            .publish(tasks.clone(), RecordSource::Worker)
            .await
            .unwrap();
        let first_tasks = on_disk_tasks(store.path());
        let second = store.publish(tasks, RecordSource::Worker).await.unwrap();
        let second_tasks = on_disk_tasks(store.path());

        assert_eq!(first.record.tasks, second.record.tasks);
        assert_eq!(first_tasks, second_tasks);

        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.task_count, b.task_count);
        assert_eq!(b.task_count, 2);
    }

    fn on_disk_tasks(path: &Path) -> String {
        let record: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        serde_json::to_string(&record["tasks"]).unwrap()
    }

    #[tokio::test]
    async fn reconcile_without_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert_eq!(store.reconcile().await.unwrap(), ReconcileOutcome::NoMirror);
    }

    #[tokio::test]
    async fn unwritable_store_keeps_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store
            .publish(vec![scored("a", 1.0)], RecordSource::Worker)
            .await
            .unwrap();

        // A directory where the temp file should go makes the write fail.
        std::fs::create_dir_all(store.path().with_extension("json.tmp")).unwrap();
        let err = store
            .publish(vec![scored("b", 2.0)], RecordSource::Worker)
            .await
            .unwrap_err();
        assert!(matches!(err, PriorityError::Store(_)));
        assert_eq!(store.current().await.unwrap().tasks, vec![scored("a", 1.0)]);
    }
}
