//! In-process broadcast of ranking updates.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::record::RankingRecord;

/// Event kind announced after every publish.
pub const PRIORITY_UPDATE: &str = "priority-update";

/// Lightweight notice that a new ranking is available.
///
/// Subscribers re-read the store rather than recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityEvent {
    pub kind: String,
    /// Publish time in epoch milliseconds.
    pub timestamp: i64,
    pub task_count: usize,
    /// Version of the record this event announces.
    pub version: u64,
}

impl PriorityEvent {
    #[must_use]
    pub fn for_record(record: &RankingRecord) -> Self {
        Self {
            kind: PRIORITY_UPDATE.to_owned(),
            timestamp: record.published_at.timestamp_millis(),
            task_count: record.task_count(),
            version: record.version,
        }
    }
}

/// Fire-and-forget fan-out of [`PriorityEvent`]s.
///
/// Late subscribers only see events sent after they subscribed.
#[derive(Debug, Clone)]
pub struct PriorityBus {
    event_tx: broadcast::Sender<PriorityEvent>,
}

impl PriorityBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _event_rx) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PriorityEvent> {
        self.event_tx.subscribe()
    }

    /// Send `event` to current subscribers. Returns how many received it.
    pub fn send(&self, event: PriorityEvent) -> usize {
        match self.event_tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("no priority-update subscribers");
                0
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::record::RecordSource;

    fn record() -> RankingRecord {
        RankingRecord {
            version: 7,
            published_at: chrono::Utc::now(),
            source: RecordSource::Fallback,
            tasks: Vec::new(),
        }
    }

    #[test]
    fn send_without_subscribers_is_fine() {
        let bus = PriorityBus::new(4);
        assert_eq!(bus.send(PriorityEvent::for_record(&record())), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = PriorityBus::new(4);
        let mut rx = bus.subscribe();
        assert_eq!(bus.send(PriorityEvent::for_record(&record())), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, "priority-update");
        assert_eq!(event.task_count, 0);
        assert_eq!(event.version, 7);
    }

    #[test]
    fn late_subscribers_miss_old_events() {
        let bus = PriorityBus::new(4);
        let _early = bus.subscribe();
        bus.send(PriorityEvent::for_record(&record()));

        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = PriorityBus::new(0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn event_wire_format() {
        let value = serde_json::to_value(PriorityEvent::for_record(&record())).unwrap();
        assert_eq!(value["kind"], "priority-update");
        assert!(value.get("taskCount").is_some());
        assert!(value["timestamp"].is_i64());
    }
}
