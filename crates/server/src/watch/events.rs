// crates/server/src/watch/events.rs
//! Typed delivery events and the per-job channel registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Channel capacity per job. Slow SSE consumers past this depth see a
/// `Lagged` error and recover from the persisted records.
const CHANNEL_CAPACITY: usize = 256;

/// One artifact version, fully written, validated and persisted.
///
/// Immutable; produced exactly once per accepted `(filename, size)` version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub job_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub artifact_type: String,
    pub variant: String,
    /// Job-relative path, already validated against the safe root.
    pub path: String,
}

/// Registry of per-job broadcast channels.
///
/// The watcher is the only sender for a job; any number of SSE subscribers
/// attach read-only via [`subscribe`](Self::subscribe). They never touch
/// watcher-internal state.
#[derive(Clone, Default)]
pub struct EventRegistry {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<DeliveryEvent>>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or lazily create) the sender for a job's channel.
    pub fn sender_for(&self, job_id: &str) -> broadcast::Sender<DeliveryEvent> {
        match self.channels.write() {
            Ok(mut channels) => channels
                .entry(job_id.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned writing event channels: {e}");
                broadcast::channel(CHANNEL_CAPACITY).0
            }
        }
    }

    /// Subscribe to a job's delivery events.
    ///
    /// Creates the channel if the job has not started yet, so a viewer can
    /// open the stream before launching the job without missing events.
    pub fn subscribe(&self, job_id: &str) -> broadcast::Receiver<DeliveryEvent> {
        self.sender_for(job_id).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(job_id: &str, filename: &str, size: u64) -> DeliveryEvent {
        DeliveryEvent {
            job_id: job_id.into(),
            filename: filename.into(),
            size_bytes: size,
            artifact_type: "md".into(),
            variant: "en".into(),
            path: format!("{job_id}/{filename}"),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_events_for_its_job() {
        let registry = EventRegistry::new();
        let mut rx = registry.subscribe("job1");

        registry.sender_for("job1").send(event("job1", "a.md", 10)).unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.filename, "a.md");
        assert_eq!(got.size_bytes, 10);
    }

    #[tokio::test]
    async fn channels_are_isolated_per_job() {
        let registry = EventRegistry::new();
        let mut rx1 = registry.subscribe("job1");

        // No subscribers on job2's channel yet, so the send fails; fine.
        let _ = registry.sender_for("job2").send(event("job2", "b.md", 5));
        registry.sender_for("job1").send(event("job1", "a.md", 1)).unwrap();

        let got = rx1.recv().await.unwrap();
        assert_eq!(got.job_id, "job1");
        assert!(rx1.try_recv().is_err(), "job2 events must not cross over");
    }

    #[test]
    fn sender_is_stable_across_lookups() {
        let registry = EventRegistry::new();
        let a = registry.sender_for("job1");
        let b = registry.sender_for("job1");
        assert!(a.same_channel(&b));
    }

    #[test]
    fn event_serialization_shape() {
        let json = serde_json::to_string(&event("job1", "report_fr.pdf", 42)).unwrap();
        assert!(json.contains("\"job_id\":\"job1\""));
        assert!(json.contains("\"filename\":\"report_fr.pdf\""));
        assert!(json.contains("\"size_bytes\":42"));
        assert!(json.contains("\"path\":\"job1/report_fr.pdf\""));
    }
}
