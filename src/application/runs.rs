//! Live view of recent runs, keyed by run id.
//!
//! Each run owns a `watch` channel holding its latest [`RunSnapshot`]. The
//! runner publishes progress events into it as they arrive; any number of
//! subscribers see the snapshot so far and every change after it.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::core::{domain::ProgressEvent, error::FieldError, output::RenderedOutput};

/// Finished runs kept for late subscribers before the oldest is dropped.
pub const DEFAULT_RUN_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Someone subscribed to the id before a submission claimed it.
    #[default]
    Pending,
    Running,
    Rejected,
    Failed,
    Completed,
}

impl RunStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            RunStatus::Rejected | RunStatus::Failed | RunStatus::Completed
        )
    }
}

/// Everything known about a run at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub status: RunStatus,
    pub events: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<RenderedOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u128>,
}

pub type RunFeed = Arc<watch::Sender<RunSnapshot>>;

/// Bounded map of run feeds; the oldest entry is evicted first.
#[derive(Debug)]
pub struct RunRegistry {
    capacity: usize,
    inner: Mutex<Feeds>,
}

#[derive(Debug, Default)]
struct Feeds {
    by_id: HashMap<Uuid, RunFeed>,
    order: VecDeque<Uuid>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_CAPACITY)
    }
}

impl RunRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Feeds::default()),
        }
    }

    /// Reserves a feed for a new run and marks it running.
    ///
    /// A requested id is honoured only while nothing has run under it yet;
    /// otherwise a fresh id is issued.
    pub fn claim(&self, requested: Option<Uuid>) -> (Uuid, RunFeed) {
        let mut feeds = self.lock();
        let reusable = requested.and_then(|run_id| match feeds.by_id.get(&run_id) {
            Some(feed) if feed.borrow().status == RunStatus::Pending => {
                Some((run_id, feed.clone()))
            }
            Some(_) => {
                tracing::warn!(%run_id, "requested run id already used; issuing a new one");
                None
            }
            None => Some((run_id, self.insert(&mut feeds, run_id))),
        });
        let (run_id, feed) = reusable.unwrap_or_else(|| {
            let run_id = Uuid::new_v4();
            (run_id, self.insert(&mut feeds, run_id))
        });
        feed.send_modify(|snapshot| snapshot.status = RunStatus::Running);
        (run_id, feed)
    }

    /// Subscribes to `run_id`, opening a pending feed when the run is not known yet.
    pub fn subscribe(&self, run_id: Uuid) -> watch::Receiver<RunSnapshot> {
        let mut feeds = self.lock();
        match feeds.by_id.get(&run_id) {
            Some(feed) => feed.subscribe(),
            None => self.insert(&mut feeds, run_id).subscribe(),
        }
    }

    /// Latest snapshot of a known run.
    pub fn snapshot(&self, run_id: Uuid) -> Option<RunSnapshot> {
        self.lock()
            .by_id
            .get(&run_id)
            .map(|feed| feed.borrow().clone())
    }

    fn insert(&self, feeds: &mut Feeds, run_id: Uuid) -> RunFeed {
        while feeds.order.len() >= self.capacity {
            let Some(oldest) = feeds.order.pop_front() else {
                break;
            };
            feeds.by_id.remove(&oldest);
        }
        let (tx, _) = watch::channel(RunSnapshot::default());
        let feed = Arc::new(tx);
        feeds.by_id.insert(run_id, feed.clone());
        feeds.order.push_back(run_id);
        feed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Feeds> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscriber_may_arrive_before_the_run() {
        let registry = RunRegistry::default();
        let id = Uuid::new_v4();
        let mut rx = registry.subscribe(id);
        assert_eq!(rx.borrow().status, RunStatus::Pending);

        let (claimed, feed) = registry.claim(Some(id));
        assert_eq!(claimed, id);
        feed.send_modify(|snapshot| {
            snapshot.events.push(ProgressEvent {
                name: "Step".into(),
                payload: json!(1),
            });
        });
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.status, RunStatus::Running);
        assert_eq!(seen.events.len(), 1);
    }

    #[test]
    fn used_ids_are_not_handed_out_twice() {
        let registry = RunRegistry::default();
        let (first, _) = registry.claim(None);
        let (second, _) = registry.claim(Some(first));
        assert_ne!(first, second);
        assert_eq!(
            registry.snapshot(first).map(|s| s.status),
            Some(RunStatus::Running)
        );
    }

    #[test]
    fn oldest_runs_are_evicted_past_capacity() {
        let registry = RunRegistry::new(2);
        let (a, _) = registry.claim(None);
        let (b, _) = registry.claim(None);
        let (c, _) = registry.claim(None);
        assert!(registry.snapshot(a).is_none());
        assert!(registry.snapshot(b).is_some());
        assert!(registry.snapshot(c).is_some());
    }

    #[test]
    fn snapshot_serializes_without_empty_sections() {
        let snapshot = RunSnapshot {
            status: RunStatus::Running,
            ..RunSnapshot::default()
        };
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"status": "running", "events": []})
        );
    }
}
