//! In-process queue and result store with the same semantics as the Redis one,
//! used by tests. Expired results are dropped on read and swept on every write.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::{QueueEntry, ResultLookup, ResultStore, StoreError, TaskQueue, RESULT_TTL};
use crate::models::task::TaskDescriptor;

#[derive(Default)]
pub struct MemoryStore {
    queue: Mutex<VecDeque<String>>,
    pushed: Notify,
    results: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a raw payload without encoding it, e.g. to simulate a corrupt entry.
    pub async fn push_raw(&self, payload: impl Into<String>) {
        self.queue.lock().await.push_back(payload.into());
        self.pushed.notify_one();
    }
}

#[async_trait]
impl TaskQueue for MemoryStore {
    async fn push(&self, descriptor: &TaskDescriptor) -> bool {
        match descriptor.encode() {
            Ok(payload) => {
                self.push_raw(payload).await;
                true
            }
            Err(e) => {
                tracing::error!("Failed to encode task {}: {e}", descriptor.task_id);
                false
            }
        }
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<QueueEntry>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a push in between is not missed.
            let pushed = self.pushed.notified();
            if let Some(payload) = self.queue.lock().await.pop_front() {
                return Ok(Some(QueueEntry(payload)));
            }
            if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn length(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn put(&self, task_id: &str, result: &str) -> bool {
        let now = Instant::now();
        let mut results = self.results.lock().await;
        results.retain(|_, (_, expires_at)| *expires_at > now);
        results.insert(task_id.to_string(), (result.to_string(), now + RESULT_TTL));
        true
    }

    async fn get(&self, task_id: &str) -> ResultLookup {
        let mut results = self.results.lock().await;
        match results.get(task_id) {
            Some((value, expires_at)) if Instant::now() < *expires_at => {
                ResultLookup::Ready(value.clone())
            }
            Some(_) => {
                results.remove(task_id);
                ResultLookup::Pending
            }
            None => ResultLookup::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskInfo, TaskKind};
    use std::sync::Arc;

    fn descriptor(task_id: &str) -> TaskDescriptor {
        TaskDescriptor::new(
            task_id.to_string(),
            TaskKind::ResumeOptimization,
            TaskInfo {
                resume_text: format!("resume of {task_id}"),
                job_name: "数据分析师".to_string(),
                job_description: String::new(),
                extra_info: String::new(),
                user_remarks: String::new(),
            },
        )
    }

    fn decoded(entry: Option<QueueEntry>) -> TaskDescriptor {
        TaskDescriptor::decode(entry.expect("entry").as_str()).unwrap()
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let store = MemoryStore::new();
        assert!(store.push(&descriptor("d1")).await);
        assert!(store.push(&descriptor("d2")).await);
        assert_eq!(store.length().await, 2);

        let first = decoded(store.pop(Duration::from_secs(1)).await.unwrap());
        let second = decoded(store.pop(Duration::from_secs(1)).await.unwrap());
        assert_eq!(first.task_id, "d1");
        assert_eq!(second.task_id, "d2");
        assert_eq!(store.length().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_on_empty_queue_times_out() {
        let store = MemoryStore::new();
        let started = Instant::now();
        let popped = store.pop(Duration::from_secs(1)).await.unwrap();
        assert!(popped.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_pop_wakes_when_a_producer_pushes() {
        let store = Arc::new(MemoryStore::new());
        let consumer = {
            let store = store.clone();
            tokio::spawn(async move { store.pop(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        store.push(&descriptor("late")).await;

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(decoded(popped).task_id, "late");
    }

    #[tokio::test]
    async fn test_each_entry_is_delivered_once() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..20 {
            store.push(&descriptor(&format!("t{i}"))).await;
        }

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(entry) = store.pop(Duration::from_millis(50)).await.unwrap() {
                        seen.push(decoded(Some(entry)).task_id);
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_is_readable_until_expiry() {
        let store = MemoryStore::new();
        assert!(store.put("t1", "report").await);
        assert_eq!(store.get("t1").await, ResultLookup::Ready("report".into()));

        tokio::time::advance(RESULT_TTL - Duration::from_secs(1)).await;
        assert_eq!(store.get("t1").await, ResultLookup::Ready("report".into()));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("t1").await, ResultLookup::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_expired_results() {
        let store = MemoryStore::new();
        store.put("stale", "old report").await;
        tokio::time::advance(RESULT_TTL + Duration::from_secs(1)).await;

        store.put("fresh", "new report").await;
        let results = store.results.lock().await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_pending() {
        let store = MemoryStore::new();
        assert_eq!(store.get("t1").await, ResultLookup::Pending);
        store.put("t1", "").await;
        assert_eq!(store.get("t1").await, ResultLookup::Ready(String::new()));
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_result() {
        let store = MemoryStore::new();
        store.put("t1", "first").await;
        store.put("t1", "second").await;
        assert_eq!(store.get("t1").await, ResultLookup::Ready("second".into()));
    }
}
