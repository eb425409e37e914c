//! Task queue and result store.
//!
//! Both are narrow traits so the worker and the HTTP layer never touch the
//! backing store directly. Write paths report success as a `bool` and read paths
//! report absence as [`ResultLookup::Pending`]; storage errors never cross this
//! boundary except on [`TaskQueue::pop`], where the caller needs to back off.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::task::TaskDescriptor;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

pub const DEFAULT_QUEUE_NAME: &str = "Queue_RO";

/// Results expire after 24 hours.
pub const RESULT_TTL: Duration = Duration::from_secs(86_400);

/// Redis key holding the result for `task_id`.
pub fn result_key(task_id: &str) -> String {
    format!("res_result:{task_id}")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A serialized task descriptor exactly as it was popped. Decoding is left to
/// the consumer so malformed payloads can be reported with whatever ID survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry(pub String);

impl QueueEntry {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of a result lookup. `Pending` is the "not yet available" answer and
/// is distinct from a completed result that happens to be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLookup {
    Ready(String),
    Pending,
}

/// Ordered work queue shared by producers and workers.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Appends a descriptor at the tail. Returns whether the store accepted it.
    async fn push(&self, descriptor: &TaskDescriptor) -> bool;

    /// Removes the oldest entry, waiting up to `timeout`. `Ok(None)` on timeout.
    async fn pop(&self, timeout: Duration) -> Result<Option<QueueEntry>, StoreError>;

    /// Approximate number of queued entries; 0 if the store cannot be reached.
    async fn length(&self) -> usize;
}

/// Keyed, expiring store of final results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores `result` under `task_id` for [`RESULT_TTL`], replacing any previous value.
    async fn put(&self, task_id: &str, result: &str) -> bool;

    async fn get(&self, task_id: &str) -> ResultLookup;
}
