//! Redis-backed queue and result store.
//!
//! | Key | Type | Purpose |
//! |-----|------|---------|
//! | `{queue_name}` | List | `LPUSH` at the tail, `BRPOP` from the head |
//! | `res_result:{task_id}` | String | final result, `SETEX` with a 24 h TTL |
//!
//! `BRPOP` removes the element atomically on the server, so two workers popping
//! the same list can never both receive one entry.

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::Client;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::{
    result_key, QueueEntry, ResultLookup, ResultStore, StoreError, TaskQueue, DEFAULT_QUEUE_NAME,
    RESULT_TTL,
};
use crate::models::task::TaskDescriptor;

/// Queue and result store over one Redis deployment.
///
/// Short commands share a [`MultiplexedConnection`]; each blocking pop opens its
/// own connection so a waiting `BRPOP` never holds up pushes or result writes.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn: MultiplexedConnection,
    queue_name: String,
}

impl RedisStore {
    /// Connects and verifies the server answers `PING`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis connection established");

        Ok(Self {
            client,
            conn,
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
        })
    }

    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn try_push(&self, descriptor: &TaskDescriptor) -> Result<i64, StoreError> {
        let payload = descriptor.encode()?;
        let len: i64 = ::redis::cmd("LPUSH")
            .arg(&self.queue_name)
            .arg(payload)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(len)
    }

    async fn try_put(&self, task_id: &str, result: &str) -> Result<(), StoreError> {
        let _: () = ::redis::cmd("SETEX")
            .arg(result_key(task_id))
            .arg(RESULT_TTL.as_secs())
            .arg(result)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for RedisStore {
    async fn push(&self, descriptor: &TaskDescriptor) -> bool {
        match self.try_push(descriptor).await {
            Ok(len) => {
                info!(
                    "Task {} pushed to queue {} (length {len})",
                    descriptor.task_id, self.queue_name
                );
                len > 0
            }
            Err(e) => {
                error!("Failed to push task {}: {e}", descriptor.task_id);
                false
            }
        }
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<QueueEntry>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // BRPOP treats 0 as "wait forever"; keep the wait bounded.
        let timeout_secs = timeout.as_secs().max(1);

        let popped: Option<(String, String)> = ::redis::cmd("BRPOP")
            .arg(&self.queue_name)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        Ok(popped.map(|(_, payload)| {
            debug!("Task popped from queue {}", self.queue_name);
            QueueEntry(payload)
        }))
    }

    async fn length(&self) -> usize {
        let len: Result<usize, _> = ::redis::cmd("LLEN")
            .arg(&self.queue_name)
            .query_async(&mut self.conn.clone())
            .await;
        len.unwrap_or_else(|e| {
            error!("Failed to read length of queue {}: {e}", self.queue_name);
            0
        })
    }
}

#[async_trait]
impl ResultStore for RedisStore {
    async fn put(&self, task_id: &str, result: &str) -> bool {
        match self.try_put(task_id, result).await {
            Ok(()) => {
                info!("Result stored for task {task_id}");
                true
            }
            Err(e) => {
                error!("Failed to store result for task {task_id}: {e}");
                false
            }
        }
    }

    async fn get(&self, task_id: &str) -> ResultLookup {
        let value: Result<Option<String>, _> = ::redis::cmd("GET")
            .arg(result_key(task_id))
            .query_async(&mut self.conn.clone())
            .await;

        match value {
            Ok(Some(result)) => ResultLookup::Ready(result),
            Ok(None) => {
                debug!("No result yet for task {task_id}");
                ResultLookup::Pending
            }
            Err(e) => {
                warn!("Result lookup failed for task {task_id}: {e}");
                ResultLookup::Pending
            }
        }
    }
}
