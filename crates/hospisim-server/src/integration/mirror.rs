//! External copy of the router log so it survives restarts.

use async_trait::async_trait;
use deadpool_redis::{Pool, redis::AsyncCommands};
use thiserror::Error;
use tracing::warn;

use super::log::RouterLogEntry;

pub const REDIS_LOG_KEY: &str = "integration:messages";

#[derive(Debug, Error)]
pub enum LogMirrorError {
    #[error("log mirror pool error: {0}")]
    Pool(String),

    #[error("log mirror command failed: {0}")]
    Command(String),

    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait LogMirror: Send + Sync {
    async fn append(&self, entry: &RouterLogEntry) -> Result<(), LogMirrorError>;

    /// Retained entries, oldest first.
    async fn load_recent(&self) -> Result<Vec<RouterLogEntry>, LogMirrorError>;

    fn name(&self) -> &'static str;
}

/// Capped Redis list, newest at the head (`LPUSH` + `LTRIM`).
pub struct RedisLogMirror {
    pool: Pool,
    key: String,
    capacity: usize,
}

impl RedisLogMirror {
    pub fn new(pool: Pool, capacity: usize) -> Self {
        Self {
            pool,
            key: REDIS_LOG_KEY.to_string(),
            capacity: capacity.max(1),
        }
    }

    fn last_index(&self) -> isize {
        isize::try_from(self.capacity).unwrap_or(isize::MAX) - 1
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, LogMirrorError> {
        self.pool
            .get()
            .await
            .map_err(|e| LogMirrorError::Pool(e.to_string()))
    }
}

#[async_trait]
impl LogMirror for RedisLogMirror {
    async fn append(&self, entry: &RouterLogEntry) -> Result<(), LogMirrorError> {
        let encoded = serde_json::to_string(entry)?;
        let mut conn = self.connection().await?;
        let _: () = deadpool_redis::redis::pipe()
            .atomic()
            .lpush(&self.key, encoded)
            .ignore()
            .ltrim(&self.key, 0, self.last_index())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| LogMirrorError::Command(e.to_string()))?;
        Ok(())
    }

    async fn load_recent(&self) -> Result<Vec<RouterLogEntry>, LogMirrorError> {
        let mut conn = self.connection().await?;
        let raw: Vec<String> = conn
            .lrange(&self.key, 0, self.last_index())
            .await
            .map_err(|e| LogMirrorError::Command(e.to_string()))?;

        // The list is newest first.
        let mut entries: Vec<RouterLogEntry> = raw
            .iter()
            .filter_map(|item| match serde_json::from_str(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable mirrored log entry");
                    None
                }
            })
            .collect();
        entries.reverse();
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
