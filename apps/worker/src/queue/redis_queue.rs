use async_trait::async_trait;
use redis::AsyncCommands;

use super::JobQueue;
use crate::errors::PipelineError;

/// `BRPOPLPUSH`-style adapter over a plain Redis list per queue name.
/// Pops move the payload into a `{queue}:processing` list so an in-flight
/// job is still visible to external inspection, mirroring BullMQ's active
/// list without its stalled-job reclaim machinery (explicitly out of scope).
pub struct RedisJobQueue {
    client: redis::Client,
}

impl RedisJobQueue {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn pop(&self, queue_name: &str, timeout_secs: f64) -> Result<Option<String>, PipelineError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PipelineError::UpstreamTransient(format!("redis connection failed: {e}")))?;

        let processing_key = format!("{queue_name}:processing");
        let timeout = timeout_secs.round().max(0.0) as usize;
        let payload: Option<String> = conn
            .brpoplpush(queue_name, &processing_key, timeout)
            .await
            .map_err(|e| PipelineError::UpstreamTransient(format!("redis brpoplpush failed: {e}")))?;

        Ok(payload)
    }
}
