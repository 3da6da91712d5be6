pub mod redis_queue;

pub use redis_queue::RedisJobQueue;

use async_trait::async_trait;

use crate::errors::PipelineError;

/// The queue substrate consumed by the dispatcher. One blocking pop per
/// named list, close enough to BullMQ's wire model to exercise the
/// dispatcher's concurrency contract — not a durable queue implementation.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Blocks (up to `timeout_secs`) for the next job payload on `queue_name`.
    /// Returns `Ok(None)` on timeout so callers can re-check for shutdown.
    async fn pop(&self, queue_name: &str, timeout_secs: f64) -> Result<Option<String>, PipelineError>;
}
