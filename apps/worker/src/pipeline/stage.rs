/// Shared plumbing the three stage pipelines (JD, resume, ranking) build
/// on: the dependencies every stage needs, and the outcome type a stage
/// function returns to its driver.
use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::llm::LlmGateway;

/// Dependencies shared by every pipeline stage — constructed once at
/// startup and cloned (cheaply, via `Arc`) into each worker task.
#[derive(Clone)]
pub struct PipelineContext {
    pub llm: Arc<LlmGateway>,
    pub backend: BackendClient,
    pub redis: redis::Client,
    pub config: Arc<Config>,
}

/// Outcome of a single pipeline run. A fatal error aborts the job;
/// `StageSkippable` lets the driver record the failure and move on
/// without retrying, matching the legacy processors' "warn and
/// continue with a default" stages (e.g. failed embeddings).
pub type StageResult<T> = Result<T, crate::errors::PipelineError>;
