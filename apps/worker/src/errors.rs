#![allow(dead_code)]

use thiserror::Error;

/// Pipeline-wide error taxonomy. Kinds, not types: every stage failure is
/// one of these variants, and the stage pipeline decides fatal vs.
/// non-fatal disposition per variant rather than per concrete error struct.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unrecoverable — abort the job and report failure upstream.
    #[error("fatal job error: {0}")]
    FatalJob(String),

    /// A single stage failed but the pipeline can continue in a degraded
    /// state (e.g. embedding generation failing doesn't block scoring).
    #[error("stage skippable: {0}")]
    StageSkippable(String),

    /// A downstream dependency (backend, LLM, Redis) returned a transient
    /// failure; the caller may retry the whole job.
    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    /// The LLM Gateway's circuit breaker is open; fail fast without
    /// attempting the call.
    #[error("circuit open for {0}")]
    CircuitOpen(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("API error ({status}) from {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// Whether this error should abort the whole job (fatal) or allow the
    /// stage pipeline to continue in a degraded state (non-fatal).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::StageSkippable(_))
    }
}
