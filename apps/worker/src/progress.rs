/// Progress tracking for queue jobs, mirroring BullMQ's `job.updateProgress`
/// semantics over a plain Redis hash since Rust workers do not speak the
/// BullMQ Node client protocol directly.
use chrono::Utc;
use redis::AsyncCommands;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

const EMOJI_PROGRESS: &str = "\u{2699}\u{fe0f}"; // ⚙️
const EMOJI_COMPLETE: &str = "\u{2705}"; // ✅
const EMOJI_FAIL: &str = "\u{274c}"; // ❌

/// Which job-type prefix to render in log lines, matching the three
/// processing log formats: `[jobId]`, `[i/n][resumeId]`, `[i/n][jobId]`.
#[derive(Debug, Clone)]
pub enum JobContext {
    Jd { job_id: String },
    Resume { resume_id: String, index: usize, total: usize },
    Ranking { job_id: String, batch: usize, total: usize },
}

impl JobContext {
    fn prefix(&self) -> String {
        fn short(id: &str) -> &str {
            &id[..id.len().min(12)]
        }
        match self {
            JobContext::Jd { job_id } => format!("[{}...]", short(job_id)),
            JobContext::Resume { resume_id, index, total } => {
                format!("[{index}/{total}][{}...]", short(resume_id))
            }
            JobContext::Ranking { job_id, batch, total } => {
                format!("[{batch}/{total}][{}...]", short(job_id))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ProgressPayload<'a> {
    percent: u8,
    step: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

/// Tracks a single job's progress, pushing updates to Redis (under
/// `progress:{job_id}`) and emitting a parallel emoji-tagged log line.
pub struct ProgressTracker {
    redis: redis::Client,
    job_id: String,
    context: JobContext,
    start: chrono::DateTime<Utc>,
}

impl ProgressTracker {
    pub fn new(redis: redis::Client, job_id: String, context: JobContext) -> Self {
        Self {
            redis,
            job_id,
            context,
            start: Utc::now(),
        }
    }

    fn duration_ms(&self) -> i64 {
        (Utc::now() - self.start).num_milliseconds()
    }

    /// Writes the payload into the job's progress hash, the closest
    /// analogue to BullMQ's `job.updateProgress`/`updateData` over a plain
    /// Redis connection.
    async fn push(&self, payload: &serde_json::Value) -> anyhow::Result<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let key = format!("progress:{}", self.job_id);
        let serialized = serde_json::to_string(payload)?;
        let _: () = conn.hset(&key, "data", serialized).await?;
        Ok(())
    }

    /// Pushes a progress update. Percent is clamped into `0..=100`.
    pub async fn update(&self, percent: u8, step: &str, message: Option<&str>) {
        let percent = percent.min(100);
        let payload = ProgressPayload {
            percent,
            step,
            timestamp: Utc::now().to_rfc3339(),
            message,
            stage: None,
            metadata: None,
        };

        if let Err(e) = self.push(&json!(payload)).await {
            error!("failed to push progress update: {e}");
        }

        let prefix = self.context.prefix();
        match message {
            Some(m) => info!("{EMOJI_PROGRESS}  {prefix} {step} ({percent}%) - {m}"),
            None => info!("{EMOJI_PROGRESS}  {prefix} {step} ({percent}%)"),
        }
    }

    /// Stage-weighted progress: overall percent is interpolated from
    /// `current_stage` (1-based) out of `total_stages`, plus the fraction
    /// completed within the current stage.
    pub async fn update_with_stage(
        &self,
        stage_name: &str,
        stage_percent: u8,
        current_stage: usize,
        total_stages: usize,
        message: Option<&str>,
    ) {
        let stage_weight = 100.0 / total_stages as f64;
        let overall = ((current_stage - 1) as f64 * stage_weight)
            + (stage_percent as f64 * stage_weight / 100.0);
        let overall = overall.round().clamp(0.0, 100.0) as u8;

        let payload = ProgressPayload {
            percent: overall,
            step: stage_name,
            timestamp: Utc::now().to_rfc3339(),
            message,
            stage: Some(format!("{current_stage}/{total_stages}")),
            metadata: Some(json!({
                "stagePercent": stage_percent,
                "currentStage": current_stage,
                "totalStages": total_stages,
            })),
        };

        if let Err(e) = self.push(&json!(payload)).await {
            error!("failed to push staged progress update: {e}");
        }

        let prefix = self.context.prefix();
        match message {
            Some(m) => info!("{EMOJI_PROGRESS}  {prefix} {stage_name} ({overall}%) - {m}"),
            None => info!("{EMOJI_PROGRESS}  {prefix} {stage_name} ({overall}%)"),
        }
    }

    pub async fn complete(&self, summary: Option<serde_json::Value>) {
        self.update(100, "complete", Some("Job completed successfully")).await;

        let completion = json!({
            "success": true,
            "step": "complete",
            "timestamp": Utc::now().to_rfc3339(),
            "duration": self.duration_ms(),
            "summary": summary,
        });

        if let Err(e) = self.push(&completion).await {
            error!("failed to record completion: {e}");
        }

        let prefix = self.context.prefix();
        info!("{EMOJI_COMPLETE}  {prefix} Processing complete ({}ms)", self.duration_ms());
    }

    pub async fn failed(&self, error_message: &str, error_type: Option<&str>, step: Option<&str>) {
        let failure = json!({
            "error": error_message,
            "errorType": error_type,
            "step": step.unwrap_or("unknown"),
            "timestamp": Utc::now().to_rfc3339(),
            "duration": self.duration_ms(),
        });

        if let Err(e) = self.push(&failure).await {
            error!("failed to record failure: {e}");
        }

        let prefix = self.context.prefix();
        error!("{EMOJI_FAIL}  {prefix} {}: {error_message}", error_type.unwrap_or("Error"));
    }
}

/// Aggregates child-job completion for a ranking batch's parent job,
/// reporting overall progress as `completed / total`.
pub struct ParentTracker {
    inner: ProgressTracker,
    total_children: usize,
    completed_children: usize,
    failed_children: usize,
}

impl ParentTracker {
    pub fn new(inner: ProgressTracker, total_children: usize) -> Self {
        Self {
            inner,
            total_children,
            completed_children: 0,
            failed_children: 0,
        }
    }

    pub async fn child_completed(&mut self, child_index: usize) {
        self.completed_children += 1;
        let percent = if self.total_children == 0 {
            100
        } else {
            ((self.completed_children as f64 / self.total_children as f64) * 100.0) as u8
        };
        self.inner
            .update(
                percent,
                "processing_children",
                Some(&format!("Completed {}/{}", self.completed_children, self.total_children)),
            )
            .await;
        let _ = child_index;
    }

    pub async fn child_failed(&mut self, child_index: usize, error_message: &str) {
        self.failed_children += 1;
        error!(
            "child {child_index}/{} failed: {error_message}",
            self.total_children
        );
    }

    pub async fn complete_parent(&self) {
        let success_rate = if self.total_children > 0 {
            self.completed_children as f64 / self.total_children as f64 * 100.0
        } else {
            0.0
        };
        self.inner
            .complete(Some(json!({
                "totalChildren": self.total_children,
                "completedChildren": self.completed_children,
                "failedChildren": self.failed_children,
                "successRate": success_rate,
            })))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jd_prefix_truncates_to_twelve_chars() {
        let ctx = JobContext::Jd { job_id: "673abc123def456".to_string() };
        assert_eq!(ctx.prefix(), "[673abc123def...]");
    }

    #[test]
    fn resume_prefix_includes_index_and_total() {
        let ctx = JobContext::Resume {
            resume_id: "789xyz".to_string(),
            index: 1,
            total: 87,
        };
        assert_eq!(ctx.prefix(), "[1/87][789xyz...]");
    }

    #[test]
    fn ranking_prefix_includes_batch_and_total() {
        let ctx = JobContext::Ranking {
            job_id: "673abc123def".to_string(),
            batch: 1,
            total: 3,
        };
        assert_eq!(ctx.prefix(), "[1/3][673abc123def...]");
    }

    #[test]
    fn stage_weighted_progress_matches_expected_midpoint() {
        // Stage 2 of 4, 50% through current stage -> 37.5%, rounds to 38.
        let stage_weight = 100.0 / 4.0;
        let overall = ((2 - 1) as f64 * stage_weight) + (50.0 * stage_weight / 100.0);
        assert_eq!(overall.round() as u8, 38);
    }
}
