/// Job-description processing stage pipeline — fetch, extract, parse,
/// embed, persist. Mirrors the legacy `main_jd_processor.py` orchestrator.
use serde_json::json;
use tracing::warn;

use super::stage::{PipelineContext, StageResult};
use crate::errors::PipelineError;
use crate::llm::ParseKind;
use crate::models::jd::JdAnalysis;
use crate::progress::{JobContext, ProgressTracker};
use crate::scoring::semantic;

pub struct JdJob {
    pub job_id: String,
    pub raw_text: String,
}

pub async fn run(ctx: &PipelineContext, job: JdJob) -> StageResult<JdAnalysis> {
    let tracker = ProgressTracker::new(
        ctx.redis.clone(),
        job.job_id.clone(),
        JobContext::Jd { job_id: job.job_id.clone() },
    );

    let _ = ctx
        .backend
        .patch::<_, serde_json::Value>(&format!("/jobs/{}", job.job_id), &json!({ "jd_processing_status": "processing" }))
        .await;

    let outcome = run_inner(ctx, &job, &tracker).await;

    match &outcome {
        Ok(_) => {
            let _ = ctx
                .backend
                .post::<_, serde_json::Value>("/updates/jd/status", &json!({ "job_id": job.job_id, "status": "completed" }))
                .await;
            let _ = ctx
                .backend
                .patch::<_, serde_json::Value>(&format!("/jobs/{}", job.job_id), &json!({ "jd_processing_status": "success" }))
                .await;
        }
        Err(e) => {
            let _ = ctx
                .backend
                .post::<_, serde_json::Value>("/updates/jd/status", &json!({ "job_id": job.job_id, "status": "failed" }))
                .await;
            let _ = ctx.backend.patch::<_, serde_json::Value>(
                &format!("/jobs/{}", job.job_id),
                &json!({ "jd_processing_status": "failed", "jd_processing_error": e.to_string() }),
            )
            .await;
            tracker.failed(&e.to_string(), None, Some("processing")).await;
        }
    }

    outcome
}

async fn run_inner(ctx: &PipelineContext, job: &JdJob, tracker: &ProgressTracker) -> StageResult<JdAnalysis> {
    tracker.update(10, "fetching_job", Some("Fetching job details from database")).await;
    tracker.update(20, "fetching_job", Some("Job details loaded")).await;

    tracker.update(25, "extracting_text", Some("Extracting text from PDF and JD")).await;
    if job.raw_text.trim().is_empty() {
        return Err(PipelineError::Validation("job has no extractable text".to_string()));
    }
    tracker
        .update(30, "extracting_text", Some(&format!("Text extracted: {} characters", job.raw_text.len())))
        .await;

    tracker.update(45, "ai_parsing", Some("Processing JD with AI (1-2 minutes)")).await;
    let parsed: JdAnalysis = ctx.llm.parse_text(ParseKind::JobDescription, &job.raw_text).await?;
    tracker.update(60, "ai_parsing", Some("AI parsing completed")).await;

    tracker.update(65, "saving_analysis", Some("Saving parsed analysis to database")).await;
    let _: serde_json::Value = ctx
        .backend
        .post(
            "/updates/jd/parsed",
            &json!({ "job_id": job.job_id, "jd_analysis": &parsed }),
        )
        .await?;
    tracker.update(70, "saving_analysis", Some("Parsed analysis saved")).await;

    if !parsed.filter_requirements.mandatory_compliances.structured.is_empty() {
        let _: serde_json::Value = ctx
            .backend
            .post(
                "/updates/jd/compliance",
                &json!({ "job_id": job.job_id, "filter_requirements": &parsed.filter_requirements }),
            )
            .await?;
    }

    tracker.update(75, "generating_embeddings", Some("Generating embeddings")).await;
    let jd_sections = semantic::extract_sections_from_jd(&parsed, None);
    let mut sections_generated = 0usize;
    let mut embeddings_payload = serde_json::Map::new();

    for &section in semantic::SECTION_NAMES {
        let sentences = jd_sections.get(section).cloned().unwrap_or_default();
        match ctx.llm.embed_batch(&sentences).await {
            Ok(vectors) if !vectors.is_empty() => {
                sections_generated += 1;
                embeddings_payload.insert(section.to_string(), json!(vectors));
            }
            Ok(_) => {}
            Err(e) => warn!("embedding generation failed for section {section}: {e}"),
        }
    }
    tracker
        .update(85, "generating_embeddings", Some(&format!("Generated {sections_generated}/6 embeddings")))
        .await;

    if sections_generated > 0 {
        tracker.update(90, "saving_embeddings", Some("Saving embeddings to database")).await;
        let _: serde_json::Value = ctx
            .backend
            .post(
                "/updates/jd/embeddings",
                &json!({ "job_id": job.job_id, "jd_embedding": embeddings_payload }),
            )
            .await?;
        tracker.update(95, "saving_embeddings", Some("Embeddings saved successfully")).await;
    }

    tracker
        .complete(Some(json!({
            "jobId": job.job_id,
            "skillsExtracted": parsed.required_skills.len(),
            "embeddingsGenerated": sections_generated,
        })))
        .await;

    Ok(parsed)
}
