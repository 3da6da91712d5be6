/// Resume processing stage pipeline — fetch, extract, parse, embed,
/// score, persist. Stage boundaries and progress percentages mirror the
/// legacy `main_resume_processor.py` orchestrator exactly.
use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::json;
use tracing::warn;

use super::stage::{PipelineContext, StageResult};
use crate::backend::models::ScoreUpdate;
use crate::errors::PipelineError;
use crate::llm::ParseKind;
use crate::models::jd::JobDescription;
use crate::models::resume::{ParsedResume, ResumeRecord};
use crate::progress::{JobContext, ProgressTracker};
use crate::scoring::{composite, hard_requirements, keyword, project, semantic};
use crate::text_extract;

pub struct ResumeJob {
    pub resume_id: String,
    pub job_id: String,
    pub index: usize,
    pub total: usize,
}

pub struct ResumeOutcome {
    pub final_score: f64,
    pub ranking_tier: crate::models::score::RankingTier,
}

pub async fn run(ctx: &PipelineContext, job: ResumeJob) -> StageResult<ResumeOutcome> {
    let tracker = ProgressTracker::new(
        ctx.redis.clone(),
        job.resume_id.clone(),
        JobContext::Resume {
            resume_id: job.resume_id.clone(),
            index: job.index,
            total: job.total,
        },
    );

    let outcome = run_inner(ctx, &job, &tracker).await;

    if let Err(ref e) = outcome {
        tracker.failed(&e.to_string(), Some(error_kind(e)), Some("processing")).await;
    }

    outcome
}

fn error_kind(e: &PipelineError) -> &'static str {
    match e {
        PipelineError::FatalJob(_) => "FatalJobError",
        PipelineError::StageSkippable(_) => "StageSkippable",
        PipelineError::UpstreamTransient(_) => "UpstreamTransient",
        PipelineError::CircuitOpen(_) => "CircuitOpen",
        PipelineError::Parse(_) => "ParseError",
        PipelineError::Validation(_) => "ValidationError",
        PipelineError::Api { .. } => "APIError",
        PipelineError::Internal(_) => "InternalError",
    }
}

async fn run_inner(ctx: &PipelineContext, job: &ResumeJob, tracker: &ProgressTracker) -> StageResult<ResumeOutcome> {
    tracker.update(5, "fetching_resume", Some("Fetching resume data")).await;
    let resume_record: ResumeRecord = ctx
        .backend
        .get(&format!("/updates/resume/{}", job.resume_id))
        .await?;

    let filename = resume_record
        .filename
        .ok_or_else(|| PipelineError::Validation(format!("resume has no filename: {}", job.resume_id)))?;

    let resume_path = match &resume_record.group_id {
        Some(group_id) => PathBuf::from(&ctx.config.uploads_root)
            .join(group_id)
            .join("resumes")
            .join(&filename),
        None => PathBuf::from(&ctx.config.uploads_root).join("resumes").join(&filename),
    };

    tracker.update(8, "fetching_resume", Some("Resume file located")).await;

    tracker.update(10, "fetching_job", Some("Fetching job data")).await;
    let jd: JobDescription = ctx.backend.get(&format!("/jobs/{}", job.job_id)).await?;

    tracker.update(12, "starting", Some("Starting resume processing")).await;

    tracker.update(15, "extracting_text", Some("Extracting text from PDF")).await;
    let extracted = match text_extract::extract_pdf_text(&resume_path) {
        Ok(e) => e,
        Err(e) => {
            let _ = ctx
                .backend
                .put::<_, serde_json::Value>(
                    &format!("/updates/resume/{}", job.resume_id),
                    &json!({ "extraction_status": "failed" }),
                )
                .await;
            return Err(e);
        }
    };
    let _ = ctx
        .backend
        .put::<_, serde_json::Value>(
            &format!("/updates/resume/{}", job.resume_id),
            &json!({ "extraction_status": "success" }),
        )
        .await;
    tracker
        .update(20, "extracting_text", Some(&format!("Text extracted: {} chars", extracted.characters)))
        .await;

    tracker.update(25, "parsing", Some("Parsing resume with AI")).await;
    let parsed: ParsedResume = match ctx.llm.parse_text(ParseKind::Resume, &extracted.text).await {
        Ok(p) => p,
        Err(e) => {
            let _ = ctx
                .backend
                .put::<_, serde_json::Value>(
                    &format!("/updates/resume/{}", job.resume_id),
                    &json!({ "parsing_status": "failed" }),
                )
                .await;
            return Err(e);
        }
    };
    let _ = ctx
        .backend
        .put::<_, serde_json::Value>(
            &format!("/updates/resume/{}", job.resume_id),
            &json!({ "parsing_status": "success", "parsed_content": &parsed }),
        )
        .await;
    tracker.update(40, "parsing", Some("Resume parsed successfully")).await;

    tracker.update(45, "generating_embeddings", Some("Generating embeddings")).await;
    let resume_sections = semantic::extract_sections_from_resume(&parsed);
    let jd_sections = semantic::extract_sections_from_jd(&jd.jd_analysis, jd.role_title.as_deref());

    let mut embeddings: HashMap<&'static str, (semantic::EmbeddingMatrix, semantic::EmbeddingMatrix)> = HashMap::new();
    for &section in semantic::SECTION_NAMES {
        let jd_sentences = jd_sections.get(section).cloned().unwrap_or_default();
        let resume_sentences = resume_sections.get(section).cloned().unwrap_or_default();

        let jd_matrix = match ctx.llm.embed_batch(&jd_sentences).await {
            Ok(m) => m,
            Err(e) => {
                warn!("embedding failed for section {section}: {e}");
                Vec::new()
            }
        };
        let resume_matrix = match ctx.llm.embed_batch(&resume_sentences).await {
            Ok(m) => m,
            Err(e) => {
                warn!("embedding failed for section {section}: {e}");
                Vec::new()
            }
        };
        embeddings.insert(section, (jd_matrix, resume_matrix));
    }
    tracker.update(55, "generating_embeddings", Some("Embeddings generated")).await;

    tracker.update(60, "scoring", Some("Calculating scores")).await;

    let hard_req_result = hard_requirements::check_hard_requirements(&parsed, &jd.jd_analysis);
    tracker.update(65, "scoring", Some("Hard requirements checked")).await;

    let project_result = project::project_aggregate_score(&parsed);
    tracker
        .update(70, "scoring", Some(&format!("Project score: {:.2}", project_result.overall_score)))
        .await;

    let keyword_result = keyword::composite_keyword_score(&jd.jd_analysis, &parsed, project_result.overall_score);
    tracker
        .update(75, "scoring", Some(&format!("Keyword score: {:.2}", keyword_result.overall_score)))
        .await;

    let semantic_result = semantic::semantic_section_score(&embeddings);
    tracker
        .update(80, "scoring", Some(&format!("Semantic score: {:.2}", semantic_result.overall_semantic_score)))
        .await;

    tracker.update(85, "composite_scoring", Some("Calculating final composite score")).await;
    let composite_result = composite::calculate_composite_score(
        &hard_req_result,
        &project_result,
        &keyword_result,
        &semantic_result,
        &parsed,
        &jd.jd_analysis,
    );
    tracker
        .update(90, "composite_scoring", Some(&format!("Final score: {:.2}", composite_result.final_score)))
        .await;

    tracker.update(95, "saving_scores", Some("Saving scores to database")).await;
    let score_update = ScoreUpdate {
        job_id: job.job_id.clone(),
        resume_id: job.resume_id.clone(),
        score: composite_result.clone(),
    };
    let _: serde_json::Value = ctx.backend.post("/updates/score", &score_update).await?;

    tracker
        .complete(Some(json!({
            "resumeId": job.resume_id,
            "jobId": job.job_id,
            "finalScore": composite_result.final_score,
            "rankingTier": composite_result.ranking_tier,
        })))
        .await;

    Ok(ResumeOutcome {
        final_score: composite_result.final_score,
        ranking_tier: composite_result.ranking_tier,
    })
}
