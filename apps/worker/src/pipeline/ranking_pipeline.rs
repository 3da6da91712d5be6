/// Final-ranking stage pipeline — batches of up to 30 candidates,
/// optionally re-ranked by the LLM gateway, persisted back to the
/// backend. Mirrors `main_ranking_processor.py`'s batch processor.
use serde_json::json;

use super::stage::{PipelineContext, StageResult};
use crate::models::ranking::{
    CandidateScore, CandidateSummary, ProjectSummary, RankedCandidate, RankingBatchJob, ScoreAbbrev,
};
use crate::models::resume::ResumeRecord;
use crate::progress::{JobContext, ProgressTracker};

pub struct RankingOutcome {
    pub ranked: Vec<RankedCandidate>,
    pub avg_score: f64,
    pub meeting_requirements: usize,
}

pub async fn run(ctx: &PipelineContext, job: RankingBatchJob) -> StageResult<RankingOutcome> {
    let tracker = ProgressTracker::new(
        ctx.redis.clone(),
        job.job_id.clone(),
        JobContext::Ranking {
            job_id: job.job_id.clone(),
            batch: job.batch_index as usize,
            total: job.total_batches as usize,
        },
    );

    tracker.update(10, "fetching_scores", Some("Fetching candidate scores")).await;
    let all_candidates: Vec<CandidateScore> = ctx.backend.get(&format!("/updates/scores/{}", job.job_id)).await?;

    let batch_candidates = slice_for_batch(&all_candidates, job.batch_index, job.total_batches);

    tracker
        .update(30, "ranking", Some(&format!("Ranking {} candidates", batch_candidates.len())))
        .await;

    let ranked = if job.ranking_criteria.enable_llm_rerank {
        let mut summaries = Vec::with_capacity(batch_candidates.len());
        for candidate in batch_candidates {
            summaries.push(build_summary(ctx, candidate).await);
        }
        ctx.llm
            .rerank_batch(
                &summaries,
                &job.ranking_criteria.filter_requirements,
                &job.ranking_criteria.specified_fields,
            )
            .await?
    } else {
        basic_rank(batch_candidates)
    };

    tracker.update(80, "ranking", Some("Re-ranking complete")).await;

    let avg_score = if ranked.is_empty() {
        0.0
    } else {
        ranked.iter().map(|r| r.re_rank_score).sum::<f64>() / ranked.len() as f64
    };
    let meeting_requirements = ranked.iter().filter(|r| r.meets_requirements).count();

    tracker.update(95, "saving_results", Some("Saving ranking results")).await;
    let _: serde_json::Value = ctx
        .backend
        .post(
            "/updates/ranking",
            &json!({
                "job_id": job.job_id,
                "batch_index": job.batch_index,
                "total_batches": job.total_batches,
                "ranked_candidates": &ranked,
            }),
        )
        .await?;

    tracker
        .complete(Some(json!({
            "jobId": job.job_id,
            "batchIndex": job.batch_index,
            "totalBatches": job.total_batches,
            "rankedCandidates": ranked.len(),
            "avgScore": avg_score,
            "meetingRequirements": meeting_requirements,
        })))
        .await;

    Ok(RankingOutcome { ranked, avg_score, meeting_requirements })
}

/// Splits the full candidate list into one of `total_batches` contiguous
/// slices, matching the legacy processor's `len // total_batches` split
/// with the final batch absorbing any remainder.
fn slice_for_batch(candidates: &[CandidateScore], batch_index: u32, total_batches: u32) -> &[CandidateScore] {
    if total_batches <= 1 {
        return candidates;
    }
    let batch_size = candidates.len() / total_batches as usize;
    let start = (batch_index as usize - 1) * batch_size;
    let end = if batch_index < total_batches {
        start + batch_size
    } else {
        candidates.len()
    };
    &candidates[start.min(candidates.len())..end.min(candidates.len())]
}

/// Builds the compact rerank summary for one candidate, enriched with
/// resume data (experience, location, role, top skills/projects) when the
/// resume's `parsed_content` is available. Falls back to the abbreviated
/// scores only — matching `create_candidate_summary`'s no-resume branch —
/// when the resume fetch fails or parsing hasn't completed yet.
async fn build_summary(ctx: &PipelineContext, candidate: &CandidateScore) -> CandidateSummary {
    let sc = ScoreAbbrev {
        p: candidate.project_aggregate,
        k: candidate.keyword_score,
        s: candidate.semantic_score,
        f: candidate.final_score,
    };

    let resume: Option<ResumeRecord> = ctx
        .backend
        .get(&format!("/updates/resume/{}", candidate.candidate_id))
        .await
        .ok();

    let Some(parsed) = resume.and_then(|r| r.parsed_content) else {
        return CandidateSummary {
            id: candidate.candidate_id.clone(),
            n: candidate.name.clone(),
            sc,
            exp: None,
            loc: String::new(),
            role: String::new(),
            sk: Vec::new(),
            pj: Vec::new(),
        };
    };

    let mut skills: Vec<String> = Vec::new();
    for cat_skills in parsed.canonical_skills.values() {
        skills.extend(cat_skills.iter().take(5).cloned());
    }
    skills.truncate(10);

    let projects: Vec<ProjectSummary> = parsed
        .projects
        .iter()
        .take(3)
        .map(|p| ProjectSummary {
            n: p.name.clone().unwrap_or_default().chars().take(50).collect(),
            tech: p.tech_keywords.iter().take(5).cloned().collect::<Vec<_>>().join(", "),
            score: p.metrics.domain_relevance,
        })
        .collect();

    CandidateSummary {
        id: candidate.candidate_id.clone(),
        n: candidate.name.clone(),
        sc,
        exp: Some(parsed.years_experience),
        loc: parsed.location,
        role: parsed.role_claim,
        sk: skills,
        pj: projects,
    }
}

/// Basic score-sorted ranking used when LLM re-ranking is disabled.
fn basic_rank(candidates: &[CandidateScore]) -> Vec<RankedCandidate> {
    let mut sorted: Vec<&CandidateScore> = candidates.iter().collect();
    sorted.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));

    sorted
        .into_iter()
        .map(|c| RankedCandidate {
            candidate_id: c.candidate_id.clone(),
            re_rank_score: c.final_score,
            meets_requirements: c.hard_requirements_met,
            requirements_met: Vec::new(),
            requirements_missing: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: f64) -> CandidateScore {
        CandidateScore {
            candidate_id: id.to_string(),
            name: "Name".to_string(),
            group_id: "g".to_string(),
            keyword_score: 0.5,
            semantic_score: 0.5,
            project_aggregate: 0.5,
            final_score: score,
            hard_requirements_met: true,
        }
    }

    #[test]
    fn single_batch_returns_all_candidates() {
        let candidates = vec![candidate("a", 0.1), candidate("b", 0.2)];
        let slice = slice_for_batch(&candidates, 1, 1);
        assert_eq!(slice.len(), 2);
    }

    #[test]
    fn last_batch_absorbs_remainder() {
        let candidates: Vec<CandidateScore> = (0..5).map(|i| candidate(&i.to_string(), i as f64)).collect();
        let batch1 = slice_for_batch(&candidates, 1, 2);
        let batch2 = slice_for_batch(&candidates, 2, 2);
        assert_eq!(batch1.len(), 2);
        assert_eq!(batch2.len(), 3);
    }

    #[test]
    fn basic_rank_sorts_descending_by_final_score() {
        let candidates = vec![candidate("low", 0.2), candidate("high", 0.9)];
        let ranked = basic_rank(&candidates);
        assert_eq!(ranked[0].candidate_id, "high");
        assert_eq!(ranked[1].candidate_id, "low");
    }
}
