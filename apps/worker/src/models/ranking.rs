use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row of `GET /updates/scores/{job_id}`, the cohort used both for
/// cohort-wide normalisation and as re-rank batch input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub candidate_id: String,
    pub name: String,
    pub group_id: String,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub project_aggregate: f64,
    pub final_score: f64,
    pub hard_requirements_met: bool,
}

/// Compact candidate summary sent to the rerank LLM call — field names
/// intentionally abbreviated (`p`/`k`/`s`/`f`) to minimise tokens, matching
/// the legacy ranking processor's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: String,
    pub n: String,
    pub sc: ScoreAbbrev,
    pub exp: Option<f64>,
    pub loc: String,
    pub role: String,
    pub sk: Vec<String>,
    pub pj: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreAbbrev {
    pub p: f64,
    pub k: f64,
    pub s: f64,
    pub f: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub n: String,
    pub tech: String,
    pub score: f64,
}

/// One ranking fan-out unit per spec §4.E — a batch of score result ids
/// plus the ranking criteria shared across all batches of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingBatchJob {
    pub job_id: String,
    pub batch_index: u32,
    pub total_batches: u32,
    pub score_result_ids: Vec<String>,
    pub ranking_criteria: RankingCriteria,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingCriteria {
    #[serde(default)]
    pub enable_llm_rerank: bool,
    #[serde(default)]
    pub filter_requirements: serde_json::Value,
    #[serde(default)]
    pub specified_fields: HashSet<String>,
}

/// LLM-produced re-rank row, validated against `RankingCriteria::specified_fields`
/// before being trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate_id: String,
    pub re_rank_score: f64,
    pub meets_requirements: bool,
    #[serde(default)]
    pub requirements_met: Vec<String>,
    #[serde(default)]
    pub requirements_missing: Vec<String>,
}

impl RankedCandidate {
    /// Defense-in-depth filter against LLM hallucination of requirement
    /// types outside what the JD actually specified.
    pub fn filtered_to_allowed_fields(mut self, allowed: &HashSet<String>) -> Self {
        if !allowed.is_empty() {
            self.requirements_met.retain(|r| allowed.contains(r));
            self.requirements_missing.retain(|r| allowed.contains(r));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_out_unspecified_requirement_types() {
        let allowed: HashSet<String> = ["experience".to_string()].into_iter().collect();
        let candidate = RankedCandidate {
            candidate_id: "c1".into(),
            re_rank_score: 0.9,
            meets_requirements: true,
            requirements_met: vec!["experience".into(), "location".into()],
            requirements_missing: vec!["education".into()],
        }
        .filtered_to_allowed_fields(&allowed);

        assert_eq!(candidate.requirements_met, vec!["experience".to_string()]);
        assert!(candidate.requirements_missing.is_empty());
    }
}
