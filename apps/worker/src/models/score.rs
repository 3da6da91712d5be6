use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The score record persisted via `POST /updates/score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub job_id: String,
    pub resume_id: String,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub project_score: f64,
    pub final_score: f64,
    pub hard_requirements_met: bool,
    #[serde(default)]
    pub score_breakdown: HashMap<String, f64>,
}

/// Result of the hard-requirements gate (`d_hard_requirements_checker`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardRequirementsResult {
    pub all_requirements_met: bool,
    pub overall_compliance_score: f64,
    pub requirements_met: Vec<String>,
    pub requirements_missing: Vec<String>,
    pub filter_reason: Option<String>,
}

/// Result of the project-aggregate score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectScoreResult {
    pub overall_score: f64,
}

/// Result of the weighted keyword score, keyword breakdown included for the
/// composite multiplier's `skill_coverage` input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordScoreResult {
    pub overall_score: f64,
    pub coverage_percentage: f64,
}

/// Result of the semantic section score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticScoreResult {
    pub overall_semantic_score: f64,
    pub section_scores: HashMap<String, SectionScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionScore {
    pub score: f64,
    pub coverage: f64,
    pub depth: f64,
}

/// Final composite score, tier, and the multipliers that produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositeScoreResult {
    pub final_score: f64,
    pub ranking_tier: RankingTier,
    pub experience_weight: f64,
    pub education_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankingTier {
    Excellent,
    Good,
    Average,
    BelowAverage,
    #[default]
    Poor,
}

impl RankingTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            RankingTier::Excellent
        } else if score >= 0.70 {
            RankingTier::Good
        } else if score >= 0.55 {
            RankingTier::Average
        } else if score >= 0.40 {
            RankingTier::BelowAverage
        } else {
            RankingTier::Poor
        }
    }
}
