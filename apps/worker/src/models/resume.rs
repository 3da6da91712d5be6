use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resume record as returned by `GET /updates/resume/{resume_id}`.
/// `parsed_content` is populated once the `ai_parse` stage has run (it is
/// written back via `PUT /updates/resume/{resume_id}` during resume
/// processing), and absent before that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub resume_id: String,
    pub group_id: Option<String>,
    pub filename: Option<String>,
    #[serde(default)]
    pub parsed_content: Option<ParsedResume>,
}

/// The AI-parsed resume shape produced by the `ai_parse` stage and consumed
/// by every scoring function downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedResume {
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub role_claim: String,
    #[serde(default)]
    pub years_experience: f64,
    #[serde(default)]
    pub canonical_skills: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub inferred_skills: Vec<InferredSkill>,
    #[serde(default)]
    pub skill_proficiency: Vec<SkillProficiency>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub experience_entries: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    pub profile_keywords_line: Option<String>,
    pub ats_boost_line: Option<String>,
    #[serde(default)]
    pub domain_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferredSkill {
    pub skill: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProficiency {
    pub skill: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: Option<String>,
    pub approach: Option<String>,
    #[serde(default)]
    pub tech_keywords: Vec<String>,
    #[serde(default)]
    pub primary_skills: Vec<String>,
    #[serde(default)]
    pub metrics: ProjectMetrics,
}

/// Seven equal-weighted metrics the project-aggregate score averages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetrics {
    #[serde(default)]
    pub difficulty: f64,
    #[serde(default)]
    pub novelty: f64,
    #[serde(default)]
    pub skill_relevance: f64,
    #[serde(default)]
    pub complexity: f64,
    #[serde(default)]
    pub technical_depth: f64,
    #[serde(default)]
    pub domain_relevance: f64,
    #[serde(default)]
    pub execution_quality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub primary_tech: Vec<String>,
    #[serde(default)]
    pub responsibilities_keywords: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration_years: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    pub field_of_study: Option<String>,
}
