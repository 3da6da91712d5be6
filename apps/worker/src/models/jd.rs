use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Job description as returned by `GET /jobs/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_id: String,
    pub role_title: Option<String>,
    #[serde(default)]
    pub jd_analysis: JdAnalysis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JdAnalysis {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub keywords_weighted: HashMap<String, f64>,
    #[serde(default)]
    pub domain_tags: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub education_requirements: Vec<String>,
    #[serde(default)]
    pub certifications_required: Vec<String>,
    #[serde(default)]
    pub keywords_flat: Vec<String>,
    #[serde(default)]
    pub embedding_hints: EmbeddingHints,
    #[serde(default)]
    pub minimum_experience_years: f64,
    pub required_education: Option<String>,
    #[serde(default)]
    pub weighting: HashMap<String, f64>,
    #[serde(default)]
    pub filter_requirements: FilterRequirements,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingHints {
    pub overall_embed: Option<String>,
    pub projects_embed: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRequirements {
    #[serde(default)]
    pub mandatory_compliances: MandatoryCompliances,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MandatoryCompliances {
    #[serde(default)]
    pub structured: HashMap<String, serde_json::Value>,
}

/// A single `HR_NOTE:cat=...;type=...;impact=...;note=...` tag parsed out of a
/// domain tag string. Kept for compatibility with the legacy HR-filter tag
/// format; internal scoring never re-parses the raw string once this exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrNote {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub impact: Option<String>,
    pub note: Option<String>,
}

impl HrNote {
    /// Parses a `HR_NOTE:cat=x;type=y;impact=z;note=...` tag. Returns `None`
    /// if the tag does not start with the `HR_NOTE:` prefix.
    pub fn parse_domain_tag(tag: &str) -> Option<Self> {
        let body = tag.strip_prefix("HR_NOTE:")?;
        let mut category = None;
        let mut kind = None;
        let mut impact = None;
        let mut note = None;
        for field in body.split(';') {
            let Some((k, v)) = field.split_once('=') else {
                continue;
            };
            match k {
                "cat" => category = Some(v.to_string()),
                "type" => kind = Some(v.to_string()),
                "impact" => impact = Some(v.to_string()),
                "note" => note = Some(v.to_string()),
                _ => {}
            }
        }
        Some(HrNote {
            category,
            kind,
            impact,
            note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hr_note_tag() {
        let tag = "HR_NOTE:cat=skills;type=gap;impact=medium;note=missing k8s";
        let note = HrNote::parse_domain_tag(tag).unwrap();
        assert_eq!(note.category.as_deref(), Some("skills"));
        assert_eq!(note.kind.as_deref(), Some("gap"));
        assert_eq!(note.impact.as_deref(), Some("medium"));
        assert_eq!(note.note.as_deref(), Some("missing k8s"));
    }

    #[test]
    fn ignores_non_hr_note_tags() {
        assert!(HrNote::parse_domain_tag("rust").is_none());
    }
}
