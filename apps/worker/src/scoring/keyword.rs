use crate::models::jd::JdAnalysis;
use crate::models::resume::ParsedResume;
use crate::models::score::KeywordScoreResult;
use std::collections::{HashMap, HashSet};

/// Component weights for the composite keyword score. JDs may override any
/// subset via `jd_analysis.weighting`; unspecified keys keep the default.
pub const DEFAULT_WEIGHTS: &[(&str, f64)] = &[
    ("required_skills", 0.18),
    ("preferred_skills", 0.08),
    ("weighted_keywords", 0.15),
    ("experience_keywords", 0.25),
    ("domain_relevance", 0.10),
    ("technical_depth", 0.10),
    ("project_metrics", 0.09),
    ("responsibilities", 0.03),
    ("education", 0.02),
];

/// Verb/action weight table driving the experience-keyword score. Longer
/// substrings are not preferred over shorter ones; matching is plain
/// substring containment against the joined, lower-cased experience text.
pub const EXPERIENCE_KEYWORD_WEIGHTS: &[(&str, f64)] = &[
    ("lead", 4.0),
    ("led", 4.0),
    ("manager", 4.0),
    ("managed", 4.0),
    ("architect", 4.0),
    ("architected", 4.0),
    ("designed", 3.6),
    ("design", 3.6),
    ("owned", 3.6),
    ("implemented", 3.2),
    ("built", 3.6),
    ("scaled", 3.4),
    ("scale", 3.4),
    ("optimized", 3.2),
    ("deployed", 3.2),
    ("productionized", 3.6),
    ("mentored", 2.8),
    ("coach", 2.8),
    ("contributed", 2.4),
    ("contributed to", 2.4),
    ("improved", 3.0),
    ("reduced", 3.0),
    ("increased", 3.0),
    ("automated", 3.2),
    ("orchestrated", 3.4),
];

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Collected, lower-cased JD keyword lists/maps grouped by source category.
pub struct JdKeywords {
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub weighted_keywords: HashMap<String, f64>,
    pub domain_tags: Vec<String>,
    pub responsibilities: Vec<String>,
    pub education: Vec<String>,
}

pub fn collect_jd_keywords(jd: &JdAnalysis) -> JdKeywords {
    let mut education: Vec<String> = jd.education_requirements.iter().map(|s| norm(s)).collect();
    education.extend(jd.certifications_required.iter().map(|s| norm(s)));

    JdKeywords {
        required_skills: jd.required_skills.iter().map(|s| norm(s)).collect(),
        preferred_skills: jd.preferred_skills.iter().map(|s| norm(s)).collect(),
        weighted_keywords: jd
            .keywords_weighted
            .iter()
            .map(|(k, v)| (norm(k), *v))
            .collect(),
        domain_tags: jd.domain_tags.iter().map(|s| norm(s)).collect(),
        responsibilities: jd.responsibilities.iter().map(|s| norm(s)).collect(),
        education,
    }
}

/// Every searchable token a resume contributes: canonical/inferred/proficiency
/// skills, project tech keywords, experience keywords, profile/ATS boost
/// lines (both as whole phrases and individual words), and domain tags.
pub fn collect_resume_tokens(resume: &ParsedResume) -> HashSet<String> {
    let mut tokens = HashSet::new();

    for vals in resume.canonical_skills.values() {
        tokens.extend(vals.iter().map(|v| norm(v)));
    }
    for inf in &resume.inferred_skills {
        if inf.confidence >= 0.6 {
            tokens.insert(norm(&inf.skill));
        }
    }
    for sp in &resume.skill_proficiency {
        tokens.insert(norm(&sp.skill));
    }
    for proj in &resume.projects {
        tokens.extend(proj.tech_keywords.iter().map(|v| norm(v)));
        tokens.extend(proj.primary_skills.iter().map(|v| norm(v)));
    }
    for exp in &resume.experience_entries {
        tokens.extend(exp.primary_tech.iter().map(|v| norm(v)));
        tokens.extend(exp.responsibilities_keywords.iter().map(|v| norm(v)));
    }
    for phrase in [
        resume.profile_keywords_line.as_deref().unwrap_or(""),
        resume.ats_boost_line.as_deref().unwrap_or(""),
    ] {
        let replaced = phrase.replace('/', ",").replace(';', ",");
        tokens.extend(
            replaced
                .split(',')
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(norm),
        );
        tokens.extend(phrase.split_whitespace().map(norm));
    }
    tokens.extend(resume.domain_tags.iter().map(|v| norm(v)));

    tokens
}

/// Set-overlap ratio of `jd_list` found in `resume_tokens`. An empty JD list
/// defaults to 0.5 (neutral — absence of a signal is not evidence against
/// the candidate).
pub fn score_overlap(jd_list: &[String], resume_tokens: &HashSet<String>) -> f64 {
    if jd_list.is_empty() {
        return 0.5;
    }
    let matched = jd_list.iter().filter(|x| resume_tokens.contains(*x)).count();
    matched as f64 / jd_list.len() as f64
}

/// Weighted variant of [`score_overlap`] for the `keywords_weighted` JD map.
pub fn score_weighted_keywords(jd_kw: &HashMap<String, f64>, resume_tokens: &HashSet<String>) -> f64 {
    if jd_kw.is_empty() {
        return 0.5;
    }
    let total: f64 = jd_kw.values().sum();
    if total <= 0.0 {
        return 0.5;
    }
    let matched: f64 = jd_kw
        .iter()
        .filter(|(kw, _)| resume_tokens.contains(*kw))
        .map(|(_, w)| w)
        .sum();
    matched / total
}

/// Fixed-vocabulary verb score over experience responsibilities/achievements
/// and the profile/ATS boost lines.
pub fn score_experience_keywords(resume: &ParsedResume) -> f64 {
    let mut text_sources: Vec<&str> = Vec::new();
    for exp in &resume.experience_entries {
        text_sources.extend(exp.responsibilities_keywords.iter().map(|s| s.as_str()));
        text_sources.extend(exp.achievements.iter().map(|s| s.as_str()));
    }
    text_sources.push(resume.profile_keywords_line.as_deref().unwrap_or(""));
    text_sources.push(resume.ats_boost_line.as_deref().unwrap_or(""));

    let joined: String = text_sources
        .iter()
        .map(|t| norm(t))
        .collect::<Vec<_>>()
        .join(" ");

    let matched: f64 = EXPERIENCE_KEYWORD_WEIGHTS
        .iter()
        .filter(|(kw, _)| joined.contains(kw))
        .map(|(_, w)| w)
        .sum();
    let max_possible: f64 = EXPERIENCE_KEYWORD_WEIGHTS.iter().map(|(_, w)| w).sum();

    if max_possible > 0.0 {
        matched / max_possible
    } else {
        0.0
    }
}

/// The three-factor project-aggregate variant kept for parity with the
/// legacy keyword-mode path. Not wired into [`crate::scoring::composite`];
/// see the project-aggregate decision in DESIGN.md.
pub fn project_score_three_factor(resume: &ParsedResume) -> f64 {
    if resume.projects.is_empty() {
        return 0.5;
    }
    let scores: Vec<f64> = resume
        .projects
        .iter()
        .map(|p| {
            let vals = [
                p.metrics.skill_relevance,
                p.metrics.domain_relevance,
                p.metrics.execution_quality,
            ];
            vals.iter().sum::<f64>() / vals.len() as f64
        })
        .collect();
    if scores.is_empty() {
        0.5
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Weighted sum of the eight keyword sub-scores (project_metrics uses the
/// caller-supplied project-aggregate score, per spec — not the three-factor
/// variant above) against `DEFAULT_WEIGHTS`, overridden by any keys present
/// in `jd.weighting`.
pub fn composite_keyword_score(
    jd: &JdAnalysis,
    resume: &ParsedResume,
    project_aggregate: f64,
) -> KeywordScoreResult {
    let keywords = collect_jd_keywords(jd);
    let tokens = collect_resume_tokens(resume);

    let mut weights: HashMap<&str, f64> = DEFAULT_WEIGHTS.iter().cloned().collect();
    for (k, v) in &jd.weighting {
        if let Some(slot) = weights.get_mut(k.as_str()) {
            *slot = *v;
        }
    }

    let required = score_overlap(&keywords.required_skills, &tokens);
    let preferred = score_overlap(&keywords.preferred_skills, &tokens);
    let weighted_kw = score_weighted_keywords(&keywords.weighted_keywords, &tokens);
    let domain = score_overlap(&keywords.domain_tags, &tokens);
    let responsibilities = score_overlap(&keywords.responsibilities, &tokens);
    let education = score_overlap(&keywords.education, &tokens);
    let experience = score_experience_keywords(resume);

    let final_score = required * weights["required_skills"]
        + preferred * weights["preferred_skills"]
        + weighted_kw * weights["weighted_keywords"]
        + experience * weights["experience_keywords"]
        + domain * weights["domain_relevance"]
        + project_aggregate * weights["project_metrics"]
        + responsibilities * weights["responsibilities"]
        + education * weights["education"];

    let required_count = keywords.required_skills.len().max(1) as f64;
    let required_matched = keywords
        .required_skills
        .iter()
        .filter(|x| tokens.contains(*x))
        .count() as f64;

    KeywordScoreResult {
        overall_score: final_score,
        coverage_percentage: (required_matched / required_count) * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_jd() -> JdAnalysis {
        JdAnalysis::default()
    }

    fn empty_resume() -> ParsedResume {
        ParsedResume::default()
    }

    #[test]
    fn overlap_defaults_to_half_for_empty_jd_list() {
        let tokens = HashSet::new();
        assert_eq!(score_overlap(&[], &tokens), 0.5);
    }

    #[test]
    fn overlap_counts_exact_matches() {
        let jd_list = vec!["rust".to_string(), "kubernetes".to_string()];
        let mut tokens = HashSet::new();
        tokens.insert("rust".to_string());
        assert_eq!(score_overlap(&jd_list, &tokens), 0.5);
    }

    #[test]
    fn weighted_keywords_defaults_to_half_when_empty() {
        let tokens = HashSet::new();
        assert_eq!(score_weighted_keywords(&HashMap::new(), &tokens), 0.5);
    }

    #[test]
    fn weighted_keywords_sums_matched_weight_fraction() {
        let mut jd_kw = HashMap::new();
        jd_kw.insert("rust".to_string(), 3.0);
        jd_kw.insert("cobol".to_string(), 1.0);
        let mut tokens = HashSet::new();
        tokens.insert("rust".to_string());
        assert_eq!(score_weighted_keywords(&jd_kw, &tokens), 0.75);
    }

    #[test]
    fn experience_keywords_scores_zero_with_no_signal() {
        assert_eq!(score_experience_keywords(&empty_resume()), 0.0);
    }

    #[test]
    fn experience_keywords_rewards_leadership_verbs() {
        let mut resume = empty_resume();
        resume.profile_keywords_line = Some("led the platform migration".to_string());
        let score = score_experience_keywords(&resume);
        assert!(score > 0.0);
    }

    #[test]
    fn project_three_factor_defaults_to_half_with_no_projects() {
        assert_eq!(project_score_three_factor(&empty_resume()), 0.5);
    }

    #[test]
    fn composite_keyword_score_combines_all_components() {
        let jd = empty_jd();
        let resume = empty_resume();
        let result = composite_keyword_score(&jd, &resume, 0.5);
        // every sub-score defaults to 0.5 (empty lists) except experience (0.0)
        // and project_metrics (caller-supplied 0.5); weights sum to 1.0.
        let expected = 0.5 * (0.18 + 0.08 + 0.15 + 0.10 + 0.09 + 0.03 + 0.02);
        assert!((result.overall_score - expected).abs() < 1e-9);
    }

    #[test]
    fn composite_keyword_score_honors_jd_weighting_overrides() {
        let mut jd = empty_jd();
        jd.weighting.insert("required_skills".to_string(), 1.0);
        jd.required_skills = vec!["rust".to_string()];
        let mut resume = empty_resume();
        resume
            .canonical_skills
            .insert("languages".to_string(), vec!["rust".to_string()]);
        let result = composite_keyword_score(&jd, &resume, 0.0);
        let expected = 1.0 * 1.0 + 0.5 * (0.08 + 0.15 + 0.10 + 0.03 + 0.02);
        assert!((result.overall_score - expected).abs() < 1e-9);
    }
}
