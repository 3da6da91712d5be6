use crate::models::jd::JdAnalysis;
use crate::models::resume::ParsedResume;
use crate::models::score::{SectionScore, SemanticScoreResult};
use std::collections::HashMap;

pub const TAU_COV: f64 = 0.65;
pub const TAU_RESUME: f64 = 0.55;
/// (coverage, depth, density) combination weights for one section's score.
pub const SECTION_COMB: (f64, f64, f64) = (0.5, 0.4, 0.1);
pub const SECTION_WEIGHTS: &[(&str, f64)] = &[
    ("skills", 0.30),
    ("projects", 0.25),
    ("responsibilities", 0.20),
    ("profile", 0.10),
    ("education", 0.05),
    ("overall", 0.10),
];
const MAX_SENT: usize = 200;

pub const SECTION_NAMES: &[&str] = &[
    "profile",
    "skills",
    "projects",
    "responsibilities",
    "education",
    "overall",
];

/// Splits free text into sentences of at least 3 words, on `.`/`!`/`?`
/// boundaries — mirrors the legacy splitter exactly, including its
/// short-fragment filter.
pub fn sentence_split(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let text = text.replace('\n', " ");
    let mut parts = Vec::new();
    let mut start = 0usize;
    let chars: Vec<char> = text.chars().collect();
    for (i, ch) in chars.iter().enumerate() {
        if matches!(ch, '.' | '!' | '?') {
            let seg: String = chars[start..=i].iter().collect::<String>().trim().to_string();
            if !seg.is_empty() {
                parts.push(seg);
            }
            start = i + 1;
        }
    }
    let tail: String = chars[start..].iter().collect::<String>().trim().to_string();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
        .into_iter()
        .filter(|p| p.split_whitespace().count() >= 3)
        .collect()
}

fn truncate(sections: &mut HashMap<&'static str, Vec<String>>) {
    for v in sections.values_mut() {
        if v.len() > MAX_SENT {
            v.truncate(MAX_SENT);
        }
    }
}

/// Builds the six named text sections from a parsed resume, ready for
/// embedding. Section membership mirrors `extract_sections_from_resume`.
pub fn extract_sections_from_resume(resume: &ParsedResume) -> HashMap<&'static str, Vec<String>> {
    let mut sections: HashMap<&'static str, Vec<String>> = SECTION_NAMES
        .iter()
        .map(|&name| (name, Vec::new()))
        .collect();

    if let Some(p) = &resume.profile_keywords_line {
        sections.get_mut("profile").unwrap().extend(sentence_split(p));
    }

    for vals in resume.canonical_skills.values() {
        sections
            .get_mut("skills")
            .unwrap()
            .extend(vals.iter().filter(|v| !v.is_empty()).map(|v| v.trim().to_string()));
    }
    for inf in &resume.inferred_skills {
        if inf.confidence >= 0.6 {
            sections.get_mut("skills").unwrap().push(inf.skill.trim().to_string());
        }
    }

    for proj in &resume.projects {
        if let Some(name) = &proj.name {
            sections.get_mut("projects").unwrap().extend(sentence_split(name));
        }
        if let Some(approach) = &proj.approach {
            sections.get_mut("projects").unwrap().extend(sentence_split(approach));
        }
        sections
            .get_mut("projects")
            .unwrap()
            .extend(proj.tech_keywords.iter().map(|v| v.trim().to_string()));
    }

    for exp in &resume.experience_entries {
        for r in &exp.responsibilities_keywords {
            sections.get_mut("responsibilities").unwrap().extend(sentence_split(r));
        }
        for a in &exp.achievements {
            sections.get_mut("responsibilities").unwrap().extend(sentence_split(a));
        }
        for t in &exp.primary_tech {
            sections
                .get_mut("responsibilities")
                .unwrap()
                .push(t.trim().to_string());
        }
    }

    for e in &resume.education {
        if !e.degree.is_empty() {
            sections.get_mut("education").unwrap().extend(sentence_split(&e.degree));
        }
    }
    if let Some(ats) = &resume.ats_boost_line {
        if sections["education"].is_empty() && !ats.is_empty() {
            let parts: Vec<String> = ats
                .split(',')
                .map(|x| x.trim().to_string())
                .filter(|x| !x.is_empty())
                .take(20)
                .collect();
            sections.get_mut("education").unwrap().extend(parts);
        }
    }

    let mut overall_raw: Vec<String> = Vec::new();
    if let Some(p) = &resume.profile_keywords_line {
        overall_raw.push(p.clone());
    }
    for proj in &resume.projects {
        if let Some(approach) = &proj.approach {
            overall_raw.push(approach.clone());
        }
    }
    for exp in &resume.experience_entries {
        overall_raw.extend(exp.responsibilities_keywords.iter().cloned());
    }
    if let Some(ats) = &resume.ats_boost_line {
        if !ats.is_empty() {
            overall_raw.push(ats.clone());
        }
    }
    let overall: Vec<String> = overall_raw.iter().flat_map(|p| sentence_split(p)).collect();
    sections.insert("overall", overall);

    truncate(&mut sections);
    sections
}

/// Builds the six named text sections from a JD, deduplicated case-insensitively.
pub fn extract_sections_from_jd(jd: &JdAnalysis, role_title: Option<&str>) -> HashMap<&'static str, Vec<String>> {
    let mut sections: HashMap<&'static str, Vec<String>> = SECTION_NAMES
        .iter()
        .map(|&name| (name, Vec::new()))
        .collect();

    if let Some(title) = role_title {
        sections.get_mut("profile").unwrap().extend(sentence_split(title));
    }
    if let Some(overall) = &jd.embedding_hints.overall_embed {
        sections.get_mut("overall").unwrap().extend(sentence_split(overall));
    }
    for r in &jd.responsibilities {
        sections.get_mut("responsibilities").unwrap().extend(sentence_split(r));
    }
    sections
        .get_mut("skills")
        .unwrap()
        .extend(jd.required_skills.iter().map(|s| s.trim().to_string()));
    sections
        .get_mut("skills")
        .unwrap()
        .extend(jd.preferred_skills.iter().map(|s| s.trim().to_string()));
    if let Some(projects) = &jd.embedding_hints.projects_embed {
        sections.get_mut("projects").unwrap().extend(sentence_split(projects));
    }
    sections
        .get_mut("education")
        .unwrap()
        .extend(jd.certifications_required.iter().map(|s| s.trim().to_string()));
    sections
        .get_mut("education")
        .unwrap()
        .extend(jd.education_requirements.iter().map(|s| s.trim().to_string()));
    if sections["skills"].is_empty() {
        sections
            .get_mut("skills")
            .unwrap()
            .extend(jd.keywords_flat.iter().map(|s| s.trim().to_string()));
    }

    for v in sections.values_mut() {
        let mut seen = std::collections::HashSet::new();
        v.retain(|s| seen.insert(s.to_lowercase()));
    }

    sections
}

/// L2-normalised embedding vectors for one section, row-major.
pub type EmbeddingMatrix = Vec<Vec<f32>>;

fn cosine_matrix(jd: &EmbeddingMatrix, resume: &EmbeddingMatrix) -> Vec<Vec<f32>> {
    jd.iter()
        .map(|jd_row| {
            resume
                .iter()
                .map(|r_row| jd_row.iter().zip(r_row).map(|(a, b)| a * b).sum::<f32>())
                .collect()
        })
        .collect()
}

/// Coverage/depth/density section score from JD and resume embedding
/// matrices for one section. Returns `(section_score, coverage, depth)`.
pub fn compute_section_score(jd: &EmbeddingMatrix, resume: &EmbeddingMatrix) -> (f64, f64, f64) {
    if jd.is_empty() {
        return (0.5, 0.0, 0.0);
    }
    if resume.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let sims = cosine_matrix(jd, resume);

    let max_per_jd: Vec<f32> = sims.iter().map(|row| row.iter().cloned().fold(f32::MIN, f32::max)).collect();
    let coverage = max_per_jd.iter().filter(|&&v| v as f64 >= TAU_COV).count() as f64 / max_per_jd.len() as f64;
    let depth = max_per_jd.iter().map(|&v| v as f64).sum::<f64>() / max_per_jd.len() as f64;

    let n_resume = resume.len();
    let max_per_resume: Vec<f32> = (0..n_resume)
        .map(|j| sims.iter().map(|row| row[j]).fold(f32::MIN, f32::max))
        .collect();
    let density = max_per_resume.iter().filter(|&&v| v as f64 >= TAU_RESUME).count() as f64
        / max_per_resume.len().max(1) as f64;

    let section_score = SECTION_COMB.0 * coverage + SECTION_COMB.1 * depth + SECTION_COMB.2 * density;
    (section_score, coverage, depth)
}

/// Combines per-section scores into the overall semantic score using
/// `SECTION_WEIGHTS`. `embeddings` maps section name to `(jd_matrix, resume_matrix)`.
pub fn semantic_section_score(
    embeddings: &HashMap<&'static str, (EmbeddingMatrix, EmbeddingMatrix)>,
) -> SemanticScoreResult {
    let mut total = 0.0;
    let mut section_scores = HashMap::new();

    for (section, weight) in SECTION_WEIGHTS {
        let (score, coverage, depth) = match embeddings.get(section) {
            Some((jd_mat, resume_mat)) => compute_section_score(jd_mat, resume_mat),
            None => (0.0, 0.0, 0.0),
        };
        total += score * weight;
        section_scores.insert(
            section.to_string(),
            SectionScore {
                score,
                coverage,
                depth,
            },
        );
    }

    SemanticScoreResult {
        overall_semantic_score: total,
        section_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_split_drops_short_fragments() {
        let text = "Ok. This sentence has enough words to count.";
        let result = sentence_split(text);
        assert_eq!(result.len(), 1);
        assert!(result[0].contains("enough words"));
    }

    #[test]
    fn sentence_split_handles_empty_input() {
        assert!(sentence_split("").is_empty());
    }

    #[test]
    fn section_score_defaults_half_with_no_jd_sentences() {
        let (score, cov, depth) = compute_section_score(&vec![], &vec![vec![1.0, 0.0]]);
        assert_eq!(score, 0.5);
        assert_eq!(cov, 0.0);
        assert_eq!(depth, 0.0);
    }

    #[test]
    fn section_score_zero_with_no_resume_sentences() {
        let (score, _, _) = compute_section_score(&vec![vec![1.0, 0.0]], &vec![]);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn section_score_rewards_identical_vectors() {
        let jd = vec![vec![1.0_f32, 0.0]];
        let resume = vec![vec![1.0_f32, 0.0]];
        let (score, coverage, depth) = compute_section_score(&jd, &resume);
        assert_eq!(coverage, 1.0);
        assert!((depth - 1.0).abs() < 1e-6);
        assert!(score > 0.9);
    }

    #[test]
    fn extract_sections_from_jd_falls_back_to_keywords_flat() {
        let mut jd = JdAnalysis::default();
        jd.keywords_flat = vec!["rust".to_string()];
        let sections = extract_sections_from_jd(&jd, None);
        assert_eq!(sections["skills"], vec!["rust".to_string()]);
    }

    #[test]
    fn extract_sections_from_jd_dedupes_case_insensitively() {
        let mut jd = JdAnalysis::default();
        jd.required_skills = vec!["Rust".to_string()];
        jd.preferred_skills = vec!["rust".to_string()];
        let sections = extract_sections_from_jd(&jd, None);
        assert_eq!(sections["skills"].len(), 1);
    }
}
