use crate::models::jd::JdAnalysis;
use crate::models::resume::ParsedResume;
use crate::models::score::{
    CompositeScoreResult, HardRequirementsResult, KeywordScoreResult, ProjectScoreResult,
    RankingTier, SemanticScoreResult,
};

const HARD_REQUIREMENTS_FAILED_PENALTY: f64 = 0.3;

struct BaseWeights;
impl BaseWeights {
    const HARD_REQUIREMENTS: f64 = 0.25;
    const KEYWORD_MATCHING: f64 = 0.25;
    const SEMANTIC_SIMILARITY: f64 = 0.20;
    const PROJECT_RELEVANCE: f64 = 0.15;
    const EXPERIENCE_BONUS: f64 = 0.10;
    const EDUCATION_BONUS: f64 = 0.05;
}

/// Minimal education-level scoring table — longest recognised keyword wins
/// via `max`, matching the legacy scorer's "first substring match, keep the
/// best seen" behaviour.
const EDUCATION_SCORES: &[(&str, f64)] = &[
    ("phd", 1.0),
    ("doctorate", 1.0),
    ("doctoral", 1.0),
    ("masters", 0.9),
    ("master", 0.9),
    ("msc", 0.9),
    ("mba", 0.9),
    ("bachelors", 0.7),
    ("bachelor", 0.7),
    ("bsc", 0.7),
    ("btech", 0.7),
    ("be", 0.7),
    ("diploma", 0.5),
    ("associate", 0.5),
    ("certificate", 0.3),
    ("certification", 0.3),
];

const RELEVANT_FIELDS: &[&str] = &["computer", "software", "engineering", "technology", "science"];

/// Experience-based dynamic weight factor. Prefers `duration_years`, falls
/// back to a year-only parse of `start_date`/`end_date` (accepting the
/// resulting precision loss — see Open Question 4 in DESIGN.md), and
/// finally defaults to 1 year per entry when no duration signal exists.
pub fn calculate_experience_weight(experience: &[crate::models::resume::ExperienceEntry], min_experience_years: f64) -> f64 {
    if experience.is_empty() {
        return 0.1;
    }

    let mut total_experience = 0.0;
    for exp in experience {
        if let Some(duration) = exp.duration_years {
            total_experience += duration;
        } else if let (Some(start), Some(end)) = (&exp.start_date, &exp.end_date) {
            let start_year = start.get(0..4).and_then(|s| s.parse::<i32>().ok());
            let end_year = if end == "Present" {
                Some(2024)
            } else {
                end.get(0..4).and_then(|s| s.parse::<i32>().ok())
            };
            match (start_year, end_year) {
                (Some(sy), Some(ey)) => total_experience += (ey - sy).max(0) as f64,
                _ => total_experience += 1.0,
            }
        } else {
            total_experience += 1.0;
        }
    }

    if total_experience >= min_experience_years {
        1.0
    } else if total_experience >= min_experience_years * 0.5 {
        0.5 + (total_experience / min_experience_years) * 0.5
    } else {
        0.2 + (total_experience / min_experience_years.max(1.0)) * 0.3
    }
}

/// Education-based dynamic weight factor, with a +10% field-relevance bonus
/// (capped at 1.0) and a 0.3 floor.
pub fn calculate_education_weight(
    education: &[crate::models::resume::EducationEntry],
    required_education: Option<&str>,
) -> f64 {
    if education.is_empty() {
        return 0.3;
    }

    let mut best = 0.0_f64;
    for edu in education {
        let degree = edu.degree.to_lowercase();
        for (level, score) in EDUCATION_SCORES {
            if degree.contains(level) {
                best = best.max(*score);
                break;
            }
        }

        if let Some(required) = required_education {
            if best > 0.0 {
                let field = edu.field_of_study.as_deref().unwrap_or("").to_lowercase();
                let required_lower = required.to_lowercase();
                if RELEVANT_FIELDS
                    .iter()
                    .any(|term| field.contains(term) || required_lower.contains(term))
                {
                    best = (best * 1.1).min(1.0);
                }
            }
        }
    }

    best.max(0.3)
}

fn normalize_component(score: f64, weight: f64) -> f64 {
    score.clamp(0.0, 1.0) * weight
}

/// Combines every scoring-kernel output into the final composite score,
/// tier, and the multipliers applied along the way.
pub fn calculate_composite_score(
    hard_requirements: &HardRequirementsResult,
    project: &ProjectScoreResult,
    keyword: &KeywordScoreResult,
    semantic: &SemanticScoreResult,
    resume: &ParsedResume,
    jd: &JdAnalysis,
) -> CompositeScoreResult {
    let experience_weight = calculate_experience_weight(&resume.experience_entries, jd.minimum_experience_years);
    let education_weight = calculate_education_weight(&resume.education, jd.required_education.as_deref());

    let penalty_factor = if hard_requirements.all_requirements_met {
        1.0
    } else {
        HARD_REQUIREMENTS_FAILED_PENALTY
    };

    let raw_score = normalize_component(hard_requirements.overall_compliance_score, BaseWeights::HARD_REQUIREMENTS)
        + normalize_component(keyword.overall_score, BaseWeights::KEYWORD_MATCHING)
        + normalize_component(semantic.overall_semantic_score, BaseWeights::SEMANTIC_SIMILARITY)
        + normalize_component(project.overall_score, BaseWeights::PROJECT_RELEVANCE)
        + normalize_component(experience_weight, BaseWeights::EXPERIENCE_BONUS)
        + normalize_component(education_weight, BaseWeights::EDUCATION_BONUS);

    let final_score_before_multipliers = raw_score * penalty_factor;

    let experience_multiplier = (1.0 + (experience_weight - 0.5) * 0.4).min(1.2);
    let education_multiplier = (1.0 + (education_weight - 0.5) * 0.2).min(1.1);

    let enhanced_score = final_score_before_multipliers * experience_multiplier * education_multiplier;
    let final_score = enhanced_score.min(1.0);

    CompositeScoreResult {
        final_score,
        ranking_tier: RankingTier::from_score(final_score),
        experience_weight,
        education_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::ExperienceEntry;

    fn passing_hard_requirements() -> HardRequirementsResult {
        HardRequirementsResult {
            all_requirements_met: true,
            overall_compliance_score: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn no_experience_gives_minimal_weight() {
        assert_eq!(calculate_experience_weight(&[], 5.0), 0.1);
    }

    #[test]
    fn meeting_minimum_gives_full_weight() {
        let entries = vec![ExperienceEntry {
            primary_tech: vec![],
            responsibilities_keywords: vec![],
            achievements: vec![],
            start_date: None,
            end_date: None,
            duration_years: Some(6.0),
        }];
        assert_eq!(calculate_experience_weight(&entries, 5.0), 1.0);
    }

    #[test]
    fn year_only_date_parsing_ignores_month_precision() {
        let entries = vec![ExperienceEntry {
            primary_tech: vec![],
            responsibilities_keywords: vec![],
            achievements: vec![],
            start_date: Some("2019-11-01".to_string()),
            end_date: Some("2024-01-01".to_string()),
            duration_years: None,
        }];
        // 2024 - 2019 = 5 years, independent of month/day.
        assert_eq!(calculate_experience_weight(&entries, 5.0), 1.0);
    }

    #[test]
    fn education_weight_floors_at_0_3() {
        assert_eq!(calculate_education_weight(&[], None), 0.3);
    }

    #[test]
    fn phd_scores_full_education_weight() {
        let entries = vec![crate::models::resume::EducationEntry {
            degree: "PhD in Computer Science".to_string(),
            field_of_study: None,
        }];
        assert_eq!(calculate_education_weight(&entries, None), 1.0);
    }

    #[test]
    fn hard_requirements_failure_applies_penalty() {
        let failing = HardRequirementsResult {
            all_requirements_met: false,
            overall_compliance_score: 0.0,
            ..Default::default()
        };
        let passing_result = calculate_composite_score(
            &passing_hard_requirements(),
            &ProjectScoreResult { overall_score: 0.8 },
            &KeywordScoreResult {
                overall_score: 0.8,
                coverage_percentage: 80.0,
            },
            &SemanticScoreResult {
                overall_semantic_score: 0.8,
                section_scores: Default::default(),
            },
            &ParsedResume::default(),
            &JdAnalysis::default(),
        );
        let failing_result = calculate_composite_score(
            &failing,
            &ProjectScoreResult { overall_score: 0.8 },
            &KeywordScoreResult {
                overall_score: 0.8,
                coverage_percentage: 80.0,
            },
            &SemanticScoreResult {
                overall_semantic_score: 0.8,
                section_scores: Default::default(),
            },
            &ParsedResume::default(),
            &JdAnalysis::default(),
        );
        assert!(failing_result.final_score < passing_result.final_score);
    }

    #[test]
    fn final_score_never_exceeds_one() {
        let result = calculate_composite_score(
            &passing_hard_requirements(),
            &ProjectScoreResult { overall_score: 1.0 },
            &KeywordScoreResult {
                overall_score: 1.0,
                coverage_percentage: 100.0,
            },
            &SemanticScoreResult {
                overall_semantic_score: 1.0,
                section_scores: Default::default(),
            },
            &ParsedResume::default(),
            &JdAnalysis::default(),
        );
        assert!(result.final_score <= 1.0);
    }

    #[test]
    fn ranking_tier_bands() {
        assert_eq!(RankingTier::from_score(0.9), RankingTier::Excellent);
        assert_eq!(RankingTier::from_score(0.7), RankingTier::Good);
        assert_eq!(RankingTier::from_score(0.55), RankingTier::Average);
        assert_eq!(RankingTier::from_score(0.4), RankingTier::BelowAverage);
        assert_eq!(RankingTier::from_score(0.1), RankingTier::Poor);
    }
}
