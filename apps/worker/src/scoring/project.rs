use crate::models::resume::ParsedResume;
use crate::models::score::ProjectScoreResult;

/// Equal-weighted (1/7 per metric) aggregate of each project's metric
/// block, averaged across all projects. This is the form the composite
/// pipeline calls — see the project-aggregate decision in DESIGN.md.
pub fn project_aggregate_score(resume: &ParsedResume) -> ProjectScoreResult {
    if resume.projects.is_empty() {
        return ProjectScoreResult { overall_score: 0.5 };
    }

    let per_project: Vec<f64> = resume
        .projects
        .iter()
        .map(|p| {
            let m = &p.metrics;
            let vals = [
                m.difficulty,
                m.novelty,
                m.skill_relevance,
                m.complexity,
                m.technical_depth,
                m.domain_relevance,
                m.execution_quality,
            ];
            vals.iter().sum::<f64>() / vals.len() as f64
        })
        .collect();

    let overall_score = per_project.iter().sum::<f64>() / per_project.len() as f64;
    ProjectScoreResult { overall_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Project, ProjectMetrics};

    #[test]
    fn defaults_to_half_with_no_projects() {
        let resume = ParsedResume::default();
        assert_eq!(project_aggregate_score(&resume).overall_score, 0.5);
    }

    #[test]
    fn averages_seven_metrics_equally() {
        let mut resume = ParsedResume::default();
        resume.projects.push(Project {
            name: None,
            approach: None,
            tech_keywords: vec![],
            primary_skills: vec![],
            metrics: ProjectMetrics {
                difficulty: 0.0,
                novelty: 0.0,
                skill_relevance: 1.0,
                complexity: 0.0,
                technical_depth: 0.0,
                domain_relevance: 1.0,
                execution_quality: 1.0,
            },
        });
        let result = project_aggregate_score(&resume);
        assert!((result.overall_score - 3.0 / 7.0).abs() < 1e-9);
    }
}
