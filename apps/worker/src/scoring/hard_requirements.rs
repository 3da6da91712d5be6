use crate::models::jd::JdAnalysis;
use crate::models::resume::ParsedResume;
use crate::models::score::HardRequirementsResult;
use serde_json::Value;

/// Whether a `serde_json::Value` is a "specified" requirement field, per
/// `field_has_value`: `false`/`null`/empty collections/unspecified objects
/// all mean "skip this field", not "fail it".
fn field_has_value(val: &Value) -> bool {
    match val {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Array(a) => !a.is_empty(),
        Value::Object(map) => {
            if map.get("specified").and_then(Value::as_bool).unwrap_or(false) {
                return true;
            }
            map.iter()
                .any(|(k, v)| k != "specified" && !matches!(v, Value::Null) && v != &Value::String(String::new()))
        }
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
    }
}

fn is_specified(spec: &Value) -> bool {
    spec.get("specified").and_then(Value::as_bool).unwrap_or(false)
}

fn check_experience(resume: &ParsedResume, spec: &Value) -> bool {
    if !is_specified(spec) {
        return true;
    }
    let min_years = spec.get("min").and_then(Value::as_f64).unwrap_or(0.0);
    resume.years_experience >= min_years
}

fn check_skills(resume: &ParsedResume, spec: &Value) -> bool {
    if !is_specified(spec) {
        return true;
    }
    let required_skills: Vec<String> = spec
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if required_skills.is_empty() {
        return true;
    }

    let mut resume_skills: Vec<String> = Vec::new();
    for vals in resume.canonical_skills.values() {
        resume_skills.extend(vals.iter().map(|s| s.to_lowercase().trim().to_string()));
    }
    for inf in &resume.inferred_skills {
        resume_skills.push(inf.skill.to_lowercase().trim().to_string());
    }
    for sp in &resume.skill_proficiency {
        resume_skills.push(sp.skill.to_lowercase().trim().to_string());
    }

    required_skills.iter().all(|req| {
        let req_norm = req.to_lowercase();
        let req_norm = req_norm.trim();
        resume_skills
            .iter()
            .any(|skill| req_norm.contains(skill.as_str()) || skill.contains(req_norm))
    })
}

fn check_education(resume: &ParsedResume, spec: &Value) -> bool {
    if !is_specified(spec) {
        return true;
    }
    let required_ed = spec
        .get("required")
        .and_then(Value::as_str)
        .or_else(|| spec.get("minimum").and_then(Value::as_str))
        .unwrap_or("");
    if required_ed.is_empty() {
        return true;
    }
    if resume.education.is_empty() {
        return false;
    }
    let req_lower = required_ed.to_lowercase();
    resume.education.iter().any(|edu| {
        let degree = edu.degree.to_lowercase();
        req_lower.contains(&degree) || degree.contains(&req_lower)
    })
}

fn check_location(resume: &ParsedResume, spec: &Value) -> bool {
    if !is_specified(spec) {
        return true;
    }
    let required_loc = spec.get("required").and_then(Value::as_str).unwrap_or("");
    if required_loc.is_empty() {
        return true;
    }
    let required_lower = required_loc.to_lowercase();
    if matches!(required_lower.as_str(), "any" | "anywhere" | "flexible") {
        return true;
    }
    let candidate_loc = resume.location.to_lowercase();
    if candidate_loc.is_empty() {
        return false;
    }
    if required_lower.contains("remote") && candidate_loc.contains("remote") {
        return true;
    }
    required_lower.contains(&candidate_loc) || candidate_loc.contains(&required_lower)
}

/// Dispatches a single named requirement field to its checker. Unknown
/// field names pass by default — the mandatory-compliance schema is
/// JD-authored and may grow fields this worker doesn't yet understand.
fn check_requirement(resume: &ParsedResume, field_name: &str, field_spec: &Value) -> bool {
    match field_name {
        "experience" => check_experience(resume, field_spec),
        "hard_skills" => check_skills(resume, field_spec),
        "education" => check_education(resume, field_spec),
        "location" => check_location(resume, field_spec),
        _ => true,
    }
}

/// Evaluates every specified field in `jd.filter_requirements.mandatory_compliances.structured`
/// against the resume. A JD with no mandatory requirements (or only
/// unspecified fields) passes trivially with a compliance score of 1.0.
pub fn check_hard_requirements(resume: &ParsedResume, jd: &JdAnalysis) -> HardRequirementsResult {
    let structured = &jd.filter_requirements.mandatory_compliances.structured;
    if structured.is_empty() {
        return HardRequirementsResult {
            all_requirements_met: true,
            overall_compliance_score: 1.0,
            requirements_met: Vec::new(),
            requirements_missing: Vec::new(),
            filter_reason: None,
        };
    }

    let mut requirements_met = Vec::new();
    let mut requirements_missing = Vec::new();
    let mut filter_reasons = Vec::new();

    for (field_name, field_spec) in structured {
        if !field_has_value(field_spec) {
            continue;
        }
        if check_requirement(resume, field_name, field_spec) {
            requirements_met.push(field_name.clone());
        } else {
            requirements_missing.push(field_name.clone());
            filter_reasons.push(format!("{field_name}: requirement not met"));
        }
    }

    let total = requirements_met.len() + requirements_missing.len();
    let (compliance_score, meets_all) = if total == 0 {
        (1.0, true)
    } else {
        (
            requirements_met.len() as f64 / total as f64,
            requirements_missing.is_empty(),
        )
    };

    let filter_reason = if !meets_all && !filter_reasons.is_empty() {
        Some(filter_reasons.into_iter().take(3).collect::<Vec<_>>().join("; "))
    } else {
        None
    };

    HardRequirementsResult {
        all_requirements_met: meets_all,
        overall_compliance_score: compliance_score,
        requirements_met,
        requirements_missing,
        filter_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resume_with_experience(years: f64) -> ParsedResume {
        ParsedResume {
            years_experience: years,
            ..Default::default()
        }
    }

    #[test]
    fn no_mandatory_compliances_passes_trivially() {
        let jd = JdAnalysis::default();
        let result = check_hard_requirements(&resume_with_experience(0.0), &jd);
        assert!(result.all_requirements_met);
        assert_eq!(result.overall_compliance_score, 1.0);
    }

    #[test]
    fn unspecified_fields_are_skipped_not_failed() {
        let mut jd = JdAnalysis::default();
        jd.filter_requirements
            .mandatory_compliances
            .structured
            .insert("experience".to_string(), json!({"specified": false, "min": 10}));
        let result = check_hard_requirements(&resume_with_experience(0.0), &jd);
        assert!(result.all_requirements_met);
        assert_eq!(result.overall_compliance_score, 1.0);
    }

    #[test]
    fn experience_requirement_fails_when_below_minimum() {
        let mut jd = JdAnalysis::default();
        jd.filter_requirements
            .mandatory_compliances
            .structured
            .insert("experience".to_string(), json!({"specified": true, "min": 5.0}));
        let result = check_hard_requirements(&resume_with_experience(2.0), &jd);
        assert!(!result.all_requirements_met);
        assert_eq!(result.requirements_missing, vec!["experience".to_string()]);
    }

    #[test]
    fn unknown_requirement_field_passes_by_default() {
        let mut jd = JdAnalysis::default();
        jd.filter_requirements.mandatory_compliances.structured.insert(
            "visa_sponsorship".to_string(),
            json!({"specified": true, "required": true}),
        );
        let result = check_hard_requirements(&resume_with_experience(0.0), &jd);
        assert!(result.all_requirements_met);
        assert_eq!(result.requirements_met, vec!["visa_sponsorship".to_string()]);
    }

    #[test]
    fn location_any_always_passes() {
        let mut jd = JdAnalysis::default();
        jd.filter_requirements.mandatory_compliances.structured.insert(
            "location".to_string(),
            json!({"specified": true, "required": "Any"}),
        );
        let result = check_hard_requirements(&resume_with_experience(0.0), &jd);
        assert!(result.all_requirements_met);
    }

    #[test]
    fn location_remote_matches_remote_candidate() {
        let mut jd = JdAnalysis::default();
        jd.filter_requirements.mandatory_compliances.structured.insert(
            "location".to_string(),
            json!({"specified": true, "required": "Remote - US"}),
        );
        let mut resume = resume_with_experience(0.0);
        resume.location = "Remote, India".to_string();
        let result = check_hard_requirements(&resume, &jd);
        assert!(result.all_requirements_met);
    }

    #[test]
    fn skills_requirement_matches_substring_either_direction() {
        let mut jd = JdAnalysis::default();
        jd.filter_requirements.mandatory_compliances.structured.insert(
            "hard_skills".to_string(),
            json!({"specified": true, "required": ["kubernetes"]}),
        );
        let mut resume = resume_with_experience(0.0);
        resume
            .canonical_skills
            .insert("infra".to_string(), vec!["Kubernetes (k8s)".to_string()]);
        let result = check_hard_requirements(&resume, &jd);
        assert!(result.all_requirements_met);
    }
}
