#![allow(dead_code)]

/// System prompt fragment enforcing strict JSON-only output, shared by
/// every `parse_text` call regardless of parse kind.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Builds the rerank system prompt, injecting the JD-specified allowed
/// requirement field names so the model cannot invent new ones.
pub fn rerank_system_prompt(specified_fields_str: &str) -> String {
    format!(
        "You are a candidate re-ranker and compliance validator. Your tasks:\n\
1. VALIDATE compliance results: review programmatic compliance checks and validate/correct them based on candidate resume data\n\
2. RE-RANK candidates: rank candidates based on validated compliance + all ranking scores\n\n\
IMPORTANT CONSTRAINT:\n\
- Only return requirement types from this list: {specified_fields_str}\n\
- Do NOT return other requirement types unless explicitly listed above\n\
- If no requirements specified, return empty arrays for requirements_met and requirements_missing\n\n\
Re-ranking Rules:\n\
- Candidates meeting more requirements should rank higher\n\
- But also consider their JD alignment scores (all scores provided)\n\
- Balance requirements compliance with overall quality\n\
- Use candidate_id (not name) for identification"
    )
}

pub fn rerank_user_prompt(specified_fields_str: &str, filter_requirements_json: &str, candidates_json: &str) -> String {
    format!(
        "ALLOWED REQUIREMENT TYPES (only return these): {specified_fields_str}\n\n\
Filter Requirements:\n{filter_requirements_json}\n\n\
Candidates to Re-rank (abbreviated format, sc.p=project sc.k=keyword sc.s=semantic sc.f=final):\n{candidates_json}\n\n\
CRITICAL: in requirements_met and requirements_missing, ONLY include types from: {specified_fields_str}"
    )
}
