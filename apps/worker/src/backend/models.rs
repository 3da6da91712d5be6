use serde::{Deserialize, Serialize};

/// Generic `{success, data, error}` envelope the backend wraps every
/// response in.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreUpdate {
    pub job_id: String,
    pub resume_id: String,
    #[serde(flatten)]
    pub score: crate::models::score::CompositeScoreResult,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JobRecord {
    pub id: String,
    pub raw_text: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResumeUpdatePayload {
    pub parsed: serde_json::Value,
}
