/// LLM Gateway — the single point of entry for all chat, parse, and
/// embedding calls in the matching pipeline.
///
/// ARCHITECTURAL RULE: No other module may call an LLM-backed HTTP
/// endpoint directly. All model interactions go through this module.
use anyhow::Result;
use rand::Rng;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod circuit_breaker;
pub mod embed_cache;
pub mod prompts;

use crate::errors::PipelineError;
use circuit_breaker::CircuitBreaker;
use embed_cache::EmbedCache;

const CHAT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const EMBEDDINGS_API_URL: &str = "https://api.openai.com/v1/embeddings";

pub const CHAT_MODEL: &str = "gpt-4o-mini";
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const EMBEDDING_DIM: usize = 1536;

const CHAT_MAX_RETRIES: u32 = 3;
const EMBED_MAX_RETRIES: u32 = 5;
const EMBED_BATCH_SIZE: usize = 128;
const EMBED_BACKOFF_BASE: f64 = 1.4;
const RERANK_BATCH_SIZE: usize = 30;

const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
const CIRCUIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// The kind of content being parsed, used to pick the system prompt and
/// target schema for `parse_text`.
#[derive(Debug, Clone, Copy)]
pub enum ParseKind {
    JobDescription,
    Resume,
}

impl ParseKind {
    fn system_prompt(self) -> String {
        let role = match self {
            ParseKind::JobDescription => "job description",
            ParseKind::Resume => "resume",
        };
        format!(
            "{}\nExtract structured data from the following {} text.",
            prompts::JSON_ONLY_SYSTEM,
            role
        )
    }
}

/// Gateway over the chat-completions and embeddings APIs, with retry,
/// circuit breaking, and an on-disk embedding cache shared across calls.
pub struct LlmGateway {
    client: Client,
    api_key: String,
    circuit: Arc<CircuitBreaker>,
    embed_cache: Arc<EmbedCache>,
}

impl LlmGateway {
    pub fn new(api_key: String, embed_cache_path: impl AsRef<std::path::Path>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            circuit: Arc::new(CircuitBreaker::new(CIRCUIT_FAILURE_THRESHOLD, CIRCUIT_TIMEOUT)),
            embed_cache: Arc::new(EmbedCache::open(embed_cache_path)),
        }
    }

    /// Parses free text into a typed record at temperature 0.0, with a
    /// one-shot JSON repair pass (trim to the last balanced quote) if the
    /// first parse attempt fails.
    pub async fn parse_text<T: DeserializeOwned>(&self, kind: ParseKind, text: &str) -> Result<T, PipelineError> {
        self.circuit.check()?;

        let system = kind.system_prompt();
        let result = self.chat_call(&system, text, 0.0).await;

        match result {
            Ok(raw) => {
                self.circuit.record_success();
                parse_with_repair(&raw)
            }
            Err(e) => {
                self.circuit.record_failure();
                Err(e)
            }
        }
    }

    async fn chat_call(&self, system: &str, user: &str, temperature: f64) -> Result<String, PipelineError> {
        let request_body = ChatRequest {
            model: CHAT_MODEL,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature,
        };

        let mut last_error: Option<PipelineError> = None;

        for attempt in 0..CHAT_MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!("chat call attempt {attempt} failed, retrying after {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(CHAT_API_URL)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(PipelineError::UpstreamTransient(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(PipelineError::UpstreamTransient(format!("{status}: {body}")));
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorBody>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(PipelineError::Api {
                    endpoint: CHAT_API_URL.to_string(),
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| PipelineError::Parse(e.to_string()))?;
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| PipelineError::Parse("empty LLM response".to_string()))?;

            debug!("chat call succeeded on attempt {attempt}");
            return Ok(content);
        }

        Err(last_error.unwrap_or_else(|| PipelineError::UpstreamTransient("chat call exhausted retries".to_string())))
    }

    /// Embeds a batch of texts, splitting into ≤128-item API calls,
    /// backed by the on-disk content-hash cache. Returns L2-normalised
    /// vectors in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.circuit.check()?;

        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut todo_indices = Vec::new();
        let mut todo_texts = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if let Some(cached) = self.embed_cache.get(EMBEDDING_MODEL, text) {
                vectors[i] = Some(cached);
            } else {
                todo_indices.push(i);
                todo_texts.push(text.clone());
            }
        }

        for chunk_start in (0..todo_texts.len()).step_by(EMBED_BATCH_SIZE) {
            let chunk_end = (chunk_start + EMBED_BATCH_SIZE).min(todo_texts.len());
            let chunk = &todo_texts[chunk_start..chunk_end];

            let embeddings = match self.embed_api_call(chunk).await {
                Ok(e) => {
                    self.circuit.record_success();
                    e
                }
                Err(e) => {
                    self.circuit.record_failure();
                    return Err(e);
                }
            };

            for (offset, embedding) in embeddings.into_iter().enumerate() {
                let normalized = l2_normalize(embedding);
                let global_idx = todo_indices[chunk_start + offset];
                self.embed_cache.set(EMBEDDING_MODEL, &chunk[offset], normalized.clone());
                vectors[global_idx] = Some(normalized);
            }
        }

        Ok(vectors
            .into_iter()
            .map(|v| v.unwrap_or_else(|| vec![0.0; EMBEDDING_DIM]))
            .collect())
    }

    async fn embed_api_call(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut last_error: Option<PipelineError> = None;

        for attempt in 1..=EMBED_MAX_RETRIES {
            let request_body = EmbeddingsRequest {
                model: EMBEDDING_MODEL,
                input: texts,
            };

            let response = self
                .client
                .post(EMBEDDINGS_API_URL)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            match response {
                Ok(r) if r.status().is_success() => {
                    let parsed: EmbeddingsResponse = r
                        .json()
                        .await
                        .map_err(|e| PipelineError::Parse(e.to_string()))?;
                    return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
                }
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().await.unwrap_or_default();
                    last_error = Some(PipelineError::Api {
                        endpoint: EMBEDDINGS_API_URL.to_string(),
                        status: status.as_u16(),
                        message: body,
                    });
                }
                Err(e) => {
                    last_error = Some(PipelineError::UpstreamTransient(e.to_string()));
                }
            }

            if attempt < EMBED_MAX_RETRIES {
                let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
                let delay = Duration::from_secs_f64(EMBED_BACKOFF_BASE.powi(attempt as i32) + jitter);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::UpstreamTransient("embedding call exhausted retries".to_string())))
    }

    /// Reranks candidates in batches of ≤30, injecting the allowed
    /// requirement field names into the schema description and filtering
    /// the LLM's output against them as defense-in-depth.
    pub async fn rerank_batch(
        &self,
        candidates: &[crate::models::ranking::CandidateSummary],
        filter_requirements: &Value,
        specified_fields: &std::collections::HashSet<String>,
    ) -> Result<Vec<crate::models::ranking::RankedCandidate>, PipelineError> {
        self.circuit.check()?;

        let mut all_results = Vec::new();
        let mut fields_sorted: Vec<&String> = specified_fields.iter().collect();
        fields_sorted.sort();
        let specified_fields_str = if fields_sorted.is_empty() {
            "NONE (no requirements specified)".to_string()
        } else {
            fields_sorted.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        };

        for chunk in candidates.chunks(RERANK_BATCH_SIZE) {
            let system = prompts::rerank_system_prompt(&specified_fields_str);
            let filter_json = serde_json::to_string_pretty(filter_requirements)
                .map_err(|e| PipelineError::Parse(e.to_string()))?;
            let candidates_json =
                serde_json::to_string_pretty(chunk).map_err(|e| PipelineError::Parse(e.to_string()))?;
            let user = prompts::rerank_user_prompt(&specified_fields_str, &filter_json, &candidates_json);

            let raw = match self.chat_call(&system, &user, 0.3).await {
                Ok(raw) => {
                    self.circuit.record_success();
                    raw
                }
                Err(e) => {
                    self.circuit.record_failure();
                    return Err(e);
                }
            };

            let batch_results: Vec<crate::models::ranking::RankedCandidate> = parse_with_repair(&raw)?;
            all_results.extend(
                batch_results
                    .into_iter()
                    .map(|c| c.filtered_to_allowed_fields(specified_fields)),
            );
        }

        Ok(all_results)
    }

    pub fn close_embed_cache(&self) {
        self.embed_cache.close();
    }
}

fn l2_normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.into_iter().map(|v| v / norm).collect()
    } else {
        vector
    }
}

/// Parses LLM JSON output, stripping markdown fences, with one repair
/// attempt (trim to the last balanced double quote) if the first parse
/// fails — mirrors the legacy ranking processor's JSON-repair fallback,
/// generalised to every `parse_text`/`rerank_batch` call.
fn parse_with_repair<T: DeserializeOwned>(raw: &str) -> Result<T, PipelineError> {
    let text = strip_json_fences(raw);
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let quote_count = text.matches('"').count();
            if quote_count % 2 != 0 {
                if let Some(pos) = text.rfind('"') {
                    let fixed = format!("{}\"", &text[..pos]);
                    if let Ok(value) = serde_json::from_str(&fixed) {
                        return Ok(value);
                    }
                }
            }
            Err(PipelineError::Parse(first_err.to_string()))
        }
    }
}

fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped.trim_start().strip_suffix("```").map(str::trim).unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped.trim_start().strip_suffix("```").map(str::trim).unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fences() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn strips_bare_fences() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn passes_through_unfenced_json() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        key: String,
    }

    #[test]
    fn parses_clean_json() {
        let result: Sample = parse_with_repair("{\"key\": \"value\"}").unwrap();
        assert_eq!(result.key, "value");
    }

    #[test]
    fn repairs_unterminated_trailing_string() {
        let broken = "{\"key\": \"value}";
        let result: Sample = parse_with_repair(broken).unwrap();
        assert_eq!(result.key, "value");
    }

    #[test]
    fn l2_normalize_produces_unit_vector() {
        let normalized = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = normalized.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_untouched() {
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
