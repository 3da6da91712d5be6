use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub backend_api_url: String,
    pub backend_api_key: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: String,
    pub cache_enabled: bool,
    pub embed_cache_path: String,
    pub max_workers: usize,
    pub uploads_root: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            backend_api_url: std::env::var("BACKEND_API_URL")
                .unwrap_or_else(|_| "http://localhost:3001/api".to_string()),
            backend_api_key: std::env::var("BACKEND_API_KEY").unwrap_or_default(),
            redis_host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            redis_port: std::env::var("REDIS_PORT")
                .unwrap_or_else(|_| "6379".to_string())
                .parse::<u16>()
                .context("REDIS_PORT must be a valid port number")?,
            redis_password: std::env::var("REDIS_PASSWORD").unwrap_or_default(),
            cache_enabled: std::env::var("CACHE_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            embed_cache_path: std::env::var("EMBED_CACHE_PATH")
                .unwrap_or_else(|_| "/app/cache/embeddings.bin".to_string()),
            max_workers: std::env::var("MAX_WORKERS")
                .unwrap_or_else(|_| "16".to_string())
                .parse::<usize>()
                .context("MAX_WORKERS must be a positive integer")?,
            uploads_root: std::env::var("UPLOADS_ROOT").unwrap_or_else(|_| "/app/uploads".to_string()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn redis_url(&self) -> String {
        if self.redis_password.is_empty() {
            format!("redis://{}:{}", self.redis_host, self.redis_port)
        } else {
            format!("redis://:{}@{}:{}", self.redis_password, self.redis_host, self.redis_port)
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_without_password() {
        let config = Config {
            openai_api_key: "k".into(),
            backend_api_url: "http://x".into(),
            backend_api_key: "".into(),
            redis_host: "localhost".into(),
            redis_port: 6379,
            redis_password: "".into(),
            cache_enabled: true,
            embed_cache_path: "/tmp/embeddings.bin".into(),
            max_workers: 16,
            uploads_root: "/app/uploads".into(),
            rust_log: "info".into(),
        };
        assert_eq!(config.redis_url(), "redis://localhost:6379");
    }

    #[test]
    fn redis_url_with_password() {
        let config = Config {
            openai_api_key: "k".into(),
            backend_api_url: "http://x".into(),
            backend_api_key: "".into(),
            redis_host: "localhost".into(),
            redis_port: 6379,
            redis_password: "secret".into(),
            cache_enabled: true,
            embed_cache_path: "/tmp/embeddings.bin".into(),
            max_workers: 16,
            uploads_root: "/app/uploads".into(),
            rust_log: "info".into(),
        };
        assert_eq!(config.redis_url(), "redis://:secret@localhost:6379");
    }
}
