mod backend;
mod config;
mod dispatcher;
mod errors;
mod llm;
mod models;
mod pipeline;
mod progress;
mod queue;
mod scoring;
mod text_extract;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::BackendClient;
use crate::config::Config;
use crate::llm::LlmGateway;
use crate::pipeline::PipelineContext;
use crate::queue::RedisJobQueue;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting kreeda-match-worker v{}", env!("CARGO_PKG_VERSION"));

    let redis = redis::Client::open(config.redis_url())?;
    info!("Redis client initialized");

    let embed_cache_path = if config.cache_enabled {
        config.embed_cache_path.clone()
    } else {
        std::env::temp_dir().join(format!("kreeda-embed-cache-{}.bin", uuid::Uuid::new_v4())).display().to_string()
    };
    if let Some(parent) = std::path::Path::new(&embed_cache_path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let llm = Arc::new(LlmGateway::new(config.openai_api_key.clone(), embed_cache_path));
    info!("LLM gateway initialized (chat: {}, embeddings: {})", llm::CHAT_MODEL, llm::EMBEDDING_MODEL);

    let backend = BackendClient::new(config.backend_api_url.clone(), config.backend_api_key.clone());
    info!("Backend client initialized ({})", config.backend_api_url);

    let max_workers = config.max_workers;
    let ctx = PipelineContext {
        llm: llm.clone(),
        backend,
        redis: redis.clone(),
        config: Arc::new(config),
    };

    let queue: Arc<dyn queue::JobQueue> = Arc::new(RedisJobQueue::new(redis));

    dispatcher::run(ctx, queue, max_workers).await;

    llm.close_embed_cache();
    info!("shutdown complete");
    Ok(())
}
