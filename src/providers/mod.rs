//! Embedding and chat model providers
//!
//! One configuration value selects the provider for the whole pipeline: the
//! embedder used at ingest and query time and the chat model used for answer
//! generation always come from the same provider.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod openai;

pub use embedding::Embedder;
pub use gemini::GeminiClient;
pub use llm::ChatModel;
pub use openai::OpenAiClient;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::{Config, Provider};
use crate::error::{Error, Result};

/// Build the embedding provider selected by the configuration
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    tracing::info!("Using {} as embedding provider.", config.provider);
    match config.provider {
        Provider::Gemini => Ok(Arc::new(GeminiClient::new(
            &config.gemini,
            &config.http,
            config.query.temperature,
        )?)),
        Provider::Openai => Ok(Arc::new(OpenAiClient::new(
            &config.openai,
            &config.http,
            config.query.temperature,
        )?)),
    }
}

/// Build the chat model selected by the configuration
pub fn build_chat_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    tracing::info!("Using {} as LLM provider.", config.provider);
    match config.provider {
        Provider::Gemini => Ok(Arc::new(GeminiClient::new(
            &config.gemini,
            &config.http,
            config.query.temperature,
        )?)),
        Provider::Openai => Ok(Arc::new(OpenAiClient::new(
            &config.openai,
            &config.http,
            config.query.temperature,
        )?)),
    }
}

/// Retry an operation with exponential backoff
pub(crate) async fn with_backoff<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = Some(e);
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
}
