//! OpenAI client for embeddings and chat completions with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedding::Embedder;
use super::llm::ChatModel;
use super::with_backoff;
use crate::config::{HttpConfig, OpenAiConfig};
use crate::error::{Error, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Inputs per embeddings request (the API accepts up to 2048)
const EMBED_BATCH_SIZE: usize = 512;

/// OpenAI API client
///
/// A single client serves both embedding and chat requests; the same
/// API key covers both endpoints.
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    /// API key
    api_key: String,
    /// Model for embedding requests
    embedding_model: String,
    /// Model for chat completion requests
    chat_model: String,
    /// Generation temperature
    temperature: f32,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(config: &OpenAiConfig, http: &HttpConfig, temperature: f32) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config("OPENAI_API_KEY must be set when EMBEDDING_PROVIDER=openai".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            temperature,
            max_retries: http.max_retries,
        })
    }

    /// One embeddings request for up to `EMBED_BATCH_SIZE` inputs, with retry
    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", OPENAI_API_BASE);
        let model = self.embedding_model.clone();
        let api_key = self.api_key.clone();
        let client = self.client.clone();
        let texts = texts.to_vec();

        with_backoff(self.max_retries, || {
            let url = url.clone();
            let model = model.clone();
            let api_key = api_key.clone();
            let client = client.clone();
            let input = texts.clone();

            async move {
                let expected = input.len();
                let request = EmbeddingsRequest { model, input };

                let response = client
                    .post(&url)
                    .bearer_auth(&api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("OpenAI request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "OpenAI embeddings failed ({}): {}",
                        status, body
                    )));
                }

                let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse OpenAI embeddings response: {}", e))
                })?;

                embeddings_in_order(parsed.data, expected)
            }
        })
        .await
    }
}

/// Reorder response items by index and check the count matches the input
fn embeddings_in_order(mut data: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(Error::embedding(format!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected
        )));
    }

    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_request(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::embedding("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", OPENAI_API_BASE);
        let model = self.chat_model.clone();
        let api_key = self.api_key.clone();
        let client = self.client.clone();
        let temperature = self.temperature;
        let prompt = prompt.to_string();

        with_backoff(self.max_retries, || {
            let url = url.clone();
            let model = model.clone();
            let api_key = api_key.clone();
            let client = client.clone();
            let prompt = prompt.clone();

            async move {
                let request = ChatRequest {
                    model,
                    messages: vec![ChatMessage {
                        role: "user".to_string(),
                        content: prompt,
                    }],
                    temperature,
                };

                let response = client
                    .post(&url)
                    .bearer_auth(&api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("OpenAI request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "OpenAI chat completion failed ({}): {}",
                        status, body
                    )));
                }

                let parsed: ChatResponse = response.json().await.map_err(|e| {
                    Error::llm(format!("Failed to parse OpenAI chat response: {}", e))
                })?;

                parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| Error::llm("No choices in OpenAI response"))
            }
        })
        .await
    }

    fn model(&self) -> &str {
        &self.chat_model
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let config = OpenAiConfig::default();
        // The client holds the API key, so it has no Debug impl to unwrap over
        let err = OpenAiClient::new(&config, &HttpConfig::default(), 0.0)
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            temperature: 0.0,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn test_embeddings_response_reordered_by_index() {
        let payload = r#"{
            "data": [
                {"index": 1, "embedding": [0.2, 0.2]},
                {"index": 0, "embedding": [0.1, 0.1]}
            ]
        }"#;

        let parsed: EmbeddingsResponse = serde_json::from_str(payload).unwrap();
        let ordered = embeddings_in_order(parsed.data, 2).unwrap();
        assert_eq!(ordered[0], vec![0.1, 0.1]);
        assert_eq!(ordered[1], vec![0.2, 0.2]);
    }

    #[test]
    fn test_embeddings_count_mismatch_is_an_error() {
        let data = vec![EmbeddingItem {
            index: 0,
            embedding: vec![0.1],
        }];

        let err = embeddings_in_order(data, 2).unwrap_err();
        assert!(err.to_string().contains("1 embeddings for 2 inputs"));
    }

    #[test]
    fn test_chat_response_parsing() {
        let payload = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "the answer"}}
            ]
        }"#;

        let parsed: ChatResponse = serde_json::from_str(payload).unwrap();
        let content = parsed.choices.into_iter().next().unwrap().message.content;
        assert_eq!(content, "the answer");
    }
}
