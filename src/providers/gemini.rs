//! Gemini client for embeddings and answer generation
//!
//! Talks to the public Generative Language API with an API key, using
//! embedContent/batchEmbedContents for embeddings and generateContent for
//! chat.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedding::Embedder;
use super::llm::ChatModel;
use super::with_backoff;
use crate::config::{GeminiConfig, HttpConfig};
use crate::error::{Error, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Requests per batchEmbedContents call (the documented API maximum is 100)
const EMBED_BATCH_SIZE: usize = 100;

/// Gemini API client
///
/// A single client serves both embedding and chat requests; the same
/// API key covers both endpoints.
pub struct GeminiClient {
    /// HTTP client
    client: Client,
    /// API key, sent as the x-goog-api-key header
    api_key: String,
    /// Model for embedding requests
    embedding_model: String,
    /// Model for generateContent requests
    chat_model: String,
    /// Generation temperature
    temperature: f32,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest {
    content: EmbedContent,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<BatchEmbedPart>,
}

#[derive(Serialize)]
struct BatchEmbedPart {
    model: String,
    content: EmbedContent,
}

#[derive(Serialize)]
struct EmbedContent {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    /// Absent entirely when the prompt is blocked
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    /// Absent when generation stops before producing content
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig, http: &HttpConfig, temperature: f32) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config("GOOGLE_API_KEY must be set when EMBEDDING_PROVIDER=gemini".to_string())
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

    /// Endpoint URL for a model and API method
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", GEMINI_API_BASE, model_path(model), method)
    }

    /// One batchEmbedContents request for up to `EMBED_BATCH_SIZE` inputs, with retry
    async fn batch_embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint(&self.embedding_model, "batchEmbedContents");
        let model = model_path(&self.embedding_model);
        let api_key = self.api_key.clone();
        let client = self.client.clone();
        let texts = texts.to_vec();

        with_backoff(self.max_retries, || {
            let url = url.clone();
            let model = model.clone();
            let api_key = api_key.clone();
            let client = client.clone();
            let texts = texts.clone();

            async move {
                let expected = texts.len();
                let request = BatchEmbedRequest {
                    requests: texts
                        .into_iter()
                        .map(|text| BatchEmbedPart {
                            model: model.clone(),
                            content: EmbedContent {
                                parts: vec![TextPart { text }],
                            },
                        })
                        .collect(),
                };

                let response = client
                    .post(&url)
                    .header("x-goog-api-key", &api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Gemini request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "Gemini batch embedding failed ({}): {}",
                        status, body
                    )));
                }

                let parsed: BatchEmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse Gemini embeddings response: {}", e))
                })?;

                embeddings_from_batch(parsed, expected)
            }
        })
        .await
    }
}

/// The API addresses models as "models/<name>"; configuration values may or
/// may not carry the prefix
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

/// Check the embedding count against the request and unwrap the values
fn embeddings_from_batch(response: BatchEmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.embeddings.len() != expected {
        return Err(Error::embedding(format!(
            "Gemini returned {} embeddings for {} inputs",
            response.embeddings.len(),
            expected
        )));
    }

    Ok(response
        .embeddings
        .into_iter()
        .map(|embedding| embedding.values)
        .collect())
}

/// Join the text parts of the first candidate
fn response_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .map(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::llm("No text in Gemini response"));
    }
    Ok(text)
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.endpoint(&self.embedding_model, "embedContent");
        let api_key = self.api_key.clone();
        let client = self.client.clone();
        let text = text.to_string();

        with_backoff(self.max_retries, || {
            let url = url.clone();
            let api_key = api_key.clone();
            let client = client.clone();
            let text = text.clone();

            async move {
                let request = EmbedRequest {
                    content: EmbedContent {
                        parts: vec![TextPart { text }],
                    },
                };

                let response = client
                    .post(&url)
                    .header("x-goog-api-key", &api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Gemini request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "Gemini embedding failed ({}): {}",
                        status, body
                    )));
                }

                let parsed: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse Gemini embedding response: {}", e))
                })?;

                Ok(parsed.embedding.values)
            }
        })
        .await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.batch_embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint(&self.chat_model, "generateContent");
        let api_key = self.api_key.clone();
        let client = self.client.clone();
        let temperature = self.temperature;
        let prompt = prompt.to_string();

        with_backoff(self.max_retries, || {
            let url = url.clone();
            let api_key = api_key.clone();
            let client = client.clone();
            let prompt = prompt.clone();

            async move {
                let request = GenerateRequest {
                    contents: vec![Content {
                        role: "user".to_string(),
                        parts: vec![TextPart { text: prompt }],
                    }],
                    generation_config: GenerationConfig { temperature },
                };

                let response = client
                    .post(&url)
                    .header("x-goog-api-key", &api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Gemini request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Gemini generation failed ({}): {}",
                        status, body
                    )));
                }

                let parsed: GenerateResponse = response.json().await.map_err(|e| {
                    Error::llm(format!("Failed to parse Gemini response: {}", e))
                })?;

                response_text(parsed)
            }
        })
        .await
    }

    fn model(&self) -> &str {
        &self.chat_model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let config = GeminiConfig::default();
        // The client holds the API key, so it has no Debug impl to unwrap over
        let err = GeminiClient::new(&config, &HttpConfig::default(), 0.0)
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_model_path_prefixes_bare_names() {
        assert_eq!(model_path("embedding-001"), "models/embedding-001");
        assert_eq!(model_path("models/embedding-001"), "models/embedding-001");
        assert_eq!(
            model_path("gemini-1.5-flash-latest"),
            "models/gemini-1.5-flash-latest"
        );
    }

    #[test]
    fn test_generate_request_wire_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: "pergunta".to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "pergunta");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_batch_request_carries_model_per_part() {
        let request = BatchEmbedRequest {
            requests: vec![BatchEmbedPart {
                model: "models/embedding-001".to_string(),
                content: EmbedContent {
                    parts: vec![TextPart {
                        text: "trecho".to_string(),
                    }],
                },
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["model"], "models/embedding-001");
        assert_eq!(json["requests"][0]["content"]["parts"][0]["text"], "trecho");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let payload = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "RESPOSTA "}, {"text": "completa"}], "role": "model"}}
            ]
        }"#;

        let parsed: GenerateResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response_text(parsed).unwrap(), "RESPOSTA completa");
    }

    #[test]
    fn test_blocked_response_is_an_error() {
        let payload = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;

        let parsed: GenerateResponse = serde_json::from_str(payload).unwrap();
        let err = response_text(parsed).unwrap_err();
        assert!(err.to_string().contains("No text in Gemini response"));
    }

    #[test]
    fn test_batch_count_mismatch_is_an_error() {
        let response = BatchEmbedResponse {
            embeddings: vec![EmbeddingValues {
                values: vec![0.1, 0.2],
            }],
        };

        let err = embeddings_from_batch(response, 3).unwrap_err();
        assert!(err.to_string().contains("1 embeddings for 3 inputs"));
    }
}
