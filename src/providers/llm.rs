//! Chat model trait for answer generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for prompt-in, text-out chat models
///
/// Implementations:
/// - `GeminiClient`: generateContent on the Generative Language API
/// - `OpenAiClient`: OpenAI chat completions
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for the given prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model used for generation
    fn model(&self) -> &str;

    /// Provider name for logging
    fn name(&self) -> &str;
}
