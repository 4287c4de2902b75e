//! Backend trait the completion gateway is generic over
//!
//! The production implementation is [`super::client::GeminiClient`]; tests
//! drive the gateway with scripted stubs instead.

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use super::error::LlmError;
use super::types::Content;

/// Lazy, single-pass stream of generated text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// One completion attempt against a single model/configuration
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Conversation turns, oldest first, already truncated and augmented
    pub contents: Vec<Content>,
    /// System prompt
    pub system: String,
    /// Whether to attach the Google Search tool
    pub search: bool,
}

/// Streaming text generation against a named model
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Open a streaming completion. Fragments arrive in generation order;
    /// the stream stops consuming upstream bytes as soon as it is dropped.
    async fn stream_completion(
        &self,
        model: &str,
        request: CompletionRequest,
    ) -> Result<FragmentStream, LlmError>;

    /// One-shot trial call used by the startup capability probe.
    async fn probe(&self, model: &str, search: bool) -> Result<(), LlmError>;
}
