//! Gemini Developer API client

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

use super::backend::{CompletionBackend, CompletionRequest, FragmentStream};
use super::error::{ApiStatus, LlmError};
use super::sse::decode_response_stream;
use super::types::{
    ApiErrorBody, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ListModelsResponse, ModelInfo, SystemInstruction, Tool,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Timeout for one-shot calls (probe, model listing)
const UNARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Gemini Developer API (API-key auth)
pub struct GeminiClient {
    http_client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client. A missing key is allowed so the process can
    /// start degraded; every call will then fail with `MissingCredentials`.
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            // Bounds the gap between streamed chunks, not the whole response
            .read_timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    fn key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingCredentials)
    }

    fn build_request_body(request: CompletionRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: request.contents,
            system_instruction: Some(SystemInstruction::from_text(request.system)),
            tools: request.search.then(|| vec![Tool::google_search()]),
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(4096),
                temperature: Some(0.7),
                top_p: Some(0.95),
                top_k: Some(40),
            }),
        }
    }

    /// Turn a non-2xx response into a structured error. The Gemini error
    /// body carries a canonical status string the gateway classifies on.
    async fn error_from_response(response: reqwest::Response) -> LlmError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => LlmError::Api {
                status,
                api_status: ApiStatus::from_code(&parsed.error.status),
                message: parsed.error.message,
            },
            Err(_) => LlmError::Api {
                status,
                api_status: ApiStatus::from_http(status),
                message: body,
            },
        }
    }

    /// List the account's models that support content generation.
    pub async fn list_generation_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let key = self.key()?;
        let url = format!("{}/models?pageSize=1000", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .header("x-goog-api-key", key)
            .timeout(UNARY_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let listing: ListModelsResponse = response.json().await?;
        Ok(listing
            .models
            .into_iter()
            .filter(ModelInfo::supports_generation)
            .collect())
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn stream_completion(
        &self,
        model: &str,
        request: CompletionRequest,
    ) -> Result<FragmentStream, LlmError> {
        let key = self.key()?;
        let body = Self::build_request_body(request);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let chunks = decode_response_stream(Box::pin(response.bytes_stream()));
        // One fragment per chunk; chunks without answer text are dropped
        let fragments = chunks.filter_map(|result| async move {
            match result {
                Ok(chunk) => chunk.text().map(Ok),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(fragments))
    }

    async fn probe(&self, model: &str, search: bool) -> Result<(), LlmError> {
        let key = self.key()?;
        let body = Self::build_request_body(CompletionRequest {
            contents: vec![super::types::Content::user("Say hi in one word.")],
            system: String::new(),
            search,
        });
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .timeout(UNARY_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        // Parse to confirm the model actually answered
        let _: GenerateContentResponse = response.json().await?;
        Ok(())
    }
}
