//! Completion gateway
//!
//! Owns the ordered (model, search) fallback policy: request construction
//! with bounded context and date augmentation, the startup capability probe,
//! and the streaming attempt loop that yields text fragments from the first
//! candidate that answers.

use async_stream::stream;
use chrono::{DateTime, Local};
use futures::stream::Stream;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{CompletionBackend, CompletionRequest, LlmError};
use crate::llm::types::Content;
use crate::models::{ChatMessage, Role};

pub const PRIMARY_MODEL: &str = "gemini-2.5-flash";
pub const FALLBACK_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-2.0-flash-lite"];

/// Older history is silently dropped beyond this many turns
pub const MAX_CONTEXT_MESSAGES: usize = 20;

pub const SYSTEM_PROMPT: &str = r#"You are BUJJI, a world-class AI assistant. Follow these rules strictly:

1. **Accuracy First**: Give factually correct, well-researched answers. If uncertain, say so.
2. **Concise & Clear**: Be direct. No filler phrases like "Great question!" or "Sure, I'd be happy to help!". Just answer.
3. **Rich Formatting**: Use markdown extensively — headers, bold, lists, code blocks with language tags, tables when comparing things.
4. **Code Excellence**: Write clean, commented, production-quality code. Always specify the language in code blocks.
5. **Context Memory**: Reference previous messages naturally. Build on the conversation.
6. **Adaptive Tone**: Match the user's energy — technical for developers, simple for beginners, creative for writers.
7. **Up-to-date**: You have access to Google Search. Use it to provide current, accurate information when asked about recent events, news, or anything time-sensitive.

You are precise, fast, and incredibly helpful."#;

/// One attempt configuration consumed by the fallback loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptCandidate {
    pub model: String,
    pub search: bool,
}

/// Items yielded by [`CompletionGateway::stream_reply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Incremental piece of generated text
    Fragment(String),
    /// Generation finished cleanly on this model
    Finished { model: String },
}

/// Terminal gateway failures. Display text is what the client sees in the
/// error event; details go to the log.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Every candidate failed before producing output
    #[error("All models failed. Please try again.")]
    Exhausted { attempts: usize },

    /// Upstream failed after fragments already reached the client.
    /// No silent model switch at that point; partial text is discarded.
    #[error("Response interrupted. Please try again.")]
    Interrupted { model: String, source: LlmError },
}

/// Streaming completion with ordered model fallback
pub struct CompletionGateway {
    backend: Arc<dyn CompletionBackend>,
    primary: String,
    fallbacks: Vec<String>,
    search_enabled: bool,
}

impl CompletionGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_models(
            backend,
            PRIMARY_MODEL,
            FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        )
    }

    pub fn with_models(
        backend: Arc<dyn CompletionBackend>,
        primary: impl Into<String>,
        fallbacks: Vec<String>,
    ) -> Self {
        Self {
            backend,
            primary: primary.into(),
            fallbacks,
            // off until the probe proves otherwise
            search_enabled: false,
        }
    }

    /// One-shot startup capability probe: primary with search, primary
    /// plain, then each fallback plain. Fixes `search_enabled` and may
    /// re-point the effective primary. Never fails: total probe failure
    /// leaves the process running degraded.
    pub async fn probe(&mut self) {
        match self.backend.probe(&self.primary, true).await {
            Ok(()) => {
                self.search_enabled = true;
                info!(model = %self.primary, "model loaded with Google Search grounding");
            }
            Err(e) if e.fatal() => {
                warn!(error = %e, "capability probe skipped; running degraded");
            }
            Err(e) => {
                warn!(model = %self.primary, error = %e, "search probe failed");
                match self.backend.probe(&self.primary, false).await {
                    Ok(()) => info!(model = %self.primary, "model loaded without search"),
                    Err(e2) => {
                        warn!(model = %self.primary, error = %e2, "primary model failed");
                        for fallback in self.fallbacks.clone() {
                            if self.backend.probe(&fallback, false).await.is_ok() {
                                info!(model = %fallback, "fallback model loaded as primary");
                                self.primary = fallback;
                                break;
                            }
                        }
                    }
                }
            }
        }

        if self.search_enabled {
            info!("Google Search grounding is enabled");
        } else {
            info!("running without Google Search; answers from model knowledge only");
        }
    }

    /// Effective model order: primary first, then the configured fallbacks,
    /// deduplicated in case the probe re-pointed the primary onto one.
    fn attempt_order(&self) -> Vec<String> {
        let mut order = vec![self.primary.clone()];
        for model in &self.fallbacks {
            if !order.contains(model) {
                order.push(model.clone());
            }
        }
        order
    }

    /// Candidate list the attempt loop consumes. With search available each
    /// model contributes an augmented candidate followed by a plain one.
    fn candidates(&self) -> Vec<AttemptCandidate> {
        let mut candidates = Vec::new();
        for model in self.attempt_order() {
            if self.search_enabled {
                candidates.push(AttemptCandidate {
                    model: model.clone(),
                    search: true,
                });
            }
            candidates.push(AttemptCandidate {
                model,
                search: false,
            });
        }
        candidates
    }

    /// Generate a streaming reply for the given history snapshot.
    ///
    /// Lazy and single-pass: nothing is sent upstream until polled, and
    /// dropping the stream drops the upstream connection with it.
    pub fn stream_reply(
        &self,
        history: Vec<ChatMessage>,
    ) -> impl Stream<Item = Result<GatewayEvent, GatewayError>> + Send + 'static {
        let backend = Arc::clone(&self.backend);
        let candidates = self.candidates();
        let contents = build_contents(&history, Local::now());

        stream! {
            let mut attempts = 0;
            let mut index = 0;

            while index < candidates.len() {
                let candidate = &candidates[index];
                attempts += 1;

                let request = CompletionRequest {
                    contents: contents.clone(),
                    system: SYSTEM_PROMPT.to_string(),
                    search: candidate.search,
                };

                let mut fragments =
                    match backend.stream_completion(&candidate.model, request).await {
                        Ok(s) => s,
                        Err(e) => {
                            warn!(model = %candidate.model, search = candidate.search,
                                  error = %e, "completion attempt failed");
                            if e.fatal() {
                                break;
                            }
                            index = next_candidate(index, candidate.search, &e);
                            continue;
                        }
                    };

                let mut emitted = false;
                let mut failure: Option<LlmError> = None;

                while let Some(item) = fragments.next().await {
                    match item {
                        Ok(text) => {
                            emitted = true;
                            yield Ok(GatewayEvent::Fragment(text));
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }

                match failure {
                    None => {
                        yield Ok(GatewayEvent::Finished {
                            model: candidate.model.clone(),
                        });
                        return;
                    }
                    // Nothing reached the client yet, keep falling back
                    Some(e) if !emitted => {
                        warn!(model = %candidate.model, search = candidate.search,
                              error = %e, "stream failed before output");
                        if e.fatal() {
                            break;
                        }
                        index = next_candidate(index, candidate.search, &e);
                    }
                    Some(e) => {
                        warn!(model = %candidate.model, error = %e,
                              "stream interrupted mid-response");
                        yield Err(GatewayError::Interrupted {
                            model: candidate.model.clone(),
                            source: e,
                        });
                        return;
                    }
                }
            }

            yield Err(GatewayError::Exhausted { attempts });
        }
    }
}

/// Pick the next candidate index after a failed attempt. A tool rejection
/// on a search candidate falls through to the same model's plain candidate;
/// any other search failure skips that pair entirely.
fn next_candidate(index: usize, was_search: bool, error: &LlmError) -> usize {
    if was_search && !error.tool_rejection() {
        index + 2
    } else {
        index + 1
    }
}

/// Map the most recent turns to wire contents, augmenting the final user
/// message with the current date note. Stored history is never mutated.
fn build_contents(history: &[ChatMessage], now: DateTime<Local>) -> Vec<Content> {
    let start = history.len().saturating_sub(MAX_CONTEXT_MESSAGES);
    let recent = &history[start..];

    let mut contents: Vec<Content> = recent
        .iter()
        .map(|message| match message.role {
            Role::User => Content::user(&message.text),
            Role::Assistant => Content::model(&message.text),
        })
        .collect();

    if let Some((last, message)) = contents.last_mut().zip(recent.last()) {
        if message.role == Role::User {
            *last = Content::user(augment_with_date(&message.text, now));
        }
    }

    contents
}

fn augment_with_date(text: &str, now: DateTime<Local>) -> String {
    format!(
        "{text}\n\n[System: Current date/time is {}. Use Google Search if the question requires current information.]",
        now.format("%A, %B %d, %Y %H:%M")
    )
}
