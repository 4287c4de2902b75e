//! Stream relay
//!
//! Bridges gateway fragments to SSE events and finalizes conversation
//! state: on success the accumulated text is committed as the assistant
//! turn and a done event closes the stream; on failure a single error
//! event closes it and nothing is committed. The stream is lazy, so a
//! client disconnect drops it and with it the upstream connection.

use async_stream::stream;
use chrono::Local;
use futures::stream::Stream;
use futures::StreamExt;
use pin_utils::pin_mut;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use warp::sse::Event;

use crate::gateway::{CompletionGateway, GatewayError, GatewayEvent};
use crate::models::ChatMessage;
use crate::sse::{chunk_event, done_event, error_event};
use crate::store::ConversationStore;

/// Relay one generation for `session` over SSE, committing the finished
/// assistant turn to the store. `history` is the snapshot to generate from.
pub fn relay_reply(
    store: Arc<dyn ConversationStore>,
    gateway: Arc<CompletionGateway>,
    session: Uuid,
    history: Vec<ChatMessage>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream! {
        let reply = gateway.stream_reply(history);
        pin_mut!(reply);

        let mut full_text = String::new();
        let mut used_model = None;

        while let Some(event) = reply.next().await {
            match event {
                Ok(GatewayEvent::Fragment(text)) => {
                    full_text.push_str(&text);
                    // flushed immediately; no batching
                    yield chunk_event(&text);
                }
                Ok(GatewayEvent::Finished { model }) => {
                    used_model = Some(model);
                    break;
                }
                Err(e) => {
                    if let GatewayError::Interrupted { model, source } = &e {
                        warn!(%session, %model, error = %source,
                              "discarding partial response");
                    }
                    yield error_event(&e.to_string());
                    return;
                }
            }
        }

        match used_model {
            Some(model) if !full_text.is_empty() => {
                let length = store
                    .append(session, ChatMessage::assistant(full_text))
                    .await;
                let message_count = length / 2;
                debug!(%session, %model, message_count, "response committed");
                yield done_event(
                    &Local::now().format("%H:%M").to_string(),
                    message_count,
                    &model,
                );
            }
            // clean completion with no text is still a failure to the user
            _ => {
                yield error_event(&GatewayError::Exhausted { attempts: 0 }.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_user_facing() {
        assert_eq!(
            GatewayError::Exhausted { attempts: 4 }.to_string(),
            "All models failed. Please try again."
        );
        assert_eq!(
            GatewayError::Interrupted {
                model: "gemini-2.5-flash".to_string(),
                source: crate::llm::LlmError::Stream("reset".to_string()),
            }
            .to_string(),
            "Response interrupted. Please try again."
        );
    }
}
