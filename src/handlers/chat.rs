// POST /api/chat, /api/regenerate and /api/clear handlers

use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tracing::debug;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::Reply;

use super::AppContext;
use crate::models::{ChatMessage, ChatRequest, ClearResponse, ErrorBody, Role};
use crate::relay::relay_reply;

fn client_error(message: &str) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody::new(message)),
        StatusCode::BAD_REQUEST,
    )
    .into_response()
}

/// `warp::sse::reply` requires a `Sync` stream, but the relay stream awaits
/// `async_trait` futures that are only `Send`. The mutex makes it `Sync`
/// without ever locking: polling goes through `get_mut`.
struct SyncStream<S>(Mutex<S>);

impl<S: Stream + Unpin> Stream for SyncStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        Pin::new(self.get_mut().0.get_mut().unwrap()).poll_next(cx)
    }
}

fn sse_reply(
    ctx: &AppContext,
    session: Uuid,
    history: Vec<ChatMessage>,
) -> warp::reply::Response {
    let stream = relay_reply(
        ctx.store.clone(),
        ctx.gateway.clone(),
        session,
        history,
    );
    let stream = SyncStream(Mutex::new(Box::pin(stream)));
    warp::sse::reply(warp::sse::keep_alive().stream(stream)).into_response()
}

/// Streaming chat endpoint. Appends the user turn, then relays the
/// generated response as SSE.
pub async fn chat_handler(
    session: Uuid,
    request: ChatRequest,
    ctx: AppContext,
) -> Result<impl warp::Reply, warp::Rejection> {
    let message = request.message.trim();
    if message.is_empty() {
        // nothing is stored and the gateway is never contacted
        return Ok(client_error("Empty message"));
    }

    debug!(%session, "chat message received");
    ctx.store.append(session, ChatMessage::user(message)).await;
    let history = ctx.store.history(session).await;

    Ok(sse_reply(&ctx, session, history))
}

/// Regenerate the last assistant response from the same user turn.
pub async fn regenerate_handler(
    session: Uuid,
    ctx: AppContext,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !ctx.store.contains(session).await {
        return Ok(client_error("No conversation found"));
    }

    ctx.store.pop_last_if_assistant(session).await;

    let history = ctx.store.history(session).await;
    match history.last() {
        Some(message) if message.role == Role::User => {
            debug!(%session, "regenerating last response");
            Ok(sse_reply(&ctx, session, history))
        }
        _ => Ok(client_error("No user message to regenerate from")),
    }
}

/// Reset the session's conversation. Idempotent.
pub async fn clear_handler(
    session: Uuid,
    ctx: AppContext,
) -> Result<impl warp::Reply, Infallible> {
    ctx.store.clear(session).await;
    debug!(%session, "conversation cleared");
    Ok(warp::reply::json(&ClearResponse::cleared()))
}
