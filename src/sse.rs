use serde_json::{json, Value};
use std::convert::Infallible;
use warp::sse::Event;

/// Create a chunk SSE event carrying one text fragment
pub fn chunk_event(text: &str) -> Result<Event, Infallible> {
    Ok(Event::default().data(chunk_payload(text).to_string()))
}

/// Create the terminal done SSE event
pub fn done_event(timestamp: &str, message_count: usize, model: &str) -> Result<Event, Infallible> {
    Ok(Event::default().data(done_payload(timestamp, message_count, model).to_string()))
}

/// Create the terminal error SSE event
pub fn error_event(message: &str) -> Result<Event, Infallible> {
    Ok(Event::default().data(error_payload(message).to_string()))
}

fn chunk_payload(text: &str) -> Value {
    json!({ "chunk": text })
}

fn done_payload(timestamp: &str, message_count: usize, model: &str) -> Value {
    json!({
        "done": true,
        "timestamp": timestamp,
        "message_count": message_count,
        "model": model
    })
}

fn error_payload(message: &str) -> Value {
    json!({ "error": message })
}
