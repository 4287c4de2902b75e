//! Server-Sent Events decoder for Gemini streaming responses
//!
//! With `alt=sse` the API emits `data: <json>` lines separated by blank
//! lines. Chunk boundaries from the transport do not align with line
//! boundaries, so partial lines are buffered until a newline arrives.

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

use super::error::LlmError;
use super::types::GenerateContentResponse;

/// Decode a byte stream into parsed response chunks.
///
/// Lines other than `data:` (comments, `event:`, `id:`) are ignored.
pub fn decode_response_stream(
    byte_stream: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
) -> Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, LlmError>> + Send>> {
    let mut buffer = String::new();

    let decoded = byte_stream.flat_map(move |chunk| {
        let results = match chunk {
            Ok(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    buffer.push_str(text);
                    drain_data_lines(&mut buffer)
                        .into_iter()
                        .map(|payload| {
                            serde_json::from_str::<GenerateContentResponse>(&payload).map_err(
                                |e| LlmError::Stream(format!("bad SSE payload: {e}: {payload}")),
                            )
                        })
                        .collect()
                }
                Err(e) => vec![Err(LlmError::Stream(format!("invalid UTF-8: {e}")))],
            },
            Err(e) => vec![Err(LlmError::Stream(e.to_string()))],
        };
        futures::stream::iter(results)
    });

    Box::pin(decoded)
}

/// Pull complete `data:` payloads out of the line buffer, leaving any
/// trailing partial line in place.
fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(newline) = buffer.find('\n') {
        let line = buffer[..newline].trim().to_string();
        buffer.drain(..=newline);
        if let Some(data) = line.strip_prefix("data:") {
            payloads.push(data.trim_start().to_string());
        }
    }
    payloads
}
