//! Gemini client layer
//!
//! Typed wire schema, SSE stream decoding, and a [`CompletionBackend`]
//! trait so the gateway can be exercised without network access.

pub mod backend;
pub mod client;
pub mod error;
pub mod sse;
pub mod types;

// Re-export commonly used types
pub use backend::{CompletionBackend, CompletionRequest, FragmentStream};
pub use client::GeminiClient;
pub use error::{ApiStatus, LlmError};
