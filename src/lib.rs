// HTTP server modules
pub mod config;
pub mod handlers;
pub mod models;
pub mod relay;
pub mod routes;
pub mod session;
pub mod sse;
pub mod store;

// Completion gateway
pub mod gateway;

// Gemini client library
pub mod llm;
