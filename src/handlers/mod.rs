// Handlers module

pub mod chat;
pub mod history;
pub mod index;

pub use chat::{chat_handler, clear_handler, regenerate_handler};
pub use history::history_handler;
pub use index::{app_js_handler, index_handler};

use std::sync::Arc;

use crate::gateway::CompletionGateway;
use crate::store::ConversationStore;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn ConversationStore>,
    pub gateway: Arc<CompletionGateway>,
}
