use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bujji::config::AppConfig;
use bujji::gateway::CompletionGateway;
use bujji::handlers::AppContext;
use bujji::llm::{CompletionBackend, GeminiClient};
use bujji::routes::configure_routes;
use bujji::store::{ConversationStore, InMemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();
    if config.api_key.is_none() {
        info!("GOOGLE_API_KEY not set; starting degraded, chat will report errors");
    }

    let store = Arc::new(InMemoryStore::new());
    let backend = Arc::new(GeminiClient::new(config.api_key.clone())?);

    let mut gateway = CompletionGateway::new(backend as Arc<dyn CompletionBackend>);
    gateway.probe().await;
    let gateway = Arc::new(gateway);

    // Idle-session sweep; the map grows without bound otherwise
    let sweeper = Arc::clone(&store);
    let ttl = config.session_ttl;
    let interval = config.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            let evicted = sweeper.evict_idle(ttl).await;
            if evicted > 0 {
                debug!(evicted, "idle sessions evicted");
            }
        }
    });

    let ctx = AppContext {
        store: store as Arc<dyn ConversationStore>,
        gateway,
    };
    let routes = configure_routes(ctx);

    info!("starting server on http://{}:{}", config.bind_addr, config.port);
    warp::serve(routes).run((config.bind_addr, config.port)).await;
    Ok(())
}
