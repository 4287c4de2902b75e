//! List the account's generation-capable Gemini models.
//!
//! Usage: `GOOGLE_API_KEY=... cargo run --bin list_models`

use anyhow::{bail, Context};
use bujji::llm::GeminiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let api_key = match std::env::var("GOOGLE_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => bail!("GOOGLE_API_KEY is not set"),
    };

    let client = GeminiClient::new(Some(api_key))?;
    let models = client
        .list_generation_models()
        .await
        .context("failed to list models")?;

    println!("{:<40} {}", "Model Name", "Description");
    println!("{}", "-".repeat(60));
    for model in models {
        let description: String = model.description.chars().take(50).collect();
        println!("{:<40} {}", model.name, description);
    }

    Ok(())
}
