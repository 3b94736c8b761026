use ai_story_shorts::init;
use ai_story_shorts::publisher::run_publish;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Initialize directories first
    init::ensure_directories().await?;

    run_publish().await
}
