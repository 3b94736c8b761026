use ai_story_shorts::init;
use ai_story_shorts::producer::run_batch;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Initialize directories first
    init::ensure_directories().await?;

    let made = run_batch().await?;
    eprintln!("[OK] Prompt and image batch saved ({} records).", made);
    Ok(())
}
