use anyhow::Result;
use std::path::Path;
use tokio::fs;

const REQUIRED_DIRS: &[&str] = &["portraits", "work"];

pub async fn ensure_directories() -> Result<()> {
    for dir in REQUIRED_DIRS {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir).await?;
            eprintln!("[INFO] Created directory: {}", dir);
        }
    }
    Ok(())
}
