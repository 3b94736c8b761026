use crate::config::Config;
use crate::logw;
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use tokio::fs;

const GENERATE_URL: &str = "https://api.stability.ai/v2beta/stable-image/generate/core";

/// Render one illustration for the story. The prompt must already be
/// sanitized; the 9:16 aspect matches the vertical video target.
pub async fn generate_image(
    client: &Client,
    cfg: &Config,
    image_prompt: &str,
    dest: &Path,
) -> Result<()> {
    let form = reqwest::multipart::Form::new()
        .text("prompt", image_prompt.to_string())
        .text("output_format", "png")
        .text("aspect_ratio", "9:16");

    let resp = client
        .post(GENERATE_URL)
        .bearer_auth(&cfg.stability_api_key)
        .header("Accept", "image/*")
        .multipart(form)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await
        .context("Stability request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let raw = resp.text().await.unwrap_or_default();
        logw(format!("Stability HTTP {}", status.as_u16()));
        if !raw.is_empty() {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("Stability raw body: {}", snippet));
        }
        anyhow::bail!("Stability request failed with HTTP {}", status.as_u16());
    }

    let bytes = resp
        .bytes()
        .await
        .context("Stability response read failed")?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("Failed to write image: {}", dest.display()))?;

    Ok(())
}
