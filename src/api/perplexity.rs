use crate::config::Config;
use crate::logw;
use crate::prompt::{self, ParsedStory};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

const CHAT_COMPLETIONS_URL: &str = "https://api.perplexity.ai/chat/completions";

const SYSTEM_PROMPT: &str = "Write a 2-minute engaging story for a vertical video. \
Include narration, and in the end, provide a one-sentence vivid image prompt that evokes the main scene.";

fn extract_message_content(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("Perplexity error message: {}", msg));
        }
        if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
            logw(format!("Perplexity error type: {}", typ));
        }
        return None;
    }

    root.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Ask the text-generation service for a story plus image description and
/// split them at the marker. The user instruction carries the per-slot
/// theme hint; the split rules live in `prompt`.
pub async fn generate_story(
    client: &Client,
    cfg: &Config,
    user_prompt: &str,
) -> Result<ParsedStory> {
    let body = json!({
        "model": "sonar-pro",
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": user_prompt},
        ],
    });

    let resp = client
        .post(CHAT_COMPLETIONS_URL)
        .bearer_auth(&cfg.perplexity_api_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(120))
        .send()
        .await
        .context("Perplexity request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        logw(format!("Perplexity HTTP {}", status.as_u16()));
        if !raw.is_empty() {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("Perplexity raw body: {}", snippet));
        }
        anyhow::bail!("Perplexity request failed with HTTP {}", status.as_u16());
    }

    let content = extract_message_content(&raw).ok_or_else(|| {
        if !raw.is_empty() {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("Perplexity raw body: {}", snippet));
        }
        anyhow::anyhow!("Perplexity response had no message content")
    })?;

    Ok(prompt::split_story_and_prompt(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"a story"}}]}"#;
        assert_eq!(extract_message_content(raw).as_deref(), Some("a story"));
    }

    #[test]
    fn error_payload_yields_none() {
        let raw = r#"{"error":{"message":"invalid key","type":"auth"}}"#;
        assert!(extract_message_content(raw).is_none());
    }

    #[test]
    fn empty_choices_yields_none() {
        assert!(extract_message_content(r#"{"choices":[]}"#).is_none());
    }
}
