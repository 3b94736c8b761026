use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationMode {
    /// TTS to a local MP3, upload it, reference the hosted audio in the talk.
    Audio,
    /// Let the talk service speak the story text with a provider voice.
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub perplexity_api_key: String,
    #[serde(default)]
    pub stability_api_key: String,
    /// Format: username:password
    #[serde(default)]
    pub did_api_key: String,
    #[serde(default)]
    pub elevenlabs_api_key: String,
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,
    #[serde(default = "default_narration")]
    pub narration: NarrationMode,
    #[serde(default = "default_provider_voice")]
    pub provider_voice_id: String,
    #[serde(default)]
    pub youtube_client_id: String,
    #[serde(default)]
    pub youtube_client_secret: String,
    #[serde(default = "default_token_file")]
    pub youtube_token_file: String,
    #[serde(default = "default_queue_file")]
    pub queue_file: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_video_output")]
    pub video_output: String,
    #[serde(default = "default_privacy_status")]
    pub privacy_status: String,
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_narration() -> NarrationMode {
    NarrationMode::Audio
}

fn default_provider_voice() -> String {
    "en-US-JennyNeural".to_string()
}

fn default_token_file() -> String {
    "youtube_token.json".to_string()
}

fn default_queue_file() -> String {
    "story_queue.json".to_string()
}

fn default_batch_size() -> usize {
    7
}

fn default_poll_attempts() -> u32 {
    25
}

fn default_poll_interval_secs() -> u64 {
    12
}

fn default_video_output() -> String {
    "output.mp4".to_string()
}

fn default_privacy_status() -> String {
    "public".to_string()
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Keys the batch producer cannot run without.
    pub fn require_producer_keys(&self) -> Result<()> {
        if self.perplexity_api_key.is_empty() {
            anyhow::bail!("config.json: perplexity_api_key missing");
        }
        if self.stability_api_key.is_empty() {
            anyhow::bail!("config.json: stability_api_key missing");
        }
        Ok(())
    }

    /// Keys the publisher cannot run without.
    pub fn require_publisher_keys(&self) -> Result<()> {
        if self.did_api_key.is_empty() {
            anyhow::bail!("config.json: did_api_key missing (expected username:password)");
        }
        if self.narration == NarrationMode::Audio && self.elevenlabs_api_key.is_empty() {
            anyhow::bail!("config.json: elevenlabs_api_key missing (required for audio narration)");
        }
        if self.youtube_client_id.is_empty() || self.youtube_client_secret.is_empty() {
            anyhow::bail!("config.json: youtube_client_id / youtube_client_secret missing");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: Config = serde_json::from_str(r#"{"perplexity_api_key":"pk"}"#).unwrap();
        assert_eq!(cfg.batch_size, 7);
        assert_eq!(cfg.poll_attempts, 25);
        assert_eq!(cfg.poll_interval_secs, 12);
        assert_eq!(cfg.narration, NarrationMode::Audio);
        assert_eq!(cfg.queue_file, "story_queue.json");
        assert_eq!(cfg.privacy_status, "public");
    }

    #[test]
    fn narration_mode_parses_lowercase() {
        let cfg: Config = serde_json::from_str(r#"{"narration":"text"}"#).unwrap();
        assert_eq!(cfg.narration, NarrationMode::Text);
    }

    #[test]
    fn publisher_keys_enforced() {
        let cfg: Config = serde_json::from_str(r#"{"did_api_key":"user:pass"}"#).unwrap();
        let err = cfg.require_publisher_keys().unwrap_err();
        assert!(err.to_string().contains("elevenlabs_api_key"));
    }

    #[test]
    fn text_narration_does_not_need_elevenlabs_key() {
        let cfg: Config = serde_json::from_str(
            r#"{"did_api_key":"u:p","narration":"text","youtube_client_id":"id","youtube_client_secret":"sec"}"#,
        )
        .unwrap();
        assert!(cfg.require_publisher_keys().is_ok());
    }
}
