use crate::config::Config;
use crate::error::PipelineError;
use crate::logw;
use crate::poll::{PollPolicy, poll_until_ready};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const DID_BASE: &str = "https://api.d-id.com";

/// Narration input for a talk: either a hosted audio file or raw text
/// spoken by a provider voice on the service side.
#[derive(Debug, Clone)]
pub enum TalkScript {
    Audio { audio_url: String },
    Text { input: String, voice_id: String },
}

impl TalkScript {
    fn to_json(&self) -> serde_json::Value {
        match self {
            TalkScript::Audio { audio_url } => json!({
                "type": "audio",
                "audio_url": audio_url,
            }),
            TalkScript::Text { input, voice_id } => json!({
                "type": "text",
                "input": input,
                "provider": {
                    "type": "microsoft",
                    "voice_id": voice_id,
                },
            }),
        }
    }
}

/// Client for the talking-video service: asset uploads, job creation,
/// status polling and result download, all on one basic-auth credential.
pub struct TalksClient {
    client: Client,
    username: String,
    password: String,
}

impl TalksClient {
    pub fn from_config(client: Client, cfg: &Config) -> Result<Self> {
        let (username, password) = cfg
            .did_api_key
            .split_once(':')
            .context("did_api_key must be in username:password format")?;
        Ok(Self {
            client,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub async fn upload_portrait(&self, path: &Path) -> Result<String> {
        self.upload_asset("images", "image", path, "image/jpeg").await
    }

    pub async fn upload_narration(&self, path: &Path) -> Result<String> {
        self.upload_asset("audios", "audio", path, "audio/mpeg").await
    }

    async fn upload_asset(
        &self,
        endpoint: &str,
        field: &'static str,
        path: &Path,
        mime: &str,
    ) -> Result<String> {
        let data = fs::read(path)
            .await
            .with_context(|| format!("Failed to read upload source: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.to_string());

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part(field, part);

        let resp = self
            .client
            .post(format!("{DID_BASE}/{endpoint}"))
            .basic_auth(&self.username, Some(&self.password))
            .multipart(form)
            .timeout(std::time::Duration::from_secs(120))
            .send()
            .await
            .with_context(|| format!("Upload to /{endpoint} failed"))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            logw(format!("/{endpoint} HTTP {}: {}", status.as_u16(), snippet(&raw)));
            anyhow::bail!("Asset upload to /{endpoint} failed with HTTP {}", status.as_u16());
        }

        let root: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("/{endpoint} returned non-JSON body"))?;
        let url = root
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No URL returned from /{endpoint}: {}", snippet(&raw)))?;

        Ok(rewrite_s3_url(url))
    }

    /// Submit the render job. Anything but a success status with a job id
    /// is a submission failure carrying the response body.
    pub async fn create_talk(&self, source_url: &str, script: &TalkScript) -> Result<String> {
        let body = json!({
            "source_url": source_url,
            "script": script.to_json(),
        });

        let resp = self
            .client
            .post(format!("{DID_BASE}/talks"))
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await
            .context("Talk creation request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            logw(format!("/talks HTTP {}: {}", status.as_u16(), snippet(&raw)));
            return Err(PipelineError::submission(snippet(&raw)).into());
        }

        let root: serde_json::Value =
            serde_json::from_str(&raw).context("/talks returned non-JSON body")?;
        let talk_id = root
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PipelineError::submission(snippet(&raw)))?;

        Ok(talk_id.to_string())
    }

    /// One status probe. A ready job carries `result_url`; anything else
    /// (still rendering, or failed remotely) reads as "not ready" and is
    /// left to the poll budget to bound.
    async fn check_talk(&self, talk_id: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(format!("{DID_BASE}/talks/{talk_id}"))
            .basic_auth(&self.username, Some(&self.password))
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .context("Talk status request failed")?;

        let root: serde_json::Value = resp
            .json()
            .await
            .context("Talk status returned non-JSON body")?;
        Ok(root
            .get("result_url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    pub async fn wait_for_result(&self, talk_id: &str, policy: &PollPolicy) -> Result<String> {
        poll_until_ready(policy, || self.check_talk(talk_id)).await
    }

    /// Fetch the finished video. Bytes stream into a `.part` sibling and
    /// only a fully-written file is renamed to `dest`.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<()> {
        let mut resp = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(600))
            .send()
            .await
            .map_err(|e| PipelineError::download(url, e.to_string()))?;

        if !resp.status().is_success() {
            return Err(
                PipelineError::download(url, format!("HTTP {}", resp.status().as_u16())).into(),
            );
        }

        let part = PathBuf::from(format!("{}.part", dest.display()));
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create dir {}", parent.display()))?;
            }
        }

        let mut file = fs::File::create(&part)
            .await
            .with_context(|| format!("Failed to create {}", part.display()))?;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| PipelineError::download(url, e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::download(url, e.to_string()))?;
        }
        file.flush().await.ok();
        drop(file);

        fs::rename(&part, dest)
            .await
            .with_context(|| format!("Failed to move video into place: {}", dest.display()))?;
        Ok(())
    }
}

fn snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}

/// Hosted assets come back as `s3://` references; the talks endpoint
/// wants their public https form, with `|` percent-encoded.
fn rewrite_s3_url(url: &str) -> String {
    const BUCKETS: &[(&str, &str)] = &[
        (
            "s3://d-id-images-prod/",
            "https://d-id-images-prod.s3.amazonaws.com/",
        ),
        (
            "s3://d-id-audios-prod/",
            "https://d-id-audios-prod.s3.amazonaws.com/",
        ),
    ];
    for (prefix, host) in BUCKETS {
        if let Some(rest) = url.strip_prefix(prefix) {
            return format!("{host}{}", rest.replace('|', "%7C"));
        }
    }
    url.to_string()
}
