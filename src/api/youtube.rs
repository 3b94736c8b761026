use crate::auth::{CredentialStore, StoredCredentials};
use crate::config::Config;
use crate::error::PipelineError;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use reqwest::Client;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

const OAUTH_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
// Installed-app flow without a local listener: the user copies the code
// query parameter off the redirect by hand.
const REDIRECT_URI: &str = "http://localhost";

const CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Upload client for the video-hosting platform: OAuth token lifecycle
/// plus chunked resumable uploads.
pub struct YouTubeUploader {
    client: Client,
    client_id: String,
    client_secret: String,
}

impl YouTubeUploader {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            client_id: cfg.youtube_client_id.clone(),
            client_secret: cfg.youtube_client_secret.clone(),
        }
    }

    pub fn consent_url(&self) -> String {
        let url = reqwest::Url::parse_with_params(
            OAUTH_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("response_type", "code"),
                ("scope", UPLOAD_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .expect("static consent URL must parse");
        url.to_string()
    }

    /// Return a usable access token: cached, refreshed, or freshly
    /// granted through the one-time interactive consent step.
    pub async fn ensure_access_token(&self, store: &dyn CredentialStore) -> Result<String> {
        match store.load().await? {
            Some(creds) if !creds.needs_refresh() => Ok(creds.access_token),
            Some(creds) => {
                let refresh_token = creds.refresh_token.clone().ok_or_else(|| {
                    PipelineError::upload_auth("cached token expired and no refresh token present")
                })?;
                logi("Access token expired; refreshing...");
                let renewed = self.refresh(&refresh_token).await?;
                store.save(&renewed).await?;
                Ok(renewed.access_token)
            }
            None => {
                let creds = self.authorize_interactive().await?;
                store.save(&creds).await?;
                Ok(creds.access_token)
            }
        }
    }

    async fn authorize_interactive(&self) -> Result<StoredCredentials> {
        logi("No cached YouTube credentials. Open this URL, grant access,");
        logi("then paste the 'code' parameter from the redirect below:");
        logi(self.consent_url());

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        stdin
            .read_line(&mut line)
            .await
            .context("Failed to read authorization code from stdin")?;
        let code = line.trim();
        if code.is_empty() {
            return Err(PipelineError::upload_auth("no authorization code entered").into());
        }

        self.exchange_code(code).await
    }

    pub async fn exchange_code(&self, code: &str) -> Result<StoredCredentials> {
        let token = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", REDIRECT_URI),
            ])
            .await?;

        if token.refresh_token.is_none() {
            logw("Authorization grant carried no refresh token; next run will prompt again.");
        }
        Ok(credentials_from(token, None))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<StoredCredentials> {
        let token = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        // Refresh responses usually omit the refresh token; keep the old one.
        Ok(credentials_from(token, Some(refresh_token.to_string())))
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let resp = self
            .client
            .post(OAUTH_TOKEN_URL)
            .form(params)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .context("OAuth token request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            logw(format!("OAuth token endpoint HTTP {}: {}", status.as_u16(), snippet(&raw)));
            return Err(PipelineError::upload_auth(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            ))
            .into());
        }

        serde_json::from_str(&raw).context("OAuth token response parse failed")
    }

    /// Chunked resumable upload: initiate a session, then PUT fixed-size
    /// chunks until the service answers with the finished video resource.
    pub async fn upload_video(
        &self,
        access_token: &str,
        video_path: &Path,
        meta: &VideoMetadata,
    ) -> Result<String> {
        let data = fs::read(video_path)
            .await
            .with_context(|| format!("Failed to read video: {}", video_path.display()))?;
        let total = data.len();
        if total == 0 {
            anyhow::bail!("Video file is empty: {}", video_path.display());
        }

        let body = json!({
            "snippet": {
                "title": meta.title,
                "description": meta.description,
                "tags": meta.tags,
                "categoryId": meta.category_id,
            },
            "status": {
                "privacyStatus": meta.privacy_status,
            },
        });

        let resp = self
            .client
            .post(UPLOAD_URL)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", total.to_string())
            .json(&body)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await
            .context("Upload session request failed")?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let raw = resp.text().await.unwrap_or_default();
            logw(format!("Upload session HTTP {}: {}", status.as_u16(), snippet(&raw)));
            return Err(PipelineError::upload_auth(format!(
                "upload session rejected with HTTP {}",
                status.as_u16()
            ))
            .into());
        }
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            logw(format!("Upload session HTTP {}: {}", status.as_u16(), snippet(&raw)));
            anyhow::bail!("Upload session failed with HTTP {}", status.as_u16());
        }

        let session_url = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Upload session response had no Location header"))?;

        let mut offset = 0usize;
        loop {
            let end = (offset + CHUNK_SIZE).min(total);
            let chunk = data[offset..end].to_vec();

            let resp = self
                .client
                .put(&session_url)
                .bearer_auth(access_token)
                .header(CONTENT_TYPE, "video/mp4")
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", offset, end - 1, total))
                .body(chunk)
                .timeout(std::time::Duration::from_secs(600))
                .send()
                .await
                .context("Chunk upload failed")?;

            match resp.status().as_u16() {
                // 308: service acknowledges the range, keep going.
                308 => {
                    let confirmed = resp
                        .headers()
                        .get(RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(next_offset_from_range);
                    offset = confirmed.unwrap_or(end);
                    logi(format!("Uploading... {}% done", offset * 100 / total.max(1)));
                }
                200 | 201 => {
                    let raw = resp.text().await.unwrap_or_default();
                    let root: serde_json::Value = serde_json::from_str(&raw)
                        .context("Upload completion response parse failed")?;
                    let video_id = root
                        .get("id")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| {
                            anyhow::anyhow!("Upload completed but no video id in: {}", snippet(&raw))
                        })?;
                    logok(format!("Upload Complete! Video ID: {}", video_id));
                    return Ok(video_id.to_string());
                }
                401 | 403 => {
                    let raw = resp.text().await.unwrap_or_default();
                    logw(format!("Chunk upload auth failure: {}", snippet(&raw)));
                    return Err(PipelineError::upload_auth(
                        "access token rejected mid-upload".to_string(),
                    )
                    .into());
                }
                code => {
                    let raw = resp.text().await.unwrap_or_default();
                    logw(format!("Chunk upload HTTP {}: {}", code, snippet(&raw)));
                    anyhow::bail!("Chunk upload failed with HTTP {}", code);
                }
            }
        }
    }
}

fn credentials_from(token: TokenResponse, fallback_refresh: Option<String>) -> StoredCredentials {
    StoredCredentials {
        access_token: token.access_token,
        refresh_token: token.refresh_token.or(fallback_refresh),
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
    }
}

/// "bytes=0-1048575" from a 308 response means the next chunk starts at
/// 1048576.
fn next_offset_from_range(range: &str) -> Option<usize> {
    let (_, upper) = range.rsplit_once('-')?;
    upper.trim().parse::<usize>().ok().map(|n| n + 1)
}

fn snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_url_embeds_video_id() {
        assert_eq!(watch_url("xyz789"), "https://www.youtube.com/watch?v=xyz789");
    }

    #[test]
    fn range_header_yields_next_offset() {
        assert_eq!(next_offset_from_range("bytes=0-1048575"), Some(1048576));
        assert_eq!(next_offset_from_range("bytes=0-0"), Some(1));
        assert_eq!(next_offset_from_range("garbage"), None);
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let token = TokenResponse {
            access_token: "new-access".to_string(),
            expires_in: 3600,
            refresh_token: None,
        };
        let creds = credentials_from(token, Some("old-refresh".to_string()));
        assert_eq!(creds.refresh_token.as_deref(), Some("old-refresh"));
        assert!(!creds.needs_refresh());
    }

    #[test]
    fn consent_url_carries_offline_scope() {
        let cfg: crate::config::Config = serde_json::from_str(
            r#"{"youtube_client_id":"client-123","youtube_client_secret":"sec"}"#,
        )
        .unwrap();
        let uploader = YouTubeUploader::new(Client::new(), &cfg);
        let url = uploader.consent_url();
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("youtube.upload"));
    }
}
