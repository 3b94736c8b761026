use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// OAuth tokens persisted between runs so the upload step only needs a
/// browser round-trip once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredCredentials {
    /// Tokens expiring within five minutes count as expired already, so
    /// a refresh happens before the upload starts rather than mid-chunk.
    pub fn needs_refresh(&self) -> bool {
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredCredentials>>;
    async fn save(&self, creds: &StoredCredentials) -> Result<()>;
}

/// Plain JSON file next to the config, standing in for the reference
/// implementation's token cache.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>> {
        if fs::metadata(&self.path).await.is_err() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read token cache: {}", self.path.display()))?;
        match serde_json::from_str::<StoredCredentials>(&content) {
            Ok(creds) => Ok(Some(creds)),
            Err(err) => {
                // Unreadable cache: fall back to a fresh grant.
                warn!("ignoring unreadable token cache {}: {err}", self.path.display());
                Ok(None)
            }
        }
    }

    async fn save(&self, creds: &StoredCredentials) -> Result<()> {
        let json = serde_json::to_string_pretty(creds)?;
        fs::write(&self.path, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write token cache: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_does_not_need_refresh() {
        let creds = StoredCredentials {
            access_token: "at".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!creds.needs_refresh());
    }

    #[test]
    fn token_expiring_inside_the_skew_window_needs_refresh() {
        let creds = StoredCredentials {
            access_token: "at".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::minutes(2),
        };
        assert!(creds.needs_refresh());
    }

    #[tokio::test]
    async fn unreadable_cache_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("youtube_token.json");
        tokio::fs::write(&path, b"not json at all").await.unwrap();
        let store = FileCredentialStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("youtube_token.json"));

        assert!(store.load().await.unwrap().is_none());

        let creds = StoredCredentials {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        store.save(&creds).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
    }
}
