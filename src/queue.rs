use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// One pending unit of work: a story waiting to become a published video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub story: String,
    pub image_prompt: String,
    pub image_path: String,
}

/// File-backed FIFO of pending records. The publisher consumes the head
/// and must persist the remainder before any remote work starts; the
/// producer appends. No locking — single writer at a time by contract.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full pending list. A missing file is an error, not an
    /// empty queue: the publisher must refuse to run instead of silently
    /// producing nothing.
    pub async fn load(&self) -> Result<Vec<QueueRecord>> {
        if fs::metadata(&self.path).await.is_err() {
            return Err(PipelineError::MissingQueue {
                path: self.path.clone(),
            }
            .into());
        }
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read queue: {}", self.path.display()))?;
        let records: Vec<QueueRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse queue: {}", self.path.display()))?;
        Ok(records)
    }

    /// Producer-side load: a missing file means "first batch", not an error.
    pub async fn load_or_default(&self) -> Result<Vec<QueueRecord>> {
        match self.load().await {
            Ok(records) => Ok(records),
            Err(err) => match err.downcast_ref::<PipelineError>() {
                Some(PipelineError::MissingQueue { .. }) => Ok(Vec::new()),
                _ => Err(err),
            },
        }
    }

    /// Persist the full sequence. Written to a sibling temp path and
    /// renamed so a concurrent reader never observes a partial document.
    pub async fn save(&self, records: &[QueueRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create dir {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write queue temp: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace queue: {}", self.path.display()))?;
        Ok(())
    }

    /// Split off the head. The caller must `save` the remainder before
    /// doing anything else with the head.
    pub fn pop_head(
        mut records: Vec<QueueRecord>,
    ) -> Result<(QueueRecord, Vec<QueueRecord>), PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyQueue);
        }
        let head = records.remove(0);
        Ok((head, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn record(story: &str) -> QueueRecord {
        QueueRecord {
            story: story.to_string(),
            image_prompt: format!("{story} scene"),
            image_path: format!("portraits/{story}.png"),
        }
    }

    #[tokio::test]
    async fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("story_queue.json"));
        let err = store.load().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingQueue { .. })
        ));
    }

    #[tokio::test]
    async fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("story_queue.json"));
        assert!(store.load_or_default().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("story_queue.json"));
        let records = vec![record("one"), record("two"), record("three")];
        store.save(&records).await.unwrap();
        let loaded = store.load().await.unwrap();
        let stories: Vec<&str> = loaded.iter().map(|r| r.story.as_str()).collect();
        assert_eq!(stories, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn pop_head_then_save_drops_exactly_the_head() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("story_queue.json"));
        store
            .save(&[record("one"), record("two"), record("three")])
            .await
            .unwrap();

        let records = store.load().await.unwrap();
        let (head, remainder) = QueueStore::pop_head(records).unwrap();
        assert_eq!(head.story, "one");
        store.save(&remainder).await.unwrap();

        let after = store.load().await.unwrap();
        let stories: Vec<&str> = after.iter().map(|r| r.story.as_str()).collect();
        assert_eq!(stories, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn pop_head_on_empty_queue_fails() {
        let err = QueueStore::pop_head(Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyQueue));
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story_queue.json");
        let store = QueueStore::new(&path);
        store.save(&[record("one")]).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
