use std::path::PathBuf;
use thiserror::Error;

/// Terminal failures for a pipeline run. None of these are retried
/// internally; they propagate to the binary's main and abort the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("queue file not found at {path}; run ai-story-batch first")]
    MissingQueue { path: PathBuf },

    #[error("queue is empty; generate a new batch first")]
    EmptyQueue,

    #[error("no image prompt marker found in generated text: {snippet}")]
    PromptParse { snippet: String },

    #[error("video job submission rejected: {body}")]
    Submission { body: String },

    #[error("video job not ready after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("video download failed ({reason}): {url}")]
    Download { url: String, reason: String },

    #[error("YouTube authorization failed: {reason}")]
    UploadAuth { reason: String },
}

impl PipelineError {
    pub fn submission(body: impl Into<String>) -> Self {
        Self::Submission { body: body.into() }
    }

    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn upload_auth(reason: impl Into<String>) -> Self {
        Self::UploadAuth {
            reason: reason.into(),
        }
    }
}
