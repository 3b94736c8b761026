use crate::api::did::{TalkScript, TalksClient};
use crate::api::elevenlabs;
use crate::api::youtube::{VideoMetadata, YouTubeUploader, watch_url};
use crate::auth::FileCredentialStore;
use crate::config::{Config, NarrationMode};
use crate::poll::PollPolicy;
use crate::portrait;
use crate::queue::QueueStore;
use crate::{logi, logok};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const NARRATION_MP3: &str = "work/story.mp3";
const TITLE_PREFIX: &str = "AI Story Shorts | ";
const TITLE_STORY_CHARS: usize = 40;
const UPLOAD_TAGS: &[&str] = &["Shorts", "AI Story"];
const UPLOAD_CATEGORY: &str = "22";

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }

    let mut cut = max_bytes.min(input.len());
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

fn video_title(story: &str) -> String {
    format!("{TITLE_PREFIX}{}", trim_copy_utf8_safe(story, TITLE_STORY_CHARS))
}

/// Publisher: consume one queued record end to end. Every stage failure
/// is fatal to the run; nothing is retried across stage boundaries.
pub async fn run_publish() -> Result<()> {
    let cfg = Config::load("config.json").await?;
    cfg.require_publisher_keys()?;

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let store = QueueStore::new(&cfg.queue_file);
    let records = store.load().await?;
    let (head, remainder) = QueueStore::pop_head(records)?;
    // Remainder hits disk before any remote work: a crash past this point
    // drops the in-flight record rather than repeating it.
    store.save(&remainder).await?;
    logok(format!(
        "Dequeued one record; {} left in {}",
        remainder.len(),
        store.path().display()
    ));

    let portrait_path = portrait::prepare_portrait(Path::new(&head.image_path))?;
    logi(format!("Using portrait: {}", portrait_path.display()));

    let talks = TalksClient::from_config(client.clone(), &cfg)?;
    let source_url = talks.upload_portrait(&portrait_path).await?;
    logok(format!("Portrait hosted at: {source_url}"));

    let script = match cfg.narration {
        NarrationMode::Audio => {
            let mp3 = PathBuf::from(NARRATION_MP3);
            logi("Synthesizing narration...");
            elevenlabs::elevenlabs_tts_to_mp3(&client, &cfg, &head.story, &mp3).await?;
            let audio_url = talks.upload_narration(&mp3).await?;
            logok(format!("Narration hosted at: {audio_url}"));
            TalkScript::Audio { audio_url }
        }
        NarrationMode::Text => TalkScript::Text {
            input: head.story.clone(),
            voice_id: cfg.provider_voice_id.clone(),
        },
    };

    let talk_id = talks.create_talk(&source_url, &script).await?;
    logok(format!("Video job submitted: {talk_id}"));

    let policy = PollPolicy::new(cfg.poll_attempts, cfg.poll_interval());
    let result_url = talks.wait_for_result(&talk_id, &policy).await?;
    logok(format!("Video ready: {result_url}"));

    let video_path = PathBuf::from(&cfg.video_output);
    talks.download_video(&result_url, &video_path).await?;
    logok(format!("Video saved as {}", video_path.display()));

    let uploader = YouTubeUploader::new(client.clone(), &cfg);
    let token_store = FileCredentialStore::new(&cfg.youtube_token_file);
    let access_token = uploader.ensure_access_token(&token_store).await?;

    let meta = VideoMetadata {
        title: video_title(&head.story),
        description: head.story.clone(),
        tags: UPLOAD_TAGS.iter().map(|t| t.to_string()).collect(),
        category_id: UPLOAD_CATEGORY.to_string(),
        privacy_status: cfg.privacy_status.clone(),
    };
    let video_id = uploader.upload_video(&access_token, &video_path, &meta).await?;
    logok(watch_url(&video_id));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_prefixed_and_truncated() {
        let story = "Once upon a time there was a keeper of a lonely lighthouse far away";
        let title = video_title(story);
        assert!(title.starts_with("AI Story Shorts | Once upon a time"));
        assert!(title.len() <= TITLE_PREFIX.len() + TITLE_STORY_CHARS);
    }

    #[test]
    fn short_story_title_is_untruncated() {
        assert_eq!(video_title("A tiny tale"), "AI Story Shorts | A tiny tale");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let story = "é".repeat(60);
        let title = video_title(&story);
        // Must not panic on a boundary and must stay within budget.
        assert!(title.len() <= TITLE_PREFIX.len() + TITLE_STORY_CHARS);
        assert!(title.chars().count() > TITLE_PREFIX.chars().count());
    }
}
