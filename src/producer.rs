use crate::api::{perplexity, stability};
use crate::config::Config;
use crate::prompt;
use crate::queue::{QueueRecord, QueueStore};
use crate::{logi, logok};
use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const STORY_THEMES: &[&str] = &[
    "an unlikely friendship",
    "a promise kept decades later",
    "a small act of courage",
    "something lost and found again",
    "a stranger who changes everything",
    "a secret place",
    "the last day of something",
];

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Batch producer: generate story + illustration pairs and append them to
/// the queue for the publisher to consume one per run.
pub async fn run_batch() -> Result<i32> {
    let cfg = Config::load("config.json").await?;
    cfg.require_producer_keys()?;

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let store = QueueStore::new(&cfg.queue_file);
    let mut queue = store.load_or_default().await?;

    let seed = now_seed();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    for i in 0..cfg.batch_size {
        logi(format!("Generating story and image {}/{}", i + 1, cfg.batch_size));

        let theme = STORY_THEMES[rng.gen_range(0..STORY_THEMES.len())];
        let user_prompt = format!("Give today's unique story. Theme hint: {theme}.");
        let parsed = perplexity::generate_story(&client, &cfg, &user_prompt).await?;

        let clean_prompt = prompt::sanitize_image_prompt(&parsed.image_prompt);
        let image_path = PathBuf::from(format!("portraits/image_{seed}_{i}.png"));
        stability::generate_image(&client, &cfg, &clean_prompt, &image_path).await?;
        logok(format!("Illustration saved: {}", image_path.display()));

        queue.push(QueueRecord {
            story: parsed.story,
            image_prompt: clean_prompt,
            image_path: image_path.display().to_string(),
        });
    }

    store.save(&queue).await?;
    logok(format!(
        "Queue saved: {} pending records ({})",
        queue.len(),
        store.path().display()
    ));

    Ok(cfg.batch_size as i32)
}
