use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Markers the generator is known to emit before the image description.
/// Kept in the pattern below; listed here so additions stay deliberate:
/// "Image prompt", "Visual prompt", "Prompt".
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^(.*?)(?:\*\*|\*)?\s*(?:image\s+prompt|visual\s+prompt|prompt)\s*[:\-–]\s*\**\s*(.+)$",
    )
    .expect("marker pattern must compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStory {
    pub story: String,
    pub image_prompt: String,
}

/// Split generated text into narrative and image description at the first
/// recognized marker. No marker means no guessed split — the caller gets
/// an error carrying the head of the offending text.
pub fn split_story_and_prompt(content: &str) -> Result<ParsedStory, PipelineError> {
    let caps = MARKER_RE.captures(content).ok_or_else(|| {
        let snippet: String = content.chars().take(200).collect();
        PipelineError::PromptParse { snippet }
    })?;

    let story = caps[1].trim().to_string();
    let image_prompt = caps[2].trim().to_string();
    if story.is_empty() || image_prompt.is_empty() {
        let snippet: String = content.chars().take(200).collect();
        return Err(PipelineError::PromptParse { snippet });
    }

    Ok(ParsedStory {
        story,
        image_prompt,
    })
}

/// Strip markdown decoration and control characters before handing the
/// prompt to the image service.
pub fn sanitize_image_prompt(prompt: &str) -> String {
    prompt
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '#' | '>' | '-') && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_image_prompt_marker() {
        let text = "Once upon a time there was a keeper.\n\nImage prompt: a lighthouse at dusk";
        let parsed = split_story_and_prompt(text).unwrap();
        assert_eq!(parsed.story, "Once upon a time there was a keeper.");
        assert_eq!(parsed.image_prompt, "a lighthouse at dusk");
    }

    #[test]
    fn tolerates_bold_marker_and_visual_variant() {
        let text = "A story about rain.\n\n**Visual prompt:** a storm over the sea";
        let parsed = split_story_and_prompt(text).unwrap();
        assert_eq!(parsed.story, "A story about rain.");
        assert_eq!(parsed.image_prompt, "a storm over the sea");
    }

    #[test]
    fn tolerates_bare_prompt_with_dash_separator() {
        let text = "The last train left at midnight.\nPrompt - an empty platform under sodium lights";
        let parsed = split_story_and_prompt(text).unwrap();
        assert_eq!(
            parsed.image_prompt,
            "an empty platform under sodium lights"
        );
    }

    #[test]
    fn marker_is_case_insensitive() {
        let text = "Short story.\nIMAGE PROMPT: a red door";
        let parsed = split_story_and_prompt(text).unwrap();
        assert_eq!(parsed.image_prompt, "a red door");
    }

    #[test]
    fn no_marker_is_a_parse_error_not_a_guess() {
        let err = split_story_and_prompt("Just a story with no delimiter at all.").unwrap_err();
        assert!(matches!(err, PipelineError::PromptParse { .. }));
    }

    #[test]
    fn empty_prompt_after_marker_is_rejected() {
        // Whole-text match fails when nothing follows the separator.
        let err = split_story_and_prompt("Story here.\nImage prompt:   ").unwrap_err();
        assert!(matches!(err, PipelineError::PromptParse { .. }));
    }

    #[test]
    fn sanitize_strips_markdown_and_control_characters() {
        let cleaned = sanitize_image_prompt("**a _glowing_ `lighthouse`**\u{7} #night");
        assert_eq!(cleaned, "a glowing lighthouse night");
    }
}
