//! Instruction text sent to the generation service.

use crate::post::PostOptions;

/// Build the single instruction embedding the address, the three style
/// options and the configured locale/style directive.
pub fn build_prompt(address: &str, options: &PostOptions, directive: &str) -> String {
    let emoji_note = if options.emoji {
        "Use a few relevant emojis to make the post lively."
    } else {
        "Do not use any emojis."
    };

    let mut prompt = format!(
        r#"Read the web page at {address} and write a social media post that summarizes its content.

Requirements:
- Length: {length} ({words})
- Tone: {tone}
- {emoji_note}
- Output only the post text, no preamble like "Here is your post:"
- Include the link {address} in the post"#,
        address = address,
        length = options.length,
        words = options.length.word_range(),
        tone = options.tone,
        emoji_note = emoji_note,
    );

    let directive = directive.trim();
    if !directive.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(directive);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{Length, Tone};

    #[test]
    fn test_prompt_embeds_all_inputs() {
        let options = PostOptions {
            length: Length::Medium,
            tone: Tone::Professional,
            emoji: false,
        };
        let prompt = build_prompt("https://example.com/article", &options, "Respond in Spanish.");
        assert!(prompt.contains("https://example.com/article"));
        assert!(prompt.contains("Length: medium (between 50 and 150 words)"));
        assert!(prompt.contains("Tone: professional"));
        assert!(prompt.contains("Do not use any emojis."));
        assert!(prompt.ends_with("Respond in Spanish."));
    }

    #[test]
    fn test_prompt_emoji_and_blank_directive() {
        let options = PostOptions {
            length: Length::Short,
            tone: Tone::Enthusiastic,
            emoji: true,
        };
        let prompt = build_prompt("https://a.example", &options, "   ");
        assert!(prompt.contains("relevant emojis"));
        assert!(prompt.ends_with("Include the link https://a.example in the post"));
    }
}
