//! Prompt builder: source-specific, closed-world generation instructions.
//!
//! The generation step is told the exact list of citation labels it may
//! reference and is instructed never to reach outside it — the label set in
//! the prompt is exactly the set visible to the caller, so the model cannot
//! cite a passage the user never receives.

use crate::models::{SelectedPassage, Source};
use crate::sources;

/// Passage bodies are trimmed to this many characters in the user prompt.
const PASSAGE_EXCERPT_CHARS: usize = 300;

/// Templated phrases the model is told to avoid.
const FORBIDDEN_PHRASES: &[&str] = &[
    "I'll be praying for you",
    "Everything happens for a reason",
    "God never gives you more than you can handle",
    "Thoughts and prayers",
];

fn excerpt(text: &str) -> String {
    if text.chars().count() <= PASSAGE_EXCERPT_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PASSAGE_EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

fn citation_list(passages: &[SelectedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.reference.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn passages_block(passages: &[SelectedPassage]) -> String {
    passages
        .iter()
        .map(|p| format!("**{}**\n\"{}\"", p.reference, excerpt(&p.text)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the (system, user) instruction pair for a concern.
pub fn build(issue: &str, source: Source, passages: &[SelectedPassage]) -> (String, String) {
    let profile = sources::profile(source);

    let forbidden = FORBIDDEN_PHRASES
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let system = format!(
        "{persona}\n\n\
Rules:\n\
- You may cite ONLY these {noun}: {citations}. Never reference any \
{noun}, book, author, or material outside this list.\n\
- Cite the references naturally in your response (e.g. \"In {first}, ...\").\n\
- Write 2-4 short paragraphs.\n\
- Never use rote sign-offs or templated phrases such as {forbidden}.\n\
- Focus on comfort rather than advice.",
        persona = profile.persona,
        noun = profile.passage_noun,
        citations = citation_list(passages),
        first = passages
            .first()
            .map(|p| p.reference.as_str())
            .unwrap_or("the first reference"),
        forbidden = forbidden,
    );

    let user = format!(
        "A person shared: \"{issue}\"\n\n\
Here are the most relevant {noun} from {label}:\n\n\
{block}\n\n\
Write a compassionate response that:\n\
1. Acknowledges their concern with empathy\n\
2. Explains how these {noun} speak to their situation\n\
3. Offers hope and encouragement\n\
4. Naturally references the {noun} listed above, and only those",
        noun = sources::profile(source).passage_noun,
        label = sources::profile(source).label,
        block = passages_block(passages),
    );

    (system, user)
}

/// The shorter retry prompt used after a content-moderation false positive.
///
/// Drops the person's raw wording (the usual trigger) and asks for a brief
/// reflection on the already-selected passages alone.
pub fn build_simplified(source: Source, passages: &[SelectedPassage]) -> (String, String) {
    let profile = sources::profile(source);

    let system = format!(
        "{persona}\n\nCite ONLY these {noun}: {citations}. Write 2 short \
paragraphs of comfort and encouragement.",
        persona = profile.persona,
        noun = profile.passage_noun,
        citations = citation_list(passages),
    );

    let user = format!(
        "Someone is going through a hard time. Write a brief, gentle \
reflection on how these {noun} can bring them comfort:\n\n{block}",
        noun = profile.passage_noun,
        block = passages_block(passages),
    );

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(reference: &str, text: &str) -> SelectedPassage {
        SelectedPassage {
            reference: reference.to_string(),
            text: text.to_string(),
            score: 0.9,
            link: None,
        }
    }

    #[test]
    fn test_user_prompt_contains_every_citation() {
        let passages = vec![
            passage("Philippians 4:6-7", "Don't be anxious about anything."),
            passage("Psalms 34:18", "The LORD is near to the brokenhearted."),
        ];
        let (system, user) = build("I'm anxious about work", Source::Bible, &passages);
        for p in &passages {
            assert!(user.contains(&p.reference));
            assert!(system.contains(&p.reference));
        }
    }

    #[test]
    fn test_prompt_contains_no_foreign_citation() {
        let passages = vec![passage("Psalms 23:1-3", "The LORD is my shepherd.")];
        let (system, user) = build("I feel lost", Source::Bible, &passages);
        assert!(!system.contains("Romans"));
        assert!(!user.contains("Romans"));
    }

    #[test]
    fn test_prompt_embeds_concern_and_forbidden_phrases() {
        let passages = vec![passage("Job 42:10", "The LORD restored Job's fortunes.")];
        let (system, user) = build("I lost everything", Source::Bible, &passages);
        assert!(user.contains("I lost everything"));
        assert!(system.contains("Everything happens for a reason"));
    }

    #[test]
    fn test_persona_varies_by_source() {
        let passages = vec![passage("Goblet of Fire, Chapter 36", "...")];
        let (bible_sys, _) = build("grief", Source::Bible, &passages);
        let (hp_sys, _) = build("grief", Source::HarryPotter, &passages);
        assert_ne!(bible_sys, hp_sys);
        assert!(hp_sys.contains("narrative-wisdom"));
    }

    #[test]
    fn test_long_passages_are_excerpted() {
        let long_text = "word ".repeat(200);
        let passages = vec![passage("Psalms 119", &long_text)];
        let (_, user) = build("weary", Source::Bible, &passages);
        assert!(!user.contains(&long_text));
        assert!(user.contains("..."));
    }

    #[test]
    fn test_simplified_prompt_omits_raw_concern() {
        let passages = vec![passage("Psalms 34:18", "Near to the brokenhearted.")];
        let issue = "some very specific wording";
        let (system, user) = build_simplified(Source::Bible, &passages);
        assert!(!system.contains(issue) && !user.contains(issue));
        assert!(user.contains("Psalms 34:18"));
    }
}
