//! Output sanitizer for generated text.
//!
//! Some generation backends leak chat-template control tokens, stock
//! acknowledgment openers, rote personal closings, or a trailing word-count
//! annotation into their output. [`clean`] strips all of these from a
//! complete response; [`clean_chunk`] is the cheaper per-chunk variant for
//! streaming, where paragraph-level boilerplate cannot be detected
//! mid-stream. All removals are best-effort pattern matches; absence of a
//! match is not an error.

use regex::Regex;
use std::sync::LazyLock;

/// Exact control-token markers stripped in both batch and streaming modes.
const SPECIAL_TOKENS: &[&str] = &[
    "<|im_start|>",
    "<|im_end|>",
    "<|endoftext|>",
    "<|eot_id|>",
    "<|begin_of_text|>",
    "[INST]",
    "[/INST]",
    "<s>",
    "</s>",
];

/// Stock openers stripped from the start of a complete response.
const STOCK_OPENERS: &[&str] = &[
    "sure.",
    "sure!",
    "sure,",
    "certainly.",
    "certainly!",
    "of course.",
    "of course!",
    "here is a response:",
    "here's a response:",
    "here is my response:",
    "here's my response:",
];

/// Rote personal closings stripped when they form the final line.
const STOCK_CLOSINGS: &[&str] = &[
    "i'll be praying for you",
    "i will be praying for you",
    "i'm praying for you",
    "i am praying for you",
    "praying for you",
    "you're in my thoughts and prayers",
    "you are in my thoughts and prayers",
    "you're in my prayers",
    "you are in my prayers",
];

/// Trailing word-count annotation, e.g. `(152 words)` or `[Word count: 152]`.
static WORD_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[(\[]\s*(?:word count:?\s*)?\d+\s*words?\s*[)\]]\s*$")
        .expect("word count pattern is valid")
});

/// Strip every known special-token marker from a string.
fn strip_special_tokens(text: &str) -> String {
    let mut out = text.to_string();
    for token in SPECIAL_TOKENS {
        if out.contains(token) {
            out = out.replace(token, "");
        }
    }
    out
}

/// Clean a complete generated response.
pub fn clean(text: &str) -> String {
    let mut out = strip_special_tokens(text);
    let mut trimmed = out.trim().to_string();

    // Leading stock acknowledgments, possibly stacked ("Sure. Of course.").
    loop {
        let lowered = trimmed.to_lowercase();
        let Some(opener) = STOCK_OPENERS.iter().find(|o| lowered.starts_with(**o)) else {
            break;
        };
        trimmed = trimmed[opener.len()..].trim_start().to_string();
    }

    out = WORD_COUNT_RE.replace(&trimmed, "").trim_end().to_string();

    // Drop a final line that is nothing but a rote personal closing.
    if let Some(idx) = out.rfind('\n') {
        let last = out[idx + 1..].trim().to_lowercase();
        if STOCK_CLOSINGS
            .iter()
            .any(|c| last.starts_with(*c) && last.len() <= c.len() + 4)
        {
            out.truncate(idx);
        }
    }

    out.trim().to_string()
}

/// Clean a single streaming chunk.
///
/// Only exact special-token markers are stripped; returning an empty string
/// signals the caller not to emit the chunk downstream.
pub fn clean_chunk(chunk: &str) -> String {
    strip_special_tokens(chunk)
}
