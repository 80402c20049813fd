//! Tokenization and word windows.
//!
//! Training text is split into word-ish runs and non-word runs (whitespace
//! and punctuation clusters are tokens too, so newlines survive into the
//! generated text). A merge pass then glues standalone punctuation onto the
//! preceding token.

use regex::Regex;

use crate::Result;

/// Word runs (with inline quotes and sentence punctuation) or non-word runs.
const TOKEN_PATTERN: &str = r#"[\w'?"!,.]+|[^\w]+"#;

/// Standalone tokens merged into the previous token.
const MERGE_PUNCTUATION: &[&str] = &[
    "\"", "'", "!", ",", ".", "?", ";", ":", "\u{201c}", "\u{201d}", "\u{2018}", "\u{2019}",
    "\u{2026}",
];

/// Regex tokenizer for training corpora.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    pattern: Regex,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(TOKEN_PATTERN)?,
        })
    }

    /// Raw token stream of `text`, without the punctuation merge.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Tokens of `text` with standalone punctuation merged.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        merge_punctuation(self.split(text))
    }
}

/// Glue standalone punctuation tokens onto the token before them.
pub fn merge_punctuation(tokens: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match merged.last_mut() {
            Some(prev) if MERGE_PUNCTUATION.contains(&token.as_str()) => prev.push_str(&token),
            _ => merged.push(token),
        }
    }
    merged
}

/// Words of `text`: whitespace-split, surrounding punctuation trimmed,
/// empty words dropped.
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Overlapping windows of `n` consecutive words (stride 1).
pub fn windows(text: &str, n: usize) -> Vec<Vec<&str>> {
    if n == 0 {
        return Vec::new();
    }
    words(text).windows(n).map(|w| w.to_vec()).collect()
}

/// Whether the last `n`-word window of `text` already occurs earlier.
/// Needs at least three windows before it can report a repeat.
pub fn repeats_last_window(text: &str, n: usize) -> bool {
    let all = windows(text, n);
    match all.split_last() {
        Some((last, earlier)) if all.len() >= crate::config::REPEAT_MIN_WINDOWS => {
            earlier.contains(last)
        }
        _ => false,
    }
}
