//! Corpus and CSV loading for the CLI.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::text::tokenize::Tokenizer;
use crate::HashedMlError;

/// One `(features, label)` training or test row.
pub type Sample = (Vec<String>, String);

/// Tokens read from a set of input files.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Concatenated tokens, punctuation-merged across file boundaries.
    pub tokens: Vec<String>,

    /// Files that could not be read, with the reason.
    pub skipped: Vec<HashedMlError>,
}

impl Corpus {
    /// Read and tokenize every path. Unreadable files are logged and skipped.
    pub fn load<P: AsRef<Path>>(tokenizer: &Tokenizer, paths: &[P]) -> Self {
        let mut raw = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            let path = path.as_ref();
            tracing::info!("input-file: {}", path.display());
            match std::fs::read_to_string(path) {
                Ok(text) => raw.extend(tokenizer.split(&text)),
                Err(source) => {
                    let err = HashedMlError::UnreadableInput {
                        path: path.to_path_buf(),
                        source,
                    };
                    tracing::warn!("skipping: {}", err);
                    skipped.push(err);
                }
            }
        }
        Self {
            tokens: crate::text::tokenize::merge_punctuation(raw),
            skipped,
        }
    }

    /// Paths that were skipped.
    pub fn skipped_paths(&self) -> Vec<&PathBuf> {
        self.skipped
            .iter()
            .filter_map(|e| match e {
                HashedMlError::UnreadableInput { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }
}

/// Sliding training windows of width `nback`: the first `nback - 1` tokens
/// are the features, the last one the label.
pub fn training_windows(tokens: &[String], nback: usize) -> Vec<Sample> {
    let mut window: VecDeque<&String> = VecDeque::with_capacity(nback);
    let mut samples = Vec::new();
    for token in tokens {
        if window.len() == nback {
            window.pop_front();
        }
        window.push_back(token);
        if window.len() != nback || nback == 0 {
            continue;
        }
        let features = window.iter().take(nback - 1).map(|t| t.to_string()).collect();
        let label = window[nback - 1].clone();
        samples.push((features, label));
    }
    samples
}

/// Split one comma-separated line: every field but the last is a feature,
/// the last is the label.
pub fn parse_csv_line(line: &str) -> Sample {
    let mut fields: Vec<String> = line.split(',').map(str::to_string).collect();
    // `split` always yields at least one field.
    let label = fields.pop().unwrap_or_default();
    (fields, label)
}

/// Read a CSV file of samples. Blank lines are ignored.
pub fn read_csv(path: &Path) -> anyhow::Result<Vec<Sample>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok(text
        .trim()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_csv_line)
        .collect())
}

/// Seed tokens from free text: split on plain spaces, keep at most `limit`.
pub fn seed_tokens(text: &str, limit: usize) -> Vec<String> {
    text.split(' ').take(limit).map(str::to_string).collect()
}
