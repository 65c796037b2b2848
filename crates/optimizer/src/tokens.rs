use crate::error::{OptimizationError, Result};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Deterministic token counting for budget enforcement
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    fn name(&self) -> &str;
}

/// Counts Unicode word-boundary segments that are not whitespace.
///
/// Identifiers, numbers and each punctuation mark are one token apiece, which
/// tracks BPE tokenizers closely enough for budgeting source code.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_word_bounds()
            .filter(|segment| !segment.trim().is_empty())
            .count()
    }

    fn name(&self) -> &str {
        "approx"
    }
}

/// Exact counts from a Hugging Face `tokenizer.json`
pub struct HfTokenCounter {
    tokenizer: tokenizers::Tokenizer,
    name: String,
}

impl HfTokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            OptimizationError::config(format!("failed to load tokenizer {}: {e}", path.display()))
        })?;
        Ok(Self {
            tokenizer,
            name: path.display().to_string(),
        })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(err) => {
                log::warn!("Tokenizer {} failed, using approximate count: {err}", self.name);
                ApproxTokenCounter.count(text)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
