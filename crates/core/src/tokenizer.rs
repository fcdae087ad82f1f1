//! The token-counting collaborator seam.
//!
//! A real tokenizer (BPE, model-specific, possibly remote) is injected
//! through this trait. The pipeline never depends on one being present or
//! working: `promptloom-context`'s estimator catches `TokenizerError` and
//! degrades to its character-ratio fallback.

use thiserror::Error;

/// Errors a tokenizer backend may report.
#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("tokenizer backend failed: {0}")]
    Backend(String),

    #[error("tokenizer does not support this input: {0}")]
    Unsupported(String),
}

/// A pluggable token counter.
///
/// Implementations must be deterministic: the same text always yields the
/// same count. They may be slow (e.g. a remote tokenizer); the caller treats
/// every invocation as fallible and recoverable.
pub trait Tokenizer: Send + Sync {
    /// Count the tokens in `text`. Must return 0 for empty input.
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}

/// A whitespace-splitting tokenizer, handy for tests and rough word budgets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.split_whitespace().count())
    }
}
