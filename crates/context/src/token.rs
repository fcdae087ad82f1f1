//! Token estimation utilities.
//!
//! The estimator is pluggable: inject a real [`Tokenizer`] for
//! model-accurate counts, or run on the built-in character heuristic
//! (~4 characters per token, accurate within ~10% for BPE tokenizers on
//! English text). A failing injected tokenizer never surfaces to callers;
//! the estimate degrades to the heuristic and the failure is logged.

use promptloom_core::message::HistoryMessage;
use promptloom_core::tokenizer::Tokenizer;
use tracing::{debug, warn};

/// Characters per token assumed by the fallback heuristic.
pub const FALLBACK_CHARS_PER_TOKEN: usize = 4;

/// Pluggable, deterministic token-cost estimator.
pub struct TokenCostEstimator {
    tokenizer: Option<Box<dyn Tokenizer>>,
}

impl TokenCostEstimator {
    /// Estimator backed by an injected tokenizer, with heuristic fallback.
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            tokenizer: Some(tokenizer),
        }
    }

    /// Estimator using only the character heuristic.
    pub fn fallback() -> Self {
        Self { tokenizer: None }
    }

    /// Whether a real tokenizer is configured.
    pub fn has_tokenizer(&self) -> bool {
        self.tokenizer.is_some()
    }

    /// Estimate the token count for a string. Empty text is 0 tokens.
    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        if let Some(tokenizer) = &self.tokenizer {
            match tokenizer.count_tokens(text) {
                Ok(count) => return count,
                Err(e) => {
                    warn!(error = %e, "injected tokenizer failed, using fallback estimate");
                }
            }
        }
        let estimated = fallback_estimate(text);
        debug!(estimated, len = text.len(), "heuristic token estimate");
        estimated
    }

    /// Estimate tokens for a rendered message line (`Role: content`).
    pub fn estimate_message(&self, message: &HistoryMessage) -> usize {
        self.estimate(&message.render_line())
    }

    /// Estimate tokens for a sequence of messages, one rendered line each.
    pub fn estimate_history(&self, messages: &[HistoryMessage]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Split `text` into chunks each estimated at or under
    /// `max_tokens_per_chunk`, breaking on whitespace.
    ///
    /// A single word that alone exceeds the cap becomes its own chunk
    /// rather than being split mid-word.
    pub fn chunk_by_tokens(&self, text: &str, max_tokens_per_chunk: usize) -> Vec<String> {
        if text.trim().is_empty() || max_tokens_per_chunk == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for word in text.split_whitespace() {
            if current.is_empty() {
                current.push(word);
                continue;
            }
            let mut candidate = current.join(" ");
            candidate.push(' ');
            candidate.push_str(word);
            if self.estimate(&candidate) > max_tokens_per_chunk {
                chunks.push(current.join(" "));
                current = vec![word];
            } else {
                current.push(word);
            }
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        debug!(chunks = chunks.len(), max_tokens_per_chunk, "chunked text");
        chunks
    }
}

impl Default for TokenCostEstimator {
    fn default() -> Self {
        Self::fallback()
    }
}

/// The character-ratio heuristic: 1 token ≈ 4 characters, rounded up.
/// Counts chars, not bytes, so every ratio-sized cut taken against this
/// estimate stays within budget on multibyte text too.
pub fn fallback_estimate(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.chars().count() + FALLBACK_CHARS_PER_TOKEN - 1) / FALLBACK_CHARS_PER_TOKEN
}

/// Keep at most `max_chars` characters of `text`, respecting char
/// boundaries. Shared by the condenser's and assembler's truncation paths.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
