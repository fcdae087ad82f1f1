//! Content condensation — shrink a block of text or history to a target
//! token count before it enters the packer.
//!
//! The engine prefers an injected [`Summarizer`] when one is configured,
//! but every path is backstopped by deterministic character-ratio
//! truncation: a summarizer that fails or overshoots its target by more
//! than the overshoot factor is abandoned in favor of truncation. The
//! engine makes at most one truncation pass plus one hard cut; it never
//! loops chasing an exact token count, because estimation is approximate
//! and non-invertible.

use crate::token::{truncate_chars, TokenCostEstimator};
use promptloom_core::message::HistoryMessage;
use promptloom_core::summarizer::Summarizer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How the engine should reduce oversized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CondensationStrategy {
    /// Summarize when a summarizer is configured, otherwise truncate.
    #[default]
    Auto,
    /// Deterministic truncation only; never invoke the summarizer.
    Truncate,
    /// Require summarization; falls back to truncation (with a warning)
    /// when no summarizer is configured or it fails.
    Summarize,
}

/// The content to condense.
#[derive(Debug, Clone)]
pub enum CondensationSource {
    Text(String),
    History(Vec<HistoryMessage>),
}

impl From<String> for CondensationSource {
    fn from(text: String) -> Self {
        CondensationSource::Text(text)
    }
}

impl From<&str> for CondensationSource {
    fn from(text: &str) -> Self {
        CondensationSource::Text(text.to_string())
    }
}

impl From<Vec<HistoryMessage>> for CondensationSource {
    fn from(messages: Vec<HistoryMessage>) -> Self {
        CondensationSource::History(messages)
    }
}

/// A single condensation call. Created and consumed within one
/// [`CondensationEngine::condense`] invocation.
#[derive(Debug, Clone)]
pub struct CondensationRequest {
    pub source: CondensationSource,
    pub target_tokens: usize,
    pub relevance_hint: Option<String>,
    pub strategy: CondensationStrategy,
}

impl CondensationRequest {
    pub fn new(source: impl Into<CondensationSource>, target_tokens: usize) -> Self {
        Self {
            source: source.into(),
            target_tokens,
            relevance_hint: None,
            strategy: CondensationStrategy::Auto,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.relevance_hint = Some(hint.into());
        self
    }

    pub fn with_strategy(mut self, strategy: CondensationStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Tuning knobs for the condensation engine.
#[derive(Debug, Clone)]
pub struct CondenserOptions {
    /// A summarizer result estimating above `target × overshoot_factor`
    /// is discarded in favor of truncation.
    pub overshoot_factor: f32,

    /// Characters per token assumed by the first truncation pass.
    pub truncate_chars_per_token: f32,

    /// Characters per token for the single hard cut applied when the
    /// first pass still estimates over target.
    pub hard_cut_chars_per_token: f32,
}

impl Default for CondenserOptions {
    fn default() -> Self {
        Self {
            overshoot_factor: 1.2,
            truncate_chars_per_token: 3.5,
            hard_cut_chars_per_token: 3.0,
        }
    }
}

/// Reduces text or history to at most a target token count.
pub struct CondensationEngine {
    estimator: Arc<TokenCostEstimator>,
    summarizer: Option<Box<dyn Summarizer>>,
    options: CondenserOptions,
}

impl CondensationEngine {
    /// Engine without a summarizer: truncation only.
    pub fn new(estimator: Arc<TokenCostEstimator>, options: CondenserOptions) -> Self {
        Self {
            estimator,
            summarizer: None,
            options,
        }
    }

    /// Engine with an abstractive summarizer backing the Auto/Summarize
    /// strategies.
    pub fn with_summarizer(
        estimator: Arc<TokenCostEstimator>,
        options: CondenserOptions,
        summarizer: Box<dyn Summarizer>,
    ) -> Self {
        Self {
            estimator,
            summarizer: Some(summarizer),
            options,
        }
    }

    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    /// Condense the request's source to at most its target token count
    /// (modulo the documented summarizer overshoot allowance).
    ///
    /// Already-short input is returned unchanged apart from a whitespace
    /// trim. Empty input and a zero target both yield empty output without
    /// touching the summarizer.
    pub fn condense(&self, request: &CondensationRequest) -> String {
        let flat = flatten(&request.source);
        if flat.is_empty() {
            debug!("empty source, nothing to condense");
            return String::new();
        }
        if request.target_tokens == 0 {
            debug!("target of zero tokens, condensing to empty");
            return String::new();
        }

        let current = self.estimator.estimate(&flat);
        if current <= request.target_tokens {
            debug!(
                current,
                target = request.target_tokens,
                "source already within target"
            );
            return flat.trim().to_string();
        }

        info!(
            current,
            target = request.target_tokens,
            strategy = ?request.strategy,
            "condensing oversized source"
        );

        if request.strategy != CondensationStrategy::Truncate {
            if let Some(candidate) = self.try_summarize(request, &flat) {
                return candidate;
            }
            if request.strategy == CondensationStrategy::Summarize && self.summarizer.is_none() {
                warn!("summarize strategy requested but no summarizer configured, truncating");
            }
        }

        self.truncate(&flat, request.target_tokens)
    }

    /// Run the summarizer, if configured, and accept its output when it
    /// lands within the overshoot allowance. `None` means "fall back to
    /// truncation".
    fn try_summarize(&self, request: &CondensationRequest, flat: &str) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        match summarizer.summarize(
            flat,
            request.target_tokens,
            request.relevance_hint.as_deref(),
        ) {
            Ok(candidate) => {
                let estimate = self.estimator.estimate(&candidate);
                let allowance =
                    (request.target_tokens as f32 * self.options.overshoot_factor) as usize;
                if estimate <= allowance {
                    info!(
                        estimate,
                        target = request.target_tokens,
                        "summarizer output accepted"
                    );
                    Some(candidate.trim().to_string())
                } else {
                    warn!(
                        estimate,
                        allowance, "summarizer overshot target, falling back to truncation"
                    );
                    None
                }
            }
            Err(e) => {
                warn!(error = %e, "summarizer failed, falling back to truncation");
                None
            }
        }
    }

    /// One prefix cut sized by the truncation ratio; if the result still
    /// estimates over target, one final hard cut. No further passes.
    fn truncate(&self, flat: &str, target_tokens: usize) -> String {
        let keep = (target_tokens as f32 * self.options.truncate_chars_per_token) as usize;
        let mut cut = truncate_chars(flat, keep);
        let after_cut = self.estimator.estimate(cut);
        if after_cut > target_tokens {
            let hard_keep = (target_tokens as f32 * self.options.hard_cut_chars_per_token) as usize;
            cut = truncate_chars(cut, hard_keep);
            warn!(
                after_cut,
                target = target_tokens,
                hard_keep,
                "first truncation pass still over target, applied hard cut"
            );
        }
        debug!(
            final_estimate = self.estimator.estimate(cut),
            target = target_tokens,
            "truncation complete"
        );
        cut.trim().to_string()
    }
}

/// Normalize a source into flat text: strings pass through, histories
/// become `role: content` lines in original order.
fn flatten(source: &CondensationSource) -> String {
    match source {
        CondensationSource::Text(text) => text.clone(),
        CondensationSource::History(messages) => messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
