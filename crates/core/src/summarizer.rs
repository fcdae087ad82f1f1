//! The summarization collaborator seam.
//!
//! Condensation can optionally use an abstractive summarizer (typically an
//! LLM call). The engine treats it as slow and unreliable: any error here is
//! caught and the engine falls back to deterministic truncation. Latency
//! budgets and timeouts are the implementation's own responsibility; the
//! core never blocks on anything but this call.

use thiserror::Error;

/// Errors a summarizer backend may report.
#[derive(Debug, Clone, Error)]
pub enum SummarizerError {
    #[error("summarizer backend failed: {0}")]
    Backend(String),

    #[error("summarizer timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("summarizer returned empty output")]
    EmptyOutput,
}

/// A pluggable content summarizer.
pub trait Summarizer: Send + Sync {
    /// Produce a summary of `text` aiming at roughly `target_tokens`.
    ///
    /// `relevance_hint`, when present, tells the summarizer what the caller
    /// currently cares about so it can bias what survives. The output is a
    /// best-effort aim, not a guarantee; the condensation engine re-checks
    /// the result against its budget.
    fn summarize(
        &self,
        text: &str,
        target_tokens: usize,
        relevance_hint: Option<&str>,
    ) -> Result<String, SummarizerError>;
}
