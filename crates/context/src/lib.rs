//! Budgeted prompt assembly pipeline.
//!
//! Turns a variable, potentially oversized collection of text fragments
//! into a single prompt string that never exceeds a hard token budget,
//! degrading gracefully (eviction, truncation, summarization) when content
//! does not fit.
//!
//! # Pipeline (in order)
//!
//! | Stage | Component | Degradation |
//! |-------|-----------|-------------|
//! | 1. Estimate | [`TokenCostEstimator`] | Tokenizer failure → char heuristic |
//! | 2. Store | [`ConversationHistory`] | Oldest evicted first; oversized rejected |
//! | 3. Condense | [`CondensationEngine`] | Summarizer failure/overshoot → truncation |
//! | 4. Pack | [`PromptAssembler`] | Omit low priority; truncate critical; final hard cut |
//!
//! Every stage is synchronous, deterministic, pure computation; the only
//! external calls are the injected tokenizer and summarizer, and both are
//! caught at the seam. No degraded path raises; callers always get a
//! best-effort, budget-respecting value, and the degradation is logged.

pub mod assembler;
pub mod condenser;
pub mod history;
pub mod token;

pub use assembler::{
    AssembledPrompt, AssemblerOptions, ComponentContent, ComponentStats, OmissionInfo,
    PromptAssembler, PromptComponents, KEY_HISTORY, KEY_RETRIEVED_KNOWLEDGE, KEY_SYSTEM_MESSAGE,
    KEY_TASK_INSTRUCTIONS, KEY_USER_QUERY,
};
pub use condenser::{
    CondensationEngine, CondensationRequest, CondensationSource, CondensationStrategy,
    CondenserOptions,
};
pub use history::{AddOutcome, ConversationHistory, HistoryOptions};
pub use token::{TokenCostEstimator, FALLBACK_CHARS_PER_TOKEN};
