//! Priority-ordered prompt packing under a global token budget.
//!
//! Components are committed greedily in priority order. History components
//! are packed with a recency bias (newest turns survive); everything else
//! commits whole or not at all, except the first, critical component, which
//! is truncated to the remaining budget rather than dropped. Once any
//! component fails to fit, nothing of lower priority is attempted;
//! simplistic but deterministic.
//!
//! # Determinism
//!
//! Identical components, budget, and priority order always produce the
//! identical prompt: no randomness, no wall-clock dependence.
//!
//! # The escape hatch
//!
//! Step-wise estimates of concatenation are not exactly additive, so the
//! joined prompt is re-estimated at the end; if it is over budget the whole
//! string gets one hard character-based cut and the discrepancy is logged
//! at error level. This is an intentional, documented fallback; the caller
//! always receives a budget-respecting string, never an error.

use crate::token::{truncate_chars, TokenCostEstimator};
use promptloom_core::message::HistoryMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ── Types ─────────────────────────────────────────────────────────────────

/// Content of a single named prompt component.
#[derive(Debug, Clone)]
pub enum ComponentContent {
    Text(String),
    History(Vec<HistoryMessage>),
}

impl ComponentContent {
    fn is_empty(&self) -> bool {
        match self {
            ComponentContent::Text(text) => text.is_empty(),
            ComponentContent::History(messages) => messages.is_empty(),
        }
    }
}

/// The named components submitted for one assembly call. Supplied fresh per
/// call; never persisted.
#[derive(Debug, Clone, Default)]
pub struct PromptComponents {
    map: HashMap<String, ComponentContent>,
}

impl PromptComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text component under `key`.
    pub fn text(mut self, key: impl Into<String>, content: impl Into<String>) -> Self {
        self.map
            .insert(key.into(), ComponentContent::Text(content.into()));
        self
    }

    /// Add a history component under `key`.
    pub fn history(mut self, key: impl Into<String>, messages: Vec<HistoryMessage>) -> Self {
        self.map
            .insert(key.into(), ComponentContent::History(messages));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ComponentContent> {
        self.map.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Well-known component keys.
pub const KEY_USER_QUERY: &str = "user_query";
pub const KEY_SYSTEM_MESSAGE: &str = "system_message";
pub const KEY_TASK_INSTRUCTIONS: &str = "task_instructions";
pub const KEY_HISTORY: &str = "history";
pub const KEY_RETRIEVED_KNOWLEDGE: &str = "retrieved_knowledge";

/// Tuning knobs for the assembler.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Keys in descending priority. Keys absent from the submitted
    /// components are skipped.
    pub priority_order: Vec<String>,

    /// Keys granted truncation-instead-of-omission treatment when they are
    /// the first component and do not fit.
    pub critical_keys: Vec<String>,

    /// Characters per token assumed when truncating a critical component
    /// or the final joined prompt.
    pub truncate_chars_per_token: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            priority_order: vec![
                KEY_USER_QUERY.into(),
                KEY_SYSTEM_MESSAGE.into(),
                KEY_TASK_INSTRUCTIONS.into(),
                KEY_HISTORY.into(),
                KEY_RETRIEVED_KNOWLEDGE.into(),
            ],
            critical_keys: vec![KEY_USER_QUERY.into(), KEY_SYSTEM_MESSAGE.into()],
            truncate_chars_per_token: 3,
        }
    }
}

/// Per-component statistics for a committed component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStats {
    /// Component key.
    pub key: String,
    /// Estimated tokens charged against the budget.
    pub tokens: usize,
    /// Whether the component was truncated to fit.
    pub truncated: bool,
    /// For history components: turns included / turns available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns: Option<(usize, usize)>,
}

/// A component omitted for exceeding the remaining budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmissionInfo {
    /// Component key.
    pub key: String,
    /// Tokens the component would have needed.
    pub tokens_needed: usize,
    /// Tokens that were still available.
    pub tokens_remaining: usize,
}

/// The assembled prompt plus assembly metadata.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    /// The final prompt string.
    pub text: String,
    /// Re-estimated token cost of `text`.
    pub estimated_cost: usize,
    /// The budget this assembly ran under.
    pub budget: usize,
    /// Committed components, in commit order.
    pub committed: Vec<ComponentStats>,
    /// Components omitted for exceeding budget.
    pub omitted: Vec<OmissionInfo>,
    /// Whether the final hard-truncation escape hatch fired.
    pub hard_truncated: bool,
}

impl AssembledPrompt {
    pub fn into_text(self) -> String {
        self.text
    }

    /// Budget utilization percentage (0.0–100.0).
    pub fn utilization_pct(&self) -> f32 {
        if self.budget == 0 {
            return 0.0;
        }
        (self.estimated_cost as f32 / self.budget as f32) * 100.0
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The prompt assembler. Stateless; create one and reuse it.
pub struct PromptAssembler {
    estimator: Arc<TokenCostEstimator>,
    options: AssemblerOptions,
}

impl PromptAssembler {
    pub fn new(estimator: Arc<TokenCostEstimator>) -> Self {
        Self {
            estimator,
            options: AssemblerOptions::default(),
        }
    }

    pub fn with_options(estimator: Arc<TokenCostEstimator>, options: AssemblerOptions) -> Self {
        Self { estimator, options }
    }

    /// Assemble the submitted components into a single prompt string under
    /// `max_tokens`.
    ///
    /// # Algorithm
    ///
    /// 1. Walk the priority order, skipping absent/empty components
    /// 2. History components pack newest-first against the remaining budget
    /// 3. Text components commit whole when they fit
    /// 4. A first, critical component that does not fit is truncated instead
    /// 5. The first misfit otherwise stops all lower-priority processing
    /// 6. Join with a blank line, re-estimate, hard-truncate if still over
    pub fn assemble(&self, components: &PromptComponents, max_tokens: usize) -> AssembledPrompt {
        let mut committed: Vec<String> = Vec::new();
        let mut stats: Vec<ComponentStats> = Vec::new();
        let mut omitted: Vec<OmissionInfo> = Vec::new();
        let mut running_total = 0usize;

        info!(max_tokens, components = components.len(), "assembling prompt");

        for key in &self.options.priority_order {
            let content = match components.get(key) {
                Some(content) if !content.is_empty() => content,
                _ => continue,
            };

            match content {
                ComponentContent::History(messages) => {
                    let (block, included) =
                        self.pack_history(messages, max_tokens, running_total);
                    if block.is_empty() {
                        // Not even the newest turn fit.
                        let needed = messages
                            .last()
                            .map_or(0, |m| self.estimator.estimate_message(m));
                        // Saturating: a prior history commit's separator
                        // charge may have nudged the total past the budget.
                        let remaining = max_tokens.saturating_sub(running_total);
                        warn!(
                            key = %key,
                            needed,
                            remaining,
                            "history component omitted, stopping at first overflow"
                        );
                        omitted.push(OmissionInfo {
                            key: key.clone(),
                            tokens_needed: needed,
                            tokens_remaining: remaining,
                        });
                        break;
                    }
                    let cost = self.estimator.estimate(&format!("{block}\n"));
                    running_total += cost;
                    debug!(key = %key, cost, included, total = messages.len(), "committed history");
                    committed.push(block);
                    stats.push(ComponentStats {
                        key: key.clone(),
                        tokens: cost,
                        truncated: included < messages.len(),
                        turns: Some((included, messages.len())),
                    });
                }
                ComponentContent::Text(text) => {
                    let formatted = format_component(key, text);
                    let cost = self.estimator.estimate(&format!("{formatted}\n"));
                    if running_total + cost <= max_tokens {
                        running_total += cost;
                        debug!(key = %key, cost, "committed component");
                        committed.push(formatted);
                        stats.push(ComponentStats {
                            key: key.clone(),
                            tokens: cost,
                            truncated: false,
                            turns: None,
                        });
                        continue;
                    }

                    let is_critical_first =
                        committed.is_empty() && self.options.critical_keys.iter().any(|k| k == key);
                    if is_critical_first {
                        let available_chars = max_tokens.saturating_sub(running_total)
                            * self.options.truncate_chars_per_token;
                        let truncated = truncate_chars(&formatted, available_chars).to_string();
                        let truncated_cost = self.estimator.estimate(&format!("{truncated}\n"));
                        running_total += truncated_cost;
                        info!(key = %key, truncated_cost, "critical component truncated to fit");
                        committed.push(truncated);
                        stats.push(ComponentStats {
                            key: key.clone(),
                            tokens: truncated_cost,
                            truncated: true,
                            turns: None,
                        });
                    } else {
                        let remaining = max_tokens.saturating_sub(running_total);
                        warn!(
                            key = %key,
                            needed = cost,
                            remaining,
                            "component omitted, stopping at first overflow"
                        );
                        omitted.push(OmissionInfo {
                            key: key.clone(),
                            tokens_needed: cost,
                            tokens_remaining: remaining,
                        });
                    }
                    // Once something doesn't fit, nothing of lower priority
                    // is attempted.
                    break;
                }
            }
        }

        let mut text = committed.join("\n\n").trim().to_string();
        let mut estimated_cost = self.estimator.estimate(&text);
        let mut hard_truncated = false;

        if estimated_cost > max_tokens {
            // Estimation non-additivity: the parts fit, the whole does not.
            error!(
                estimated_cost,
                max_tokens,
                "assembled prompt exceeds budget after packing, applying hard truncation"
            );
            let keep_chars = max_tokens * self.options.truncate_chars_per_token;
            text = truncate_chars(&text, keep_chars).trim_end().to_string();
            estimated_cost = self.estimator.estimate(&text);
            hard_truncated = true;
        }

        info!(
            estimated_cost,
            max_tokens,
            committed = stats.len(),
            omitted = omitted.len(),
            "prompt assembled"
        );

        AssembledPrompt {
            text,
            estimated_cost,
            budget: max_tokens,
            committed: stats,
            omitted,
            hard_truncated,
        }
    }

    /// Pack history turns newest-first: walk the sequence in reverse,
    /// tentatively prepending each rendered turn, and stop at the first one
    /// that would push the block past the remaining budget. Accepted turns
    /// come out in original chronological order.
    fn pack_history(
        &self,
        messages: &[HistoryMessage],
        max_tokens: usize,
        running_total: usize,
    ) -> (String, usize) {
        let mut lines: Vec<String> = Vec::new();
        for message in messages.iter().rev() {
            let line = message.render_line();
            let trial = if lines.is_empty() {
                line.clone()
            } else {
                // Candidate block with this turn prepended.
                let mut block = line.clone();
                for kept in lines.iter().rev() {
                    block.push('\n');
                    block.push_str(kept);
                }
                block
            };
            if running_total + self.estimator.estimate(&trial) <= max_tokens {
                lines.push(line);
            } else {
                debug!(
                    kept = lines.len(),
                    "history budget reached, dropping older turns"
                );
                break;
            }
        }
        let included = lines.len();
        lines.reverse();
        (lines.join("\n"), included)
    }
}

/// Role-specific formatting for text components. History blocks arrive
/// already rendered.
fn format_component(key: &str, content: &str) -> String {
    match key {
        KEY_USER_QUERY => format!("User: {content}"),
        KEY_TASK_INSTRUCTIONS => format!("Instructions: {content}"),
        KEY_RETRIEVED_KNOWLEDGE => format!("Context: {content}"),
        // System message and unknown keys pass through unprefixed.
        _ => content.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
