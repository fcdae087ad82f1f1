//! Conversation history store with token-ceiling eviction.
//!
//! Messages are stored in insertion (chronological) order with their
//! estimated cost; a running total is maintained so eviction never rescans
//! the sequence. Eviction is strictly FIFO at storage time; recency bias
//! belongs to the assembler, which repacks a snapshot at assembly time.
//!
//! A single message whose cost alone exceeds the ceiling is rejected, not
//! stored: eviction cannot make room for it. Rejection is reported through
//! the returned [`AddOutcome`] and a warning log, never an error.

use crate::token::TokenCostEstimator;
use promptloom_core::message::{HistoryMessage, Role};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tuning knobs for a history store.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Token ceiling the stored history must respect.
    pub max_tokens: usize,

    /// When set, eviction skips system messages. This deviates from the
    /// baseline strictly-FIFO policy: if only system messages remain and
    /// the incoming message still cannot fit, it is rejected.
    pub protect_system: bool,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            protect_system: false,
        }
    }
}

/// Result of an [`ConversationHistory::add_message`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Message appended; `cost` joined the running total.
    Stored { cost: usize },
    /// Message dropped: it could not fit even after eviction.
    Rejected { cost: usize },
}

impl AddOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, AddOutcome::Stored { .. })
    }
}

/// A stored message. Immutable once created; destroyed on eviction.
#[derive(Debug, Clone)]
struct StoredMessage {
    role: Role,
    content: String,
    cost: usize,
}

/// Ordered conversation history under a token ceiling.
pub struct ConversationHistory {
    estimator: Arc<TokenCostEstimator>,
    messages: Vec<StoredMessage>,
    total_cost: usize,
    options: HistoryOptions,
}

impl ConversationHistory {
    pub fn new(estimator: Arc<TokenCostEstimator>, options: HistoryOptions) -> Self {
        Self {
            estimator,
            messages: Vec::new(),
            total_cost: 0,
            options,
        }
    }

    /// Append a message, evicting oldest entries first if needed.
    ///
    /// If even a fully evicted store cannot hold the message, it is
    /// rejected and the store is left unchanged (beyond any eviction that
    /// already happened while trying to make room).
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) -> AddOutcome {
        let content = content.into();
        let cost = self.estimator.estimate(&content);
        debug!(role = %role, cost, len = content.len(), "adding message to history");

        self.evict_until_fits(cost);

        if self.total_cost + cost <= self.options.max_tokens {
            self.messages.push(StoredMessage {
                role,
                content,
                cost,
            });
            self.total_cost += cost;
            info!(role = %role, cost, total = self.total_cost, "message stored");
            AddOutcome::Stored { cost }
        } else {
            warn!(
                role = %role,
                cost,
                total = self.total_cost,
                max_tokens = self.options.max_tokens,
                "message rejected: does not fit even after eviction"
            );
            AddOutcome::Rejected { cost }
        }
    }

    /// Evict oldest messages until `additional` more tokens would fit under
    /// the ceiling, or nothing evictable remains. Returns the number of
    /// messages evicted.
    pub fn evict_until_fits(&mut self, additional: usize) -> usize {
        let mut evicted = 0;
        while self.total_cost + additional > self.options.max_tokens && !self.messages.is_empty() {
            let victim = match self.oldest_evictable() {
                Some(idx) => idx,
                None => break,
            };
            let removed = self.messages.remove(victim);
            self.total_cost -= removed.cost;
            evicted += 1;
            info!(
                role = %removed.role,
                cost = removed.cost,
                total = self.total_cost,
                "evicted oldest message to make room"
            );
        }
        evicted
    }

    fn oldest_evictable(&self) -> Option<usize> {
        if !self.options.protect_system {
            return Some(0);
        }
        self.messages.iter().position(|m| m.role != Role::System)
    }

    /// Ordered `{role, content}` snapshot with costs stripped, for the
    /// assembler. Pure read.
    pub fn snapshot(&self) -> Vec<HistoryMessage> {
        self.messages
            .iter()
            .map(|m| HistoryMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// Running token total of the stored history.
    pub fn current_token_count(&self) -> usize {
        self.total_cost
    }

    /// Remove all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.total_cost = 0;
        info!("history cleared");
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_tokens(&self) -> usize {
        self.options.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_tokens: usize) -> ConversationHistory {
        ConversationHistory::new(
            Arc::new(TokenCostEstimator::fallback()),
            HistoryOptions {
                max_tokens,
                protect_system: false,
            },
        )
    }

    #[test]
    fn add_and_count() {
        let mut h = store(100);
        assert!(h.add_message(Role::User, "Hello").is_stored()); // 2 tokens
        assert_eq!(h.current_token_count(), 2);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn total_matches_sum_of_costs() {
        let mut h = store(100);
        h.add_message(Role::User, "Hello");
        h.add_message(Role::Assistant, "World");
        h.add_message(Role::User, "This is a test");
        let snapshot = h.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(h.current_token_count(), 2 + 2 + 4);
    }

    #[test]
    fn eviction_is_fifo() {
        // Scenario from the agent loop's own usage: max 10 tokens.
        let mut h = store(10);
        h.add_message(Role::User, "Hello"); // 2
        h.add_message(Role::Assistant, "World"); // 2, total 4
        h.add_message(Role::User, "This is a test"); // 4, total 8
        assert_eq!(h.current_token_count(), 8);

        // 3 tokens; 8 + 3 > 10 → evict "Hello", then 6 + 3 = 9 fits.
        h.add_message(Role::Assistant, "Another one");
        assert_eq!(h.current_token_count(), 9);
        let contents: Vec<String> = h.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["World", "This is a test", "Another one"]);
    }

    #[test]
    fn repeated_eviction() {
        let mut h = store(10);
        h.add_message(Role::User, "Hello"); // 2
        h.add_message(Role::Assistant, "World"); // 2
        h.add_message(Role::User, "This is a test"); // 4
        h.add_message(Role::Assistant, "Another one"); // 3, evicts Hello → 9

        // 4 tokens; evicts "World" (7+4>10) then "This is a test" → 3+4=7.
        h.add_message(Role::User, "Final message");
        assert_eq!(h.current_token_count(), 7);
        let contents: Vec<String> = h.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["Another one", "Final message"]);
    }

    #[test]
    fn oversized_message_rejected_on_empty_store() {
        let mut h = store(10);
        let outcome = h.add_message(Role::User, "x".repeat(1000));
        assert_eq!(outcome, AddOutcome::Rejected { cost: 250 });
        assert!(h.is_empty());
        assert_eq!(h.current_token_count(), 0);
    }

    #[test]
    fn oversized_message_still_evicts_then_rejects() {
        let mut h = store(10);
        h.add_message(Role::User, "Hello");
        h.add_message(Role::Assistant, "World");
        // The oversized message drains the store trying to make room and
        // is then rejected; ceiling invariant still holds.
        let outcome = h.add_message(Role::User, "y".repeat(200));
        assert!(!outcome.is_stored());
        assert!(h.current_token_count() <= 10);
    }

    #[test]
    fn snapshot_is_pure_read() {
        let mut h = store(100);
        h.add_message(Role::User, "stay put");
        let before = h.current_token_count();
        let snap = h.snapshot();
        assert_eq!(snap[0].content, "stay put");
        assert_eq!(h.current_token_count(), before);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn clear_empties_store() {
        let mut h = store(100);
        h.add_message(Role::User, "something");
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.current_token_count(), 0);
    }

    #[test]
    fn system_messages_not_protected_by_default() {
        let mut h = store(10);
        h.add_message(Role::System, "You are helpful."); // 4
        h.add_message(Role::User, "Hi"); // 1
        h.add_message(Role::Assistant, "Hello there"); // 3
        h.add_message(Role::User, "Question"); // 2, total 10
        // 4 tokens; evicts the system message first (FIFO, no protection).
        h.add_message(Role::Assistant, "Answer is long");
        let roles: Vec<Role> = h.snapshot().into_iter().map(|m| m.role).collect();
        assert!(!roles.contains(&Role::System));
        assert_eq!(h.current_token_count(), 10);
    }

    #[test]
    fn protect_system_skips_system_messages() {
        let mut h = ConversationHistory::new(
            Arc::new(TokenCostEstimator::fallback()),
            HistoryOptions {
                max_tokens: 10,
                protect_system: true,
            },
        );
        h.add_message(Role::System, "You are helpful."); // 4
        h.add_message(Role::User, "Hi"); // 1
        h.add_message(Role::Assistant, "Hello there"); // 3, total 8
        // 3 tokens; evicts "Hi", keeps the system message.
        h.add_message(Role::User, "Question #2?"); // 3
        let snap = h.snapshot();
        assert_eq!(snap[0].role, Role::System);
        assert!(h.current_token_count() <= 10);
    }

    #[test]
    fn protect_system_rejects_when_only_system_remains() {
        let mut h = ConversationHistory::new(
            Arc::new(TokenCostEstimator::fallback()),
            HistoryOptions {
                max_tokens: 10,
                protect_system: true,
            },
        );
        h.add_message(Role::System, "Long system rules here, quite long."); // 9
        let outcome = h.add_message(Role::User, "Cannot fit at all");
        assert!(!outcome.is_stored());
        assert_eq!(h.len(), 1);
        assert_eq!(h.snapshot()[0].role, Role::System);
    }

    #[test]
    fn ceiling_holds_after_every_add() {
        let mut h = store(25);
        let inputs = [
            "short",
            "a somewhat longer message body",
            "tiny",
            "yet another message that takes up some room",
            "x",
            "and one more for good measure, fairly long too",
        ];
        for (i, content) in inputs.iter().enumerate() {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            h.add_message(role, *content);
            assert!(
                h.current_token_count() <= 25,
                "ceiling violated after message {i}"
            );
        }
    }
}
