//! Bounded operational log for prompt inclusion.
//!
//! Agent loops often want "what just happened" available as prompt context:
//! recent tool output, warnings, decisions. `ObservabilitySink` is an
//! explicit, bounded, append-only log passed by reference to whatever needs
//! that context. It is deliberately not a process-wide singleton and not
//! wired into the logging framework. Callers record what they consider
//! prompt-worthy; old entries fall off the front.

use chrono::Utc;
use std::collections::VecDeque;

/// Default number of retained entries.
pub const DEFAULT_SINK_CAPACITY: usize = 100;

/// A bounded append-only log of operational context lines.
#[derive(Debug, Clone)]
pub struct ObservabilitySink {
    entries: VecDeque<String>,
    capacity: usize,
}

impl ObservabilitySink {
    /// Create a sink retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_SINK_CAPACITY)),
            capacity,
        }
    }

    /// Append a line, timestamped. Evicts the oldest entry when full.
    pub fn record(&mut self, line: impl AsRef<str>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        self.entries.push_back(format!("{} {}", stamp, line.as_ref()));
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<&str> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).map(String::as_str).collect()
    }

    /// Render all retained entries as newline-joined text, oldest first.
    /// This is the form fed to the prompt assembler.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all retained entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ObservabilitySink {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_CAPACITY)
    }
}
