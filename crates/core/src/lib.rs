//! # Promptloom Core
//!
//! Domain types and collaborator traits for the Promptloom prompt-assembly
//! pipeline. This crate defines the value types and the two narrow
//! collaborator seams (token counting, summarization) that the
//! `promptloom-context` components are built against.
//!
//! ## Design Philosophy
//!
//! The assembly pipeline itself is pure, synchronous computation. Anything
//! that might touch the network or fail (a real model tokenizer, an
//! LLM-backed summarizer) lives behind a trait defined here, so that the
//! pipeline can catch failures at the seam and degrade deterministically
//! instead of propagating them.

pub mod message;
pub mod observability;
pub mod summarizer;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use message::{HistoryMessage, Role};
pub use observability::ObservabilitySink;
pub use summarizer::{Summarizer, SummarizerError};
pub use tokenizer::{Tokenizer, TokenizerError};
