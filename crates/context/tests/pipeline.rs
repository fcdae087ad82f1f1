//! End-to-end pipeline tests: store → condense → assemble under one budget.

use promptloom_context::{
    CondensationEngine, CondensationRequest, CondenserOptions, ConversationHistory,
    HistoryOptions, PromptAssembler, PromptComponents, TokenCostEstimator, KEY_HISTORY,
    KEY_RETRIEVED_KNOWLEDGE, KEY_SYSTEM_MESSAGE, KEY_USER_QUERY,
};
use promptloom_core::message::Role;
use promptloom_core::summarizer::{Summarizer, SummarizerError};
use promptloom_core::ObservabilitySink;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct EchoSummarizer;

impl Summarizer for EchoSummarizer {
    fn summarize(
        &self,
        _text: &str,
        _target_tokens: usize,
        relevance_hint: Option<&str>,
    ) -> Result<String, SummarizerError> {
        Ok(format!(
            "Summary focused on {}.",
            relevance_hint.unwrap_or("the conversation")
        ))
    }
}

#[test]
fn full_pipeline_respects_global_budget() {
    init_tracing();
    let estimator = Arc::new(TokenCostEstimator::fallback());

    // 1. Accumulate a conversation under a history ceiling.
    let mut history = ConversationHistory::new(
        estimator.clone(),
        HistoryOptions {
            max_tokens: 200,
            protect_system: false,
        },
    );
    for i in 0..25 {
        history.add_message(Role::User, format!("User question number {i} with some detail"));
        history.add_message(Role::Assistant, format!("Assistant answer number {i}"));
    }
    assert!(history.current_token_count() <= 200);

    // 2. Condense a bulky knowledge blob before packing.
    let condenser = CondensationEngine::new(estimator.clone(), CondenserOptions::default());
    let knowledge = "Retrieved background fact about the topic at hand. ".repeat(60);
    let condensed =
        condenser.condense(&CondensationRequest::new(knowledge, 80).with_hint("topic"));
    assert!(estimator.estimate(&condensed) <= 80);

    // 3. Pack everything under the global budget.
    let assembler = PromptAssembler::new(estimator.clone());
    let components = PromptComponents::new()
        .text(KEY_SYSTEM_MESSAGE, "You are a careful assistant.")
        .text(KEY_USER_QUERY, "What did we conclude about the topic?")
        .text(KEY_RETRIEVED_KNOWLEDGE, condensed)
        .history(KEY_HISTORY, history.snapshot());

    let prompt = assembler.assemble(&components, 400);
    assert!(prompt.estimated_cost <= 400);
    assert!(prompt.text.contains("What did we conclude"));
    assert!(prompt.text.contains("You are a careful assistant."));
    // Most recent turn survives assembly-time recency packing.
    assert!(prompt.text.contains("answer number 24"));
}

#[test]
fn summarized_history_feeds_the_packer() {
    init_tracing();
    let estimator = Arc::new(TokenCostEstimator::fallback());

    let mut history = ConversationHistory::new(
        estimator.clone(),
        HistoryOptions {
            max_tokens: 4096,
            protect_system: false,
        },
    );
    for i in 0..50 {
        history.add_message(
            Role::User,
            format!("A long deliberation about architecture decision {i}"),
        );
    }

    let condenser = CondensationEngine::with_summarizer(
        estimator.clone(),
        CondenserOptions::default(),
        Box::new(EchoSummarizer),
    );
    let summary = condenser.condense(
        &CondensationRequest::new(history.snapshot(), 20).with_hint("architecture decisions"),
    );
    assert_eq!(summary, "Summary focused on architecture decisions.");

    let assembler = PromptAssembler::new(estimator.clone());
    let components = PromptComponents::new()
        .text(KEY_USER_QUERY, "Recap please")
        .text(KEY_RETRIEVED_KNOWLEDGE, summary);
    let prompt = assembler.assemble(&components, 100);
    assert!(prompt.text.contains("Context: Summary focused on"));
    assert!(prompt.estimated_cost <= 100);
}

#[test]
fn observability_sink_rides_along_as_a_component() {
    init_tracing();
    let estimator = Arc::new(TokenCostEstimator::fallback());

    let mut sink = ObservabilitySink::new(10);
    sink.record("tool web_search succeeded (3 results)");
    sink.record("file_read failed: permission denied");

    let options = promptloom_context::AssemblerOptions {
        priority_order: vec![
            KEY_USER_QUERY.into(),
            KEY_SYSTEM_MESSAGE.into(),
            "operational_context".into(),
        ],
        ..Default::default()
    };
    let assembler = PromptAssembler::with_options(estimator, options);
    let components = PromptComponents::new()
        .text(KEY_USER_QUERY, "Why did the file read fail?")
        .text(KEY_SYSTEM_MESSAGE, "You are a debugging assistant.")
        .text("operational_context", sink.render());

    let prompt = assembler.assemble(&components, 300);
    assert!(prompt.text.contains("permission denied"));
    assert!(prompt.estimated_cost <= 300);
}

#[test]
fn tiny_budget_keeps_only_the_critical_query() {
    init_tracing();
    let estimator = Arc::new(TokenCostEstimator::fallback());
    let assembler = PromptAssembler::new(estimator);

    let components = PromptComponents::new()
        .text(KEY_SYSTEM_MESSAGE, "An elaborate system persona that takes space.")
        .text(KEY_USER_QUERY, "A question much too long for one token.");

    let prompt = assembler.assemble(&components, 1);
    assert!(prompt.estimated_cost <= 1);
    assert!(prompt.committed.len() == 1);
    assert!(prompt.committed[0].truncated);
    assert!(!prompt.text.contains("persona"));
}

#[test]
fn rejection_then_recovery() {
    init_tracing();
    let estimator = Arc::new(TokenCostEstimator::fallback());
    let mut history = ConversationHistory::new(
        estimator.clone(),
        HistoryOptions {
            max_tokens: 10,
            protect_system: false,
        },
    );

    // Oversized message is rejected; condensing it first makes it storable.
    let huge = "z".repeat(1000);
    assert!(!history.add_message(Role::User, huge.clone()).is_stored());
    assert!(history.is_empty());

    let condenser = CondensationEngine::new(estimator.clone(), CondenserOptions::default());
    let shrunk = condenser.condense(&CondensationRequest::new(huge, 8));
    assert!(history.add_message(Role::User, shrunk).is_stored());
    assert!(history.current_token_count() <= 10);
}
