//! `promptloom condense` — Condense text down to a token target.

use std::path::PathBuf;
use std::sync::Arc;

use promptloom_config::AppConfig;
use promptloom_context::{
    CondensationEngine, CondensationRequest, CondenserOptions, TokenCostEstimator,
};
use tracing::info;

pub fn run(
    config: &AppConfig,
    file: Option<PathBuf>,
    target: usize,
    hint: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = super::read_input(file)?;

    let estimator = Arc::new(TokenCostEstimator::fallback());
    let before = estimator.estimate(&text);

    let options = CondenserOptions {
        overshoot_factor: config.condenser.overshoot_factor,
        truncate_chars_per_token: config.condenser.truncate_chars_per_token,
        hard_cut_chars_per_token: config.condenser.hard_cut_chars_per_token,
    };
    // No summarizer backend wired up here, so condensation falls back to
    // the truncation path.
    let engine = CondensationEngine::new(Arc::clone(&estimator), options);

    let mut request = CondensationRequest::new(text, target);
    if let Some(hint) = hint {
        request = request.with_hint(hint);
    }

    let condensed = engine.condense(&request);
    let after = estimator.estimate(&condensed);
    info!(before, after, target, "condensation finished");

    println!("{condensed}");
    Ok(())
}
