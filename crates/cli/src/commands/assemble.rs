//! `promptloom assemble` — Assemble a budgeted prompt from components.

use std::path::PathBuf;
use std::sync::Arc;

use promptloom_config::AppConfig;
use promptloom_context::{
    AssemblerOptions, CondensationEngine, CondensationRequest, CondenserOptions, PromptAssembler,
    PromptComponents, TokenCostEstimator, KEY_HISTORY, KEY_RETRIEVED_KNOWLEDGE,
    KEY_SYSTEM_MESSAGE, KEY_TASK_INSTRUCTIONS, KEY_USER_QUERY,
};
use promptloom_core::HistoryMessage;
use tracing::info;

pub struct AssembleArgs {
    pub query: String,
    pub system: Option<String>,
    pub instructions: Option<String>,
    pub knowledge: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub max_tokens: Option<usize>,
    pub stats: bool,
}

pub fn run(config: &AppConfig, args: AssembleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let estimator = Arc::new(TokenCostEstimator::fallback());
    let budget = args.max_tokens.unwrap_or(config.budget.max_prompt_tokens);

    let mut components = PromptComponents::new().text(KEY_USER_QUERY, args.query);
    if let Some(system) = args.system {
        components = components.text(KEY_SYSTEM_MESSAGE, system);
    }
    if let Some(instructions) = args.instructions {
        components = components.text(KEY_TASK_INSTRUCTIONS, instructions);
    }
    if let Some(path) = args.knowledge {
        let mut knowledge = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        // Bulky knowledge is condensed before packing so it cannot crowd
        // out the whole budget on its own.
        let cap = (budget / 2).max(1);
        if estimator.estimate(&knowledge) > cap {
            let options = CondenserOptions {
                overshoot_factor: config.condenser.overshoot_factor,
                truncate_chars_per_token: config.condenser.truncate_chars_per_token,
                hard_cut_chars_per_token: config.condenser.hard_cut_chars_per_token,
            };
            let engine = CondensationEngine::new(Arc::clone(&estimator), options);
            knowledge = engine.condense(&CondensationRequest::new(knowledge, cap));
            info!(cap, "retrieved knowledge condensed before packing");
        }
        components = components.text(KEY_RETRIEVED_KNOWLEDGE, knowledge);
    }
    if let Some(path) = args.history {
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let messages: Vec<HistoryMessage> = serde_json::from_str(&raw)
            .map_err(|e| format!("invalid history file {}: {e}", path.display()))?;
        components = components.history(KEY_HISTORY, messages);
    }

    let options = AssemblerOptions {
        priority_order: config.assembly.priority_order.clone(),
        critical_keys: config.assembly.critical_keys.clone(),
        truncate_chars_per_token: config.assembly.truncate_chars_per_token,
    };
    let assembler = PromptAssembler::with_options(estimator, options);
    let prompt = assembler.assemble(&components, budget);

    if args.stats {
        eprintln!(
            "budget {} / used {} ({:.1}%)",
            prompt.budget,
            prompt.estimated_cost,
            prompt.utilization_pct()
        );
        for stat in &prompt.committed {
            let turns = stat
                .turns
                .map(|(kept, total)| format!(", {kept}/{total} turns"))
                .unwrap_or_default();
            let marker = if stat.truncated { " (truncated)" } else { "" };
            eprintln!("  + {}: {} tokens{turns}{marker}", stat.key, stat.tokens);
        }
        for omission in &prompt.omitted {
            eprintln!(
                "  - {}: needed {} tokens, {} remaining",
                omission.key, omission.tokens_needed, omission.tokens_remaining
            );
        }
        if prompt.hard_truncated {
            eprintln!("  ! final prompt was hard-truncated to the budget");
        }
    }

    println!("{}", prompt.text);
    Ok(())
}
