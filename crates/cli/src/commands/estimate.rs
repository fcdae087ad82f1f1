//! `promptloom estimate` — Estimate the token cost of text.

use std::path::PathBuf;

use promptloom_context::TokenCostEstimator;

pub fn run(file: Option<PathBuf>, chunk: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let text = super::read_input(file)?;
    let estimator = TokenCostEstimator::fallback();

    let cost = estimator.estimate(&text);
    println!("chars:  {}", text.chars().count());
    println!("tokens: {cost}");

    if let Some(max_per_chunk) = chunk {
        if max_per_chunk == 0 {
            return Err("--chunk must be positive".into());
        }
        let chunks = estimator.chunk_by_tokens(&text, max_per_chunk);
        println!("chunks: {}", chunks.len());
        for (i, piece) in chunks.iter().enumerate() {
            println!(
                "  [{i}] {} tokens, {} chars",
                estimator.estimate(piece),
                piece.chars().count()
            );
        }
    }

    Ok(())
}
