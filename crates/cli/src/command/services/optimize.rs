use crate::command::domain::OptimizeOutput;
use crate::command::OptimizeArgs;
use anyhow::{Context, Result};
use haste_optimizer::{HasteOptimizer, OptimizeRequest, OptimizerConfig};

/// Run one optimization and render it for stdout
pub async fn run(args: &OptimizeArgs) -> Result<String> {
    let mut config = match &args.config {
        Some(path) => OptimizerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OptimizerConfig::default(),
    };
    if let Some(tokenizer) = &args.tokenizer {
        config.assembly.tokenizer = Some(tokenizer.clone());
    }
    if args.semantic {
        config.semantic.enabled = true;
    }

    let optimizer = HasteOptimizer::new(config).context("Failed to set up optimizer")?;

    let mut request = OptimizeRequest::from_file(&args.file, &args.query);
    request.max_tokens = args.max_tokens;
    request.top_k = args.top_k;
    request.traversal_depth = args.depth;

    let result = optimizer
        .optimize(request)
        .await
        .with_context(|| format!("Failed to optimize {}", args.file.display()))?;

    if args.json {
        let output = OptimizeOutput::new(args.file.clone(), args.query.clone(), result);
        return Ok(format!("{}\n", serde_json::to_string_pretty(&output)?));
    }

    Ok(format!("{}\n\n{}", result.content, result.stats_report()))
}
