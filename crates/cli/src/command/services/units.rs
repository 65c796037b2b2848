use crate::command::domain::{UnitSummary, UnitsOutput};
use crate::command::UnitsArgs;
use anyhow::{bail, Context, Result};
use haste_code_chunker::{parse_source, Language};
use haste_graph::GraphBuilder;

/// Parse a file and list its units and resolved references
pub async fn run(args: &UnitsArgs) -> Result<String> {
    let source = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let language = match (Language::from_path(&args.file), &args.language) {
        (_, Some(name)) => Language::from_name(name),
        (detected, None) => detected,
    };
    if !language.supports_ast() {
        bail!(
            "Cannot detect a supported language for {}; pass --language",
            args.file.display()
        );
    }

    let units = parse_source(&source, language)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    let graph = GraphBuilder::new().build(&units)?;

    let output = UnitsOutput {
        file: args.file.clone(),
        language,
        units: units.iter().map(UnitSummary::from).collect(),
        edges: graph.edges(),
    };

    if args.json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&output)?));
    }
    Ok(output.render_text())
}
