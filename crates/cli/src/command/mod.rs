pub mod domain;
mod services;

use clap::Args;
use std::path::PathBuf;

pub use services::optimize::run as optimize;
pub use services::units::run as units;

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// Source file to compress
    #[arg(short, long)]
    pub file: PathBuf,

    /// What the downstream model needs to see
    #[arg(short, long)]
    pub query: String,

    /// Token budget for the output
    #[arg(long, allow_negative_numbers = true)]
    pub max_tokens: Option<i64>,

    /// Number of seed units picked by relevance
    #[arg(long, allow_negative_numbers = true)]
    pub top_k: Option<i64>,

    /// Reference-graph hops expanded from each seed
    #[arg(long, allow_negative_numbers = true)]
    pub depth: Option<i64>,

    /// Blend in embedding similarity (needs OPENAI_API_KEY)
    #[arg(long)]
    pub semantic: bool,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hugging Face tokenizer.json used for token counts
    #[arg(long)]
    pub tokenizer: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UnitsArgs {
    /// Source file to parse
    #[arg(short, long)]
    pub file: PathBuf,

    /// Language when the extension is not recognised (python, rust)
    #[arg(long)]
    pub language: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}
