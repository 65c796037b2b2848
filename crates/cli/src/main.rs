//! HASTE command-line front end
//!
//! ```text
//! haste optimize --file stats.py --query "average function" --max-tokens 500
//! haste units --file stats.py --json
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides `-v`); results go to stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod command;

use command::{OptimizeArgs, UnitsArgs};

/// Query-driven context compression for source files
#[derive(Parser)]
#[command(name = "haste", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a source file to the parts relevant to a query
    Optimize(OptimizeArgs),

    /// List parsed units and resolved references of a source file
    Units(UnitsArgs),
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = match cli.command {
        Commands::Optimize(args) => command::optimize(&args).await?,
        Commands::Units(args) => command::units(&args).await?,
    };
    print!("{output}");

    Ok(())
}
