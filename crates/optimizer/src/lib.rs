//! # HASTE Optimizer
//!
//! Compresses a source file to the parts relevant to a query, within a token
//! budget, without cutting any function or class in half.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────────────────┐   ┌───────────┐
//! │ SourceParser │──►│ GraphBuilder ║ LexicalIndex │──►│ Retriever │
//! └──────────────┘   └─────────────────────────────┘   └─────┬─────┘
//!                        (parallel blocking tasks)           │ seeds + BFS
//!                                                            ▼
//!        OptimizedContext ◄── Metrics ◄── BudgetedAssembler
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use haste_optimizer::{HasteOptimizer, OptimizeRequest, OptimizerConfig};
//!
//! # async fn run() -> haste_optimizer::Result<()> {
//! let optimizer = HasteOptimizer::new(OptimizerConfig::default())?;
//! let result = optimizer
//!     .optimize(OptimizeRequest::from_file("stats.py", "average function").max_tokens(500))
//!     .await?;
//! println!("{result}");
//! print!("{}", result.stats_report());
//! # Ok(())
//! # }
//! ```

mod assembler;
mod config;
mod error;
mod metrics;
mod optimizer;
mod tokens;

pub use assembler::{Assembly, BudgetedAssembler};
pub use config::{AssemblyConfig, LimitsConfig, OptimizerConfig, RetrievalConfig};
pub use error::{OptimizationError, Result};
pub use metrics::{ast_fidelity, OptimizedContext, OptimizerMetrics};
pub use optimizer::{HasteOptimizer, OptimizeRequest};
pub use tokens::{ApproxTokenCounter, HfTokenCounter, TokenCounter};

pub use haste_search::RetrievalMode;
