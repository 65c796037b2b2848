use crate::error::{OptimizationError, Result};
use haste_code_chunker::Language;
use haste_search::{Bm25Config, SemanticConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optimizer settings, loadable from TOML.
///
/// ```toml
/// language = "python"
///
/// [retrieval]
/// top_k = 3
/// traversal_depth = 1
///
/// [bm25]
/// k1 = 1.2
/// b = 0.75
///
/// [semantic]
/// enabled = false
/// weight = 0.5
///
/// [assembly]
/// max_tokens = 2000
///
/// [limits]
/// request_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Used when the language cannot be inferred from a file path
    pub language: Language,
    pub retrieval: RetrievalConfig,
    pub bm25: Bm25Config,
    pub semantic: SemanticConfig,
    pub assembly: AssemblyConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub traversal_depth: usize,
    /// Expand to callers as well as callees
    pub include_callers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub max_tokens: usize,
    /// Hugging Face `tokenizer.json`; approximate counting when unset
    pub tokenizer: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub request_timeout_ms: u64,
    pub max_source_bytes: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            language: Language::Python,
            retrieval: RetrievalConfig::default(),
            bm25: Bm25Config::default(),
            semantic: SemanticConfig::default(),
            assembly: AssemblyConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            traversal_depth: 1,
            include_callers: false,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            tokenizer: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            max_source_bytes: 8 * 1024 * 1024,
        }
    }
}

impl LimitsConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl OptimizerConfig {
    /// Read and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            OptimizationError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(OptimizationError::config("retrieval.top_k must be at least 1"));
        }
        if self.limits.request_timeout_ms == 0 {
            return Err(OptimizationError::config(
                "limits.request_timeout_ms must be positive",
            ));
        }
        self.bm25
            .validate()
            .map_err(|e| OptimizationError::config(e.to_string()))?;
        self.semantic
            .validate()
            .map_err(|e| OptimizationError::config(e.to_string()))?;
        Ok(())
    }
}
