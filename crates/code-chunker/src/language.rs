use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source language understood by the structural parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "py" | "pyw" | "pyi" => Self::Python,
            "rs" => Self::Rust,
            _ => Self::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    /// Parse a language name as used in config files and CLI flags
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "python" | "py" => Self::Python,
            "rust" | "rs" => Self::Rust,
            _ => Self::Unknown,
        }
    }

    /// Get language name as string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this language is supported for AST parsing
    pub const fn supports_ast(self) -> bool {
        matches!(self, Self::Python | Self::Rust)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Self::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Self::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Self::Unknown => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }

    /// Line comment marker, used when eliding code between rendered units
    pub const fn comment_prefix(self) -> &'static str {
        match self {
            Self::Python => "#",
            Self::Rust => "//",
            Self::Unknown => "#",
        }
    }

    /// Separator between a type and its members in qualified names
    pub const fn path_separator(self) -> &'static str {
        match self {
            Self::Rust => "::",
            Self::Python | Self::Unknown => ".",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
