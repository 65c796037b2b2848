use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("source is empty")]
    EmptyInput,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ChunkerError {
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
