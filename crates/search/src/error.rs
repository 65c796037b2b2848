use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Semantic backend error: {0}")]
    SemanticBackend(String),

    #[error("Graph error: {0}")]
    GraphError(#[from] haste_graph::GraphError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SearchError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn semantic_backend(msg: impl Into<String>) -> Self {
        Self::SemanticBackend(msg.into())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        Self::SemanticBackend(err.to_string())
    }
}
