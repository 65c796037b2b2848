use haste_code_chunker::ChunkerError;
use haste_graph::GraphError;
use haste_search::SearchError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OptimizationError>;

#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("Empty input: nothing to optimize")]
    EmptyInput,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Parse error: {0}")]
    Parse(ChunkerError),

    #[error("Search error: {0}")]
    Search(SearchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inconsistent metrics: {0}")]
    Metrics(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl OptimizationError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<ChunkerError> for OptimizationError {
    fn from(err: ChunkerError) -> Self {
        match err {
            ChunkerError::EmptyInput => Self::EmptyInput,
            other => Self::Parse(other),
        }
    }
}

impl From<SearchError> for OptimizationError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidParameter(msg) => Self::InvalidParameter(msg),
            SearchError::Config(msg) => Self::Config(msg),
            other => Self::Search(other),
        }
    }
}

impl From<GraphError> for OptimizationError {
    fn from(err: GraphError) -> Self {
        Self::Search(SearchError::from(err))
    }
}

impl From<toml::de::Error> for OptimizationError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
