use haste_code_chunker::UnitId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    #[error("Unit ids must be dense and ordered: found {found} at position {position}")]
    NonDenseIds { found: UnitId, position: usize },
}
