use thiserror::Error;

/// Failures surfaced by the document store adapter and the repositories built on it.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Store failure: {0}")]
    StoreFailure(String),
    #[error("Operation cancelled: {0}")]
    Cancelled(&'static str),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::StoreFailure(format!("malformed document: {}", err))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
