use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SparseDataError {
    #[error("Invalid Interval: {0}")]
    InvalidInterval(String),
}

pub type Result<T> = std::result::Result<T, SparseDataError>;

impl SparseDataError {
    pub fn invalid_interval<T: ToString>(value: T) -> SparseDataError {
        SparseDataError::InvalidInterval(value.to_string())
    }
}
