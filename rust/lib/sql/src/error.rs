use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    /// The database cannot be reached: open failed, lock poisoned or the
    /// store was closed.
    #[error("connection error: {0}")]
    Connection(String),
}

impl SQLError {
    /// Whether this error means the backing store is unreachable.
    pub fn is_connection(&self) -> bool {
        matches!(self, SQLError::Connection(_))
    }
}
