use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Kuzu error: {0}")]
    Kuzu(#[from] kuzu::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to execute query: {query}. Error: {error}")]
    QueryExecutionError { query: String, error: kuzu::Error },
    #[error("Batch write to {table} failed at batch {batch_index}: {source}")]
    BatchWrite {
        table: String,
        batch_index: usize,
        #[source]
        source: Box<DatabaseError>,
    },
    #[error("Database initialization failed: {0}")]
    InitializationFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
