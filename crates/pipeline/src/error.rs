use database::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request itself is malformed. Rejected before a job is created.
    #[error("Invalid analysis request: {0}")]
    Validation(String),
    #[error("Failed to acquire repository: {0}")]
    Acquisition(String),
    /// A whole analysis shard failed, as opposed to a single file being
    /// skipped. Fails the job.
    #[error("Analysis failed: {0}")]
    Analysis(String),
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
    #[error("Unknown job: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
