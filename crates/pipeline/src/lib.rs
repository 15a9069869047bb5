pub mod acquire;
pub mod discovery;
pub mod error;
pub mod job;
pub mod orchestrator;

pub use acquire::{AcquiredRepository, LocalPathAcquirer, RepositoryAcquirer};
pub use discovery::{FileDiscoverer, WalkDiscoverer};
pub use error::PipelineError;
pub use job::{AnalysisJob, AnalysisRequest, JobCounters, JobResults, JobStatus};
pub use orchestrator::{JobOrchestrator, PipelineConfig};
