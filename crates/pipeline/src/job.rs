use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// What the caller asks the orchestrator to analyze. The url may be a local
/// directory; remote cloning is delegated to the configured acquirer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub repository_url: String,
    pub branch: String,
}

impl AnalysisRequest {
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            branch: "main".to_string(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Rejected requests never become jobs.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.repository_url.trim().is_empty() {
            return Err(PipelineError::Validation(
                "repository url must not be empty".to_string(),
            ));
        }
        if self.branch.trim().is_empty() {
            return Err(PipelineError::Validation(
                "branch must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Job lifecycle. Transitions are strictly forward; a terminal status
/// (`Completed`, `Failed`, `Cancelled`) never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Running tallies of a job. `processed + skipped <= total` holds at every
/// point, with equality once the job completes, regardless of sharding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCounters {
    pub total_files: usize,
    pub processed_files: usize,
    pub skipped_files: usize,
    pub entities_found: usize,
    pub relationships_found: usize,
}

/// Final accounting of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResults {
    /// Graph scope the run was persisted under.
    pub graph_id: String,
    pub counters: JobCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: String,
    pub request: AnalysisRequest,
    pub status: JobStatus,
    /// Percentage in [0, 100]; monotonically non-decreasing.
    pub progress: u8,
    pub counters: JobCounters,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only when `status == Completed`.
    pub results: Option<JobResults>,
    /// Present only when `status == Failed`.
    pub error: Option<String>,
}

impl AnalysisJob {
    pub fn new(request: AnalysisRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request,
            status: JobStatus::Pending,
            progress: 0,
            counters: JobCounters::default(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            results: None,
            error: None,
        }
    }

    pub(crate) fn advance_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    pub(crate) fn mark_running(&mut self) {
        debug_assert!(self.status.can_transition_to(JobStatus::Running));
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn mark_completed(&mut self, graph_id: String) {
        debug_assert!(self.status.can_transition_to(JobStatus::Completed));
        self.status = JobStatus::Completed;
        self.advance_progress(100);
        self.completed_at = Some(Utc::now());
        self.results = Some(JobResults {
            graph_id,
            counters: self.counters.clone(),
        });
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        debug_assert!(self.status.can_transition_to(JobStatus::Failed));
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        debug_assert!(self.status.can_transition_to(JobStatus::Cancelled));
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_or_branch_is_rejected() {
        assert!(AnalysisRequest::new("").validate().is_err());
        assert!(
            AnalysisRequest::new("/tmp/repo")
                .with_branch("  ")
                .validate()
                .is_err()
        );
        assert!(AnalysisRequest::new("/tmp/repo").validate().is_ok());
    }

    #[test]
    fn progress_never_goes_backwards() {
        let mut job = AnalysisJob::new(AnalysisRequest::new("/tmp/repo"));
        job.advance_progress(30);
        job.advance_progress(20);
        assert_eq!(job.progress, 30);
        job.advance_progress(120);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn transitions_are_strictly_forward() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn terminal_statuses_are_flagged() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn completion_snapshots_the_counters() {
        let mut job = AnalysisJob::new(AnalysisRequest::new("/tmp/repo"));
        job.mark_running();
        job.counters.total_files = 3;
        job.counters.processed_files = 2;
        job.counters.skipped_files = 1;
        job.mark_completed("job-123".to_string());

        let results = job.results.unwrap();
        assert_eq!(results.graph_id, "job-123");
        assert_eq!(
            results.counters.processed_files + results.counters.skipped_files,
            results.counters.total_files
        );
        assert_eq!(job.progress, 100);
    }
}
