//! Job orchestration. Jobs queue in FIFO order and a single processing slot
//! drains them one at a time; within a job, analysis fans out across
//! blocking shards. Job records stay in the table after completion so
//! callers can poll terminal status and results.

use crate::acquire::{LocalPathAcquirer, RepositoryAcquirer};
use crate::discovery::{FileDiscoverer, WalkDiscoverer};
use crate::error::PipelineError;
use crate::job::{AnalysisJob, AnalysisRequest, JobStatus};
use analyzer::AnalyzerRegistry;
use analyzer::resolver::RelationshipResolver;
use chrono::Utc;
use dashmap::DashMap;
use database::graph::CodeEntity;
use database::kuzu::database::KuzuDatabase;
use database::schema::SchemaManager;
use database::writer::GraphWriter;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory of the embedded graph database.
    pub database_path: PathBuf,
    /// Number of analysis shards per job. Zero means one per CPU.
    pub parallel_workers: usize,
    /// Files larger than this are silently excluded from discovery.
    pub max_file_size: u64,
    /// Rows per persistence transaction.
    pub batch_size: usize,
}

impl PipelineConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            parallel_workers: 0,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            batch_size: database::writer::DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn effective_workers(&self) -> usize {
        if self.parallel_workers == 0 {
            num_cpus::get()
        } else {
            self.parallel_workers
        }
        .max(1)
    }
}

pub struct JobOrchestrator {
    config: PipelineConfig,
    database: Arc<KuzuDatabase>,
    acquirer: Box<dyn RepositoryAcquirer>,
    discoverer: Box<dyn FileDiscoverer>,
    jobs: DashMap<String, AnalysisJob>,
    queue: Mutex<VecDeque<String>>,
    processing: AtomicBool,
}

impl JobOrchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            database: Arc::new(KuzuDatabase::new()),
            acquirer: Box::new(LocalPathAcquirer),
            discoverer: Box::new(WalkDiscoverer),
            jobs: DashMap::new(),
            queue: Mutex::new(VecDeque::new()),
            processing: AtomicBool::new(false),
        }
    }

    /// Substitute the repository acquirer, e.g. to stage remote checkouts.
    pub fn with_acquirer(mut self, acquirer: Box<dyn RepositoryAcquirer>) -> Self {
        self.acquirer = acquirer;
        self
    }

    pub fn with_discoverer(mut self, discoverer: Box<dyn FileDiscoverer>) -> Self {
        self.discoverer = discoverer;
        self
    }

    /// The shared database manager. Kuzu permits one open `Database` per
    /// directory, so readers of a finished run must obtain the handle from
    /// this manager rather than opening the path themselves.
    pub fn database_manager(&self) -> Arc<KuzuDatabase> {
        self.database.clone()
    }

    /// Validates the request and enqueues a job, returning its id. The job
    /// runs when `process_queue` reaches it.
    pub fn submit(&self, request: AnalysisRequest) -> Result<String, PipelineError> {
        request.validate()?;
        let job = AnalysisJob::new(request);
        let job_id = job.id.clone();
        info!(job_id = %job_id, url = %job.request.repository_url, "queued analysis job");
        self.jobs.insert(job_id.clone(), job);
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(job_id.clone());
        Ok(job_id)
    }

    /// Snapshot of one job. Terminal jobs stay queryable indefinitely.
    pub fn job(&self, job_id: &str) -> Result<AnalysisJob, PipelineError> {
        self.jobs
            .get(job_id)
            .map(|j| j.clone())
            .ok_or_else(|| PipelineError::NotFound(job_id.to_string()))
    }

    /// Cancels a pending job. Running and terminal jobs cannot be cancelled.
    pub fn cancel(&self, job_id: &str) -> Result<(), PipelineError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::NotFound(job_id.to_string()))?;
        if job.status != JobStatus::Pending {
            return Err(PipelineError::Validation(format!(
                "job is {} and can no longer be cancelled",
                job.status
            )));
        }
        job.mark_cancelled();
        Ok(())
    }

    /// Drains the queue, running jobs one at a time. Holds a single
    /// processing slot: a concurrent call while a drain is in progress
    /// returns immediately.
    pub async fn process_queue(&self) {
        if self.processing.swap(true, Ordering::SeqCst) {
            return;
        }
        while let Some(job_id) = self.next_pending() {
            self.run_job(&job_id).await;
        }
        self.processing.store(false, Ordering::SeqCst);
    }

    fn next_pending(&self) -> Option<String> {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(job_id) = queue.pop_front() {
            // Cancelled jobs stay in the table but are never run.
            if self
                .jobs
                .get(&job_id)
                .is_some_and(|j| j.status == JobStatus::Pending)
            {
                return Some(job_id);
            }
        }
        None
    }

    async fn run_job(&self, job_id: &str) {
        self.update(job_id, |job| {
            job.mark_running();
            job.advance_progress(10);
        });
        match self.execute(job_id).await {
            Ok(graph_id) => {
                info!(job_id = %job_id, graph_id = %graph_id, "analysis job completed");
                self.update(job_id, |job| job.mark_completed(graph_id));
            }
            Err(error) => {
                warn!(job_id = %job_id, %error, "analysis job failed");
                self.update(job_id, |job| job.mark_failed(error.to_string()));
            }
        }
    }

    async fn execute(&self, job_id: &str) -> Result<String, PipelineError> {
        let request = self.job(job_id)?.request;
        let repository = self
            .acquirer
            .acquire(&request.repository_url, &request.branch)
            .await?;
        self.update(job_id, |job| job.advance_progress(20));

        let result = self.analyze_repository(job_id, repository.root()).await;
        // Cleanup runs on both paths and never masks the analysis outcome.
        repository.cleanup();
        result
    }

    async fn analyze_repository(
        &self,
        job_id: &str,
        root: &Path,
    ) -> Result<String, PipelineError> {
        let files = self.discoverer.discover(root, self.config.max_file_size);
        self.update(job_id, |job| {
            job.counters.total_files = files.len();
            job.advance_progress(30);
        });

        let shards = shard(files, self.config.effective_workers());
        let shard_count = shards.len().max(1);
        let mut entities: Vec<CodeEntity> = Vec::new();

        let handles: Vec<_> = shards
            .into_iter()
            .map(|shard_files| {
                let shard_root = root.to_path_buf();
                tokio::task::spawn_blocking(move || analyze_shard(&shard_files, &shard_root))
            })
            .collect();
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = handle
                .await
                .map_err(|e| PipelineError::Analysis(e.to_string()))?;
            entities.extend(outcome.entities);
            let progress = 30 + (40 * (index + 1) / shard_count) as u8;
            self.update(job_id, |job| {
                job.counters.processed_files += outcome.processed;
                job.counters.skipped_files += outcome.skipped;
                job.advance_progress(progress);
            });
        }

        let resolved = RelationshipResolver::new().resolve(&entities);
        entities.extend(resolved.placeholder_entities);
        self.update(job_id, |job| {
            job.counters.entities_found = entities.len();
            job.counters.relationships_found = resolved.relationships.len();
            job.advance_progress(80);
        });

        let graph_id = format!("{}-{}", job_id, Utc::now().timestamp_millis());
        let database = self
            .database
            .get_or_create_database(&self.config.database_path.to_string_lossy())?;
        SchemaManager::new(&database).initialize_schema()?;
        GraphWriter::new(self.config.batch_size).write_graph(
            &database,
            &graph_id,
            &entities,
            &resolved.relationships,
        )?;

        Ok(graph_id)
    }

    fn update(&self, job_id: &str, apply: impl FnOnce(&mut AnalysisJob)) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            apply(&mut job);
        }
    }
}

/// Contiguous, near-equal shards preserving discovery order.
fn shard(files: Vec<PathBuf>, workers: usize) -> Vec<Vec<PathBuf>> {
    if files.is_empty() {
        return Vec::new();
    }
    let chunk = files.len().div_ceil(workers);
    files.chunks(chunk).map(|c| c.to_vec()).collect()
}

struct ShardOutcome {
    entities: Vec<CodeEntity>,
    processed: usize,
    skipped: usize,
}

/// Analyzes one shard of files. Per-file failures (unreadable content,
/// syntax errors) skip the file and never fail the shard.
fn analyze_shard(files: &[PathBuf], root: &Path) -> ShardOutcome {
    let registry = AnalyzerRegistry::new();
    let mut outcome = ShardOutcome {
        entities: Vec::new(),
        processed: 0,
        skipped: 0,
    };

    for path in files {
        let Ok(analyzer) = registry.analyzer_for_path(path) else {
            outcome.skipped += 1;
            continue;
        };
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping unreadable file");
                outcome.skipped += 1;
                continue;
            }
        };
        match analyzer.analyze_source(&relative_path(path, root), &source) {
            Ok(file_entities) => {
                outcome.entities.extend(file_entities);
                outcome.processed += 1;
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping unparseable file");
                outcome.skipped += 1;
            }
        }
    }
    outcome
}

/// Forward-slash path relative to the repository root, so import specifiers
/// resolve identically on every platform.
fn relative_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
