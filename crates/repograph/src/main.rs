mod cli;

use anyhow::{Context, Result, bail};
use cli::{Commands, RepographCli};
use database::kuzu::database::KuzuDatabase;
use database::queries::GraphQueryService;
use database::querying;
use pipeline::{AnalysisRequest, JobOrchestrator, JobStatus, PipelineConfig};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RepographCli::parse_args();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            path,
            branch,
            threads,
            max_file_size,
        } => analyze(&cli.database, &path, &branch, threads, max_file_size).await,
        Commands::Search { graph, term, limit } => {
            let service = query_service(&cli.database)?;
            let records = service.search(&graph, &term, limit)?;
            if records.is_empty() {
                println!("No entities match '{term}'.");
            }
            for record in records {
                println!(
                    "{:<12} {:<30} {}:{} ({})",
                    record.entity_type, record.name, record.file_path, record.start_line, record.id
                );
            }
            Ok(())
        }
        Commands::Deps {
            graph,
            entity,
            direction,
        } => {
            let service = query_service(&cli.database)?;
            let deps = service.dependencies(&graph, &entity, direction.into())?;
            if deps.is_empty() {
                println!("No dependencies found.");
            }
            for dep in deps {
                println!(
                    "{:<12} {:<30} {} (confidence {:.2})",
                    dep.rel_type, dep.entity.name, dep.entity.file_path, dep.confidence
                );
            }
            Ok(())
        }
        Commands::Cycles { graph, max } => {
            let service = query_service(&cli.database)?;
            let cycles = service.find_cycles(&graph, max)?;
            if cycles.is_empty() {
                println!("No dependency cycles detected.");
            }
            for cycle in cycles {
                println!("{}", cycle.join(" -> "));
            }
            Ok(())
        }
        Commands::Stats { graph } => {
            let service = query_service(&cli.database)?;
            print_statistics(&service, &graph)
        }
        Commands::Query { graph, text } => {
            let database =
                KuzuDatabase::new().get_or_create_database(&cli.database.to_string_lossy())?;
            let (query, params) = querying::translate(&text, &graph);
            println!("Running '{}': {}", query.name, query.description);
            for row in querying::run_query(&database, &query, &params)? {
                println!("{}", row.join(" | "));
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn analyze(
    database_path: &Path,
    repository: &Path,
    branch: &str,
    threads: usize,
    max_file_size: u64,
) -> Result<()> {
    let config = PipelineConfig::new(database_path)
        .with_parallel_workers(threads)
        .with_max_file_size(max_file_size);
    let orchestrator = JobOrchestrator::new(config);

    let request = AnalysisRequest::new(repository.to_string_lossy()).with_branch(branch);
    let job_id = orchestrator.submit(request)?;
    orchestrator.process_queue().await;

    let job = orchestrator.job(&job_id)?;
    match job.status {
        JobStatus::Completed => {
            let results = job
                .results
                .context("completed job is missing its results")?;
            println!(
                "Analyzed {} of {} files ({} skipped).",
                results.counters.processed_files,
                results.counters.total_files,
                results.counters.skipped_files
            );
            println!(
                "Persisted {} entities and {} relationships under graph '{}'.",
                results.counters.entities_found,
                results.counters.relationships_found,
                results.graph_id
            );
            // The orchestrator still holds the open database handle, and Kuzu
            // allows only one open per directory. Read back through its
            // manager instead of opening the path again.
            let database = orchestrator
                .database_manager()
                .get_or_create_database(&database_path.to_string_lossy())?;
            let service = GraphQueryService::new(database);
            print_statistics(&service, &results.graph_id)
        }
        JobStatus::Failed => {
            bail!(
                "analysis failed: {}",
                job.error.unwrap_or_else(|| "unknown error".to_string())
            )
        }
        status => bail!("job finished in unexpected status {status}"),
    }
}

fn print_statistics(service: &GraphQueryService, graph_id: &str) -> Result<()> {
    let stats = service.statistics(graph_id)?;
    println!("Nodes:              {}", stats.total_nodes);
    println!("Relationships:      {}", stats.total_relationships);
    println!("Entity types:       {}", stats.entity_types.join(", "));
    println!("Languages:          {}", stats.languages.join(", "));
    println!("Average complexity: {:.2}", stats.average_complexity);
    println!("Max complexity:     {}", stats.max_complexity);
    Ok(())
}

fn query_service(database_path: &Path) -> Result<GraphQueryService> {
    let database = KuzuDatabase::new().get_or_create_database(&database_path.to_string_lossy())?;
    Ok(GraphQueryService::new(database))
}
