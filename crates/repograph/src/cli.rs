use clap::{Parser, Subcommand, ValueEnum};
use database::queries::Direction;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "repograph",
    version,
    about = "Repository knowledge graph CLI",
    long_about = "Analyzes source repositories into a structured, queryable knowledge graph of code entities, relationships and complexity metrics."
)]
pub struct RepographCli {
    /// Directory of the graph database.
    #[arg(long, global = true, default_value = "repograph.db")]
    pub database: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl RepographCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a repository and persist its knowledge graph
    Analyze {
        /// Repository root to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Branch name recorded on the job; local checkouts are analyzed as-is
        #[arg(long, default_value = "main")]
        branch: String,

        /// Number of worker threads (0 means auto-detect based on CPU cores)
        #[arg(short, long, default_value_t = 0)]
        threads: usize,

        /// Skip files larger than this many bytes
        #[arg(long, default_value_t = pipeline::orchestrator::DEFAULT_MAX_FILE_SIZE)]
        max_file_size: u64,
    },
    /// Search entities by name or file path
    Search {
        /// Graph id of the analysis run to search
        #[arg(long)]
        graph: String,
        term: String,
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// List the dependencies of one entity
    Deps {
        #[arg(long)]
        graph: String,
        /// Entity id as reported by `search`
        entity: String,
        #[arg(long, value_enum, default_value = "outgoing")]
        direction: DirectionArg,
    },
    /// Detect dependency cycles in a graph
    Cycles {
        #[arg(long)]
        graph: String,
        /// Maximum number of cycles to report
        #[arg(long, default_value_t = 10)]
        max: usize,
    },
    /// Print aggregate statistics for a graph
    Stats {
        #[arg(long)]
        graph: String,
    },
    /// Run a natural-language query against a graph
    Query {
        #[arg(long)]
        graph: String,
        /// Free-text request, e.g. "most complex functions"
        text: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DirectionArg {
    Incoming,
    Outgoing,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Incoming => Direction::Incoming,
            DirectionArg::Outgoing => Direction::Outgoing,
            DirectionArg::Both => Direction::Both,
        }
    }
}
