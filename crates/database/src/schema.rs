use crate::error::DatabaseError;
use crate::kuzu::connection::KuzuConnection;
use kuzu::Database;
use tracing::info;

pub const ENTITY_TABLE: &str = "CodeEntity";
pub const RELATIONSHIP_TABLE: &str = "CodeRelationship";

/// Composite primary key scoping entity uniqueness to one analysis run.
/// Persisting the same entity batch under two graph ids never collides.
pub fn entity_pk(graph_id: &str, entity_id: &str) -> String {
    format!("{graph_id}:{entity_id}")
}

/// Manages graph schema creation. Initialization is idempotent: an existing
/// schema is detected and left untouched so multiple runs share one store.
pub struct SchemaManager<'a> {
    database: &'a Database,
}

impl<'a> SchemaManager<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    pub fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let connection = KuzuConnection::new(self.database)?;

        if connection.table_exists(ENTITY_TABLE)?
            && connection.table_exists(RELATIONSHIP_TABLE)?
        {
            info!("Graph schema already exists, skipping creation");
            return Ok(());
        }

        info!("Initializing graph schema");
        connection.execute_ddl(&format!(
            "CREATE NODE TABLE {ENTITY_TABLE} (
                pk STRING,
                id STRING,
                graph_id STRING,
                name STRING,
                entity_type STRING,
                language STRING,
                file_path STRING,
                start_line INT64,
                end_line INT64,
                complexity INT64,
                properties STRING,
                content_hash STRING,
                created_at STRING,
                updated_at STRING,
                PRIMARY KEY (pk)
            )"
        ))?;
        connection.execute_ddl(&format!(
            "CREATE REL TABLE {RELATIONSHIP_TABLE} (
                FROM {ENTITY_TABLE} TO {ENTITY_TABLE},
                id STRING,
                graph_id STRING,
                rel_type STRING,
                strength DOUBLE,
                confidence DOUBLE,
                detection_method STRING,
                resolved BOOLEAN,
                created_at STRING
            )"
        ))?;

        info!("Graph schema initialized successfully");
        Ok(())
    }
}
