use crate::error::DatabaseError;
use crate::graph::{CodeEntity, CodeRelationship};
use crate::kuzu::connection::KuzuConnection;
use crate::schema::{ENTITY_TABLE, RELATIONSHIP_TABLE, entity_pk};
use kuzu::{Database, Value};
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Writes one analysis run's entities and relationships under a graph id.
///
/// Entities and relationships go in fixed-size batches, one transaction per
/// batch, so transaction size stays bounded. Relationship batches are written
/// strictly after every entity batch has committed; a partially failed batch
/// surfaces as a typed error and is never retried here.
pub struct GraphWriter {
    batch_size: usize,
}

impl Default for GraphWriter {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl GraphWriter {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn write_graph(
        &self,
        database: &Database,
        graph_id: &str,
        entities: &[CodeEntity],
        relationships: &[CodeRelationship],
    ) -> Result<(), DatabaseError> {
        let connection = KuzuConnection::new(database)?;
        self.write_entities(&connection, graph_id, entities)?;
        self.write_relationships(&connection, graph_id, relationships)?;
        info!(
            "Persisted {} entities and {} relationships under graph {}",
            entities.len(),
            relationships.len(),
            graph_id
        );
        Ok(())
    }

    fn write_entities(
        &self,
        connection: &KuzuConnection,
        graph_id: &str,
        entities: &[CodeEntity],
    ) -> Result<(), DatabaseError> {
        let mut statement = connection.prepare(&format!(
            "CREATE (e:{ENTITY_TABLE} {{
                pk: $pk, id: $id, graph_id: $graph_id, name: $name,
                entity_type: $entity_type, language: $language,
                file_path: $file_path, start_line: $start_line,
                end_line: $end_line, complexity: $complexity,
                properties: $properties, content_hash: $content_hash,
                created_at: $created_at, updated_at: $updated_at
            }})"
        ))?;

        for (batch_index, batch) in entities.chunks(self.batch_size).enumerate() {
            debug!("Writing entity batch {} ({} rows)", batch_index, batch.len());
            connection
                .transaction(|conn| {
                    for entity in batch {
                        let properties = serde_json::to_string(&entity.properties)?;
                        let complexity =
                            entity.properties.cyclomatic_complexity().unwrap_or(0) as i64;
                        let params: Vec<(&str, Value)> = vec![
                            ("pk", Value::from(entity_pk(graph_id, &entity.id).as_str())),
                            ("id", Value::from(entity.id.as_str())),
                            ("graph_id", Value::from(graph_id)),
                            ("name", Value::from(entity.name.as_str())),
                            ("entity_type", Value::from(entity.entity_type.to_string().as_str())),
                            ("language", Value::from(entity.language.to_string().as_str())),
                            ("file_path", Value::from(entity.file_path.as_str())),
                            ("start_line", Value::from(entity.start_line as i64)),
                            ("end_line", Value::from(entity.end_line as i64)),
                            ("complexity", Value::from(complexity)),
                            ("properties", Value::from(properties.as_str())),
                            ("content_hash", Value::from(entity.metadata.content_hash.as_str())),
                            ("created_at", Value::from(entity.metadata.created_at.to_rfc3339().as_str())),
                            ("updated_at", Value::from(entity.metadata.updated_at.to_rfc3339().as_str())),
                        ];
                        conn.execute(&mut statement, params)?;
                    }
                    Ok(())
                })
                .map_err(|e| DatabaseError::BatchWrite {
                    table: ENTITY_TABLE.to_string(),
                    batch_index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn write_relationships(
        &self,
        connection: &KuzuConnection,
        graph_id: &str,
        relationships: &[CodeRelationship],
    ) -> Result<(), DatabaseError> {
        let mut statement = connection.prepare(&format!(
            "MATCH (a:{ENTITY_TABLE} {{pk: $source_pk}}), (b:{ENTITY_TABLE} {{pk: $target_pk}})
             CREATE (a)-[r:{RELATIONSHIP_TABLE} {{
                id: $id, graph_id: $graph_id, rel_type: $rel_type,
                strength: $strength, confidence: $confidence,
                detection_method: $detection_method, resolved: $resolved,
                created_at: $created_at
             }}]->(b)"
        ))?;

        for (batch_index, batch) in relationships.chunks(self.batch_size).enumerate() {
            debug!(
                "Writing relationship batch {} ({} rows)",
                batch_index,
                batch.len()
            );
            connection
                .transaction(|conn| {
                    for rel in batch {
                        let params: Vec<(&str, Value)> = vec![
                            ("source_pk", Value::from(entity_pk(graph_id, &rel.source_id).as_str())),
                            ("target_pk", Value::from(entity_pk(graph_id, &rel.target_id).as_str())),
                            ("id", Value::from(rel.id.as_str())),
                            ("graph_id", Value::from(graph_id)),
                            ("rel_type", Value::from(rel.rel_type.to_string().as_str())),
                            ("strength", Value::from(rel.strength)),
                            ("confidence", Value::from(rel.confidence)),
                            (
                                "detection_method",
                                Value::from(rel.metadata.detection_method.to_string().as_str()),
                            ),
                            ("resolved", Value::Bool(rel.metadata.resolved)),
                            ("created_at", Value::from(rel.metadata.created_at.to_rfc3339().as_str())),
                        ];
                        conn.execute(&mut statement, params)?;
                    }
                    Ok(())
                })
                .map_err(|e| DatabaseError::BatchWrite {
                    table: RELATIONSHIP_TABLE.to_string(),
                    batch_index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        CodeEntity, CodeRelationship, DetectionMethod, EntityProperties, EntityType, Language,
        RelationshipType,
    };
    use crate::kuzu::database::KuzuDatabase;
    use crate::schema::SchemaManager;

    fn file_entity(name: &str, path: &str) -> CodeEntity {
        CodeEntity::new(
            name,
            EntityType::File,
            Language::TypeScript,
            path,
            1,
            10,
            EntityProperties::File {
                line_count: 10,
                average_complexity: 1.0,
                imports: vec![],
                exports: vec![],
            },
            "hash".into(),
        )
    }

    fn open_test_db(temp_dir: &tempfile::TempDir) -> std::sync::Arc<Database> {
        let db_path = temp_dir.path().join("graph.db");
        let manager = KuzuDatabase::new();
        let database = manager
            .get_or_create_database(db_path.to_str().unwrap())
            .unwrap();
        SchemaManager::new(&database).initialize_schema().unwrap();
        database
    }

    #[test]
    fn same_batch_under_two_graph_ids_never_collides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let database = open_test_db(&temp_dir);
        let entities = vec![file_entity("a.ts", "src/a.ts"), file_entity("b.ts", "src/b.ts")];

        let writer = GraphWriter::new(1);
        writer.write_graph(&database, "graph-1", &entities, &[]).unwrap();
        writer.write_graph(&database, "graph-2", &entities, &[]).unwrap();

        let conn = KuzuConnection::new(&database).unwrap();
        let mut rows = conn
            .query("MATCH (e:CodeEntity) RETURN count(e)")
            .unwrap();
        assert_eq!(rows.next().unwrap()[0].to_string(), "4");
    }

    #[test]
    fn duplicate_ids_within_one_graph_fail_as_batch_write_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let database = open_test_db(&temp_dir);
        let entity = file_entity("a.ts", "src/a.ts");
        let dup = entity.clone();

        let writer = GraphWriter::default();
        let result = writer.write_graph(&database, "graph-1", &[entity, dup], &[]);
        assert!(matches!(
            result,
            Err(DatabaseError::BatchWrite { batch_index: 0, .. })
        ));
    }

    #[test]
    fn relationships_are_written_after_entities() {
        let temp_dir = tempfile::tempdir().unwrap();
        let database = open_test_db(&temp_dir);
        let a = file_entity("a.ts", "src/a.ts");
        let b = file_entity("b.ts", "src/b.ts");
        let rel = CodeRelationship::new(
            a.id.clone(),
            b.id.clone(),
            RelationshipType::Imports,
            0.8,
            0.85,
            DetectionMethod::Static,
            true,
        );

        let writer = GraphWriter::default();
        writer
            .write_graph(&database, "graph-1", &[a, b], &[rel])
            .unwrap();

        let conn = KuzuConnection::new(&database).unwrap();
        let mut rows = conn
            .query("MATCH ()-[r:CodeRelationship]->() RETURN count(r)")
            .unwrap();
        assert_eq!(rows.next().unwrap()[0].to_string(), "1");
    }
}
