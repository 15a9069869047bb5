use crate::error::DatabaseError;
use crate::graph::RelationshipType;
use crate::kuzu::connection::KuzuConnection;
use crate::schema::entity_pk;
use kuzu::{Database, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Queries slower than this are flagged, not failed.
const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(500);

/// Longest relationship chain considered when searching for cycles.
const MAX_CYCLE_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

/// One entity row as returned by the read operations.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub file_path: String,
    pub start_line: i64,
    pub complexity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRecord {
    pub entity: EntityRecord,
    pub rel_type: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphStatistics {
    pub total_nodes: i64,
    pub total_relationships: i64,
    pub entity_types: Vec<String>,
    pub languages: Vec<String>,
    pub average_complexity: f64,
    pub max_complexity: i64,
}

/// Read operations over one persisted analysis run, scoped by graph id.
pub struct GraphQueryService {
    database: Arc<Database>,
}

impl GraphQueryService {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Case-insensitive free-text search over entity names and file paths.
    pub fn search(
        &self,
        graph_id: &str,
        term: &str,
        limit: i64,
    ) -> Result<Vec<EntityRecord>, DatabaseError> {
        self.timed("search", || {
            let connection = KuzuConnection::new(&self.database)?;
            let mut statement = connection.prepare(
                "MATCH (e:CodeEntity)
                 WHERE e.graph_id = $graph_id
                   AND (toLower(e.name) CONTAINS toLower($term)
                        OR toLower(e.file_path) CONTAINS toLower($term))
                 RETURN e.id, e.name, e.entity_type, e.file_path, e.start_line, e.complexity
                 ORDER BY e.name
                 LIMIT $limit",
            )?;
            let result = connection.execute(
                &mut statement,
                vec![
                    ("graph_id", Value::from(graph_id)),
                    ("term", Value::from(term)),
                    ("limit", Value::from(limit)),
                ],
            )?;
            Ok(result.into_iter().map(|row| entity_record(&row)).collect())
        })
    }

    /// Directional dependency lookup for one entity. Fails with `NotFound`
    /// when the entity id is absent from the graph.
    pub fn dependencies(
        &self,
        graph_id: &str,
        entity_id: &str,
        direction: Direction,
    ) -> Result<Vec<DependencyRecord>, DatabaseError> {
        self.timed("dependencies", || {
            let connection = KuzuConnection::new(&self.database)?;
            if !self.entity_exists(&connection, graph_id, entity_id)? {
                return Err(DatabaseError::NotFound(format!(
                    "entity {entity_id} in graph {graph_id}"
                )));
            }

            let pattern = match direction {
                Direction::Outgoing => "(e:CodeEntity {pk: $pk})-[r:CodeRelationship]->(o:CodeEntity)",
                Direction::Incoming => "(e:CodeEntity {pk: $pk})<-[r:CodeRelationship]-(o:CodeEntity)",
                Direction::Both => "(e:CodeEntity {pk: $pk})-[r:CodeRelationship]-(o:CodeEntity)",
            };
            let query = format!(
                "MATCH {pattern}
                 WHERE r.graph_id = $graph_id
                 RETURN o.id, o.name, o.entity_type, o.file_path, o.start_line, o.complexity,
                        r.rel_type, r.confidence"
            );
            let mut statement = connection.prepare(&query)?;
            let result = connection.execute(
                &mut statement,
                vec![
                    ("pk", Value::from(entity_pk(graph_id, entity_id).as_str())),
                    ("graph_id", Value::from(graph_id)),
                ],
            )?;
            Ok(result
                .into_iter()
                .map(|row| DependencyRecord {
                    entity: entity_record(&row),
                    rel_type: as_string(&row[6]),
                    confidence: as_f64(&row[7]),
                })
                .collect())
        })
    }

    /// Bounded-length cycle detection over the structural dependency edge
    /// subset. Unresolved (placeholder) edges are excluded. Returns up to
    /// `max_cycles` cycles as lists of entity names.
    pub fn find_cycles(
        &self,
        graph_id: &str,
        max_cycles: usize,
    ) -> Result<Vec<Vec<String>>, DatabaseError> {
        self.timed("find_cycles", || {
            let connection = KuzuConnection::new(&self.database)?;
            let dependency_types: Vec<String> = RelationshipType::dependency_types()
                .iter()
                .map(|t| t.to_string())
                .collect();

            let mut statement = connection.prepare(
                "MATCH (a:CodeEntity)-[r:CodeRelationship]->(b:CodeEntity)
                 WHERE r.graph_id = $graph_id AND r.resolved AND list_contains($types, r.rel_type)
                 RETURN a.id, a.name, b.id",
            )?;
            let result = connection.execute(
                &mut statement,
                vec![
                    ("graph_id", Value::from(graph_id)),
                    (
                        "types",
                        Value::List(
                            kuzu::LogicalType::String,
                            dependency_types.iter().map(|t| Value::from(t.as_str())).collect(),
                        ),
                    ),
                ],
            )?;

            let mut edges: HashMap<String, Vec<String>> = HashMap::new();
            let mut names: HashMap<String, String> = HashMap::new();
            for row in result {
                let source = as_string(&row[0]);
                names.insert(source.clone(), as_string(&row[1]));
                edges.entry(source).or_default().push(as_string(&row[2]));
            }

            Ok(detect_cycles(&edges, &names, max_cycles))
        })
    }

    /// Aggregate statistics for one graph id.
    pub fn statistics(&self, graph_id: &str) -> Result<GraphStatistics, DatabaseError> {
        self.timed("statistics", || {
            let connection = KuzuConnection::new(&self.database)?;
            let graph_param = vec![("graph_id", Value::from(graph_id))];

            let total_nodes = self.scalar_i64(
                &connection,
                "MATCH (e:CodeEntity) WHERE e.graph_id = $graph_id RETURN count(e)",
                graph_param.clone(),
            )?;
            let total_relationships = self.scalar_i64(
                &connection,
                "MATCH ()-[r:CodeRelationship]->() WHERE r.graph_id = $graph_id RETURN count(r)",
                graph_param.clone(),
            )?;
            let entity_types = self.string_column(
                &connection,
                "MATCH (e:CodeEntity) WHERE e.graph_id = $graph_id
                 RETURN DISTINCT e.entity_type ORDER BY e.entity_type",
                graph_param.clone(),
            )?;
            let languages = self.string_column(
                &connection,
                "MATCH (e:CodeEntity) WHERE e.graph_id = $graph_id
                 RETURN DISTINCT e.language ORDER BY e.language",
                graph_param.clone(),
            )?;

            let mut statement = connection.prepare(
                "MATCH (e:CodeEntity)
                 WHERE e.graph_id = $graph_id AND e.complexity > 0
                 RETURN avg(e.complexity), max(e.complexity)",
            )?;
            let mut result = connection.execute(&mut statement, graph_param)?;
            let (average_complexity, max_complexity) = match result.next() {
                Some(row) => (as_f64(&row[0]), as_i64(&row[1])),
                None => (0.0, 0),
            };

            Ok(GraphStatistics {
                total_nodes,
                total_relationships,
                entity_types,
                languages,
                average_complexity,
                max_complexity,
            })
        })
    }

    fn entity_exists(
        &self,
        connection: &KuzuConnection,
        graph_id: &str,
        entity_id: &str,
    ) -> Result<bool, DatabaseError> {
        let mut statement = connection
            .prepare("MATCH (e:CodeEntity {pk: $pk}) RETURN count(e)")?;
        let mut result = connection.execute(
            &mut statement,
            vec![("pk", Value::from(entity_pk(graph_id, entity_id).as_str()))],
        )?;
        Ok(result.next().map(|row| as_i64(&row[0]) > 0).unwrap_or(false))
    }

    fn scalar_i64(
        &self,
        connection: &KuzuConnection,
        query: &str,
        params: Vec<(&str, Value)>,
    ) -> Result<i64, DatabaseError> {
        let mut statement = connection.prepare(query)?;
        let mut result = connection.execute(&mut statement, params)?;
        Ok(result.next().map(|row| as_i64(&row[0])).unwrap_or(0))
    }

    fn string_column(
        &self,
        connection: &KuzuConnection,
        query: &str,
        params: Vec<(&str, Value)>,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut statement = connection.prepare(query)?;
        let result = connection.execute(&mut statement, params)?;
        Ok(result.into_iter().map(|row| as_string(&row[0])).collect())
    }

    fn timed<R>(
        &self,
        operation: &str,
        f: impl FnOnce() -> Result<R, DatabaseError>,
    ) -> Result<R, DatabaseError> {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        if elapsed > SLOW_QUERY_THRESHOLD {
            warn!("Slow graph query '{}' took {:?}", operation, elapsed);
        }
        result
    }
}

/// Depth-first search for cycles over the in-memory dependency edge set,
/// bounded by `MAX_CYCLE_LENGTH`. Cycles are deduplicated by canonical
/// rotation so A→B→C→A and B→C→A→B count once.
fn detect_cycles(
    edges: &HashMap<String, Vec<String>>,
    names: &HashMap<String, String>,
    max_cycles: usize,
) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut seen: std::collections::HashSet<Vec<String>> = std::collections::HashSet::new();

    let mut starts: Vec<&String> = edges.keys().collect();
    starts.sort();

    for start in starts {
        if cycles.len() >= max_cycles {
            break;
        }
        let mut path: Vec<String> = vec![start.clone()];
        walk(
            edges, start, start, &mut path, &mut seen, &mut cycles, max_cycles,
        );
    }

    cycles
        .into_iter()
        .map(|cycle| {
            cycle
                .iter()
                .map(|id| names.get(id).cloned().unwrap_or_else(|| id.clone()))
                .collect()
        })
        .collect()
}

fn walk(
    edges: &HashMap<String, Vec<String>>,
    start: &str,
    current: &str,
    path: &mut Vec<String>,
    seen: &mut std::collections::HashSet<Vec<String>>,
    cycles: &mut Vec<Vec<String>>,
    max_cycles: usize,
) {
    if cycles.len() >= max_cycles || path.len() > MAX_CYCLE_LENGTH {
        return;
    }
    let Some(targets) = edges.get(current) else {
        return;
    };
    for target in targets {
        if target == start {
            let canonical = canonical_rotation(path);
            if seen.insert(canonical) {
                cycles.push(path.clone());
            }
            continue;
        }
        if path.iter().any(|id| id == target) {
            continue;
        }
        path.push(target.clone());
        walk(edges, start, target, path, seen, cycles, max_cycles);
        path.pop();
        if cycles.len() >= max_cycles {
            return;
        }
    }
}

fn canonical_rotation(path: &[String]) -> Vec<String> {
    let min_index = path
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| id.as_str())
        .map(|(i, _)| i)
        .unwrap_or(0);
    path.iter()
        .cycle()
        .skip(min_index)
        .take(path.len())
        .cloned()
        .collect()
}

fn entity_record(row: &[Value]) -> EntityRecord {
    EntityRecord {
        id: as_string(&row[0]),
        name: as_string(&row[1]),
        entity_type: as_string(&row[2]),
        file_path: as_string(&row[3]),
        start_line: as_i64(&row[4]),
        complexity: as_i64(&row[5]),
    }
}

fn as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Int64(i) => *i,
        Value::Int32(i) => *i as i64,
        Value::Double(d) => *d as i64,
        _ => 0,
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Double(d) => *d,
        Value::Float(f) => *f as f64,
        Value::Int64(i) => *i as f64,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        CodeEntity, CodeRelationship, DetectionMethod, EntityProperties, EntityType, Language,
    };
    use crate::kuzu::database::KuzuDatabase;
    use crate::schema::SchemaManager;
    use crate::writer::GraphWriter;

    fn function_entity(name: &str, path: &str, cyclomatic: u32) -> CodeEntity {
        CodeEntity::new(
            name,
            EntityType::Function,
            Language::TypeScript,
            path,
            1,
            5,
            EntityProperties::Function {
                parameters: vec![],
                return_type: None,
                cyclomatic_complexity: cyclomatic,
                cognitive_complexity: 0,
                is_exported: false,
                is_async: false,
                doc_comment: None,
            },
            "hash".into(),
        )
    }

    fn dependency(source: &CodeEntity, target: &CodeEntity) -> CodeRelationship {
        CodeRelationship::new(
            source.id.clone(),
            target.id.clone(),
            RelationshipType::DependsOn,
            0.8,
            0.9,
            DetectionMethod::Static,
            true,
        )
    }

    fn setup(
        temp_dir: &tempfile::TempDir,
    ) -> (std::sync::Arc<Database>, GraphQueryService, GraphWriter) {
        let db_path = temp_dir.path().join("graph.db");
        let manager = KuzuDatabase::new();
        let database = manager
            .get_or_create_database(db_path.to_str().unwrap())
            .unwrap();
        SchemaManager::new(&database).initialize_schema().unwrap();
        let service = GraphQueryService::new(database.clone());
        (database, service, GraphWriter::default())
    }

    #[test]
    fn search_is_scoped_to_graph_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (database, service, writer) = setup(&temp_dir);
        let entity = function_entity("parseConfig", "src/config.ts", 2);
        writer.write_graph(&database, "g1", &[entity.clone()], &[]).unwrap();

        let hits = service.search("g1", "parse", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "parseConfig");

        assert!(service.search("g2", "parse", 10).unwrap().is_empty());
        assert!(service.search("g1", "nomatch", 10).unwrap().is_empty());
    }

    #[test]
    fn dependencies_respect_direction_and_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (database, service, writer) = setup(&temp_dir);
        let a = function_entity("a", "src/a.ts", 1);
        let b = function_entity("b", "src/b.ts", 1);
        let rel = dependency(&a, &b);
        writer
            .write_graph(&database, "g1", &[a.clone(), b.clone()], &[rel])
            .unwrap();

        let outgoing = service.dependencies("g1", &a.id, Direction::Outgoing).unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].entity.name, "b");

        let incoming = service.dependencies("g1", &a.id, Direction::Incoming).unwrap();
        assert!(incoming.is_empty());

        let both = service.dependencies("g1", &b.id, Direction::Both).unwrap();
        assert_eq!(both.len(), 1);

        let missing = service.dependencies("g1", "no-such-id", Direction::Both);
        assert!(matches!(missing, Err(DatabaseError::NotFound(_))));
    }

    #[test]
    fn three_node_cycle_is_found_and_chain_is_not() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (database, service, writer) = setup(&temp_dir);
        let a = function_entity("A", "src/a.ts", 1);
        let b = function_entity("B", "src/b.ts", 1);
        let c = function_entity("C", "src/c.ts", 1);

        // A -> B -> C -> A
        let rels = vec![dependency(&a, &b), dependency(&b, &c), dependency(&c, &a)];
        writer
            .write_graph(&database, "cyclic", &[a.clone(), b.clone(), c.clone()], &rels)
            .unwrap();

        let cycles = service.find_cycles("cyclic", 10).unwrap();
        assert_eq!(cycles.len(), 1);
        for name in ["A", "B", "C"] {
            assert!(cycles[0].iter().any(|n| n == name));
        }

        // A -> B -> C with no return edge
        let chain = vec![dependency(&a, &b), dependency(&b, &c)];
        writer
            .write_graph(&database, "acyclic", &[a, b, c], &chain)
            .unwrap();
        assert!(service.find_cycles("acyclic", 10).unwrap().is_empty());
    }

    #[test]
    fn unresolved_edges_are_excluded_from_cycle_detection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (database, service, writer) = setup(&temp_dir);
        let a = function_entity("A", "src/a.ts", 1);
        let b = function_entity("B", "src/b.ts", 1);

        let forward = dependency(&a, &b);
        let back = CodeRelationship::new(
            b.id.clone(),
            a.id.clone(),
            RelationshipType::DependsOn,
            0.5,
            0.4,
            DetectionMethod::Heuristic,
            false,
        );
        writer
            .write_graph(&database, "g1", &[a, b], &[forward, back])
            .unwrap();

        assert!(service.find_cycles("g1", 10).unwrap().is_empty());
    }

    #[test]
    fn statistics_aggregate_counts_and_complexity() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (database, service, writer) = setup(&temp_dir);
        let f1 = function_entity("low", "src/a.ts", 1);
        let f2 = function_entity("high", "src/a.ts", 5);
        let rel = dependency(&f1, &f2);
        writer
            .write_graph(&database, "g1", &[f1, f2], &[rel])
            .unwrap();

        let stats = service.statistics("g1").unwrap();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_relationships, 1);
        assert_eq!(stats.entity_types, vec!["Function".to_string()]);
        assert_eq!(stats.languages, vec!["TypeScript".to_string()]);
        assert!((stats.average_complexity - 3.0).abs() < f64::EPSILON);
        assert_eq!(stats.max_complexity, 5);
    }
}
