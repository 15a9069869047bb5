use crate::error::DatabaseError;
use crate::kuzu::connection::{KuzuConnection, params_from_json};
use kuzu::Database;
use serde_json::{Map, Value, json};

/// A pre-built, parameterized graph query. The templates below are the whole
/// query surface exposed to natural-language translation; free-form Cypher
/// never crosses this boundary.
#[derive(Debug, Clone)]
pub struct Query {
    pub name: &'static str,
    pub description: &'static str,
    pub query: &'static str,
}

pub struct QueryLibrary;

impl QueryLibrary {
    pub fn most_complex_entities() -> Query {
        Query {
            name: "most_complex_entities",
            description: "List the highest-complexity functions, components and hooks in a graph.",
            query: "MATCH (e:CodeEntity)
                    WHERE e.graph_id = $graph_id AND e.complexity > 0
                    RETURN e.name, e.entity_type, e.file_path, e.complexity
                    ORDER BY e.complexity DESC
                    LIMIT $limit",
        }
    }

    pub fn file_contents() -> Query {
        Query {
            name: "file_contents",
            description: "List every entity contained in files matching a path fragment.",
            query: "MATCH (f:CodeEntity)-[r:CodeRelationship]->(e:CodeEntity)
                    WHERE f.graph_id = $graph_id
                      AND r.rel_type = 'Contains'
                      AND toLower(f.file_path) CONTAINS toLower($path)
                    RETURN f.file_path, e.name, e.entity_type, e.start_line
                    ORDER BY f.file_path, e.start_line
                    LIMIT $limit",
        }
    }

    pub fn import_edges() -> Query {
        Query {
            name: "import_edges",
            description: "List import relationships between files in a graph.",
            query: "MATCH (a:CodeEntity)-[r:CodeRelationship]->(b:CodeEntity)
                    WHERE r.graph_id = $graph_id AND r.rel_type = 'Imports'
                    RETURN a.file_path, b.name, r.confidence, r.resolved
                    ORDER BY a.file_path
                    LIMIT $limit",
        }
    }

    pub fn inheritance_tree() -> Query {
        Query {
            name: "inheritance_tree",
            description: "List inheritance and implementation edges in a graph.",
            query: "MATCH (a:CodeEntity)-[r:CodeRelationship]->(b:CodeEntity)
                    WHERE r.graph_id = $graph_id
                      AND (r.rel_type = 'Inherits' OR r.rel_type = 'Implements')
                    RETURN a.name, r.rel_type, b.name, r.resolved
                    ORDER BY a.name
                    LIMIT $limit",
        }
    }

    pub fn name_matches() -> Query {
        Query {
            name: "name_matches",
            description: "Find entities whose name contains a search string.",
            query: "MATCH (e:CodeEntity)
                    WHERE e.graph_id = $graph_id
                      AND toLower(e.name) CONTAINS toLower($term)
                    RETURN e.name, e.entity_type, e.file_path, e.start_line
                    ORDER BY e.name
                    LIMIT $limit",
        }
    }

    pub fn all_queries() -> Vec<Query> {
        vec![
            Self::most_complex_entities(),
            Self::file_contents(),
            Self::import_edges(),
            Self::inheritance_tree(),
            Self::name_matches(),
        ]
    }
}

/// Stateless keyword-triggered mapping of a free-text request onto one of the
/// pre-built templates with bound parameters. Deliberately a thin, replaceable
/// layer: no state, no invariants of its own.
pub fn translate(text: &str, graph_id: &str) -> (Query, Map<String, Value>) {
    let lowered = text.to_lowercase();
    let mut params = Map::new();
    params.insert("graph_id".to_string(), json!(graph_id));
    params.insert("limit".to_string(), json!(50));

    if lowered.contains("complex") {
        return (QueryLibrary::most_complex_entities(), params);
    }
    if lowered.contains("import") || lowered.contains("depend") {
        return (QueryLibrary::import_edges(), params);
    }
    if lowered.contains("inherit") || lowered.contains("extend") || lowered.contains("implement") {
        return (QueryLibrary::inheritance_tree(), params);
    }
    if let Some(path) = lowered.strip_prefix("file ") {
        params.insert("path".to_string(), json!(path.trim()));
        return (QueryLibrary::file_contents(), params);
    }

    params.insert("term".to_string(), json!(text.trim()));
    (QueryLibrary::name_matches(), params)
}

/// Run one library query and return rows as display strings.
pub fn run_query(
    database: &Database,
    query: &Query,
    params: &Map<String, Value>,
) -> Result<Vec<Vec<String>>, DatabaseError> {
    let connection = KuzuConnection::new(database)?;
    let mut statement = connection.prepare(query.query)?;
    let result = connection.execute(&mut statement, params_from_json(params))?;
    Ok(result
        .into_iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_routes_on_keywords() {
        let (q, params) = translate("show me the most complex functions", "g1");
        assert_eq!(q.name, "most_complex_entities");
        assert_eq!(params["graph_id"], "g1");

        let (q, _) = translate("what does this module import?", "g1");
        assert_eq!(q.name, "import_edges");

        let (q, _) = translate("which classes extend Base?", "g1");
        assert_eq!(q.name, "inheritance_tree");

        let (q, params) = translate("file src/app.ts", "g1");
        assert_eq!(q.name, "file_contents");
        assert_eq!(params["path"], "src/app.ts");
    }

    #[test]
    fn translate_falls_back_to_name_search() {
        let (q, params) = translate("OrderService", "g1");
        assert_eq!(q.name, "name_matches");
        assert_eq!(params["term"], "OrderService");
    }

    #[test]
    fn every_template_is_graph_scoped() {
        for query in QueryLibrary::all_queries() {
            assert!(query.query.contains("$graph_id"), "{}", query.name);
        }
    }
}
