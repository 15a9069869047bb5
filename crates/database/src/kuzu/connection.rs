use crate::error::DatabaseError;
use kuzu::{Connection, Database};
use tracing::debug;

pub struct KuzuConnection<'a> {
    connection: Connection<'a>,
}

impl<'a> KuzuConnection<'a> {
    pub fn new(database: &'a Database) -> Result<Self, DatabaseError> {
        let connection = Connection::new(database)?;
        Ok(Self { connection })
    }

    pub fn query(&self, query: &str) -> Result<kuzu::QueryResult<'_>, DatabaseError> {
        self.connection
            .query(query)
            .map_err(|e| DatabaseError::QueryExecutionError {
                query: query.to_string(),
                error: e,
            })
    }

    /// Execute a prepared statement with named parameters.
    pub fn execute(
        &self,
        statement: &mut kuzu::PreparedStatement,
        params: Vec<(&str, kuzu::Value)>,
    ) -> Result<kuzu::QueryResult<'_>, DatabaseError> {
        self.connection
            .execute(statement, params)
            .map_err(DatabaseError::Kuzu)
    }

    pub fn prepare(&self, query: &str) -> Result<kuzu::PreparedStatement, DatabaseError> {
        self.connection.prepare(query).map_err(DatabaseError::Kuzu)
    }

    pub fn execute_ddl(&self, query: &str) -> Result<(), DatabaseError> {
        debug!("Executing DDL: {}", query);
        let mut prepared = self.connection.prepare(query)?;
        let mut result = self.connection.execute(&mut prepared, vec![])?;
        // Consume the result to ensure the statement ran.
        while result.next().is_some() {}
        Ok(())
    }

    /// Run `f` inside a single transaction. Bounds one write batch.
    pub fn transaction(
        &self,
        f: impl FnOnce(&KuzuConnection) -> Result<(), DatabaseError>,
    ) -> Result<(), DatabaseError> {
        self.execute_ddl("BEGIN TRANSACTION;")?;
        match f(self) {
            Ok(()) => self.execute_ddl("COMMIT;"),
            Err(e) => {
                // Surface the original failure even if rollback itself fails.
                let _ = self.execute_ddl("ROLLBACK;");
                Err(e)
            }
        }
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, DatabaseError> {
        let result = self.query("CALL SHOW_TABLES() RETURN *")?;
        for row in result {
            if let Some(kuzu::Value::String(existing)) = row.get(1)
                && existing.eq_ignore_ascii_case(table_name)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Convert query parameters expressed as JSON into Kuzu values.
pub fn params_from_json(
    json_params: &serde_json::Map<String, serde_json::Value>,
) -> Vec<(&str, kuzu::Value)> {
    json_params
        .iter()
        .map(|(key, value)| (key.as_str(), json_to_kuzu_value(value)))
        .collect()
}

fn json_to_kuzu_value(value: &serde_json::Value) -> kuzu::Value {
    match value {
        serde_json::Value::String(s) => kuzu::Value::from(s.as_str()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                kuzu::Value::from(i)
            } else {
                kuzu::Value::from(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::Bool(b) => kuzu::Value::Bool(*b),
        serde_json::Value::Null => kuzu::Value::Null(kuzu::LogicalType::Any),
        serde_json::Value::Array(arr) => {
            let values: Vec<kuzu::Value> = arr.iter().map(json_to_kuzu_value).collect();
            let logical_type = match arr.first() {
                Some(serde_json::Value::String(_)) => kuzu::LogicalType::String,
                Some(serde_json::Value::Number(n)) if n.is_i64() => kuzu::LogicalType::Int64,
                Some(serde_json::Value::Number(_)) => kuzu::LogicalType::Double,
                Some(serde_json::Value::Bool(_)) => kuzu::LogicalType::Bool,
                _ => kuzu::LogicalType::Any,
            };
            kuzu::Value::List(logical_type, values)
        }
        serde_json::Value::Object(obj) => {
            let fields = obj
                .iter()
                .map(|(k, v)| (k.to_string(), json_to_kuzu_value(v)))
                .collect();
            kuzu::Value::Struct(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kuzu::database::KuzuDatabase;

    #[test]
    fn query_with_params_and_table_checks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let manager = KuzuDatabase::new();
        let database = manager
            .get_or_create_database(db_path.to_str().unwrap())
            .unwrap();
        let conn = KuzuConnection::new(&database).unwrap();

        conn.execute_ddl("CREATE NODE TABLE Item (name STRING, score INT64, PRIMARY KEY (name))")
            .unwrap();
        assert!(conn.table_exists("Item").unwrap());
        assert!(!conn.table_exists("Missing").unwrap());

        conn.execute_ddl("CREATE (i:Item {name: 'alpha', score: 3});")
            .unwrap();

        let mut stmt = conn
            .prepare("MATCH (i:Item) WHERE i.name = $name RETURN i.score")
            .unwrap();
        let params = serde_json::json!({ "name": "alpha" });
        let mut result = conn
            .execute(&mut stmt, params_from_json(params.as_object().unwrap()))
            .unwrap();
        let row = result.next().unwrap();
        assert_eq!(row[0].to_string(), "3");
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let manager = KuzuDatabase::new();
        let database = manager
            .get_or_create_database(db_path.to_str().unwrap())
            .unwrap();
        let conn = KuzuConnection::new(&database).unwrap();
        conn.execute_ddl("CREATE NODE TABLE Item (name STRING, PRIMARY KEY (name))")
            .unwrap();

        let result = conn.transaction(|c| {
            c.execute_ddl("CREATE (i:Item {name: 'inside'});")?;
            Err(DatabaseError::InitializationFailed("boom".into()))
        });
        assert!(result.is_err());

        let mut rows = conn.query("MATCH (i:Item) RETURN count(i)").unwrap();
        let row = rows.next().unwrap();
        assert_eq!(row[0].to_string(), "0");
    }
}
