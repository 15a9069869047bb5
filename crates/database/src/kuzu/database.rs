use crate::error::DatabaseError;
use kuzu::{Database, SystemConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Process-wide cache of open Kuzu databases, keyed by path. Kuzu allows one
/// `Database` instance per directory, so every component must go through this
/// manager to share the handle.
pub struct KuzuDatabase {
    databases: Mutex<HashMap<String, Arc<Database>>>,
}

impl Default for KuzuDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl KuzuDatabase {
    pub fn new() -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create_database(
        &self,
        database_path: &str,
    ) -> Result<Arc<Database>, DatabaseError> {
        let mut databases_guard = self
            .databases
            .lock()
            .map_err(|_| DatabaseError::InitializationFailed("database map poisoned".into()))?;

        if let Some(existing) = databases_guard.get(database_path) {
            return Ok(existing.clone());
        }

        let database =
            Database::new(database_path, SystemConfig::default()).map_err(DatabaseError::Kuzu)?;
        info!("Opened graph database at {database_path}");

        let database_arc = Arc::new(database);
        databases_guard.insert(database_path.to_string(), database_arc.clone());
        Ok(database_arc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_share_one_open_handle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("graph.db");
        let manager = KuzuDatabase::new();
        let first = manager
            .get_or_create_database(path.to_str().unwrap())
            .unwrap();
        let second = manager
            .get_or_create_database(path.to_str().unwrap())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
