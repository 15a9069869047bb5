//! Source file discovery. Walks the repository respecting ignore files,
//! keeps only files the analyzers support, and silently drops anything over
//! the size cutoff or unreadable. Results are sorted so sharding is
//! deterministic for a given tree.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait FileDiscoverer: Send + Sync {
    fn discover(&self, root: &Path, max_file_size: u64) -> Vec<PathBuf>;
}

/// `.gitignore`-aware recursive walk over a repository root.
pub struct WalkDiscoverer;

impl FileDiscoverer for WalkDiscoverer {
    fn discover(&self, root: &Path, max_file_size: u64) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .filter(|entry| database::graph::Language::from_path(entry.path()).is_some())
            .filter(|entry| {
                entry
                    .metadata()
                    .map(|m| m.len() <= max_file_size)
                    .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        debug!(count = files.len(), root = %root.display(), "discovered source files");
        files
    }
}
