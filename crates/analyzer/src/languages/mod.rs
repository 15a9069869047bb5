mod ecma;
pub mod javascript;
pub mod typescript;

use crate::error::AnalyzerError;
use database::graph::{CodeEntity, Language};
use std::collections::HashMap;
use std::path::Path;

pub use javascript::JavaScriptAnalyzer;
pub use typescript::TypeScriptAnalyzer;

/// Per-language syntax analysis. One implementation per supported language;
/// all of them are pure functions of the source text and safe to call from
/// parallel shards.
pub trait SyntaxAnalyzer: Send + Sync {
    fn language(&self) -> Language;

    /// Extracts all entities from one file's source. The first entity is
    /// always the `File` entity; the rest follow source order.
    fn analyze_source(&self, file_path: &str, source: &str)
    -> Result<Vec<CodeEntity>, AnalyzerError>;

    fn analyze(&self, path: &Path) -> Result<Vec<CodeEntity>, AnalyzerError> {
        let source = std::fs::read_to_string(path)?;
        self.analyze_source(&path.to_string_lossy(), &source)
    }

    /// Cheap parse-only check, used where callers need validity without
    /// extraction.
    fn validate_syntax(&self, source: &str) -> bool;
}

/// Routes files to the analyzer for their language.
pub struct AnalyzerRegistry {
    analyzers: HashMap<Language, Box<dyn SyntaxAnalyzer>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let mut analyzers: HashMap<Language, Box<dyn SyntaxAnalyzer>> = HashMap::new();
        analyzers.insert(Language::TypeScript, Box::new(TypeScriptAnalyzer));
        analyzers.insert(Language::JavaScript, Box::new(JavaScriptAnalyzer));
        Self { analyzers }
    }

    pub fn analyzer_for_path(&self, path: &Path) -> Result<&dyn SyntaxAnalyzer, AnalyzerError> {
        let language = Language::from_path(path)
            .ok_or_else(|| AnalyzerError::UnsupportedLanguage(path.display().to_string()))?;
        self.analyzers
            .get(&language)
            .map(|a| a.as_ref())
            .ok_or_else(|| AnalyzerError::UnsupportedLanguage(path.display().to_string()))
    }
}
