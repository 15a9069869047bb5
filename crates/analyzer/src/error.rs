use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The file is not valid syntax for its declared language. File-local and
    /// recoverable: the orchestrator skips the file, never the job.
    #[error("Failed to parse {file}: {message}")]
    Parse { file: String, message: String },
    #[error("Unsupported language for {0}")]
    UnsupportedLanguage(String),
    #[error("Grammar error: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
