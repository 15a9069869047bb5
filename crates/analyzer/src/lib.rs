pub mod complexity;
pub mod error;
pub mod languages;
pub mod resolver;

pub use error::AnalyzerError;
pub use languages::{AnalyzerRegistry, SyntaxAnalyzer};
pub use resolver::RelationshipResolver;

/// Hex sha256 digest of an entity's exact source span. Used for change
/// detection across runs without semantic comparison.
pub fn content_hash(source: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(source.as_bytes()))
}
