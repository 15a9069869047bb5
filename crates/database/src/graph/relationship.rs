use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Typed, directed edge kinds between code entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum RelationshipType {
    Imports,
    Exports,
    Calls,
    Inherits,
    Implements,
    Contains,
    DependsOn,
}

impl RelationshipType {
    /// The structural dependency subset traversed by cycle detection.
    /// Containment and call edges are deliberately excluded.
    pub fn dependency_types() -> &'static [RelationshipType] {
        &[
            RelationshipType::Imports,
            RelationshipType::Inherits,
            RelationshipType::Implements,
            RelationshipType::DependsOn,
        ]
    }

    pub fn is_dependency(&self) -> bool {
        Self::dependency_types().contains(self)
    }
}

/// How an edge was detected. Static parsing outranks heuristics, which
/// outrank AI-derived edges; confidence values must respect that order for
/// edges between the same entity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DetectionMethod {
    Static,
    Heuristic,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    pub detection_method: DetectionMethod,
    /// False when the target is a generated placeholder rather than a real
    /// entity matched by name. Unresolved edges are excluded from cycle
    /// detection.
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// One directed, typed edge between two entities of the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRelationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub rel_type: RelationshipType,
    /// Structural certainty in [0, 1]; containment is always 1.0.
    pub strength: f64,
    /// Detection-method reliability in [0, 1].
    pub confidence: f64,
    pub metadata: RelationshipMetadata,
}

impl CodeRelationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        rel_type: RelationshipType,
        strength: f64,
        confidence: f64,
        detection_method: DetectionMethod,
        resolved: bool,
    ) -> Self {
        debug_assert!((0.0..=1.0).contains(&strength));
        debug_assert!((0.0..=1.0).contains(&confidence));
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            rel_type,
            strength,
            confidence,
            metadata: RelationshipMetadata {
                detection_method,
                resolved,
                created_at: Utc::now(),
            },
        }
    }
}
