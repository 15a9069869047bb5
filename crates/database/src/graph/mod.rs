pub mod entity;
pub mod relationship;

pub use entity::{
    CodeEntity, EntityMetadata, EntityProperties, EntityType, ImportRecord, Language, Parameter,
    VariableKind,
};
pub use relationship::{
    CodeRelationship, DetectionMethod, RelationshipMetadata, RelationshipType,
};
