use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Closed set of program element kinds the analyzers can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum EntityType {
    File,
    Function,
    Class,
    Interface,
    Variable,
    Component,
    Hook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Language {
    TypeScript,
    JavaScript,
}

impl Language {
    /// Maps a file extension onto a supported language. TSX/JSX fold into
    /// their base language; the grammar distinction is handled inside the
    /// analyzer.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            _ => None,
        }
    }
}

/// One parameter of a function-like declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Declared type annotation, or "any" when the source carries none.
    pub declared_type: String,
    pub optional: bool,
    pub has_default: bool,
}

/// One file-level import statement, as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Module specifier, e.g. `./util` or `react`.
    pub source: String,
    pub imported_names: Vec<String>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum VariableKind {
    Const,
    Let,
    Var,
}

/// Analyzer-specific facts, one shape per entity type. Absence of a field in
/// a variant means "not applicable" for that kind of entity, not "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EntityProperties {
    File {
        line_count: u32,
        average_complexity: f64,
        imports: Vec<ImportRecord>,
        exports: Vec<String>,
    },
    Function {
        parameters: Vec<Parameter>,
        return_type: Option<String>,
        cyclomatic_complexity: u32,
        cognitive_complexity: u32,
        is_exported: bool,
        is_async: bool,
        doc_comment: Option<String>,
    },
    Class {
        extends: Option<String>,
        implements: Vec<String>,
        members: Vec<String>,
        is_exported: bool,
        is_abstract: bool,
        doc_comment: Option<String>,
    },
    Interface {
        extends: Vec<String>,
        members: Vec<String>,
        is_exported: bool,
        doc_comment: Option<String>,
    },
    Variable {
        declared_type: Option<String>,
        variable_kind: VariableKind,
        is_exported: bool,
    },
    Component {
        parameters: Vec<Parameter>,
        cyclomatic_complexity: u32,
        cognitive_complexity: u32,
        is_exported: bool,
        doc_comment: Option<String>,
    },
    Hook {
        parameters: Vec<Parameter>,
        cyclomatic_complexity: u32,
        cognitive_complexity: u32,
        is_exported: bool,
        doc_comment: Option<String>,
    },
    /// Stand-in for a relationship target the resolver could not match to a
    /// real entity (an external module or an unseen type name).
    Placeholder { expected_type: EntityType },
}

impl EntityProperties {
    /// Cyclomatic complexity for function-like entities; `None` for the rest.
    pub fn cyclomatic_complexity(&self) -> Option<u32> {
        match self {
            EntityProperties::Function {
                cyclomatic_complexity,
                ..
            }
            | EntityProperties::Component {
                cyclomatic_complexity,
                ..
            }
            | EntityProperties::Hook {
                cyclomatic_complexity,
                ..
            } => Some(*cyclomatic_complexity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Hex sha256 of the entity's exact source span, used for change
    /// detection across runs without semantic comparison.
    pub content_hash: String,
}

/// One discovered program element with its computed metrics. Created once per
/// analysis pass and immutable within it; a later pass supersedes it under a
/// different graph id rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub language: Language,
    pub file_path: String,
    /// 1-based, inclusive. `end_line >= start_line`.
    pub start_line: u32,
    pub end_line: u32,
    pub properties: EntityProperties,
    pub metadata: EntityMetadata,
}

impl CodeEntity {
    pub fn new(
        name: impl Into<String>,
        entity_type: EntityType,
        language: Language,
        file_path: impl Into<String>,
        start_line: u32,
        end_line: u32,
        properties: EntityProperties,
        content_hash: String,
    ) -> Self {
        debug_assert!(end_line >= start_line);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            entity_type,
            language,
            file_path: file_path.into(),
            start_line,
            end_line,
            properties,
            metadata: EntityMetadata {
                created_at: now,
                updated_at: now,
                content_hash,
            },
        }
    }
}
