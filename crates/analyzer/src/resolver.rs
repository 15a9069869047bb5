//! Batch-wide relationship resolution. Runs after all shards finish so names
//! can be matched across every analyzed file, then emits containment,
//! inheritance and import edges. Targets that cannot be matched to a real
//! entity get a placeholder entity and an unresolved, lower-confidence edge
//! rather than being dropped.

use database::graph::{
    CodeEntity, CodeRelationship, DetectionMethod, EntityProperties, EntityType, Language,
    RelationshipType,
};
use std::collections::HashMap;
use tracing::debug;

const EXTENSION_CANDIDATES: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Edges plus the placeholder entities they refer to. Placeholders must be
/// persisted before the relationships that target them.
#[derive(Debug, Default)]
pub struct ResolvedGraph {
    pub placeholder_entities: Vec<CodeEntity>,
    pub relationships: Vec<CodeRelationship>,
}

pub struct RelationshipResolver;

impl Default for RelationshipResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, entities: &[CodeEntity]) -> ResolvedGraph {
        let mut graph = ResolvedGraph::default();
        let mut placeholders: HashMap<(String, EntityType), String> = HashMap::new();

        // Name and path indexes over the whole batch. Name collisions keep
        // the first occurrence, matching source discovery order.
        let mut by_name: HashMap<&str, &CodeEntity> = HashMap::new();
        let mut files_by_path: HashMap<&str, &CodeEntity> = HashMap::new();
        for entity in entities {
            if entity.entity_type == EntityType::File {
                files_by_path.entry(&entity.file_path).or_insert(entity);
            } else {
                by_name.entry(&entity.name).or_insert(entity);
            }
        }

        self.resolve_containment(entities, &mut graph);
        self.resolve_inheritance(entities, &by_name, &mut placeholders, &mut graph);
        self.resolve_imports(entities, &files_by_path, &mut placeholders, &mut graph);
        graph
            .relationships
            .extend(self.extract_call_relationships(entities));

        debug!(
            relationships = graph.relationships.len(),
            placeholders = graph.placeholder_entities.len(),
            "resolved relationship batch"
        );
        graph
    }

    /// Every file contains each non-file entity extracted from it.
    fn resolve_containment(&self, entities: &[CodeEntity], graph: &mut ResolvedGraph) {
        let mut file_for_path: HashMap<&str, &str> = HashMap::new();
        for entity in entities {
            if entity.entity_type == EntityType::File {
                file_for_path.entry(&entity.file_path).or_insert(&entity.id);
            }
        }
        for entity in entities {
            if entity.entity_type == EntityType::File {
                continue;
            }
            if let Some(file_id) = file_for_path.get(entity.file_path.as_str()) {
                graph.relationships.push(CodeRelationship::new(
                    *file_id,
                    &entity.id,
                    RelationshipType::Contains,
                    1.0,
                    1.0,
                    DetectionMethod::Static,
                    true,
                ));
            }
        }
    }

    fn resolve_inheritance(
        &self,
        entities: &[CodeEntity],
        by_name: &HashMap<&str, &CodeEntity>,
        placeholders: &mut HashMap<(String, EntityType), String>,
        graph: &mut ResolvedGraph,
    ) {
        for entity in entities {
            match &entity.properties {
                EntityProperties::Class {
                    extends,
                    implements,
                    ..
                } => {
                    if let Some(parent) = extends {
                        self.link_named(
                            entity,
                            parent,
                            RelationshipType::Inherits,
                            EntityType::Class,
                            by_name,
                            placeholders,
                            graph,
                        );
                    }
                    for interface in implements {
                        self.link_named(
                            entity,
                            interface,
                            RelationshipType::Implements,
                            EntityType::Interface,
                            by_name,
                            placeholders,
                            graph,
                        );
                    }
                }
                EntityProperties::Interface { extends, .. } => {
                    for parent in extends {
                        self.link_named(
                            entity,
                            parent,
                            RelationshipType::Inherits,
                            EntityType::Interface,
                            by_name,
                            placeholders,
                            graph,
                        );
                    }
                }
                _ => {}
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn link_named(
        &self,
        source: &CodeEntity,
        target_name: &str,
        rel_type: RelationshipType,
        expected_type: EntityType,
        by_name: &HashMap<&str, &CodeEntity>,
        placeholders: &mut HashMap<(String, EntityType), String>,
        graph: &mut ResolvedGraph,
    ) {
        match by_name.get(target_name) {
            Some(target) => graph.relationships.push(CodeRelationship::new(
                &source.id,
                &target.id,
                rel_type,
                1.0,
                0.9,
                DetectionMethod::Static,
                true,
            )),
            None => {
                let target_id = self.placeholder_id(
                    target_name,
                    expected_type,
                    source.language,
                    placeholders,
                    graph,
                );
                graph.relationships.push(CodeRelationship::new(
                    &source.id,
                    target_id,
                    rel_type,
                    0.5,
                    0.4,
                    DetectionMethod::Heuristic,
                    false,
                ));
            }
        }
    }

    /// File-to-file import edges. Relative specifiers are resolved against
    /// the importing file's directory with the usual extension and
    /// `index.*` fallbacks; bare specifiers (packages) and unresolvable
    /// paths become placeholder modules.
    fn resolve_imports(
        &self,
        entities: &[CodeEntity],
        files_by_path: &HashMap<&str, &CodeEntity>,
        placeholders: &mut HashMap<(String, EntityType), String>,
        graph: &mut ResolvedGraph,
    ) {
        for entity in entities {
            let EntityProperties::File { imports, .. } = &entity.properties else {
                continue;
            };
            for import in imports {
                let target = self
                    .import_candidates(&entity.file_path, &import.source)
                    .into_iter()
                    .find_map(|candidate| files_by_path.get(candidate.as_str()).copied());
                match target {
                    Some(target_file) => graph.relationships.push(CodeRelationship::new(
                        &entity.id,
                        &target_file.id,
                        RelationshipType::Imports,
                        1.0,
                        0.85,
                        DetectionMethod::Static,
                        true,
                    )),
                    None => {
                        let target_id = self.placeholder_id(
                            &import.source,
                            EntityType::File,
                            entity.language,
                            placeholders,
                            graph,
                        );
                        graph.relationships.push(CodeRelationship::new(
                            &entity.id,
                            target_id,
                            RelationshipType::Imports,
                            0.5,
                            0.3,
                            DetectionMethod::Heuristic,
                            false,
                        ));
                    }
                }
            }
        }
    }

    /// Candidate file paths for a relative import specifier, in priority
    /// order: the literal path, extension variants, then `index.*` inside
    /// the named directory. Bare specifiers yield no candidates.
    fn import_candidates(&self, importing_file: &str, specifier: &str) -> Vec<String> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return Vec::new();
        }
        let directory = match importing_file.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        };
        let base = normalize_posix_path(&format!("{directory}/{specifier}"));

        let mut candidates = vec![base.clone()];
        for extension in EXTENSION_CANDIDATES {
            candidates.push(format!("{base}.{extension}"));
        }
        for extension in EXTENSION_CANDIDATES {
            candidates.push(format!("{base}/index.{extension}"));
        }
        candidates
    }

    fn placeholder_id(
        &self,
        name: &str,
        expected_type: EntityType,
        language: Language,
        placeholders: &mut HashMap<(String, EntityType), String>,
        graph: &mut ResolvedGraph,
    ) -> String {
        if let Some(id) = placeholders.get(&(name.to_string(), expected_type)) {
            return id.clone();
        }
        let placeholder = CodeEntity::new(
            name,
            expected_type,
            language,
            "",
            0,
            0,
            EntityProperties::Placeholder { expected_type },
            crate::content_hash(name),
        );
        let id = placeholder.id.clone();
        placeholders.insert((name.to_string(), expected_type), id.clone());
        graph.placeholder_entities.push(placeholder);
        id
    }

    /// Call-edge extraction requires scope-aware reference resolution, which
    /// the syntax-level pass does not attempt. Kept as an explicit empty
    /// stage so the persistence path and edge taxonomy already account for
    /// `Calls` edges.
    fn extract_call_relationships(&self, _entities: &[CodeEntity]) -> Vec<CodeRelationship> {
        Vec::new()
    }
}

/// Collapses `.` and `..` segments without touching the filesystem. Paths
/// here are always forward-slash separated, as produced by discovery.
fn normalize_posix_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntaxAnalyzer;
    use crate::languages::TypeScriptAnalyzer;

    fn analyze(path: &str, source: &str) -> Vec<CodeEntity> {
        TypeScriptAnalyzer.analyze_source(path, source).unwrap()
    }

    #[test]
    fn every_extracted_entity_is_contained_by_its_file() {
        let entities = analyze(
            "src/shapes.ts",
            "export class Circle {}\nexport function area(): number { return 0; }\n",
        );
        let graph = RelationshipResolver::new().resolve(&entities);
        let contains: Vec<_> = graph
            .relationships
            .iter()
            .filter(|r| r.rel_type == RelationshipType::Contains)
            .collect();
        assert_eq!(contains.len(), 2);
        let file_id = &entities[0].id;
        assert!(contains.iter().all(|r| &r.source_id == file_id));
        assert!(
            contains
                .iter()
                .all(|r| r.strength == 1.0 && r.confidence == 1.0 && r.metadata.resolved)
        );
    }

    #[test]
    fn inheritance_resolves_across_files_in_the_same_batch() {
        let mut entities = analyze("src/base.ts", "export class Base {}\n");
        entities.extend(analyze(
            "src/derived.ts",
            "import { Base } from './base';\nexport class Derived extends Base {}\n",
        ));
        let graph = RelationshipResolver::new().resolve(&entities);

        let inherits = graph
            .relationships
            .iter()
            .find(|r| r.rel_type == RelationshipType::Inherits)
            .unwrap();
        let base = entities.iter().find(|e| e.name == "Base").unwrap();
        assert_eq!(inherits.target_id, base.id);
        assert!(inherits.metadata.resolved);
        assert_eq!(inherits.confidence, 0.9);
    }

    #[test]
    fn unknown_parent_gets_a_placeholder_and_an_unresolved_edge() {
        let entities = analyze("src/app.ts", "export class App extends Framework {}\n");
        let graph = RelationshipResolver::new().resolve(&entities);

        assert_eq!(graph.placeholder_entities.len(), 1);
        let placeholder = &graph.placeholder_entities[0];
        assert_eq!(placeholder.name, "Framework");
        assert!(matches!(
            placeholder.properties,
            EntityProperties::Placeholder {
                expected_type: EntityType::Class
            }
        ));

        let inherits = graph
            .relationships
            .iter()
            .find(|r| r.rel_type == RelationshipType::Inherits)
            .unwrap();
        assert_eq!(inherits.target_id, placeholder.id);
        assert!(!inherits.metadata.resolved);
        assert_eq!(inherits.confidence, 0.4);
    }

    #[test]
    fn relative_imports_resolve_through_extension_fallbacks() {
        let mut entities = analyze("src/util/format.ts", "export function fmt() {}\n");
        entities.extend(analyze(
            "src/main.ts",
            "import { fmt } from './util/format';\nfmt();\n",
        ));
        let graph = RelationshipResolver::new().resolve(&entities);

        let import = graph
            .relationships
            .iter()
            .find(|r| r.rel_type == RelationshipType::Imports)
            .unwrap();
        let target = entities
            .iter()
            .find(|e| e.file_path == "src/util/format.ts")
            .unwrap();
        assert_eq!(import.target_id, target.id);
        assert!(import.metadata.resolved);
        assert_eq!(import.confidence, 0.85);
    }

    #[test]
    fn bare_package_imports_become_placeholder_modules() {
        let entities = analyze("src/main.ts", "import { useState } from 'react';\n");
        let graph = RelationshipResolver::new().resolve(&entities);

        assert_eq!(graph.placeholder_entities.len(), 1);
        assert_eq!(graph.placeholder_entities[0].name, "react");
        let import = graph
            .relationships
            .iter()
            .find(|r| r.rel_type == RelationshipType::Imports)
            .unwrap();
        assert!(!import.metadata.resolved);
        assert_eq!(import.confidence, 0.3);
    }

    #[test]
    fn repeated_unresolved_targets_share_one_placeholder() {
        let mut entities = analyze("src/a.ts", "import React from 'react';\n");
        entities.extend(analyze("src/b.ts", "import React from 'react';\n"));
        let graph = RelationshipResolver::new().resolve(&entities);

        assert_eq!(graph.placeholder_entities.len(), 1);
        let imports: Vec<_> = graph
            .relationships
            .iter()
            .filter(|r| r.rel_type == RelationshipType::Imports)
            .collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].target_id, imports[1].target_id);
    }

    #[test]
    fn no_call_edges_are_emitted_by_the_syntax_pass() {
        let entities = analyze("src/a.ts", "function f() { g(); }\nfunction g() {}\n");
        let graph = RelationshipResolver::new().resolve(&entities);
        assert!(
            graph
                .relationships
                .iter()
                .all(|r| r.rel_type != RelationshipType::Calls)
        );
    }
}
