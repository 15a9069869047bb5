//! Shared ECMAScript syntax walker used by the TypeScript and JavaScript
//! analyzers. The two grammars expose near-identical node kinds, so one
//! walker handles both; TypeScript-only shapes (interfaces, type
//! annotations, implements clauses) simply never match under the JavaScript
//! grammar.

use crate::complexity::{cognitive, cyclomatic, is_function_like};
use crate::content_hash;
use crate::error::AnalyzerError;
use database::graph::{
    CodeEntity, EntityProperties, EntityType, ImportRecord, Language, Parameter, VariableKind,
};
use tree_sitter::{Node, Parser};

pub(crate) fn analyze_source(
    grammar: &tree_sitter::Language,
    language: Language,
    file_path: &str,
    source: &str,
) -> Result<Vec<CodeEntity>, AnalyzerError> {
    let tree = parse(grammar, source).ok_or_else(|| AnalyzerError::Parse {
        file: file_path.to_string(),
        message: "parser produced no tree".to_string(),
    })?;
    if tree.root_node().has_error() {
        return Err(AnalyzerError::Parse {
            file: file_path.to_string(),
            message: "source contains syntax errors".to_string(),
        });
    }

    let walker = EcmaWalker {
        file_path,
        source,
        language,
    };
    Ok(walker.walk(tree.root_node()))
}

pub(crate) fn validate(grammar: &tree_sitter::Language, source: &str) -> bool {
    parse(grammar, source).is_some_and(|tree| !tree.root_node().has_error())
}

fn parse(grammar: &tree_sitter::Language, source: &str) -> Option<tree_sitter::Tree> {
    let mut parser = Parser::new();
    parser.set_language(grammar).ok()?;
    parser.parse(source, None)
}

struct EcmaWalker<'a> {
    file_path: &'a str,
    source: &'a str,
    language: Language,
}

impl<'a> EcmaWalker<'a> {
    fn walk(&self, root: Node) -> Vec<CodeEntity> {
        let mut entities = Vec::new();
        self.visit(root, &mut entities);

        let complexities: Vec<u32> = entities
            .iter()
            .filter_map(|e| e.properties.cyclomatic_complexity())
            .collect();
        let average_complexity = if complexities.is_empty() {
            0.0
        } else {
            complexities.iter().sum::<u32>() as f64 / complexities.len() as f64
        };

        let line_count = self.source.lines().count().max(1) as u32;
        let file_name = self
            .file_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file_path);
        let file_entity = CodeEntity::new(
            file_name,
            EntityType::File,
            self.language,
            self.file_path,
            1,
            line_count,
            EntityProperties::File {
                line_count,
                average_complexity,
                imports: self.collect_imports(root),
                exports: self.collect_exports(root),
            },
            content_hash(self.source),
        );
        entities.insert(0, file_entity);
        entities
    }

    fn visit(&self, node: Node, out: &mut Vec<CodeEntity>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    out.push(self.function_entity(&name, node, node));
                }
            }
            "method_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    out.push(self.function_entity(&name, node, node));
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    out.push(self.class_entity(&name, node));
                }
            }
            "interface_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    out.push(self.interface_entity(&name, node));
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                if self.is_top_level(node) {
                    self.visit_variable_declaration(node, out);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, out);
        }
    }

    fn visit_variable_declaration(&self, node: Node, out: &mut Vec<CodeEntity>) {
        let kind = if node.kind() == "variable_declaration" {
            VariableKind::Var
        } else if self.node_text(node).trim_start().starts_with("let") {
            VariableKind::Let
        } else {
            VariableKind::Const
        };

        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = self.field_text(declarator, "name") else {
                continue;
            };
            match declarator.child_by_field_name("value") {
                Some(value) if is_function_like(value.kind()) => {
                    out.push(self.function_entity(&name, node, value));
                }
                _ => {
                    let declared_type = self.annotation_text(declarator, "type");
                    out.push(CodeEntity::new(
                        name,
                        EntityType::Variable,
                        self.language,
                        self.file_path,
                        node.start_position().row as u32 + 1,
                        node.end_position().row as u32 + 1,
                        EntityProperties::Variable {
                            declared_type,
                            variable_kind: kind,
                            is_exported: self.is_exported(node),
                        },
                        content_hash(self.node_text(node)),
                    ));
                }
            }
        }
    }

    /// `span_node` is the declaration statement (used for span, doc comment
    /// and export detection); `func_node` carries parameters and body (they
    /// differ for variable-bound arrow functions).
    fn function_entity(&self, name: &str, span_node: Node, func_node: Node) -> CodeEntity {
        let parameters = self.parameters(func_node);
        let return_type = self.annotation_text(func_node, "return_type");
        let is_async = self.has_token(func_node, "async");
        let cyclomatic_complexity = cyclomatic(func_node, self.source.as_bytes());
        let cognitive_complexity = cognitive(func_node, self.source.as_bytes());
        let is_exported = self.is_exported(span_node);
        let doc_comment = self.doc_comment(span_node);
        let body_text = func_node
            .child_by_field_name("body")
            .map(|b| self.node_text(b))
            .unwrap_or("");

        let properties = match self.classify_function(name, body_text) {
            EntityType::Component => EntityProperties::Component {
                parameters,
                cyclomatic_complexity,
                cognitive_complexity,
                is_exported,
                doc_comment,
            },
            EntityType::Hook => EntityProperties::Hook {
                parameters,
                cyclomatic_complexity,
                cognitive_complexity,
                is_exported,
                doc_comment,
            },
            _ => EntityProperties::Function {
                parameters,
                return_type,
                cyclomatic_complexity,
                cognitive_complexity,
                is_exported,
                is_async,
                doc_comment,
            },
        };
        let entity_type = match &properties {
            EntityProperties::Component { .. } => EntityType::Component,
            EntityProperties::Hook { .. } => EntityType::Hook,
            _ => EntityType::Function,
        };

        CodeEntity::new(
            name,
            entity_type,
            self.language,
            self.file_path,
            span_node.start_position().row as u32 + 1,
            span_node.end_position().row as u32 + 1,
            properties,
            content_hash(self.node_text(span_node)),
        )
    }

    fn class_entity(&self, name: &str, node: Node) -> CodeEntity {
        let mut extends = None;
        let mut implements = Vec::new();

        let mut cursor = node.walk();
        if let Some(heritage) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "class_heritage")
        {
            let mut heritage_cursor = heritage.walk();
            let clauses: Vec<Node> = heritage.named_children(&mut heritage_cursor).collect();
            if clauses.is_empty() {
                // JavaScript grammar: `class_heritage` is `extends <expr>`.
                if let Some(expr) = heritage.child(1) {
                    extends = Some(self.node_text(expr).to_string());
                }
            }
            for clause in clauses {
                match clause.kind() {
                    "extends_clause" => {
                        extends = clause
                            .child_by_field_name("value")
                            .or_else(|| clause.named_child(0))
                            .map(|n| self.node_text(n).to_string());
                    }
                    "implements_clause" => {
                        let mut c = clause.walk();
                        implements.extend(
                            clause
                                .named_children(&mut c)
                                .map(|n| self.node_text(n).to_string()),
                        );
                    }
                    _ => {
                        if extends.is_none() {
                            extends = Some(self.node_text(clause).to_string());
                        }
                    }
                }
            }
        }

        let members = self.member_names(
            node.child_by_field_name("body"),
            &["method_definition", "public_field_definition", "abstract_method_signature"],
        );

        CodeEntity::new(
            name,
            EntityType::Class,
            self.language,
            self.file_path,
            node.start_position().row as u32 + 1,
            node.end_position().row as u32 + 1,
            EntityProperties::Class {
                extends,
                implements,
                members,
                is_exported: self.is_exported(node),
                is_abstract: node.kind() == "abstract_class_declaration",
                doc_comment: self.doc_comment(node),
            },
            content_hash(self.node_text(node)),
        )
    }

    fn interface_entity(&self, name: &str, node: Node) -> CodeEntity {
        let mut extends = Vec::new();
        let mut cursor = node.walk();
        if let Some(clause) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "extends_type_clause")
        {
            let mut c = clause.walk();
            extends.extend(
                clause
                    .named_children(&mut c)
                    .map(|n| self.node_text(n).to_string()),
            );
        }

        let members = self.member_names(
            node.child_by_field_name("body"),
            &["property_signature", "method_signature"],
        );

        CodeEntity::new(
            name,
            EntityType::Interface,
            self.language,
            self.file_path,
            node.start_position().row as u32 + 1,
            node.end_position().row as u32 + 1,
            EntityProperties::Interface {
                extends,
                members,
                is_exported: self.is_exported(node),
                doc_comment: self.doc_comment(node),
            },
            content_hash(self.node_text(node)),
        )
    }

    fn member_names(&self, body: Option<Node>, kinds: &[&str]) -> Vec<String> {
        let Some(body) = body else {
            return Vec::new();
        };
        let mut cursor = body.walk();
        body.named_children(&mut cursor)
            .filter(|member| kinds.contains(&member.kind()))
            .filter_map(|member| self.field_text(member, "name"))
            .collect()
    }

    fn parameters(&self, func_node: Node) -> Vec<Parameter> {
        let Some(params) = func_node.child_by_field_name("parameters") else {
            // Single-parameter arrow function without parentheses.
            if let Some(param) = func_node.child_by_field_name("parameter") {
                return vec![Parameter {
                    name: self.node_text(param).to_string(),
                    declared_type: "any".to_string(),
                    optional: false,
                    has_default: false,
                }];
            }
            return Vec::new();
        };

        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter(|p| p.kind() != "comment")
            .map(|p| self.parameter(p))
            .collect()
    }

    fn parameter(&self, node: Node) -> Parameter {
        match node.kind() {
            // TypeScript grammar wraps each parameter.
            "required_parameter" | "optional_parameter" => {
                let name = node
                    .child_by_field_name("pattern")
                    .map(|p| self.node_text(p).to_string())
                    .unwrap_or_else(|| self.node_text(node).to_string());
                Parameter {
                    name,
                    declared_type: self
                        .annotation_text(node, "type")
                        .unwrap_or_else(|| "any".to_string()),
                    optional: node.kind() == "optional_parameter",
                    has_default: node.child_by_field_name("value").is_some(),
                }
            }
            // JavaScript grammar uses bare patterns.
            "assignment_pattern" => Parameter {
                name: node
                    .child_by_field_name("left")
                    .map(|l| self.node_text(l).to_string())
                    .unwrap_or_default(),
                declared_type: "any".to_string(),
                optional: false,
                has_default: true,
            },
            _ => Parameter {
                name: self.node_text(node).to_string(),
                declared_type: "any".to_string(),
                optional: false,
                has_default: false,
            },
        }
    }

    fn collect_imports(&self, root: Node) -> Vec<ImportRecord> {
        let mut imports = Vec::new();
        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() != "import_statement" {
                continue;
            }
            let Some(source) = statement
                .child_by_field_name("source")
                .map(|s| self.string_literal(s))
            else {
                continue;
            };
            let mut imported_names = Vec::new();
            let mut statement_cursor = statement.walk();
            for child in statement.named_children(&mut statement_cursor) {
                if child.kind() != "import_clause" {
                    continue;
                }
                let mut clause_cursor = child.walk();
                for item in child.named_children(&mut clause_cursor) {
                    match item.kind() {
                        "identifier" => imported_names.push(self.node_text(item).to_string()),
                        "namespace_import" => {
                            if let Some(alias) = item.named_child(0) {
                                imported_names.push(self.node_text(alias).to_string());
                            }
                        }
                        "named_imports" => {
                            let mut imports_cursor = item.walk();
                            for spec in item.named_children(&mut imports_cursor) {
                                if spec.kind() == "import_specifier"
                                    && let Some(name) = self.field_text(spec, "name")
                                {
                                    imported_names.push(name);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            imports.push(ImportRecord {
                source,
                imported_names,
                line: statement.start_position().row as u32 + 1,
            });
        }
        imports
    }

    fn collect_exports(&self, root: Node) -> Vec<String> {
        let mut exports = Vec::new();
        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() != "export_statement" {
                continue;
            }
            if let Some(declaration) = statement.child_by_field_name("declaration") {
                if let Some(name) = self.field_text(declaration, "name") {
                    exports.push(name);
                } else if matches!(
                    declaration.kind(),
                    "lexical_declaration" | "variable_declaration"
                ) {
                    let mut decl_cursor = declaration.walk();
                    for declarator in declaration.named_children(&mut decl_cursor) {
                        if declarator.kind() == "variable_declarator"
                            && let Some(name) = self.field_text(declarator, "name")
                        {
                            exports.push(name);
                        }
                    }
                }
                continue;
            }
            if self.has_token(statement, "default") {
                exports.push("default".to_string());
                continue;
            }
            let mut statement_cursor = statement.walk();
            for child in statement.named_children(&mut statement_cursor) {
                if child.kind() == "export_clause" {
                    let mut clause_cursor = child.walk();
                    for spec in child.named_children(&mut clause_cursor) {
                        if spec.kind() == "export_specifier"
                            && let Some(name) = self.field_text(spec, "name")
                        {
                            exports.push(name);
                        }
                    }
                }
            }
        }
        exports
    }

    /// Component/hook detection is heuristic, not semantic: a capitalized
    /// name plus JSX markers in the body, or a `useX` name plus state/effect
    /// keyword occurrences. False positives and negatives are expected.
    fn classify_function(&self, name: &str, body_text: &str) -> EntityType {
        let is_hook_name = name.starts_with("use")
            && name.chars().nth(3).is_some_and(|c| c.is_ascii_uppercase());
        if is_hook_name
            || (name.starts_with("use")
                && (body_text.contains("useState") || body_text.contains("useEffect")))
        {
            return EntityType::Hook;
        }

        let capitalized = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        let jsx_marker = body_text.contains("return <")
            || body_text.contains("=> <")
            || body_text.contains("</")
            || body_text.contains("React.createElement");
        if capitalized && jsx_marker {
            return EntityType::Component;
        }
        EntityType::Function
    }

    /// A `/** … */` comment whose last line immediately precedes the
    /// declaration, with markers stripped.
    fn doc_comment(&self, node: Node) -> Option<String> {
        let target = if node
            .parent()
            .is_some_and(|p| p.kind() == "export_statement")
        {
            node.parent()?
        } else {
            node
        };
        let previous = target.prev_sibling()?;
        if previous.kind() != "comment" {
            return None;
        }
        let text = self.node_text(previous);
        if !text.starts_with("/**") {
            return None;
        }
        if previous.end_position().row + 1 != target.start_position().row {
            return None;
        }
        let cleaned: Vec<&str> = text
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .lines()
            .map(|line| line.trim().trim_start_matches('*').trim())
            .filter(|line| !line.is_empty())
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.join(" "))
        }
    }

    fn is_top_level(&self, node: Node) -> bool {
        match node.parent() {
            Some(parent) if parent.kind() == "program" => true,
            Some(parent) if parent.kind() == "export_statement" => self.is_top_level(parent),
            _ => false,
        }
    }

    fn is_exported(&self, node: Node) -> bool {
        node.parent()
            .is_some_and(|p| p.kind() == "export_statement")
    }

    fn has_token(&self, node: Node, token: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|c| c.kind() == token)
    }

    fn string_literal(&self, node: Node) -> String {
        self.node_text(node)
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .to_string()
    }

    fn annotation_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|t| self.node_text(t).trim_start_matches(':').trim().to_string())
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| self.node_text(n).to_string())
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}
