use super::ecma;
use crate::SyntaxAnalyzer;
use crate::error::AnalyzerError;
use database::graph::{CodeEntity, Language};

pub struct TypeScriptAnalyzer;

impl TypeScriptAnalyzer {
    fn grammar(file_path: &str) -> tree_sitter::Language {
        if file_path.ends_with(".tsx") {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
    }
}

impl SyntaxAnalyzer for TypeScriptAnalyzer {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn analyze_source(
        &self,
        file_path: &str,
        source: &str,
    ) -> Result<Vec<CodeEntity>, AnalyzerError> {
        ecma::analyze_source(
            &Self::grammar(file_path),
            Language::TypeScript,
            file_path,
            source,
        )
    }

    fn validate_syntax(&self, source: &str) -> bool {
        ecma::validate(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::graph::{EntityProperties, EntityType};

    fn analyze(source: &str) -> Vec<CodeEntity> {
        TypeScriptAnalyzer
            .analyze_source("src/sample.ts", source)
            .unwrap()
    }

    fn find<'a>(entities: &'a [CodeEntity], name: &str) -> &'a CodeEntity {
        entities
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("missing entity {name}"))
    }

    #[test]
    fn file_entity_comes_first_with_line_count_and_imports() {
        let entities = analyze(
            "import { readFile } from 'fs';\n\
             import * as path from 'path';\n\
             export function run(): void {}\n",
        );
        let file = &entities[0];
        assert_eq!(file.entity_type, EntityType::File);
        assert_eq!(file.name, "sample.ts");
        let EntityProperties::File {
            line_count,
            imports,
            exports,
            ..
        } = &file.properties
        else {
            panic!("expected file properties");
        };
        assert_eq!(*line_count, 3);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].source, "fs");
        assert_eq!(imports[0].imported_names, vec!["readFile"]);
        assert_eq!(imports[1].imported_names, vec!["path"]);
        assert_eq!(exports, &vec!["run".to_string()]);
    }

    #[test]
    fn function_parameters_capture_types_optionality_and_defaults() {
        let entities = analyze(
            "export async function fetchUser(id: string, verbose?: boolean, retries = 3) {\n\
                 return id;\n\
             }\n",
        );
        let func = find(&entities, "fetchUser");
        let EntityProperties::Function {
            parameters,
            is_async,
            is_exported,
            ..
        } = &func.properties
        else {
            panic!("expected function properties");
        };
        assert!(is_async);
        assert!(is_exported);
        assert_eq!(parameters.len(), 3);
        assert_eq!(parameters[0].declared_type, "string");
        assert!(parameters[1].optional);
        assert!(parameters[2].has_default);
        assert_eq!(parameters[2].declared_type, "any");
    }

    #[test]
    fn class_heritage_splits_extends_from_implements() {
        let entities = analyze(
            "interface Runnable { run(): void; }\n\
             export abstract class Task extends Base implements Runnable {\n\
                 name: string;\n\
                 run(): void {}\n\
             }\n",
        );
        let class = find(&entities, "Task");
        let EntityProperties::Class {
            extends,
            implements,
            members,
            is_abstract,
            ..
        } = &class.properties
        else {
            panic!("expected class properties");
        };
        assert_eq!(extends.as_deref(), Some("Base"));
        assert_eq!(implements, &vec!["Runnable".to_string()]);
        assert!(is_abstract);
        assert!(members.contains(&"name".to_string()));
        assert!(members.contains(&"run".to_string()));

        let interface = find(&entities, "Runnable");
        let EntityProperties::Interface { members, .. } = &interface.properties else {
            panic!("expected interface properties");
        };
        assert_eq!(members, &vec!["run".to_string()]);
    }

    #[test]
    fn doc_comment_is_attached_when_immediately_preceding() {
        let entities = analyze(
            "/** Formats a user-visible label. */\n\
             export function label(n: number): string { return `${n}`; }\n",
        );
        let func = find(&entities, "label");
        let EntityProperties::Function { doc_comment, .. } = &func.properties else {
            panic!("expected function properties");
        };
        assert_eq!(doc_comment.as_deref(), Some("Formats a user-visible label."));
    }

    #[test]
    fn tsx_component_and_hook_are_classified() {
        let entities = TypeScriptAnalyzer
            .analyze_source(
                "src/widget.tsx",
                "export function Widget(props: { label: string }) {\n\
                     return <span>{props.label}</span>;\n\
                 }\n\
                 export function useCounter() {\n\
                     const [n, setN] = useState(0);\n\
                     return n;\n\
                 }\n",
            )
            .unwrap();
        assert_eq!(find(&entities, "Widget").entity_type, EntityType::Component);
        assert_eq!(find(&entities, "useCounter").entity_type, EntityType::Hook);
    }

    #[test]
    fn top_level_variables_are_extracted_with_kind() {
        let entities = analyze(
            "export const LIMIT: number = 10;\n\
             let cache = null;\n\
             function f() { const local = 1; return local; }\n",
        );
        let limit = find(&entities, "LIMIT");
        let EntityProperties::Variable {
            declared_type,
            variable_kind,
            is_exported,
        } = &limit.properties
        else {
            panic!("expected variable properties");
        };
        assert_eq!(declared_type.as_deref(), Some("number"));
        assert_eq!(variable_kind.to_string(), "const");
        assert!(is_exported);
        // Function-local variables are not standalone entities.
        assert!(!entities.iter().any(|e| e.name == "local"));
    }

    #[test]
    fn syntax_errors_surface_as_parse_errors() {
        let err = TypeScriptAnalyzer
            .analyze_source("src/broken.ts", "function f( {")
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { .. }));
        assert!(!TypeScriptAnalyzer.validate_syntax("function f( {"));
        assert!(TypeScriptAnalyzer.validate_syntax("function f() {}"));
    }

    #[test]
    fn arrow_function_bound_to_const_is_a_function_entity() {
        let entities = analyze("export const double = (n: number): number => n * 2;\n");
        let func = find(&entities, "double");
        assert_eq!(func.entity_type, EntityType::Function);
        let EntityProperties::Function {
            parameters,
            return_type,
            ..
        } = &func.properties
        else {
            panic!("expected function properties");
        };
        assert_eq!(parameters[0].name, "n");
        assert_eq!(return_type.as_deref(), Some("number"));
    }
}
