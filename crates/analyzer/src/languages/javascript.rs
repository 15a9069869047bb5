use super::ecma;
use crate::SyntaxAnalyzer;
use crate::error::AnalyzerError;
use database::graph::{CodeEntity, Language};

pub struct JavaScriptAnalyzer;

impl SyntaxAnalyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn analyze_source(
        &self,
        file_path: &str,
        source: &str,
    ) -> Result<Vec<CodeEntity>, AnalyzerError> {
        ecma::analyze_source(
            &tree_sitter_javascript::LANGUAGE.into(),
            Language::JavaScript,
            file_path,
            source,
        )
    }

    fn validate_syntax(&self, source: &str) -> bool {
        ecma::validate(&tree_sitter_javascript::LANGUAGE.into(), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::graph::{EntityProperties, EntityType};

    #[test]
    fn untyped_parameters_default_to_any() {
        let entities = JavaScriptAnalyzer
            .analyze_source("lib/math.js", "function add(a, b = 1) { return a + b; }\n")
            .unwrap();
        let func = entities.iter().find(|e| e.name == "add").unwrap();
        let EntityProperties::Function {
            parameters,
            return_type,
            ..
        } = &func.properties
        else {
            panic!("expected function properties");
        };
        assert_eq!(parameters[0].declared_type, "any");
        assert!(!parameters[0].has_default);
        assert!(parameters[1].has_default);
        assert!(return_type.is_none());
    }

    #[test]
    fn class_extends_is_captured_without_typescript_clauses() {
        let entities = JavaScriptAnalyzer
            .analyze_source(
                "lib/model.js",
                "class Model extends EventEmitter { save() {} }\n",
            )
            .unwrap();
        let class = entities.iter().find(|e| e.name == "Model").unwrap();
        let EntityProperties::Class {
            extends,
            implements,
            ..
        } = &class.properties
        else {
            panic!("expected class properties");
        };
        assert_eq!(extends.as_deref(), Some("EventEmitter"));
        assert!(implements.is_empty());
    }

    #[test]
    fn jsx_component_detection_works_for_javascript() {
        let entities = JavaScriptAnalyzer
            .analyze_source(
                "src/banner.jsx",
                "export function Banner({ text }) { return <div>{text}</div>; }\n",
            )
            .unwrap();
        let banner = entities.iter().find(|e| e.name == "Banner").unwrap();
        assert_eq!(banner.entity_type, EntityType::Component);
    }

    #[test]
    fn interfaces_never_appear_under_the_javascript_grammar() {
        // `interface` is not reserved in JS; this parses as plain code and
        // must not produce an Interface entity.
        let entities = JavaScriptAnalyzer
            .analyze_source("lib/x.js", "const interfaceLike = { run: () => 1 };\n")
            .unwrap();
        assert!(
            entities
                .iter()
                .all(|e| e.entity_type != EntityType::Interface)
        );
    }
}
