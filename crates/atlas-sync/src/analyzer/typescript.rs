//! TypeScript/JavaScript structural analyzer (tree-sitter).

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Node, Parser};

use atlas_core::model::{CallEdge, CodeEntity, EntityKind};

use super::{Analysis, SourceAnalyzer};

const TS_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "js", "mjs", "cjs"];
const TSX_EXTENSIONS: &[&str] = &["tsx", "jsx"];

/// Extracts functions, classes, variables, imports, exports and call edges
/// from TypeScript and JavaScript sources.
pub struct TypeScriptAnalyzer;

impl TypeScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn is_tsx(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| TSX_EXTENSIONS.contains(&e))
            .unwrap_or(false)
    }
}

impl Default for TypeScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAnalyzer for TypeScriptAnalyzer {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn can_process(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| TS_EXTENSIONS.contains(&e) || TSX_EXTENSIONS.contains(&e))
            .unwrap_or(false)
    }

    fn analyze(&self, file_path: &str, source: &str) -> Result<Analysis> {
        let language = if Self::is_tsx(Path::new(file_path)) {
            tree_sitter_typescript::language_tsx()
        } else {
            tree_sitter_typescript::language_typescript()
        };

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .context("Failed to load TypeScript grammar")?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("Parser produced no tree for {}", file_path))?;

        let mut analysis = Analysis::default();
        collect(tree.root_node(), source, file_path, None, &mut analysis);
        Ok(analysis)
    }
}

fn make_entity(name: &str, kind: EntityKind, node: Node, file_path: &str, parameters: Vec<String>) -> CodeEntity {
    CodeEntity {
        name: name.to_string(),
        file_path: file_path.to_string(),
        line_start: node.start_position().row as u32 + 1,
        line_end: node.end_position().row as u32 + 1,
        kind,
        parameters,
    }
}

fn field_text<'s>(node: Node, field: &str, src: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(src.as_bytes()).ok())
}

/// Parameter names of a function-like node, in declaration order.
fn parameter_names(node: Node, src: &str) -> Vec<String> {
    // Arrow functions with a single bare identifier use the `parameter` field.
    if let Some(text) = field_text(node, "parameter", src) {
        return vec![text.to_string()];
    }

    let mut names = Vec::new();
    let Some(params) = node.child_by_field_name("parameters") else {
        return names;
    };
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        let pattern = match child.kind() {
            "required_parameter" | "optional_parameter" | "rest_parameter" => {
                child.child_by_field_name("pattern")
            }
            "identifier" => Some(child),
            _ => None,
        };
        if let Some(text) = pattern.and_then(|p| p.utf8_text(src.as_bytes()).ok()) {
            names.push(text.to_string());
        }
    }
    names
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn collect<'s>(
    node: Node,
    src: &'s str,
    file_path: &str,
    enclosing: Option<&'s str>,
    out: &mut Analysis,
) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = field_text(node, "name", src) {
                out.entities.push(make_entity(
                    name,
                    EntityKind::Function,
                    node,
                    file_path,
                    parameter_names(node, src),
                ));
                recurse(node, src, file_path, Some(name), out);
                return;
            }
        }
        "method_definition" => {
            if let Some(name) = field_text(node, "name", src) {
                out.entities.push(make_entity(
                    name,
                    EntityKind::Function,
                    node,
                    file_path,
                    parameter_names(node, src),
                ));
                recurse(node, src, file_path, Some(name), out);
                return;
            }
        }
        "class_declaration" => {
            if let Some(name) = field_text(node, "name", src) {
                out.entities
                    .push(make_entity(name, EntityKind::Class, node, file_path, vec![]));
            }
        }
        "variable_declarator" => {
            if let Some(name) = field_text(node, "name", src) {
                match node.child_by_field_name("value") {
                    Some(value) if is_function_value(value.kind()) => {
                        // `const foo = (a, b) => ...` counts as a function.
                        out.entities.push(make_entity(
                            name,
                            EntityKind::Function,
                            node,
                            file_path,
                            parameter_names(value, src),
                        ));
                        recurse(value, src, file_path, Some(name), out);
                        return;
                    }
                    _ => {
                        out.entities.push(make_entity(
                            name,
                            EntityKind::Variable,
                            node,
                            file_path,
                            vec![],
                        ));
                    }
                }
            }
        }
        "import_statement" => {
            if let Some(source_node) = node.child_by_field_name("source") {
                if let Ok(text) = source_node.utf8_text(src.as_bytes()) {
                    let module = text.trim_matches(|c| c == '"' || c == '\'');
                    out.entities.push(make_entity(
                        module,
                        EntityKind::Import,
                        node,
                        file_path,
                        vec![],
                    ));
                }
            }
            return;
        }
        "export_statement" => {
            if let Some(name) = node
                .child_by_field_name("declaration")
                .and_then(|d| field_text(d, "name", src))
            {
                out.entities
                    .push(make_entity(name, EntityKind::Export, node, file_path, vec![]));
            } else {
                // `export { a, b }`: one Export per specifier.
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "export_clause" {
                        let mut inner = child.walk();
                        for spec in child.named_children(&mut inner) {
                            if spec.kind() == "export_specifier" {
                                if let Some(name) = field_text(spec, "name", src) {
                                    out.entities.push(make_entity(
                                        name,
                                        EntityKind::Export,
                                        spec,
                                        file_path,
                                        vec![],
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        "call_expression" => {
            if let Some(caller) = enclosing {
                if let Some(function) = node.child_by_field_name("function") {
                    let callee = match function.kind() {
                        "identifier" => function.utf8_text(src.as_bytes()).ok(),
                        "member_expression" => field_text(function, "property", src),
                        _ => None,
                    };
                    if let Some(callee) = callee {
                        out.call_edges.push(CallEdge {
                            caller: caller.to_string(),
                            callee: callee.to_string(),
                            file_path: file_path.to_string(),
                        });
                    }
                }
            }
        }
        _ => {}
    }

    recurse(node, src, file_path, enclosing, out);
}

fn recurse<'s>(
    node: Node,
    src: &'s str,
    file_path: &str,
    enclosing: Option<&'s str>,
    out: &mut Analysis,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect(child, src, file_path, enclosing, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> Analysis {
        TypeScriptAnalyzer::new().analyze("src/sample.ts", source).unwrap()
    }

    fn names_of(analysis: &Analysis, kind: EntityKind) -> Vec<&str> {
        analysis
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.name.as_str())
            .collect()
    }

    #[test]
    fn test_extracts_function_with_parameters() {
        let analysis = analyze("function add(a: number, b: number) { return a + b; }");
        let entity = &analysis.entities[0];
        assert_eq!(entity.name, "add");
        assert_eq!(entity.kind, EntityKind::Function);
        assert_eq!(entity.parameters, vec!["a", "b"]);
        assert_eq!(entity.line_start, 1);
    }

    #[test]
    fn test_arrow_const_counts_as_function() {
        let analysis = analyze("const greet = (who: string) => `hi ${who}`;");
        assert_eq!(names_of(&analysis, EntityKind::Function), vec!["greet"]);
        assert!(names_of(&analysis, EntityKind::Variable).is_empty());
    }

    #[test]
    fn test_extracts_class_and_methods() {
        let analysis = analyze(
            "class Repo {\n  save(item: Item) { this.validate(item); }\n  validate(item: Item) {}\n}",
        );
        assert_eq!(names_of(&analysis, EntityKind::Class), vec!["Repo"]);
        let functions = names_of(&analysis, EntityKind::Function);
        assert!(functions.contains(&"save"));
        assert!(functions.contains(&"validate"));
    }

    #[test]
    fn test_extracts_variables_imports_exports() {
        let analysis = analyze(
            "import { join } from 'path';\nconst LIMIT = 10;\nexport function run() {}\n",
        );
        assert_eq!(names_of(&analysis, EntityKind::Import), vec!["path"]);
        assert_eq!(names_of(&analysis, EntityKind::Variable), vec!["LIMIT"]);
        assert_eq!(names_of(&analysis, EntityKind::Export), vec!["run"]);
        // The exported declaration is also recorded as a function.
        assert_eq!(names_of(&analysis, EntityKind::Function), vec!["run"]);
    }

    #[test]
    fn test_call_edges_carry_the_enclosing_function() {
        let analysis = analyze(
            "function parse(input: string) { return tokenize(input); }\nfunction tokenize(s: string) { return s.split(' '); }",
        );
        assert!(
            analysis
                .call_edges
                .iter()
                .any(|e| e.caller == "parse" && e.callee == "tokenize")
        );
        // Member calls resolve to the property name.
        assert!(
            analysis
                .call_edges
                .iter()
                .any(|e| e.caller == "tokenize" && e.callee == "split")
        );
    }

    #[test]
    fn test_top_level_calls_have_no_caller() {
        let analysis = analyze("setup();");
        assert!(analysis.call_edges.is_empty());
    }

    #[test]
    fn test_export_clause_specifiers() {
        let analysis = analyze("const a = 1;\nconst b = 2;\nexport { a, b };");
        let exports = names_of(&analysis, EntityKind::Export);
        assert_eq!(exports, vec!["a", "b"]);
    }
}
