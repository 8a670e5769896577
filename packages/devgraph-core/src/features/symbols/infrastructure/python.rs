//! Python symbol extraction via a tree-sitter AST walk.

use std::collections::HashMap;

use tree_sitter::{Node, Parser};

use crate::error::{CoreError, Result};
use crate::features::symbols::domain::{doc_preview, PyImport, SymbolKind, SymbolRecord};

use super::libraries::map_library;

/// Result of parsing one Python file.
#[derive(Debug, Default)]
pub struct PythonExtraction {
    pub symbols: Vec<SymbolRecord>,
    pub imports: Vec<PyImport>,
    /// Canonical library name → import occurrence count.
    pub libraries: HashMap<String, u32>,
}

/// Parse a Python source file and extract symbols, imports, and library
/// usage. Tree-sitter tolerates partial syntax errors; a file that cannot
/// be parsed at all is a parse error the caller records and skips.
pub fn extract_python_file(file_path: &str, source: &str) -> Result<PythonExtraction> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| CoreError::Parse(format!("tree-sitter python: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CoreError::Parse(format!("unable to parse {}", file_path)))?;

    let mut out = PythonExtraction::default();
    let root = tree.root_node();

    let mut stack: Vec<(String, SymbolKind)> = Vec::new();
    visit(
        &root,
        source,
        file_path,
        &mut stack,
        &[],
        &mut out.symbols,
    );

    collect_imports(&root, source, &mut out.imports);
    for import in &out.imports {
        if import.level > 0 {
            continue;
        }
        if let Some(module) = &import.module {
            if let Some(library) = map_library(module) {
                *out.libraries.entry(library.to_string()).or_insert(0) += 1;
            }
        }
    }

    Ok(out)
}

fn visit(
    node: &Node,
    source: &str,
    file_path: &str,
    stack: &mut Vec<(String, SymbolKind)>,
    decorators: &[String],
    symbols: &mut Vec<SymbolRecord>,
) {
    match node.kind() {
        "decorated_definition" => {
            let decs = collect_decorators(node, source);
            if let Some(definition) = node.child_by_field_name("definition") {
                visit(&definition, source, file_path, stack, &decs, symbols);
            }
        }
        "class_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            stack.push((name.clone(), SymbolKind::Class));
            let qualified = qualified_name(stack);
            let docstring = node
                .child_by_field_name("body")
                .and_then(|body| extract_docstring(&body, source));

            let mut record = SymbolRecord::new(
                file_path,
                SymbolKind::Class,
                name,
                qualified,
                "python",
                node.start_position().row as u32 + 1,
            );
            record.parent = enclosing_class(&stack[..stack.len() - 1]);
            record.doc_preview = docstring.as_deref().and_then(doc_preview);
            record.docstring = docstring;
            record.decorators = decorators.to_vec();
            record.bases = collect_superclasses(node, source);
            symbols.push(record);

            if let Some(body) = node.child_by_field_name("body") {
                visit_children(&body, source, file_path, stack, symbols);
            }
            stack.pop();
        }
        "function_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let kind = match stack.last() {
                Some((_, SymbolKind::Class)) => SymbolKind::Method,
                _ => SymbolKind::Function,
            };
            stack.push((name.clone(), kind));
            let qualified = qualified_name(stack);
            let docstring = node
                .child_by_field_name("body")
                .and_then(|body| extract_docstring(&body, source));

            let mut record = SymbolRecord::new(
                file_path,
                kind,
                name,
                qualified,
                "python",
                node.start_position().row as u32 + 1,
            );
            record.parent = enclosing_class(&stack[..stack.len() - 1]);
            record.signature = node
                .child_by_field_name("parameters")
                .map(|p| format_parameters(&p, source))
                .unwrap_or_else(|| "()".to_string());
            record.return_type = field_text(node, "return_type", source);
            record.is_async = has_async_keyword(node);
            record.doc_preview = docstring.as_deref().and_then(doc_preview);
            record.docstring = docstring;
            record.decorators = decorators.to_vec();
            symbols.push(record);

            if let Some(body) = node.child_by_field_name("body") {
                visit_children(&body, source, file_path, stack, symbols);
            }
            stack.pop();
        }
        _ => visit_children(node, source, file_path, stack, symbols),
    }
}

fn visit_children(
    node: &Node,
    source: &str,
    file_path: &str,
    stack: &mut Vec<(String, SymbolKind)>,
    symbols: &mut Vec<SymbolRecord>,
) {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            visit(&child, source, file_path, stack, &[], symbols);
        }
    }
}

fn qualified_name(stack: &[(String, SymbolKind)]) -> String {
    stack
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn enclosing_class(stack: &[(String, SymbolKind)]) -> Option<String> {
    match stack.last() {
        Some((name, SymbolKind::Class)) => Some(name.clone()),
        _ => None,
    }
}

fn node_text(node: &Node, source: &str) -> String {
    source[node.start_byte()..node.end_byte()].to_string()
}

fn field_text(node: &Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field).map(|n| node_text(&n, source))
}

fn has_async_keyword(node: &Node) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "async" {
                return true;
            }
            if child.kind() == "def" {
                break;
            }
        }
    }
    false
}

fn collect_decorators(decorated: &Node, source: &str) -> Vec<String> {
    let mut decorators = Vec::new();
    for i in 0..decorated.child_count() {
        if let Some(child) = decorated.child(i) {
            if child.kind() == "decorator" {
                decorators.push(node_text(&child, source).trim_start_matches('@').to_string());
            }
        }
    }
    decorators
}

fn collect_superclasses(class_node: &Node, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    if let Some(args) = class_node.child_by_field_name("superclasses") {
        for i in 0..args.child_count() {
            if let Some(arg) = args.child(i) {
                if matches!(arg.kind(), "identifier" | "attribute") {
                    bases.push(node_text(&arg, source));
                }
            }
        }
    }
    bases
}

/// First string expression in a block, quotes stripped.
fn extract_docstring(block: &Node, source: &str) -> Option<String> {
    for i in 0..block.child_count() {
        let stmt = block.child(i)?;
        if stmt.kind() != "expression_statement" {
            return None;
        }
        let string_node = stmt.child(0)?;
        if string_node.kind() != "string" {
            return None;
        }
        let raw = node_text(&string_node, source);
        let trimmed = raw
            .trim_start_matches("\"\"\"")
            .trim_end_matches("\"\"\"")
            .trim_start_matches("'''")
            .trim_end_matches("'''")
            .trim_matches('"')
            .trim_matches('\'')
            .trim();
        return Some(trimmed.to_string());
    }
    None
}

/// Render `(a, b, *args, kw, **kwargs)` from a parameters node, keeping
/// splat markers and the keyword-only separator, dropping annotations and
/// defaults.
fn format_parameters(params: &Node, source: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for i in 0..params.child_count() {
        let Some(param) = params.child(i) else {
            continue;
        };
        match param.kind() {
            "identifier" => parts.push(node_text(&param, source)),
            "typed_parameter" | "default_parameter" | "typed_default_parameter" => {
                let raw = node_text(&param, source);
                let bare = raw
                    .split(':')
                    .next()
                    .unwrap_or("")
                    .split('=')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if !bare.is_empty() {
                    parts.push(bare);
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                parts.push(node_text(&param, source));
            }
            "keyword_separator" => parts.push("*".to_string()),
            "positional_separator" => parts.push("/".to_string()),
            _ => {}
        }
    }
    format!("({})", parts.join(", "))
}

fn collect_imports(root: &Node, source: &str, imports: &mut Vec<PyImport>) {
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                let line = node.start_position().row as u32 + 1;
                let mut cursor = node.walk();
                for name_node in node.children_by_field_name("name", &mut cursor) {
                    let module = import_target_text(&name_node, source);
                    if let Some(module) = module {
                        imports.push(PyImport {
                            module: Some(module),
                            names: Vec::new(),
                            level: 0,
                            line,
                        });
                    }
                }
            }
            "import_from_statement" => {
                let line = node.start_position().row as u32 + 1;
                let (module, level) = match node.child_by_field_name("module_name") {
                    Some(module_node) if module_node.kind() == "relative_import" => {
                        parse_relative_import(&module_node, source)
                    }
                    Some(module_node) => (Some(node_text(&module_node, source)), 0),
                    None => (None, 0),
                };

                let mut names = Vec::new();
                let mut cursor = node.walk();
                for name_node in node.children_by_field_name("name", &mut cursor) {
                    if let Some(name) = import_target_text(&name_node, source) {
                        names.push(name);
                    }
                }
                // `from x import *`
                if names.is_empty() && has_child_of_kind(&node, "wildcard_import") {
                    names.push("*".to_string());
                }

                imports.push(PyImport {
                    module,
                    names,
                    level,
                    line,
                });
            }
            _ => {
                for i in (0..node.child_count()).rev() {
                    if let Some(child) = node.child(i) {
                        stack.push(child);
                    }
                }
            }
        }
    }
}

fn import_target_text(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "dotted_name" | "identifier" => Some(node_text(node, source)),
        "aliased_import" => node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source)),
        _ => None,
    }
}

fn parse_relative_import(node: &Node, source: &str) -> (Option<String>, usize) {
    let text = node_text(node, source);
    let level = text.chars().take_while(|c| *c == '.').count();
    let module = text.trim_start_matches('.');
    let module = if module.is_empty() {
        None
    } else {
        Some(module.to_string())
    };
    (module, level)
}

fn has_child_of_kind(node: &Node, kind: &str) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(source: &str) -> PythonExtraction {
        extract_python_file("src/app.py", source).unwrap()
    }

    #[test]
    fn test_class_with_methods() {
        let source = r#"
class Service(Base, mixins.Logged):
    """Runs the thing."""

    def handle(self, request, *args, **kwargs):
        return request

    async def poll(self):
        pass
"#;
        let out = extract(source);
        let names: Vec<_> = out.symbols.iter().map(|s| s.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["Service", "Service.handle", "Service.poll"]);

        let class = &out.symbols[0];
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.bases, vec!["Base", "mixins.Logged"]);
        assert_eq!(class.doc_preview.as_deref(), Some("Runs the thing."));

        let handle = &out.symbols[1];
        assert_eq!(handle.kind, SymbolKind::Method);
        assert_eq!(handle.parent.as_deref(), Some("Service"));
        assert_eq!(handle.signature, "(self, request, *args, **kwargs)");
        assert_eq!(
            handle.symbol_id,
            "src/app.py::method::Service.handle"
        );

        let poll = &out.symbols[2];
        assert!(poll.is_async);
    }

    #[test]
    fn test_module_function_with_return_type() {
        let source = "def load(path: str, limit: int = 10) -> dict:\n    return {}\n";
        let out = extract(source);
        assert_eq!(out.symbols.len(), 1);
        let f = &out.symbols[0];
        assert_eq!(f.kind, SymbolKind::Function);
        assert_eq!(f.signature, "(path, limit)");
        assert_eq!(f.return_type.as_deref(), Some("dict"));
        assert_eq!(f.line_number, 1);
        assert!(!f.is_async);
    }

    #[test]
    fn test_decorators() {
        let source = "\
@router.get('/x')
@cached
def endpoint():
    pass
";
        let out = extract(source);
        assert_eq!(out.symbols.len(), 1);
        assert_eq!(
            out.symbols[0].decorators,
            vec!["router.get('/x')", "cached"]
        );
    }

    #[test]
    fn test_imports_plain_and_from() {
        let source = "\
import os
import fastapi
from neo4j import Driver, Session
from .relative import helper
from ..pkg import thing
";
        let out = extract(source);
        assert_eq!(out.imports.len(), 5);
        assert_eq!(out.imports[0].module.as_deref(), Some("os"));
        assert_eq!(out.imports[2].module.as_deref(), Some("neo4j"));
        assert_eq!(out.imports[2].names, vec!["Driver", "Session"]);
        assert_eq!(out.imports[3].level, 1);
        assert_eq!(out.imports[3].module.as_deref(), Some("relative"));
        assert_eq!(out.imports[4].level, 2);
        assert_eq!(out.imports[4].module.as_deref(), Some("pkg"));

        assert_eq!(out.libraries.get("FastAPI"), Some(&1));
        assert_eq!(out.libraries.get("Neo4j"), Some(&1));
    }

    #[test]
    fn test_wildcard_import() {
        let out = extract("from pkg.mod import *\n");
        assert_eq!(out.imports.len(), 1);
        assert_eq!(out.imports[0].names, vec!["*"]);
        assert_eq!(out.imports[0].module.as_deref(), Some("pkg.mod"));
    }

    #[test]
    fn test_nested_function_qualified_name() {
        let source = "\
def outer():
    def inner():
        pass
";
        let out = extract(source);
        let names: Vec<_> = out.symbols.iter().map(|s| s.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["outer", "outer.inner"]);
        // inner is not a method; its enclosing scope is a function.
        assert_eq!(out.symbols[1].kind, SymbolKind::Function);
    }

    #[test]
    fn test_keyword_only_parameters() {
        let out = extract("def f(a, *, b, c=1):\n    pass\n");
        assert_eq!(out.symbols[0].signature, "(a, *, b, c)");
    }
}
