//! TS/JS symbol extraction via a regex grammar subset.
//!
//! A full TypeScript parse is out of scope; the anchored patterns below
//! cover the declaration forms the graph cares about (classes, interfaces,
//! functions, arrow consts, default exports).

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::features::symbols::domain::{SymbolKind, SymbolRecord};
use crate::shared::utils::line_number;

use super::libraries::map_library;

static TS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)import\s+(?:[^'"`]+?\s+from\s+)?["'`](?P<module>[^'"`]+)["'`]|require\(\s*["'`](?P<require>[^'"`]+)["'`]\s*\)|import\(\s*["'`](?P<dynamic>[^'"`]+)["'`]\s*\)"#,
    )
    .unwrap()
});

static TS_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?P<export>export\s+)?class\s+(?P<name>[A-Za-z_]\w*)\s*(?:extends\s+(?P<extends>[^\{\s]+))?\s*(?:implements\s+(?P<implements>[^\{]+))?\s*\{",
    )
    .unwrap()
});

static TS_INTERFACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?P<export>export\s+)?interface\s+(?P<name>[A-Za-z_]\w*)\s*(?:extends\s+(?P<extends>[^\{]+))?\s*\{",
    )
    .unwrap()
});

static TS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?P<export>export\s+)?function\s+(?P<name>[A-Za-z_]\w*)\s*(?P<signature>\([^\)]*\))")
        .unwrap()
});

static TS_ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?P<export>export\s+)?const\s+(?P<name>[A-Za-z_]\w*)\s*=\s*(?:async\s+)?(?P<signature>\([^\)]*\)|[A-Za-z_]\w*)\s*=>",
    )
    .unwrap()
});

static TS_DEFAULT_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+default\s+function\s+(?P<name>[A-Za-z_]\w*)?\s*(?P<signature>\([^\)]*\))")
        .unwrap()
});

/// Import specifiers (static, require, dynamic) with 1-indexed lines.
pub fn extract_ts_imports(source: &str) -> Vec<(String, u32)> {
    let mut imports = Vec::new();
    for caps in TS_IMPORT.captures_iter(source) {
        let module = caps
            .name("module")
            .or_else(|| caps.name("require"))
            .or_else(|| caps.name("dynamic"));
        if let Some(module) = module {
            let line = line_number(source, module.start());
            imports.push((module.as_str().to_string(), line));
        }
    }
    imports
}

/// Extract TS/JS symbols and library usage from one source file.
pub fn extract_typescript_symbols(
    file_path: &str,
    source: &str,
    language: &str,
) -> (Vec<SymbolRecord>, HashMap<String, u32>) {
    let mut symbols = Vec::new();
    let mut libraries: HashMap<String, u32> = HashMap::new();
    let mut seen: HashSet<(SymbolKind, String)> = HashSet::new();

    for (module, _) in extract_ts_imports(source) {
        if let Some(library) = map_library(&module) {
            *libraries.entry(library.to_string()).or_insert(0) += 1;
        }
    }

    for (pattern, kind) in [(&TS_CLASS, SymbolKind::Class), (&TS_INTERFACE, SymbolKind::Interface)]
    {
        for caps in pattern.captures_iter(source) {
            let Some(name) = caps.name("name") else {
                continue;
            };
            if !seen.insert((kind, name.as_str().to_string())) {
                continue;
            }
            let mut record = SymbolRecord::new(
                file_path,
                kind,
                name.as_str(),
                name.as_str(),
                language,
                line_number(source, name.start()),
            );
            record.bases = caps
                .name("extends")
                .map(|m| vec![m.as_str().trim().to_string()])
                .unwrap_or_default();
            record.interfaces = caps
                .name("implements")
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|item| item.trim().to_string())
                        .filter(|item| !item.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            record.exported = Some(caps.name("export").is_some());
            symbols.push(record);
        }
    }

    for caps in TS_FUNCTION.captures_iter(source) {
        let Some(name) = caps.name("name") else {
            continue;
        };
        if !seen.insert((SymbolKind::Function, name.as_str().to_string())) {
            continue;
        }
        let mut record = SymbolRecord::new(
            file_path,
            SymbolKind::Function,
            name.as_str(),
            name.as_str(),
            language,
            line_number(source, name.start()),
        );
        record.signature = caps
            .name("signature")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "()".to_string());
        record.exported = Some(caps.name("export").is_some());
        symbols.push(record);
    }

    for caps in TS_ARROW.captures_iter(source) {
        let Some(name) = caps.name("name") else {
            continue;
        };
        if !seen.insert((SymbolKind::Function, name.as_str().to_string())) {
            continue;
        }
        let mut signature = caps
            .name("signature")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "()".to_string());
        if !signature.starts_with('(') {
            signature = format!("({})", signature);
        }
        let mut record = SymbolRecord::new(
            file_path,
            SymbolKind::Function,
            name.as_str(),
            name.as_str(),
            language,
            line_number(source, name.start()),
        );
        record.signature = signature;
        record.exported = Some(caps.name("export").is_some());
        symbols.push(record);
    }

    for caps in TS_DEFAULT_FUNCTION.captures_iter(source) {
        let name = caps
            .name("name")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "default".to_string());
        if !seen.insert((SymbolKind::Function, name.clone())) {
            continue;
        }
        let line = caps
            .name("name")
            .map(|m| line_number(source, m.start()))
            .unwrap_or_else(|| line_number(source, caps.get(0).map(|m| m.start()).unwrap_or(0)));
        let mut record =
            SymbolRecord::new(file_path, SymbolKind::Function, &name, &name, language, line);
        record.signature = caps
            .name("signature")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "()".to_string());
        record.exported = Some(true);
        symbols.push(record);
    }

    (symbols, libraries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_class_with_extends_and_implements() {
        let source = "export class GraphView extends BaseView implements Renderable, Sized {\n}\n";
        let (symbols, _) = extract_typescript_symbols("ui/view.ts", source, "typescript");
        assert_eq!(symbols.len(), 1);
        let class = &symbols[0];
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.bases, vec!["BaseView"]);
        assert_eq!(class.interfaces, vec!["Renderable", "Sized"]);
        assert_eq!(class.exported, Some(true));
        assert_eq!(class.symbol_id, "ui/view.ts::class::GraphView");
    }

    #[test]
    fn test_interface() {
        let source = "interface Props {\n  value: string;\n}\n";
        let (symbols, _) = extract_typescript_symbols("ui/props.ts", source, "typescript");
        assert_eq!(symbols[0].kind, SymbolKind::Interface);
        assert_eq!(symbols[0].exported, Some(false));
    }

    #[test]
    fn test_functions_and_arrows() {
        let source = "\
export function render(props) {\n  return props;\n}\n
const format = async (value) => value.trim();\n
export default function Page() {\n  return null;\n}\n";
        let (symbols, _) = extract_typescript_symbols("ui/page.tsx", source, "typescript");
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"render"));
        assert!(names.contains(&"format"));
        assert!(names.contains(&"Page"));

        let render = symbols.iter().find(|s| s.name == "render").unwrap();
        assert_eq!(render.signature, "(props)");
        assert_eq!(render.exported, Some(true));

        let format = symbols.iter().find(|s| s.name == "format").unwrap();
        assert_eq!(format.signature, "(value)");
        assert_eq!(format.exported, Some(false));
    }

    #[test]
    fn test_single_arg_arrow_gets_parenthesized() {
        let source = "const double = x => x * 2;\n";
        let (symbols, _) = extract_typescript_symbols("m.js", source, "javascript");
        // `x => ...` without parens: the arrow pattern requires `= x =>`.
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].signature, "(x)");
    }

    #[test]
    fn test_imports_and_library_usage() {
        let source = "\
import React from 'react';\n\
import { scaleLinear } from 'd3-scale';\n\
const lodash = require('lodash');\n\
const mod = import('./local');\n";
        let imports = extract_ts_imports(source);
        let modules: Vec<_> = imports.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(modules, vec!["react", "d3-scale", "lodash", "./local"]);
        assert_eq!(imports[0].1, 1);
        assert_eq!(imports[2].1, 3);

        let (_, libraries) = extract_typescript_symbols("m.ts", source, "typescript");
        assert_eq!(libraries.get("React"), Some(&1));
        assert_eq!(libraries.get("D3.js"), Some(&1));
        assert_eq!(libraries.get("Lodash"), Some(&1));
    }

    #[test]
    fn test_duplicate_names_deduped() {
        let source = "function go() {}\nfunction go() {}\n";
        let (symbols, _) = extract_typescript_symbols("m.js", source, "javascript");
        assert_eq!(symbols.len(), 1);
    }
}
