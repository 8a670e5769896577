//! Module-to-path resolution for Python and TS/JS imports.

use std::collections::{HashMap, HashSet};

use crate::features::symbols::domain::PyImport;

use super::domain::ImportHit;

/// Candidate extensions for TS/JS import targets, tried in order.
pub const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".d.ts"];

/// Dotted module name of a repo-relative Python file.
/// `pkg/__init__.py` → `pkg`; `pkg/mod.py` → `pkg.mod`.
pub fn python_module_name(path: &str) -> String {
    let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.last() == Some(&"__init__.py") {
        parts.pop();
        parts.join(".")
    } else {
        if let Some(last) = parts.last_mut() {
            *last = last.split('.').next().unwrap_or(last);
        }
        parts.join(".")
    }
}

/// Package parts of a module: the enclosing package path used to resolve
/// relative imports.
pub fn python_package_parts(path: &str, module_name: &str) -> Vec<String> {
    if module_name.is_empty() {
        return Vec::new();
    }
    let parts: Vec<String> = module_name.split('.').map(|s| s.to_string()).collect();
    if path.ends_with("__init__.py") {
        return parts;
    }
    if parts.len() <= 1 {
        return Vec::new();
    }
    parts[..parts.len() - 1].to_vec()
}

/// Build `module name → path` over the repository's Python files.
pub fn build_python_module_index(paths: &[String]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for path in paths {
        if !path.ends_with(".py") {
            continue;
        }
        let module = python_module_name(path);
        if module.is_empty() {
            continue;
        }
        index.insert(module.clone(), path.clone());
        if path.ends_with("__init__.py") {
            index.insert(format!("{}.__init__", module), path.clone());
        }
    }
    index
}

/// Resolve `import X.Y` by walking prefixes of the dotted name.
pub fn resolve_python_module<'a>(
    module_index: &'a HashMap<String, String>,
    module: &str,
) -> Option<&'a String> {
    if module.is_empty() {
        return None;
    }
    if let Some(path) = module_index.get(module) {
        return Some(path);
    }
    let mut search = module;
    while let Some(idx) = search.rfind('.') {
        search = &search[..idx];
        if let Some(path) = module_index.get(search) {
            return Some(path);
        }
    }
    None
}

/// Resolve the base module of a `from` import given the declaring module's
/// package parts and the relative `level` (number of leading dots).
pub fn resolve_python_from(
    package_parts: &[String],
    module: Option<&str>,
    level: usize,
) -> Option<String> {
    if level == 0 {
        return module.map(|m| m.to_string());
    }
    let mut base: Vec<String> = package_parts.to_vec();
    let drop = level.saturating_sub(1);
    if drop >= base.len() {
        base.clear();
    } else {
        base.truncate(base.len() - drop);
    }
    if let Some(module) = module {
        base.extend(module.split('.').filter(|p| !p.is_empty()).map(String::from));
    }
    if base.is_empty() {
        return module.map(|m| m.to_string());
    }
    Some(base.join("."))
}

/// Resolve all hits for one Python file's imports.
pub fn collect_python_hits(
    path: &str,
    imports: &[PyImport],
    module_index: &HashMap<String, String>,
) -> Vec<ImportHit> {
    let module_name = python_module_name(path);
    let package_parts = python_package_parts(path, &module_name);
    let mut hits = Vec::new();

    for import in imports {
        if import.names.is_empty() {
            // `import X.Y`
            let Some(module) = import.module.as_deref() else {
                continue;
            };
            if let Some(target) = resolve_python_module(module_index, module) {
                hits.push(ImportHit {
                    target: target.clone(),
                    module: Some(module.to_string()),
                    symbol: None,
                    line: Some(import.line),
                });
            }
            continue;
        }

        // `from <module> import <names>`
        let base_module = resolve_python_from(&package_parts, import.module.as_deref(), import.level);
        for symbol in &import.names {
            let mut candidates: Vec<Option<String>> = Vec::new();
            if symbol == "*" {
                candidates.push(base_module.clone());
            } else {
                if let Some(base) = &base_module {
                    candidates.push(Some(format!("{}.{}", base, symbol)));
                    candidates.push(Some(base.clone()));
                }
                if let (Some(module), 0) = (import.module.as_deref(), import.level) {
                    candidates.push(Some(format!("{}.{}", module, symbol)));
                }
                if import.level == 0 {
                    candidates.push(Some(symbol.clone()));
                }
            }

            let mut resolved: Option<(String, String)> = None;
            let mut seen: HashSet<String> = HashSet::new();
            for candidate in candidates.into_iter().flatten() {
                if !seen.insert(candidate.clone()) {
                    continue;
                }
                if let Some(path) = module_index.get(&candidate) {
                    resolved = Some((path.clone(), candidate));
                    break;
                }
            }
            if resolved.is_none() {
                if let Some(base) = &base_module {
                    if let Some(path) = module_index.get(base) {
                        resolved = Some((path.clone(), base.clone()));
                    }
                }
            }

            if let Some((target, chosen)) = resolved {
                hits.push(ImportHit {
                    target,
                    module: Some(chosen),
                    symbol: (symbol != "*").then(|| symbol.clone()),
                    line: Some(import.line),
                });
            }
        }
    }

    hits
}

/// Resolve a TS/JS import specifier to a repo-relative path. Only relative
/// (`./…`, `../…`) and repo-absolute (`/…`) specifiers resolve; bare module
/// names are package imports.
pub fn resolve_ts_target(
    source_path: &str,
    module_spec: &str,
    path_index: &HashSet<String>,
) -> Option<String> {
    let base = if module_spec.starts_with('.') {
        let dir = match source_path.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        };
        normalize_join(dir, module_spec)?
    } else if let Some(stripped) = module_spec.strip_prefix('/') {
        normalize_join("", stripped)?
    } else {
        return None;
    };

    let mut candidates = Vec::new();
    if base.rsplit('/').next().is_some_and(|name| name.contains('.')) {
        candidates.push(base.clone());
    }
    for ext in TS_EXTENSIONS {
        candidates.push(format!("{}{}", base, ext));
    }
    for ext in TS_EXTENSIONS {
        candidates.push(format!("{}/index{}", base, ext));
    }

    candidates.into_iter().find(|c| path_index.contains(c))
}

/// Collect resolved hits for one TS/JS file.
pub fn collect_ts_hits(
    path: &str,
    imports: &[(String, u32)],
    path_index: &HashSet<String>,
) -> Vec<ImportHit> {
    let mut hits = Vec::new();
    for (module, line) in imports {
        if let Some(target) = resolve_ts_target(path, module, path_index) {
            hits.push(ImportHit {
                target,
                module: Some(module.clone()),
                symbol: None,
                line: Some(*line),
            });
        }
    }
    hits
}

/// Join a repo-relative directory with a relative specifier, resolving
/// `.`/`..` segments; escaping the repository root fails the resolution.
fn normalize_join(base_dir: &str, spec: &str) -> Option<String> {
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in spec.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
