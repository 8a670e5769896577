//! Canonical library alias table.
//!
//! Maps import module names (and doc search terms) to canonical library
//! names. Resolution is case-insensitive and accepts module prefixes, e.g.
//! `neo4j-driver` and `neo4j.graph` both map to `Neo4j`.

use once_cell::sync::Lazy;

static LIBRARY_ALIASES: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("fastapi", "FastAPI"),
        ("starlette", "FastAPI"),
        ("neo4j", "Neo4j"),
        ("neo4j-driver", "Neo4j"),
        ("pydantic", "Pydantic"),
        ("uvicorn", "Uvicorn"),
        ("pytest", "pytest"),
        ("gitpython", "GitPython"),
        ("git", "GitPython"),
        ("tenacity", "tenacity"),
        ("python-dotenv", "python-dotenv"),
        ("dotenv", "python-dotenv"),
        ("@chakra-ui", "Chakra UI"),
        ("@chakra-ui/react", "Chakra UI"),
        ("react", "React"),
        ("next", "Next.js"),
        ("next/router", "Next.js"),
        ("next/head", "Next.js"),
        ("d3", "D3.js"),
        ("d3-scale", "D3.js"),
        ("three", "Three.js"),
        ("graphology", "Graphology"),
        ("@tanstack/react-query", "React Query"),
        ("deck.gl", "Deck.GL"),
        ("framer-motion", "Framer Motion"),
        ("axios", "Axios"),
        ("lodash", "Lodash"),
        ("webgl", "WebGL"),
    ]
});

/// Resolve a module specifier to its canonical library name, if any.
pub fn map_library(module: &str) -> Option<&'static str> {
    let module_lower = module.to_ascii_lowercase();
    for (alias, canonical) in LIBRARY_ALIASES.iter() {
        if module_lower == *alias
            || module_lower.starts_with(&format!("{}.", alias))
            || module_lower.starts_with(&format!("{}/", alias))
        {
            return Some(canonical);
        }
    }
    None
}

/// Search terms used to find library mentions in documentation chunks.
pub fn doc_library_terms() -> Vec<(&'static str, &'static str)> {
    vec![
        ("FastAPI", "FastAPI"),
        ("FastAPI", "Fast API"),
        ("Neo4j", "Neo4j"),
        ("Neo4j", "Neo4j Aura"),
        ("Pydantic", "Pydantic"),
        ("Uvicorn", "Uvicorn"),
        ("Next.js", "Next.js"),
        ("Next.js", "Nextjs"),
        ("React", "React"),
        ("Chakra UI", "Chakra UI"),
        ("Chakra UI", "chakra-ui"),
        ("D3.js", "D3.js"),
        ("D3.js", "D3"),
        ("WebGL", "WebGL"),
        ("Three.js", "Three.js"),
        ("Graphology", "Graphology"),
        ("Deck.GL", "Deck.GL"),
        ("Deck.GL", "deck.gl"),
        ("React Query", "React Query"),
        ("React Query", "@tanstack/react-query"),
        ("Framer Motion", "Framer Motion"),
        ("Framer Motion", "framer-motion"),
        ("Axios", "Axios"),
        ("Lodash", "Lodash"),
        ("pytest", "pytest"),
        ("GitPython", "GitPython"),
        ("tenacity", "tenacity"),
        ("python-dotenv", "python-dotenv"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_prefix_matches() {
        assert_eq!(map_library("fastapi"), Some("FastAPI"));
        assert_eq!(map_library("neo4j-driver"), Some("Neo4j"));
        assert_eq!(map_library("neo4j.graph"), Some("Neo4j"));
        assert_eq!(map_library("next/router"), Some("Next.js"));
        assert_eq!(map_library("@tanstack/react-query"), Some("React Query"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(map_library("FastAPI"), Some("FastAPI"));
        assert_eq!(map_library("React"), Some("React"));
    }

    #[test]
    fn test_unknown_module() {
        assert_eq!(map_library("collections"), None);
        assert_eq!(map_library("reactor"), None);
    }
}
