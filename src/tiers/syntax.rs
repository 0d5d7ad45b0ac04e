//! Syntax tier: each document parsed in isolation, no cross-file binding.

use rayon::prelude::*;
use tracing::debug;

use super::{SymbolMatch, SymbolQuery};
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::csharp::{self, FileIndex};
use crate::resolver::SourceFile;

fn declarations(index: &FileIndex) -> Vec<SymbolMatch> {
    let mut out = Vec::new();
    for t in &index.types {
        out.push(SymbolMatch {
            name: t.name.clone(),
            kind: t.kind.keyword().to_string(),
            containing_type: t.containing_type.clone(),
            file: t.location.file.clone(),
            line: t.location.line,
            column: t.location.column,
            handle: None,
        });
    }
    for m in &index.methods {
        out.push(SymbolMatch {
            name: m.signature.name.clone(),
            kind: "method".to_string(),
            containing_type: Some(m.signature.containing_type.clone()),
            file: m.location.file.clone(),
            line: m.location.line,
            column: m.location.column,
            handle: None,
        });
    }
    for m in &index.members {
        out.push(SymbolMatch {
            name: m.name.clone(),
            kind: if m.is_property { "property" } else { "field" }.to_string(),
            containing_type: Some(m.containing_type.clone()),
            file: m.location.file.clone(),
            line: m.location.line,
            column: m.location.column,
            handle: None,
        });
    }
    out
}

/// Declarations named like the query across every cleanly parsing document.
/// Documents that fail to parse are skipped, never fatal.
pub fn find_declarations(sources: &[SourceFile], query: &SymbolQuery) -> ResolverResult<Vec<SymbolMatch>> {
    let (_, simple) = query.split_name();
    let needle = simple.as_str();

    let per_file: Vec<ResolverResult<Vec<SymbolMatch>>> = sources
        .par_iter()
        .filter(|s| csharp::is_csharp_path(&s.path))
        // Cheap prefilter before paying for a parse.
        .filter(|s| needle.is_empty() || s.text.contains(needle))
        .map(|s| match csharp::parse_file(&s.path, &s.text) {
            Ok(index) if index.is_parseable() => Ok(declarations(&index)),
            Ok(index) => {
                debug!(path = %s.path, errors = index.syntax_errors, "skipping document with syntax errors");
                Ok(vec![])
            }
            Err(ResolverError::Parse { path, reason }) => {
                debug!(%path, %reason, "skipping unparseable document");
                Ok(vec![])
            }
            Err(e) => Err(e),
        })
        .collect();

    let mut out = Vec::new();
    for r in per_file {
        out.extend(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn src(path: &str, text: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            text: Arc::from(text),
        }
    }

    #[test]
    fn skips_broken_documents_and_keeps_the_rest() {
        let sources = vec![
            src("a/Good.cs", "class Good { void Run() { } }"),
            src("a/Bad.cs", "class Bad { void Run( { }"),
        ];
        let found = find_declarations(&sources, &SymbolQuery::method("Run")).unwrap();
        let runs: Vec<_> = found.iter().filter(|m| m.name == "Run").collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].containing_type.as_deref(), Some("Good"));
        assert_eq!(runs[0].file, "a/Good.cs");
    }

    #[test]
    fn ignores_non_csharp_documents() {
        let sources = vec![src("notes.md", "class Run { }")];
        assert!(find_declarations(&sources, &SymbolQuery::named("Run")).unwrap().is_empty());
    }
}
