//! Text tier: line-by-line regex scan for C# declarations.
//!
//! Works on anything, including documents that do not parse. Containing types
//! are tracked by the most recent type declaration seen, which is wrong for code
//! after a nested type closes; results are low confidence by construction.

use regex::Regex;
use std::sync::OnceLock;

use super::SymbolMatch;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::csharp::is_csharp_path;
use crate::resolver::SourceFile;

const NOT_A_RETURN_TYPE: &[&str] = &[
    "return", "new", "await", "throw", "else", "yield", "case", "goto", "using", "if", "while",
    "for", "foreach", "switch", "catch", "lock", "nameof", "typeof", "sizeof", "is", "as", "in",
];

struct Patterns {
    type_decl: Regex,
    method: Regex,
    property: Regex,
    field: Regex,
}

fn patterns() -> &'static Patterns {
    static RE: OnceLock<Patterns> = OnceLock::new();
    RE.get_or_init(|| Patterns {
        type_decl: Regex::new(
            r"^\s*(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|file|unsafe)\s+)*(class|interface|struct|record|enum)\s+([A-Za-z_][A-Za-z0-9_]*)",
        )
        .unwrap(),
        method: Regex::new(
            r"^\s*(?:(?:public|private|protected|internal|static|virtual|abstract|override|async|sealed|extern|new|unsafe|partial)\s+)*([A-Za-z_][\w<>\[\],.?]*)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:<[^>()]*>)?\s*\(",
        )
        .unwrap(),
        property: Regex::new(
            r"^\s*(?:(?:public|private|protected|internal|static|virtual|abstract|override|required|new|sealed)\s+)*([A-Za-z_][\w<>\[\],.?]*)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{\s*(?:get|set|init|private|protected|internal)",
        )
        .unwrap(),
        field: Regex::new(
            r"^\s*(?:(?:public|private|protected|internal|static|readonly|const|volatile|new)\s+)+([A-Za-z_][\w<>\[\],.?]*)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:=|;)",
        )
        .unwrap(),
    })
}

fn is_comment(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
}

/// Every declaration-looking line in one document.
pub fn scan_document(path: &str, text: &str) -> Vec<SymbolMatch> {
    let p = patterns();
    let mut out = Vec::new();
    let mut current_type: Option<String> = None;

    for (idx, line) in text.lines().enumerate() {
        let t = line.trim_start();
        if t.is_empty() || is_comment(line) {
            continue;
        }
        let line_no = idx as u32 + 1;
        let mut push = |name: &str, start: usize, kind: &str, owner: Option<String>| {
            out.push(SymbolMatch {
                name: name.to_string(),
                kind: kind.to_string(),
                containing_type: owner,
                file: path.to_string(),
                line: line_no,
                column: start as u32 + 1,
                handle: None,
            });
        };

        if let Some(c) = p.type_decl.captures(line) {
            let (kind, name) = (&c[1], c.get(2));
            if let Some(name) = name {
                push(name.as_str(), name.start(), kind, current_type.clone());
                current_type = Some(name.as_str().to_string());
            }
            continue;
        }
        if let Some(c) = p.method.captures(line) {
            if let (Some(ret), Some(name)) = (c.get(1), c.get(2)) {
                if !NOT_A_RETURN_TYPE.contains(&ret.as_str()) && !NOT_A_RETURN_TYPE.contains(&name.as_str()) {
                    push(name.as_str(), name.start(), "method", current_type.clone());
                    continue;
                }
            }
        }
        if let Some(c) = p.property.captures(line) {
            if let Some(name) = c.get(2) {
                push(name.as_str(), name.start(), "property", current_type.clone());
                continue;
            }
        }
        if let Some(c) = p.field.captures(line) {
            if let Some(name) = c.get(2) {
                push(name.as_str(), name.start(), "field", current_type.clone());
            }
        }
    }
    out
}

pub fn find_declarations(sources: &[SourceFile]) -> ResolverResult<Vec<SymbolMatch>> {
    if sources.is_empty() {
        return Err(ResolverError::Unavailable("no source documents to scan".to_string()));
    }
    Ok(sources
        .iter()
        .filter(|s| is_csharp_path(&s.path))
        .flat_map(|s| scan_document(&s.path, &s.text))
        .collect())
}
