//! The symbolic resolver the engine consumes.
//!
//! The engine never parses source itself; it asks a [`Resolver`] what a name
//! refers to, where it is referenced and what a routine invokes. The crate ships
//! one implementation ([`ProgramSnapshot`], tree-sitter C#) and the unit tests use
//! an in-memory one.

pub mod csharp;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ResolverResult;
use crate::model::{KindFilter, SymbolHandle};

pub use snapshot::ProgramSnapshot;

/// Workspace health as seen by the resolver. Drives tier selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub total_files: usize,
    pub parseable_files: usize,
    pub compile_error_count: usize,
}

/// A textual reference to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Identity of the document holding the reference.
    pub document: String,
    /// Routine (or other member) the reference sits in.
    pub container: Option<SymbolHandle>,
    /// The referencing expression, e.g. `repo.Save(order)`.
    pub expression: String,
    pub line_text: String,
    /// A few lines around the reference.
    pub context: String,
    /// False for method-group / delegate references that do not call.
    pub is_invocation: bool,
}

/// A call made from inside a routine body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub callee: SymbolHandle,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub expression: String,
    pub context: String,
}

/// Source text handed to the syntax and text tiers.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub text: Arc<str>,
}

pub trait Resolver: Send + Sync {
    fn find_symbols_by_name(&self, name: &str, kind: Option<KindFilter>) -> ResolverResult<Vec<SymbolHandle>>;

    /// Symbol declared or referenced at a 1-based position. Falls back to the
    /// innermost enclosing member.
    fn symbol_at_location(&self, file: &str, line: u32, column: u32) -> ResolverResult<Option<SymbolHandle>>;

    fn references(&self, symbol: &SymbolHandle) -> ResolverResult<Vec<ReferenceLocation>>;

    fn invocations_within(&self, symbol: &SymbolHandle) -> ResolverResult<Vec<Invocation>>;

    /// Types implementing an interface (directly or through a base class).
    fn implementations(&self, interface: &SymbolHandle) -> ResolverResult<Vec<SymbolHandle>>;

    fn health(&self) -> Health;

    /// Every routine declaration in the corpus.
    fn all_methods(&self) -> ResolverResult<Vec<SymbolHandle>>;

    /// Raw documents for tiers that work below the semantic model.
    fn sources(&self) -> Vec<SourceFile> {
        vec![]
    }
}
