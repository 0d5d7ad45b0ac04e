//! Whole-program resolver built from per-document [`FileIndex`] artifacts.
//!
//! A snapshot is immutable: edits produce a new one. Calls are bound once at build
//! time by name, arity and receiver type, so `references` and `invocations_within`
//! are plain lookups afterwards.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use super::csharp::{self, simple_type_name, FileIndex, MethodDecl, RawCall};
use super::{Health, Invocation, ReferenceLocation, Resolver, SourceFile};
use crate::error::{ResolverError, ResolverResult};
use crate::model::{KindFilter, Location, SymbolHandle, SymbolKind, TypeKind};

const CONTEXT_RADIUS: usize = 2;

/// Lines around a 1-based `line`, the target marked with `>>>`.
pub fn context_lines(text: &str, line: u32) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() || line == 0 {
        return String::new();
    }
    let target = (line as usize - 1).min(lines.len() - 1);
    let start = target.saturating_sub(CONTEXT_RADIUS);
    let end = (target + CONTEXT_RADIUS + 1).min(lines.len());
    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let marker = if start + i == target { ">>>" } else { "   " };
            format!("{marker} {:>4} | {}", start + i + 1, l)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn line_text(text: &str, line: u32) -> String {
    text.lines()
        .nth(line.saturating_sub(1) as usize)
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

struct TypeInfo {
    handle: SymbolHandle,
    bases: Vec<String>,
    containing_type: Option<String>,
}

struct MethodEntry {
    file: usize,
    index: usize,
    handle: SymbolHandle,
}

struct Edge {
    callee: usize,
    call: RawCall,
    is_invocation: bool,
}

enum Receiver {
    Types(Vec<String>),
    Unknown,
}

pub struct ProgramSnapshot {
    files: Vec<Arc<FileIndex>>,
    texts: Vec<Arc<str>>,
    types: BTreeMap<String, TypeInfo>,
    methods: Vec<MethodEntry>,
    by_id: HashMap<String, usize>,
    by_type: HashMap<String, Vec<usize>>,
    member_types: HashMap<(String, String), String>,
    outgoing: Vec<Vec<Edge>>,
    /// Callee -> (caller, edge index in the caller's `outgoing`).
    incoming: Vec<Vec<(usize, usize)>>,
}

impl std::fmt::Debug for ProgramSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramSnapshot")
            .field("files", &self.files.len())
            .field("types", &self.types.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

impl ProgramSnapshot {
    /// Parse and link a set of `(path, text)` documents. Used by tests and the CLI
    /// paths that do not go through the document store.
    pub fn from_sources<P, T>(sources: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let docs = sources
            .into_iter()
            .map(|(p, t)| {
                let (path, text) = (p.as_ref(), t.as_ref());
                let index = csharp::parse_file(path, text).unwrap_or_else(|e| {
                    debug!(path, error = %e, "parse failed; document kept as unparseable");
                    FileIndex {
                        path: path.to_string(),
                        syntax_errors: 1,
                        ..FileIndex::default()
                    }
                });
                (Arc::new(index), Arc::<str>::from(text))
            })
            .collect();
        Self::build(docs)
    }

    /// Link per-document artifacts into one snapshot. Documents are ordered by path
    /// so declaration order (and therefore result order) is deterministic.
    pub fn build(mut docs: Vec<(Arc<FileIndex>, Arc<str>)>) -> Self {
        docs.sort_by(|a, b| a.0.path.cmp(&b.0.path));
        let (files, texts): (Vec<_>, Vec<_>) = docs.into_iter().unzip();

        let mut snapshot = ProgramSnapshot {
            files,
            texts,
            types: BTreeMap::new(),
            methods: Vec::new(),
            by_id: HashMap::new(),
            by_type: HashMap::new(),
            member_types: HashMap::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        };
        snapshot.index_declarations();
        snapshot.link_calls();
        debug!(
            files = snapshot.files.len(),
            methods = snapshot.methods.len(),
            "program snapshot built"
        );
        snapshot
    }

    fn index_declarations(&mut self) {
        for (fi, file) in self.files.iter().enumerate() {
            for t in &file.types {
                match self.types.get_mut(&t.name) {
                    // Partial declarations contribute their bases to one type.
                    Some(existing) => {
                        for b in &t.bases {
                            if !existing.bases.contains(b) {
                                existing.bases.push(b.clone());
                            }
                        }
                    }
                    None => {
                        let mut handle = SymbolHandle::type_decl(
                            &t.name,
                            &t.namespace,
                            t.kind,
                            t.bases.clone(),
                            t.location.clone(),
                        );
                        handle.containing_type = t.containing_type.clone();
                        self.types.insert(
                            t.name.clone(),
                            TypeInfo {
                                handle,
                                bases: t.bases.clone(),
                                containing_type: t.containing_type.clone(),
                            },
                        );
                    }
                }
            }
            for m in &file.members {
                self.member_types
                    .entry((m.containing_type.clone(), m.name.clone()))
                    .or_insert_with(|| m.ty.clone());
            }
            for (mi, m) in file.methods.iter().enumerate() {
                let mut handle =
                    SymbolHandle::method(m.signature.clone(), &m.namespace, m.location.clone());
                if self.by_id.contains_key(&handle.id) {
                    let mut n = 2;
                    while self.by_id.contains_key(&format!("{}#{n}", handle.id)) {
                        n += 1;
                    }
                    handle.id = format!("{}#{n}", handle.id);
                }
                let idx = self.methods.len();
                self.by_id.insert(handle.id.clone(), idx);
                self.by_type
                    .entry(m.signature.containing_type.clone())
                    .or_default()
                    .push(idx);
                self.methods.push(MethodEntry {
                    file: fi,
                    index: mi,
                    handle,
                });
            }
        }
    }

    fn link_calls(&mut self) {
        let mut outgoing = Vec::with_capacity(self.methods.len());
        for caller in 0..self.methods.len() {
            let decl = self.decl(caller);
            let mut edges = Vec::new();
            for call in &decl.calls {
                if let Some(callee) = self.resolve_call(caller, call) {
                    edges.push(Edge {
                        callee,
                        call: call.clone(),
                        is_invocation: true,
                    });
                }
            }
            for group in &decl.method_groups {
                if let Some(callee) = self.resolve_method_group(caller, &group.name) {
                    edges.push(Edge {
                        callee,
                        call: group.clone(),
                        is_invocation: false,
                    });
                }
            }
            outgoing.push(edges);
        }

        let mut incoming = vec![Vec::new(); self.methods.len()];
        for (caller, edges) in outgoing.iter().enumerate() {
            for (ei, e) in edges.iter().enumerate() {
                incoming[e.callee].push((caller, ei));
            }
        }
        self.outgoing = outgoing;
        self.incoming = incoming;
    }

    fn decl(&self, method: usize) -> &MethodDecl {
        let e = &self.methods[method];
        &self.files[e.file].methods[e.index]
    }

    fn file_text(&self, method: usize) -> &str {
        &self.texts[self.methods[method].file]
    }

    /// The type followed by its base types, breadth first.
    fn ancestors(&self, ty: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ty.to_string()]);
        while let Some(t) = queue.pop_front() {
            if !seen.insert(t.clone()) {
                continue;
            }
            if let Some(info) = self.types.get(&t) {
                queue.extend(info.bases.iter().cloned());
            }
            out.push(t);
        }
        out
    }

    /// Types whose members an unqualified name inside `ty` can bind to.
    fn lexical_scope(&self, ty: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = Some(ty.to_string());
        while let Some(t) = current {
            for a in self.ancestors(&t) {
                if !out.contains(&a) {
                    out.push(a);
                }
            }
            current = self.types.get(&t).and_then(|i| i.containing_type.clone());
        }
        out
    }

    fn declared_type_of(&self, caller: usize, name: &str) -> Option<String> {
        let decl = self.decl(caller);
        if let Some((_, ty)) = decl.locals.iter().rev().find(|(n, _)| n == name) {
            return Some(ty.clone());
        }
        if let Some(p) = decl.signature.parameters.iter().find(|p| p.name == name) {
            return Some(p.ty.clone());
        }
        self.lexical_scope(&decl.signature.containing_type)
            .into_iter()
            .find_map(|t| self.member_types.get(&(t, name.to_string())).cloned())
    }

    fn receiver_types(&self, caller: usize, receiver: Option<&str>) -> Receiver {
        let own = &self.decl(caller).signature.containing_type;
        let Some(receiver) = receiver else {
            return Receiver::Types(self.lexical_scope(own));
        };
        match receiver {
            "this" => return Receiver::Types(self.lexical_scope(own)),
            "base" => return Receiver::Types(self.ancestors(own).into_iter().skip(1).collect()),
            _ => {}
        }
        let r = receiver.strip_prefix("this.").unwrap_or(receiver);
        let simple = r.chars().all(|c| c.is_alphanumeric() || c == '_');
        if simple {
            if let Some(ty) = self.declared_type_of(caller, r) {
                let ty = simple_type_name(&ty);
                if ty == "var" || ty.is_empty() {
                    return Receiver::Unknown;
                }
                return Receiver::Types(self.ancestors(&ty));
            }
            if self.types.contains_key(r) {
                return Receiver::Types(self.ancestors(r));
            }
            return Receiver::Unknown;
        }
        // `Shop.Util.Helper` style static access.
        if r.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            let last = simple_type_name(r);
            if self.types.contains_key(&last) {
                return Receiver::Types(self.ancestors(&last));
            }
        }
        Receiver::Unknown
    }

    fn member_method(&self, ty: &str, name: &str, arity: usize) -> Option<usize> {
        let candidates: Vec<usize> = self
            .by_type
            .get(ty)?
            .iter()
            .copied()
            .filter(|&m| {
                let sig = &self.methods[m].handle;
                let Some(sig) = sig.signature() else { return false };
                sig.name == name && !self.decl(m).is_constructor && sig.accepts_arity(arity)
            })
            .collect();
        candidates
            .iter()
            .copied()
            .find(|&m| self.decl(m).signature.parameters.len() == arity)
            .or_else(|| candidates.first().copied())
    }

    fn extension_method(&self, name: &str, arity: usize) -> Option<usize> {
        (0..self.methods.len()).find(|&m| {
            let sig = &self.decl(m).signature;
            sig.modifiers.is_extension && sig.name == name && sig.accepts_arity(arity)
        })
    }

    fn unique_by_name(&self, name: &str, arity: usize) -> Option<usize> {
        let mut found = (0..self.methods.len()).filter(|&m| {
            let d = self.decl(m);
            !d.is_constructor && d.signature.name == name && d.signature.accepts_arity(arity)
        });
        match (found.next(), found.next()) {
            (Some(m), None) => Some(m),
            _ => None,
        }
    }

    fn constructor(&self, ty: &str, arity: usize) -> Option<usize> {
        self.by_type.get(ty)?.iter().copied().find(|&m| {
            let d = self.decl(m);
            d.is_constructor && d.signature.accepts_arity(arity)
        })
    }

    fn resolve_call(&self, caller: usize, call: &RawCall) -> Option<usize> {
        if call.is_constructor {
            return self.constructor(&call.name, call.arg_count);
        }
        match self.receiver_types(caller, call.receiver.as_deref()) {
            Receiver::Types(types) => types
                .iter()
                .find_map(|t| self.member_method(t, &call.name, call.arg_count))
                .or_else(|| self.extension_method(&call.name, call.arg_count)),
            Receiver::Unknown => self.unique_by_name(&call.name, call.arg_count),
        }
    }

    fn resolve_method_group(&self, caller: usize, name: &str) -> Option<usize> {
        let own = self.decl(caller).signature.containing_type.clone();
        self.lexical_scope(&own).iter().find_map(|t| {
            self.by_type.get(t)?.iter().copied().find(|&m| {
                let d = self.decl(m);
                !d.is_constructor && d.signature.name == name
            })
        })
    }

    fn method_index(&self, symbol: &SymbolHandle) -> ResolverResult<usize> {
        self.by_id
            .get(&symbol.id)
            .copied()
            .ok_or_else(|| ResolverError::UnknownSymbol(symbol.id.clone()))
    }

    fn file_index(&self, file: &str) -> Option<usize> {
        let wanted = file.replace('\\', "/");
        self.files
            .iter()
            .position(|f| f.path == wanted)
            .or_else(|| {
                self.files.iter().position(|f| {
                    f.path.ends_with(&format!("/{wanted}")) || wanted.ends_with(&format!("/{}", f.path))
                })
            })
    }

    fn member_handles(&self) -> impl Iterator<Item = SymbolHandle> + '_ {
        self.files.iter().flat_map(|f| {
            f.members.iter().map(|m| {
                let owner = if m.namespace.is_empty() {
                    m.containing_type.clone()
                } else {
                    format!("{}.{}", m.namespace, m.containing_type)
                };
                let kind = if m.is_property {
                    SymbolKind::Property { ty: m.ty.clone() }
                } else {
                    SymbolKind::Field { ty: m.ty.clone() }
                };
                SymbolHandle {
                    id: format!("{owner}.{}", m.name),
                    name: m.name.clone(),
                    namespace: m.namespace.clone(),
                    containing_type: Some(m.containing_type.clone()),
                    kind,
                    location: m.location.clone(),
                }
            })
        })
    }

    fn reference(&self, caller: usize, edge: &Edge) -> ReferenceLocation {
        let text = self.file_text(caller);
        let loc = &edge.call.location;
        ReferenceLocation {
            file: loc.file.clone(),
            line: loc.line,
            column: loc.column,
            document: self.files[self.methods[caller].file].path.clone(),
            container: Some(self.methods[caller].handle.clone()),
            expression: edge.call.expression.clone(),
            line_text: line_text(text, loc.line),
            context: context_lines(text, loc.line),
            is_invocation: edge.is_invocation,
        }
    }

    fn invocation(&self, caller: usize, edge: &Edge) -> Invocation {
        let loc = &edge.call.location;
        Invocation {
            callee: self.methods[edge.callee].handle.clone(),
            file: loc.file.clone(),
            line: loc.line,
            column: loc.column,
            expression: edge.call.expression.clone(),
            context: context_lines(self.file_text(caller), loc.line),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

impl Resolver for ProgramSnapshot {
    fn find_symbols_by_name(&self, name: &str, kind: Option<KindFilter>) -> ResolverResult<Vec<SymbolHandle>> {
        let name = name.trim();
        let (owner, simple) = match name.rsplit_once('.') {
            Some((o, s)) => (Some(o), s),
            None => (None, name),
        };
        let owner_matches = |h: &SymbolHandle| match owner {
            None => true,
            Some(o) => {
                let t = h.containing_type.as_deref().unwrap_or("");
                t == o || (!h.namespace.is_empty() && format!("{}.{t}", h.namespace) == o)
            }
        };
        let admits = |h: &SymbolHandle| kind.map(|k| k.admits(&h.kind)).unwrap_or(true);

        let mut out = Vec::new();
        // A qualified name may also be a namespace-qualified type.
        for info in self.types.values() {
            let h = &info.handle;
            if admits(h) && (h.name == name || h.id == name) {
                out.push(h.clone());
            }
        }
        out.extend(
            self.methods
                .iter()
                .map(|m| &m.handle)
                .filter(|h| h.name == simple && owner_matches(h) && admits(h))
                .cloned(),
        );
        out.extend(
            self.member_handles()
                .filter(|h| h.name == simple && owner_matches(h) && admits(h)),
        );
        Ok(out)
    }

    fn symbol_at_location(&self, file: &str, line: u32, column: u32) -> ResolverResult<Option<SymbolHandle>> {
        let Some(fi) = self.file_index(file) else {
            return Ok(None);
        };
        let on_token = |loc: &Location, len: usize| {
            loc.line == line && column >= loc.column && (column as usize) < loc.column as usize + len.max(1)
        };

        let in_file: Vec<usize> = (0..self.methods.len()).filter(|&m| self.methods[m].file == fi).collect();

        // A call under the cursor names its callee.
        for &m in &in_file {
            for e in &self.outgoing[m] {
                if on_token(&e.call.location, e.call.name.len()) {
                    return Ok(Some(self.methods[e.callee].handle.clone()));
                }
            }
        }
        for &m in &in_file {
            let h = &self.methods[m].handle;
            if on_token(&h.location, h.name.len()) {
                return Ok(Some(h.clone()));
            }
        }
        for info in self.types.values() {
            let h = &info.handle;
            if self.file_index(&h.location.file) == Some(fi) && on_token(&h.location, h.name.len()) {
                return Ok(Some(h.clone()));
            }
        }
        if let Some(h) = self
            .member_handles()
            .find(|h| self.file_index(&h.location.file) == Some(fi) && on_token(&h.location, h.name.len()))
        {
            return Ok(Some(h));
        }

        // Innermost enclosing routine.
        let enclosing = in_file
            .iter()
            .copied()
            .filter(|&m| {
                let d = self.decl(m);
                d.start_line <= line && line <= d.end_line
            })
            .min_by_key(|&m| {
                let d = self.decl(m);
                d.end_line - d.start_line
            });
        Ok(enclosing.map(|m| self.methods[m].handle.clone()))
    }

    fn references(&self, symbol: &SymbolHandle) -> ResolverResult<Vec<ReferenceLocation>> {
        match &symbol.kind {
            SymbolKind::Method(_) => {
                let idx = self.method_index(symbol)?;
                Ok(self.incoming[idx]
                    .iter()
                    .map(|&(caller, ei)| self.reference(caller, &self.outgoing[caller][ei]))
                    .collect())
            }
            SymbolKind::Type { .. } => {
                let mut out = Vec::new();
                for (caller, edges) in self.outgoing.iter().enumerate() {
                    for e in edges {
                        let via_ctor = e.call.is_constructor && e.call.name == symbol.name;
                        let via_static = e
                            .call
                            .receiver
                            .as_deref()
                            .map(|r| simple_type_name(r) == symbol.name)
                            .unwrap_or(false);
                        if via_ctor || via_static {
                            out.push(self.reference(caller, e));
                        }
                    }
                }
                Ok(out)
            }
            SymbolKind::Property { .. } | SymbolKind::Field { .. } => Ok(vec![]),
        }
    }

    fn invocations_within(&self, symbol: &SymbolHandle) -> ResolverResult<Vec<Invocation>> {
        let owners: Vec<usize> = match &symbol.kind {
            SymbolKind::Method(_) => vec![self.method_index(symbol)?],
            SymbolKind::Type { .. } => self.by_type.get(&symbol.name).cloned().unwrap_or_default(),
            _ => vec![],
        };
        Ok(owners
            .into_iter()
            .flat_map(|m| {
                self.outgoing[m]
                    .iter()
                    .filter(|e| e.is_invocation)
                    .map(move |e| self.invocation(m, e))
            })
            .collect())
    }

    fn implementations(&self, interface: &SymbolHandle) -> ResolverResult<Vec<SymbolHandle>> {
        let name = match &interface.kind {
            SymbolKind::Type { .. } => interface.name.clone(),
            // A member handle asks for implementations of its declaring type.
            _ => match &interface.containing_type {
                Some(t) => t.clone(),
                None => return Ok(vec![]),
            },
        };
        Ok(self
            .types
            .values()
            .filter(|info| info.handle.name != name && info.handle.type_kind() != Some(TypeKind::Interface))
            .filter(|info| self.ancestors(&info.handle.name).iter().any(|a| *a == name))
            .map(|info| info.handle.clone())
            .collect())
    }

    fn health(&self) -> Health {
        Health {
            total_files: self.files.len(),
            parseable_files: self.files.iter().filter(|f| f.is_parseable()).count(),
            compile_error_count: self.files.iter().map(|f| f.syntax_errors).sum(),
        }
    }

    fn all_methods(&self) -> ResolverResult<Vec<SymbolHandle>> {
        Ok(self.methods.iter().map(|m| m.handle.clone()).collect())
    }

    fn sources(&self) -> Vec<SourceFile> {
        self.files
            .iter()
            .zip(&self.texts)
            .map(|(f, t)| SourceFile {
                path: f.path.clone(),
                text: Arc::clone(t),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = r#"
namespace Shop.Data
{
    public interface IRepository
    {
        void Save(string item);
    }

    public class SqlRepository : IRepository
    {
        public void Save(string item) { Log(item); }
        private void Log(string item) { }
    }

    public class CachedRepository : SqlRepository { }
}
"#;

    const SERVICE: &str = r#"
namespace Shop.App
{
    public class Checkout
    {
        private readonly IRepository repo;

        public void Run(string item)
        {
            repo.Save(item);
            var sql = new SqlRepository();
            sql.Save(item);
            Format(item);
            Format(item, 2);
        }

        private string Format(string s) { return s; }
        private string Format(string s, int width) { return s; }
    }
}
"#;

    fn snapshot() -> ProgramSnapshot {
        ProgramSnapshot::from_sources([("src/Data/Repo.cs", REPO), ("src/App/Checkout.cs", SERVICE)])
    }

    fn method(s: &ProgramSnapshot, name: &str, owner: &str) -> SymbolHandle {
        s.find_symbols_by_name(&format!("{owner}.{name}"), Some(KindFilter::Method))
            .unwrap()
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("{owner}.{name} not found"))
    }

    #[test]
    fn binds_calls_through_field_and_local_types() {
        let s = snapshot();
        let run = method(&s, "Run", "Checkout");
        let callees: Vec<String> = s
            .invocations_within(&run)
            .unwrap()
            .into_iter()
            .map(|i| i.callee.key())
            .collect();
        assert!(callees.contains(&"IRepository.Save".to_string()), "{callees:?}");
        assert!(callees.contains(&"SqlRepository.Save".to_string()), "{callees:?}");
        // No declared constructor, so `new SqlRepository()` binds to nothing.
        assert!(!callees.iter().any(|c| c == "SqlRepository.SqlRepository"));
        assert_eq!(callees.iter().filter(|c| *c == "Checkout.Format").count(), 2);
    }

    #[test]
    fn overloads_bind_by_arity() {
        let s = snapshot();
        let formats = s.find_symbols_by_name("Checkout.Format", Some(KindFilter::Method)).unwrap();
        assert_eq!(formats.len(), 2);
        assert_ne!(formats[0].id, formats[1].id);
        for f in &formats {
            let refs = s.references(f).unwrap();
            assert_eq!(refs.len(), 1, "each overload has exactly one caller: {}", f.id);
            assert_eq!(refs[0].container.as_ref().map(|c| c.key()), Some("Checkout.Run".to_string()));
            assert!(refs[0].is_invocation);
            assert!(refs[0].context.contains(">>>"));
        }
    }

    #[test]
    fn implementations_are_transitive_and_skip_interfaces() {
        let s = snapshot();
        let iface = s
            .find_symbols_by_name("IRepository", Some(KindFilter::Type))
            .unwrap()
            .remove(0);
        let mut names: Vec<String> = s.implementations(&iface).unwrap().into_iter().map(|h| h.name).collect();
        names.sort();
        assert_eq!(names, vec!["CachedRepository", "SqlRepository"]);
    }

    #[test]
    fn symbol_at_location_prefers_call_then_enclosing_routine() {
        let s = snapshot();
        // `repo.Save(item);` is on line 10; `Save` starts at column 18.
        let at_call = s.symbol_at_location("src/App/Checkout.cs", 10, 19).unwrap().unwrap();
        assert_eq!(at_call.key(), "IRepository.Save");

        let inside = s.symbol_at_location("src/App/Checkout.cs", 12, 1).unwrap().unwrap();
        assert_eq!(inside.key(), "Checkout.Run");

        assert!(s.symbol_at_location("nope.cs", 1, 1).unwrap().is_none());
    }

    #[test]
    fn health_counts_syntax_errors() {
        let s = ProgramSnapshot::from_sources([("a.cs", "class A { void M() { } }"), ("b.cs", "class B { void M( }")]);
        let h = s.health();
        assert_eq!(h.total_files, 2);
        assert_eq!(h.parseable_files, 1);
        assert!(h.compile_error_count > 0);
    }

    #[test]
    fn unknown_handle_is_a_resolver_fault() {
        let s = snapshot();
        let mut ghost = method(&s, "Run", "Checkout");
        ghost.id = "Ghost.Run()".into();
        assert!(matches!(s.references(&ghost), Err(ResolverError::UnknownSymbol(_))));
    }

    #[test]
    fn context_lines_marks_target() {
        let ctx = context_lines("a\nb\nc\nd\ne\nf", 3);
        assert_eq!(ctx.lines().count(), 5);
        assert!(ctx.lines().nth(2).unwrap().starts_with(">>>"));
    }
}
