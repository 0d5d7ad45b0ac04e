//! In-memory [`Resolver`] for unit tests: declare routines and edges directly,
//! no parsing involved.

use std::sync::Arc;

use crate::error::{ResolverError, ResolverResult};
use crate::model::{
    KindFilter, Location, MethodSignature, Modifiers, Parameter, SymbolHandle, SymbolKind, TypeKind,
};
use crate::resolver::{Health, Invocation, ReferenceLocation, Resolver, SourceFile};

#[derive(Debug, Clone)]
struct Edge {
    from: usize,
    to: usize,
    file: String,
    line: u32,
    context: String,
    is_invocation: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    types: Vec<SymbolHandle>,
    methods: Vec<SymbolHandle>,
    edges: Vec<Edge>,
    sources: Vec<SourceFile>,
    compile_errors: usize,
    fail_semantic: bool,
}

#[derive(Debug, Default)]
pub struct MemoryResolverBuilder {
    inner: MemoryResolver,
    next_line: u32,
}

impl MemoryResolver {
    pub fn builder() -> MemoryResolverBuilder {
        MemoryResolverBuilder {
            inner: MemoryResolver::default(),
            next_line: 100,
        }
    }

    pub fn with_compile_errors(mut self, n: usize) -> Self {
        self.compile_errors = n;
        self
    }

    /// Every semantic operation fails with a resolver fault.
    pub fn failing_semantic(mut self) -> Self {
        self.fail_semantic = true;
        self
    }

    pub fn handle(&self, key: &str) -> SymbolHandle {
        self.methods
            .iter()
            .find(|m| m.key() == key)
            .cloned()
            .unwrap_or_else(|| panic!("no routine {key}"))
    }

    pub fn type_handle(&self, name: &str) -> SymbolHandle {
        self.types
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no type {name}"))
    }

    fn guard(&self) -> ResolverResult<()> {
        if self.fail_semantic {
            Err(ResolverError::Unavailable("in-memory resolver told to fail".to_string()))
        } else {
            Ok(())
        }
    }

    fn index_of(&self, h: &SymbolHandle) -> ResolverResult<usize> {
        self.methods
            .iter()
            .position(|m| m.id == h.id)
            .ok_or_else(|| ResolverError::UnknownSymbol(h.id.clone()))
    }

    fn bases_of(&self, name: &str) -> Vec<String> {
        self.types
            .iter()
            .find(|t| t.name == name)
            .map(|t| match &t.kind {
                SymbolKind::Type { bases, .. } => bases.clone(),
                _ => vec![],
            })
            .unwrap_or_default()
    }

    fn derives_from(&self, ty: &str, base: &str, depth: usize) -> bool {
        if depth > 16 {
            return false;
        }
        self.bases_of(ty)
            .iter()
            .any(|b| b == base || self.derives_from(b, base, depth + 1))
    }
}

impl MemoryResolverBuilder {
    fn ensure_type(&mut self, name: &str, kind: TypeKind, bases: &[&str]) {
        if let Some(existing) = self.inner.types.iter_mut().find(|t| t.name == name) {
            if let SymbolKind::Type { type_kind, bases: b } = &mut existing.kind {
                *type_kind = kind;
                b.extend(bases.iter().map(|s| s.to_string()));
            }
            return;
        }
        let loc = Location::new(format!("src/{name}.cs"), 1, 14);
        self.inner.types.push(SymbolHandle::type_decl(
            name,
            "App",
            kind,
            bases.iter().map(|s| s.to_string()).collect(),
            loc,
        ));
    }

    pub fn class(mut self, name: &str, bases: &[&str]) -> Self {
        self.ensure_type(name, TypeKind::Class, bases);
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.ensure_type(name, TypeKind::Interface, &[]);
        self
    }

    pub fn signature(mut self, mut sig: MethodSignature) -> Self {
        let owner = sig.containing_type.clone();
        if !self.inner.types.iter().any(|t| t.name == owner) {
            self.ensure_type(&owner, TypeKind::Class, &[]);
        }
        let is_interface = self
            .inner
            .types
            .iter()
            .any(|t| t.name == owner && t.type_kind() == Some(TypeKind::Interface));
        if is_interface {
            sig.modifiers.is_abstract = true;
        }
        self.next_line += 10;
        let loc = Location::new(format!("src/{owner}.cs"), self.next_line, 17);
        self.inner.methods.push(SymbolHandle::method(sig, "App", loc));
        self
    }

    pub fn method(self, ty: &str, name: &str, params: &[&str]) -> Self {
        let mut sig = MethodSignature::new(ty, name);
        for (i, p) in params.iter().enumerate() {
            sig = sig.with_parameter(Parameter::new(format!("p{i}"), *p));
        }
        self.signature(sig)
    }

    pub fn virtual_method(self, ty: &str, name: &str) -> Self {
        self.signature(MethodSignature::new(ty, name).with_modifiers(Modifiers {
            is_virtual: true,
            ..Modifiers::default()
        }))
    }

    fn edge(mut self, from: &str, to: &str, file: Option<&str>, context: Option<&str>, is_invocation: bool) -> Self {
        let from_idx = self.position(from);
        let to_idx = self.position(to);
        let file = file
            .map(str::to_string)
            .unwrap_or_else(|| self.inner.methods[from_idx].location.file.clone());
        self.next_line += 1;
        let name = self.inner.methods[to_idx].name.clone();
        self.inner.edges.push(Edge {
            from: from_idx,
            to: to_idx,
            file,
            line: self.next_line,
            context: context.map(str::to_string).unwrap_or_else(|| format!("{name}();")),
            is_invocation,
        });
        self
    }

    fn position(&self, key: &str) -> usize {
        self.inner
            .methods
            .iter()
            .position(|m| m.key() == key)
            .unwrap_or_else(|| panic!("declare {key} before wiring calls to it"))
    }

    pub fn call(self, from: &str, to: &str) -> Self {
        self.edge(from, to, None, None, true)
    }

    /// A call whose site sits in `file` (e.g. a test project).
    pub fn call_in(self, from: &str, to: &str, file: &str) -> Self {
        self.edge(from, to, Some(file), None, true)
    }

    pub fn call_with_context(self, from: &str, to: &str, context: &str) -> Self {
        self.edge(from, to, None, Some(context), true)
    }

    /// A delegate / method-group reference that does not call.
    pub fn method_group(self, from: &str, to: &str) -> Self {
        self.edge(from, to, None, None, false)
    }

    pub fn source(mut self, path: &str, text: &str) -> Self {
        self.inner.sources.push(SourceFile {
            path: path.to_string(),
            text: Arc::from(text),
        });
        self
    }

    pub fn build(self) -> MemoryResolver {
        self.inner
    }
}

impl Resolver for MemoryResolver {
    fn find_symbols_by_name(&self, name: &str, kind: Option<KindFilter>) -> ResolverResult<Vec<SymbolHandle>> {
        self.guard()?;
        let (owner, simple) = match name.rsplit_once('.') {
            Some((o, s)) => (Some(o.rsplit('.').next().unwrap_or(o)), s),
            None => (None, name),
        };
        let admits = |h: &SymbolHandle| kind.map(|k| k.admits(&h.kind)).unwrap_or(true);
        let owner_ok = |h: &SymbolHandle| owner.map(|o| h.containing_type.as_deref() == Some(o)).unwrap_or(true);
        let mut out: Vec<SymbolHandle> = self
            .types
            .iter()
            .filter(|t| t.name == name && admits(t))
            .cloned()
            .collect();
        out.extend(
            self.methods
                .iter()
                .filter(|m| m.name == simple && owner_ok(m) && admits(m))
                .cloned(),
        );
        Ok(out)
    }

    fn symbol_at_location(&self, file: &str, line: u32, _column: u32) -> ResolverResult<Option<SymbolHandle>> {
        self.guard()?;
        Ok(self
            .methods
            .iter()
            .find(|m| m.location.file == file && m.location.line == line)
            .cloned())
    }

    fn references(&self, symbol: &SymbolHandle) -> ResolverResult<Vec<ReferenceLocation>> {
        self.guard()?;
        if symbol.signature().is_none() {
            return Ok(vec![]);
        }
        let idx = self.index_of(symbol)?;
        Ok(self
            .edges
            .iter()
            .filter(|e| e.to == idx)
            .map(|e| ReferenceLocation {
                file: e.file.clone(),
                line: e.line,
                column: 9,
                document: e.file.clone(),
                container: Some(self.methods[e.from].clone()),
                expression: format!("{}()", self.methods[e.to].name),
                line_text: format!("{}();", self.methods[e.to].name),
                context: e.context.clone(),
                is_invocation: e.is_invocation,
            })
            .collect())
    }

    fn invocations_within(&self, symbol: &SymbolHandle) -> ResolverResult<Vec<Invocation>> {
        self.guard()?;
        let idx = self.index_of(symbol)?;
        Ok(self
            .edges
            .iter()
            .filter(|e| e.from == idx && e.is_invocation)
            .map(|e| Invocation {
                callee: self.methods[e.to].clone(),
                file: e.file.clone(),
                line: e.line,
                column: 9,
                expression: format!("{}()", self.methods[e.to].name),
                context: e.context.clone(),
            })
            .collect())
    }

    fn implementations(&self, interface: &SymbolHandle) -> ResolverResult<Vec<SymbolHandle>> {
        self.guard()?;
        let name = match interface.type_kind() {
            Some(_) => interface.name.clone(),
            None => interface.containing_type.clone().unwrap_or_default(),
        };
        Ok(self
            .types
            .iter()
            .filter(|t| t.type_kind() != Some(TypeKind::Interface) && self.derives_from(&t.name, &name, 0))
            .cloned()
            .collect())
    }

    fn health(&self) -> Health {
        Health {
            total_files: self.sources.len(),
            parseable_files: self.sources.len(),
            compile_error_count: self.compile_errors,
        }
    }

    fn all_methods(&self) -> ResolverResult<Vec<SymbolHandle>> {
        self.guard()?;
        Ok(self.methods.clone())
    }

    fn sources(&self) -> Vec<SourceFile> {
        self.sources.clone()
    }
}
