use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source document. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    #[default]
    None,
    Ref,
    Out,
    In,
    Params,
    This,
}

impl RefKind {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        match kw {
            "ref" => Some(Self::Ref),
            "out" => Some(Self::Out),
            "in" => Some(Self::In),
            "params" => Some(Self::Params),
            "this" => Some(Self::This),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub optional: bool,
    pub ref_kind: RefKind,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            optional: false,
            ref_kind: RefKind::None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_ref_kind(mut self, kind: RefKind) -> Self {
        self.ref_kind = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    Public,
    Internal,
    Protected,
    ProtectedInternal,
    PrivateProtected,
    #[default]
    Private,
}

impl Accessibility {
    /// Derive accessibility from the modifier keywords of a declaration.
    /// C# members default to `private` when nothing is written.
    pub fn from_modifiers<'a>(mods: impl IntoIterator<Item = &'a str>) -> Self {
        let (mut public, mut internal, mut protected, mut private) = (false, false, false, false);
        for m in mods {
            match m {
                "public" => public = true,
                "internal" => internal = true,
                "protected" => protected = true,
                "private" => private = true,
                _ => {}
            }
        }
        match (public, internal, protected, private) {
            (true, ..) => Self::Public,
            (_, true, true, _) => Self::ProtectedInternal,
            (_, _, true, true) => Self::PrivateProtected,
            (_, true, ..) => Self::Internal,
            (_, _, true, _) => Self::Protected,
            _ => Self::Private,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    pub is_extension: bool,
    pub is_async: bool,
}

impl Modifiers {
    /// Members that participate in dynamic dispatch: a reference to the base
    /// declaration counts as a use of every override.
    pub fn is_polymorphic(&self) -> bool {
        self.is_virtual || self.is_abstract || self.is_override
    }
}

/// Identity of a routine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub containing_type: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub accessibility: Accessibility,
    pub modifiers: Modifiers,
}

impl MethodSignature {
    pub fn new(containing_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containing_type: containing_type.into(),
            return_type: "void".to_string(),
            parameters: Vec::new(),
            accessibility: Accessibility::Public,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_return_type(mut self, ty: impl Into<String>) -> Self {
        self.return_type = ty.into();
        self
    }

    pub fn with_parameter(mut self, p: Parameter) -> Self {
        self.parameters.push(p);
        self
    }

    pub fn with_accessibility(mut self, a: Accessibility) -> Self {
        self.accessibility = a;
        self
    }

    pub fn with_modifiers(mut self, m: Modifiers) -> Self {
        self.modifiers = m;
        self
    }

    /// `ContainingType.Name`, the traversal identity of a routine.
    pub fn key(&self) -> String {
        if self.containing_type.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.containing_type, self.name)
        }
    }

    /// Human readable form, e.g. `OrderService.Place(Order, bool)`.
    pub fn display(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| p.ty.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.key(), params)
    }

    pub fn is_constructor(&self) -> bool {
        !self.containing_type.is_empty() && self.name == self.containing_type
    }

    pub fn required_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| !p.optional && p.ref_kind != RefKind::Params && p.ref_kind != RefKind::This)
            .count()
    }

    /// Whether a call with `arg_count` arguments could bind to this routine.
    /// Extension methods are invoked without their `this` argument.
    pub fn accepts_arity(&self, arg_count: usize) -> bool {
        let declared = self
            .parameters
            .iter()
            .filter(|p| p.ref_kind != RefKind::This)
            .count();
        let variadic = self.parameters.iter().any(|p| p.ref_kind == RefKind::Params);
        arg_count >= self.required_parameter_count() && (variadic || arg_count <= declared)
    }

    /// Overload-tolerant comparison used when a caller names a routine without
    /// spelling its exact declaration. Return types are ignored.
    pub fn loosely_matches(&self, other: &MethodSignature) -> bool {
        if self.name != other.name {
            return false;
        }
        if !self.containing_type.is_empty()
            && !other.containing_type.is_empty()
            && normalize_type(&self.containing_type) != normalize_type(&other.containing_type)
        {
            return false;
        }
        let (short, long) = if self.parameters.len() <= other.parameters.len() {
            (&self.parameters, &other.parameters)
        } else {
            (&other.parameters, &self.parameters)
        };
        // Omitted trailing parameters must be optional on the longer side.
        if long[short.len()..]
            .iter()
            .any(|p| !p.optional && p.ref_kind != RefKind::Params)
        {
            return false;
        }
        short
            .iter()
            .zip(long.iter())
            .all(|(a, b)| types_compatible(&a.ty, &b.ty))
    }

    /// Match against a bare list of parameter type names (as supplied by a tool call).
    pub fn matches_parameter_types(&self, types: &[String]) -> bool {
        let probe = MethodSignature {
            parameters: types.iter().map(|t| Parameter::new("", t.as_str())).collect(),
            ..self.clone()
        };
        self.loosely_matches(&probe)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Canonical form of a type name for relaxed comparison: namespace qualifiers,
/// generic arguments, nullable/array markers and by-ref keywords are dropped and
/// keyword aliases are mapped to their CLR names.
pub fn normalize_type(ty: &str) -> String {
    let mut t = ty.trim();
    for kw in ["ref ", "out ", "in ", "params ", "this ", "readonly ", "scoped "] {
        if let Some(rest) = t.strip_prefix(kw) {
            t = rest.trim_start();
        }
    }
    let t = match t.find('<') {
        Some(idx) => &t[..idx],
        None => t,
    };
    let t = t.trim_end_matches(|c: char| c == '?' || c == ']' || c == '[' || c == '*');
    let t = t.rsplit(|c: char| c == '.' || c == ':').next().unwrap_or(t).trim();
    let canonical = match t {
        "int" => "Int32",
        "uint" => "UInt32",
        "long" => "Int64",
        "ulong" => "UInt64",
        "short" => "Int16",
        "ushort" => "UInt16",
        "byte" => "Byte",
        "sbyte" => "SByte",
        "bool" => "Boolean",
        "string" => "String",
        "char" => "Char",
        "double" => "Double",
        "float" => "Single",
        "decimal" => "Decimal",
        "object" => "Object",
        "void" => "Void",
        other => other,
    };
    canonical.to_string()
}

/// Relaxed type compatibility used by loose signature matching.
pub fn types_compatible(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize_type(a), normalize_type(b));
    let wildcard = |t: &str| matches!(t, "" | "var" | "Object" | "dynamic");
    wildcard(&na) || wildcard(&nb) || na == nb
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Record,
    Enum,
}

impl TypeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Record => "record",
            Self::Enum => "enum",
        }
    }
}

/// What a symbol is, with the payload that kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolKind {
    Type { type_kind: TypeKind, bases: Vec<String> },
    Method(MethodSignature),
    Property { ty: String },
    Field { ty: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    Type,
    Method,
    Property,
    Field,
}

impl KindFilter {
    pub fn admits(&self, kind: &SymbolKind) -> bool {
        matches!(
            (self, kind),
            (Self::Type, SymbolKind::Type { .. })
                | (Self::Method, SymbolKind::Method(_))
                | (Self::Property, SymbolKind::Property { .. })
                | (Self::Field, SymbolKind::Field { .. })
        )
    }
}

/// Canonical identity of a declared symbol within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHandle {
    /// Unique within a snapshot; overloads get distinct ids.
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub containing_type: Option<String>,
    pub kind: SymbolKind,
    pub location: Location,
}

impl SymbolHandle {
    pub fn method(signature: MethodSignature, namespace: impl Into<String>, location: Location) -> Self {
        let id = signature.display();
        Self {
            id,
            name: signature.name.clone(),
            namespace: namespace.into(),
            containing_type: Some(signature.containing_type.clone()),
            kind: SymbolKind::Method(signature),
            location,
        }
    }

    pub fn type_decl(
        name: impl Into<String>,
        namespace: impl Into<String>,
        type_kind: TypeKind,
        bases: Vec<String>,
        location: Location,
    ) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        let id = if namespace.is_empty() {
            name.clone()
        } else {
            format!("{namespace}.{name}")
        };
        Self {
            id,
            name,
            namespace,
            containing_type: None,
            kind: SymbolKind::Type { type_kind, bases },
            location,
        }
    }

    pub fn signature(&self) -> Option<&MethodSignature> {
        match &self.kind {
            SymbolKind::Method(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn type_kind(&self) -> Option<TypeKind> {
        match &self.kind {
            SymbolKind::Type { type_kind, .. } => Some(*type_kind),
            _ => None,
        }
    }

    /// Traversal key; for routines this is `ContainingType.Name`.
    pub fn key(&self) -> String {
        match &self.kind {
            SymbolKind::Method(sig) => sig.key(),
            _ => match &self.containing_type {
                Some(t) => format!("{t}.{}", self.name),
                None => self.name.clone(),
            },
        }
    }

    /// True when `scope` names this symbol's containing type or namespace.
    /// `None` admits everything.
    pub fn in_scope(&self, scope: Option<&str>) -> bool {
        let Some(scope) = scope.map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        if self.containing_type.as_deref() == Some(scope) {
            return true;
        }
        if let Some(t) = &self.containing_type {
            let qualified = if self.namespace.is_empty() {
                t.clone()
            } else {
                format!("{}.{t}", self.namespace)
            };
            if qualified == scope {
                return true;
            }
        }
        self.namespace == scope || self.namespace.starts_with(&format!("{scope}."))
    }
}
