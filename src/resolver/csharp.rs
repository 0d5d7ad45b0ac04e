//! Per-document C# extraction with tree-sitter.
//!
//! One parse yields everything the snapshot needs from a file: type, routine and
//! member declarations, the raw (unresolved) calls inside each routine body, and
//! a syntax error count. Cross-file resolution happens later in
//! [`ProgramSnapshot`](super::ProgramSnapshot); nothing here looks past the file.

use serde::Serialize;
use tree_sitter::{Language, Node, Parser};

use crate::error::{ResolverError, ResolverResult};
use crate::model::{
    Accessibility, Location, MethodSignature, Modifiers, Parameter, RefKind, TypeKind,
};

const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "virtual", "abstract", "override",
    "async", "sealed", "extern", "unsafe", "new", "partial", "readonly", "volatile", "const",
    "required", "file",
];

#[derive(Debug, Clone, Serialize)]
pub struct TypeDecl {
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub bases: Vec<String>,
    pub containing_type: Option<String>,
    pub location: Location,
}

/// A call or method-group reference as written, before resolution.
#[derive(Debug, Clone, Serialize)]
pub struct RawCall {
    pub name: String,
    /// Receiver text (`repo`, `this`, `base`, `Factory`), if any.
    pub receiver: Option<String>,
    pub arg_count: usize,
    pub location: Location,
    pub expression: String,
    /// `new T(...)`; `name` holds the type.
    pub is_constructor: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    pub signature: MethodSignature,
    pub namespace: String,
    /// Position of the routine's name.
    pub location: Location,
    pub start_line: u32,
    pub end_line: u32,
    pub is_constructor: bool,
    pub has_body: bool,
    pub calls: Vec<RawCall>,
    pub method_groups: Vec<RawCall>,
    /// Declared local variables as (name, type).
    pub locals: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDecl {
    pub name: String,
    pub containing_type: String,
    pub namespace: String,
    pub ty: String,
    pub is_property: bool,
    pub location: Location,
}

/// Everything extracted from one document. This is the per-document artifact
/// held by the result cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileIndex {
    pub path: String,
    pub types: Vec<TypeDecl>,
    pub methods: Vec<MethodDecl>,
    pub members: Vec<MemberDecl>,
    pub syntax_errors: usize,
}

impl FileIndex {
    pub fn is_parseable(&self) -> bool {
        self.syntax_errors == 0
    }
}

pub fn language() -> Language {
    tree_sitter_c_sharp::LANGUAGE.into()
}

pub fn is_csharp_path(path: &str) -> bool {
    path.rsplit('.')
        .next()
        .map(|ext| ext.eq_ignore_ascii_case("cs"))
        .unwrap_or(false)
}

/// Parse one document and extract its declarations and raw calls.
pub fn parse_file(path: &str, text: &str) -> ResolverResult<FileIndex> {
    let mut parser = Parser::new();
    parser
        .set_language(&language())
        .map_err(|e| ResolverError::Parse {
            path: path.to_string(),
            reason: format!("failed to set tree-sitter language: {e}"),
        })?;
    let tree = parser.parse(text, None).ok_or_else(|| ResolverError::Parse {
        path: path.to_string(),
        reason: "tree-sitter returned no tree".to_string(),
    })?;
    let root = tree.root_node();

    let mut ex = Extractor {
        path,
        source: text.as_bytes(),
        index: FileIndex {
            path: path.to_string(),
            ..FileIndex::default()
        },
    };
    ex.index.syntax_errors = if root.has_error() { count_syntax_errors(root) } else { 0 };
    let mut type_stack: Vec<(String, TypeKind)> = Vec::new();
    ex.walk_children(root, "", &mut type_stack);
    Ok(ex.index)
}

fn count_syntax_errors(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return 1;
    }
    if !node.has_error() {
        return 0;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).map(count_syntax_errors).sum()
}

fn node_text<'a>(source: &'a [u8], node: Node) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// Collapse whitespace runs so multi-line expressions fit on one line.
fn one_line(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 200 {
        let cut: String = collapsed.chars().take(197).collect();
        format!("{cut}...")
    } else {
        collapsed
    }
}

fn is_identifier(s: &str) -> bool {
    let s = s.strip_prefix('@').unwrap_or(s);
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Simple type name: no namespace, no generic arguments, no nullable marker.
pub fn simple_type_name(ty: &str) -> String {
    let t = ty.trim();
    let t = t.split('(').next().unwrap_or(t);
    let t = match t.find('<') {
        Some(idx) => &t[..idx],
        None => t,
    };
    let t = t.trim_end_matches(|c: char| c == '?' || c == '[' || c == ']');
    t.rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(t)
        .trim()
        .to_string()
}

/// Split a call target such as `this.repo?.Save<T>` into (`this.repo`, `Save`).
fn split_call_target(text: &str) -> Option<(Option<String>, String)> {
    let flat = one_line(text).replace("?.", ".").replace(' ', "");
    let (receiver, last) = match flat.rsplit_once('.') {
        Some((r, l)) => (Some(r.to_string()), l.to_string()),
        None => (None, flat.clone()),
    };
    let last = match last.find('<') {
        Some(idx) => last[..idx].to_string(),
        None => last,
    };
    let last = last.rsplit("::").next().unwrap_or(&last).to_string();
    if !is_identifier(&last) {
        return None;
    }
    let receiver = receiver.filter(|r| !r.is_empty());
    Some((receiver, last.trim_start_matches('@').to_string()))
}

struct Extractor<'a> {
    path: &'a str,
    source: &'a [u8],
    index: FileIndex,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node) -> &'a str {
        node_text(self.source, node)
    }

    fn location(&self, node: Node) -> Location {
        let p = node.start_position();
        Location::new(self.path, p.row as u32 + 1, p.column as u32 + 1)
    }

    fn walk_children(&mut self, node: Node, namespace: &str, type_stack: &mut Vec<(String, TypeKind)>) {
        // A file-scoped namespace applies to the declarations after it, whether the
        // grammar nests them under the namespace node or leaves them as siblings.
        let mut current_ns = namespace.to_string();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "file_scoped_namespace_declaration" {
                if let Some(name) = child.child_by_field_name("name") {
                    current_ns = join_namespace(namespace, self.text(name));
                }
                self.walk_children(child, &current_ns, type_stack);
                continue;
            }
            self.walk(child, &current_ns, type_stack);
        }
    }

    fn walk(&mut self, node: Node, namespace: &str, type_stack: &mut Vec<(String, TypeKind)>) {
        match node.kind() {
            "namespace_declaration" => {
                let ns = match node.child_by_field_name("name") {
                    Some(name) => join_namespace(namespace, self.text(name)),
                    None => namespace.to_string(),
                };
                self.walk_children(node, &ns, type_stack);
            }
            "class_declaration" | "struct_declaration" | "interface_declaration"
            | "record_declaration" | "record_struct_declaration" | "enum_declaration" => {
                let kind = match node.kind() {
                    "struct_declaration" => TypeKind::Struct,
                    "interface_declaration" => TypeKind::Interface,
                    "record_declaration" | "record_struct_declaration" => TypeKind::Record,
                    "enum_declaration" => TypeKind::Enum,
                    _ => TypeKind::Class,
                };
                let Some(name_node) = node.child_by_field_name("name") else {
                    self.walk_children(node, namespace, type_stack);
                    return;
                };
                let name = self.text(name_node).to_string();
                let bases = self.base_types(node);
                self.index.types.push(TypeDecl {
                    name: name.clone(),
                    namespace: namespace.to_string(),
                    kind,
                    bases,
                    containing_type: type_stack.last().map(|(t, _)| t.clone()),
                    location: self.location(name_node),
                });
                type_stack.push((name, kind));
                self.walk_children(node, namespace, type_stack);
                type_stack.pop();
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some((containing, kind)) = type_stack.last().cloned() {
                    self.method(node, namespace, &containing, kind);
                }
            }
            "property_declaration" | "field_declaration" | "event_field_declaration" => {
                if let Some((containing, _)) = type_stack.last().cloned() {
                    self.member(node, namespace, &containing);
                }
            }
            "comment" => {}
            _ => self.walk_children(node, namespace, type_stack),
        }
    }

    fn base_types(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "base_list" {
                continue;
            }
            let mut c2 = child.walk();
            for base in child.named_children(&mut c2) {
                let name = simple_type_name(self.text(base));
                if !name.is_empty() {
                    out.push(name);
                }
            }
        }
        out
    }

    fn modifiers(&self, node: Node) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "modifier" {
                out.push(self.text(child).trim());
            } else if !child.is_named() && MODIFIER_KEYWORDS.contains(&child.kind()) {
                out.push(self.text(child));
            }
        }
        out
    }

    fn parameters(&self, list: Node) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut cursor = list.walk();
        for p in list.named_children(&mut cursor) {
            if !matches!(p.kind(), "parameter" | "parameter_array") {
                continue;
            }
            out.push(self.parameter(p));
        }
        out
    }

    fn parameter(&self, node: Node) -> Parameter {
        let text = one_line(self.text(node));
        // Attributes never affect the signature.
        let without_attrs = match text.rfind(']') {
            Some(idx) if text.starts_with('[') => text[idx + 1..].trim().to_string(),
            _ => text.clone(),
        };
        let (decl, optional) = match without_attrs.split_once('=') {
            Some((d, _)) => (d.trim().to_string(), true),
            None => (without_attrs.trim().to_string(), false),
        };
        let mut tokens: Vec<&str> = decl.split(' ').filter(|t| !t.is_empty()).collect();

        let mut ref_kind = if node.kind() == "parameter_array" { RefKind::Params } else { RefKind::None };
        while let Some(first) = tokens.first() {
            match RefKind::from_keyword(first) {
                Some(k) => {
                    if ref_kind == RefKind::None {
                        ref_kind = k;
                    }
                    tokens.remove(0);
                }
                None if matches!(*first, "scoped" | "readonly") => {
                    tokens.remove(0);
                }
                None => break,
            }
        }

        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .or_else(|| tokens.last().map(|t| t.to_string()))
            .unwrap_or_default();
        let ty = node
            .child_by_field_name("type")
            .map(|n| one_line(self.text(n)))
            .unwrap_or_else(|| {
                if tokens.len() > 1 {
                    tokens[..tokens.len() - 1].join(" ")
                } else {
                    String::new()
                }
            });

        Parameter {
            name,
            ty,
            optional,
            ref_kind,
        }
    }

    fn method(&mut self, node: Node, namespace: &str, containing: &str, containing_kind: TypeKind) {
        let is_constructor = node.kind() == "constructor_declaration";
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = self.text(name_node).to_string();

        let mods = self.modifiers(node);
        let parameters = {
            let mut cursor = node.walk();
            let list = node
                .child_by_field_name("parameters")
                .or_else(|| node.children(&mut cursor).find(|c| c.kind() == "parameter_list"));
            list.map(|l| self.parameters(l)).unwrap_or_default()
        };

        let body = {
            let mut cursor = node.walk();
            node.child_by_field_name("body").or_else(|| {
                node.children(&mut cursor)
                    .find(|c| matches!(c.kind(), "block" | "arrow_expression_clause"))
            })
        };

        let return_type = if is_constructor {
            containing.to_string()
        } else {
            node.child_by_field_name("returns")
                .or_else(|| node.child_by_field_name("type"))
                .map(|t| one_line(self.text(t)))
                .unwrap_or_else(|| "void".to_string())
        };

        let interface_member = containing_kind == TypeKind::Interface;
        let modifiers = Modifiers {
            is_static: mods.contains(&"static"),
            is_virtual: mods.contains(&"virtual"),
            // Interface members without a default body dispatch like abstract ones.
            is_abstract: mods.contains(&"abstract") || (interface_member && body.is_none()),
            is_override: mods.contains(&"override"),
            is_extension: parameters.first().map(|p| p.ref_kind == RefKind::This).unwrap_or(false),
            is_async: mods.contains(&"async"),
        };
        let accessibility = if interface_member && mods.is_empty() {
            Accessibility::Public
        } else {
            Accessibility::from_modifiers(mods.iter().copied())
        };

        let signature = MethodSignature {
            name,
            containing_type: containing.to_string(),
            return_type,
            parameters,
            accessibility,
            modifiers,
        };

        let mut decl = MethodDecl {
            signature,
            namespace: namespace.to_string(),
            location: self.location(name_node),
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            is_constructor,
            has_body: body.is_some(),
            calls: Vec::new(),
            method_groups: Vec::new(),
            locals: Vec::new(),
        };
        if let Some(body) = body {
            self.scan_body(body, &mut decl);
        }
        self.index.methods.push(decl);
    }

    fn member(&mut self, node: Node, namespace: &str, containing: &str) {
        if node.kind() == "property_declaration" {
            let (Some(name), ty) = (node.child_by_field_name("name"), node.child_by_field_name("type")) else {
                return;
            };
            self.index.members.push(MemberDecl {
                name: self.text(name).to_string(),
                containing_type: containing.to_string(),
                namespace: namespace.to_string(),
                ty: ty.map(|t| one_line(self.text(t))).unwrap_or_default(),
                is_property: true,
                location: self.location(name),
            });
            return;
        }

        let mut cursor = node.walk();
        let Some(decl) = node.children(&mut cursor).find(|c| c.kind() == "variable_declaration") else {
            return;
        };
        let ty = self.declaration_type(decl);
        for (name, loc) in self.declarators(decl) {
            self.index.members.push(MemberDecl {
                name,
                containing_type: containing.to_string(),
                namespace: namespace.to_string(),
                ty: ty.clone(),
                is_property: false,
                location: loc,
            });
        }
    }

    fn declaration_type(&self, decl: Node) -> String {
        decl.child_by_field_name("type")
            .or_else(|| decl.named_child(0))
            .map(|t| one_line(self.text(t)))
            .unwrap_or_default()
    }

    fn declarators(&self, decl: Node) -> Vec<(String, Location)> {
        let mut out = Vec::new();
        let mut cursor = decl.walk();
        for d in decl.named_children(&mut cursor) {
            if d.kind() != "variable_declarator" {
                continue;
            }
            let name_node = d.child_by_field_name("name").or_else(|| {
                let mut c2 = d.walk();
                let found = d.named_children(&mut c2).find(|c| c.kind() == "identifier");
                found
            });
            if let Some(n) = name_node {
                out.push((self.text(n).to_string(), self.location(n)));
            }
        }
        out
    }

    fn scan_body(&self, node: Node, decl: &mut MethodDecl) {
        match node.kind() {
            "comment" | "string_literal" | "verbatim_string_literal" | "raw_string_literal"
            | "interpolated_string_expression" | "character_literal" => return,
            "invocation_expression" => self.invocation(node, decl),
            "object_creation_expression" => self.object_creation(node, decl),
            "variable_declaration" => self.local_declaration(node, decl),
            "argument" => {
                if node.named_child_count() == 1 {
                    if let Some(only) = node.named_child(0).filter(|c| c.kind() == "identifier") {
                        decl.method_groups.push(self.method_group(only));
                    }
                }
            }
            "assignment_expression" => {
                let text = self.text(node);
                if text.contains("+=") || text.contains("-=") {
                    if let Some(right) = node.child_by_field_name("right").filter(|r| r.kind() == "identifier") {
                        decl.method_groups.push(self.method_group(right));
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.scan_body(child, decl);
        }
    }

    fn method_group(&self, ident: Node) -> RawCall {
        RawCall {
            name: self.text(ident).to_string(),
            receiver: None,
            arg_count: 0,
            location: self.location(ident),
            expression: self.text(ident).to_string(),
            is_constructor: false,
        }
    }

    fn argument_count(&self, node: Node) -> usize {
        let args = node.child_by_field_name("arguments").or_else(|| {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).find(|c| c.kind() == "argument_list");
            found
        });
        args.map(|a| {
            let mut cursor = a.walk();
            let n = a.named_children(&mut cursor).filter(|c| c.kind() == "argument").count();
            n
        })
        .unwrap_or(0)
    }

    fn invocation(&self, node: Node, decl: &mut MethodDecl) {
        let Some(function) = node.child_by_field_name("function").or_else(|| node.named_child(0)) else {
            return;
        };
        let Some((receiver, name)) = split_call_target(self.text(function)) else { return };
        // `nameof(x)` is a compile-time operator, not a call.
        if name == "nameof" && receiver.is_none() {
            return;
        }
        let name_node = if function.kind() == "member_access_expression" {
            function.child_by_field_name("name").unwrap_or(function)
        } else {
            function
        };
        decl.calls.push(RawCall {
            name,
            receiver,
            arg_count: self.argument_count(node),
            location: self.location(name_node),
            expression: one_line(self.text(node)),
            is_constructor: false,
        });
    }

    fn object_creation(&self, node: Node, decl: &mut MethodDecl) {
        let Some(ty) = node.child_by_field_name("type") else { return };
        let name = simple_type_name(self.text(ty));
        if !is_identifier(&name) {
            return;
        }
        decl.calls.push(RawCall {
            name,
            receiver: None,
            arg_count: self.argument_count(node),
            location: self.location(ty),
            expression: one_line(self.text(node)),
            is_constructor: true,
        });
    }

    fn local_declaration(&self, node: Node, decl: &mut MethodDecl) {
        let declared = self.declaration_type(node);
        let mut cursor = node.walk();
        for d in node.named_children(&mut cursor) {
            if d.kind() != "variable_declarator" {
                continue;
            }
            let name = d
                .child_by_field_name("name")
                .or_else(|| d.named_child(0))
                .map(|n| self.text(n).to_string())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let ty = if declared == "var" {
                find_descendant(d, "object_creation_expression")
                    .and_then(|oc| oc.child_by_field_name("type"))
                    .map(|t| one_line(self.text(t)))
                    .unwrap_or_else(|| declared.clone())
            } else {
                declared.clone()
            };
            decl.locals.push((name, ty));
        }
    }
}

fn find_descendant<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(|c| find_descendant(c, kind))
}

fn join_namespace(outer: &str, inner: &str) -> String {
    let inner = inner.split_whitespace().collect::<String>();
    if outer.is_empty() {
        inner
    } else {
        format!("{outer}.{inner}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = r#"
using System;

namespace Shop.Orders
{
    public interface IRepository
    {
        void Save(Order order);
    }

    public class Order { }

    public class OrderService : BaseService, IDisposable
    {
        private readonly IRepository repo;

        public OrderService(IRepository repo)
        {
            this.repo = repo;
        }

        public virtual async Task Place(Order order, bool notify = false)
        {
            Validate(order);
            repo.Save(order);
            var audit = new AuditLog();
            audit.Write("placed");
        }

        private static void Validate(Order order) { }

        public void Dispose() { }
    }
}
"#;

    fn method<'a>(idx: &'a FileIndex, name: &str) -> &'a MethodDecl {
        idx.methods
            .iter()
            .find(|m| m.signature.name == name)
            .unwrap_or_else(|| panic!("method {name} not extracted"))
    }

    #[test]
    fn extracts_types_with_namespace_and_bases() {
        let idx = parse_file("src/Orders.cs", ORDERS).unwrap();
        assert_eq!(idx.syntax_errors, 0);
        let svc = idx.types.iter().find(|t| t.name == "OrderService").unwrap();
        assert_eq!(svc.namespace, "Shop.Orders");
        assert_eq!(svc.kind, TypeKind::Class);
        assert_eq!(svc.bases, vec!["BaseService".to_string(), "IDisposable".to_string()]);
        let repo = idx.types.iter().find(|t| t.name == "IRepository").unwrap();
        assert_eq!(repo.kind, TypeKind::Interface);
    }

    #[test]
    fn extracts_signatures_and_modifiers() {
        let idx = parse_file("src/Orders.cs", ORDERS).unwrap();
        let place = method(&idx, "Place");
        assert_eq!(place.signature.containing_type, "OrderService");
        assert_eq!(place.signature.accessibility, Accessibility::Public);
        assert!(place.signature.modifiers.is_virtual);
        assert!(place.signature.modifiers.is_async);
        assert_eq!(place.signature.parameters.len(), 2);
        assert_eq!(place.signature.parameters[0].ty, "Order");
        assert!(place.signature.parameters[1].optional);

        let validate = method(&idx, "Validate");
        assert!(validate.signature.modifiers.is_static);
        assert_eq!(validate.signature.accessibility, Accessibility::Private);

        let save = method(&idx, "Save");
        assert!(save.signature.modifiers.is_abstract, "interface member without body");
        assert!(!save.has_body);

        let ctor = idx.methods.iter().find(|m| m.is_constructor).unwrap();
        assert_eq!(ctor.signature.name, "OrderService");
    }

    #[test]
    fn collects_raw_calls_and_locals() {
        let idx = parse_file("src/Orders.cs", ORDERS).unwrap();
        let place = method(&idx, "Place");
        let names: Vec<&str> = place.calls.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Validate"));
        assert!(names.contains(&"Save"));
        assert!(names.contains(&"AuditLog"), "object creation recorded: {names:?}");
        assert!(names.contains(&"Write"));

        let save = place.calls.iter().find(|c| c.name == "Save").unwrap();
        assert_eq!(save.receiver.as_deref(), Some("repo"));
        assert_eq!(save.arg_count, 1);

        let validate = place.calls.iter().find(|c| c.name == "Validate").unwrap();
        assert_eq!(validate.receiver, None);

        assert!(place
            .locals
            .iter()
            .any(|(n, t)| n == "audit" && t == "AuditLog"));
    }

    #[test]
    fn members_are_recorded() {
        let idx = parse_file("src/Orders.cs", ORDERS).unwrap();
        let repo = idx.members.iter().find(|m| m.name == "repo").unwrap();
        assert_eq!(repo.ty, "IRepository");
        assert!(!repo.is_property);
    }

    #[test]
    fn broken_source_reports_syntax_errors() {
        let idx = parse_file("src/Broken.cs", "class A { void B( { }").unwrap();
        assert!(idx.syntax_errors > 0);
        assert!(!idx.is_parseable());
    }

    #[test]
    fn call_target_splitting() {
        assert_eq!(
            split_call_target("this.repo?.Save<Order>"),
            Some((Some("this.repo".to_string()), "Save".to_string()))
        );
        assert_eq!(split_call_target("Run"), Some((None, "Run".to_string())));
        assert_eq!(split_call_target("items[0]"), None);
        assert_eq!(simple_type_name("System.Collections.Generic.List<int>"), "List");
        assert_eq!(simple_type_name("Base(name)"), "Base");
    }
}
