//! Resolution-tier selection with downward fallback.
//!
//! Semantic answers come from the [`Resolver`]; when the program does not
//! type-check, the syntax tier parses documents in isolation and the text tier
//! scans lines with regexes. Lower tiers trade recall and precision for
//! availability, and say so in the warnings they attach.

pub mod syntax;
pub mod text;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ResolverResult;
use crate::model::{ConfidenceLevel, KindFilter, SymbolHandle, SymbolKind};
use crate::resolver::{Health, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Semantic,
    Syntax,
    Text,
}

impl ResolutionTier {
    pub fn confidence(&self) -> ConfidenceLevel {
        match self {
            Self::Semantic => ConfidenceLevel::High,
            Self::Syntax => ConfidenceLevel::Medium,
            Self::Text => ConfidenceLevel::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Syntax => "syntax",
            Self::Text => "text",
        }
    }

    fn lower(&self) -> Option<Self> {
        match self {
            Self::Semantic => Some(Self::Syntax),
            Self::Syntax => Some(Self::Text),
            Self::Text => None,
        }
    }

    fn caveat(&self) -> Option<&'static str> {
        match self {
            Self::Semantic => None,
            Self::Syntax => Some("syntax-only resolution: cross-file references may be missed"),
            Self::Text => Some("text-based resolution: results may include false positives"),
        }
    }
}

/// Which tier a caller asks for. An explicit tier only ever falls back downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMode {
    #[default]
    Auto,
    Semantic,
    Syntax,
    Text,
}

impl TierMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Some(Self::Auto),
            "semantic" => Some(Self::Semantic),
            "syntax" => Some(Self::Syntax),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    fn start(&self) -> ResolutionTier {
        match self {
            Self::Auto | Self::Semantic => ResolutionTier::Semantic,
            Self::Syntax => ResolutionTier::Syntax,
            Self::Text => ResolutionTier::Text,
        }
    }
}

/// What to look up. `name` may be qualified (`Type.Name`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolQuery {
    pub name: String,
    pub containing_type: Option<String>,
    pub kind: Option<KindFilter>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Parameter types for overload disambiguation.
    pub parameter_types: Option<Vec<String>>,
}

impl SymbolQuery {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::named(name).of_kind(KindFilter::Method)
    }

    pub fn in_type(mut self, ty: impl Into<String>) -> Self {
        self.containing_type = Some(ty.into());
        self
    }

    pub fn of_kind(mut self, kind: KindFilter) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_parameters(mut self, types: Vec<String>) -> Self {
        self.parameter_types = Some(types);
        self
    }

    /// (owner, simple name), folding a qualified `name` and `containing_type`.
    pub fn split_name(&self) -> (Option<String>, String) {
        let name = self.name.trim();
        let (owner, simple) = match name.rsplit_once('.') {
            Some((o, s)) => (Some(o.rsplit('.').next().unwrap_or(o).to_string()), s.to_string()),
            None => (None, name.to_string()),
        };
        (self.containing_type.clone().or(owner), simple)
    }

    fn admits_handle(&self, h: &SymbolHandle) -> bool {
        let (owner, simple) = self.split_name();
        if !simple.is_empty() && h.name != simple {
            return false;
        }
        if let Some(owner) = owner {
            let t = h.containing_type.as_deref().unwrap_or("");
            // Types are their own owner when queried as `Namespace.Type`.
            if t != owner && !(h.type_kind().is_some() && h.namespace.ends_with(&owner)) {
                return false;
            }
        }
        if let Some(k) = self.kind {
            if !k.admits(&h.kind) {
                return false;
            }
        }
        match (&self.parameter_types, h.signature()) {
            (Some(types), Some(sig)) => sig.matches_parameter_types(types),
            _ => true,
        }
    }

    fn admits_label(&self, m: &SymbolMatch) -> bool {
        let (owner, simple) = self.split_name();
        if m.name != simple {
            return false;
        }
        if let Some(owner) = owner {
            if m.containing_type.as_deref() != Some(owner.as_str()) && !m.is_type() {
                return false;
            }
        }
        match self.kind {
            Some(KindFilter::Type) => m.is_type(),
            Some(KindFilter::Method) => m.kind == "method",
            Some(KindFilter::Property) => m.kind == "property",
            Some(KindFilter::Field) => m.kind == "field",
            None => true,
        }
    }
}

/// A declaration found by some tier. Only the semantic tier attaches a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub name: String,
    /// `class`, `interface`, `method`, `property`, ...
    pub kind: String,
    pub containing_type: Option<String>,
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<SymbolHandle>,
}

impl SymbolMatch {
    pub fn from_handle(h: &SymbolHandle) -> Self {
        let kind = match &h.kind {
            SymbolKind::Type { type_kind, .. } => type_kind.keyword(),
            SymbolKind::Method(_) => "method",
            SymbolKind::Property { .. } => "property",
            SymbolKind::Field { .. } => "field",
        };
        Self {
            name: h.name.clone(),
            kind: kind.to_string(),
            containing_type: h.containing_type.clone(),
            file: h.location.file.clone(),
            line: h.location.line,
            column: h.location.column,
            handle: Some(h.clone()),
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind.as_str(), "class" | "interface" | "struct" | "record" | "enum")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub success: bool,
    pub matches: Vec<SymbolMatch>,
    pub tier_used: Option<ResolutionTier>,
    pub confidence: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        self.success && !self.matches.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &SymbolHandle> {
        self.matches.iter().filter_map(|m| m.handle.as_ref())
    }
}

pub struct TierSelector<'a> {
    resolver: &'a dyn Resolver,
    mode: TierMode,
}

impl<'a> TierSelector<'a> {
    pub fn new(resolver: &'a dyn Resolver, mode: TierMode) -> Self {
        Self { resolver, mode }
    }

    pub fn mode(&self) -> TierMode {
        self.mode
    }

    fn available(tier: ResolutionTier, health: &Health) -> bool {
        match tier {
            ResolutionTier::Semantic => health.compile_error_count == 0,
            ResolutionTier::Syntax => health.parseable_files >= 1,
            ResolutionTier::Text => true,
        }
    }

    /// The tier a query would start at given current health.
    pub fn select(&self) -> ResolutionTier {
        let health = self.resolver.health();
        let mut tier = self.mode.start();
        while !Self::available(tier, &health) {
            match tier.lower() {
                Some(next) => tier = next,
                None => break,
            }
        }
        tier
    }

    pub fn resolve(&self, query: &SymbolQuery) -> Resolution {
        let health = self.resolver.health();
        let mut warnings = Vec::new();
        let mut first_empty: Option<ResolutionTier> = None;
        let mut tier = Some(self.mode.start());

        while let Some(t) = tier {
            tier = t.lower();
            if !Self::available(t, &health) {
                if t == ResolutionTier::Semantic {
                    warnings.push(format!(
                        "degraded resolution: semantic model unavailable ({} compile errors)",
                        health.compile_error_count
                    ));
                } else {
                    debug!(tier = t.label(), "tier unavailable");
                }
                continue;
            }
            match self.run(t, query) {
                Ok(matches) if !matches.is_empty() => {
                    warnings.extend(t.caveat().map(str::to_string));
                    return Resolution {
                        success: true,
                        matches,
                        tier_used: Some(t),
                        confidence: t.confidence(),
                        warnings,
                    };
                }
                Ok(_) => {
                    debug!(tier = t.label(), name = %query.name, "no matches; trying lower tier");
                    first_empty.get_or_insert(t);
                }
                Err(e) => {
                    warn!(tier = t.label(), error = %e, "resolution tier failed; falling back");
                    warnings.push(format!("{} tier failed: {e}", t.label()));
                }
            }
        }

        Resolution {
            success: first_empty.is_some(),
            matches: Vec::new(),
            tier_used: first_empty,
            confidence: first_empty.map(|t| t.confidence()).unwrap_or(ConfidenceLevel::Low),
            warnings,
        }
    }

    fn run(&self, tier: ResolutionTier, query: &SymbolQuery) -> ResolverResult<Vec<SymbolMatch>> {
        match tier {
            ResolutionTier::Semantic => self.semantic(query),
            ResolutionTier::Syntax => {
                let found = syntax::find_declarations(&self.resolver.sources(), query)?;
                Ok(found.into_iter().filter(|m| query.admits_label(m)).collect())
            }
            ResolutionTier::Text => {
                let found = text::find_declarations(&self.resolver.sources())?;
                Ok(found.into_iter().filter(|m| query.admits_label(m)).collect())
            }
        }
    }

    fn semantic(&self, query: &SymbolQuery) -> ResolverResult<Vec<SymbolMatch>> {
        let handles = match (&query.file, query.line) {
            (Some(file), Some(line)) => self
                .resolver
                .symbol_at_location(file, line, query.column.unwrap_or(1))?
                .into_iter()
                .collect(),
            _ => self.resolver.find_symbols_by_name(&query.name, query.kind)?,
        };
        Ok(handles
            .iter()
            .filter(|h| query.admits_handle(h))
            .map(SymbolMatch::from_handle)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryResolver;

    fn corpus() -> MemoryResolver {
        MemoryResolver::builder()
            .method("Billing", "Charge", &[])
            .source("src/Billing.cs", "public class Billing\n{\n    public void Charge() { }\n}\n")
            .build()
    }

    #[test]
    fn healthy_workspace_resolves_semantically() {
        let r = corpus();
        let res = TierSelector::new(&r, TierMode::Auto).resolve(&SymbolQuery::method("Charge"));
        assert!(res.is_found());
        assert_eq!(res.tier_used, Some(ResolutionTier::Semantic));
        assert_eq!(res.confidence, ConfidenceLevel::High);
        assert!(res.warnings.is_empty());
        assert!(res.matches[0].handle.is_some());
    }

    #[test]
    fn compile_errors_degrade_to_syntax_with_warning() {
        let r = corpus().with_compile_errors(3);
        let res = TierSelector::new(&r, TierMode::Auto).resolve(&SymbolQuery::method("Charge"));
        assert!(res.is_found());
        assert_eq!(res.tier_used, Some(ResolutionTier::Syntax));
        assert_eq!(res.confidence, ConfidenceLevel::Medium);
        assert!(res.warnings.iter().any(|w| w.contains("3 compile errors")));
        assert!(res.warnings.iter().any(|w| w.contains("cross-file")));
        assert!(res.matches[0].handle.is_none());
    }

    #[test]
    fn failing_semantic_tier_falls_back_with_warning() {
        let r = corpus().failing_semantic();
        let res = TierSelector::new(&r, TierMode::Semantic).resolve(&SymbolQuery::method("Charge"));
        assert!(res.is_found());
        assert_eq!(res.tier_used, Some(ResolutionTier::Syntax));
        assert!(res.warnings.iter().any(|w| w.starts_with("semantic tier failed")));
    }

    #[test]
    fn explicit_text_tier_never_goes_up() {
        let r = corpus();
        let res = TierSelector::new(&r, TierMode::Text).resolve(&SymbolQuery::method("Charge"));
        assert_eq!(res.tier_used, Some(ResolutionTier::Text));
        assert_eq!(res.confidence, ConfidenceLevel::Low);
        assert!(res.warnings.iter().any(|w| w.contains("false positives")));
    }

    #[test]
    fn missing_everywhere_is_a_successful_empty_resolution() {
        let r = corpus();
        let res = TierSelector::new(&r, TierMode::Auto).resolve(&SymbolQuery::method("Refund"));
        assert!(res.success);
        assert!(!res.is_found());
        assert_eq!(res.tier_used, Some(ResolutionTier::Semantic));
    }

    #[test]
    fn every_tier_failing_reports_failure() {
        // No documents: the syntax tier is unavailable and the text tier has nothing to scan.
        let r = MemoryResolver::builder()
            .method("Billing", "Charge", &[])
            .build()
            .failing_semantic();
        let res = TierSelector::new(&r, TierMode::Auto).resolve(&SymbolQuery::method("Charge"));
        assert!(!res.success);
        assert!(res.matches.is_empty());
        assert!(!res.warnings.is_empty());
    }

    #[test]
    fn qualified_names_and_owner_filters() {
        let q = SymbolQuery::method("Shop.Billing.Charge");
        assert_eq!(q.split_name(), (Some("Billing".to_string()), "Charge".to_string()));
        let q = SymbolQuery::method("Charge").in_type("Billing");
        assert_eq!(q.split_name(), (Some("Billing".to_string()), "Charge".to_string()));

        let r = corpus();
        let res = TierSelector::new(&r, TierMode::Auto)
            .resolve(&SymbolQuery::method("Charge").in_type("Invoice"));
        assert!(!res.is_found());
    }
}
