//! Who calls a routine, and how.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::model::{
    CallPatternAnalysis, CallPatternGroup, CallSite, CallType, CallerResult, ConfidenceLevel,
    KindFilter, MethodSignature, SymbolHandle, TestOnlyMethod, TypeKind,
};
use crate::resolver::{Invocation, ReferenceLocation, Resolver};
use crate::tiers::{ResolutionTier, SymbolQuery, TierMode, TierSelector};

/// A target routine pinned to one declaration.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub handle: SymbolHandle,
    pub signature: MethodSignature,
    pub tier: ResolutionTier,
    pub warnings: Vec<String>,
}

/// Test-path heuristic built from glob patterns, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct TestPathMatcher {
    patterns: Vec<Pattern>,
}

impl TestPathMatcher {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "ignoring invalid test path pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_test_path(&self, path: &str) -> bool {
        let opts = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        let path = path.replace('\\', "/");
        self.patterns.iter().any(|p| p.matches_with(&path, opts))
    }
}

impl Default for TestPathMatcher {
    fn default() -> Self {
        Self::new(&crate::config::TestPathConfig::default().patterns)
    }
}

struct ContextPatterns {
    looping: Regex,
    asynchronous: Regex,
    exception: Regex,
}

fn context_patterns() -> &'static ContextPatterns {
    static RE: OnceLock<ContextPatterns> = OnceLock::new();
    RE.get_or_init(|| ContextPatterns {
        looping: Regex::new(r"\b(for|foreach|while|do)\b").unwrap(),
        asynchronous: Regex::new(r"\b(await|async)\b").unwrap(),
        exception: Regex::new(r"\b(try|catch|finally)\b").unwrap(),
    })
}

/// Receiver kind, callee name and argument count, e.g. `instance.Save(1)`.
pub fn expression_shape(expression: &str) -> String {
    let expr = expression.trim();
    let Some(open) = expr.find('(') else {
        let name = expr.rsplit('.').next().unwrap_or(expr);
        return format!("{name} (method group)");
    };
    let callee = expr[..open].trim();
    let callee = callee.strip_prefix("new ").map(str::trim).unwrap_or(callee);
    let (receiver, name) = match callee.rsplit_once('.') {
        Some((r, n)) => (Some(r.trim_end_matches('?')), n),
        None => (None, callee),
    };
    let name = name.split('<').next().unwrap_or(name);

    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut any_arg = false;
    for c in expr[open + 1..].chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => break,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => commas += 1,
            c if !c.is_whitespace() => any_arg = true,
            _ => {}
        }
    }
    let args = if any_arg || commas > 0 { commas + 1 } else { 0 };

    let prefix = match receiver {
        None => String::new(),
        Some("this") => "this.".to_string(),
        Some("base") => "base.".to_string(),
        Some(r) if r.chars().next().map(char::is_uppercase).unwrap_or(false) && !r.contains('(') => {
            "Type.".to_string()
        }
        Some(_) => "instance.".to_string(),
    };
    format!("{prefix}{name}({args})")
}

pub struct CallerResolver<'a> {
    resolver: &'a dyn Resolver,
    tiers: TierSelector<'a>,
}

impl<'a> CallerResolver<'a> {
    pub fn new(resolver: &'a dyn Resolver, mode: TierMode) -> Self {
        Self {
            resolver,
            tiers: TierSelector::new(resolver, mode),
        }
    }

    pub fn resolver(&self) -> &'a dyn Resolver {
        self.resolver
    }

    /// Resolve a routine query to one declaration. Matches from lower tiers carry
    /// no handle and are promoted by position.
    pub fn resolve_target(&self, query: &SymbolQuery) -> Option<ResolvedTarget> {
        let mut query = query.clone();
        query.kind = Some(KindFilter::Method);
        let resolution = self.tiers.resolve(&query);
        let tier = resolution.tier_used?;
        let (_, simple) = query.split_name();

        let mut candidates: Vec<SymbolHandle> = Vec::new();
        for m in &resolution.matches {
            let handle = match &m.handle {
                Some(h) => Some(h.clone()),
                None => match self.resolver.symbol_at_location(&m.file, m.line, m.column) {
                    Ok(h) => h,
                    Err(e) => {
                        debug!(file = %m.file, line = m.line, error = %e, "could not promote match");
                        None
                    }
                },
            };
            let Some(h) = handle else { continue };
            let Some(sig) = h.signature() else { continue };
            if sig.name != simple {
                continue;
            }
            if let Some(types) = &query.parameter_types {
                if !sig.matches_parameter_types(types) {
                    continue;
                }
            }
            if !candidates.iter().any(|c| c.id == h.id) {
                candidates.push(h);
            }
        }

        let mut warnings = resolution.warnings;
        let handle = candidates.first()?.clone();
        let signature = handle.signature()?.clone();
        if candidates.len() > 1 {
            warnings.push(format!(
                "{} declarations match `{}`; using {}. Pass parameter types to choose another.",
                candidates.len(),
                query.name,
                handle.id
            ));
        }
        Some(ResolvedTarget {
            handle,
            signature,
            tier,
            warnings,
        })
    }

    pub fn find_callers(&self, query: &SymbolQuery, include_indirect: bool) -> EngineResult<Option<CallerResult>> {
        let Some(target) = self.resolve_target(query) else {
            return Ok(None);
        };
        let mut callers = self.callers_of(&target.handle, include_indirect, target.tier.confidence())?;
        if !include_indirect {
            callers.retain(|c| c.call_type == CallType::Direct);
            if callers.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(CallerResult {
            target: target.signature,
            target_symbol: target.handle,
            callers,
            tier: target.tier,
            confidence: target.tier.confidence().label().to_string(),
            warnings: target.warnings,
        }))
    }

    pub fn find_direct_callers(&self, query: &SymbolQuery) -> EngineResult<Option<CallerResult>> {
        self.find_callers(query, false)
    }

    /// Call sites of an already resolved routine, confidence capped at `cap`.
    pub fn callers_of(
        &self,
        target: &SymbolHandle,
        include_indirect: bool,
        cap: ConfidenceLevel,
    ) -> EngineResult<Vec<CallSite>> {
        Ok(self
            .caller_edges(target, include_indirect, cap)?
            .into_iter()
            .map(|(_, site)| site)
            .collect())
    }

    /// Like [`Self::callers_of`], keeping the enclosing routine of each site
    /// when the resolver knows it. Chain traversal walks these handles.
    pub fn caller_edges(
        &self,
        target: &SymbolHandle,
        include_indirect: bool,
        cap: ConfidenceLevel,
    ) -> EngineResult<Vec<(Option<SymbolHandle>, CallSite)>> {
        let mut visited = HashSet::new();
        let mut edges = self.collect(target, include_indirect, cap, &mut visited, &[])?;
        let mut seen = HashSet::new();
        edges.retain(|(_, s)| seen.insert((s.file.clone(), s.line, s.column)));
        Ok(edges)
    }

    fn type_kind_of(&self, type_name: &str) -> EngineResult<Option<TypeKind>> {
        Ok(self
            .resolver
            .find_symbols_by_name(type_name, Some(KindFilter::Type))?
            .iter()
            .find(|t| t.name == type_name)
            .and_then(SymbolHandle::type_kind))
    }

    fn collect(
        &self,
        target: &SymbolHandle,
        include_indirect: bool,
        cap: ConfidenceLevel,
        visited: &mut HashSet<String>,
        trail: &[String],
    ) -> EngineResult<Vec<(Option<SymbolHandle>, CallSite)>> {
        if !visited.insert(target.id.clone()) {
            return Ok(vec![]);
        }
        let Some(sig) = target.signature() else {
            return Ok(vec![]);
        };
        let owner = sig.containing_type.clone();
        let interface_member = self.type_kind_of(&owner)? == Some(TypeKind::Interface);
        let dispatched = interface_member || sig.modifiers.is_polymorphic();

        let refs = self.resolver.references(target)?;
        let mut sites: Vec<(Option<SymbolHandle>, CallSite)> = if refs.is_empty() {
            self.scan_invocations(target)?
                .into_iter()
                .map(|(caller, inv)| {
                    let site = site_from_invocation(&caller, &inv);
                    (Some(caller), site)
                })
                .collect()
        } else {
            refs.iter().map(|r| (r.container.clone(), site_from_reference(r))).collect()
        };

        for (_, s) in &mut sites {
            let (call_type, confidence) = match (s.call_type, dispatched) {
                (CallType::Unknown, _) => (CallType::Unknown, ConfidenceLevel::Low),
                (_, true) => (CallType::Indirect, ConfidenceLevel::Medium),
                (_, false) => (CallType::Direct, ConfidenceLevel::High),
            };
            s.call_type = call_type;
            s.confidence = confidence.min(cap);
            s.is_recursive = s.caller_type() == Some(owner.as_str());
            s.call_chain = trail.to_vec();
        }

        if include_indirect && interface_member {
            let iface = self
                .resolver
                .find_symbols_by_name(&owner, Some(KindFilter::Type))?
                .into_iter()
                .find(|t| t.name == owner);
            if let Some(iface) = iface {
                let mut next_trail = trail.to_vec();
                next_trail.push(owner.clone());
                for member in self.implementing_members(&iface, sig)? {
                    for (container, mut s) in self.collect(&member, include_indirect, cap, visited, &next_trail)? {
                        if s.call_type != CallType::Unknown {
                            s.call_type = CallType::Indirect;
                            s.confidence = ConfidenceLevel::Medium.min(cap);
                        }
                        sites.push((container, s));
                    }
                }
            }
        }
        Ok(sites)
    }

    /// Members of `iface`'s implementors that match the interface member `sig`.
    fn implementing_members(&self, iface: &SymbolHandle, sig: &MethodSignature) -> EngineResult<Vec<SymbolHandle>> {
        let shape = MethodSignature {
            containing_type: String::new(),
            ..sig.clone()
        };
        let mut out = Vec::new();
        for implementor in self.resolver.implementations(iface)? {
            let qualified = format!("{}.{}", implementor.name, sig.name);
            for member in self.resolver.find_symbols_by_name(&qualified, Some(KindFilter::Method))? {
                if member.signature().is_some_and(|m| m.loosely_matches(&shape)) {
                    out.push(member);
                }
            }
        }
        Ok(out)
    }

    /// Ids of routines that implement some interface member. Calls through
    /// the interface bind to the interface member, never to these.
    fn interface_implementations(&self, methods: &[SymbolHandle]) -> EngineResult<HashSet<String>> {
        let mut ids = HashSet::new();
        let mut kinds: BTreeMap<String, Option<TypeKind>> = BTreeMap::new();
        for h in methods {
            let Some(sig) = h.signature() else { continue };
            let owner = &sig.containing_type;
            if !kinds.contains_key(owner) {
                kinds.insert(owner.clone(), self.type_kind_of(owner)?);
            }
            if kinds[owner] != Some(TypeKind::Interface) {
                continue;
            }
            let iface = self
                .resolver
                .find_symbols_by_name(owner, Some(KindFilter::Type))?
                .into_iter()
                .find(|t| &t.name == owner);
            if let Some(iface) = iface {
                ids.extend(self.implementing_members(&iface, sig)?.into_iter().map(|m| m.id));
            }
        }
        Ok(ids)
    }

    /// Fallback when the resolver reports no references: walk every routine's
    /// invocations looking for the target.
    fn scan_invocations(&self, target: &SymbolHandle) -> EngineResult<Vec<(SymbolHandle, Invocation)>> {
        let mut out = Vec::new();
        for m in self.resolver.all_methods()? {
            for inv in self.resolver.invocations_within(&m)? {
                if inv.callee.id == target.id {
                    out.push((m.clone(), inv));
                }
            }
        }
        Ok(out)
    }

    pub fn analyze_call_patterns(&self, query: &SymbolQuery) -> EngineResult<Option<CallPatternAnalysis>> {
        let Some(result) = self.find_callers(query, true)? else {
            return Ok(None);
        };
        let pats = context_patterns();

        let mut groups: BTreeMap<(String, String), Vec<CallSite>> = BTreeMap::new();
        let mut calls_per_file: BTreeMap<String, usize> = BTreeMap::new();
        let (mut loops, mut asyncs, mut handlers) = (0, 0, 0);
        for s in &result.callers {
            let caller_type = s.caller_type().unwrap_or("<none>").to_string();
            groups
                .entry((caller_type, expression_shape(&s.call_expression)))
                .or_default()
                .push(s.clone());
            *calls_per_file.entry(s.file.clone()).or_default() += 1;
            if pats.looping.is_match(&s.context) {
                loops += 1;
            }
            if pats.asynchronous.is_match(&s.context) {
                asyncs += 1;
            }
            if pats.exception.is_match(&s.context) {
                handlers += 1;
            }
        }

        let mut groups: Vec<CallPatternGroup> = groups
            .into_iter()
            .map(|((caller_type, expression_shape), sites)| CallPatternGroup {
                caller_type,
                expression_shape,
                count: sites.len(),
                sites,
            })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count));

        Ok(Some(CallPatternAnalysis {
            total_call_sites: result.callers.len(),
            has_recursive_calls: result.callers.iter().any(|c| c.is_recursive),
            target: result.target,
            groups,
            calls_per_file,
            called_in_loop: loops > 0,
            called_in_async_context: asyncs > 0,
            called_in_exception_handler: handlers > 0,
            loop_call_count: loops,
            async_call_count: asyncs,
            exception_handler_call_count: handlers,
        }))
    }

    /// Routines in scope that nothing references. Members that take part in
    /// dynamic dispatch (including interface implementations) and
    /// constructors are never reported.
    pub fn find_unused_methods(&self, scope: Option<&str>) -> EngineResult<Vec<MethodSignature>> {
        let methods = self.resolver.all_methods()?;
        let implementations = self.interface_implementations(&methods)?;
        let mut out = Vec::new();
        for h in methods {
            if !h.in_scope(scope) {
                continue;
            }
            let Some(sig) = h.signature() else { continue };
            if sig.modifiers.is_polymorphic() || sig.is_constructor() || implementations.contains(&h.id) {
                continue;
            }
            if self.resolver.references(&h)?.is_empty() {
                out.push(sig.clone());
            }
        }
        Ok(out)
    }

    /// Routines referenced only from test code.
    pub fn find_test_only_methods(
        &self,
        scope: Option<&str>,
        tests: &TestPathMatcher,
    ) -> EngineResult<Vec<TestOnlyMethod>> {
        let mut out = Vec::new();
        for h in self.resolver.all_methods()? {
            if !h.in_scope(scope) {
                continue;
            }
            let Some(sig) = h.signature() else { continue };
            let refs = self.resolver.references(&h)?;
            if refs.is_empty() || !refs.iter().all(|r| tests.is_test_path(&r.file)) {
                continue;
            }
            let mut files: Vec<String> = refs.iter().map(|r| r.file.clone()).collect();
            files.sort();
            files.dedup();
            out.push(TestOnlyMethod {
                method: sig.clone(),
                reference_count: refs.len(),
                test_files: files,
            });
        }
        Ok(out)
    }
}

fn site_from_reference(r: &ReferenceLocation) -> CallSite {
    CallSite {
        file: r.file.clone(),
        line: r.line,
        column: r.column,
        caller: r.container.as_ref().and_then(|c| c.signature().cloned()),
        call_expression: r.expression.clone(),
        context: r.context.clone(),
        call_type: if r.is_invocation { CallType::Direct } else { CallType::Unknown },
        confidence: ConfidenceLevel::High,
        is_recursive: false,
        call_chain: Vec::new(),
    }
}

fn site_from_invocation(caller: &SymbolHandle, inv: &Invocation) -> CallSite {
    CallSite {
        file: inv.file.clone(),
        line: inv.line,
        column: inv.column,
        caller: caller.signature().cloned(),
        call_expression: inv.expression.clone(),
        context: inv.context.clone(),
        call_type: CallType::Direct,
        confidence: ConfidenceLevel::High,
        is_recursive: false,
        call_chain: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryResolver;

    fn q(name: &str) -> SymbolQuery {
        SymbolQuery::method(name)
    }

    /// `I.M` implemented by `C.M`; `D.Use` calls through the interface,
    /// `E.Concrete` calls the implementation directly.
    fn interface_corpus() -> MemoryResolver {
        MemoryResolver::builder()
            .interface("I")
            .class("C", &["I"])
            .method("I", "M", &["int"])
            .method("C", "M", &["int"])
            .method("D", "Use", &[])
            .method("E", "Concrete", &[])
            .call("D.Use", "I.M")
            .call("E.Concrete", "C.M")
            .build()
    }

    #[test]
    fn interface_callers_are_indirect_medium() {
        let r = interface_corpus();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let result = cr.find_callers(&q("I.M"), true).unwrap().unwrap();
        assert_eq!(result.tier, ResolutionTier::Semantic);

        let d = result.callers.iter().find(|c| c.caller_type() == Some("D")).unwrap();
        assert_eq!(d.call_type, CallType::Indirect);
        assert_eq!(d.confidence, ConfidenceLevel::Medium);

        let e = result.callers.iter().find(|c| c.caller_type() == Some("E")).unwrap();
        assert_eq!(e.call_type, CallType::Indirect, "reached through the implementation");
        assert_eq!(e.call_chain, vec!["I".to_string()]);
        assert_eq!(result.total_callers(), 2);
    }

    #[test]
    fn direct_filter_is_subset_and_absent_when_empty() {
        let r = interface_corpus();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        assert!(cr.find_direct_callers(&q("I.M")).unwrap().is_none());

        let all = cr.find_callers(&q("C.M"), true).unwrap().unwrap();
        let direct = cr.find_direct_callers(&q("C.M")).unwrap().unwrap();
        assert!(direct.callers.iter().all(|d| all.callers.contains(d)));
        assert!(direct.callers.iter().all(|d| d.call_type == CallType::Direct));
        assert_eq!(direct.callers[0].caller_type(), Some("E"));
    }

    #[test]
    fn unknown_target_is_none() {
        let r = interface_corpus();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        assert!(cr.find_callers(&q("Nope"), true).unwrap().is_none());
    }

    #[test]
    fn membership_is_deterministic() {
        let r = interface_corpus();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let a = cr.find_callers(&q("I.M"), true).unwrap().unwrap();
        let b = cr.find_callers(&q("I.M"), true).unwrap().unwrap();
        assert_eq!(a.callers, b.callers);
    }

    #[test]
    fn method_groups_are_unknown_low_and_self_type_calls_recursive() {
        let r = MemoryResolver::builder()
            .method("Job", "Tick", &[])
            .method("Job", "Start", &[])
            .method("Timer", "Arm", &[])
            .call("Job.Start", "Job.Tick")
            .method_group("Timer.Arm", "Job.Tick")
            .build();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let res = cr.find_callers(&q("Job.Tick"), true).unwrap().unwrap();
        let start = res.callers.iter().find(|c| c.caller_type() == Some("Job")).unwrap();
        assert!(start.is_recursive);
        assert_eq!(start.call_type, CallType::Direct);
        let arm = res.callers.iter().find(|c| c.caller_type() == Some("Timer")).unwrap();
        assert_eq!(arm.call_type, CallType::Unknown);
        assert_eq!(arm.confidence, ConfidenceLevel::Low);
        assert!(!arm.is_recursive);
    }

    #[test]
    fn overloads_pick_first_with_warning_or_by_parameter_types() {
        let r = MemoryResolver::builder()
            .method("Fmt", "Pad", &["string"])
            .method("Fmt", "Pad", &["string", "int"])
            .method("App", "Run", &[])
            .call("App.Run", "Fmt.Pad")
            .build();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let first = cr.resolve_target(&q("Fmt.Pad")).unwrap();
        assert_eq!(first.signature.parameters.len(), 1);
        assert!(first.warnings.iter().any(|w| w.contains("2 declarations")));

        let second = cr
            .resolve_target(&q("Fmt.Pad").with_parameters(vec!["string".into(), "int".into()]))
            .unwrap();
        assert_eq!(second.signature.parameters.len(), 2);
        assert!(second.warnings.is_empty());
    }

    #[test]
    fn call_patterns_group_and_flag_contexts() {
        let r = MemoryResolver::builder()
            .method("Repo", "Save", &["int"])
            .method("Svc", "A", &[])
            .method("Svc", "B", &[])
            .method("Job", "Run", &[])
            .call_with_context("Svc.A", "Repo.Save", "foreach (var x in xs)\n    repo.Save(x);")
            .call_with_context("Svc.B", "Repo.Save", "try {\n    await repo.Save(1);\n}")
            .call_with_context("Job.Run", "Repo.Save", "repo.Save(2); // information")
            .build();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let a = cr.analyze_call_patterns(&q("Repo.Save")).unwrap().unwrap();
        assert_eq!(a.total_call_sites, 3);
        assert_eq!(a.loop_call_count, 1);
        assert_eq!(a.async_call_count, 1);
        assert_eq!(a.exception_handler_call_count, 1, "`information` is not `for`");
        assert!(a.called_in_loop && a.called_in_async_context && a.called_in_exception_handler);
        assert_eq!(a.groups[0].caller_type, "Svc");
        assert_eq!(a.groups[0].count, 2);
        assert_eq!(a.calls_per_file.values().sum::<usize>(), 3);
    }

    #[test]
    fn unused_skips_dispatch_members() {
        let r = MemoryResolver::builder()
            .method("X", "Caller", &[])
            .method("Y", "Used", &[])
            .method("Z", "Lonely", &[])
            .virtual_method("Z", "Hook")
            .call("X.Caller", "Y.Used")
            .build();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let unused: Vec<String> = cr.find_unused_methods(None).unwrap().iter().map(MethodSignature::key).collect();
        assert!(unused.contains(&"Z.Lonely".to_string()));
        assert!(!unused.contains(&"Z.Hook".to_string()));
        assert!(!unused.contains(&"Y.Used".to_string()));
        assert_eq!(cr.find_unused_methods(Some("Y")).unwrap().len(), 0);
    }

    #[test]
    fn unused_skips_interface_implementations() {
        let r = MemoryResolver::builder()
            .interface("I")
            .class("C", &["I"])
            .method("I", "M", &[])
            .method("C", "M", &[])
            .method("C", "Helper", &[])
            .method("D", "Use", &[])
            .call("D.Use", "I.M")
            .build();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let unused: Vec<String> = cr.find_unused_methods(None).unwrap().iter().map(MethodSignature::key).collect();
        assert_eq!(unused, vec!["C.Helper", "D.Use"]);
    }

    #[test]
    fn test_only_methods_need_every_reference_in_tests() {
        let r = MemoryResolver::builder()
            .method("Calc", "Helper", &[])
            .method("Calc", "Shared", &[])
            .method("CalcTests", "Checks", &[])
            .method("App", "Main", &[])
            .call_in("CalcTests.Checks", "Calc.Helper", "tests/Calc.Tests/CalcTests.cs")
            .call_in("CalcTests.Checks", "Calc.Shared", "tests/Calc.Tests/CalcTests.cs")
            .call_in("App.Main", "Calc.Shared", "src/App/Program.cs")
            .build();
        let cr = CallerResolver::new(&r, TierMode::Auto);
        let found = cr.find_test_only_methods(None, &TestPathMatcher::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method.key(), "Calc.Helper");
        assert_eq!(found[0].test_files, vec!["tests/Calc.Tests/CalcTests.cs".to_string()]);
    }

    #[test]
    fn test_path_heuristic_is_case_insensitive() {
        let m = TestPathMatcher::default();
        assert!(m.is_test_path("src/Shop.UnitTests/CartSpec.cs"));
        assert!(m.is_test_path("Cart.TESTS.cs"));
        assert!(m.is_test_path("Test/Cart.cs"));
        assert!(!m.is_test_path("src/Shop/Cart.cs"));
    }

    #[test]
    fn shapes() {
        assert_eq!(expression_shape("repo.Save(order, true)"), "instance.Save(2)");
        assert_eq!(expression_shape("Save()"), "Save(0)");
        assert_eq!(expression_shape("this.Save(Map(a, b))"), "this.Save(1)");
        assert_eq!(expression_shape("Factory.Create<T>(x)"), "Type.Create(1)");
        assert_eq!(expression_shape("OnTick"), "OnTick (method group)");
    }
}
