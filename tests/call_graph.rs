use callsight::callers::{CallerResolver, TestPathMatcher};
use callsight::chains::CallChainBuilder;
use callsight::config::Config;
use callsight::context::AnalysisContext;
use callsight::graph::CallGraphAnalyzer;
use callsight::model::{CallType, ConfidenceLevel, MethodSignature};
use callsight::resolver::Resolver;
use callsight::tiers::{ResolutionTier, SymbolQuery, TierMode};
use std::collections::HashSet;
use std::path::Path;

const PRICING: &str = r#"namespace Shop.Pricing
{
    public interface IDiscount
    {
        decimal Apply(decimal total);
    }

    public class Seasonal : IDiscount
    {
        public decimal Apply(decimal total)
        {
            return total * 0.9m;
        }
    }

    public class Checkout
    {
        private readonly IDiscount discount;

        public decimal Total(decimal amount)
        {
            return discount.Apply(amount);
        }

        public decimal Direct(decimal amount)
        {
            var s = new Seasonal();
            return s.Apply(amount);
        }
    }

    public class Clearance : IDiscount
    {
        public decimal Apply(decimal total)
        {
            return total * 0.5m;
        }
    }
}
"#;

const FLOW: &str = r#"namespace Shop.Flow
{
    public class Parser
    {
        public void Foo(int n)
        {
            if (n > 0)
            {
                Bar(n - 1);
            }
        }

        public void Bar(int n)
        {
            Foo(n);
        }

        public void Entry()
        {
            Foo(3);
        }

        public void Orphan()
        {
        }

        public virtual void Hook()
        {
        }
    }
}
"#;

const FLOW_TESTS: &str = r#"namespace Shop.Tests
{
    public class ParserTests
    {
        public void ChecksOrphan()
        {
            var p = new Shop.Flow.Parser();
            p.Orphan();
        }
    }
}
"#;

fn write(root: &Path, rel: &str, body: &str) {
    let p = root.join(rel);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, body).unwrap();
}

fn workspace() -> (tempfile::TempDir, AnalysisContext) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Shop/Pricing.cs", PRICING);
    write(dir.path(), "src/Shop/Flow.cs", FLOW);
    write(dir.path(), "tests/Shop.Tests/ParserTests.cs", FLOW_TESTS);
    write(dir.path(), "src/Shop/obj/Debug/Generated.cs", "class Generated { void Junk() { } }");
    let ctx = AnalysisContext::load(dir.path(), Config::default()).unwrap();
    (dir, ctx)
}

fn keys(sigs: &[MethodSignature]) -> Vec<String> {
    sigs.iter().map(MethodSignature::key).collect()
}

#[test]
fn loads_sources_and_skips_build_output() {
    let (_dir, ctx) = workspace();
    assert_eq!(ctx.document_count(), 3);
    let health = ctx.health();
    assert_eq!(health.total_files, 3);
    assert_eq!(health.compile_error_count, 0);
}

#[test]
fn interface_callers_are_indirect() {
    let (_dir, ctx) = workspace();
    let snapshot = ctx.resolver();
    let callers = CallerResolver::new(&*snapshot, TierMode::Auto);

    let result = callers
        .find_callers(&SymbolQuery::method("IDiscount.Apply"), true)
        .unwrap()
        .unwrap();
    assert_eq!(result.tier, ResolutionTier::Semantic);

    let total = result
        .callers
        .iter()
        .find(|c| c.caller.as_ref().map(|s| s.name.as_str()) == Some("Total"))
        .expect("Checkout.Total calls through the interface");
    assert_eq!(total.call_type, CallType::Indirect);
    assert_eq!(total.confidence, ConfidenceLevel::Medium);

    let direct = result
        .callers
        .iter()
        .find(|c| c.caller.as_ref().map(|s| s.name.as_str()) == Some("Direct"))
        .expect("reached through Seasonal.Apply");
    assert_eq!(direct.call_chain, vec!["IDiscount".to_string()]);

    let concrete = callers.find_direct_callers(&SymbolQuery::method("Seasonal.Apply")).unwrap().unwrap();
    assert_eq!(concrete.callers.len(), 1);
    assert_eq!(concrete.callers[0].file, "src/Shop/Pricing.cs");
}

#[test]
fn mutual_recursion_scenario() {
    let (_dir, ctx) = workspace();
    let snapshot = ctx.resolver();
    let chains = CallChainBuilder::new(&*snapshot, TierMode::Auto);

    let between = chains
        .find_call_chains_between(&SymbolQuery::method("Parser.Foo"), &SymbolQuery::method("Parser.Bar"), 3)
        .unwrap();
    assert_eq!(between.paths.len(), 1);
    assert_eq!(between.paths[0].keys(), vec!["Parser.Foo", "Parser.Bar"]);

    let recursive = chains
        .find_recursive_call_chains(&SymbolQuery::method("Parser.Foo"), 10)
        .unwrap();
    assert_eq!(recursive.paths.len(), 1);
    assert_eq!(recursive.paths[0].keys(), vec!["Parser.Foo", "Parser.Bar", "Parser.Foo"]);

    let backward = chains
        .find_call_chains(&SymbolQuery::method("Parser.Bar"), callsight::model::CallDirection::Backward, 10)
        .unwrap();
    assert!(backward.paths.iter().any(|p| p.keys() == vec!["Parser.Entry", "Parser.Foo", "Parser.Bar"]));
}

#[test]
fn reachability_partitions_the_routine_universe() {
    let (_dir, ctx) = workspace();
    let snapshot = ctx.resolver();
    let chains = CallChainBuilder::new(&*snapshot, TierMode::Auto);
    let a = chains.find_reachable_methods(&SymbolQuery::method("Parser.Entry"), 10).unwrap();

    let universe: HashSet<String> = snapshot
        .all_methods()
        .unwrap()
        .iter()
        .filter_map(|h| h.signature().map(MethodSignature::key))
        .collect();
    let reachable: HashSet<String> = a.reachable().map(MethodSignature::key).collect();
    let unreachable: HashSet<String> = a.unreachable.iter().map(MethodSignature::key).collect();

    assert!(reachable.is_disjoint(&unreachable));
    assert_eq!(reachable.union(&unreachable).count(), universe.len());
    assert_eq!(reachable, HashSet::from(["Parser.Entry".to_string(), "Parser.Foo".into(), "Parser.Bar".into()]));
    assert!(unreachable.contains("Parser.Orphan"));
}

#[test]
fn graph_analysis_of_a_namespace() {
    let (_dir, ctx) = workspace();
    let snapshot = ctx.resolver();
    let a = CallGraphAnalyzer::new(&*snapshot, TierMode::Auto)
        .analyze_call_graph(Some("Shop.Flow"))
        .unwrap();
    assert_eq!(a.total_methods, 5);
    assert_eq!(keys(&a.entry_points), vec!["Parser.Entry", "Parser.Orphan", "Parser.Hook"]);
    assert_eq!(a.circular_dependencies.len(), 1);
    assert_eq!(a.circular_dependencies[0].keys(), vec!["Parser.Bar", "Parser.Foo"]);
    assert_eq!(a.max_call_depth, 2);
}

#[test]
fn unused_and_test_only_methods() {
    let (_dir, ctx) = workspace();
    let snapshot = ctx.resolver();
    let callers = CallerResolver::new(&*snapshot, TierMode::Auto);

    let unused = keys(&callers.find_unused_methods(Some("Shop.Flow")).unwrap());
    assert_eq!(unused, vec!["Parser.Entry"], "Hook is virtual; Orphan is used by a test");

    let pricing = keys(&callers.find_unused_methods(Some("Shop.Pricing")).unwrap());
    assert_eq!(pricing, vec!["Checkout.Total", "Checkout.Direct"], "Clearance.Apply is reached through IDiscount");

    let test_only = callers
        .find_test_only_methods(Some("Shop.Flow"), &TestPathMatcher::default())
        .unwrap();
    assert_eq!(test_only.len(), 1);
    assert_eq!(test_only[0].method.key(), "Parser.Orphan");
}

#[test]
fn broken_build_degrades_to_syntax_tier_and_recovers() {
    let (_dir, ctx) = workspace();
    ctx.update_document("src/Shop/Broken.cs", "class Broken { void Half( }");

    let snapshot = ctx.resolver();
    assert!(snapshot.health().compile_error_count > 0);
    let result = CallerResolver::new(&*snapshot, TierMode::Auto)
        .find_callers(&SymbolQuery::method("Parser.Bar"), true)
        .unwrap()
        .unwrap();
    assert_eq!(result.tier, ResolutionTier::Syntax);
    assert!(result.warnings.iter().any(|w| w.contains("degraded")));
    assert!(result.callers.iter().all(|c| c.confidence <= ConfidenceLevel::Medium));
    assert_eq!(result.callers.len(), 1);

    assert!(ctx.remove_document("src/Shop/Broken.cs"));
    let healed = ctx.resolver();
    let result = CallerResolver::new(&*healed, TierMode::Auto)
        .find_callers(&SymbolQuery::method("Parser.Bar"), true)
        .unwrap()
        .unwrap();
    assert_eq!(result.tier, ResolutionTier::Semantic);
    assert!(result.warnings.is_empty());
}
