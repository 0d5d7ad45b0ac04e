//! Scope-wide call graph: entry points, leaves, cycles and depth statistics.

use std::collections::{HashMap, HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chains::{forward_site, DEFAULT_MAX_PATHS};
use crate::error::EngineResult;
use crate::model::{CallChainStep, CallGraph, CallGraphAnalysis, CircularDependency, ConfidenceLevel};
use crate::resolver::Resolver;
use crate::tiers::{TierMode, TierSelector};

pub struct CallGraphAnalyzer<'a> {
    resolver: &'a dyn Resolver,
    cap: ConfidenceLevel,
    cancel: CancellationToken,
    max_paths: usize,
}

/// Graph plus the first call site seen for each edge.
struct Built {
    graph: CallGraph,
    in_scope: Vec<String>,
    steps: HashMap<(String, String), CallChainStep>,
    cancelled: bool,
}

impl<'a> CallGraphAnalyzer<'a> {
    pub fn new(resolver: &'a dyn Resolver, mode: TierMode) -> Self {
        let cap = TierSelector::new(resolver, mode).select().confidence();
        Self {
            resolver,
            cap,
            cancel: CancellationToken::new(),
            max_paths: DEFAULT_MAX_PATHS,
        }
    }

    /// Cap on the number of cycles enumerated.
    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn build(&self, scope: Option<&str>) -> EngineResult<Built> {
        let mut built = Built {
            graph: CallGraph::default(),
            in_scope: Vec::new(),
            steps: HashMap::new(),
            cancelled: false,
        };
        let mut listed = HashSet::new();
        for h in self.resolver.all_methods()? {
            if self.cancel.is_cancelled() {
                built.cancelled = true;
                break;
            }
            if !h.in_scope(scope) {
                continue;
            }
            let Some(sig) = h.signature() else { continue };
            built.graph.add_method(sig);
            if listed.insert(sig.key()) {
                built.in_scope.push(sig.key());
            }
            for inv in self.resolver.invocations_within(&h)? {
                let Some(callee) = inv.callee.signature() else { continue };
                if built.graph.add_call(sig, callee) {
                    built.steps.insert(
                        (sig.key(), callee.key()),
                        CallChainStep {
                            from_method: sig.clone(),
                            to_method: callee.clone(),
                            call_site: forward_site(sig, callee, &inv, self.cap),
                        },
                    );
                }
            }
        }
        Ok(built)
    }

    pub fn analyze_call_graph(&self, scope: Option<&str>) -> EngineResult<CallGraphAnalysis> {
        let built = self.build(scope)?;
        let graph = &built.graph;

        let targets = graph.call_targets();
        let entry_points: Vec<_> = built
            .in_scope
            .iter()
            .filter(|k| !targets.contains(k.as_str()))
            .filter_map(|k| graph.methods.get(k).cloned())
            .collect();
        let leaf_methods: Vec<_> = built
            .in_scope
            .iter()
            .filter(|k| graph.callees(k).is_empty())
            .filter_map(|k| graph.methods.get(k).cloned())
            .collect();

        let (circular_dependencies, cycles_cancelled) = self.cycles(&built);

        let mut depths = Vec::with_capacity(entry_points.len());
        let mut depth_cancelled = false;
        for entry in &entry_points {
            if self.cancel.is_cancelled() {
                depth_cancelled = true;
                break;
            }
            depths.push(walk_depth(graph, &entry.key()));
        }
        let max_call_depth = depths.iter().copied().max().unwrap_or(0);
        let average_call_depth = if depths.is_empty() {
            0.0
        } else {
            depths.iter().sum::<usize>() as f64 / depths.len() as f64
        };

        debug!(
            scope = scope.unwrap_or("<all>"),
            methods = built.in_scope.len(),
            calls = graph.edge_count(),
            cycles = circular_dependencies.len(),
            "call graph analyzed"
        );

        Ok(CallGraphAnalysis {
            scope: scope.map(str::to_string),
            total_methods: built.in_scope.len(),
            total_calls: graph.edge_count(),
            entry_points,
            leaf_methods,
            circular_dependencies,
            max_call_depth,
            average_call_depth,
            cancelled: built.cancelled || cycles_cancelled || depth_cancelled,
            graph: built.graph,
        })
    }

    pub fn find_circular_dependencies(&self, scope: Option<&str>) -> EngineResult<Vec<CircularDependency>> {
        let built = self.build(scope)?;
        Ok(self.cycles(&built).0)
    }

    fn cycles(&self, built: &Built) -> (Vec<CircularDependency>, bool) {
        let (found, complete) = elementary_cycles(&built.graph, &built.in_scope, self.max_paths, &self.cancel);
        if !complete {
            warn!(max_paths = self.max_paths, found = found.len(), "cycle enumeration stopped early");
        }
        (self.materialize(built, found), self.cancel.is_cancelled())
    }

    fn materialize(&self, built: &Built, cycles: Vec<Vec<String>>) -> Vec<CircularDependency> {
        cycles
            .into_iter()
            .map(|keys| {
                let methods = keys.iter().filter_map(|k| built.graph.methods.get(k).cloned()).collect();
                let steps = keys
                    .iter()
                    .zip(keys.iter().cycle().skip(1))
                    .filter_map(|(a, b)| built.steps.get(&(a.clone(), b.clone())).cloned())
                    .collect();
                CircularDependency::new(methods, steps)
            })
            .collect()
    }
}

/// Elementary cycles among `keys`, each reported once with its smallest key
/// first. Returns false alongside the cycles when `cap` or cancellation cut
/// the enumeration short.
///
/// One search per start key, confined to keys that sort after the start and
/// can still get back to it.
fn elementary_cycles(
    graph: &CallGraph,
    keys: &[String],
    cap: usize,
    cancel: &CancellationToken,
) -> (Vec<Vec<String>>, bool) {
    let mut order: Vec<&str> = keys.iter().map(String::as_str).collect();
    order.sort_unstable();
    order.dedup();
    let rank: HashMap<&str, usize> = order.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    let mut found = Vec::new();
    for (i, &start) in order.iter().enumerate() {
        if cancel.is_cancelled() {
            return (found, false);
        }
        let allowed = returns_to(graph, start, |k| rank.get(k).is_some_and(|r| *r >= i));
        if !allowed.contains(start) {
            continue;
        }
        if !cycles_through(graph, start, &allowed, cap, cancel, &mut found) {
            return (found, false);
        }
    }
    (found, true)
}

/// Keys passing `eligible` from which `start` is reachable through eligible
/// keys. Contains `start` only when it lies on a cycle.
fn returns_to<'g>(graph: &'g CallGraph, start: &str, eligible: impl Fn(&str) -> bool) -> HashSet<&'g str> {
    let mut reach = HashSet::new();
    let mut queue: VecDeque<&'g str> = graph.callers(start).iter().map(String::as_str).collect();
    while let Some(k) = queue.pop_front() {
        if !eligible(k) || !reach.insert(k) {
            continue;
        }
        queue.extend(graph.callers(k).iter().map(String::as_str));
    }
    reach
}

/// Simple paths from `start` back to itself through `allowed`, pushed onto
/// `found`. Returns false when the cap or cancellation cut the search short.
fn cycles_through<'g>(
    graph: &'g CallGraph,
    start: &'g str,
    allowed: &HashSet<&'g str>,
    cap: usize,
    cancel: &CancellationToken,
    found: &mut Vec<Vec<String>>,
) -> bool {
    let mut path: Vec<&'g str> = vec![start];
    let mut on_path: HashSet<&'g str> = HashSet::from([start]);
    // (key, index of the next callee to try)
    let mut frames: Vec<(&'g str, usize)> = vec![(start, 0)];

    while let Some(frame) = frames.last_mut() {
        let (key, next) = *frame;
        let callees = graph.callees(key);
        if next >= callees.len() {
            frames.pop();
            path.pop();
            on_path.remove(key);
            continue;
        }
        frame.1 += 1;
        let callee = callees[next].as_str();
        if callee == start {
            found.push(path.iter().map(|k| k.to_string()).collect());
            if found.len() >= cap || cancel.is_cancelled() {
                return false;
            }
        } else if allowed.contains(callee) && on_path.insert(callee) {
            path.push(callee);
            frames.push((callee, 0));
        }
    }
    true
}

/// Depth of the DFS tree rooted at `entry`; each key is entered once.
fn walk_depth(graph: &CallGraph, entry: &str) -> usize {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut deepest = 0;
    let Some((entry, _)) = graph.forward.get_key_value(entry) else {
        return 0;
    };
    visited.insert(entry.as_str());
    let mut frames: Vec<(&str, usize)> = vec![(entry.as_str(), 0)];

    while let Some(frame) = frames.last_mut() {
        let (key, next) = *frame;
        let callees = graph.callees(key);
        if next >= callees.len() {
            frames.pop();
            continue;
        }
        frame.1 += 1;
        let callee = callees[next].as_str();
        if visited.insert(callee) {
            frames.push((callee, 0));
            deepest = deepest.max(frames.len() - 1);
        }
    }
    deepest
}
