//! Bounded call-chain traversal: backward to callers, forward to callees,
//! paths between two routines and reachability from a start.
//!
//! Every traversal owns its visited set and call stack; nothing survives the
//! call except the returned record. A [`CancellationToken`] is checked before
//! each node is expanded and a tripped token unwinds keeping what was found.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::callers::{CallerResolver, ResolvedTarget};
use crate::error::EngineResult;
use crate::model::{
    CallChainPath, CallChainResult, CallChainStep, CallDirection, CallSite, CallType, ConfidenceLevel,
    MethodSignature, ReachabilityAnalysis, SymbolHandle,
};
use crate::resolver::{Invocation, Resolver};
use crate::tiers::{SymbolQuery, TierMode};

/// Default cap on paths enumerated between two routines.
pub const DEFAULT_MAX_PATHS: usize = 1000;

#[derive(Debug, Clone)]
struct Edge {
    node: SymbolHandle,
    step: CallChainStep,
}

/// Children of a routine in one direction, computed once per traversal.
struct Adjacency<'c, 'a> {
    callers: &'c CallerResolver<'a>,
    direction: CallDirection,
    cap: ConfidenceLevel,
    memo: HashMap<String, Rc<Vec<Edge>>>,
}

impl<'c, 'a> Adjacency<'c, 'a> {
    fn new(callers: &'c CallerResolver<'a>, direction: CallDirection, cap: ConfidenceLevel) -> Self {
        Self {
            callers,
            direction,
            cap,
            memo: HashMap::new(),
        }
    }

    fn children(&mut self, node: &SymbolHandle) -> EngineResult<Rc<Vec<Edge>>> {
        if let Some(hit) = self.memo.get(&node.id) {
            return Ok(Rc::clone(hit));
        }
        let Some(sig) = node.signature() else {
            return Ok(Rc::new(Vec::new()));
        };
        let edges = match self.direction {
            CallDirection::Backward => self.incoming(node, sig)?,
            CallDirection::Forward => self.outgoing(node, sig)?,
        };
        let mut seen = HashSet::new();
        let edges: Vec<Edge> = edges.into_iter().filter(|e| seen.insert(e.node.key())).collect();
        let edges = Rc::new(edges);
        self.memo.insert(node.id.clone(), Rc::clone(&edges));
        Ok(edges)
    }

    fn incoming(&self, node: &SymbolHandle, sig: &MethodSignature) -> EngineResult<Vec<Edge>> {
        let mut out = Vec::new();
        for (container, site) in self.callers.caller_edges(node, true, self.cap)? {
            let Some(container) = container else { continue };
            let Some(from) = container.signature().cloned() else { continue };
            out.push(Edge {
                step: CallChainStep {
                    from_method: from,
                    to_method: sig.clone(),
                    call_site: site,
                },
                node: container,
            });
        }
        Ok(out)
    }

    fn outgoing(&self, node: &SymbolHandle, sig: &MethodSignature) -> EngineResult<Vec<Edge>> {
        let invocations = self.callers.resolver().invocations_within(node)?;
        Ok(invocations
            .into_iter()
            .filter_map(|inv| {
                let to = inv.callee.signature()?.clone();
                let call_site = forward_site(sig, &to, &inv, self.cap);
                Some(Edge {
                    step: CallChainStep {
                        from_method: sig.clone(),
                        to_method: to,
                        call_site,
                    },
                    node: inv.callee,
                })
            })
            .collect())
    }
}

pub(crate) fn forward_site(caller: &MethodSignature, callee: &MethodSignature, inv: &Invocation, cap: ConfidenceLevel) -> CallSite {
    let (call_type, confidence) = if callee.modifiers.is_polymorphic() {
        (CallType::Indirect, ConfidenceLevel::Medium)
    } else {
        (CallType::Direct, ConfidenceLevel::High)
    };
    CallSite {
        file: inv.file.clone(),
        line: inv.line,
        column: inv.column,
        caller: Some(caller.clone()),
        call_expression: inv.expression.clone(),
        context: inv.context.clone(),
        call_type,
        confidence: confidence.min(cap),
        is_recursive: caller.containing_type == callee.containing_type,
        call_chain: Vec::new(),
    }
}

/// Mutable state of one depth-first chain walk.
struct Walk {
    max_depth: usize,
    paths: Vec<CallChainPath>,
    visited: HashSet<String>,
    reached_max_depth: bool,
    cancelled: bool,
}

impl Walk {
    fn emit(&mut self, steps: &[CallChainStep], is_recursive: bool) {
        if !steps.is_empty() {
            self.paths.push(CallChainPath::new(steps.to_vec(), is_recursive));
        }
    }
}

/// Mutable state of a simple-path search between two routines.
struct Between {
    to_key: String,
    max_depth: usize,
    max_paths: usize,
    paths: Vec<CallChainPath>,
    visited: HashSet<String>,
    reached_max_depth: bool,
    cancelled: bool,
}

pub struct CallChainBuilder<'a> {
    callers: CallerResolver<'a>,
    cancel: CancellationToken,
    max_paths: usize,
}

impl<'a> CallChainBuilder<'a> {
    pub fn new(resolver: &'a dyn Resolver, mode: TierMode) -> Self {
        Self {
            callers: CallerResolver::new(resolver, mode),
            cancel: CancellationToken::new(),
            max_paths: DEFAULT_MAX_PATHS,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    fn resolve(&self, query: &SymbolQuery, warnings: &mut Vec<String>) -> Option<ResolvedTarget> {
        let target = self.callers.resolve_target(query);
        if target.is_none() {
            warnings.push(format!("no routine matches `{}`", query.name));
        }
        target
    }

    pub fn find_call_chains(
        &self,
        query: &SymbolQuery,
        direction: CallDirection,
        max_depth: usize,
    ) -> EngineResult<CallChainResult> {
        let mut result = CallChainResult::empty(direction, max_depth);
        let Some(target) = self.resolve(query, &mut result.warnings) else {
            return Ok(result);
        };
        self.chains_from(&target, direction, max_depth, result)
    }

    /// Forward chains from `query` that loop back onto the call stack.
    pub fn find_recursive_call_chains(&self, query: &SymbolQuery, max_depth: usize) -> EngineResult<CallChainResult> {
        let mut result = self.find_call_chains(query, CallDirection::Forward, max_depth)?;
        result.paths.retain(|p| p.is_recursive);
        Ok(result)
    }

    fn chains_from(
        &self,
        target: &ResolvedTarget,
        direction: CallDirection,
        max_depth: usize,
        mut result: CallChainResult,
    ) -> EngineResult<CallChainResult> {
        let mut adjacency = Adjacency::new(&self.callers, direction, target.tier.confidence());
        let mut walk = Walk {
            max_depth,
            paths: Vec::new(),
            visited: HashSet::new(),
            reached_max_depth: false,
            cancelled: false,
        };
        let mut stack = vec![target.handle.key()];
        let mut path = Vec::new();
        self.visit(&target.handle, &mut path, &mut stack, &mut walk, &mut adjacency)?;

        if direction == CallDirection::Backward {
            for p in &mut walk.paths {
                p.steps.reverse();
            }
        }
        debug!(
            target = %target.handle.id,
            ?direction,
            paths = walk.paths.len(),
            visited = walk.visited.len(),
            "call chains traced"
        );

        result.target = Some(target.signature.clone());
        result.paths = walk.paths;
        result.reached_max_depth = walk.reached_max_depth;
        result.cancelled = walk.cancelled;
        result.methods_visited = walk.visited.len();
        result.tier = Some(target.tier);
        result.warnings.extend(target.warnings.iter().cloned());
        Ok(result)
    }

    fn visit(
        &self,
        node: &SymbolHandle,
        path: &mut Vec<CallChainStep>,
        stack: &mut Vec<String>,
        walk: &mut Walk,
        adjacency: &mut Adjacency<'_, 'a>,
    ) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            walk.cancelled = true;
            return Ok(());
        }
        if path.len() >= walk.max_depth {
            walk.reached_max_depth = true;
            walk.emit(path, false);
            return Ok(());
        }
        walk.visited.insert(node.key());

        let children = adjacency.children(node)?;
        if children.is_empty() {
            walk.emit(path, false);
            return Ok(());
        }
        for edge in children.iter() {
            if walk.cancelled {
                break;
            }
            let key = edge.node.key();
            path.push(edge.step.clone());
            if stack.contains(&key) {
                walk.emit(path, true);
            } else if walk.visited.contains(&key) {
                walk.emit(path, false);
            } else {
                stack.push(key);
                self.visit(&edge.node, path, stack, walk, adjacency)?;
                stack.pop();
            }
            path.pop();
        }
        Ok(())
    }

    /// Every simple forward path from `from` that ends on `to`, up to
    /// `max_depth` steps and the configured path cap.
    pub fn find_call_chains_between(
        &self,
        from: &SymbolQuery,
        to: &SymbolQuery,
        max_depth: usize,
    ) -> EngineResult<CallChainResult> {
        let mut result = CallChainResult::empty(CallDirection::Forward, max_depth);
        let Some(start) = self.resolve(from, &mut result.warnings) else {
            return Ok(result);
        };
        let Some(goal) = self.resolve(to, &mut result.warnings) else {
            return Ok(result);
        };

        let cap = start.tier.confidence().min(goal.tier.confidence());
        let mut adjacency = Adjacency::new(&self.callers, CallDirection::Forward, cap);
        let mut search = Between {
            to_key: goal.handle.key(),
            max_depth,
            max_paths: self.max_paths,
            paths: Vec::new(),
            visited: HashSet::new(),
            reached_max_depth: false,
            cancelled: false,
        };
        let mut stack = vec![start.handle.key()];
        let mut path = Vec::new();
        self.between(&start.handle, &mut path, &mut stack, &mut search, &mut adjacency)?;

        if search.paths.len() >= search.max_paths {
            result
                .warnings
                .push(format!("stopped after {} paths; narrow the search or lower max_depth", search.max_paths));
        }
        result.target = Some(goal.signature.clone());
        result.paths = search.paths;
        result.reached_max_depth = search.reached_max_depth;
        result.cancelled = search.cancelled;
        result.methods_visited = search.visited.len();
        result.tier = Some(if goal.tier.confidence() < start.tier.confidence() {
            goal.tier
        } else {
            start.tier
        });
        result.warnings.extend(start.warnings);
        for w in goal.warnings {
            if !result.warnings.contains(&w) {
                result.warnings.push(w);
            }
        }
        Ok(result)
    }

    fn between(
        &self,
        node: &SymbolHandle,
        path: &mut Vec<CallChainStep>,
        stack: &mut Vec<String>,
        search: &mut Between,
        adjacency: &mut Adjacency<'_, 'a>,
    ) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            search.cancelled = true;
            return Ok(());
        }
        search.visited.insert(node.key());
        let children = adjacency.children(node)?;
        if path.len() >= search.max_depth {
            if !children.is_empty() {
                search.reached_max_depth = true;
            }
            return Ok(());
        }
        for edge in children.iter() {
            if search.cancelled || search.paths.len() >= search.max_paths {
                break;
            }
            let key = edge.node.key();
            path.push(edge.step.clone());
            if key == search.to_key {
                search.paths.push(CallChainPath::new(path.clone(), false));
            } else if !stack.contains(&key) {
                stack.push(key);
                self.between(&edge.node, path, stack, search, adjacency)?;
                stack.pop();
            }
            path.pop();
        }
        Ok(())
    }

    /// The path with the fewest steps between two routines; ties go to the
    /// path found first.
    pub fn find_shortest_path(
        &self,
        from: &SymbolQuery,
        to: &SymbolQuery,
        max_depth: usize,
    ) -> EngineResult<CallChainResult> {
        let mut result = self.find_call_chains_between(from, to, max_depth)?;
        let best = result
            .paths
            .iter()
            .enumerate()
            .min_by_key(|(i, p)| (p.len(), *i))
            .map(|(i, _)| i);
        result.paths = match best {
            Some(i) => vec![result.paths.swap_remove(i)],
            None => Vec::new(),
        };
        Ok(result)
    }

    /// Breadth-first reachability from `query`, bucketed by call depth.
    pub fn find_reachable_methods(&self, query: &SymbolQuery, max_depth: usize) -> EngineResult<ReachabilityAnalysis> {
        let mut analysis = ReachabilityAnalysis::empty(max_depth);
        let mut ignored = Vec::new();
        let Some(start) = self.resolve(query, &mut ignored) else {
            return Ok(analysis);
        };
        let mut adjacency = Adjacency::new(&self.callers, CallDirection::Forward, start.tier.confidence());

        let mut seen: HashSet<String> = HashSet::from([start.handle.key()]);
        let mut frontier: VecDeque<SymbolHandle> = VecDeque::from([start.handle.clone()]);
        analysis.start = Some(start.signature.clone());
        analysis.reachable_by_depth.insert(0, vec![start.signature.clone()]);

        let mut depth = 0;
        'levels: while !frontier.is_empty() {
            if depth >= max_depth {
                for node in &frontier {
                    if adjacency.children(node)?.iter().any(|e| !seen.contains(&e.node.key())) {
                        analysis.depth_limit_hit = true;
                        break;
                    }
                }
                break;
            }
            let mut next = VecDeque::new();
            let mut bucket = Vec::new();
            while let Some(node) = frontier.pop_front() {
                if self.cancel.is_cancelled() {
                    analysis.cancelled = true;
                    break 'levels;
                }
                for edge in adjacency.children(&node)?.iter() {
                    if seen.insert(edge.node.key()) {
                        bucket.push(edge.step.to_method.clone());
                        next.push_back(edge.node.clone());
                    }
                }
            }
            depth += 1;
            if !bucket.is_empty() {
                analysis.reachable_by_depth.insert(depth, bucket);
                analysis.max_depth_reached = depth;
            }
            frontier = next;
        }

        let mut listed = HashSet::new();
        for m in self.callers.resolver().all_methods()? {
            let Some(sig) = m.signature() else { continue };
            let key = sig.key();
            if !seen.contains(&key) && listed.insert(key) {
                analysis.unreachable.push(sig.clone());
            }
        }
        Ok(analysis)
    }
}
