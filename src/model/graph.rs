use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::call::{CallChainStep, ConfidenceLevel};
use super::symbol::MethodSignature;

/// Adjacency over qualified-name keys (`ContainingType.Name`).
///
/// Built once per analysis and thrown away afterwards; nothing here is kept
/// across document edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub forward: BTreeMap<String, Vec<String>>,
    pub backward: BTreeMap<String, Vec<String>>,
    pub methods: BTreeMap<String, MethodSignature>,
}

impl CallGraph {
    pub fn add_method(&mut self, sig: &MethodSignature) {
        let key = sig.key();
        self.forward.entry(key.clone()).or_default();
        self.backward.entry(key.clone()).or_default();
        self.methods.entry(key).or_insert_with(|| sig.clone());
    }

    /// Record `from -> to`. Returns false when the edge already existed.
    pub fn add_call(&mut self, from: &MethodSignature, to: &MethodSignature) -> bool {
        self.add_method(from);
        self.add_method(to);
        let (fk, tk) = (from.key(), to.key());
        let out = self.forward.entry(fk.clone()).or_default();
        if out.contains(&tk) {
            return false;
        }
        out.push(tk.clone());
        self.backward.entry(tk).or_default().push(fk);
        true
    }

    pub fn callees(&self, key: &str) -> &[String] {
        self.forward.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn callers(&self, key: &str) -> &[String] {
        self.backward.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }

    pub fn calls(&self, from: &str, to: &str) -> bool {
        self.callees(from).iter().any(|k| k == to)
    }

    /// Keys that some routine calls.
    pub fn call_targets(&self) -> BTreeSet<&str> {
        self.forward.values().flatten().map(String::as_str).collect()
    }
}

/// A cycle `methods[0] -> methods[1] -> ... -> methods[n-1] -> methods[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularDependency {
    pub methods: Vec<MethodSignature>,
    pub steps: Vec<CallChainStep>,
    pub confidence: ConfidenceLevel,
    pub cycle_length: usize,
}

impl CircularDependency {
    pub fn new(methods: Vec<MethodSignature>, steps: Vec<CallChainStep>) -> Self {
        let confidence = steps
            .iter()
            .map(|s| s.call_site.confidence)
            .min()
            .unwrap_or(ConfidenceLevel::High);
        let cycle_length = methods.len();
        Self {
            methods,
            steps,
            confidence,
            cycle_length,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.methods.iter().map(MethodSignature::key).collect()
    }

    pub fn is_self_recursion(&self) -> bool {
        self.methods.len() == 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityAnalysis {
    pub start: Option<MethodSignature>,
    pub max_depth: usize,
    /// Depth bucket -> routines first reached at that depth. Depth 0 is the start.
    pub reachable_by_depth: BTreeMap<usize, Vec<MethodSignature>>,
    pub unreachable: Vec<MethodSignature>,
    pub max_depth_reached: usize,
    /// Traversal stopped at `max_depth` while unexplored callees remained.
    pub depth_limit_hit: bool,
    pub cancelled: bool,
}

impl ReachabilityAnalysis {
    pub fn empty(max_depth: usize) -> Self {
        Self {
            start: None,
            max_depth,
            reachable_by_depth: BTreeMap::new(),
            unreachable: Vec::new(),
            max_depth_reached: 0,
            depth_limit_hit: false,
            cancelled: false,
        }
    }

    pub fn reachable(&self) -> impl Iterator<Item = &MethodSignature> {
        self.reachable_by_depth.values().flatten()
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable_by_depth.values().map(Vec::len).sum()
    }

    pub fn is_reachable(&self, key: &str) -> bool {
        self.reachable().any(|m| m.key() == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphAnalysis {
    pub scope: Option<String>,
    pub graph: CallGraph,
    pub entry_points: Vec<MethodSignature>,
    pub leaf_methods: Vec<MethodSignature>,
    pub circular_dependencies: Vec<CircularDependency>,
    pub total_methods: usize,
    pub total_calls: usize,
    pub max_call_depth: usize,
    pub average_call_depth: f64,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_call_keeps_both_directions_in_sync() {
        let a = MethodSignature::new("T", "A");
        let b = MethodSignature::new("T", "B");
        let mut g = CallGraph::default();
        assert!(g.add_call(&a, &b));
        assert!(!g.add_call(&a, &b), "duplicate edge");
        assert_eq!(g.callees("T.A"), ["T.B".to_string()]);
        assert_eq!(g.callers("T.B"), ["T.A".to_string()]);
        assert!(g.callers("T.A").is_empty());
        assert_eq!(g.edge_count(), 1);
        assert!(g.calls("T.A", "T.B"));
        assert!(!g.calls("T.B", "T.A"));
        assert_eq!(g.methods.len(), 2);
    }
}
