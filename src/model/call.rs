use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::symbol::{MethodSignature, SymbolHandle};
use crate::tiers::ResolutionTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallType {
    Direct,
    Indirect,
    Unknown,
}

/// Ordered weakest first so `min` yields the weakest link of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One textual location where a call to a target occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Absent for references outside any routine (field initializers, attributes).
    pub caller: Option<MethodSignature>,
    pub call_expression: String,
    pub context: String,
    pub call_type: CallType,
    pub confidence: ConfidenceLevel,
    pub is_recursive: bool,
    /// Interfaces traversed to reach this site during indirect expansion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_chain: Vec<String>,
}

impl CallSite {
    pub fn position(&self) -> (&str, u32, u32) {
        (self.file.as_str(), self.line, self.column)
    }

    pub fn caller_type(&self) -> Option<&str> {
        self.caller.as_ref().map(|c| c.containing_type.as_str())
    }
}

/// Callers of one resolved target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerResult {
    pub target: MethodSignature,
    pub target_symbol: SymbolHandle,
    pub callers: Vec<CallSite>,
    pub tier: ResolutionTier,
    pub confidence: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CallerResult {
    pub fn total_callers(&self) -> usize {
        self.callers.len()
    }

    pub fn direct_callers(&self) -> impl Iterator<Item = &CallSite> {
        self.callers.iter().filter(|c| c.call_type == CallType::Direct)
    }

    pub fn indirect_callers(&self) -> impl Iterator<Item = &CallSite> {
        self.callers.iter().filter(|c| c.call_type == CallType::Indirect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    /// Who eventually calls the target.
    Backward,
    /// What the target eventually calls.
    Forward,
}

impl CallDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backward" | "upstream" | "callers" | "incoming" => Some(Self::Backward),
            "forward" | "downstream" | "callees" | "outgoing" => Some(Self::Forward),
            _ => None,
        }
    }
}

/// A directed edge `from -> to` with the site that realises it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallChainStep {
    pub from_method: MethodSignature,
    pub to_method: MethodSignature,
    pub call_site: CallSite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallChainPath {
    pub steps: Vec<CallChainStep>,
    pub confidence: ConfidenceLevel,
    pub is_recursive: bool,
}

impl CallChainPath {
    pub fn new(steps: Vec<CallChainStep>, is_recursive: bool) -> Self {
        let confidence = steps
            .iter()
            .map(|s| s.call_site.confidence)
            .min()
            .unwrap_or(ConfidenceLevel::High);
        Self {
            steps,
            confidence,
            is_recursive,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn start(&self) -> Option<&MethodSignature> {
        self.steps.first().map(|s| &s.from_method)
    }

    pub fn end(&self) -> Option<&MethodSignature> {
        self.steps.last().map(|s| &s.to_method)
    }

    /// Keys along the path, `from` of the first step through `to` of the last.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            out.push(first.from_method.key());
        }
        out.extend(self.steps.iter().map(|s| s.to_method.key()));
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallChainResult {
    pub target: Option<MethodSignature>,
    pub direction: CallDirection,
    pub max_depth: usize,
    pub paths: Vec<CallChainPath>,
    pub reached_max_depth: bool,
    pub cancelled: bool,
    pub methods_visited: usize,
    pub tier: Option<ResolutionTier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CallChainResult {
    pub fn empty(direction: CallDirection, max_depth: usize) -> Self {
        Self {
            target: None,
            direction,
            max_depth,
            paths: Vec::new(),
            reached_max_depth: false,
            cancelled: false,
            methods_visited: 0,
            tier: None,
            warnings: Vec::new(),
        }
    }

    pub fn recursive_paths(&self) -> impl Iterator<Item = &CallChainPath> {
        self.paths.iter().filter(|p| p.is_recursive)
    }

    pub fn longest(&self) -> Option<&CallChainPath> {
        self.paths.iter().max_by_key(|p| p.len())
    }
}

/// Call sites sharing a caller type and expression shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPatternGroup {
    pub caller_type: String,
    pub expression_shape: String,
    pub count: usize,
    pub sites: Vec<CallSite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallPatternAnalysis {
    pub target: MethodSignature,
    pub total_call_sites: usize,
    pub groups: Vec<CallPatternGroup>,
    pub calls_per_file: BTreeMap<String, usize>,
    pub has_recursive_calls: bool,
    pub called_in_loop: bool,
    pub called_in_async_context: bool,
    pub called_in_exception_handler: bool,
    pub loop_call_count: usize,
    pub async_call_count: usize,
    pub exception_handler_call_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOnlyMethod {
    pub method: MethodSignature,
    pub reference_count: usize,
    pub test_files: Vec<String>,
}
