//! Plain data records returned by the engine.
//!
//! Everything here is a read-only projection recomputed per request; only the
//! cache and the document store live longer than a single call.

mod call;
mod graph;
mod symbol;

pub use call::{
    CallChainPath, CallChainResult, CallChainStep, CallDirection, CallPatternAnalysis,
    CallPatternGroup, CallSite, CallType, CallerResult, ConfidenceLevel, TestOnlyMethod,
};
pub use graph::{CallGraph, CallGraphAnalysis, CircularDependency, ReachabilityAnalysis};
pub use symbol::{
    normalize_type, types_compatible, Accessibility, KindFilter, Location, MethodSignature,
    Modifiers, Parameter, RefKind, SymbolHandle, SymbolKind, TypeKind,
};
