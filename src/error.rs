use thiserror::Error;

/// Faults raised by a [`Resolver`](crate::resolver::Resolver) implementation.
///
/// Domain conditions (symbol not found, degraded tier, depth limit, cancellation)
/// are never errors; they travel as data on the result records.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("semantic model unavailable: {0}")]
    Unavailable(String),

    #[error("unknown symbol id `{0}`")]
    UnknownSymbol(String),

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("resolver fault: {0}")]
    Internal(String),
}

/// The only error an engine operation reports to its caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

pub type ResolverResult<T> = std::result::Result<T, ResolverError>;
pub type EngineResult<T> = std::result::Result<T, EngineError>;
