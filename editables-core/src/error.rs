//! Error types.
//!
//! Per-cell operations never fail; they are no-ops outside their valid
//! state. The only runtime failure is looking up a scope that was never
//! registered.

use thiserror::Error;

use crate::editable::ScopeId;

/// Errors surfaced by scope-level operations and configuration.
#[derive(Debug, Error)]
pub enum EditError {
    /// A scope-level operation named an identifier that was never registered.
    #[error("unknown editable scope: {0:?}")]
    UnknownScope(ScopeId),

    /// Configuration text could not be parsed.
    #[error("invalid editables configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// The process-wide registry was already created with another
    /// configuration.
    #[error("the global scope registry is already initialized")]
    RegistryInitialized,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EditError>;
