use thiserror::Error;

use crate::script::ScriptSignature;

/// Setup-time errors of the allocation core.
///
/// Runtime lookup misses are logged and skipped instead; nothing here is raised during a cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskerError {
    /// No allocator registered under this name.
    #[error("unknown allocator: {0}")]
    UnknownAllocator(String),
    /// No evaluator registered under this name.
    #[error("unknown evaluator: {0}")]
    UnknownEvaluator(String),
    /// No generator registered under this name.
    #[error("unknown generator: {0}")]
    UnknownGenerator(String),
    /// The script function was not found in the scope chain.
    #[error("script function `{0}` not found in any enclosing scope")]
    ScriptNotFound(String),
    /// The script function exists but has the wrong signature.
    #[error("script function `{name}` has signature {found}, expected {expected}")]
    ScriptSignature {
        /// Function name.
        name: String,
        /// Signature required by the strategy slot.
        expected: ScriptSignature,
        /// Signature of the function found.
        found: ScriptSignature,
    },
    /// A custom strategy was requested but no script scope was supplied.
    #[error("custom strategy `{0}` requested without a script scope")]
    NoScriptScope(String),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}
