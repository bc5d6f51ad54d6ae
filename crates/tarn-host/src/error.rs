//! Host-level errors.
//!
//! These are the unrecoverable tier: the host cannot run without its
//! bootstrap materials. Script failures are [`crate::diag::Diagnostic`]s.

use tarn_types::HostState;
use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised while bringing up or using the scripting host.
#[derive(Debug, Error)]
pub enum HostError {
    /// A host is already live on this thread.
    #[error("a scripting host is already active on this thread")]
    AlreadyInitialized,

    /// The operation needs a ready host.
    #[error("scripting host is not ready (state: {0})")]
    NotReady(HostState),

    /// The interpreter failed outside of module registration.
    #[error("interpreter error: {0}")]
    Interpreter(#[from] mlua::Error),

    /// A builtin module failed to compile.
    #[error("failed to compile builtin module '{name}': {message}")]
    ModuleCompile { name: String, message: String },

    /// A builtin module raised while initializing.
    #[error("failed to initialize builtin module '{name}': {message}")]
    ModuleInit { name: String, message: String },
}
