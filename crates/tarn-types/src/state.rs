//! Scripting host lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a scripting host.
///
/// ```text
/// Uninitialized ──init──▶ Ready ──teardown──▶ TearingDown ──▶ Uninitialized
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostState {
    /// No interpreter is held (never initialized, or fully released).
    Uninitialized,
    /// Interpreter allocated, builtins registered, scripts may run.
    Ready,
    /// Teardown is releasing interpreter state.
    TearingDown,
}

impl std::fmt::Display for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostState::Uninitialized => write!(f, "uninitialized"),
            HostState::Ready => write!(f, "ready"),
            HostState::TearingDown => write!(f, "tearing-down"),
        }
    }
}

/// What a teardown call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Teardown {
    /// A script task is in flight; interpreter state was left alone.
    Deferred,
    /// Interpreter state was released.
    Released,
    /// Nothing to release.
    Noop,
}
