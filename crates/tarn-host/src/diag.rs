//! Script-level diagnostics.
//!
//! A startup script can end the process without ever returning (`os.exit`),
//! so its outcome cannot travel through the task's return value. Every
//! failing step writes into a [`DiagnosticSink`] instead, and the coordinator
//! reads the sink once the reactor has stopped.

use std::cell::RefCell;

use thiserror::Error;

/// Category of a recoverable script failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Source failed to compile.
    Syntax,
    /// A chunk raised an error while running.
    Runtime,
    /// `require` of a `-l` module failed.
    ModuleLoad,
    /// The script could not be read.
    Io,
    /// Interactive mode was requested but no console is registered.
    Console,
    /// The host was not in a state to run scripts.
    Host,
    /// The interpreter ran out of memory. Treated as fatal by the coordinator.
    OutOfMemory,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticKind::Syntax => "syntax",
            DiagnosticKind::Runtime => "runtime",
            DiagnosticKind::ModuleLoad => "module-load",
            DiagnosticKind::Io => "io",
            DiagnosticKind::Console => "console",
            DiagnosticKind::Host => "host",
            DiagnosticKind::OutOfMemory => "out-of-memory",
        };
        f.write_str(name)
    }
}

/// A recoverable script failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Diagnostic {
    /// What kind of step failed.
    pub kind: DiagnosticKind,
    /// Interpreter error text.
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build a diagnostic from an interpreter error.
    ///
    /// Syntax and allocation errors keep their own kind; everything else is
    /// filed under `kind`.
    pub fn from_lua(kind: DiagnosticKind, err: &mlua::Error) -> Self {
        let kind = match err {
            mlua::Error::SyntaxError { .. } => DiagnosticKind::Syntax,
            mlua::Error::MemoryError(_) => DiagnosticKind::OutOfMemory,
            _ => kind,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<mlua::Error> for Diagnostic {
    fn from(err: mlua::Error) -> Self {
        Self::from_lua(DiagnosticKind::Runtime, &err)
    }
}

/// Overwrite-on-write error slot.
///
/// Empty means success.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    slot: RefCell<Option<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, replacing any earlier one.
    pub fn set(&self, diag: Diagnostic) {
        tracing::debug!(kind = %diag.kind, "diagnostic recorded");
        *self.slot.borrow_mut() = Some(diag);
    }

    /// Consume the recorded failure, leaving the sink empty.
    pub fn take(&self) -> Option<Diagnostic> {
        self.slot.borrow_mut().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.borrow().is_none()
    }
}
