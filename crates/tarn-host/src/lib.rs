//! tarn-host: the Lua control surface of a storage server.
//!
//! This crate provides:
//!
//! - **Paths**: `package.path` / `package.cpath` resolution with `LUA_PATH`
//!   overrides and `;;` splicing
//! - **Modules**: the builtin catalog, embedded at build time and registered
//!   into `package.loaded` without touching the filesystem
//! - **Native**: `internal.*` helper libraries (log, fiber, fio)
//! - **Panic**: fatal fault reporting with the interpreter call stack
//! - **Host**: interpreter lifecycle, one host per thread
//! - **Coordinator**: runs the startup script as a cooperative task and
//!   reports its outcome through the diagnostic sink

pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod diag;
pub mod error;
pub mod host;
pub mod metadata;
pub mod modules;
pub mod native;
pub mod panic;
pub mod paths;
pub mod reactor;

pub use config::{ExitPolicy, HostConfig};
pub use coordinator::{run_script, RunPlan, ScriptSource};
pub use diag::{Diagnostic, DiagnosticKind, DiagnosticSink};
pub use error::{HostError, HostResult};
pub use host::ScriptingHost;
pub use modules::{register_modules, ModuleEntry, BUILTIN_MODULES};
pub use panic::{Frame, PanicHandler};
pub use paths::{PathDefaults, PathEnv, SearchPaths};
pub use reactor::Reactor;

// Data types, so embedders need only one dependency
pub use tarn_types::{HostState, ScriptOption, ScriptTask, StdinSource, Target, Teardown};
