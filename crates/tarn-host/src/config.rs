//! Host configuration.

use crate::paths::{PathDefaults, PathEnv};

/// What `os.exit` does once the host has been told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Flush standard streams and terminate the process.
    #[default]
    Process,
    /// Record the exit code, stop the reactor, and leave the calling task
    /// suspended forever. For embedders that must outlive the script.
    Abandon,
}

/// Configuration for host initialization.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Path of the host binary, exposed as `arg[-1]`.
    pub binary: String,

    /// Script argument vector, exposed as `arg[0..]`.
    pub argv: Vec<String>,

    /// Keep `strict` switched on after boot.
    pub strict: bool,

    /// Behavior of `os.exit`.
    pub exit: ExitPolicy,

    /// Capture a native backtrace when reporting a fatal fault.
    pub capture_backtrace: bool,

    /// Environment inputs for search-path resolution.
    pub path_env: PathEnv,

    /// Compiled-in search-path defaults.
    pub path_defaults: PathDefaults,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::embedded()
    }
}

impl HostConfig {
    /// Config for the `tarn` process itself.
    ///
    /// Reads the binary path and search-path environment from the process,
    /// and lets `os.exit` terminate it.
    pub fn process() -> Self {
        let binary = std::env::args().next().unwrap_or_else(|| "tarn".to_string());
        Self {
            binary,
            argv: Vec::new(),
            strict: false,
            exit: ExitPolicy::Process,
            capture_backtrace: true,
            path_env: PathEnv::from_process(),
            path_defaults: PathDefaults::default(),
        }
    }

    /// Config for a host embedded in a larger program (and for tests).
    ///
    /// Ignores the process environment and never terminates the process.
    pub fn embedded() -> Self {
        Self {
            binary: "tarn".to_string(),
            argv: Vec::new(),
            strict: false,
            exit: ExitPolicy::Abandon,
            capture_backtrace: false,
            path_env: PathEnv::default(),
            path_defaults: PathDefaults::default(),
        }
    }

    /// Set the script argument vector.
    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }

    /// Keep `strict` on after boot.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the `os.exit` behavior.
    pub fn with_exit_policy(mut self, exit: ExitPolicy) -> Self {
        self.exit = exit;
        self
    }

    /// Capture native backtraces on fatal faults.
    pub fn with_backtrace(mut self, capture: bool) -> Self {
        self.capture_backtrace = capture;
        self
    }

    /// Set the search-path environment.
    pub fn with_path_env(mut self, env: PathEnv) -> Self {
        self.path_env = env;
        self
    }

    /// Set the compiled-in search-path defaults.
    pub fn with_path_defaults(mut self, defaults: PathDefaults) -> Self {
        self.path_defaults = defaults;
        self
    }
}
