//! The event loop the host's tasks run on.

use std::io;

use tokio::runtime::{Builder, Runtime};

/// A single-threaded tokio runtime.
///
/// Owned by the caller; the coordinator only drives it for the duration of
/// one `run_script` call.
#[derive(Debug)]
pub struct Reactor {
    runtime: Runtime,
}

impl Reactor {
    /// Build a current-thread runtime with timers and I/O enabled.
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    /// Wrap an existing runtime.
    ///
    /// Host tasks still run on the calling thread; worker threads of a
    /// multi-thread runtime only serve I/O and timers.
    pub fn from_runtime(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}
