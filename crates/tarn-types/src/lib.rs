//! Pure data types for tarn — startup requests, host lifecycle, build metadata.
//!
//! This crate is a leaf dependency with no interpreter, no async runtime and
//! no I/O. Embedders that only need to describe a startup request (for
//! example a supervisor building command lines) can depend on it without
//! pulling in Lua.

pub mod build_info;
pub mod state;
pub mod task;

// Flat re-exports for convenience
pub use build_info::*;
pub use state::*;
pub use task::*;
