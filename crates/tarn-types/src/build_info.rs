//! Build metadata exposed to scripts as `require('tarn').build`.

use serde::{Deserialize, Serialize};

/// How the host binary was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Target triple, e.g. `x86_64-unknown-linux-gnu`.
    pub target: String,
    /// Build options (profile, optimization level).
    pub options: String,
    /// Compiler identity, e.g. `rustc 1.82.0 (f6e511eec 2024-10-15)`.
    pub compiler: String,
    /// File extension of loadable extension modules (`so`, `dylib`, `dll`).
    pub mod_format: String,
    /// Extra compiler flags the build was made with.
    pub flags: String,
}
