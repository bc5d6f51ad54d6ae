//! tarn front-end: command line parsing and the interactive console.
//!
//! It handles:
//! - Command-line options (`-l`, `-e`, `-i`, `--`, script and its arguments)
//! - The Lua console registered as `package.loaded.console`
//! - Value formatting for console output
//! - Command history via rustyline

pub mod cli;
pub mod console;
pub mod format;
