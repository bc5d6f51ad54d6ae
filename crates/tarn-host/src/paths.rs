//! Module search paths for scripts and compiled extensions.
//!
//! Two paths are computed, `package.path` (Lua sources) and `package.cpath`
//! (compiled extensions). Each one is built from, highest precedence first:
//!
//! | Source | Example |
//! |--------|---------|
//! | User-local rocks tree, if `$HOME` resolves | `~/.luarocks/share/lua/5.4/?.lua;` |
//! | Compiled-in default | `/usr/local/share/tarn/lua/?.lua;` |
//! | `$LUA_PATH` / `$LUA_CPATH` override | `./?.lua;;` |
//!
//! An override replaces the computed default outright, except that the first
//! `;;` in it is expanded to `;<computed default>;`. This is the stock Lua
//! convention for splicing the default into a custom path.
//!
//! # Example
//!
//! ```
//! use tarn_host::paths::splice_default;
//!
//! let path = splice_default("/x/?.lua;;/y/?.lua;", "/a/?.lua;");
//! assert_eq!(path, "/x/?.lua;/a/?.lua;;/y/?.lua;");
//! ```

use std::path::PathBuf;

use directories::BaseDirs;
use mlua::{Lua, Table};

/// Environment variable overriding the script search path.
pub const LUA_PATH_VAR: &str = "LUA_PATH";

/// Environment variable overriding the extension search path.
pub const LUA_CPATH_VAR: &str = "LUA_CPATH";

/// Compiled-in script search path.
pub const DEFAULT_LUA_PATH: &str =
    "/usr/local/share/tarn/lua/?.lua;/usr/local/share/tarn/lua/?/init.lua";

/// Compiled-in extension search path.
pub const DEFAULT_LUA_CPATH: &str = "/usr/local/lib/tarn/lua/?";

/// Lua language version used in rocks-tree paths.
const LUA_VERSION_DIR: &str = "5.4";

/// Environment inputs for path resolution.
///
/// Captured once so resolution is a pure function of its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathEnv {
    /// Home directory, if one could be resolved.
    pub home: Option<PathBuf>,
    /// Value of `$LUA_PATH`, if set.
    pub lua_path: Option<String>,
    /// Value of `$LUA_CPATH`, if set.
    pub lua_cpath: Option<String>,
}

impl PathEnv {
    /// Read `$HOME`, `$LUA_PATH` and `$LUA_CPATH` from the process.
    ///
    /// When `$HOME` is unset the platform home directory is used, if any.
    pub fn from_process() -> Self {
        Self {
            home: home_dir(),
            lua_path: std::env::var(LUA_PATH_VAR).ok(),
            lua_cpath: std::env::var(LUA_CPATH_VAR).ok(),
        }
    }
}

/// Compiled-in defaults, before user-local roots are prepended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDefaults {
    /// Default `package.path` tail.
    pub lua: String,
    /// Default `package.cpath` tail, without the library suffix.
    pub c: String,
    /// Dynamic library suffix including the dot (`.so`, `.dylib`, `.dll`).
    pub lib_suffix: String,
}

impl Default for PathDefaults {
    fn default() -> Self {
        Self {
            lua: DEFAULT_LUA_PATH.to_string(),
            c: format!("{}{}", DEFAULT_LUA_CPATH, std::env::consts::DLL_SUFFIX),
            lib_suffix: std::env::consts::DLL_SUFFIX.to_string(),
        }
    }
}

/// Resolved `package.path` and `package.cpath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    /// Script search path.
    pub lua: String,
    /// Extension search path.
    pub c: String,
}

impl SearchPaths {
    /// Compute both search paths from the environment and defaults.
    pub fn resolve(env: &PathEnv, defaults: &PathDefaults) -> Self {
        let home = env.home.as_ref().map(|h| h.to_string_lossy().into_owned());

        let mut lua = String::new();
        if let Some(home) = &home {
            for tail in [
                format!("/.luarocks/share/lua/{LUA_VERSION_DIR}/?.lua;"),
                format!("/.luarocks/share/lua/{LUA_VERSION_DIR}/?/init.lua;"),
                "/.luarocks/share/lua/?.lua;".to_string(),
                "/.luarocks/share/lua/?/init.lua;".to_string(),
            ] {
                lua.push_str(home);
                lua.push_str(&tail);
            }
        }
        lua.push_str(&defaults.lua);
        lua.push(';');

        let mut c = String::new();
        if let Some(home) = &home {
            let suffix = &defaults.lib_suffix;
            c.push_str(&format!("{home}/.luarocks/lib/lua/{LUA_VERSION_DIR}/?{suffix};"));
            c.push_str(&format!("{home}/.luarocks/lib/lua/?{suffix};"));
        }
        c.push_str(&defaults.c);
        c.push(';');

        Self {
            lua: apply_override(env.lua_path.as_deref(), lua),
            c: apply_override(env.lua_cpath.as_deref(), c),
        }
    }

    /// Write the paths into `package.path` and `package.cpath`.
    pub fn apply(&self, lua: &Lua) -> mlua::Result<()> {
        let package: Table = lua.globals().get("package")?;
        package.set("path", self.lua.as_str())?;
        package.set("cpath", self.c.as_str())?;
        tracing::debug!(path = %self.lua, cpath = %self.c, "configured module search paths");
        Ok(())
    }
}

fn apply_override(value: Option<&str>, computed: String) -> String {
    match value {
        None => computed,
        Some(value) => splice_default(value, &computed),
    }
}

/// Expand the first `;;` in `value` to `;<default>;`.
///
/// Later occurrences are left as they are.
pub fn splice_default(value: &str, default: &str) -> String {
    value.replacen(";;", &format!(";{default};"), 1)
}

/// Get the user's home directory.
///
/// Prefers `$HOME`; falls back to the platform's notion of home.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
}

/// Directory for per-user tarn data (console history and the like).
///
/// Uses `$XDG_DATA_HOME/tarn` or falls back to `~/.local/share/tarn`.
pub fn data_dir() -> Option<PathBuf> {
    BaseDirs::new()
        .map(|d| d.data_dir().join("tarn"))
        .or_else(|| home_dir().map(|h| h.join(".local").join("share").join("tarn")))
}
