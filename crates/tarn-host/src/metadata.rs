//! Host metadata exposed to scripts.
//!
//! - `_TARN`: version string (like `_VERSION`)
//! - `require('tarn')`: `{ package, version, build = { target, options,
//!   compiler, mod_format, flags } }`
//! - `arg`: `arg[-1]` is the host binary, `arg[0]` the script, then its
//!   arguments
//!
//! All three tables are read-only proxies.

use mlua::{Lua, Table};
use tarn_types::BuildInfo;

use crate::modules::loaded_table;

/// Package name reported to scripts.
pub const PACKAGE: &str = "tarn";

/// Version string, `<crate version>-<git hash>`.
pub fn version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("TARN_GIT_HASH"))
}

/// Date the binary was built, `YYYY-MM-DD`.
pub fn build_date() -> &'static str {
    env!("TARN_BUILD_DATE")
}

/// Build metadata recorded by the build script.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        target: env!("TARN_BUILD_TARGET").to_string(),
        options: env!("TARN_BUILD_OPTIONS").to_string(),
        compiler: env!("TARN_COMPILER").to_string(),
        mod_format: std::env::consts::DLL_EXTENSION.to_string(),
        flags: env!("TARN_RUSTFLAGS").to_string(),
    }
}

const FREEZE: &str = r#"
local data = ...
return setmetatable({}, {
    __index = data,
    __newindex = function(_, key)
        error("attempt to modify read-only table (key '" .. tostring(key) .. "')", 2)
    end,
    __len = function() return #data end,
    __pairs = function() return next, data, nil end,
    __metatable = false,
})
"#;

/// Wrap `data` in a read-only proxy.
pub(crate) fn freeze(lua: &Lua, data: Table) -> mlua::Result<Table> {
    lua.load(FREEZE).set_name("=freeze").call(data)
}

/// Install `_TARN`, `package.loaded.tarn` and `arg`.
pub(crate) fn install(lua: &Lua, binary: &str, argv: &[String]) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("_TARN", version())?;

    let info = build_info();
    let build = lua.create_table()?;
    build.set("target", info.target)?;
    build.set("options", info.options)?;
    build.set("compiler", info.compiler)?;
    build.set("mod_format", info.mod_format)?;
    build.set("flags", info.flags)?;

    let tarn = lua.create_table()?;
    tarn.set("package", PACKAGE)?;
    tarn.set("version", version())?;
    tarn.set("build", freeze(lua, build)?)?;
    loaded_table(lua)?.set("tarn", freeze(lua, tarn)?)?;

    let arg = lua.create_table()?;
    arg.set(-1, binary)?;
    for (i, a) in argv.iter().enumerate() {
        arg.set(i as i64, a.as_str())?;
    }
    globals.set("arg", freeze(lua, arg)?)?;

    Ok(())
}
