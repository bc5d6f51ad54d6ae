//! Native helper libraries backing the builtin Lua modules.
//!
//! These are registered into `package.loaded` under `internal.*` before the
//! builtin catalog runs, so catalog modules can `require` them.

mod fiber;
mod fio;
mod log;

pub use fiber::current_name;
pub(crate) use fiber::FIBER_NAME;

use mlua::Lua;

use crate::modules::loaded_table;

/// Register all native helper libraries.
pub fn register_natives(lua: &Lua) -> mlua::Result<()> {
    let loaded = loaded_table(lua)?;
    loaded.set("internal.log", log::open(lua)?)?;
    loaded.set("internal.fiber", fiber::open(lua)?)?;
    loaded.set("internal.fio", fio::open(lua)?)?;
    Ok(())
}
