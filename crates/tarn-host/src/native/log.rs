//! `internal.log`: script log records into `tracing`.

use mlua::{Lua, Table};

/// Build the `internal.log` table.
pub(crate) fn open(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    module.set(
        "write",
        lua.create_function(|_, (level, message): (String, String)| {
            match level.as_str() {
                "error" => tracing::error!(target: "tarn::script", "{message}"),
                "warn" => tracing::warn!(target: "tarn::script", "{message}"),
                "info" => tracing::info!(target: "tarn::script", "{message}"),
                "verbose" => tracing::debug!(target: "tarn::script", "{message}"),
                "debug" => tracing::trace!(target: "tarn::script", "{message}"),
                other => {
                    return Err(mlua::Error::runtime(format!("unknown log level '{other}'")));
                }
            }
            Ok(())
        })?,
    )?;
    Ok(module)
}
