//! `internal.fio`: file access that suspends instead of blocking.
//!
//! Failures follow the Lua convention of returning `nil, message` rather
//! than raising.

use mlua::{Lua, String as LuaString, Table};

/// Build the `internal.fio` table.
pub(crate) fn open(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    module.set(
        "read",
        lua.create_async_function(|lua, path: String| async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok((Some(lua.create_string(&bytes)?), None)),
                Err(e) => Ok((None, Some(format!("{path}: {e}")))),
            }
        })?,
    )?;

    module.set(
        "write",
        lua.create_async_function(|_, (path, data): (String, LuaString)| async move {
            let bytes = data.as_bytes().to_vec();
            match tokio::fs::write(&path, bytes).await {
                Ok(()) => Ok((true, None)),
                Err(e) => Ok((false, Some(format!("{path}: {e}")))),
            }
        })?,
    )?;

    module.set(
        "exists",
        lua.create_async_function(|_, path: String| async move {
            Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
        })?,
    )?;

    module.set(
        "unlink",
        lua.create_async_function(|_, path: String| async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok((true, None)),
                Err(e) => Ok((false, Some(format!("{path}: {e}")))),
            }
        })?,
    )?;

    Ok(module)
}
