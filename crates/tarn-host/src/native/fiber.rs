//! `internal.fiber`: cooperative task primitives.
//!
//! Every task runs on the host's `LocalSet`, on the thread that drives the
//! reactor. `sleep` and `yield` suspend the calling Lua coroutine; the
//! reactor resumes it once the timer fires or other tasks have had a turn.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use mlua::{Function, Lua, MultiValue, Table};

use crate::host::host_of;

tokio::task_local! {
    /// Name of the running cooperative task.
    pub(crate) static FIBER_NAME: String;
}

/// Name given to tasks started with `fiber.create`.
const CHILD_FIBER_NAME: &str = "lua";

/// Name of the current task, or `main` outside of any task.
pub fn current_name() -> String {
    FIBER_NAME
        .try_with(|name| name.clone())
        .unwrap_or_else(|_| "main".to_string())
}

/// Build the `internal.fiber` table.
pub(crate) fn open(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    let started = Instant::now();

    module.set(
        "sleep",
        lua.create_async_function(|_, seconds: f64| async move {
            // Negative sleeps yield; NaN and overflow are errors.
            let seconds = if seconds < 0.0 { 0.0 } else { seconds };
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|e| mlua::Error::runtime(format!("fiber.sleep: {e}")))?;
            tokio::time::sleep(duration).await;
            Ok(())
        })?,
    )?;

    module.set(
        "yield",
        lua.create_async_function(|_, ()| async move {
            tokio::task::yield_now().await;
            Ok(())
        })?,
    )?;

    module.set(
        "create",
        lua.create_function(|lua, (func, args): (Function, MultiValue)| {
            let host = host_of(lua)?;
            host.spawn_local(FIBER_NAME.scope(CHILD_FIBER_NAME.to_string(), async move {
                if let Err(e) = func.call_async::<()>(args).await {
                    tracing::warn!(target: "tarn::script", "fiber failed: {e}");
                }
            }))?;
            Ok(())
        })?,
    )?;

    module.set("name", lua.create_function(|_, ()| Ok(current_name()))?)?;

    module.set(
        "time",
        lua.create_function(|_, ()| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(mlua::Error::external)?;
            Ok(now.as_secs_f64())
        })?,
    )?;

    module.set(
        "clock",
        lua.create_function(move |_, ()| Ok(started.elapsed().as_secs_f64()))?,
    )?;

    Ok(module)
}
