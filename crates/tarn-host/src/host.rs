//! The scripting host: one Lua interpreter plus everything that lives with it.
//!
//! # Architecture
//!
//! ```text
//! ScriptingHost
//!   └── Rc<HostInner>
//!         ├── Lua                 (interpreter, package.loaded)
//!         ├── LocalSet            (cooperative scheduler)
//!         ├── DiagnosticSink      (outcome of the running script)
//!         ├── IoBuffer            (shared input buffer)
//!         └── in-flight marker, stop token, exit code
//! ```
//!
//! The interpreter keeps a `Weak<HostInner>` as app data so host functions
//! called from Lua (`fiber.create`, `os.exit`) can find their host without
//! creating a reference cycle.
//!
//! At most one host is live per thread. The thread that creates the host is
//! the one that drives its interpreter and reactor.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use mlua::{Function, Lua, LuaOptions, StdLib, Table, Value};
use tarn_types::{HostState, ScriptTask, Teardown};
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;

use crate::buffer::IoBuffer;
use crate::config::{ExitPolicy, HostConfig};
use crate::coordinator;
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::{HostError, HostResult};
use crate::metadata;
use crate::modules::{loaded_table, register_modules, BUILTIN_MODULES};
use crate::native::register_natives;
use crate::panic::{self, PanicHandler};
use crate::paths::SearchPaths;
use crate::reactor::Reactor;

thread_local! {
    static HOST_SLOT: Cell<bool> = const { Cell::new(false) };
}

/// Claim on this thread's host slot, released on drop unless committed.
struct SlotClaim {
    committed: bool,
}

impl SlotClaim {
    fn acquire() -> HostResult<Self> {
        if HOST_SLOT.with(|slot| slot.replace(true)) {
            return Err(HostError::AlreadyInitialized);
        }
        Ok(Self { committed: false })
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for SlotClaim {
    fn drop(&mut self) {
        if !self.committed {
            release_slot();
        }
    }
}

fn release_slot() {
    let _ = HOST_SLOT.try_with(|slot| slot.set(false));
}

/// State shared between the host handle and the functions it hands to Lua.
pub(crate) struct HostInner {
    state: Cell<HostState>,
    lua: RefCell<Option<Lua>>,
    scheduler: RefCell<Option<LocalSet>>,
    pub(crate) sink: DiagnosticSink,
    pub(crate) io_buffer: IoBuffer,
    pub(crate) in_flight: Cell<bool>,
    pub(crate) stop: RefCell<Option<CancellationToken>>,
    exit_code: Cell<Option<i32>>,
    exit_policy: ExitPolicy,
    pub(crate) panic_handler: PanicHandler,
    search_paths: SearchPaths,
}

impl HostInner {
    pub(crate) fn state(&self) -> HostState {
        self.state.get()
    }

    pub(crate) fn lua(&self) -> HostResult<Lua> {
        if self.state.get() != HostState::Ready {
            return Err(HostError::NotReady(self.state.get()));
        }
        self.lua
            .borrow()
            .clone()
            .ok_or(HostError::NotReady(self.state.get()))
    }

    /// Borrow the scheduler for the duration of `f`.
    pub(crate) fn with_scheduler<R>(&self, f: impl FnOnce(&LocalSet) -> R) -> HostResult<R> {
        let scheduler = self.scheduler.borrow();
        match scheduler.as_ref() {
            Some(local) => Ok(f(local)),
            None => Err(HostError::NotReady(self.state.get())),
        }
    }

    /// Spawn a cooperative task on the host scheduler.
    pub(crate) fn spawn_local<F>(&self, fut: F) -> mlua::Result<()>
    where
        F: Future<Output = ()> + 'static,
    {
        self.with_scheduler(|local| {
            // Detached; tasks are reclaimed when the scheduler is dropped.
            let _ = local.spawn_local(fut);
        })
        .map_err(mlua::Error::external)
    }

    /// Release the interpreter and scheduler, unless a script is running.
    pub(crate) fn teardown(&self) -> Teardown {
        if self.in_flight.get() {
            tracing::debug!("teardown deferred: script in flight");
            return Teardown::Deferred;
        }
        if self.lua.borrow().is_none() {
            return Teardown::Noop;
        }

        self.state.set(HostState::TearingDown);
        tracing::debug!("tearing down scripting host");

        // Abandoned tasks hold interpreter references; drop them first.
        let scheduler = self.scheduler.borrow_mut().take();
        drop(scheduler);
        let lua = self.lua.borrow_mut().take();
        drop(lua);

        panic::uninstall();
        release_slot();
        self.state.set(HostState::Uninitialized);
        Teardown::Released
    }

    /// Whether a script asked to exit during this host's life.
    pub(crate) fn exit_requested(&self) -> bool {
        self.exit_code.get().is_some()
    }

    fn request_exit(&self, code: i32) {
        match self.exit_policy {
            ExitPolicy::Process => {
                use std::io::Write;
                let _ = std::io::stdout().flush();
                let _ = std::io::stderr().flush();
                std::process::exit(code);
            }
            ExitPolicy::Abandon => {
                tracing::debug!(code, "script requested exit; abandoning task");
                self.exit_code.set(Some(code));
                if let Some(stop) = self.stop.borrow().as_ref() {
                    stop.cancel();
                }
            }
        }
    }
}

/// Look up the host that owns `lua`.
pub(crate) fn host_of(lua: &Lua) -> mlua::Result<Rc<HostInner>> {
    lua.app_data_ref::<Weak<HostInner>>()
        .and_then(|weak| weak.upgrade())
        .ok_or_else(|| mlua::Error::runtime("no scripting host is attached to this interpreter"))
}

/// An initialized Lua interpreter with builtins, paths and scheduler.
pub struct ScriptingHost {
    inner: Rc<HostInner>,
}

impl ScriptingHost {
    /// Bring up a host, aborting the process on failure.
    ///
    /// The host cannot run without its builtins, so there is nothing to
    /// recover to.
    pub fn init(config: HostConfig) -> Self {
        match Self::try_init(config) {
            Ok(host) => host,
            Err(e) => {
                tracing::error!("failed to initialize scripting host: {e}");
                std::process::abort()
            }
        }
    }

    /// Bring up a host.
    pub fn try_init(config: HostConfig) -> HostResult<Self> {
        let claim = SlotClaim::acquire()?;

        let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::new())?;

        let search_paths = SearchPaths::resolve(&config.path_env, &config.path_defaults);
        search_paths.apply(&lua)?;

        let inner = Rc::new(HostInner {
            state: Cell::new(HostState::Uninitialized),
            lua: RefCell::new(None),
            scheduler: RefCell::new(Some(LocalSet::new())),
            sink: DiagnosticSink::new(),
            io_buffer: IoBuffer::new(),
            in_flight: Cell::new(false),
            stop: RefCell::new(None),
            exit_code: Cell::new(None),
            exit_policy: config.exit,
            panic_handler: PanicHandler::new(config.capture_backtrace),
            search_paths,
        });
        lua.set_app_data(Rc::downgrade(&inner));

        register_natives(&lua)?;
        register_modules(&lua, BUILTIN_MODULES)?;
        metadata::install(&lua, &config.binary, &config.argv)?;
        install_exit_hook(&lua)?;

        if !config.strict {
            let strict: Table = loaded_table(&lua)?.get("strict")?;
            strict.get::<Function>("off")?.call::<()>(())?;
        }

        panic::install(&lua, inner.panic_handler);

        *inner.lua.borrow_mut() = Some(lua);
        inner.state.set(HostState::Ready);
        claim.commit();

        tracing::debug!(version = metadata::version(), "scripting host ready");
        Ok(Self { inner })
    }

    pub fn state(&self) -> HostState {
        self.inner.state()
    }

    /// The interpreter handle.
    pub fn lua(&self) -> HostResult<Lua> {
        self.inner.lua()
    }

    /// Resolved module search paths.
    pub fn search_paths(&self) -> &SearchPaths {
        &self.inner.search_paths
    }

    /// Exit code recorded by `os.exit` under [`ExitPolicy::Abandon`].
    pub fn exit_code(&self) -> Option<i32> {
        self.inner.exit_code.get()
    }

    /// Whether a startup script is running.
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.get()
    }

    /// Run one startup script to completion.
    ///
    /// See [`crate::coordinator`].
    pub fn run_script(&self, reactor: &Reactor, task: ScriptTask) -> Result<(), Diagnostic> {
        coordinator::run_script(self, reactor, task)
    }

    /// Release interpreter state.
    pub fn teardown(&self) -> Teardown {
        self.inner.teardown()
    }

    pub(crate) fn inner(&self) -> &Rc<HostInner> {
        &self.inner
    }
}

impl Drop for ScriptingHost {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl std::fmt::Debug for ScriptingHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptingHost")
            .field("state", &self.inner.state())
            .field("in_flight", &self.inner.in_flight.get())
            .finish_non_exhaustive()
    }
}

/// Map an `os.exit` argument to a process exit code.
fn exit_code_of(value: &Value) -> mlua::Result<i32> {
    match value {
        Value::Nil | Value::Boolean(true) => Ok(0),
        Value::Boolean(false) => Ok(1),
        Value::Integer(n) => Ok(*n as i32),
        Value::Number(n) if n.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(n) => {
            Ok(*n as i32)
        }
        Value::Number(_) => Err(mlua::Error::runtime(
            "bad argument #1 to 'exit' (number has no integer representation)",
        )),
        other => Err(mlua::Error::runtime(format!(
            "bad argument #1 to 'exit' (number expected, got {})",
            other.type_name()
        ))),
    }
}

/// Replace `os.exit` with a version that releases the host first.
fn install_exit_hook(lua: &Lua) -> mlua::Result<()> {
    let os: Table = lua.globals().get("os")?;
    let exit = lua.create_async_function(|lua, code: Value| async move {
        let code = exit_code_of(&code)?;
        let host = host_of(&lua)?;
        drop(lua);

        host.teardown();
        host.request_exit(code);
        drop(host);

        // Abandoned: the reactor is stopping and this task is never resumed.
        std::future::pending::<()>().await;
        Ok(())
    })?;
    os.set("exit", exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn init_reaches_ready() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        assert_eq!(host.state(), HostState::Ready);
        assert!(!host.is_in_flight());
        assert!(host.exit_code().is_none());
    }

    #[test]
    fn second_host_on_thread_is_rejected() {
        let _host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        let err = ScriptingHost::try_init(HostConfig::embedded()).unwrap_err();
        assert!(matches!(err, HostError::AlreadyInitialized));
    }

    #[test]
    fn slot_frees_after_teardown() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        assert_eq!(host.teardown(), Teardown::Released);
        let again = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        assert_eq!(again.state(), HostState::Ready);
    }

    #[test]
    fn slot_frees_on_drop() {
        drop(ScriptingHost::try_init(HostConfig::embedded()).unwrap());
        ScriptingHost::try_init(HostConfig::embedded()).unwrap();
    }

    #[test]
    fn teardown_is_deferred_while_in_flight() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();

        host.inner().in_flight.set(true);
        assert_eq!(host.teardown(), Teardown::Deferred);
        assert_eq!(host.state(), HostState::Ready);
        assert!(host.lua().is_ok());

        host.inner().in_flight.set(false);
        assert_eq!(host.teardown(), Teardown::Released);
        assert_eq!(host.state(), HostState::Uninitialized);
        assert_eq!(host.teardown(), Teardown::Noop);
    }

    #[test]
    fn lua_after_teardown_is_not_ready() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        host.teardown();
        let err = host.lua().unwrap_err();
        assert!(matches!(err, HostError::NotReady(HostState::Uninitialized)));
    }

    #[test]
    fn every_builtin_is_loaded() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        let lua = host.lua().unwrap();
        let loaded = loaded_table(&lua).unwrap();
        for entry in BUILTIN_MODULES {
            let value: Value = loaded.get(entry.name).unwrap();
            assert!(!value.is_nil(), "builtin '{}' missing from package.loaded", entry.name);
        }
        for name in ["tarn", "internal.log", "internal.fiber", "internal.fio"] {
            let value: Value = loaded.get(name).unwrap();
            assert!(!value.is_nil(), "'{name}' missing from package.loaded");
        }
    }

    #[test]
    fn string_and_table_are_extended() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        let lua = host.lua().unwrap();
        let (starts, copied): (bool, i64) = lua
            .load("return ('tarn'):startswith('ta'), #table.copy({1, 2, 3})")
            .eval()
            .unwrap();
        assert!(starts);
        assert_eq!(copied, 3);
    }

    #[test]
    fn metadata_is_read_only() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        let lua = host.lua().unwrap();

        let (package, version, target): (String, String, String) = lua
            .load("local t = require('tarn') return t.package, t.version, t.build.target")
            .eval()
            .unwrap();
        assert_eq!(package, "tarn");
        assert_eq!(version, metadata::version());
        assert!(!target.is_empty());
        assert_eq!(lua.globals().get::<String>("_TARN").unwrap(), version);

        let err = lua.load("require('tarn').version = 'x'").exec().unwrap_err();
        assert!(err.to_string().contains("read-only"), "got: {err}");
        let err = lua.load("require('tarn').build.flags = 'x'").exec().unwrap_err();
        assert!(err.to_string().contains("read-only"), "got: {err}");
    }

    #[test]
    fn arg_carries_binary_and_argv() {
        let config = HostConfig::embedded()
            .with_argv(vec!["init.lua".to_string(), "--fast".to_string()]);
        let host = ScriptingHost::try_init(config).unwrap();
        let lua = host.lua().unwrap();
        let (bin, script, flag, len): (String, String, String, i64) = lua
            .load("return arg[-1], arg[0], arg[1], #arg")
            .eval()
            .unwrap();
        assert_eq!(bin, "tarn");
        assert_eq!(script, "init.lua");
        assert_eq!(flag, "--fast");
        assert_eq!(len, 1);
        assert!(lua.load("arg[2] = 'x'").exec().is_err());
    }

    #[rstest]
    #[case::off(false, false)]
    #[case::on(true, true)]
    fn strict_follows_config(#[case] strict: bool, #[case] expect_error: bool) {
        let host = ScriptingHost::try_init(HostConfig::embedded().with_strict(strict)).unwrap();
        let lua = host.lua().unwrap();
        let result = lua.load("return undeclared_global").eval::<Value>();
        assert_eq!(result.is_err(), expect_error, "got: {result:?}");
    }

    #[test]
    fn search_paths_reach_package() {
        let host = ScriptingHost::try_init(HostConfig::embedded()).unwrap();
        let lua = host.lua().unwrap();
        let package: Table = lua.globals().get("package").unwrap();
        assert_eq!(package.get::<String>("path").unwrap(), host.search_paths().lua);
        assert_eq!(package.get::<String>("cpath").unwrap(), host.search_paths().c);
    }

    #[rstest]
    #[case::nil(Value::Nil, 0)]
    #[case::yes(Value::Boolean(true), 0)]
    #[case::no(Value::Boolean(false), 1)]
    #[case::int(Value::Integer(7), 7)]
    #[case::float(Value::Number(3.0), 3)]
    fn exit_codes(#[case] value: Value, #[case] expected: i32) {
        assert_eq!(exit_code_of(&value).unwrap(), expected);
    }

    #[test]
    fn exit_rejects_strings() {
        let lua = Lua::new();
        let s = Value::String(lua.create_string("soon").unwrap());
        assert!(exit_code_of(&s).is_err());
    }

    #[rstest]
    #[case::fraction(2.5)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    #[case::too_large(1e12)]
    fn exit_rejects_non_integral_numbers(#[case] n: f64) {
        let err = exit_code_of(&Value::Number(n)).unwrap_err();
        assert!(err.to_string().contains("integer representation"), "got: {err}");
    }
}
