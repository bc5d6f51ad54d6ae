//! Startup script coordinator.
//!
//! Runs exactly one [`ScriptTask`] as a cooperative task on the host's
//! scheduler, and spins the reactor until the task says it is done:
//!
//! ```text
//! run_script
//!   ├── mark in flight, create stop token
//!   ├── spawn body on LocalSet ──▶ yield_now
//!   │                               ├── replay -l / -e options in order
//!   │                               ├── resolve run mode
//!   │                               ├── run file or stdin script (args as ...)
//!   │                               ├── console.start(args...) if interactive
//!   │                               ├── failure or panic → DiagnosticSink
//!   │                               └── cancel stop token
//!   ├── LocalSet::block_on(reactor, stop.cancelled())
//!   └── clear in flight, take sink
//! ```
//!
//! The task's `JoinHandle` is never awaited: a script may call `os.exit`,
//! which stops the reactor and leaves the task suspended for good. The
//! sink is the only channel the outcome travels through.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use mlua::{Function, Lua, Value, Variadic};
use tarn_types::{ScriptOption, ScriptTask, StdinSource, Target};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::diag::{Diagnostic, DiagnosticKind};
use crate::host::{HostInner, ScriptingHost};
use crate::modules::loaded_table;
use crate::native::FIBER_NAME;
use crate::reactor::Reactor;

/// Chunk name for `-e` snippets.
const INLINE_CHUNK_NAME: &str = "=(command line)";

/// Chunk name for scripts read from standard input.
const STDIN_CHUNK_NAME: &str = "=stdin";

/// Where the script body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    File(PathBuf),
    Stdin,
}

/// What a task will run once its options have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Script to run, if any.
    pub source: Option<ScriptSource>,
    /// Open the console afterwards.
    pub interactive: bool,
}

impl RunPlan {
    /// Decide the run mode.
    ///
    /// 1. an existing file target runs the file;
    /// 2. otherwise a non-terminal stdin, or an explicit `-`, runs stdin;
    /// 3. otherwise the console opens, whatever `interactive` says.
    ///
    /// In cases 1 and 2 the console still opens afterwards if `interactive`
    /// is set.
    pub fn resolve(
        target: &Target,
        interactive: bool,
        stdin_is_terminal: bool,
        exists: impl Fn(&Path) -> bool,
    ) -> Self {
        if let Some(path) = target.path() {
            if exists(path) {
                return Self {
                    source: Some(ScriptSource::File(path.to_path_buf())),
                    interactive,
                };
            }
        }

        if !stdin_is_terminal || *target == Target::Stdin {
            return Self {
                source: Some(ScriptSource::Stdin),
                interactive,
            };
        }

        Self {
            source: None,
            interactive: true,
        }
    }
}

/// Whether the task's standard input is a terminal.
fn stdin_is_terminal(stdin: &StdinSource) -> bool {
    match stdin {
        StdinSource::Inherit => std::io::stdin().is_terminal(),
        StdinSource::Piped(_) => false,
        StdinSource::Terminal => true,
    }
}

/// Run one startup task to completion and report its outcome.
///
/// Returns `Ok(())` when the task finished (or asked to exit) without
/// recording a diagnostic.
pub fn run_script(
    host: &ScriptingHost,
    reactor: &Reactor,
    task: ScriptTask,
) -> Result<(), Diagnostic> {
    let inner = host.inner().clone();
    let lua = host
        .lua()
        .map_err(|e| Diagnostic::new(DiagnosticKind::Host, e.to_string()))?;
    if inner.in_flight.get() {
        return Err(Diagnostic::new(
            DiagnosticKind::Host,
            "a startup script is already running",
        ));
    }

    let title = task.title();
    tracing::info!(task = %title, "starting script");

    let stop = CancellationToken::new();
    *inner.stop.borrow_mut() = Some(stop.clone());
    inner.in_flight.set(true);

    let body = {
        let inner = inner.clone();
        let stop = stop.clone();
        async move {
            // Cancels on completion and also if the body unwinds.
            let _done = stop.drop_guard();
            let mut completion = Completion::new(&inner);

            // Let the coordinator enter the reactor before any script code runs.
            tokio::task::yield_now().await;

            if let Err(diag) = execute(&lua, &inner, &task).await {
                if diag.kind == DiagnosticKind::OutOfMemory {
                    inner.panic_handler.fatal(&lua, &diag.message);
                }
                tracing::debug!(kind = %diag.kind, "script failed");
                inner.sink.set(diag);
            }
            completion.finish();
        }
    };
    let span = tracing::info_span!("script", name = %title);
    let body = FIBER_NAME.scope(title.clone(), body.instrument(span));

    let driven = inner.with_scheduler(|local| {
        let _ = local.spawn_local(body);
        local.block_on(reactor.runtime(), stop.cancelled());
    });

    inner.in_flight.set(false);
    inner.stop.borrow_mut().take();
    driven.map_err(|e| Diagnostic::new(DiagnosticKind::Host, e.to_string()))?;

    match inner.sink.take() {
        None => {
            tracing::info!(task = %title, "script finished");
            Ok(())
        }
        Some(diag) => {
            tracing::info!(task = %title, kind = %diag.kind, "script failed");
            Err(diag)
        }
    }
}

/// Records a failure if the task body is dropped before it finishes.
///
/// A body unwinds when native code panics; the scheduler swallows the panic,
/// so this is the only trace it leaves. Bodies abandoned by `os.exit` are
/// left alone.
struct Completion<'a> {
    inner: &'a HostInner,
    finished: bool,
}

impl<'a> Completion<'a> {
    fn new(inner: &'a HostInner) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if self.finished || self.inner.exit_requested() {
            return;
        }
        let message = if std::thread::panicking() {
            "script task panicked"
        } else {
            "script task was dropped before it finished"
        };
        self.inner.sink.set(Diagnostic::new(DiagnosticKind::Host, message));
    }
}

async fn execute(lua: &Lua, inner: &HostInner, task: &ScriptTask) -> Result<(), Diagnostic> {
    for option in &task.options {
        apply_option(lua, option).await?;
    }

    // Options may create or remove the target, so look only now.
    let plan = RunPlan::resolve(
        &task.target,
        task.interactive,
        stdin_is_terminal(&task.stdin),
        |p| p.exists(),
    );
    tracing::debug!(?plan, "run mode");

    if let Some(source) = &plan.source {
        let chunk = load_script(lua, inner, source, &task.stdin).await?;
        chunk
            .call_async::<()>(script_args(&task.args))
            .await
            .map_err(|e| Diagnostic::from_lua(DiagnosticKind::Runtime, &e))?;
    }

    if plan.interactive {
        start_console(lua, &task.args).await?;
    }

    Ok(())
}

fn script_args(args: &[String]) -> Variadic<String> {
    args.iter().cloned().collect()
}

async fn apply_option(lua: &Lua, option: &ScriptOption) -> Result<(), Diagnostic> {
    match option {
        ScriptOption::LoadModule(name) => {
            tracing::debug!(module = %name, "preloading module");
            let require: Function = lua.globals().get("require")?;
            let module: Value = require
                .call_async(name.as_str())
                .await
                .map_err(|e| Diagnostic::from_lua(DiagnosticKind::ModuleLoad, &e))?;
            lua.globals().set(name.as_str(), module)?;
        }
        ScriptOption::EvalInline(source) => {
            let chunk = lua
                .load(source.as_str())
                .set_name(INLINE_CHUNK_NAME)
                .into_function()
                .map_err(|e| Diagnostic::from_lua(DiagnosticKind::Syntax, &e))?;
            chunk
                .call_async::<()>(())
                .await
                .map_err(|e| Diagnostic::from_lua(DiagnosticKind::Runtime, &e))?;
        }
    }
    Ok(())
}

async fn load_script(
    lua: &Lua,
    inner: &HostInner,
    source: &ScriptSource,
    stdin: &StdinSource,
) -> Result<Function, Diagnostic> {
    match source {
        ScriptSource::File(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                Diagnostic::new(DiagnosticKind::Io, format!("{}: {e}", path.display()))
            })?;
            compile(lua, &bytes, &format!("@{}", path.display()))
        }
        ScriptSource::Stdin => {
            let mut buf = inner.io_buffer.take();
            let read = match stdin {
                StdinSource::Inherit => tokio::io::stdin().read_to_end(&mut buf).await.map(|_| ()),
                StdinSource::Piped(bytes) => {
                    buf.extend_from_slice(bytes);
                    Ok(())
                }
                StdinSource::Terminal => Ok(()),
            };
            let compiled = match read {
                Ok(()) => compile(lua, &buf, STDIN_CHUNK_NAME),
                Err(e) => Err(Diagnostic::new(DiagnosticKind::Io, format!("stdin: {e}"))),
            };
            inner.io_buffer.restore(buf);
            compiled
        }
    }
}

fn compile(lua: &Lua, source: &[u8], name: &str) -> Result<Function, Diagnostic> {
    lua.load(skip_shebang(source))
        .set_name(name)
        .into_function()
        .map_err(|e| Diagnostic::from_lua(DiagnosticKind::Syntax, &e))
}

/// Drop a leading `#` line, keeping its newline so line numbers hold.
fn skip_shebang(source: &[u8]) -> &[u8] {
    if !source.starts_with(b"#") {
        return source;
    }
    match source.iter().position(|&b| b == b'\n') {
        Some(end) => &source[end..],
        None => &[],
    }
}

async fn start_console(lua: &Lua, args: &[String]) -> Result<(), Diagnostic> {
    let console: Value = loaded_table(lua)?.get("console")?;
    let Value::Table(console) = console else {
        return Err(Diagnostic::new(
            DiagnosticKind::Console,
            "interactive console is not available",
        ));
    };
    let start: Function = console
        .get("start")
        .map_err(|e| Diagnostic::from_lua(DiagnosticKind::Console, &e))?;
    start
        .call_async::<()>(script_args(args))
        .await
        .map_err(|e| Diagnostic::from_lua(DiagnosticKind::Runtime, &e))
}
