//! The interactive Lua console.
//!
//! Registered as `package.loaded.console`; the coordinator calls
//! `console.start(...)` when a task runs interactively. Line editing runs on
//! a blocking thread so the reactor keeps serving other tasks while the
//! console waits for input.
//!
//! ```text
//! console task (Lua)                 reader thread (rustyline)
//!   ── prompt ─────────────────────▶  readline()
//!   ◀──────────────────── Input ────
//!   eval, print, repeat
//! ```

use std::path::PathBuf;
use std::sync::mpsc;

use mlua::{Lua, MultiValue};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tarn_host::metadata;
use tarn_host::modules::loaded_table;
use tarn_host::paths::data_dir;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::format::format_values;

const PROMPT: &str = "tarn> ";

/// Chunk name for console input.
const CHUNK_NAME: &str = "=console";

/// One result from the line reader.
#[derive(Debug)]
enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

/// Register the console as `package.loaded.console`.
pub fn install(lua: &Lua) -> mlua::Result<()> {
    let console = lua.create_table()?;
    console.set(
        "start",
        lua.create_async_function(|lua, ()| async move { run(lua).await })?,
    )?;
    loaded_table(lua)?.set("console", console)
}

fn history_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("history.txt"))
}

async fn run(lua: Lua) -> mlua::Result<()> {
    println!("{} {}", metadata::PACKAGE, metadata::version());
    println!("type 'help' for interactive help");

    let (prompts, prompt_rx) = mpsc::channel::<String>();
    let (line_tx, mut lines) = unbounded_channel();
    let reader = tokio::task::spawn_blocking(move || read_lines(history_path(), prompt_rx, line_tx));

    loop {
        if prompts.send(PROMPT.to_string()).is_err() {
            break;
        }
        let Some(input) = lines.recv().await else {
            break;
        };
        match input {
            Input::Line(line) => {
                let line = line.trim();
                match line {
                    "" => {}
                    "\\q" => break,
                    "help" => println!("{}", help_text(&lua)),
                    _ => match eval_line(&lua, line).await {
                        Ok(values) if values.is_empty() => {}
                        Ok(values) => println!("{}", format_values(&values)),
                        Err(e) => eprintln!("error: {e}"),
                    },
                }
            }
            Input::Interrupted => println!("^C"),
            Input::Eof => break,
            Input::Failed(e) => {
                eprintln!("error: {e}");
                break;
            }
        }
    }

    // Closing the prompt channel lets the reader save history and exit.
    drop(prompts);
    if let Err(e) = reader.await {
        tracing::warn!("console reader failed: {e}");
    }
    Ok(())
}

/// Evaluate one line, as an expression if it parses as one.
pub async fn eval_line(lua: &Lua, line: &str) -> mlua::Result<MultiValue> {
    let func = match lua
        .load(format!("return {line}"))
        .set_name(CHUNK_NAME)
        .into_function()
    {
        Ok(func) => func,
        Err(_) => lua.load(line).set_name(CHUNK_NAME).into_function()?,
    };
    func.call_async(()).await
}

fn help_text(lua: &Lua) -> String {
    let text = lua
        .load("return require('help')()")
        .set_name(CHUNK_NAME)
        .eval::<String>();
    match text {
        Ok(text) => text,
        Err(e) => format!("help is unavailable: {e}"),
    }
}

/// Blocking line reader. Reads one line per prompt received.
fn read_lines(
    history: Option<PathBuf>,
    prompts: mpsc::Receiver<String>,
    lines: UnboundedSender<Input>,
) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            let _ = lines.send(Input::Failed(format!("failed to create editor: {e}")));
            return;
        }
    };

    if let Some(path) = &history {
        if let Err(e) = rl.load_history(path) {
            // Missing history is expected on first run.
            let not_found = matches!(&e, ReadlineError::Io(io) if io.kind() == std::io::ErrorKind::NotFound);
            if !not_found {
                tracing::warn!("failed to load history: {e}");
            }
        }
    }

    while let Ok(prompt) = prompts.recv() {
        let input = match rl.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = rl.add_history_entry(line.as_str()) {
                        tracing::warn!("failed to add history entry: {e}");
                    }
                }
                Input::Line(line)
            }
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(e) => Input::Failed(e.to_string()),
        };
        let last = matches!(input, Input::Eof | Input::Failed(_));
        if lines.send(input).is_err() || last {
            break;
        }
    }

    if let Some(path) = &history {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create history directory: {e}");
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("failed to save history: {e}");
        }
    }
}
