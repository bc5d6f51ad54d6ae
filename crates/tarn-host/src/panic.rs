//! Fatal interpreter faults.
//!
//! A fault here is anything the host cannot recover from: a Rust panic
//! raised while Lua code is on the stack, or the interpreter running out of
//! memory. Script errors are not faults; they go to the diagnostic sink.
//!
//! On a fault the handler logs the problem at error level, optionally a
//! native backtrace, and then one line per interpreter frame:
//!
//! ```text
//! #1 explode (local), builtin/fiber.lua:12
//! #2 ? (), init.lua:3
//! ```
//!
//! It never resumes execution. The panic hook chains to the previously
//! installed hook so the default unwind/abort path carries on.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;

use mlua::{Lua, WeakLua};

/// One interpreter stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stack level, 1 = innermost caller.
    pub level: usize,
    /// Function name, `?` if unknown.
    pub name: String,
    /// How the name was found (`global`, `local`, `method`, `field`, ...).
    pub name_what: String,
    /// Short source label.
    pub source: String,
    /// Current line, -1 if unavailable.
    pub line: i32,
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} ({}), {}:{}",
            self.level, self.name, self.name_what, self.source, self.line
        )
    }
}

/// Logs unrecoverable faults with the interpreter's call stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanicHandler {
    capture_backtrace: bool,
}

impl PanicHandler {
    pub fn new(capture_backtrace: bool) -> Self {
        Self { capture_backtrace }
    }

    /// Log `problem` and the interpreter stack; return the frames walked.
    pub fn report(&self, lua: &Lua, problem: &str) -> Vec<Frame> {
        if self.capture_backtrace {
            let backtrace = Backtrace::force_capture();
            tracing::error!("native backtrace:\n{backtrace}");
        }
        tracing::error!("{problem}");

        let mut frames = Vec::new();
        let mut level = 1;
        while let Some(debug) = lua.inspect_stack(level) {
            let names = debug.names();
            let source = debug.source();
            let frame = Frame {
                level,
                name: names.name.as_deref().unwrap_or("?").to_string(),
                name_what: names.name_what.as_deref().unwrap_or("").to_string(),
                source: source.short_src.as_deref().unwrap_or("?").to_string(),
                line: debug.curr_line(),
            };
            tracing::error!("{frame}");
            frames.push(frame);
            level += 1;
        }
        frames
    }

    /// Report and abort the process.
    pub fn fatal(&self, lua: &Lua, problem: &str) -> ! {
        self.report(lua, problem);
        std::process::abort()
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<(WeakLua, PanicHandler)>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Route panics on this thread through `handler`, with `lua`'s stack.
pub fn install(lua: &Lua, handler: PanicHandler) {
    ACTIVE.with(|active| *active.borrow_mut() = Some((lua.weak(), handler)));

    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let problem = match info.payload().downcast_ref::<&str>() {
                Some(s) => (*s).to_string(),
                None => match info.payload().downcast_ref::<String>() {
                    Some(s) => s.clone(),
                    None => "Box<dyn Any>".to_string(),
                },
            };
            let problem = match info.location() {
                Some(loc) => format!("{problem} at {}:{}", loc.file(), loc.line()),
                None => problem,
            };
            let _ = ACTIVE.try_with(|active| {
                let Ok(active) = active.try_borrow() else {
                    return;
                };
                if let Some((weak, handler)) = active.as_ref() {
                    if let Some(lua) = weak.try_upgrade() {
                        handler.report(&lua, &problem);
                    }
                }
            });
            previous(info);
        }));
    });
}

/// Stop routing this thread's panics to a host.
pub fn uninstall() {
    let _ = ACTIVE.try_with(|active| {
        if let Ok(mut active) = active.try_borrow_mut() {
            active.take();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_nested_frames() {
        let lua = Lua::new();
        let captured = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = captured.clone();
        let capture = lua
            .create_function(move |lua, ()| {
                *sink.borrow_mut() = PanicHandler::default().report(lua, "capture");
                Ok(())
            })
            .unwrap();
        lua.globals().set("capture", capture).unwrap();

        lua.load(
            r#"
            local function inner() capture() end
            function outer() inner() end
            outer()
            "#,
        )
        .set_name("=faults")
        .exec()
        .unwrap();

        let frames = captured.borrow();
        assert!(frames.len() >= 3, "expected nested frames, got {frames:?}");
        assert_eq!(frames[0].name, "inner");
        assert_eq!(frames[0].source, "faults");
        assert_eq!(frames[0].line, 2);
        assert_eq!(frames[1].name, "outer");
        assert_eq!(frames[1].line, 3);
    }

    #[test]
    fn report_outside_lua_has_no_frames() {
        let lua = Lua::new();
        assert!(PanicHandler::new(false).report(&lua, "idle").is_empty());
    }

    #[test]
    fn frame_display_matches_log_format() {
        let frame = Frame {
            level: 2,
            name: "boot".to_string(),
            name_what: "global".to_string(),
            source: "init.lua".to_string(),
            line: 7,
        };
        assert_eq!(frame.to_string(), "#2 boot (global), init.lua:7");
    }
}
