//! Startup requests: what the host should run and how.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the startup script comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Target {
    /// No script given.
    #[default]
    None,
    /// Explicit `-`: read the script from standard input.
    Stdin,
    /// A script file.
    Path(PathBuf),
}

impl Target {
    /// Interpret a command-line script argument.
    ///
    /// `-` selects standard input; anything else is a path.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => Target::None,
            Some("-") => Target::Stdin,
            Some(path) => Target::Path(PathBuf::from(path)),
        }
    }

    /// The script path, if the target is a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Target::Path(p) => Some(p),
            _ => None,
        }
    }
}

/// One `-l` / `-e` option, replayed in order before the script runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum ScriptOption {
    /// `require(name)` and bind the result to the global `name`.
    LoadModule(String),
    /// Compile and run a literal chunk.
    EvalInline(String),
}

/// Where standard input comes from.
///
/// `Inherit` uses the process descriptor. The other variants let embedders
/// hand the task an input without touching the process descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StdinSource {
    #[default]
    Inherit,
    /// Non-terminal input with the given contents.
    Piped(Vec<u8>),
    /// A terminal with nothing buffered.
    Terminal,
}

/// A single startup request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptTask {
    /// Script to execute.
    pub target: Target,
    /// Open the interactive console after (or instead of) the script.
    pub interactive: bool,
    /// Preload and eval options, in command-line order.
    pub options: Vec<ScriptOption>,
    /// Arguments passed to the script as `...`.
    pub args: Vec<String>,
    /// Standard input for the task.
    pub stdin: StdinSource,
}

impl ScriptTask {
    /// Create a task for the given target.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Create a task that runs a script file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Target::Path(path.into()))
    }

    /// Create a task that reads its script from standard input.
    pub fn stdin() -> Self {
        Self::new(Target::Stdin)
    }

    /// Append a `load-module` option.
    pub fn load_module(mut self, name: impl Into<String>) -> Self {
        self.options.push(ScriptOption::LoadModule(name.into()));
        self
    }

    /// Append an `eval-inline` option.
    pub fn eval(mut self, source: impl Into<String>) -> Self {
        self.options.push(ScriptOption::EvalInline(source.into()));
        self
    }

    /// Set the interactive flag.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Set the residual argument vector.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the standard input source.
    pub fn with_stdin(mut self, stdin: StdinSource) -> Self {
        self.stdin = stdin;
        self
    }

    /// Task name for logs: the target's basename, or `interactive`.
    pub fn title(&self) -> String {
        match &self.target {
            Target::None => "interactive".to_string(),
            Target::Stdin => "-".to_string(),
            Target::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.to_string_lossy().into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdin() {
        assert_eq!(Target::from_arg(Some("-")), Target::Stdin);
        assert_eq!(Target::from_arg(None), Target::None);
        assert_eq!(
            Target::from_arg(Some("init.lua")),
            Target::Path(PathBuf::from("init.lua"))
        );
    }

    #[test]
    fn title_is_basename() {
        assert_eq!(ScriptTask::file("/srv/app/init.lua").title(), "init.lua");
        assert_eq!(ScriptTask::new(Target::None).title(), "interactive");
        assert_eq!(ScriptTask::stdin().title(), "-");
    }

    #[test]
    fn options_keep_insertion_order() {
        let task = ScriptTask::new(Target::None)
            .load_module("a")
            .eval("x = 1")
            .load_module("b");
        assert_eq!(
            task.options,
            vec![
                ScriptOption::LoadModule("a".into()),
                ScriptOption::EvalInline("x = 1".into()),
                ScriptOption::LoadModule("b".into()),
            ]
        );
    }

    #[test]
    fn option_serializes_with_kind_tag() {
        let json = serde_json::to_string(&ScriptOption::LoadModule("fio".into())).unwrap();
        assert_eq!(json, r#"{"kind":"load-module","value":"fio"}"#);
    }
}
