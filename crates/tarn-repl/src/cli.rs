//! Command-line parsing.
//!
//! ```text
//! tarn [OPTIONS] [SCRIPT [ARGS...]]
//! ```
//!
//! Options are read up to the first non-option argument, which names the
//! script (`-` for standard input). Everything after the script is passed to
//! it untouched. `--` ends option parsing.

use anyhow::{bail, Context, Result};
use tarn_types::{ScriptTask, Target};

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a startup task.
    Run(Invocation),
    /// Print usage.
    Help,
    /// Print the version.
    Version,
    /// Print build metadata as JSON.
    BuildInfo,
}

/// A parsed startup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub task: ScriptTask,
    /// Script name followed by its arguments, for the `arg` table.
    pub argv: Vec<String>,
}

/// Parse arguments (without the program name).
pub fn parse<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut task = ScriptTask::default();
    let mut script: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--build-info" => return Ok(Command::BuildInfo),
            "-i" => task.interactive = true,
            "-l" => {
                let name = args.next().context("'-l' requires a module name")?;
                task = task.load_module(name);
            }
            "-e" => {
                let source = args.next().context("'-e' requires an expression")?;
                task = task.eval(source);
            }
            "--" => {
                script = args.next();
                break;
            }
            "-" => {
                script = Some(arg);
                break;
            }
            other if other.starts_with("-l") => task = task.load_module(&other[2..]),
            other if other.starts_with("-e") => task = task.eval(&other[2..]),
            other if other.starts_with('-') => {
                bail!("unrecognized option '{other}' (see 'tarn --help')")
            }
            _ => {
                script = Some(arg);
                break;
            }
        }
    }

    let rest: Vec<String> = args.collect();
    task.target = Target::from_arg(script.as_deref());
    task.args = rest.clone();

    let argv = match script {
        Some(script) => std::iter::once(script).chain(rest).collect(),
        None => Vec::new(),
    };

    Ok(Command::Run(Invocation { task, argv }))
}

/// Usage text for `--help`.
pub fn usage() -> String {
    format!(
        r#"tarn v{}

Usage:
  tarn [OPTIONS] [SCRIPT [ARGS...]]

Options:
  -l NAME          require library NAME and bind it to global NAME
  -e EXPR          execute string EXPR
  -i               enter the interactive console after running SCRIPT
  -V, --version    print version and exit
  --build-info     print build metadata as JSON and exit
  -h, --help       show this help
  --               stop handling options
  -                read the script from standard input

With no SCRIPT, tarn reads standard input when it is not a terminal and
opens the interactive console otherwise.

Environment:
  LUA_PATH, LUA_CPATH   module search paths (';;' splices in the default)
  RUST_LOG              log filter, e.g. RUST_LOG=tarn::script=debug
"#,
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tarn_types::ScriptOption;

    fn run(args: &[&str]) -> Invocation {
        match parse(args.iter().map(|s| s.to_string())).unwrap() {
            Command::Run(inv) => inv,
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn no_arguments() {
        let inv = run(&[]);
        assert_eq!(inv.task.target, Target::None);
        assert!(!inv.task.interactive);
        assert!(inv.argv.is_empty());
    }

    #[test]
    fn options_keep_command_line_order() {
        let inv = run(&["-l", "fiber", "-e", "x = 1", "-lfio", "-ey = 2", "init.lua"]);
        assert_eq!(
            inv.task.options,
            vec![
                ScriptOption::LoadModule("fiber".to_string()),
                ScriptOption::EvalInline("x = 1".to_string()),
                ScriptOption::LoadModule("fio".to_string()),
                ScriptOption::EvalInline("y = 2".to_string()),
            ]
        );
        assert_eq!(inv.task.target, Target::Path("init.lua".into()));
    }

    #[test]
    fn arguments_after_script_belong_to_it() {
        let inv = run(&["-i", "init.lua", "-e", "--port", "3301"]);
        assert!(inv.task.interactive);
        assert!(inv.task.options.is_empty());
        assert_eq!(inv.task.args, vec!["-e", "--port", "3301"]);
        assert_eq!(inv.argv, vec!["init.lua", "-e", "--port", "3301"]);
    }

    #[test]
    fn dash_reads_stdin() {
        let inv = run(&["-", "a"]);
        assert_eq!(inv.task.target, Target::Stdin);
        assert_eq!(inv.task.args, vec!["a"]);
        assert_eq!(inv.argv, vec!["-", "a"]);
    }

    #[test]
    fn double_dash_ends_options() {
        let inv = run(&["--", "-weird.lua", "x"]);
        assert_eq!(inv.task.target, Target::Path("-weird.lua".into()));
        assert_eq!(inv.task.args, vec!["x"]);
    }

    #[rstest]
    #[case::help("-h", Command::Help)]
    #[case::long_help("--help", Command::Help)]
    #[case::version("-V", Command::Version)]
    #[case::long_version("--version", Command::Version)]
    #[case::build("--build-info", Command::BuildInfo)]
    fn informational_flags(#[case] flag: &str, #[case] expected: Command) {
        assert_eq!(parse([flag.to_string()]).unwrap(), expected);
    }

    #[rstest]
    #[case::missing_module(&["-l"], "module name")]
    #[case::missing_expr(&["-e"], "expression")]
    #[case::unknown(&["-x"], "unrecognized option '-x'")]
    fn bad_arguments(#[case] args: &[&str], #[case] expected: &str) {
        let err = parse(args.iter().map(|s| s.to_string())).unwrap_err();
        assert!(err.to_string().contains(expected), "got: {err}");
    }

    #[test]
    fn usage_mentions_every_option() {
        let text = usage();
        for flag in ["-l NAME", "-e EXPR", "-i", "--version", "--build-info", "--help"] {
            assert!(text.contains(flag), "usage is missing {flag}");
        }
    }
}
