//! Command-line argument parsing.
//!
//! Usage:
//!   jscore [-c <config>] [-s NAME=VALUE].. [-e <expr>].. [-f <file>] [--logical] [--json] [-v..]
//!
//! With neither `-e` nor `-f`, lines are read from stdin and evaluated one
//! at a time against a shared scope.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use crate::value::{json, Value};

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Parser, Debug, Default, Clone, PartialEq)]
#[command(name = "jscore", version, about = "Evaluate JavaScript-flavored expressions")]
pub struct CliArgs {
    /// Expression to evaluate; may be repeated.
    #[arg(short, long = "eval", value_name = "EXPR")]
    pub eval: Vec<String>,

    /// Script file to evaluate as one program.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Engine config file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed a variable; may be repeated.
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Evaluate with the boolean "is defined" dialect.
    #[arg(long)]
    pub logical: bool,

    /// Print structured results as compact JSON.
    #[arg(long)]
    pub json: bool,

    /// Log more (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl CliArgs {
    /// Stdin is read when nothing else was given to evaluate.
    pub fn is_repl(&self) -> bool {
        self.eval.is_empty() && self.file.is_none()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Log level from `-v` repetition, falling back to a `JSCORE_LOG` value.
pub fn log_level(verbose: u8, env: Option<&str>) -> Level {
    match verbose {
        0 => env
            .and_then(|s| s.trim().parse::<Level>().ok())
            .unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Render an evaluation result for printing.
pub fn render(value: &Value, as_json: bool) -> String {
    if as_json && value.as_obj().is_some() {
        if let Ok(Some(text)) = json::stringify(value, None) {
            return text;
        }
    }
    value.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("jscore").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_args_is_repl() {
        let args = parse(&[]);
        assert!(args.is_repl());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn repeated_eval_and_set() {
        let args = parse(&["-e", "1+1", "--eval", "S", "-s", "S=5", "--set", "T=6"]);
        assert_eq!(args.eval, vec!["1+1", "S"]);
        assert_eq!(args.set, vec!["S=5", "T=6"]);
        assert!(!args.is_repl());
    }

    #[test]
    fn file_config_and_flags() {
        let args = parse(&["-f", "prog.js", "-c", "engine.rc", "--logical", "--json", "-vv"]);
        assert_eq!(args.file, Some(PathBuf::from("prog.js")));
        assert_eq!(args.config, Some(PathBuf::from("engine.rc")));
        assert!(args.logical && args.json);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(CliArgs::try_parse_from(["jscore", "--bogus"]).is_err());
    }

    #[test]
    fn levels() {
        assert_eq!(log_level(0, None), Level::WARN);
        assert_eq!(log_level(0, Some("info")), Level::INFO);
        assert_eq!(log_level(0, Some("nonsense")), Level::WARN);
        assert_eq!(log_level(1, Some("error")), Level::DEBUG);
        assert_eq!(log_level(3, None), Level::TRACE);
    }

    #[test]
    fn rendering() {
        let v = Value::array(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(render(&v, true), "[1,\"a\"]");
        assert_eq!(render(&Value::from("plain"), true), "plain");
        assert_eq!(render(&Value::Int(3), false), "3");
    }
}
