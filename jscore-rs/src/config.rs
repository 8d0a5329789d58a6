//! Engine configuration file parser.
//!
//! A small line-based format:
//!
//! | Line | Action |
//! |------|--------|
//! | `set max_depth=<n>` | parser nesting bound |
//! | `set max_call_depth=<n>` | function call nesting bound |
//! | `set max_statements=<n>` | per-evaluation statement budget |
//! | `set cache=<bool>` | compile cache on by default |
//! | `<name>=<value>` | seed a scope variable |
//! | Lines starting with `#` or `;` | comment, ignored |
//!
//! Variable values starting with `{` or `[` go through the engine's JSON
//! parse hook when the config is applied; anything else is kept as a string.

use std::path::Path;

use crate::engine::{Engine, Limits};
use crate::error::{Error, ScriptResult};
use crate::scope::Env;
use crate::value::Value;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Engine limits, defaults and seeded variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub limits: Limits,
    /// Turn on `EvalOptions::CACHED` for every evaluation.
    pub cache: bool,
    /// Raw `name=value` pairs in file order.
    pub vars: Vec<(String, String)>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and any errors on individual lines; a bad line
    /// is skipped and does not stop the rest of the file from loading.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = EngineConfig::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let result = match line.strip_prefix("set ") {
                Some(rest) => config.apply_setting(rest.trim()),
                None => config.add_var(line),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> Result<(Self, Vec<ConfigError>), Error> {
        let s = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::load_str(&s))
    }

    /// Add a `NAME=VALUE` variable, as given on a command line or in a file.
    pub fn add_var(&mut self, spec: &str) -> Result<(), String> {
        let (name, value) = split_assignment(spec)?;
        if !is_identifier(name) {
            return Err(format!("invalid variable name '{name}'"));
        }
        self.vars.push((name.to_string(), value.to_string()));
        Ok(())
    }

    /// Declare every configured variable in `env`'s innermost frame.
    pub fn seed_env(&self, engine: &Engine, env: &Env) -> ScriptResult<()> {
        for (name, raw) in &self.vars {
            env.set_local(name, var_value(engine, raw)?);
        }
        Ok(())
    }

    fn apply_setting(&mut self, spec: &str) -> Result<(), String> {
        let (name, value) = split_assignment(spec)?;
        match name {
            "max_depth" => self.limits.max_depth = parse_number(name, value)?,
            "max_call_depth" => self.limits.max_call_depth = parse_number(name, value)?,
            "max_statements" => self.limits.max_statements = parse_number(name, value)?,
            "cache" => self.cache = parse_bool(value)?,
            _ => return Err(format!("unknown setting '{name}'")),
        }
        Ok(())
    }
}

// ── Line helpers ──────────────────────────────────────────────────────────────

fn split_assignment(spec: &str) -> Result<(&str, &str), String> {
    let (name, value) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, found '{spec}'"))?;
    Ok((name.trim(), value.trim()))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{name} expects a non-negative integer, found '{value}'"))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(format!("expected a boolean, found '{value}'")),
    }
}

fn var_value(engine: &Engine, raw: &str) -> ScriptResult<Value> {
    if raw.starts_with('{') || raw.starts_with('[') {
        engine.parse_json(raw.as_bytes())
    } else {
        Ok(Value::from(raw))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -- settings -------------------------------------------------------------

    #[test]
    fn limits_are_read() {
        let (cfg, errs) =
            EngineConfig::load_str("set max_depth=32\nset max_call_depth=20\nset max_statements=1000");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.limits.max_depth, 32);
        assert_eq!(cfg.limits.max_call_depth, 20);
        assert_eq!(cfg.limits.max_statements, 1000);
    }

    #[test]
    fn cache_flag() {
        let (cfg, errs) = EngineConfig::load_str("set cache=on");
        assert!(errs.is_empty(), "{errs:?}");
        assert!(cfg.cache);
    }

    #[test]
    fn bad_settings_are_reported_with_line() {
        let (cfg, errs) = EngineConfig::load_str("set max_depth=lots\n\nset colour=blue");
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].line, 1);
        assert_eq!(errs[1].line, 3);
        assert_eq!(errs[1].to_string(), "line 3: unknown setting 'colour'");
        assert_eq!(cfg.limits, Limits::default());
    }

    // -- variables ------------------------------------------------------------

    #[test]
    fn comments_and_blank_lines_ignored() {
        let (cfg, errs) = EngineConfig::load_str("# one\n; two\n\nS=5\n");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars, vec![("S".to_string(), "5".to_string())]);
    }

    #[test]
    fn junk_lines_are_errors() {
        let (cfg, errs) = EngineConfig::load_str("just words\n1x=2\nok=1");
        assert_eq!(errs.len(), 2);
        assert_eq!(cfg.vars.len(), 1);
    }

    #[test]
    fn seeded_values_use_json_hook() {
        let (cfg, errs) = EngineConfig::load_str("S=5\nD={\"a\": [1, 2]}\nL=[3]");
        assert!(errs.is_empty(), "{errs:?}");
        let engine = Engine::new();
        let env = Env::new();
        cfg.seed_env(&engine, &env).unwrap();
        assert_eq!(engine.eval("S+1", &env).unwrap().to_js_string(), "51");
        assert_eq!(engine.eval("D.a[1] + L[0]", &env).unwrap().to_js_string(), "5");
    }

    #[test]
    fn malformed_json_value_fails_seeding() {
        let (cfg, _) = EngineConfig::load_str("D={oops");
        assert!(cfg.seed_env(&Engine::new(), &Env::new()).is_err());
    }

    // -- files ----------------------------------------------------------------

    #[test]
    fn load_file_reads_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "set max_depth=12\nname=jscore").unwrap();
        let (cfg, errs) = EngineConfig::load_file(f.path()).unwrap();
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.limits.max_depth, 12);
        assert_eq!(cfg.vars[0].1, "jscore");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load_file(&dir.path().join("absent.rc")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn engine_takes_config() {
        let (cfg, _) = EngineConfig::load_str("set cache=1\nset max_statements=5");
        let engine = Engine::with_config(crate::Language::common(), &cfg);
        assert!(engine.default_options().is_cached());
        assert_eq!(engine.limits().max_statements, 5);
    }
}
