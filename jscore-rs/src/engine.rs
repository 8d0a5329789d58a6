//! The engine: a language, its global object and the host registries.
//!
//! An [`Engine`] owns everything that outlives a single evaluation: the
//! dialect, the global object (with the standard library installed), the
//! per-kind prototypes, registered `IN` predicates, the JSON parse hook and
//! the compile cache.  Scope chains ([`Env`]) are supplied per call, so one
//! engine can serve many independent scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ast::Program;
use crate::config::EngineConfig;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::grammar::Language;
use crate::lexer;
use crate::options::EvalOptions;
use crate::parser;
use crate::scope::Env;
use crate::stdlib;
use crate::value::json::{self, JsonParser};
use crate::value::{Obj, Value};

// ── Limits ────────────────────────────────────────────────────────────────────

/// Resource bounds applied to every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Bracket nesting while parsing.
    pub max_depth: usize,
    /// Nested function calls while executing.
    pub max_call_depth: usize,
    /// Statements executed per evaluation.
    pub max_statements: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: parser::DEFAULT_MAX_DEPTH,
            max_call_depth: 64,
            max_statements: 10_000_000,
        }
    }
}

// ── Registries ────────────────────────────────────────────────────────────────

/// Host hook consulted by `IN` / `NOT IN` before the built-in rules.
///
/// Returning `None` passes the question on to the next predicate.
pub trait ContainsPredicate {
    fn contains(&self, item: &Value, container: &Value) -> Option<bool>;
}

impl<F> ContainsPredicate for F
where
    F: Fn(&Value, &Value) -> Option<bool>,
{
    fn contains(&self, item: &Value, container: &Value) -> Option<bool> {
        self(item, container)
    }
}

/// Default prototype for each kind of value.
#[derive(Debug, Clone)]
pub struct Prototypes {
    pub object: Obj,
    pub array: Obj,
    pub string: Obj,
    pub number: Obj,
    pub boolean: Obj,
    pub function: Obj,
    pub iterator: Obj,
    pub regexp: Obj,
}

impl Prototypes {
    pub fn for_value(&self, value: &Value) -> Option<&Obj> {
        Some(match value {
            Value::Undefined | Value::Null => return None,
            Value::Bool(_) => &self.boolean,
            Value::Int(_) | Value::Number(_) | Value::NaN => &self.number,
            Value::Str(_) => &self.string,
            Value::Function(_) => &self.function,
            Value::Error(_) => &self.object,
            Value::Structured(o) => {
                if o.callable().is_some() {
                    &self.function
                } else if o.is_iterator() {
                    &self.iterator
                } else if stdlib::regexp::is_regexp(o) {
                    &self.regexp
                } else if o.is_array() {
                    &self.array
                } else {
                    &self.object
                }
            }
        })
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct Engine {
    language: Arc<Language>,
    limits: Limits,
    defaults: EvalOptions,
    globals: Obj,
    prototypes: Prototypes,
    predicates: Vec<Box<dyn ContainsPredicate>>,
    json_parser: JsonParser,
    cache: RefCell<HashMap<String, Rc<Program>>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("language", &self.language.name())
            .field("limits", &self.limits)
            .field("globals", &self.globals.len())
            .field("predicates", &self.predicates.len())
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine for the JavaScript-flavored dialect with the standard library installed.
    pub fn new() -> Self {
        Self::with_language(Language::common())
    }

    /// An engine for the "is defined" dialect.
    pub fn logical() -> Self {
        Self::with_language(Language::logical())
    }

    pub fn with_language(language: Arc<Language>) -> Self {
        let globals = Obj::object();
        let prototypes = stdlib::install(&globals);
        globals.set_named("window", Value::Structured(globals.clone()));
        Engine {
            language,
            limits: Limits::default(),
            defaults: EvalOptions::empty(),
            globals,
            prototypes,
            predicates: Vec::new(),
            json_parser: json::parse,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// An engine for `language` with limits and defaults taken from `config`.
    pub fn with_config(language: Arc<Language>, config: &EngineConfig) -> Self {
        let mut engine = Self::with_language(language).with_limits(config.limits);
        if config.cache {
            engine.defaults.insert(EvalOptions::CACHED);
        }
        engine
    }

    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Options applied by [`Engine::eval`].
    pub fn default_options(&self) -> EvalOptions {
        self.defaults
    }

    pub fn globals(&self) -> &Obj {
        &self.globals
    }

    pub fn prototypes(&self) -> &Prototypes {
        &self.prototypes
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get_named(name)
    }

    /// Member inherited from the default prototype of `value`'s kind.
    pub fn prototype_member(&self, value: &Value, name: &str) -> Option<Value> {
        self.prototypes.for_value(value)?.lookup(name)
    }

    // ── Registries ────────────────────────────────────────────────────────────

    pub fn register_global(&self, name: &str, value: Value) {
        self.globals.set_named(name, value);
    }

    pub fn register_contains<P>(&mut self, predicate: P)
    where
        P: ContainsPredicate + 'static,
    {
        self.predicates.push(Box::new(predicate));
    }

    /// First answer from the registered predicates, in registration order.
    pub fn contains(&self, item: &Value, container: &Value) -> Option<bool> {
        self.predicates.iter().find_map(|p| p.contains(item, container))
    }

    pub fn set_json_parser(&mut self, parser: JsonParser) {
        self.json_parser = parser;
    }

    /// Parse JSON text through the registered hook.
    pub fn parse_json(&self, bytes: &[u8]) -> ScriptResult<Value> {
        (self.json_parser)(bytes).map_err(ScriptError::syntax)
    }

    // ── Compilation ───────────────────────────────────────────────────────────

    pub fn compile(&self, src: &str, place: &str) -> ScriptResult<Program> {
        self.compile_in(&self.language, src, place)
    }

    fn compile_in(&self, language: &Language, src: &str, place: &str) -> ScriptResult<Program> {
        let tokens = lexer::tokenize(src.as_bytes(), place, language)?;
        parser::parse_with_depth(&tokens, language, place, self.limits.max_depth)
    }

    fn compile_cached(&self, src: &str, place: &str) -> ScriptResult<Rc<Program>> {
        if let Some(program) = self.cache.borrow().get(src) {
            debug!(place, "compile cache hit");
            return Ok(Rc::clone(program));
        }
        debug!(place, "compile cache miss");
        let program = Rc::new(self.compile(src, place)?);
        self.cache.borrow_mut().insert(src.to_string(), Rc::clone(&program));
        Ok(program)
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn cached_programs(&self) -> usize {
        self.cache.borrow().len()
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    /// Evaluate `src` against `env` with the engine's default options.
    pub fn eval(&self, src: &str, env: &Env) -> ScriptResult<Value> {
        self.eval_with(src, env, "expression", self.defaults)
    }

    /// Evaluate `src`, labelling errors with `place`.
    pub fn eval_with(&self, src: &str, env: &Env, place: &str, options: EvalOptions) -> ScriptResult<Value> {
        trace!(place, len = src.len(), options = options.bits(), "eval");
        let program = if options.is_cached() {
            self.compile_cached(src, place)?
        } else {
            Rc::new(self.compile(src, place)?)
        };
        Interp::new(self, program, env.clone(), options).run()
    }

    /// Run an already compiled program.
    pub fn eval_program(&self, program: Rc<Program>, env: &Env) -> ScriptResult<Value> {
        Interp::new(self, program, env.clone(), self.defaults).run()
    }

    /// Call a function value from the host.
    pub fn call(&self, callee: &Value, this: Value, args: Vec<Value>, env: &Env) -> ScriptResult<Value> {
        let program = Rc::new(Program::new(Vec::new(), Vec::new(), Rc::from("call")));
        Interp::new(self, program, env.clone(), self.defaults).call(callee, this, args)
    }

    /// Evaluate `src` in the "is defined" dialect regardless of this
    /// engine's own language.  With `EvalOptions::UNDEFINED` each identifier
    /// answers whether it is *not* defined.
    pub fn is_defined_expr(&self, src: &str, env: &Env, options: EvalOptions) -> ScriptResult<bool> {
        let logical = Language::logical();
        let program = Rc::new(self.compile_in(&logical, src, "condition")?);
        let value = Interp::new(self, program, env.clone(), options)
            .with_language(&logical)
            .run()?;
        Ok(value.to_boolean())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn globals_and_window_alias() {
        let engine = Engine::new();
        engine.register_global("answer", Value::Int(42));
        let env = Env::new();
        assert_eq!(engine.eval("answer + 1", &env).unwrap().to_integer(), 43);
        assert_eq!(engine.eval("window.answer", &env).unwrap().to_integer(), 42);
    }

    #[test]
    fn scope_shadows_globals() {
        let engine = Engine::new();
        engine.register_global("x", Value::Int(1));
        let env = Env::new();
        env.set_local("x", Value::Int(2));
        assert_eq!(engine.eval("x", &env).unwrap().to_integer(), 2);
    }

    #[test]
    fn registered_predicate_wins() {
        let mut engine = Engine::new();
        engine.register_contains(|item: &Value, _: &Value| (item.as_str() == Some("magic")).then_some(true));
        let env = Env::new();
        assert!(engine.eval("'magic' IN []", &env).unwrap().to_boolean());
        assert!(!engine.eval("'plain' IN []", &env).unwrap().to_boolean());
    }

    #[test]
    fn cache_reuses_programs() {
        let engine = Engine::new();
        let env = Env::new();
        for _ in 0..3 {
            engine.eval_with("1 + 1", &env, "test", EvalOptions::CACHED).unwrap();
        }
        assert_eq!(engine.cached_programs(), 1);
        engine.eval_with("2 + 2", &env, "test", EvalOptions::empty()).unwrap();
        assert_eq!(engine.cached_programs(), 1);
        engine.clear_cache();
        assert_eq!(engine.cached_programs(), 0);
    }

    #[test]
    fn statement_budget() {
        let engine = Engine::new().with_limits(Limits {
            max_statements: 100,
            ..Limits::default()
        });
        let err = engine.eval("while (true) { x = 1 }", &Env::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
    }

    #[test]
    fn call_depth_limit() {
        let engine = Engine::new().with_limits(Limits {
            max_call_depth: 16,
            ..Limits::default()
        });
        let err = engine
            .eval("function f(n) { return f(n + 1) }; f(0)", &Env::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
        assert_eq!(err.chain, vec!["in function f (x16)".to_string()]);
    }

    #[test]
    fn default_call_depth_fits_a_small_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(|| {
                Engine::new()
                    .eval("function f(n) { return f(n + 1) }; f(0)", &Env::new())
                    .unwrap_err()
                    .kind()
            })
            .unwrap();
        assert_eq!(worker.join().unwrap(), ErrorKind::Limit);
    }

    #[test]
    fn is_defined_expressions() {
        let engine = Engine::new();
        let env = Env::new();
        env.set_local("a", Value::Int(0));
        assert!(engine.is_defined_expr("a && !b", &env, EvalOptions::empty()).unwrap());
        assert!(!engine.is_defined_expr("a && b", &env, EvalOptions::empty()).unwrap());
        assert!(engine.is_defined_expr("b", &env, EvalOptions::UNDEFINED).unwrap());
    }

    #[test]
    fn host_call_of_script_function() {
        let engine = Engine::new();
        let env = Env::new();
        let f = engine.eval("(a, b) => a * b", &env).unwrap();
        let out = engine.call(&f, Value::Undefined, vec![Value::Int(6), Value::Int(7)], &env).unwrap();
        assert_eq!(out.to_integer(), 42);
    }

    #[test]
    fn custom_json_hook() {
        fn reject(_: &[u8]) -> Result<Value, String> {
            Err("no json here".to_string())
        }
        let mut engine = Engine::new();
        engine.set_json_parser(reject);
        let err = engine.eval("JSON.parse('{}')", &Env::new()).unwrap_err();
        assert!(err.message().contains("no json here"));
    }
}
