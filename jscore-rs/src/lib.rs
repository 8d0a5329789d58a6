//! jscore: an embeddable, JavaScript-flavored expression and scripting engine.
//!
//! Source bytes flow through a table-driven [`lexer`], a precedence-climbing
//! [`parser`] and a tree-walking executor ([`exec`]) that evaluates the
//! resulting forest against a caller-supplied scope chain ([`Env`]).
//!
//! # Quick start
//!
//! ```rust
//! use jscore::{Engine, Env, Value};
//!
//! let engine = Engine::new();
//! let env = Env::new();
//! env.set_local("S", Value::from("5"));
//! assert_eq!(engine.eval("S+1", &env).unwrap().to_string(), "51");
//! assert_eq!(engine.eval("+S+1", &env).unwrap().to_string(), "6");
//! ```

pub mod ast;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod function;
pub mod grammar;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod scope;
pub mod stdlib;
pub mod token;
pub mod value;

// Re-exports for convenience.
pub use engine::{ContainsPredicate, Engine, Limits};
pub use error::{Error, ErrorKind, ScriptError, ScriptResult};
pub use grammar::Language;
pub use options::{EvalOptions, GrammarOptions};
pub use scope::Env;
pub use value::{Obj, Value};
