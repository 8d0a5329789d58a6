//! Runtime values.
//!
//! Every expression evaluates to a [`Value`].  Scalars are stored inline;
//! arrays and objects live behind a shared [`Obj`] handle so that passing
//! them around aliases rather than copies.

mod arith;
mod coerce;
mod compare;
pub mod json;
mod structured;

use std::fmt;
use std::rc::Rc;

pub use coerce::{format_number, parse_number_str, Numeric};
pub use compare::{deep_equals, CompareMode, Comparison};
pub use structured::{array_index, Extra, Field, Kind, Obj, MAX_PROTO_DEPTH};

use crate::function::Function;

/// A dynamically typed runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    /// Finite or infinite float; never NaN.
    Number(f64),
    NaN,
    Str(Rc<str>),
    Function(Rc<Function>),
    Structured(Obj),
    /// Value thrown by `throw` or produced by a failed host call.
    Error(Rc<str>),
}

impl Value {
    /// Wrap a float, folding NaN into [`Value::NaN`].
    pub fn number(f: f64) -> Value {
        if f.is_nan() {
            Value::NaN
        } else {
            Value::Number(f)
        }
    }

    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Structured(Obj::array(items))
    }

    /// `typeof` name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Number(_) | Value::NaN => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Structured(o) if o.callable().is_some() => "function",
            Value::Structured(_) => "object",
            Value::Error(_) => "error",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Number(_) | Value::NaN)
    }

    pub fn as_obj(&self) -> Option<&Obj> {
        match self {
            Value::Structured(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The function invoked when this value is called, if any.
    pub fn callable(&self) -> Option<Rc<Function>> {
        match self {
            Value::Function(f) => Some(Rc::clone(f)),
            Value::Structured(o) => o.callable(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Structured(o) => f.write_str(&json::to_pretty(o)),
            other => f.write_str(&other.to_js_string()),
        }
    }
}

/// Structural equality; `NaN` is never equal to itself.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        compare::deep_equals(self, other)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Value {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Value {
        i64::try_from(n).map_or(Value::Number(n as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::number(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<Obj> for Value {
    fn from(o: Obj) -> Value {
        Value::Structured(o)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::array(items)
    }
}

impl From<Rc<Function>> for Value {
    fn from(f: Rc<Function>) -> Value {
        Value::Function(f)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_folds_nan() {
        assert!(matches!(Value::number(f64::NAN), Value::NaN));
        assert!(matches!(Value::number(1.5), Value::Number(_)));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "object");
        assert_eq!(Value::NaN.type_name(), "number");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::array(vec![]).type_name(), "object");
        assert_eq!(Value::Undefined.type_name(), "undefined");
    }

    #[test]
    fn display_structured_is_pretty_json() {
        let o = Obj::object();
        o.set_named("a", Value::Int(1));
        assert_eq!(Value::from(o).to_string(), "{\n  \"a\": 1\n}");
        assert_eq!(Value::array(vec![Value::Int(1), Value::Int(2)]).to_string(), "[\n  1,\n  2\n]");
    }

    #[test]
    fn equality_is_structural() {
        let a = Value::array(vec![Value::Int(1), Value::from("x")]);
        let b = Value::array(vec![Value::Number(1.0), Value::from("x")]);
        assert_eq!(a, b);
        assert_ne!(Value::NaN, Value::NaN);
    }
}
