//! Standard library.
//!
//! [`install`] fills an engine's global object with the constructors,
//! namespaces and global functions, and returns the per-kind prototypes the
//! executor falls back to for member lookups.  Every built-in is a
//! [`NativeFn`](crate::function::NativeFn): it receives the interpreter,
//! the receiver and the evaluated arguments.

pub mod array;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;

use crate::engine::Prototypes;
use crate::function::{Function, NativeFn};
use crate::value::{Extra, Obj, Value};

/// Populate `globals` and build the default prototypes.
pub fn install(globals: &Obj) -> Prototypes {
    let object = object::prototype();
    let derived = || Obj::object().with_proto(Some(object.clone()));
    let protos = Prototypes {
        array: derived(),
        string: derived(),
        number: derived(),
        boolean: derived(),
        function: derived(),
        iterator: derived(),
        regexp: derived(),
        object,
    };
    object::install(globals, &protos);
    array::install(globals, &protos);
    string::install(globals, &protos);
    number::install(globals, &protos);
    function::install(globals, &protos);
    regexp::install(globals, &protos);
    math::install(globals);
    json::install(globals);
    global::install(globals);
    protos
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Argument `i`, or `undefined`.
pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

pub(crate) fn method(target: &Obj, name: &str, f: NativeFn) {
    target.set_named(name, Value::Function(Function::native(name, f)));
}

/// A computed property: reading `target.name` calls `f` with the receiver.
pub(crate) fn getter(target: &Obj, name: &str, f: NativeFn) {
    target.set_named(name, Value::Function(Function::immediate(name, f)));
}

/// A callable object carrying static members, linked both ways with `proto`.
pub(crate) fn constructor(globals: &Obj, name: &str, f: NativeFn, proto: &Obj) -> Obj {
    let ctor = Obj::object().with_extra(Extra::Callable(Function::native(name, f)));
    ctor.set_named("prototype", Value::Structured(proto.clone()));
    proto.set_named("constructor", Value::Structured(ctor.clone()));
    globals.set_named(name, Value::Structured(ctor.clone()));
    ctor
}

/// A plain namespace object such as `Math`.
pub(crate) fn namespace(globals: &Obj, name: &str) -> Obj {
    let ns = Obj::object();
    globals.set_named(name, Value::Structured(ns.clone()));
    ns
}

/// Resolve a relative position (negative counts from the end) into `0..=len`.
pub(crate) fn relative_index(v: &Value, len: usize, default: usize) -> usize {
    if matches!(v, Value::Undefined) {
        return default;
    }
    let n = v.to_number();
    if n.is_nan() {
        return 0;
    }
    if n < 0.0 {
        let back = (-n).min(len as f64) as usize;
        len - back
    } else {
        n.min(len as f64) as usize
    }
}

/// Wrap a float result, narrowing integral values to `Int`.
pub(crate) fn integral(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 && !(f == 0.0 && f.is_sign_negative()) {
        Value::Int(f as i64)
    } else {
        Value::number(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_positions() {
        assert_eq!(relative_index(&Value::Int(-1), 5, 0), 4);
        assert_eq!(relative_index(&Value::Int(-10), 5, 0), 0);
        assert_eq!(relative_index(&Value::Int(10), 5, 0), 5);
        assert_eq!(relative_index(&Value::Undefined, 5, 5), 5);
        assert_eq!(relative_index(&Value::NaN, 5, 5), 0);
    }

    #[test]
    fn integral_narrowing() {
        assert!(matches!(integral(3.0), Value::Int(3)));
        assert!(matches!(integral(3.5), Value::Number(_)));
        assert!(matches!(integral(f64::NAN), Value::NaN));
    }

    #[test]
    fn prototypes_chain_to_object() {
        let globals = Obj::object();
        let protos = install(&globals);
        assert!(protos.array.lookup("hasOwnProperty").is_some());
        assert!(protos.array.lookup("push").is_some());
        assert!(globals.get_named("Math").is_some());
    }
}
