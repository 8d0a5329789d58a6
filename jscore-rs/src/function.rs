//! Callable values.
//!
//! A [`Function`] wraps either a host function or a script-defined body
//! together with its defining scope.  `bind` produces a new wrapper with a
//! fixed `this` and leading arguments.  *Immediate* functions implement
//! computed properties: reading the member calls them.

use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDef, Program};
use crate::error::ScriptResult;
use crate::exec::Interp;
use crate::scope::Env;
use crate::value::Value;

/// Host function: interpreter, `this`, arguments.
pub type NativeFn = fn(&mut Interp<'_>, &Value, &[Value]) -> ScriptResult<Value>;

#[derive(Clone)]
pub struct UserFunction {
    pub def: Rc<FunctionDef>,
    /// Program owning the body nodes.
    pub program: Rc<Program>,
    /// Scope the function was defined in.
    pub closure: Env,
}

#[derive(Clone)]
pub enum FunctionKind {
    Native(NativeFn),
    User(UserFunction),
}

pub struct Function {
    pub name: Rc<str>,
    pub kind: FunctionKind,
    pub bound_this: Option<Value>,
    pub bound_args: Vec<Value>,
    pub immediate: bool,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FunctionKind::Native(_) => "native",
            FunctionKind::User(_) => "user",
        };
        write!(f, "Function({kind} {})", self.name)
    }
}

impl Function {
    fn wrap(name: &str, kind: FunctionKind, immediate: bool) -> Rc<Function> {
        Rc::new(Function {
            name: Rc::from(name),
            kind,
            bound_this: None,
            bound_args: Vec::new(),
            immediate,
        })
    }

    pub fn native(name: &str, f: NativeFn) -> Rc<Function> {
        Self::wrap(name, FunctionKind::Native(f), false)
    }

    /// A getter invoked on member access.
    pub fn immediate(name: &str, f: NativeFn) -> Rc<Function> {
        Self::wrap(name, FunctionKind::Native(f), true)
    }

    pub fn user(def: Rc<FunctionDef>, program: Rc<Program>, closure: Env) -> Rc<Function> {
        let name = def.name.as_deref().unwrap_or("").to_string();
        Self::wrap(&name, FunctionKind::User(UserFunction { def, program, closure }), false)
    }

    /// A copy with `this` fixed (unless already fixed) and `args` appended
    /// to the leading arguments.
    pub fn bind(self: &Rc<Self>, this: Value, args: &[Value]) -> Rc<Function> {
        let mut bound_args = self.bound_args.clone();
        bound_args.extend_from_slice(args);
        Rc::new(Function {
            name: Rc::from(format!("bound {}", self.name)),
            kind: self.kind.clone(),
            bound_this: Some(self.bound_this.clone().unwrap_or(this)),
            bound_args,
            immediate: false,
        })
    }

    pub fn is_arrow(&self) -> bool {
        matches!(&self.kind, FunctionKind::User(u) if u.def.arrow)
    }

    /// Declared parameter count, excluding rest parameters and bound arguments.
    pub fn arity(&self) -> usize {
        match &self.kind {
            FunctionKind::Native(_) => 0,
            FunctionKind::User(u) => u
                .def
                .params
                .iter()
                .filter(|p| !p.rest)
                .count()
                .saturating_sub(self.bound_args.len()),
        }
    }

    /// `toString()` text.
    pub fn source_text(&self) -> String {
        match &self.kind {
            FunctionKind::Native(_) => format!("function {}() {{ [native code] }}", self.name),
            FunctionKind::User(u) => {
                let params: Vec<String> = u
                    .def
                    .params
                    .iter()
                    .map(|p| if p.rest { format!("...{}", p.name) } else { p.name.to_string() })
                    .collect();
                if u.def.arrow {
                    format!("({}) => {{ ... }}", params.join(", "))
                } else {
                    format!("function {}({}) {{ ... }}", self.name, params.join(", "))
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Interp<'_>, _: &Value, _: &[Value]) -> ScriptResult<Value> {
        Ok(Value::Undefined)
    }

    #[test]
    fn bind_keeps_first_this_and_appends_args() {
        let f = Function::native("f", noop);
        let b1 = f.bind(Value::Int(1), &[Value::Int(10)]);
        let b2 = b1.bind(Value::Int(2), &[Value::Int(20)]);
        assert_eq!(b2.bound_this.as_ref().map(Value::to_integer), Some(1));
        let args: Vec<i64> = b2.bound_args.iter().map(Value::to_integer).collect();
        assert_eq!(args, vec![10, 20]);
        assert_eq!(&*b2.name, "bound bound f");
    }

    #[test]
    fn source_text_for_natives() {
        let f = Function::immediate("length", noop);
        assert!(f.immediate);
        assert_eq!(f.source_text(), "function length() { [native code] }");
    }
}
