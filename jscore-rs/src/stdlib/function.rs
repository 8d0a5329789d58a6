//! `Function` constructor and `Function.prototype`.

use super::{arg, constructor, getter, method};
use crate::engine::Prototypes;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::function::Function;
use crate::scope::Env;
use crate::value::{Obj, Value};
use std::rc::Rc;

pub fn install(globals: &Obj, protos: &Prototypes) {
    let proto = &protos.function;
    method(proto, "call", call);
    method(proto, "apply", apply);
    method(proto, "bind", bind);
    method(proto, "toString", to_string);
    getter(proto, "name", name);
    getter(proto, "length", length);
    constructor(globals, "Function", construct, proto);
}

fn this_function(this: &Value, what: &str) -> ScriptResult<Rc<Function>> {
    this.callable().ok_or_else(|| {
        ScriptError::type_error(format!("Function.prototype.{what} called on {}", this.type_name()))
    })
}

fn call(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let f = this_function(this, "call")?;
    let rest = args.get(1..).unwrap_or_default().to_vec();
    it.call_function(&f, arg(args, 0), rest)
}

fn apply(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let f = this_function(this, "apply")?;
    let list = match arg(args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Structured(o) if o.is_array() => o.values(),
        _ => return Err(ScriptError::type_error("CreateListFromArrayLike called on non-object")),
    };
    it.call_function(&f, arg(args, 0), list)
}

fn bind(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let f = this_function(this, "bind")?;
    Ok(Value::Function(f.bind(arg(args, 0), args.get(1..).unwrap_or_default())))
}

fn to_string(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_function(this, "toString")?.source_text()))
}

fn name(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Str(this_function(this, "name")?.name.clone()))
}

fn length(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_function(this, "length")?.arity()))
}

/// `Function(p1, .., body)`: compiles a fresh function in an empty scope.
fn construct(it: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let (body, params) = match args.split_last() {
        Some((body, params)) => (body.to_js_string(), params),
        None => (String::new(), &[][..]),
    };
    let params: Vec<String> = params.iter().map(Value::to_js_string).collect();
    let src = format!("(function anonymous({}) {{ {} }})", params.join(", "), body);
    it.engine().eval_with(&src, &Env::new(), "Function", it.options())
}
