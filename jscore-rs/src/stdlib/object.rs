//! `Object` constructor and `Object.prototype`.

use super::{arg, constructor, method};
use crate::engine::Prototypes;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::value::{Obj, Value};

/// The root prototype; built first so every other prototype can chain to it.
pub fn prototype() -> Obj {
    let proto = Obj::object();
    method(&proto, "hasOwnProperty", has_own_property);
    method(&proto, "toString", to_string);
    method(&proto, "toLocaleString", to_string);
    method(&proto, "valueOf", value_of);
    proto
}

pub fn install(globals: &Obj, protos: &Prototypes) {
    let ctor = constructor(globals, "Object", construct, &protos.object);
    method(&ctor, "keys", keys);
    method(&ctor, "values", values);
    method(&ctor, "entries", entries);
    method(&ctor, "assign", assign);
    method(&ctor, "fromEntries", from_entries);
    method(&ctor, "create", create);
    method(&ctor, "getPrototypeOf", get_prototype_of);
    method(&ctor, "setPrototypeOf", set_prototype_of);
}

fn structured(v: &Value, what: &str) -> ScriptResult<Obj> {
    match v {
        Value::Structured(o) => Ok(o.clone()),
        other => Err(ScriptError::type_error(format!(
            "{what} called on non-object {}",
            other.type_name()
        ))),
    }
}

/// `null`/`undefined` prototype argument means "none".
fn proto_arg(v: &Value, what: &str) -> ScriptResult<Option<Obj>> {
    match v {
        Value::Null | Value::Undefined => Ok(None),
        Value::Structured(o) => Ok(Some(o.clone())),
        other => Err(ScriptError::type_error(format!(
            "{what}: object prototype may only be an object or null, not {}",
            other.type_name()
        ))),
    }
}

fn construct(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(match arg(args, 0) {
        v @ Value::Structured(_) => v,
        _ => Value::Structured(Obj::object()),
    })
}

// ── Static ────────────────────────────────────────────────────────────────────

fn own_entries(v: &Value) -> Vec<(std::rc::Rc<str>, Value)> {
    match v {
        Value::Structured(o) => o.entries(),
        Value::Str(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (std::rc::Rc::from(i.to_string()), Value::from(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn keys(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let keys = own_entries(&arg(args, 0)).into_iter().map(|(k, _)| Value::Str(k));
    Ok(Value::array(keys.collect()))
}

fn values(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let values = own_entries(&arg(args, 0)).into_iter().map(|(_, v)| v);
    Ok(Value::array(values.collect()))
}

fn entries(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let pairs = own_entries(&arg(args, 0))
        .into_iter()
        .map(|(k, v)| Value::array(vec![Value::Str(k), v]));
    Ok(Value::array(pairs.collect()))
}

fn assign(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = structured(&arg(args, 0), "Object.assign")?;
    for source in args.iter().skip(1) {
        for (k, v) in own_entries(source) {
            target.set_key(&Value::Str(k), v)?;
        }
    }
    Ok(Value::Structured(target))
}

fn from_entries(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let list = structured(&arg(args, 0), "Object.fromEntries")?;
    let out = Obj::object();
    for entry in list.values() {
        let Value::Structured(pair) = entry else {
            return Err(ScriptError::type_error(format!(
                "Iterator value {} is not an entry object",
                entry.to_js_string()
            )));
        };
        let key = pair.get_index(0).unwrap_or_default();
        out.set_named(&key.to_js_string(), pair.get_index(1).unwrap_or_default());
    }
    Ok(Value::Structured(out))
}

fn create(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let proto = proto_arg(&arg(args, 0), "Object.create")?;
    let out = Obj::object();
    out.set_proto(proto)?;
    if let Value::Structured(props) = arg(args, 1) {
        for (k, descriptor) in props.entries() {
            let value = match &descriptor {
                Value::Structured(d) => d.get_named("value").unwrap_or_default(),
                _ => Value::Undefined,
            };
            out.set_named(&k, value);
        }
    }
    Ok(Value::Structured(out))
}

fn get_prototype_of(it: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    if target.is_nullish() {
        return Err(ScriptError::type_error("Cannot convert undefined or null to object"));
    }
    if let Some(explicit) = target.as_obj().and_then(Obj::proto) {
        return Ok(Value::Structured(explicit));
    }
    let protos = it.engine().prototypes();
    Ok(match protos.for_value(&target) {
        Some(p) if !target.as_obj().is_some_and(|o| o.ptr_eq(&protos.object)) => Value::Structured(p.clone()),
        _ => Value::Null,
    })
}

fn set_prototype_of(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let target = arg(args, 0);
    let proto = proto_arg(&arg(args, 1), "Object.setPrototypeOf")?;
    if let Value::Structured(o) = &target {
        o.set_proto(proto)?;
    }
    Ok(target)
}

// ── Prototype ─────────────────────────────────────────────────────────────────

fn has_own_property(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let key = arg(args, 0).to_js_string();
    Ok(Value::Bool(match this {
        Value::Structured(o) => o.has_own(&key),
        Value::Str(s) => key.parse::<usize>().is_ok_and(|i| i < s.chars().count()),
        _ => false,
    }))
}

fn to_string(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(match this {
        Value::Structured(o) if o.is_array() => this.to_js_string(),
        Value::Structured(_) => "[object Object]".to_string(),
        Value::Null => "[object Null]".to_string(),
        Value::Undefined => "[object Undefined]".to_string(),
        other => other.to_js_string(),
    }))
}

fn value_of(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(this.clone())
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::error::ErrorKind;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn keys_values_entries() {
        assert_eq!(run("Object.keys({a: 1, b: 2})"), "a,b");
        assert_eq!(run("Object.values({a: 1, b: 2})"), "1,2");
        assert_eq!(run("Object.entries({a: 1}).length"), "1");
        assert_eq!(run("Object.keys([7, 8])"), "0,1");
    }

    #[test]
    fn assign_and_from_entries() {
        assert_eq!(run("o = Object.assign({a: 1}, {b: 2}, {a: 3}); o.a + o.b"), "5");
        assert_eq!(run("Object.fromEntries([['x', 1], ['y', 2]]).y"), "2");
    }

    #[test]
    fn create_and_prototypes() {
        assert_eq!(run("p = {greet: 'hi'}; o = Object.create(p); o.greet"), "hi");
        assert_eq!(run("p = {}; o = Object.create(p); Object.getPrototypeOf(o) === p"), "true");
        assert_eq!(run("o = {}; o.hasOwnProperty('x')"), "false");
        assert_eq!(run("o = {x: 1}; o.hasOwnProperty('x')"), "true");
    }

    #[test]
    fn prototype_cycles_are_rejected() {
        let err = Engine::new()
            .eval("a = {}; b = Object.create(a); Object.setPrototypeOf(a, b)", &Env::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }
}
