//! The `JSON` namespace.

use super::{arg, method, namespace};
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::value::{json, Obj, Value};

const MAX_INDENT: usize = 10;

pub fn install(globals: &Obj) {
    let ns = namespace(globals, "JSON");
    method(&ns, "parse", parse);
    method(&ns, "stringify", stringify);
}

/// Parses through the engine's registered hook.
fn parse(it: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let text = arg(args, 0).to_js_string();
    it.engine().parse_json(text.as_bytes())
}

/// `JSON.stringify(value, replacer, indent)`; the replacer is ignored.
fn stringify(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let indent = match arg(args, 2) {
        v if v.is_numeric() => Some((v.to_integer().max(0) as usize).min(MAX_INDENT)).filter(|&n| n > 0),
        Value::Str(s) if !s.is_empty() => Some(s.chars().count().min(MAX_INDENT)),
        _ => None,
    };
    match json::stringify(&arg(args, 0), indent) {
        Ok(Some(text)) => Ok(Value::from(text)),
        Ok(None) => Ok(Value::Undefined),
        Err(message) => Err(ScriptError::type_error(message)),
    }
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
    fn parse_builds_structured_values() {
        assert_eq!(run("JSON.parse('{\"a\": [1, 2]}').a[1]"), "2");
        assert_eq!(run("JSON.parse('3.5') * 2"), "7");
    }

    #[test]
    fn stringify_compact_and_indented() {
        assert_eq!(run("JSON.stringify({a: 1, b: [true, null]})"), "{\"a\":1,\"b\":[true,null]}");
        assert_eq!(run("JSON.stringify([1], null, 2)"), "[\n  1\n]");
        assert_eq!(run("typeof JSON.stringify(undefined)"), "undefined");
    }

    #[test]
    fn malformed_json_is_a_syntax_error() {
        let err = Engine::new().eval("JSON.parse('{')", &Env::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn circular_values_fail() {
        let err = Engine::new()
            .eval("o = {}; o.self = o; JSON.stringify(o)", &Env::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }
}
