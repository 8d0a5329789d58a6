//! JSON bridge built on `serde_json`.
//!
//! `preserve_order` keeps object fields in insertion order in both
//! directions.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number};

use super::{Obj, Value};

/// Hook turning raw bytes into a structured value.
pub type JsonParser = fn(&[u8]) -> Result<Value, String>;

/// Nesting bound for serialization; deeper input is treated as circular.
const MAX_JSON_DEPTH: usize = 128;

/// Default parse hook.
pub fn parse(bytes: &[u8]) -> Result<Value, String> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|j| from_json(&j))
        .map_err(|e| e.to_string())
}

pub fn from_json(j: &serde_json::Value) -> Value {
    match j {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::number(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Obj::from_fields(map.iter().map(|(k, v)| (k.as_str().into(), from_json(v)))).into(),
    }
}

/// Convert to JSON; `None` for values JSON cannot represent (`undefined`, functions).
pub fn to_json(v: &Value) -> Result<Option<serde_json::Value>, String> {
    to_json_at(v, 0)
}

fn float_json(f: f64) -> serde_json::Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        serde_json::Value::from(f as i64)
    } else {
        Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

fn to_json_at(v: &Value, depth: usize) -> Result<Option<serde_json::Value>, String> {
    if depth > MAX_JSON_DEPTH {
        return Err("Converting circular structure to JSON".to_string());
    }
    let j = match v {
        Value::Undefined | Value::Function(_) => return Ok(None),
        Value::Null | Value::NaN => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Number(f) => float_json(*f),
        Value::Str(s) | Value::Error(s) => serde_json::Value::String(s.to_string()),
        Value::Structured(o) if o.callable().is_some() => return Ok(None),
        Value::Structured(o) if o.is_array() => {
            let mut items = Vec::with_capacity(o.len());
            for item in o.values() {
                items.push(to_json_at(&item, depth + 1)?.unwrap_or(serde_json::Value::Null));
            }
            serde_json::Value::Array(items)
        }
        Value::Structured(o) => {
            let mut map = Map::new();
            for (k, item) in o.entries() {
                if let Some(j) = to_json_at(&item, depth + 1)? {
                    map.insert(k.to_string(), j);
                }
            }
            serde_json::Value::Object(map)
        }
    };
    Ok(Some(j))
}

/// `JSON.stringify`: compact, or indented by `indent` spaces (at most 10).
pub fn stringify(v: &Value, indent: Option<usize>) -> Result<Option<String>, String> {
    let Some(j) = to_json(v)? else {
        return Ok(None);
    };
    let text = match indent.filter(|&n| n > 0) {
        None => serde_json::to_string(&j),
        Some(n) => indented(&j, n.min(10)),
    };
    text.map(Some).map_err(|e| e.to_string())
}

fn indented(j: &serde_json::Value, width: usize) -> Result<String, serde_json::Error> {
    let pad = " ".repeat(width);
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(pad.as_bytes()));
    j.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Two-space indented rendering used by `Display`.
pub fn to_pretty(o: &Obj) -> String {
    match to_json(&Value::Structured(o.clone())) {
        Ok(Some(j)) => serde_json::to_string_pretty(&j).unwrap_or_default(),
        Ok(None) => Value::Structured(o.clone()).to_js_string(),
        Err(_) => "[circular]".to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_field_order() {
        let v = parse(br#"{"z":1,"a":[1,2.5,"x"],"m":null}"#).unwrap();
        let o = v.as_obj().unwrap();
        let keys: Vec<String> = o.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(stringify(&v, None).unwrap().unwrap(), r#"{"z":1,"a":[1,2.5,"x"],"m":null}"#);
    }

    #[test]
    fn round_trip_is_equal() {
        let src = br#"[{"b":2,"a":1},[true,false],"s",-3]"#;
        let v = parse(src).unwrap();
        let text = stringify(&v, None).unwrap().unwrap();
        assert_eq!(parse(text.as_bytes()).unwrap(), v);
    }

    #[test]
    fn unrepresentable_values() {
        assert_eq!(stringify(&Value::Undefined, None).unwrap(), None);
        let a = Value::array(vec![Value::Undefined, Value::NaN, Value::Number(2.0)]);
        assert_eq!(stringify(&a, None).unwrap().unwrap(), "[null,null,2]");
    }

    #[test]
    fn indentation() {
        let v = parse(br#"{"a":[1]}"#).unwrap();
        assert_eq!(stringify(&v, Some(4)).unwrap().unwrap(), "{\n    \"a\": [\n        1\n    ]\n}");
    }

    #[test]
    fn circular_structures_fail() {
        let o = Obj::object();
        o.set_named("self", Value::Structured(o.clone()));
        assert!(stringify(&Value::Structured(o.clone()), None).is_err());
        o.remove_key(&Value::from("self"));
    }

    #[test]
    fn malformed_input() {
        assert!(parse(b"{oops").is_err());
    }
}
