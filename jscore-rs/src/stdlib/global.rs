//! Global functions: number parsing, `isNaN` / `isFinite` and URI coding.

use super::{arg, integral, method};
use crate::error::{ErrorKind, ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::value::{Numeric, Obj, Value};

/// Kept by `encodeURIComponent` besides ASCII alphanumerics.
const COMPONENT_SAFE: &str = "-_.!~*'()";
/// Additionally kept by `encodeURI` (and left encoded by `decodeURI`).
const URI_RESERVED: &str = ";,/?:@&=+$#";

pub fn install(globals: &Obj) {
    method(globals, "parseInt", parse_int);
    method(globals, "parseFloat", parse_float);
    method(globals, "isNaN", is_nan);
    method(globals, "isFinite", is_finite);
    method(globals, "encodeURI", encode_uri);
    method(globals, "encodeURIComponent", encode_uri_component);
    method(globals, "decodeURI", decode_uri);
    method(globals, "decodeURIComponent", decode_uri_component);
}

// ── Numbers ───────────────────────────────────────────────────────────────────

pub fn parse_int(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = arg(args, 0).to_js_string();
    let mut rest = s.trim_start();
    let negative = rest.starts_with('-');
    if negative || rest.starts_with('+') {
        rest = &rest[1..];
    }
    let mut radix = match arg(args, 1) {
        Value::Undefined => 0,
        v => v.to_integer(),
    };
    let hex_prefix = rest.starts_with("0x") || rest.starts_with("0X");
    if (radix == 0 || radix == 16) && hex_prefix {
        rest = &rest[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::NaN);
    }
    let mut n = 0f64;
    let mut seen = false;
    for c in rest.chars() {
        let Some(d) = c.to_digit(radix as u32) else {
            break;
        };
        n = n * radix as f64 + f64::from(d);
        seen = true;
    }
    if !seen {
        return Ok(Value::NaN);
    }
    Ok(integral(if negative { -n } else { n }))
}

/// Length of the longest prefix of `s` that reads as a decimal literal.
fn float_prefix(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        return i + "Infinity".len();
    }
    let digits = |i: &mut usize| {
        let start = *i;
        while b.get(*i).is_some_and(u8::is_ascii_digit) {
            *i += 1;
        }
        *i > start
    };
    let mut any = digits(&mut i);
    if b.get(i) == Some(&b'.') {
        let mut j = i + 1;
        if digits(&mut j) || any {
            any = true;
            i = j;
        }
    }
    if !any {
        return 0;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if digits(&mut j) {
            i = j;
        }
    }
    i
}

pub fn parse_float(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = arg(args, 0).to_js_string();
    let s = s.trim_start();
    let len = float_prefix(s);
    if len == 0 {
        return Ok(Value::NaN);
    }
    let text = &s[..len];
    let f = match text.trim_start_matches(['+', '-']) {
        "Infinity" if text.starts_with('-') => f64::NEG_INFINITY,
        "Infinity" => f64::INFINITY,
        _ => text.parse().unwrap_or(f64::NAN),
    };
    Ok(integral(f))
}

fn is_nan(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(arg(args, 0).to_numeric(), Numeric::NaN)))
}

fn is_finite(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(match arg(args, 0).to_numeric() {
        Numeric::Int(_) => true,
        Numeric::Float(f) => f.is_finite(),
        Numeric::NaN => false,
    }))
}

// ── URI coding ────────────────────────────────────────────────────────────────

fn uri_error() -> ScriptError {
    ScriptError::new(ErrorKind::Range, "URI malformed")
}

fn encode(s: &str, keep: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || keep.contains(c) {
            out.push(c);
            continue;
        }
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Decode `%XX` sequences, leaving escapes of characters in `preserve` as written.
fn decode(s: &str, preserve: &str) -> ScriptResult<String> {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let hex = s.get(i + 1..i + 3).ok_or_else(uri_error)?;
        let byte = u8::from_str_radix(hex, 16).map_err(|_| uri_error())?;
        if byte.is_ascii() && preserve.contains(byte as char) {
            out.extend_from_slice(&bytes[i..i + 3]);
        } else {
            out.push(byte);
        }
        i += 3;
    }
    String::from_utf8(out).map_err(|_| uri_error())
}

fn encode_uri(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let keep = format!("{COMPONENT_SAFE}{URI_RESERVED}");
    Ok(Value::from(encode(&arg(args, 0).to_js_string(), &keep)))
}

fn encode_uri_component(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(encode(&arg(args, 0).to_js_string(), COMPONENT_SAFE)))
}

fn decode_uri(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    decode(&arg(args, 0).to_js_string(), URI_RESERVED).map(Value::from)
}

fn decode_uri_component(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    decode(&arg(args, 0).to_js_string(), "").map(Value::from)
}

#[cfg(test)]
mod tests {
    use super::float_prefix;
    use crate::engine::Engine;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn parse_int_forms() {
        assert_eq!(run("parseInt('42px')"), "42");
        assert_eq!(run("parseInt('  -17')"), "-17");
        assert_eq!(run("parseInt('0x1F')"), "31");
        assert_eq!(run("parseInt('101', 2)"), "5");
        assert_eq!(run("parseInt('z')"), "NaN");
    }

    #[test]
    fn parse_float_forms() {
        assert_eq!(run("parseFloat('3.5kg')"), "3.5");
        assert_eq!(run("parseFloat('.5')"), "0.5");
        assert_eq!(run("parseFloat('-Infinity')"), "-Infinity");
        assert_eq!(run("parseFloat('1e3')"), "1000");
        assert_eq!(float_prefix("1e"), 1);
        assert_eq!(float_prefix("abc"), 0);
    }

    #[test]
    fn nan_and_finite() {
        assert_eq!(run("isNaN('abc')"), "true");
        assert_eq!(run("isNaN('12')"), "false");
        assert_eq!(run("isFinite('12')"), "true");
        assert_eq!(run("isFinite(1/0)"), "false");
    }

    #[test]
    fn uri_round_trips() {
        assert_eq!(run("encodeURIComponent('a b&c/é')"), "a%20b%26c%2F%C3%A9");
        assert_eq!(run("encodeURI('http://x.y/a b?q=1')"), "http://x.y/a%20b?q=1");
        assert_eq!(run("decodeURIComponent('a%20b%26c')"), "a b&c");
        assert_eq!(run("decodeURI('a%20b%26c')"), "a b%26c");
        assert!(Engine::new().eval("decodeURIComponent('%E0%A4%A')", &Env::new()).is_err());
    }
}
