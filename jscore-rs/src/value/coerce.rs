//! Conversions between value kinds.
//!
//! These follow the usual dynamic-language rules: numeric strings parse to
//! their value, other strings become NaN, `null` is zero, and the empty
//! string is the only falsy string.

use std::fmt::Write as _;

use super::Value;

/// Bound on recursion when converting nested arrays.
const MAX_CONVERT_DEPTH: usize = 32;

/// The numeric reading of a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
    NaN,
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(n) => n as f64,
            Numeric::Float(f) => f,
            Numeric::NaN => f64::NAN,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Numeric::Int(n) => Value::Int(n),
            Numeric::Float(f) => Value::number(f),
            Numeric::NaN => Value::NaN,
        }
    }
}

fn is_js_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Parse the full text of `s` as a number.
///
/// Leading and trailing whitespace is ignored and an empty string is zero.
/// Hexadecimal integers (`0x1F`) and `Infinity` are accepted; anything else
/// that is not plain decimal notation is NaN.
pub fn parse_number_str(s: &str) -> Numeric {
    let t = s.trim_matches(is_js_space);
    if t.is_empty() {
        return Numeric::Int(0);
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return match i64::from_str_radix(hex, 16) {
            Ok(n) if !hex.starts_with(['+', '-']) => Numeric::Int(n),
            _ => Numeric::NaN,
        };
    }
    match t {
        "Infinity" | "+Infinity" => return Numeric::Float(f64::INFINITY),
        "-Infinity" => return Numeric::Float(f64::NEG_INFINITY),
        _ => {}
    }
    if !t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')) {
        return Numeric::NaN;
    }
    let digits = t.strip_prefix(['+', '-']).unwrap_or(t);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = t.parse::<i64>() {
            return Numeric::Int(n);
        }
    }
    match t.parse::<f64>() {
        Ok(f) => Numeric::Float(f),
        Err(_) => Numeric::NaN,
    }
}

/// Render a float the way scripts expect to see it.
pub fn format_number(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let abs = f.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{f}");
    }
    let mut out = String::new();
    let _ = write!(out, "{f:e}");
    match out.find('e') {
        Some(at) if !out[at + 1..].starts_with('-') => {
            out.insert(at + 1, '+');
            out
        }
        _ => out,
    }
}

impl Value {
    pub fn to_numeric(&self) -> Numeric {
        self.numeric_at(0)
    }

    fn numeric_at(&self, depth: usize) -> Numeric {
        match self {
            Value::Undefined | Value::NaN | Value::Function(_) | Value::Error(_) => Numeric::NaN,
            Value::Null => Numeric::Int(0),
            Value::Bool(b) => Numeric::Int(i64::from(*b)),
            Value::Int(n) => Numeric::Int(*n),
            Value::Number(f) => Numeric::Float(*f),
            Value::Str(s) => parse_number_str(s),
            Value::Structured(o) if o.is_array() && depth < MAX_CONVERT_DEPTH => match o.len() {
                0 => Numeric::Int(0),
                1 => o.get_index(0).map_or(Numeric::NaN, |v| v.numeric_at(depth + 1)),
                _ => Numeric::NaN,
            },
            Value::Structured(_) => Numeric::NaN,
        }
    }

    /// Numeric value as a float (NaN for non-numeric values).
    pub fn to_number(&self) -> f64 {
        self.to_numeric().as_f64()
    }

    /// Integer value, truncating floats; NaN becomes zero and infinities saturate.
    pub fn to_integer(&self) -> i64 {
        match self.to_numeric() {
            Numeric::Int(n) => n,
            Numeric::Float(f) => f as i64,
            Numeric::NaN => 0,
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null | Value::NaN => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Number(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Function(_) | Value::Structured(_) | Value::Error(_) => true,
        }
    }

    /// String conversion used by concatenation and string built-ins.
    pub fn to_js_string(&self) -> String {
        self.string_at(0)
    }

    fn string_at(&self, depth: usize) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Number(f) => format_number(*f),
            Value::NaN => "NaN".to_string(),
            Value::Str(s) => s.to_string(),
            Value::Error(msg) => msg.to_string(),
            Value::Function(f) => f.source_text(),
            Value::Structured(o) if o.is_array() => {
                if depth >= MAX_CONVERT_DEPTH {
                    return String::new();
                }
                let parts: Vec<String> = o
                    .values()
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.string_at(depth + 1) })
                    .collect();
                parts.join(",")
            }
            Value::Structured(o) => match o.callable() {
                Some(f) => f.source_text(),
                None => "[object Object]".to_string(),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings() {
        assert_eq!(parse_number_str("42"), Numeric::Int(42));
        assert_eq!(parse_number_str("  -7 "), Numeric::Int(-7));
        assert_eq!(parse_number_str("2.5e2"), Numeric::Float(250.0));
        assert_eq!(parse_number_str(""), Numeric::Int(0));
        assert_eq!(parse_number_str("0x1F"), Numeric::Int(31));
        assert_eq!(parse_number_str("abc"), Numeric::NaN);
        assert_eq!(parse_number_str("inf"), Numeric::NaN);
        assert_eq!(parse_number_str("1e"), Numeric::NaN);
        assert_eq!(parse_number_str("-Infinity"), Numeric::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn booleans_are_conventional() {
        assert_eq!(Value::Bool(true).to_integer(), 1);
        assert_eq!(Value::Bool(false).to_integer(), 0);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(!Value::NaN.to_boolean());
        assert!(!Value::Int(0).to_boolean());
        assert!(Value::array(vec![]).to_boolean());
    }

    #[test]
    fn arrays_as_numbers() {
        assert_eq!(Value::array(vec![]).to_numeric(), Numeric::Int(0));
        assert_eq!(Value::array(vec![Value::from("3")]).to_numeric(), Numeric::Int(3));
        assert_eq!(Value::array(vec![Value::Int(1), Value::Int(2)]).to_numeric(), Numeric::NaN);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn array_strings_join() {
        let a = Value::array(vec![Value::Int(1), Value::Null, Value::from("x")]);
        assert_eq!(a.to_js_string(), "1,,x");
    }
}
