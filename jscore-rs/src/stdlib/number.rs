//! `Number` and `Boolean` constructors with their prototypes.

use super::global::{parse_float, parse_int};
use super::{arg, constructor, method};
use crate::engine::Prototypes;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::value::{format_number, Obj, Value};

pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

pub fn install(globals: &Obj, protos: &Prototypes) {
    method(&protos.number, "toFixed", to_fixed);
    method(&protos.number, "toString", to_string);
    method(&protos.number, "valueOf", value_of);
    let ctor = constructor(globals, "Number", construct, &protos.number);
    method(&ctor, "isInteger", is_integer);
    method(&ctor, "isNaN", is_nan);
    method(&ctor, "isFinite", is_finite);
    method(&ctor, "parseFloat", parse_float);
    method(&ctor, "parseInt", parse_int);
    ctor.set_named("MAX_SAFE_INTEGER", Value::Int(MAX_SAFE_INTEGER));
    ctor.set_named("MIN_SAFE_INTEGER", Value::Int(-MAX_SAFE_INTEGER));
    ctor.set_named("EPSILON", Value::Number(f64::EPSILON));
    ctor.set_named("MAX_VALUE", Value::Number(f64::MAX));
    ctor.set_named("MIN_VALUE", Value::Number(f64::from_bits(1)));
    ctor.set_named("POSITIVE_INFINITY", Value::Number(f64::INFINITY));
    ctor.set_named("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
    ctor.set_named("NaN", Value::NaN);

    method(&protos.boolean, "toString", to_string);
    method(&protos.boolean, "valueOf", value_of);
    constructor(globals, "Boolean", boolean, &protos.boolean);
}

fn construct(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(args.first().map_or(Value::Int(0), |v| v.to_numeric().into_value()))
}

fn boolean(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(arg(args, 0).to_boolean()))
}

fn is_integer(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(match arg(args, 0) {
        Value::Int(_) => true,
        Value::Number(f) => f.is_finite() && f.fract() == 0.0,
        _ => false,
    }))
}

fn is_nan(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(arg(args, 0), Value::NaN)))
}

fn is_finite(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(match arg(args, 0) {
        Value::Int(_) => true,
        Value::Number(f) => f.is_finite(),
        _ => false,
    }))
}

// ── Prototype ─────────────────────────────────────────────────────────────────

fn to_fixed(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let digits = arg(args, 0).to_integer();
    if !(0..=100).contains(&digits) {
        return Err(ScriptError::range("toFixed() digits argument must be between 0 and 100"));
    }
    let n = this.to_number();
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(Value::from(this.to_numeric().into_value().to_js_string()));
    }
    Ok(Value::from(format!("{:.*}", digits as usize, n)))
}

/// Digits of a non-negative integral float in `radix`.
fn integer_digits(mut n: f64, radix: u32) -> String {
    if n < 1.0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n >= 1.0 {
        let d = (n % f64::from(radix)) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        n = (n / f64::from(radix)).floor();
    }
    digits.iter().rev().collect()
}

fn to_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let n = n.abs();
    let mut out = integer_digits(n.trunc(), radix);
    let mut frac = n.fract();
    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= f64::from(radix);
            let d = frac.trunc() as u32;
            out.push(std::char::from_digit(d, radix).unwrap_or('0'));
            frac -= frac.trunc();
            if frac == 0.0 {
                break;
            }
        }
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

fn to_string(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let radix = match arg(args, 0) {
        Value::Undefined => 10,
        v => v.to_integer(),
    };
    if !(2..=36).contains(&radix) {
        return Err(ScriptError::range("toString() radix must be between 2 and 36"));
    }
    if radix == 10 || !this.is_numeric() {
        return Ok(Value::from(this.to_js_string()));
    }
    let n = this.to_number();
    if !n.is_finite() {
        return Ok(Value::from(format_number(n)));
    }
    Ok(Value::from(to_radix(n, radix as u32)))
}

fn value_of(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(this.clone())
}

#[cfg(test)]
mod tests {
    use super::to_radix;
    use crate::engine::Engine;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn conversions() {
        assert_eq!(run("Number('42') + 1"), "43");
        assert_eq!(run("Number('x')"), "NaN");
        assert_eq!(run("Number()"), "0");
        assert_eq!(run("Boolean('') + '|' + Boolean('a')"), "false|true");
    }

    #[test]
    fn statics() {
        assert_eq!(run("Number.isInteger(5)"), "true");
        assert_eq!(run("Number.isInteger(5.5)"), "false");
        assert_eq!(run("Number.isNaN('x')"), "false");
        assert_eq!(run("Number.MAX_SAFE_INTEGER"), "9007199254740991");
    }

    #[test]
    fn formatting() {
        assert_eq!(run("(3.14159).toFixed(2)"), "3.14");
        assert_eq!(run("(255).toString(16)"), "ff");
        assert_eq!(run("(5).toString(2)"), "101");
        assert_eq!(to_radix(-0.5, 2), "-0.1");
    }

    #[test]
    fn bad_radix_is_range_error() {
        assert!(Engine::new().eval("(5).toString(1)", &Env::new()).is_err());
    }
}
