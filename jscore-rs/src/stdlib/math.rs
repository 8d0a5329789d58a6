//! The `Math` namespace.

use std::f64::consts;

use super::{arg, integral, method, namespace};
use crate::error::ScriptResult;
use crate::exec::Interp;
use crate::value::{Obj, Value};

pub fn install(globals: &Obj) {
    let math = namespace(globals, "Math");
    for (name, value) in [
        ("E", consts::E),
        ("LN10", consts::LN_10),
        ("LN2", consts::LN_2),
        ("LOG10E", consts::LOG10_E),
        ("LOG2E", consts::LOG2_E),
        ("PI", consts::PI),
        ("SQRT1_2", consts::FRAC_1_SQRT_2),
        ("SQRT2", consts::SQRT_2),
    ] {
        math.set_named(name, Value::Number(value));
    }

    method(&math, "abs", abs);
    method(&math, "ceil", ceil);
    method(&math, "floor", floor);
    method(&math, "round", round);
    method(&math, "sign", sign);
    method(&math, "trunc", trunc);
    method(&math, "clz32", clz32);
    method(&math, "sqrt", sqrt);
    method(&math, "cbrt", cbrt);
    method(&math, "hypot", hypot);
    method(&math, "pow", pow);
    method(&math, "exp", exp);
    method(&math, "expm1", expm1);
    method(&math, "log", log);
    method(&math, "log1p", log1p);
    method(&math, "log10", log10);
    method(&math, "log2", log2);
    method(&math, "sin", sin);
    method(&math, "cos", cos);
    method(&math, "tan", tan);
    method(&math, "asin", asin);
    method(&math, "acos", acos);
    method(&math, "atan", atan);
    method(&math, "atan2", atan2);
    method(&math, "sinh", sinh);
    method(&math, "cosh", cosh);
    method(&math, "tanh", tanh);
    method(&math, "asinh", asinh);
    method(&math, "acosh", acosh);
    method(&math, "atanh", atanh);
    method(&math, "max", max);
    method(&math, "min", min);
}

fn x(args: &[Value]) -> f64 {
    arg(args, 0).to_number()
}

/// Declares unary functions over the first argument's float value.
macro_rules! unary {
    ($($name:ident => $f:expr;)*) => {
        $(
            fn $name(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
                let f: fn(f64) -> f64 = $f;
                Ok(Value::number(f(x(args))))
            }
        )*
    };
}

unary! {
    sqrt => f64::sqrt;
    cbrt => f64::cbrt;
    exp => f64::exp;
    expm1 => f64::exp_m1;
    log => f64::ln;
    log1p => f64::ln_1p;
    log10 => f64::log10;
    log2 => f64::log2;
    sin => f64::sin;
    cos => f64::cos;
    tan => f64::tan;
    asin => f64::asin;
    acos => f64::acos;
    atan => f64::atan;
    sinh => f64::sinh;
    cosh => f64::cosh;
    tanh => f64::tanh;
    asinh => f64::asinh;
    acosh => f64::acosh;
    atanh => f64::atanh;
}

// ── Rounding ──────────────────────────────────────────────────────────────────

fn abs(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(match arg(args, 0) {
        Value::Int(n) => n.checked_abs().map_or(Value::Number((n as f64).abs()), Value::Int),
        v => Value::number(v.to_number().abs()),
    })
}

fn ceil(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(integral(x(args).ceil()))
}

fn floor(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(integral(x(args).floor()))
}

/// Halves round towards positive infinity.
fn round(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(integral((x(args) + 0.5).floor()))
}

fn sign(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let n = x(args);
    Ok(if n.is_nan() {
        Value::NaN
    } else if n > 0.0 {
        Value::Int(1)
    } else if n < 0.0 {
        Value::Int(-1)
    } else {
        Value::Int(0)
    })
}

fn trunc(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(integral(x(args).trunc()))
}

fn clz32(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let n = arg(args, 0).to_integer() as u32;
    Ok(Value::Int(i64::from(n.leading_zeros())))
}

// ── Powers ────────────────────────────────────────────────────────────────────

fn hypot(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let sum: f64 = args.iter().map(|v| v.to_number().powi(2)).sum();
    Ok(integral(sum.sqrt()))
}

fn pow(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(arg(args, 0).arith_pow(&arg(args, 1)))
}

fn atan2(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::number(x(args).atan2(arg(args, 1).to_number())))
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Extremum keeping integer representation when every argument is one.
fn extremum(args: &[Value], empty: f64, pick_right: fn(f64, f64) -> bool) -> Value {
    let mut best: Option<Value> = None;
    for v in args {
        let n = v.to_numeric().into_value();
        if matches!(n, Value::NaN) {
            return Value::NaN;
        }
        best = match best {
            Some(b) if !pick_right(b.to_number(), n.to_number()) => Some(b),
            _ => Some(n),
        };
    }
    best.unwrap_or(Value::Number(empty))
}

fn max(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(extremum(args, f64::NEG_INFINITY, |a, b| b > a))
}

fn min(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(extremum(args, f64::INFINITY, |a, b| b < a))
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn rounding() {
        assert_eq!(run("Math.floor(7 / 2)"), "3");
        assert_eq!(run("Math.ceil(3.2)"), "4");
        assert_eq!(run("Math.round(2.5)"), "3");
        assert_eq!(run("Math.round(-2.5)"), "-2");
        assert_eq!(run("Math.trunc(-3.7)"), "-3");
        assert_eq!(run("Math.abs(-5)"), "5");
        assert_eq!(run("Math.sign(-0.1)"), "-1");
    }

    #[test]
    fn selection() {
        assert_eq!(run("Math.max(1, 5, 3)"), "5");
        assert_eq!(run("Math.min(1, '0', 3)"), "0");
        assert_eq!(run("Math.max()"), "-Infinity");
        assert_eq!(run("Math.max(1, 'x')"), "NaN");
    }

    #[test]
    fn powers_and_constants() {
        assert_eq!(run("Math.sqrt(16)"), "4");
        assert_eq!(run("Math.pow(2, 10)"), "1024");
        assert_eq!(run("Math.hypot(3, 4)"), "5");
        assert_eq!(run("Math.clz32(1)"), "31");
        assert_eq!(run("Math.PI > 3.14 && Math.PI < 3.15"), "true");
    }
}
