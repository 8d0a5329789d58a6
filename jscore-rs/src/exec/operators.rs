//! Binary operator visitors.
//!
//! Eager visitors receive evaluated operands (several for flattened
//! operators such as `a + b + c`); lazy visitors receive the node and
//! evaluate only what they need.

use super::Interp;
use crate::ast::NodeId;
use crate::error::{ScriptError, ScriptResult};
use crate::value::{Comparison, Value};

fn fold(args: &[Value], op: fn(&Value, &Value) -> Value) -> ScriptResult<Value> {
    let Some((first, rest)) = args.split_first() else {
        return Err(ScriptError::syntax("Missing operand"));
    };
    Ok(rest.iter().fold(first.clone(), |acc, v| op(&acc, v)))
}

fn pair(args: &[Value]) -> ScriptResult<(&Value, &Value)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(ScriptError::syntax("Expected two operands")),
    }
}

fn compare(args: &[Value], test: fn(Comparison) -> bool) -> ScriptResult<Value> {
    let (a, b) = pair(args)?;
    Ok(Value::Bool(test(a.compare(b))))
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

pub fn add(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::arith_add)
}

pub fn sub(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::arith_sub)
}

pub fn mul(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::arith_mul)
}

pub fn div(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::arith_div)
}

pub fn rem(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::arith_rem)
}

pub fn pow(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    let (a, b) = pair(args)?;
    Ok(a.arith_pow(b))
}

pub fn shl(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::shift_left)
}

pub fn shr(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::shift_right)
}

pub fn ushr(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::shift_right_unsigned)
}

pub fn bit_and(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::bit_and)
}

pub fn bit_or(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::bit_or)
}

pub fn bit_xor(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    fold(args, Value::bit_xor)
}

// ── Comparison ────────────────────────────────────────────────────────────────

pub fn eq(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    compare(args, Comparison::is_eq)
}

pub fn ne(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    compare(args, |c| !c.is_eq())
}

pub fn strict_eq(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    let (a, b) = pair(args)?;
    Ok(Value::Bool(a.strict_equals(b)))
}

pub fn strict_ne(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    let (a, b) = pair(args)?;
    Ok(Value::Bool(!a.strict_equals(b)))
}

pub fn lt(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    compare(args, Comparison::is_lt)
}

pub fn gt(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    compare(args, Comparison::is_gt)
}

pub fn le(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    compare(args, Comparison::is_le)
}

pub fn ge(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    compare(args, Comparison::is_ge)
}

// ── Membership ────────────────────────────────────────────────────────────────

/// Whether `container` holds `item`: object keys, scalar array elements or
/// substrings, after any registered predicates have had their say.
pub fn contains_value(it: &Interp<'_>, item: &Value, container: &Value) -> bool {
    if let Some(answer) = it.engine().contains(item, container) {
        return answer;
    }
    let needle = item.to_js_string();
    match container {
        Value::Undefined | Value::Null => false,
        Value::Structured(o) if o.is_array() => o
            .values()
            .iter()
            .any(|v| !matches!(v, Value::Structured(_)) && v.to_js_string() == needle),
        Value::Structured(o) => o.has_own(&needle),
        other => other.to_js_string().contains(&needle),
    }
}

pub fn contains(it: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    let (item, container) = pair(args)?;
    Ok(Value::Bool(contains_value(it, item, container)))
}

pub fn not_contains(it: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    let (item, container) = pair(args)?;
    Ok(Value::Bool(!contains_value(it, item, container)))
}

pub fn of_outside_for(_: &mut Interp<'_>, _: &[Value]) -> ScriptResult<Value> {
    Err(ScriptError::syntax("'of' is allowed only in a for loop header"))
}

pub fn comma(_: &mut Interp<'_>, args: &[Value]) -> ScriptResult<Value> {
    Ok(args.last().cloned().unwrap_or_default())
}

// ── Lazy ──────────────────────────────────────────────────────────────────────

/// Value of the first falsy operand, or of the last one.
pub fn and(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    let mut last = Value::Bool(true);
    for child in it.node_children(id) {
        last = it.eval(child)?;
        if !last.to_boolean() {
            break;
        }
    }
    Ok(last)
}

/// Value of the first truthy operand, or of the last one.
pub fn or(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    let mut last = Value::Bool(false);
    for child in it.node_children(id) {
        last = it.eval(child)?;
        if last.to_boolean() {
            break;
        }
    }
    Ok(last)
}

pub fn nullish(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    let mut last = Value::Undefined;
    for child in it.node_children(id) {
        last = it.eval(child)?;
        if !last.is_nullish() {
            break;
        }
    }
    Ok(last)
}

pub fn ternary(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    let children = it.node_children(id);
    let [cond, then, otherwise] = children[..] else {
        return Err(ScriptError::syntax("Missing : for ?"));
    };
    if it.eval(cond)?.to_boolean() {
        it.eval(then)
    } else {
        it.eval(otherwise)
    }
}

pub fn pair_outside_literal(_: &mut Interp<'_>, _: NodeId) -> ScriptResult<Value> {
    Err(ScriptError::syntax("Unexpected : outside of an object literal"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::engine::Engine;
    use crate::function::Function;
    use crate::scope::Env;
    use crate::value::Value;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    thread_local! {
        static CALLS: Cell<u32> = const { Cell::new(0) };
    }

    fn counted(_: &mut super::Interp<'_>, _: &Value, _: &[Value]) -> crate::error::ScriptResult<Value> {
        CALLS.with(|c| c.set(c.get() + 1));
        Ok(Value::Bool(true))
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run("2+2"), "4");
        assert_eq!(run("20*20*20"), "8000");
        assert_eq!(run("2+3*4"), "14");
        assert_eq!(run("(2+3)*4"), "20");
        assert_eq!(run("2 ** 3 ** 2"), "512");
        assert_eq!(run("10 - 2 - 3"), "5");
        assert_eq!(run("7 % 3 + 1"), "2");
        assert_eq!(run("1 << 4 | 1"), "17");
    }

    #[test]
    fn comparisons() {
        assert_eq!(run("'5' == 5"), "true");
        assert_eq!(run("'5' === 5"), "false");
        assert_eq!(run("null == 0"), "false");
        assert_eq!(run("null == undefined"), "true");
        assert_eq!(run("NaN != NaN"), "true");
        assert_eq!(run("'abc' < 'abd'"), "true");
    }

    #[test]
    fn short_circuit_skips_calls() {
        let engine = Engine::new();
        let env = Env::new();
        env.set_local("f", Value::Function(Function::native("f", counted)));
        CALLS.with(|c| c.set(0));
        engine.eval("false && f()", &env).unwrap();
        engine.eval("true || f()", &env).unwrap();
        engine.eval("1 ?? f()", &env).unwrap();
        assert_eq!(CALLS.with(Cell::get), 0);
        engine.eval("true && f()", &env).unwrap();
        assert_eq!(CALLS.with(Cell::get), 1);
    }

    #[test]
    fn logical_values() {
        assert_eq!(run("0 || 'x'"), "x");
        assert_eq!(run("1 && 0"), "0");
        assert_eq!(run("null ?? 0 ?? 3"), "0");
    }

    #[test]
    fn nested_ternaries() {
        assert_eq!(run("a = 0; b = 1; a ? 1 : b ? 2 : 3"), "2");
        assert_eq!(run("a = 0; b = 0; c = 1; a ? 1 : b ? 2 : c ? 3 : 4"), "3");
        assert_eq!(run("a = 1; b = 0; a ? b ? 1 : 2 : 3"), "2");
        assert_eq!(run("a = 0; b = 0; c = 0; a ? 1 : b ? 2 : c ? 3 : 4"), "4");
    }

    #[test]
    fn membership() {
        assert_eq!(run("'a' IN {a: 1}"), "true");
        assert_eq!(run("2 in [1, 2, 3]"), "true");
        assert_eq!(run("'ell' in 'hello'"), "true");
        assert_eq!(run("4 not in [1, 2, 3]"), "true");
        assert_eq!(run("'x' in null"), "false");
    }
}
