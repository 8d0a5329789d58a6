//! Assignment visitors.
//!
//! All of these are lazy: the left-hand side is resolved to a [`Place`]
//! rather than evaluated.

use super::{Interp, Place};
use crate::ast::NodeId;
use crate::error::{ScriptError, ScriptResult};
use crate::value::Value;

/// `a = b = value`: targets resolve left to right, the value is computed
/// once and stored right to left.
pub fn assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    let children = it.node_children(id);
    let Some((&value_id, targets)) = children.split_last() else {
        return Err(ScriptError::syntax("Invalid assignment"));
    };
    if targets.is_empty() {
        return Err(ScriptError::syntax("Invalid assignment"));
    }
    let mut places = Vec::with_capacity(targets.len());
    for &target in targets {
        places.push(it.resolve_target(target)?);
    }
    let value = it.eval(value_id)?;
    for place in places.iter().rev() {
        it.write_place(place, value.clone())?;
    }
    Ok(value)
}

fn operands(it: &Interp<'_>, id: NodeId) -> ScriptResult<(NodeId, NodeId)> {
    match it.node_children(id)[..] {
        [target, value] => Ok((target, value)),
        _ => Err(ScriptError::syntax("Invalid compound assignment")),
    }
}

fn target(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<(Place, NodeId, Value)> {
    let (target, value_id) = operands(it, id)?;
    let place = it.resolve_target(target)?;
    let current = it.read_place(&place)?;
    Ok((place, value_id, current))
}

fn compound(it: &mut Interp<'_>, id: NodeId, op: fn(&Value, &Value) -> Value) -> ScriptResult<Value> {
    let (place, value_id, current) = target(it, id)?;
    let rhs = it.eval(value_id)?;
    let result = op(&current, &rhs);
    it.write_place(&place, result.clone())?;
    Ok(result)
}

/// Stores the right-hand side only when `store(current)` holds.
fn logical(it: &mut Interp<'_>, id: NodeId, store: fn(&Value) -> bool) -> ScriptResult<Value> {
    let (place, value_id, current) = target(it, id)?;
    if !store(&current) {
        return Ok(current);
    }
    let value = it.eval(value_id)?;
    it.write_place(&place, value.clone())?;
    Ok(value)
}

// ── Compound ──────────────────────────────────────────────────────────────────

pub fn add_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::arith_add)
}

pub fn sub_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::arith_sub)
}

pub fn mul_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::arith_mul)
}

pub fn div_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::arith_div)
}

pub fn rem_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::arith_rem)
}

pub fn pow_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::arith_pow)
}

pub fn shl_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::shift_left)
}

pub fn shr_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::shift_right)
}

pub fn ushr_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::shift_right_unsigned)
}

pub fn bit_and_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::bit_and)
}

pub fn bit_or_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::bit_or)
}

pub fn bit_xor_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    compound(it, id, Value::bit_xor)
}

// ── Logical ───────────────────────────────────────────────────────────────────

pub fn and_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    logical(it, id, Value::to_boolean)
}

pub fn or_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    logical(it, id, |v| !v.to_boolean())
}

pub fn nullish_assign(it: &mut Interp<'_>, id: NodeId) -> ScriptResult<Value> {
    logical(it, id, Value::is_nullish)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::error::ErrorKind;
    use crate::scope::Env;
    use crate::value::Value;

    fn run(engine: &Engine, env: &Env, src: &str) -> String {
        engine.eval(src, env).unwrap().to_js_string()
    }

    #[test]
    fn chained_assignment_stores_everywhere() {
        let engine = Engine::new();
        let env = Env::new();
        assert_eq!(run(&engine, &env, "a = b = 5"), "5");
        assert_eq!(env.get("a").map(|v| v.to_integer()), Some(5));
        assert_eq!(env.get("b").map(|v| v.to_integer()), Some(5));
    }

    #[test]
    fn compound_operators() {
        let engine = Engine::new();
        let env = Env::new();
        env.set_local("x", Value::Int(10));
        assert_eq!(run(&engine, &env, "x += 5"), "15");
        assert_eq!(run(&engine, &env, "x -= 3"), "12");
        assert_eq!(run(&engine, &env, "x *= 2"), "24");
        assert_eq!(run(&engine, &env, "x /= 4"), "6");
        assert_eq!(run(&engine, &env, "x %= 4"), "2");
        assert_eq!(run(&engine, &env, "x **= 3"), "8");
        assert_eq!(run(&engine, &env, "x <<= 1"), "16");
        assert_eq!(run(&engine, &env, "x |= 1"), "17");
        assert_eq!(run(&engine, &env, "s = 'a'; s += 1"), "a1");
    }

    #[test]
    fn member_targets() {
        let engine = Engine::new();
        let env = Env::new();
        assert_eq!(run(&engine, &env, "o = {a: 1}; o.a += 1; o.b = 3; o.a + o.b"), "5");
        assert_eq!(run(&engine, &env, "arr = [1, 2]; arr[2] = 3; arr.length"), "3");
    }

    #[test]
    fn logical_assignment_is_lazy() {
        let engine = Engine::new();
        let env = Env::new();
        assert_eq!(run(&engine, &env, "a = 1; a ||= undefinedName; a"), "1");
        assert_eq!(run(&engine, &env, "b = null; b ??= 4; b"), "4");
        assert_eq!(run(&engine, &env, "c = 1; c &&= 7; c"), "7");
    }

    #[test]
    fn literal_target_is_rejected() {
        let err = Engine::new().eval("1 = 2", &Env::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}
