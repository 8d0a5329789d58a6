//! Prefix and postfix operator visitors.

use super::{Interp, Place, Resolved};
use crate::error::{ScriptError, ScriptResult};
use crate::value::Value;

pub fn not(_: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    Ok(Value::Bool(!r.value.to_boolean()))
}

pub fn bit_not(_: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    Ok(r.value.bit_not())
}

pub fn plus(_: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    Ok(r.value.arith_plus())
}

pub fn minus(_: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    Ok(r.value.arith_neg())
}

/// Writes `old + delta` back to the operand; returns `(old, new)` as numbers.
fn step(it: &mut Interp<'_>, r: Resolved, delta: i64) -> ScriptResult<(Value, Value)> {
    if matches!(r.place, Place::Temp) {
        return Err(ScriptError::syntax("Invalid increment operand"));
    }
    let old = r.value.arith_plus();
    let new = old.arith_add(&Value::Int(delta));
    it.write_place(&r.place, new.clone())?;
    Ok((old, new))
}

pub fn pre_increment(it: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    step(it, r, 1).map(|(_, new)| new)
}

pub fn pre_decrement(it: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    step(it, r, -1).map(|(_, new)| new)
}

pub fn post_increment(it: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    step(it, r, 1).map(|(old, _)| old)
}

pub fn post_decrement(it: &mut Interp<'_>, r: Resolved) -> ScriptResult<Value> {
    step(it, r, -1).map(|(old, _)| old)
}

pub fn spread_outside_list(_: &mut Interp<'_>, _: Resolved) -> ScriptResult<Value> {
    Err(ScriptError::syntax("Unexpected ... outside of a list"))
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::error::ErrorKind;
    use crate::scope::Env;
    use crate::value::Value;

    fn run(env: &Env, src: &str) -> String {
        Engine::new().eval(src, env).unwrap().to_js_string()
    }

    #[test]
    fn increments_write_back() {
        let env = Env::new();
        env.set_local("S", Value::Int(1));
        assert_eq!(run(&env, "S++ + +4"), "5");
        assert_eq!(env.get("S").map(|v| v.to_integer()), Some(2));
        assert_eq!(run(&env, "++S"), "3");
        assert_eq!(run(&env, "S--"), "3");
        assert_eq!(run(&env, "--S"), "1");
    }

    #[test]
    fn member_increment() {
        let env = Env::new();
        assert_eq!(run(&env, "o = {n: 1}; o.n++; o.n"), "2");
        assert_eq!(run(&env, "a = [5]; ++a[0]"), "6");
    }

    #[test]
    fn prefix_operators_stack() {
        let env = Env::new();
        assert_eq!(run(&env, "!!'x'"), "true");
        assert_eq!(run(&env, "-(-3)"), "3");
        assert_eq!(run(&env, "~5"), "-6");
        assert_eq!(run(&env, "+'12'"), "12");
        assert_eq!(run(&env, "!0"), "true");
    }

    #[test]
    fn increment_of_literal_fails() {
        let err = Engine::new().eval("5++", &Env::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}
