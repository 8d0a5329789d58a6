//! End-to-end scenarios: source text in, rendered value or error out.
//!
//! Each case runs in a fresh engine and scope unless it says otherwise.

use jscore::{Engine, Env, ErrorKind, Limits, Value};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn eval(src: &str) -> String {
    let engine = Engine::new();
    match engine.eval(src, &Env::new()) {
        Ok(v) => v.to_string(),
        Err(e) => panic!("{src:?} failed: {e}"),
    }
}

fn eval_in(env: &Env, src: &str) -> String {
    Engine::new()
        .eval(src, env)
        .unwrap_or_else(|e| panic!("{src:?} failed: {e}"))
        .to_string()
}

fn error(src: &str) -> jscore::ScriptError {
    match Engine::new().eval(src, &Env::new()) {
        Ok(v) => panic!("{src:?} unexpectedly gave {v}"),
        Err(e) => e,
    }
}

fn scope_s5() -> Env {
    let env = Env::new();
    env.set_local("S", Value::from("5"));
    env
}

// ── Reference behaviour ───────────────────────────────────────────────────────

#[test]
fn integer_arithmetic() {
    assert_eq!(eval("2+2"), "4");
    assert_eq!(eval("20*20*20"), "8000");
    assert!(matches!(Engine::new().eval("2+2", &Env::new()), Ok(Value::Int(4))));
}

#[test]
fn string_left_operand_concatenates() {
    assert_eq!(eval_in(&scope_s5(), "S+1"), "51");
}

#[test]
fn unary_plus_coerces_first() {
    assert_eq!(eval_in(&scope_s5(), "+S+1"), "6");
}

#[test]
fn if_requires_parenthesised_condition() {
    let e = error("if x=5 {x=7}");
    assert_eq!(e.kind(), ErrorKind::Syntax);
    assert_eq!(e.message(), "Expected ( but found x");
}

#[test]
fn braceless_if_else_is_rejected() {
    let e = error("if (x=5) x=7 else x=3");
    assert_eq!(e.kind(), ErrorKind::Syntax);
    assert_eq!(e.message(), "'else' should be used only inside 'if' declaration");
}

// ── Precedence and evaluation order ───────────────────────────────────────────

#[test]
fn precedence() {
    assert_eq!(eval("2+3*4"), "14");
    assert_eq!(eval("(2+3)*4"), "20");
    assert_eq!(eval("2**3**2"), "512");
    assert_eq!(eval("1 + 2 == 3 && 4 > 3"), "true");
    assert_eq!(eval("7 - 2 - 1"), "4");
}

#[test]
fn nested_ternaries_bind_to_nearest_question_mark() {
    let env = Env::new();
    for (a, b, c, expected) in [
        (true, false, false, "1"),
        (false, true, false, "2"),
        (false, false, true, "3"),
        (false, false, false, "4"),
    ] {
        env.set_local("a", Value::Bool(a));
        env.set_local("b", Value::Bool(b));
        env.set_local("c", Value::Bool(c));
        assert_eq!(eval_in(&env, "a ? 1 : b ? 2 : c ? 3 : 4"), expected);
    }
}

#[test]
fn short_circuit_skips_calls() {
    let env = Env::new();
    eval_in(&env, "n = 0; function f() { n = n + 1; return true }");
    eval_in(&env, "false && f(); true || f(); null ?? 1");
    assert_eq!(eval_in(&env, "n"), "0");
    eval_in(&env, "true && f()");
    assert_eq!(eval_in(&env, "n"), "1");
}

// ── Coercion ──────────────────────────────────────────────────────────────────

#[test]
fn coercions() {
    assert_eq!(eval("+'abc'"), "NaN");
    assert_eq!(eval("+'42'"), "42");
    assert_eq!(eval("!''"), "true");
    assert_eq!(eval("!'0'"), "false");
    assert_eq!(eval("true + 1"), "2");
    assert_eq!(eval("'3' * '4'"), "12");
    assert_eq!(eval("1 / 0"), "Infinity");
}

#[test]
fn nan_is_not_an_error() {
    assert_eq!(eval("'x' - 1"), "NaN");
    assert_eq!(eval("NaN == NaN"), "false");
}

// ── Scope write-back ──────────────────────────────────────────────────────────

#[test]
fn increment_mutates_defining_frame() {
    let outer = Env::new();
    outer.set_local("count", Value::Int(1));
    let inner = outer.push();
    eval_in(&inner, "count++");
    assert!(!inner.contains_local("count"));
    assert_eq!(outer.get("count"), Some(Value::Int(2)));
}

#[test]
fn objects_are_shared_by_reference() {
    assert_eq!(eval("o = {n: 1}; function bump(x) { x.n = x.n + 1 }; bump(o); o.n"), "2");
}

#[test]
fn missing_members_read_as_null() {
    assert_eq!(eval("o = {a: 1}; o.b"), "null");
    assert_eq!(eval("[1, 2][5]"), "null");
    let e = error("x = null; x.k");
    assert_eq!(e.kind(), ErrorKind::Type);
}

#[test]
fn unknown_identifier_is_reference_error() {
    let e = error("nope + 1");
    assert_eq!(e.kind(), ErrorKind::Reference);
    assert!(e.message().contains("is not defined"));
}

// ── Structured values ─────────────────────────────────────────────────────────

#[test]
fn json_round_trip_keeps_order() {
    let src = "o = {z: 1, a: [3, 2, 1], m: {y: true, b: null}}; JSON.stringify(JSON.parse(JSON.stringify(o)))";
    assert_eq!(eval(src), r#"{"z":1,"a":[3,2,1],"m":{"y":true,"b":null}}"#);
}

#[test]
fn structured_display_is_pretty_json() {
    assert_eq!(eval("[1, 2]"), "[\n  1,\n  2\n]");
}

// ── Statements and functions ──────────────────────────────────────────────────

#[test]
fn loops_and_functions() {
    assert_eq!(
        eval("function fib(n) { if (n < 2) { return n }; return fib(n - 1) + fib(n - 2) }; fib(15)"),
        "610"
    );
    assert_eq!(eval("t = 0; for (i = 0; i < 5; i++) { t += i }; t"), "10");
    assert_eq!(eval("s = ''; for (k in {a: 1, b: 2}) { s += k }; s"), "ab");
    assert_eq!(eval("t = 0; for (v of [4, 5, 6]) { t += v }; t"), "15");
    assert_eq!(eval("i = 0; while (true) { i++; if (i > 3) { break } }; i"), "4");
}

#[test]
fn closures_capture_scope() {
    assert_eq!(
        eval("function counter() { var n = 0; return () => { n = n + 1; return n } }; c = counter(); c(); c(); c()"),
        "3"
    );
}

#[test]
fn stdlib_in_concert() {
    assert_eq!(eval("[3, 1, 2].sort().map(x => x * 10).join('-')"), "10-20-30");
    assert_eq!(eval("Object.keys({b: 1, a: 2}).length"), "2");
    assert_eq!(eval("'a,b,c'.split(',').reverse().join('')"), "cba");
    assert_eq!(eval("Math.max(...[4, 9, 2])"), "9");
}

#[test]
fn unsupported_words_are_rejected() {
    let e = error("class A {}");
    assert_eq!(e.kind(), ErrorKind::Syntax);
    assert!(e.message().contains("'class' is not supported"), "{e}");
}

#[test]
fn deep_nesting_hits_the_limit() {
    let src = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
    assert_eq!(error(&src).kind(), ErrorKind::Limit);
}

#[test]
fn back_tick_strings_are_raw() {
    assert_eq!(eval("``a`b``"), "a`b");
    assert_eq!(eval("`a\\nb`"), "a\\nb");
    assert_eq!(eval("```x``y```.length"), "4");
    assert_eq!(error("`open").kind(), ErrorKind::Lexical);
}

#[test]
fn empty_loops_stop_at_the_statement_budget() {
    let engine = Engine::new().with_limits(Limits {
        max_statements: 1000,
        ..Limits::default()
    });
    for src in ["for (;;) {}", "while (true) {}", "do {} while (1)"] {
        let e = engine.eval(src, &Env::new()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Limit, "{src}");
    }
}

#[test]
fn runaway_recursion_reports_one_frame_line() {
    let e = error("function f(n) { return f(n + 1) }; f(0)");
    assert_eq!(e.kind(), ErrorKind::Limit);
    assert!(e.to_string().ends_with("in function f (x64)"), "{e}");
}
