use proptest::prelude::*;

use jscore::lexer::tokenize;
use jscore::parser::compile;
use jscore::{Engine, Env, Language, Value};

proptest! {
    /// The lexer returns Ok or Err on arbitrary bytes but never panics.
    #[test]
    fn lexer_does_not_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = tokenize(&bytes, "prop", &Language::common());
    }

    /// Same for the parser, over text built from the language's own alphabet.
    #[test]
    fn parser_does_not_panic(s in "[a-z0-9 +*/%=<>!&|?:;,.()\\[\\]{}'\"-]{0,64}") {
        let _ = compile(&s, "prop", &Language::common());
    }

    /// Evaluation of arbitrary printable input never panics either.
    #[test]
    fn eval_does_not_panic(s in "\\PC{0,48}") {
        let _ = Engine::new().eval(&s, &Env::new());
    }
}

proptest! {
    /// Integer arithmetic agrees with Rust's wherever Rust does not overflow.
    #[test]
    fn int_arithmetic_matches_rust(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let engine = Engine::new();
        let env = Env::new();
        env.set_local("a", Value::Int(a));
        env.set_local("b", Value::Int(b));
        prop_assert_eq!(engine.eval("a + b", &env).unwrap(), Value::Int(a + b));
        prop_assert_eq!(engine.eval("a - b", &env).unwrap(), Value::Int(a - b));
        prop_assert_eq!(engine.eval("a * b", &env).unwrap(), Value::Int(a * b));
        prop_assert_eq!(engine.eval("a & b", &env).unwrap(), Value::Int(a & b));
        prop_assert_eq!(engine.eval("a | b", &env).unwrap(), Value::Int(a | b));
        prop_assert_eq!(engine.eval("a ^ b", &env).unwrap(), Value::Int(a ^ b));
    }

    /// `%` keeps the dividend's sign like Rust's remainder.
    #[test]
    fn int_remainder_matches_rust(a in -1_000_000i64..1_000_000, b in 1i64..1000) {
        let env = Env::new();
        env.set_local("a", Value::Int(a));
        env.set_local("b", Value::Int(b));
        prop_assert_eq!(Engine::new().eval("a % b", &env).unwrap(), Value::Int(a % b));
    }

    /// Literal sums are folded the same way regardless of grouping.
    #[test]
    fn addition_associates(a in 0i64..10_000, b in 0i64..10_000, c in 0i64..10_000) {
        let engine = Engine::new();
        let left = engine.eval(&format!("({a} + {b}) + {c}"), &Env::new()).unwrap();
        let right = engine.eval(&format!("{a} + ({b} + {c})"), &Env::new()).unwrap();
        prop_assert_eq!(left, right);
    }

    /// Comparisons on integers agree with Rust's ordering.
    #[test]
    fn int_comparison_matches_rust(a in any::<i32>(), b in any::<i32>()) {
        let env = Env::new();
        env.set_local("a", Value::Int(i64::from(a)));
        env.set_local("b", Value::Int(i64::from(b)));
        let engine = Engine::new();
        prop_assert_eq!(engine.eval("a < b", &env).unwrap(), Value::Bool(a < b));
        prop_assert_eq!(engine.eval("a >= b", &env).unwrap(), Value::Bool(a >= b));
        prop_assert_eq!(engine.eval("a === b", &env).unwrap(), Value::Bool(a == b));
    }
}
