//! Arithmetic and bitwise operators on values.
//!
//! Integer operands stay integers while the result is exact and fits;
//! anything else falls back to floats.  Invalid numeric input yields NaN
//! rather than an error.

use super::{Numeric, Value};

fn float_op(a: Numeric, b: Numeric, op: impl Fn(f64, f64) -> f64) -> Value {
    Value::number(op(a.as_f64(), b.as_f64()))
}

fn int_or_float(
    a: &Value,
    b: &Value,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    op: impl Fn(f64, f64) -> f64,
) -> Value {
    match (a.to_numeric(), b.to_numeric()) {
        (Numeric::NaN, _) | (_, Numeric::NaN) => Value::NaN,
        (Numeric::Int(x), Numeric::Int(y)) => match int_op(x, y) {
            Some(n) => Value::Int(n),
            None => Value::number(op(x as f64, y as f64)),
        },
        (x, y) => float_op(x, y, op),
    }
}

fn integer_pair(a: &Value, b: &Value) -> Option<(i64, i64)> {
    match (a.to_numeric(), b.to_numeric()) {
        (Numeric::NaN, _) | (_, Numeric::NaN) => None,
        (x, y) => Some((truncate(x), truncate(y))),
    }
}

fn truncate(n: Numeric) -> i64 {
    match n {
        Numeric::Int(i) => i,
        Numeric::Float(f) => f as i64,
        Numeric::NaN => 0,
    }
}

impl Value {
    /// Whether `+` with this operand concatenates instead of adding.
    fn concatenates(&self) -> bool {
        matches!(
            self,
            Value::Str(_) | Value::Structured(_) | Value::Function(_) | Value::Error(_)
        )
    }

    pub fn arith_add(&self, rhs: &Value) -> Value {
        if self.concatenates() || rhs.concatenates() {
            let mut s = self.to_js_string();
            s.push_str(&rhs.to_js_string());
            return Value::from(s);
        }
        int_or_float(self, rhs, i64::checked_add, |x, y| x + y)
    }

    pub fn arith_sub(&self, rhs: &Value) -> Value {
        int_or_float(self, rhs, i64::checked_sub, |x, y| x - y)
    }

    pub fn arith_mul(&self, rhs: &Value) -> Value {
        int_or_float(self, rhs, i64::checked_mul, |x, y| x * y)
    }

    pub fn arith_div(&self, rhs: &Value) -> Value {
        let exact = |x: i64, y: i64| {
            if y != 0 && x.checked_rem(y) == Some(0) {
                x.checked_div(y)
            } else {
                None
            }
        };
        int_or_float(self, rhs, exact, |x, y| x / y)
    }

    pub fn arith_rem(&self, rhs: &Value) -> Value {
        match (self.to_numeric(), rhs.to_numeric()) {
            (Numeric::Int(_), Numeric::Int(0)) => Value::NaN,
            (Numeric::Int(x), Numeric::Int(y)) => Value::Int(x.checked_rem(y).unwrap_or(0)),
            (Numeric::NaN, _) | (_, Numeric::NaN) => Value::NaN,
            (x, y) => float_op(x, y, |a, b| a % b),
        }
    }

    pub fn arith_pow(&self, rhs: &Value) -> Value {
        let int_pow = |x: i64, y: i64| u32::try_from(y).ok().and_then(|e| x.checked_pow(e));
        int_or_float(self, rhs, int_pow, f64::powf)
    }

    pub fn arith_neg(&self) -> Value {
        match self.to_numeric() {
            Numeric::Int(n) => n.checked_neg().map_or(Value::Number(-(n as f64)), Value::Int),
            Numeric::Float(f) => Value::Number(-f),
            Numeric::NaN => Value::NaN,
        }
    }

    /// Unary `+`: numeric conversion.
    pub fn arith_plus(&self) -> Value {
        self.to_numeric().into_value()
    }

    // ── Bitwise (64-bit) ──────────────────────────────────────────────────────

    pub fn bit_and(&self, rhs: &Value) -> Value {
        integer_pair(self, rhs).map_or(Value::NaN, |(x, y)| Value::Int(x & y))
    }

    pub fn bit_or(&self, rhs: &Value) -> Value {
        integer_pair(self, rhs).map_or(Value::NaN, |(x, y)| Value::Int(x | y))
    }

    pub fn bit_xor(&self, rhs: &Value) -> Value {
        integer_pair(self, rhs).map_or(Value::NaN, |(x, y)| Value::Int(x ^ y))
    }

    pub fn bit_not(&self) -> Value {
        match self.to_numeric() {
            Numeric::NaN => Value::NaN,
            n => Value::Int(!truncate(n)),
        }
    }

    pub fn shift_left(&self, rhs: &Value) -> Value {
        integer_pair(self, rhs).map_or(Value::NaN, |(x, y)| Value::Int(x.wrapping_shl((y & 63) as u32)))
    }

    pub fn shift_right(&self, rhs: &Value) -> Value {
        integer_pair(self, rhs).map_or(Value::NaN, |(x, y)| Value::Int(x >> (y & 63)))
    }

    pub fn shift_right_unsigned(&self, rhs: &Value) -> Value {
        integer_pair(self, rhs).map_or(Value::NaN, |(x, y)| Value::Int(((x as u64) >> (y & 63)) as i64))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    #[test]
    fn add_concatenates_with_strings() {
        assert_eq!(Value::from("5").arith_add(&int(1)).to_js_string(), "51");
        assert_eq!(int(1).arith_add(&Value::from("5")).to_js_string(), "15");
        assert_eq!(int(2).arith_add(&int(2)).to_js_string(), "4");
        assert_eq!(Value::Null.arith_add(&int(2)).to_js_string(), "2");
        assert!(matches!(Value::Undefined.arith_add(&int(2)), Value::NaN));
    }

    #[test]
    fn integer_overflow_falls_back_to_float() {
        let v = int(i64::MAX).arith_add(&int(1));
        assert!(matches!(v, Value::Number(_)));
        assert!(matches!(int(i64::MAX).arith_mul(&int(2)), Value::Number(_)));
    }

    #[test]
    fn division() {
        assert!(matches!(int(6).arith_div(&int(3)), Value::Int(2)));
        assert_eq!(int(7).arith_div(&int(2)).to_js_string(), "3.5");
        assert_eq!(int(1).arith_div(&int(0)).to_js_string(), "Infinity");
        assert!(matches!(int(0).arith_div(&int(0)), Value::NaN));
    }

    #[test]
    fn remainder() {
        assert!(matches!(int(7).arith_rem(&int(0)), Value::NaN));
        assert!(matches!(int(-7).arith_rem(&int(3)), Value::Int(-1)));
        assert_eq!(Value::Number(5.5).arith_rem(&int(2)).to_js_string(), "1.5");
    }

    #[test]
    fn power() {
        assert!(matches!(int(2).arith_pow(&int(10)), Value::Int(1024)));
        assert_eq!(int(2).arith_pow(&int(-1)).to_js_string(), "0.5");
        assert!(matches!(int(10).arith_pow(&int(30)), Value::Number(_)));
    }

    #[test]
    fn bitwise() {
        assert!(matches!(int(-8).shift_right(&int(1)), Value::Int(-4)));
        assert!(matches!(int(1).shift_left(&int(40)), Value::Int(1_099_511_627_776)));
        assert!(matches!(int(-1).shift_right_unsigned(&int(60)), Value::Int(15)));
        assert!(matches!(int(6).bit_and(&int(3)), Value::Int(2)));
        assert!(matches!(Value::from("x").bit_not(), Value::NaN));
        assert!(matches!(int(0).bit_not(), Value::Int(-1)));
    }

    #[test]
    fn negation() {
        assert!(matches!(Value::from("3").arith_neg(), Value::Int(-3)));
        assert!(matches!(Value::from("abc").arith_plus(), Value::NaN));
    }
}
