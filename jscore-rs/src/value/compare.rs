//! Loose, strict and structural comparison.
//!
//! Loose comparison picks a mode from the weaker of the two operand kinds
//! (strings are the strongest, then integers, then floats) and reports
//! [`Comparison::NotApplicable`] when the operands cannot be ordered.

use std::cmp::Ordering;
use std::rc::Rc;

use super::{Numeric, Value};

const MAX_DEEP_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Equal,
    Greater,
    /// Neither ordered nor equal: `NaN`, `undefined`, or `null` against a non-null value.
    NotApplicable,
}

impl Comparison {
    fn from_ordering(o: Option<Ordering>) -> Comparison {
        match o {
            Some(Ordering::Less) => Comparison::Less,
            Some(Ordering::Equal) => Comparison::Equal,
            Some(Ordering::Greater) => Comparison::Greater,
            None => Comparison::NotApplicable,
        }
    }

    pub fn is_eq(self) -> bool {
        self == Comparison::Equal
    }

    pub fn is_lt(self) -> bool {
        self == Comparison::Less
    }

    pub fn is_le(self) -> bool {
        matches!(self, Comparison::Less | Comparison::Equal)
    }

    pub fn is_gt(self) -> bool {
        self == Comparison::Greater
    }

    pub fn is_ge(self) -> bool {
        matches!(self, Comparison::Greater | Comparison::Equal)
    }
}

/// How two values are compared; the weaker operand decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompareMode {
    Not,
    Numbers,
    Integers,
    Strings,
}

impl CompareMode {
    pub fn of(v: &Value) -> CompareMode {
        match v {
            Value::Undefined | Value::NaN => CompareMode::Not,
            Value::Number(_) => CompareMode::Numbers,
            Value::Null | Value::Bool(_) | Value::Int(_) => CompareMode::Integers,
            Value::Str(_) | Value::Function(_) | Value::Structured(_) | Value::Error(_) => CompareMode::Strings,
        }
    }
}

fn numeric_ordering(a: Numeric, b: Numeric) -> Option<Ordering> {
    match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => Some(x.cmp(&y)),
        (x, y) => x.as_f64().partial_cmp(&y.as_f64()),
    }
}

fn same_reference(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Structured(x), Value::Structured(y)) => Some(x.ptr_eq(y)),
        (Value::Function(x), Value::Function(y)) => Some(Rc::ptr_eq(x, y)),
        _ => None,
    }
}

impl Value {
    /// Loose comparison backing `==`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn compare(&self, other: &Value) -> Comparison {
        if let Some(same) = same_reference(self, other) {
            return if same { Comparison::Equal } else { Comparison::NotApplicable };
        }
        if self.is_nullish() && other.is_nullish() {
            return Comparison::Equal;
        }
        let mode = CompareMode::of(self).min(CompareMode::of(other));
        let result = match mode {
            CompareMode::Not => Comparison::NotApplicable,
            CompareMode::Numbers | CompareMode::Integers => {
                Comparison::from_ordering(numeric_ordering(self.to_numeric(), other.to_numeric()))
            }
            CompareMode::Strings => Comparison::from_ordering(Some(self.to_js_string().cmp(&other.to_js_string()))),
        };
        let one_null = matches!(self, Value::Null) != matches!(other, Value::Null);
        if result == Comparison::Equal && one_null {
            Comparison::NotApplicable
        } else {
            result
        }
    }

    /// `===`: same kind family and same value; structured values by identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        if let Some(same) = same_reference(self, other) {
            return same;
        }
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) | (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Int(_) | Value::Number(_), Value::Int(_) | Value::Number(_)) => {
                numeric_ordering(self.to_numeric(), other.to_numeric()) == Some(Ordering::Equal)
            }
            _ => false,
        }
    }

    /// Like [`Value::strict_equals`], but `NaN` matches `NaN`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        matches!((self, other), (Value::NaN, Value::NaN)) || self.strict_equals(other)
    }
}

/// Structural equality over arrays and objects; scalars compare strictly.
pub fn deep_equals(a: &Value, b: &Value) -> bool {
    deep_at(a, b, 0)
}

fn deep_at(a: &Value, b: &Value, depth: usize) -> bool {
    let (Value::Structured(x), Value::Structured(y)) = (a, b) else {
        return a.strict_equals(b);
    };
    if x.ptr_eq(y) {
        return true;
    }
    if depth >= MAX_DEEP_DEPTH || x.kind() != y.kind() || x.len() != y.len() {
        return false;
    }
    if x.is_array() {
        x.values()
            .iter()
            .zip(y.values().iter())
            .all(|(l, r)| deep_at(l, r, depth + 1))
    } else {
        x.entries()
            .iter()
            .all(|(k, v)| y.get_named(k).is_some_and(|w| deep_at(v, &w, depth + 1)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Obj;

    #[test]
    fn weaker_kind_picks_mode() {
        assert_eq!(Value::from("5").compare(&Value::Int(5)), Comparison::Equal);
        assert_eq!(Value::from("10").compare(&Value::from("9")), Comparison::Less);
        assert_eq!(Value::Int(10).compare(&Value::from("9")), Comparison::Greater);
        assert_eq!(Value::Number(1.5).compare(&Value::Int(1)), Comparison::Greater);
        assert_eq!(Value::Bool(true).compare(&Value::Int(1)), Comparison::Equal);
    }

    #[test]
    fn null_against_non_null() {
        assert_eq!(Value::Null.compare(&Value::Int(0)), Comparison::NotApplicable);
        assert_eq!(Value::Null.compare(&Value::Int(1)), Comparison::Less);
        assert_eq!(Value::Null.compare(&Value::Undefined), Comparison::Equal);
        assert_eq!(Value::NaN.compare(&Value::NaN), Comparison::NotApplicable);
    }

    #[test]
    fn strict() {
        assert!(Value::Int(1).strict_equals(&Value::Number(1.0)));
        assert!(!Value::Int(1).strict_equals(&Value::from("1")));
        assert!(!Value::NaN.strict_equals(&Value::NaN));
        assert!(Value::NaN.same_value_zero(&Value::NaN));
        let o = Value::from(Obj::object());
        assert!(o.strict_equals(&o.clone()));
        assert!(!o.strict_equals(&Value::from(Obj::object())));
    }

    #[test]
    fn deep() {
        let a = Obj::object();
        a.set_named("x", Value::array(vec![Value::Int(1)]));
        let b = Obj::object();
        b.set_named("x", Value::array(vec![Value::Int(1)]));
        assert!(deep_equals(&a.clone().into(), &b.clone().into()));
        b.set_named("y", Value::Null);
        assert!(!deep_equals(&a.into(), &b.into()));
    }
}
