//! Structured values: arrays and objects with prototypes.
//!
//! An [`Obj`] is a shared, interior-mutable handle.  Arrays hold positional
//! items; objects hold named fields in insertion order.  Objects with many
//! fields build a name → position index on first lookup; any structural
//! change drops it.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::Value;
use crate::error::{ScriptError, ScriptResult};
use crate::function::Function;

/// Bound on prototype chain walks.
pub const MAX_PROTO_DEPTH: usize = 64;
/// Field count at which objects start indexing names.
const INDEX_THRESHOLD: usize = 8;
/// Largest gap an index assignment may open past the end of an array.
const MAX_ARRAY_GAP: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Array,
    Object,
}

/// Opaque per-value slot.
#[derive(Clone, Default)]
pub enum Extra {
    #[default]
    None,
    /// Invoking the structured value calls this function.
    Callable(Rc<Function>),
    /// Position of an array iterator.
    Iterator { cursor: usize },
    /// Host data, e.g. a compiled regular expression.
    Opaque(Rc<dyn Any>),
}

impl fmt::Debug for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extra::None => f.write_str("None"),
            Extra::Callable(func) => write!(f, "Callable({})", func.name),
            Extra::Iterator { cursor } => write!(f, "Iterator({cursor})"),
            Extra::Opaque(_) => f.write_str("Opaque"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: Rc<str>,
    pub value: Value,
}

#[derive(Debug)]
enum Slots {
    Items(Vec<Value>),
    Fields(Vec<Field>),
}

#[derive(Debug)]
struct Structured {
    slots: Slots,
    proto: Option<Obj>,
    extra: Extra,
    index: RefCell<Option<HashMap<Rc<str>, usize>>>,
}

impl Structured {
    fn position(&self, name: &str) -> Option<usize> {
        let Slots::Fields(fields) = &self.slots else {
            return None;
        };
        if fields.len() < INDEX_THRESHOLD {
            return fields.iter().position(|f| &*f.name == name);
        }
        let mut index = self.index.borrow_mut();
        let map = index.get_or_insert_with(|| {
            fields
                .iter()
                .enumerate()
                .map(|(i, f)| (Rc::clone(&f.name), i))
                .collect()
        });
        map.get(name).copied()
    }

    fn invalidate(&mut self) {
        *self.index.get_mut() = None;
    }
}

/// Positional index named by `key`, if it is a canonical non-negative integer.
pub fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Int(i) => usize::try_from(*i).ok(),
        Value::Number(f) if f.fract() == 0.0 && *f >= 0.0 && *f < 9.0e15 => Some(*f as usize),
        Value::Str(s) => {
            let canonical = !s.is_empty() && (s.len() == 1 || !s.starts_with('0'));
            if canonical && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Shared handle to an array or object.
#[derive(Clone)]
pub struct Obj(Rc<RefCell<Structured>>);

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj({:?}, len={})", self.kind(), self.len())
    }
}

impl Obj {
    fn from_slots(slots: Slots) -> Obj {
        Obj(Rc::new(RefCell::new(Structured {
            slots,
            proto: None,
            extra: Extra::None,
            index: RefCell::new(None),
        })))
    }

    pub fn array(items: Vec<Value>) -> Obj {
        Obj::from_slots(Slots::Items(items))
    }

    pub fn object() -> Obj {
        Obj::from_slots(Slots::Fields(Vec::new()))
    }

    pub fn from_fields<I>(fields: I) -> Obj
    where
        I: IntoIterator<Item = (Rc<str>, Value)>,
    {
        let obj = Obj::object();
        for (name, value) in fields {
            obj.set_named(&name, value);
        }
        obj
    }

    /// Builder form of [`Obj::set_proto`] for fresh values, which cannot form cycles.
    #[must_use]
    pub fn with_proto(self, proto: Option<Obj>) -> Obj {
        self.0.borrow_mut().proto = proto;
        self
    }

    #[must_use]
    pub fn with_extra(self, extra: Extra) -> Obj {
        self.0.borrow_mut().extra = extra;
        self
    }

    pub fn kind(&self) -> Kind {
        match self.0.borrow().slots {
            Slots::Items(_) => Kind::Array,
            Slots::Fields(_) => Kind::Object,
        }
    }

    pub fn is_array(&self) -> bool {
        self.kind() == Kind::Array
    }

    pub fn len(&self) -> usize {
        match &self.0.borrow().slots {
            Slots::Items(items) => items.len(),
            Slots::Fields(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn get_index(&self, i: usize) -> Option<Value> {
        match &self.0.borrow().slots {
            Slots::Items(items) => items.get(i).cloned(),
            Slots::Fields(_) => None,
        }
    }

    pub fn get_named(&self, name: &str) -> Option<Value> {
        let s = self.0.borrow();
        match &s.slots {
            Slots::Items(items) => array_index(&Value::str(name)).and_then(|i| items.get(i).cloned()),
            Slots::Fields(fields) => s.position(name).map(|i| fields[i].value.clone()),
        }
    }

    /// Own member named by `key`; arrays answer positional keys only.
    pub fn get_own(&self, key: &Value) -> Option<Value> {
        if self.is_array() {
            array_index(key).and_then(|i| self.get_index(i))
        } else {
            self.get_named(&key.to_js_string())
        }
    }

    pub fn has_own(&self, name: &str) -> bool {
        let s = self.0.borrow();
        match &s.slots {
            Slots::Items(items) => array_index(&Value::str(name)).is_some_and(|i| i < items.len()),
            Slots::Fields(_) => s.position(name).is_some(),
        }
    }

    /// Own member, then the prototype chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.get_named(name) {
            return Some(v);
        }
        let mut cur = self.proto();
        let mut depth = 0;
        while let Some(p) = cur {
            if depth >= MAX_PROTO_DEPTH {
                break;
            }
            if let Some(v) = p.get_named(name) {
                return Some(v);
            }
            cur = p.proto();
            depth += 1;
        }
        None
    }

    pub fn values(&self) -> Vec<Value> {
        match &self.0.borrow().slots {
            Slots::Items(items) => items.clone(),
            Slots::Fields(fields) => fields.iter().map(|f| f.value.clone()).collect(),
        }
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        match &self.0.borrow().slots {
            Slots::Items(items) => (0..items.len()).map(|i| Rc::from(i.to_string())).collect(),
            Slots::Fields(fields) => fields.iter().map(|f| Rc::clone(&f.name)).collect(),
        }
    }

    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        match &self.0.borrow().slots {
            Slots::Items(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Rc::from(i.to_string()), v.clone()))
                .collect(),
            Slots::Fields(fields) => fields.iter().map(|f| (Rc::clone(&f.name), f.value.clone())).collect(),
        }
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    pub fn push(&self, value: Value) {
        let mut s = self.0.borrow_mut();
        if let Slots::Items(items) = &mut s.slots {
            items.push(value);
        }
    }

    /// Replace all items of an array (objects are left untouched).
    pub fn replace_items(&self, new_items: Vec<Value>) {
        let mut s = self.0.borrow_mut();
        if let Slots::Items(items) = &mut s.slots {
            *items = new_items;
        }
    }

    pub fn set_index(&self, i: usize, value: Value) -> ScriptResult<()> {
        let mut s = self.0.borrow_mut();
        let Slots::Items(items) = &mut s.slots else {
            drop(s);
            self.set_named(&i.to_string(), value);
            return Ok(());
        };
        if i >= items.len() {
            if i - items.len() > MAX_ARRAY_GAP {
                return Err(ScriptError::range(format!("Invalid array index {i}")));
            }
            items.resize(i + 1, Value::Undefined);
        }
        items[i] = value;
        Ok(())
    }

    /// Insert or replace an object field; on arrays, positional names only.
    ///
    /// Returns `false` when an array rejects the store: `name` is not a
    /// position, or the position is out of range.
    pub fn set_named(&self, name: &str, value: Value) -> bool {
        let mut s = self.0.borrow_mut();
        if let Slots::Items(_) = s.slots {
            drop(s);
            return array_index(&Value::str(name)).is_some_and(|i| self.set_index(i, value).is_ok());
        }
        match s.position(name) {
            Some(i) => {
                if let Slots::Fields(fields) = &mut s.slots {
                    fields[i].value = value;
                }
            }
            None => {
                s.invalidate();
                if let Slots::Fields(fields) = &mut s.slots {
                    fields.push(Field {
                        name: Rc::from(name),
                        value,
                    });
                }
            }
        }
        true
    }

    pub fn set_key(&self, key: &Value, value: Value) -> ScriptResult<()> {
        if !self.is_array() {
            self.set_named(&key.to_js_string(), value);
            return Ok(());
        }
        if let Some(i) = array_index(key) {
            return self.set_index(i, value);
        }
        if key.to_js_string() == "length" {
            let n = value.to_integer();
            let Ok(n) = usize::try_from(n) else {
                return Err(ScriptError::range("Invalid array length"));
            };
            let mut items = self.values();
            if n > items.len() + MAX_ARRAY_GAP {
                return Err(ScriptError::range("Invalid array length"));
            }
            items.resize(n, Value::Undefined);
            self.replace_items(items);
            return Ok(());
        }
        Err(ScriptError::type_error(format!(
            "Cannot set property '{}' of array",
            key.to_js_string()
        )))
    }

    /// Delete a member; array positions become `undefined`.
    pub fn remove_key(&self, key: &Value) -> bool {
        let mut s = self.0.borrow_mut();
        match &mut s.slots {
            Slots::Items(items) => match array_index(key) {
                Some(i) if i < items.len() => {
                    items[i] = Value::Undefined;
                    true
                }
                _ => false,
            },
            Slots::Fields(_) => {
                let name = key.to_js_string();
                let Some(i) = s.position(&name) else {
                    return false;
                };
                s.invalidate();
                if let Slots::Fields(fields) = &mut s.slots {
                    fields.remove(i);
                }
                true
            }
        }
    }

    // ── Prototype and extra slot ──────────────────────────────────────────────

    pub fn proto(&self) -> Option<Obj> {
        self.0.borrow().proto.clone()
    }

    /// Install a prototype, refusing chains that would loop back to `self`.
    pub fn set_proto(&self, proto: Option<Obj>) -> ScriptResult<()> {
        let mut cur = proto.clone();
        let mut depth = 0;
        while let Some(p) = cur {
            if p.ptr_eq(self) {
                return Err(ScriptError::type_error("Cyclic __proto__ value"));
            }
            depth += 1;
            if depth > MAX_PROTO_DEPTH {
                return Err(ScriptError::limit("Prototype chain is too deep"));
            }
            cur = p.proto();
        }
        self.0.borrow_mut().proto = proto;
        Ok(())
    }

    pub fn extra(&self) -> Extra {
        self.0.borrow().extra.clone()
    }

    pub fn set_extra(&self, extra: Extra) {
        self.0.borrow_mut().extra = extra;
    }

    pub fn callable(&self) -> Option<Rc<Function>> {
        match &self.0.borrow().extra {
            Extra::Callable(f) => Some(Rc::clone(f)),
            _ => None,
        }
    }

    pub fn is_iterator(&self) -> bool {
        matches!(self.0.borrow().extra, Extra::Iterator { .. })
    }

    /// Current iterator position, advancing it.
    pub fn advance_cursor(&self) -> Option<usize> {
        let mut s = self.0.borrow_mut();
        match &mut s.extra {
            Extra::Iterator { cursor } => {
                let at = *cursor;
                *cursor += 1;
                Some(at)
            }
            _ => None,
        }
    }

    pub fn opaque<T: Any>(&self) -> Option<Rc<T>> {
        match &self.0.borrow().extra {
            Extra::Opaque(data) => Rc::clone(data).downcast::<T>().ok(),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_fields_keep_insertion_order() {
        let o = Obj::object();
        o.set_named("b", Value::Int(1));
        o.set_named("a", Value::Int(2));
        o.set_named("b", Value::Int(3));
        let keys: Vec<String> = o.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(o.get_named("b").map(|v| v.to_integer()), Some(3));
    }

    #[test]
    fn large_objects_use_index_and_stay_consistent() {
        let o = Obj::object();
        for i in 0..20 {
            o.set_named(&format!("k{i}"), Value::Int(i));
        }
        assert_eq!(o.get_named("k13").map(|v| v.to_integer()), Some(13));
        assert!(o.remove_key(&Value::str("k3")));
        assert_eq!(o.get_named("k13").map(|v| v.to_integer()), Some(13));
        assert!(o.get_named("k3").is_none());
        o.set_named("late", Value::Int(99));
        assert_eq!(o.get_named("late").map(|v| v.to_integer()), Some(99));
    }

    #[test]
    fn array_keys() {
        let a = Obj::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(a.get_own(&Value::str("1")).map(|v| v.to_integer()), Some(2));
        assert!(a.get_own(&Value::str("01")).is_none());
        a.set_key(&Value::Int(4), Value::Int(5)).unwrap();
        assert_eq!(a.len(), 5);
        assert!(a.set_key(&Value::str("x"), Value::Null).is_err());
        a.set_key(&Value::str("length"), Value::Int(1)).unwrap();
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn prototype_cycles_are_rejected() {
        let a = Obj::object();
        let b = Obj::object();
        b.set_proto(Some(a.clone())).unwrap();
        assert!(a.set_proto(Some(b.clone())).is_err());
        assert!(a.set_proto(Some(a.clone())).is_err());
        a.set_named("x", Value::Int(7));
        assert_eq!(b.lookup("x").map(|v| v.to_integer()), Some(7));
    }

    #[test]
    fn array_set_named_reports_rejected_stores() {
        let a = Obj::array(vec![Value::Int(1)]);
        assert!(a.set_named("1", Value::Int(2)));
        assert_eq!(a.len(), 2);
        assert!(!a.set_named("x", Value::Int(3)));
        assert!(!a.set_named(&(MAX_ARRAY_GAP + 10).to_string(), Value::Int(4)));
        assert_eq!(a.len(), 2);
        assert!(Obj::object().set_named("x", Value::Int(3)));
    }

    #[test]
    fn iterator_cursor_advances() {
        let it = Obj::array(vec![]).with_extra(Extra::Iterator { cursor: 0 });
        assert_eq!(it.advance_cursor(), Some(0));
        assert_eq!(it.advance_cursor(), Some(1));
        assert!(it.is_iterator());
    }
}
