//! Scope chain.
//!
//! An [`Env`] is a handle to one frame of a linked stack of variable
//! tables.  Block statements push plain frames; function calls push
//! *boundary* frames, which own `var` declarations and the call's `this`.
//! Handles are cheap to clone and share the frames they point at, so a
//! closure keeps its defining scope alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

#[derive(Default)]
struct Frame {
    vars: HashMap<Rc<str>, Value>,
    parent: Option<Env>,
    this: Option<Value>,
    boundary: bool,
}

/// Handle to the innermost frame of a scope chain.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Frame>>);

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("locals", &self.local_names())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Env {
    /// A fresh root frame.
    pub fn new() -> Self {
        Env(Rc::new(RefCell::new(Frame {
            boundary: true,
            ..Frame::default()
        })))
    }

    fn child(&self, boundary: bool) -> Env {
        Env(Rc::new(RefCell::new(Frame {
            parent: Some(self.clone()),
            boundary,
            ..Frame::default()
        })))
    }

    /// Push a block frame.
    pub fn push(&self) -> Env {
        self.child(false)
    }

    /// Push a function frame.
    pub fn push_function(&self) -> Env {
        self.child(true)
    }

    /// The enclosing frame, or `None` at the root.
    pub fn pop(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of frames between this one and the root.
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut cur = self.pop();
        while let Some(env) = cur {
            n += 1;
            cur = env.pop();
        }
        n
    }

    /// First frame, walking outwards, for which `f` answers `Some`.
    fn find<T>(&self, mut f: impl FnMut(&Frame) -> Option<T>) -> Option<T> {
        let mut cur = Some(self.clone());
        while let Some(env) = cur {
            let frame = env.0.borrow();
            if let Some(found) = f(&frame) {
                return Some(found);
            }
            cur = frame.parent.clone();
        }
        None
    }

    fn owner_of(&self, name: &str) -> Option<Env> {
        let mut cur = Some(self.clone());
        while let Some(env) = cur {
            if env.0.borrow().vars.contains_key(name) {
                return Some(env);
            }
            cur = env.pop();
        }
        None
    }

    fn function_frame(&self) -> Env {
        let mut env = self.clone();
        loop {
            let next = {
                let frame = env.0.borrow();
                if frame.boundary {
                    None
                } else {
                    frame.parent.clone()
                }
            };
            match next {
                Some(parent) => env = parent,
                None => return env,
            }
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn get(&self, name: &str) -> Option<Value> {
        self.find(|frame| frame.vars.get(name).cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.owner_of(name).is_some()
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.borrow().vars.contains_key(name)
    }

    /// `this` of the nearest frame that binds one.
    pub fn this_value(&self) -> Value {
        self.find(|frame| frame.this.clone()).unwrap_or_default()
    }

    /// Names declared in this frame, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().vars.keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Create or overwrite `name` in this frame.
    pub fn set_local(&self, name: &str, value: Value) {
        self.0.borrow_mut().vars.insert(Rc::from(name), value);
    }

    /// Assign to the nearest frame that already declares `name`, or to this
    /// frame if none does.
    pub fn set_deep(&self, name: &str, value: Value) {
        let owner = self.owner_of(name).unwrap_or_else(|| self.clone());
        owner.set_local(name, value);
    }

    /// Declare `name` in the nearest function frame, leaving an existing
    /// binding untouched.
    pub fn declare_var(&self, name: &str) {
        let frame = self.function_frame();
        if !frame.contains_local(name) {
            frame.set_local(name, Value::Undefined);
        }
    }

    /// Remove the nearest binding of `name`.
    pub fn delete(&self, name: &str) -> bool {
        match self.owner_of(name) {
            Some(owner) => owner.0.borrow_mut().vars.remove(name).is_some(),
            None => false,
        }
    }

    pub fn set_this(&self, this: Value) {
        self.0.borrow_mut().this = Some(this);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn int(env: &Env, name: &str) -> Option<i64> {
        env.get(name).map(|v| v.to_integer())
    }

    #[test]
    fn lookup_walks_outwards() {
        let root = Env::new();
        root.set_local("x", Value::Int(1));
        let inner = root.push().push();
        assert_eq!(int(&inner, "x"), Some(1));
        assert!(inner.contains("x"));
        assert!(!inner.contains_local("x"));
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn set_deep_writes_to_owner() {
        let root = Env::new();
        root.set_local("x", Value::Int(1));
        let inner = root.push();
        inner.set_deep("x", Value::Int(2));
        assert_eq!(int(&root, "x"), Some(2));
        assert!(!inner.contains_local("x"));
    }

    #[test]
    fn set_deep_creates_in_current_frame() {
        let root = Env::new();
        let inner = root.push();
        inner.set_deep("y", Value::Int(3));
        assert!(inner.contains_local("y"));
        assert!(!root.contains("y"));
        assert!(inner.pop().is_some_and(|p| p.ptr_eq(&root)));
    }

    #[test]
    fn shadowing_and_delete() {
        let root = Env::new();
        root.set_local("x", Value::Int(1));
        let inner = root.push();
        inner.set_local("x", Value::Int(2));
        assert_eq!(int(&inner, "x"), Some(2));
        assert!(inner.delete("x"));
        assert_eq!(int(&inner, "x"), Some(1));
        assert!(inner.delete("x"));
        assert!(!inner.delete("x"));
    }

    #[test]
    fn var_goes_to_function_frame() {
        let root = Env::new();
        let func = root.push_function();
        let block = func.push().push();
        block.declare_var("v");
        assert!(func.contains_local("v"));
        assert!(!root.contains("v"));
    }

    #[test]
    fn this_binding() {
        let root = Env::new();
        assert!(matches!(root.this_value(), Value::Undefined));
        let func = root.push_function();
        func.set_this(Value::Int(9));
        assert_eq!(func.push().this_value().to_integer(), 9);
    }
}
