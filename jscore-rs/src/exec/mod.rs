//! Tree-walking executor.
//!
//! The [`Interp`] walks a compiled [`Program`] against a scope chain.
//! Operator nodes dispatch to the visitors registered in the active
//! [`Language`]; eager visitors get evaluated operands, lazy ones get the
//! node and decide what to evaluate.  Operands resolve to a [`Resolved`]
//! pair so that unary attributes and assignments can write back into the
//! place a value came from.

pub mod assign;
pub mod operators;
mod stmt;
pub mod unary;

use std::mem;
use std::rc::Rc;

use crate::ast::{Bracket, FunctionDef, Node, NodeId, NodeKind, PrefixOp, Program};
use crate::engine::Engine;
use crate::error::{ScriptError, ScriptResult};
use crate::function::{Function, FunctionKind, UserFunction};
use crate::grammar::{DataGetter, Language, Visitor};
use crate::options::EvalOptions;
use crate::scope::Env;
use crate::token::TokenKind;
use crate::value::{array_index, Extra, Obj, Value};

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub flow: Flow,
    pub value: Value,
}

impl Completion {
    pub fn normal(value: Value) -> Self {
        Completion {
            flow: Flow::Normal,
            value,
        }
    }

    fn signal(flow: Flow, value: Value) -> Self {
        Completion { flow, value }
    }
}

/// Where a value was read from.
#[derive(Debug, Clone)]
pub enum Place {
    /// Computed; not writable.
    Temp,
    /// A variable in the scope chain.
    Var(Rc<str>),
    /// A member of another value.
    Member { parent: Value, key: Value },
}

/// A value together with its write-back place.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub value: Value,
    pub place: Place,
}

impl Resolved {
    pub fn temp(value: Value) -> Self {
        Resolved {
            value,
            place: Place::Temp,
        }
    }

    /// `this` for a call through this operand.
    fn receiver(&self) -> Value {
        match &self.place {
            Place::Member { parent, .. } => parent.clone(),
            _ => Value::Undefined,
        }
    }

    /// Name used in "is not a function" style messages.
    fn describe(&self) -> String {
        match &self.place {
            Place::Var(name) => name.to_string(),
            Place::Member { key, .. } => key.to_js_string(),
            Place::Temp => self.value.type_name().to_string(),
        }
    }
}

// ── Interp ────────────────────────────────────────────────────────────────────

/// Evaluation state for one top-level call.
pub struct Interp<'e> {
    engine: &'e Engine,
    lang: &'e Language,
    program: Rc<Program>,
    env: Env,
    options: EvalOptions,
    depth: usize,
    steps: u64,
}

impl<'e> Interp<'e> {
    pub fn new(engine: &'e Engine, program: Rc<Program>, env: Env, options: EvalOptions) -> Self {
        Interp {
            engine,
            lang: engine.language(),
            program,
            env,
            options,
            depth: 0,
            steps: 0,
        }
    }

    /// Evaluate with a dialect other than the engine's own.
    pub fn with_language(mut self, lang: &'e Language) -> Self {
        self.lang = lang;
        self
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    /// Execute the whole program; the value of the last statement or of `return`.
    pub fn run(&mut self) -> ScriptResult<Value> {
        let program = Rc::clone(&self.program);
        let done = self.exec_forest(program.roots())?;
        match done.flow {
            Flow::Normal | Flow::Return => Ok(done.value),
            Flow::Break => Err(ScriptError::syntax("Illegal break statement")),
            Flow::Continue => Err(ScriptError::syntax("Illegal continue statement")),
        }
    }

    fn tick(&mut self) -> ScriptResult<()> {
        self.steps += 1;
        if self.steps > self.engine.limits().max_statements {
            return Err(ScriptError::limit("Too many statements executed"));
        }
        Ok(())
    }

    pub(crate) fn node_children(&self, id: NodeId) -> Vec<NodeId> {
        self.program.node(id).children.clone()
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    pub fn eval(&mut self, id: NodeId) -> ScriptResult<Value> {
        self.resolve(id).map(|r| r.value)
    }

    pub fn resolve(&mut self, id: NodeId) -> ScriptResult<Resolved> {
        self.resolve_node(id, false)
    }

    /// Resolve a node; `skip_spread` leaves an outermost `...` unapplied.
    fn resolve_node(&mut self, id: NodeId, skip_spread: bool) -> ScriptResult<Resolved> {
        let program = Rc::clone(&self.program);
        let node = program.node(id);
        self.resolve_inner(id, node, skip_spread)
            .map_err(|e| e.locate(&node.token))
    }

    fn resolve_inner(&mut self, id: NodeId, node: &Node, skip_spread: bool) -> ScriptResult<Resolved> {
        let mut r = self.resolve_head(id, node)?;
        for &link in &node.chain {
            r = self.apply_link(r, link)?;
        }
        for glyph in &node.post {
            r = self.apply_unary(glyph, r, false)?;
        }
        let pre = match node.pre.last() {
            Some(g) if skip_spread && &**g == "..." => &node.pre[..node.pre.len() - 1],
            _ => &node.pre[..],
        };
        for glyph in pre {
            r = self.apply_unary(glyph, r, true)?;
        }
        Ok(r)
    }

    /// The node itself, before chain links and unary attributes.
    fn resolve_head(&mut self, id: NodeId, node: &Node) -> ScriptResult<Resolved> {
        match &node.kind {
            NodeKind::Operator(glyph) => self.apply_operator(glyph, id, node).map(Resolved::temp),
            NodeKind::Ternary => {
                let glyph = self.lang.ternary().map_or("?", |(q, _)| q);
                self.apply_operator(glyph, id, node).map(Resolved::temp)
            }
            NodeKind::Leaf => self.read_leaf(node),
            NodeKind::Group { bracket, .. } => self.standalone_group(*bracket, id, node).map(Resolved::temp),
            NodeKind::Function(def) => Ok(Resolved::temp(self.closure(def))),
            NodeKind::Prefix(op) => self.apply_prefix(*op, node).map(Resolved::temp),
            NodeKind::Statement(_) => self.exec_statement(id).map(|c| Resolved::temp(c.value)),
        }
    }

    fn apply_operator(&mut self, glyph: &str, id: NodeId, node: &Node) -> ScriptResult<Value> {
        match self.lang.visitor(glyph) {
            Some(Visitor::Eager(visit)) => {
                let mut args = Vec::with_capacity(node.children.len());
                for &child in &node.children {
                    args.push(self.eval(child)?);
                }
                visit(self, &args)
            }
            Some(Visitor::Lazy(visit)) => visit(self, id),
            None => Err(ScriptError::syntax(format!("Unexpected {glyph}"))),
        }
    }

    fn apply_unary(&mut self, glyph: &str, operand: Resolved, pre: bool) -> ScriptResult<Resolved> {
        let visitor = if pre {
            self.lang.pre_visitor(glyph)
        } else {
            self.lang.post_visitor(glyph)
        };
        let visit = visitor.ok_or_else(|| ScriptError::syntax(format!("Unexpected unary operator {glyph}")))?;
        visit(self, operand).map(Resolved::temp)
    }

    fn read_leaf(&mut self, node: &Node) -> ScriptResult<Resolved> {
        let text = &node.token.text;
        let value = match node.token.kind {
            TokenKind::Str | TokenKind::Char => Value::Str(Rc::clone(text)),
            TokenKind::Int => text
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::number(text.parse().unwrap_or(f64::NAN))),
            TokenKind::Number => Value::number(text.parse().unwrap_or(f64::NAN)),
            TokenKind::Bool => Value::Bool(&**text == "true"),
            TokenKind::Null => Value::Null,
            TokenKind::Undefined => Value::Undefined,
            TokenKind::NaN => Value::NaN,
            TokenKind::Data => return self.read_data(text),
            TokenKind::Control | TokenKind::Operator => {
                return Err(ScriptError::syntax(format!("Unexpected {text}")));
            }
        };
        Ok(Resolved::temp(value))
    }

    fn read_data(&mut self, name: &Rc<str>) -> ScriptResult<Resolved> {
        if self.lang.data_getter() == DataGetter::Defined {
            let defined = self.env.contains(name) != self.options.inverts_defined();
            return Ok(Resolved::temp(Value::Bool(defined)));
        }
        match &**name {
            "Infinity" => return Ok(Resolved::temp(Value::Number(f64::INFINITY))),
            "this" => return Ok(Resolved::temp(self.env.this_value())),
            _ => {}
        }
        let value = match self.env.get(name).or_else(|| self.engine.global(name)) {
            Some(v) => v,
            None if self.options.tolerates_unknown_names() => Value::Undefined,
            None => return Err(ScriptError::reference(format!("{name} is not defined"))),
        };
        Ok(Resolved {
            value,
            place: Place::Var(Rc::clone(name)),
        })
    }

    /// Current value stored at `place`.
    pub(crate) fn read_place(&mut self, place: &Place) -> ScriptResult<Value> {
        match place {
            Place::Temp => Ok(Value::Undefined),
            Place::Var(name) => self.read_data(name).map(|r| r.value),
            Place::Member { parent, key } => self.get_member(parent, key),
        }
    }

    /// Store `value` at `place`.
    pub(crate) fn write_place(&mut self, place: &Place, value: Value) -> ScriptResult<()> {
        match place {
            Place::Var(name) => {
                self.env.set_deep(name, value);
                Ok(())
            }
            Place::Member {
                parent: Value::Structured(obj),
                key,
            } => {
                if key.as_str() == Some("__proto__") {
                    return obj.set_proto(value.as_obj().cloned());
                }
                obj.set_key(key, value)
            }
            _ if self.options.forces_assignment() => Ok(()),
            Place::Member { parent, key } => Err(ScriptError::type_error(format!(
                "Cannot set property '{}' of {}",
                key.to_js_string(),
                parent.type_name()
            ))),
            Place::Temp => Err(ScriptError::syntax("Invalid assignment target")),
        }
    }

    /// Resolve `id` as a write target without reading it.
    pub(crate) fn resolve_target(&mut self, id: NodeId) -> ScriptResult<Place> {
        let program = Rc::clone(&self.program);
        let node = program.node(id);
        self.target_inner(id, node).map_err(|e| e.locate(&node.token))
    }

    fn target_inner(&mut self, id: NodeId, node: &Node) -> ScriptResult<Place> {
        if let Some(name) = node.plain_name() {
            return Ok(Place::Var(Rc::clone(name)));
        }
        let invalid = || ScriptError::syntax("Invalid assignment target");
        if !node.pre.is_empty() || !node.post.is_empty() {
            return Err(invalid());
        }
        let Some((&last, links)) = node.chain.split_last() else {
            return Err(invalid());
        };
        let program = Rc::clone(&self.program);
        let link = program.node(last);
        if !matches!(link.kind, NodeKind::Group { bracket: Bracket::Square, .. }) || link.children.len() != 1 {
            return Err(invalid());
        }
        let mut parent = self.resolve_head(id, node)?;
        for &l in links {
            parent = self.apply_link(parent, l)?;
        }
        let key = self.eval(link.children[0])?;
        Ok(Place::Member {
            parent: parent.value,
            key,
        })
    }

    // ── Members ───────────────────────────────────────────────────────────────

    fn apply_link(&mut self, base: Resolved, link: NodeId) -> ScriptResult<Resolved> {
        let program = Rc::clone(&self.program);
        let node = program.node(link);
        self.link_inner(base, node).map_err(|e| e.locate(&node.token))
    }

    fn link_inner(&mut self, base: Resolved, node: &Node) -> ScriptResult<Resolved> {
        let NodeKind::Group { bracket, .. } = node.kind else {
            return Err(ScriptError::syntax(format!("Unexpected {}", node.token.text)));
        };
        match bracket {
            Bracket::Square => {
                let [key_id] = node.children[..] else {
                    return Err(ScriptError::syntax("Expected a single index"));
                };
                if let Some((from, to)) = self.slice_bounds(key_id) {
                    return self.slice(&base.value, from, to).map(Resolved::temp);
                }
                let key = self.eval(key_id)?;
                let value = self.get_member(&base.value, &key)?;
                Ok(Resolved {
                    value,
                    place: Place::Member {
                        parent: base.value,
                        key,
                    },
                })
            }
            Bracket::Paren => {
                let args = self.collect_list(&node.children)?;
                let Some(func) = base.value.callable() else {
                    return Err(not_callable(&base));
                };
                self.call_function(&func, base.receiver(), args).map(Resolved::temp)
            }
            Bracket::Curly => Err(ScriptError::syntax("Unexpected expression in {}")),
        }
    }

    /// `a[from:to]` bounds, if the index is a pair.
    fn slice_bounds(&self, key_id: NodeId) -> Option<(NodeId, NodeId)> {
        let node = self.program.node(key_id);
        let colon = self.lang.ternary().map_or(":", |(_, c)| c);
        match node.children[..] {
            [from, to] if node.operator() == Some(colon) && node.is_plain() => Some((from, to)),
            _ => None,
        }
    }

    fn slice(&mut self, base: &Value, from: NodeId, to: NodeId) -> ScriptResult<Value> {
        let from = self.eval(from)?;
        let to = self.eval(to)?;
        let clamp = |v: &Value, len: usize| -> usize {
            let n = v.to_integer();
            if n < 0 {
                len.saturating_sub(n.unsigned_abs() as usize)
            } else {
                (n as usize).min(len)
            }
        };
        match base {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (a, b) = (clamp(&from, chars.len()), clamp(&to, chars.len()));
                Ok(Value::from(chars.get(a..b.max(a)).unwrap_or_default().iter().collect::<String>()))
            }
            Value::Structured(o) if o.is_array() => {
                let items = o.values();
                let (a, b) = (clamp(&from, items.len()), clamp(&to, items.len()));
                Ok(Value::array(items.get(a..b.max(a)).unwrap_or_default().to_vec()))
            }
            other => Err(ScriptError::type_error(format!("Cannot slice {}", other.type_name()))),
        }
    }

    /// Member read with prototype fallback; absent members are `null`.
    pub fn get_member(&mut self, base: &Value, key: &Value) -> ScriptResult<Value> {
        let found = match base {
            Value::Undefined | Value::Null => {
                return Err(ScriptError::type_error(format!(
                    "Cannot read property '{}' of {}",
                    key.to_js_string(),
                    base.to_js_string()
                )));
            }
            Value::Structured(obj) => {
                if key.as_str() == Some("__proto__") {
                    return Ok(obj.proto().map_or(Value::Null, Value::Structured));
                }
                match obj.get_own(key) {
                    Some(v) => Some(v),
                    None => {
                        let name = key.to_js_string();
                        obj.lookup(&name).or_else(|| self.engine.prototype_member(base, &name))
                    }
                }
            }
            Value::Str(s) => match array_index(key) {
                Some(i) => Some(s.chars().nth(i).map_or(Value::Null, |c| Value::from(c.to_string()))),
                None => self.engine.prototype_member(base, &key.to_js_string()),
            },
            _ => self.engine.prototype_member(base, &key.to_js_string()),
        };
        match found {
            Some(Value::Function(f)) if f.immediate => self.call_function(&f, base.clone(), Vec::new()),
            Some(v) => Ok(v),
            None => Ok(Value::Null),
        }
    }

    // ── Literals ──────────────────────────────────────────────────────────────

    /// List elements: a `,` node's operands or the roots themselves, with spreads expanded.
    pub(crate) fn collect_list(&mut self, roots: &[NodeId]) -> ScriptResult<Vec<Value>> {
        let mut out = Vec::new();
        for id in self.list_items(roots) {
            let spread = self.program.node(id).pre.last().is_some_and(|g| &**g == "...");
            if !spread {
                out.push(self.eval(id)?);
                continue;
            }
            let value = self.resolve_node(id, true)?.value;
            out.extend(self.spread_values(&value).map_err(|e| e.locate(&self.program.node(id).token))?);
        }
        Ok(out)
    }

    fn list_items(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut items = Vec::new();
        for &id in roots {
            let node = self.program.node(id);
            if node.operator() == Some(",") && node.is_plain() {
                items.extend_from_slice(&node.children);
            } else {
                items.push(id);
            }
        }
        items
    }

    pub(crate) fn spread_values(&self, value: &Value) -> ScriptResult<Vec<Value>> {
        match value {
            Value::Structured(o) => match o.extra() {
                Extra::Iterator { cursor } => Ok(o.values().into_iter().skip(cursor).collect()),
                _ => Ok(o.values()),
            },
            Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            other => Err(ScriptError::type_error(format!("{} is not iterable", other.to_js_string()))),
        }
    }

    fn standalone_group(&mut self, bracket: Bracket, id: NodeId, node: &Node) -> ScriptResult<Value> {
        match bracket {
            Bracket::Paren => {
                let mut last = Value::Undefined;
                for &child in &node.children {
                    last = self.eval(child)?;
                }
                Ok(last)
            }
            Bracket::Square => {
                if let Some(text) = self.constant_json(id) {
                    return self.engine.parse_json(text.as_bytes());
                }
                let items = self.collect_list(&node.children)?;
                Ok(Value::array(items))
            }
            Bracket::Curly => {
                if let Some(text) = self.constant_json(id) {
                    return self.engine.parse_json(text.as_bytes());
                }
                self.object_literal(node)
            }
        }
    }

    fn object_literal(&mut self, node: &Node) -> ScriptResult<Value> {
        let obj = Obj::object();
        let colon = self.lang.ternary().map_or(":", |(_, c)| c);
        for id in self.list_items(&node.children) {
            let program = Rc::clone(&self.program);
            let item = program.node(id);
            if let Some(name) = item.plain_name() {
                let value = self.eval(id)?;
                obj.set_named(name, value);
                continue;
            }
            if item.pre.len() == 1 && &*item.pre[0] == "..." {
                let source = self.resolve_node(id, true)?.value;
                if let Value::Structured(src) = source {
                    for (k, v) in src.entries() {
                        obj.set_named(&k, v);
                    }
                }
                continue;
            }
            let (Some(op), [key_id, value_id]) = (item.operator(), &item.children[..]) else {
                return Err(ScriptError::syntax("Invalid object literal").at(&item.token));
            };
            if op != colon {
                return Err(ScriptError::syntax("Invalid object literal").at(&item.token));
            }
            let key = self.literal_key(*key_id)?;
            let value = self.eval(*value_id)?;
            obj.set_named(&key, value);
        }
        Ok(Value::Structured(obj))
    }

    fn literal_key(&mut self, id: NodeId) -> ScriptResult<String> {
        let program = Rc::clone(&self.program);
        let node = program.node(id);
        match &node.kind {
            NodeKind::Leaf if node.is_plain() => Ok(node.token.text.to_string()),
            NodeKind::Group {
                bracket: Bracket::Square,
                chained: false,
            } => {
                let mut key = Value::Undefined;
                for &c in &node.children {
                    key = self.eval(c)?;
                }
                Ok(key.to_js_string())
            }
            _ => self.eval(id).map(|v| v.to_js_string()),
        }
    }

    /// JSON text for a literal built only from constants; fed through the engine's JSON hook.
    fn constant_json(&self, id: NodeId) -> Option<String> {
        let mut out = String::new();
        self.write_constant(id, &mut out, 0).then_some(out)
    }

    fn write_constant(&self, id: NodeId, out: &mut String, depth: usize) -> bool {
        let node = self.program.node(id);
        if depth > 64 || !node.chain.is_empty() || !node.post.is_empty() {
            return false;
        }
        let negative = match &node.pre[..] {
            [] => false,
            [g] if &**g == "-" => true,
            _ => return false,
        };
        let text = &node.token.text;
        match (&node.kind, node.token.kind) {
            (NodeKind::Leaf, TokenKind::Int | TokenKind::Number) => {
                if negative {
                    out.push('-');
                }
                out.push_str(text);
                true
            }
            _ if negative => false,
            (NodeKind::Leaf, TokenKind::Bool | TokenKind::Null) => {
                out.push_str(text);
                true
            }
            (NodeKind::Leaf, TokenKind::Str | TokenKind::Char) => {
                out.push_str(&serde_json::Value::from(&**text).to_string());
                true
            }
            (NodeKind::Group { bracket: Bracket::Square, chained: false }, _) => {
                out.push('[');
                let items = self.list_items(&node.children);
                for (i, &item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if !self.write_constant(item, out, depth + 1) {
                        return false;
                    }
                }
                out.push(']');
                true
            }
            (NodeKind::Group { bracket: Bracket::Curly, chained: false }, _) => {
                let colon = self.lang.ternary().map_or(":", |(_, c)| c);
                out.push('{');
                let items = self.list_items(&node.children);
                for (i, &item) in items.iter().enumerate() {
                    let pair = self.program.node(item);
                    let [key, value] = pair.children[..] else {
                        return false;
                    };
                    let key_node = self.program.node(key);
                    let key_ok = matches!(key_node.kind, NodeKind::Leaf)
                        && key_node.is_plain()
                        && matches!(key_node.token.kind, TokenKind::Str | TokenKind::Char | TokenKind::Data);
                    if pair.operator() != Some(colon) || !pair.is_plain() || !key_ok {
                        return false;
                    }
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&serde_json::Value::from(&*key_node.token.text).to_string());
                    out.push(':');
                    if !self.write_constant(value, out, depth + 1) {
                        return false;
                    }
                }
                out.push('}');
                true
            }
            _ => false,
        }
    }

    // ── Functions ─────────────────────────────────────────────────────────────

    /// A function value closing over the current scope.
    fn closure(&self, def: &Rc<FunctionDef>) -> Value {
        let func = Function::user(Rc::clone(def), Rc::clone(&self.program), self.env.clone());
        if def.arrow {
            return Value::Function(func);
        }
        let obj = Obj::object().with_extra(Extra::Callable(func));
        obj.set_named("prototype", Value::Structured(Obj::object()));
        Value::Structured(obj)
    }

    /// Call any callable value.
    pub fn call(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> ScriptResult<Value> {
        match callee.callable() {
            Some(func) => self.call_function(&func, this, args),
            None => Err(not_callable(&Resolved::temp(callee.clone()))),
        }
    }

    pub fn call_function(&mut self, func: &Rc<Function>, this: Value, args: Vec<Value>) -> ScriptResult<Value> {
        if self.depth >= self.engine.limits().max_call_depth {
            return Err(ScriptError::limit("Maximum call depth exceeded"));
        }
        let this = func.bound_this.clone().unwrap_or(this);
        let args = if func.bound_args.is_empty() {
            args
        } else {
            func.bound_args.iter().cloned().chain(args).collect()
        };
        self.depth += 1;
        let result = match &func.kind {
            FunctionKind::Native(host) => host(self, &this, &args),
            FunctionKind::User(user) => self.call_user(func, user, this, args),
        };
        self.depth -= 1;
        result
    }

    fn call_user(&mut self, func: &Function, user: &UserFunction, this: Value, args: Vec<Value>) -> ScriptResult<Value> {
        let frame = user.closure.push_function();
        if !user.def.arrow {
            frame.set_this(this);
            frame.set_local("arguments", Value::array(args.clone()));
        }
        for (i, param) in user.def.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.get(i..).unwrap_or_default().to_vec())
            } else {
                args.get(i).cloned().unwrap_or_default()
            };
            frame.set_local(&param.name, value);
        }
        let saved_program = mem::replace(&mut self.program, Rc::clone(&user.program));
        let saved_env = mem::replace(&mut self.env, frame);
        let result = self.exec_forest(&user.def.body);
        self.program = saved_program;
        self.env = saved_env;
        let name = if func.name.is_empty() { "<anonymous>" } else { &func.name };
        match result {
            Ok(done) => match done.flow {
                Flow::Normal | Flow::Return => Ok(done.value),
                Flow::Break | Flow::Continue => Err(ScriptError::syntax("Illegal break statement")),
            },
            Err(e) => Err(e.enrich(format!("in function {name}"))),
        }
    }

    /// `new callee(args)`.
    pub fn construct(&mut self, callee: &Value, args: Vec<Value>) -> ScriptResult<Value> {
        let Some(func) = callee.callable() else {
            return Err(ScriptError::type_error(format!("{} is not a constructor", callee.to_js_string())));
        };
        match &func.kind {
            FunctionKind::User(user) if user.def.arrow => Err(ScriptError::type_error(format!(
                "{} is not a constructor",
                func.source_text()
            ))),
            FunctionKind::User(_) => {
                let proto = match callee {
                    Value::Structured(o) => o.get_named("prototype").and_then(|p| p.as_obj().cloned()),
                    _ => None,
                };
                let this = Value::Structured(Obj::object().with_proto(proto));
                let result = self.call_function(&func, this.clone(), args)?;
                Ok(if matches!(result, Value::Structured(_)) { result } else { this })
            }
            FunctionKind::Native(_) => self.call_function(&func, Value::Undefined, args),
        }
    }

    fn apply_prefix(&mut self, op: PrefixOp, node: &Node) -> ScriptResult<Value> {
        let [operand] = node.children[..] else {
            return Err(ScriptError::syntax(format!("Missing operand for {}", op.word())));
        };
        match op {
            PrefixOp::New => self.apply_new(operand),
            PrefixOp::Typeof => {
                let program = Rc::clone(&self.program);
                if let Some(name) = program.node(operand).plain_name() {
                    if !self.env.contains(name) && self.engine.global(name).is_none() && &**name != "this" {
                        return Ok(Value::from("undefined"));
                    }
                }
                Ok(Value::from(self.eval(operand)?.type_name()))
            }
            PrefixOp::Delete => {
                match self.resolve_target(operand) {
                    Ok(Place::Var(name)) => {
                        self.env.delete(&name);
                    }
                    Ok(Place::Member {
                        parent: Value::Structured(obj),
                        key,
                    }) => {
                        obj.remove_key(&key);
                    }
                    Ok(_) => {}
                    Err(_) => {
                        self.eval(operand)?;
                    }
                }
                Ok(Value::Bool(true))
            }
            PrefixOp::Void => {
                self.eval(operand)?;
                Ok(Value::Undefined)
            }
        }
    }

    fn apply_new(&mut self, operand: NodeId) -> ScriptResult<Value> {
        let program = Rc::clone(&self.program);
        let node = program.node(operand);
        let call_link = node
            .chain
            .last()
            .filter(|&&l| matches!(program.node(l).kind, NodeKind::Group { bracket: Bracket::Paren, .. }));
        let (Some(&link), true) = (call_link, node.pre.is_empty() && node.post.is_empty()) else {
            let callee = self.eval(operand)?;
            return self.construct(&callee, Vec::new());
        };
        let mut callee = self.resolve_head(operand, node)?;
        for &l in &node.chain[..node.chain.len() - 1] {
            callee = self.apply_link(callee, l)?;
        }
        let args = self.collect_list(&program.node(link).children)?;
        self.construct(&callee.value, args).map_err(|e| e.locate(&node.token))
    }
}

fn not_callable(r: &Resolved) -> ScriptError {
    match r.value {
        Value::Null => ScriptError::type_error("Cannot execute function of null"),
        _ => ScriptError::type_error(format!("{} is not a function", r.describe())),
    }
}
