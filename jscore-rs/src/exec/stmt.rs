//! Statement execution: forests, blocks, keyword statements and loops.

use std::rc::Rc;

use super::{Completion, Flow, Interp};
use crate::ast::{Bracket, DeclareKind, Node, NodeId, NodeKind, Statement};
use crate::error::{ScriptError, ScriptResult};
use crate::value::{Extra, Value};

/// Result of one loop iteration body.
enum Step {
    Next,
    Exit,
    Leave(Completion),
}

fn loop_step(done: Completion) -> Step {
    match done.flow {
        Flow::Normal | Flow::Continue => Step::Next,
        Flow::Break => Step::Exit,
        Flow::Return => Step::Leave(done),
    }
}

impl Interp<'_> {
    /// Run statements in order; stops early on `return`, `break` or `continue`.
    pub(crate) fn exec_forest(&mut self, ids: &[NodeId]) -> ScriptResult<Completion> {
        self.hoist_functions(ids)?;
        let mut last = Value::Undefined;
        for &id in ids {
            let done = self.exec_statement(id)?;
            if done.flow != Flow::Normal {
                return Ok(done);
            }
            last = done.value;
        }
        Ok(Completion::normal(last))
    }

    /// Bind `function name() {}` declarations before the forest runs.
    fn hoist_functions(&mut self, ids: &[NodeId]) -> ScriptResult<()> {
        let program = Rc::clone(&self.program);
        for &id in ids {
            if let NodeKind::Statement(Statement::Function(def)) = &program.node(id).kind {
                let Some(name) = &def.name else {
                    return Err(ScriptError::syntax("Function statements require a name").at(&program.node(id).token));
                };
                let value = self.closure(def);
                self.env.set_local(name, value);
            }
        }
        Ok(())
    }

    pub(crate) fn exec_statement(&mut self, id: NodeId) -> ScriptResult<Completion> {
        self.tick()?;
        let program = Rc::clone(&self.program);
        let node = program.node(id);
        let result = match &node.kind {
            NodeKind::Statement(st) => self.exec_keyword(st),
            NodeKind::Group {
                bracket: Bracket::Curly,
                chained: false,
            } if node.is_plain() && !self.is_object_shaped(node) => self.exec_block(&node.children),
            _ => self.eval(id).map(Completion::normal),
        };
        result.map_err(|e| e.locate(&node.token))
    }

    /// `{}` and `{k: v, ...}` at statement level are objects; anything else is a block.
    fn is_object_shaped(&self, node: &Node) -> bool {
        let colon = self.lang.ternary().map_or(":", |(_, c)| c);
        let is_pair = |id: NodeId| {
            let n = self.program.node(id);
            n.operator() == Some(colon) || n.pre.last().is_some_and(|g| &**g == "...")
        };
        match node.children[..] {
            [] => true,
            [only] => {
                let n = self.program.node(only);
                is_pair(only) || (n.operator() == Some(",") && n.children.iter().all(|&c| is_pair(c)))
            }
            _ => false,
        }
    }

    /// Run statements in a fresh block frame.
    pub(crate) fn exec_block(&mut self, ids: &[NodeId]) -> ScriptResult<Completion> {
        let saved = self.env.clone();
        self.env = saved.push();
        let result = self.exec_forest(ids);
        self.env = saved;
        result
    }

    /// Value of the last expression in `ids`.
    fn eval_list(&mut self, ids: &[NodeId]) -> ScriptResult<Value> {
        let mut last = Value::Undefined;
        for &id in ids {
            last = self.eval(id)?;
        }
        Ok(last)
    }

    fn exec_keyword(&mut self, st: &Statement) -> ScriptResult<Completion> {
        match st {
            Statement::If { cond, then, otherwise } => {
                if self.eval_list(cond)?.to_boolean() {
                    self.exec_block(then)
                } else if let Some(other) = otherwise {
                    self.exec_block(other)
                } else {
                    Ok(Completion::normal(Value::Undefined))
                }
            }
            Statement::For { init, cond, step, body } => self.scoped(|it| it.exec_for(init, cond, step, body)),
            Statement::ForEach {
                var,
                declare,
                values,
                source,
                body,
            } => self.scoped(|it| it.exec_for_each(var, declare.is_some(), *values, *source, body)),
            Statement::While { cond, body } => {
                let mut last = Value::Undefined;
                while self.eval_list(cond)?.to_boolean() {
                    self.tick()?;
                    let done = self.exec_block(body)?;
                    last = done.value.clone();
                    match loop_step(done) {
                        Step::Next => {}
                        Step::Exit => break,
                        Step::Leave(done) => return Ok(done),
                    }
                }
                Ok(Completion::normal(last))
            }
            Statement::DoWhile { body, cond } => {
                let mut last;
                loop {
                    self.tick()?;
                    let done = self.exec_block(body)?;
                    last = done.value.clone();
                    match loop_step(done) {
                        Step::Next => {}
                        Step::Exit => break,
                        Step::Leave(done) => return Ok(done),
                    }
                    if !self.eval_list(cond)?.to_boolean() {
                        break;
                    }
                }
                Ok(Completion::normal(last))
            }
            Statement::Return(arg) => {
                let value = match arg {
                    Some(id) => self.eval(*id)?,
                    None => Value::Undefined,
                };
                Ok(Completion::signal(Flow::Return, value))
            }
            Statement::Break => Ok(Completion::signal(Flow::Break, Value::Undefined)),
            Statement::Continue => Ok(Completion::signal(Flow::Continue, Value::Undefined)),
            Statement::Throw(arg) => {
                let value = self.eval(*arg)?;
                Err(ScriptError::thrown(value.to_js_string()))
            }
            Statement::Declare { kind, target } => {
                self.declare(*kind, *target)?;
                Ok(Completion::normal(Value::Undefined))
            }
            Statement::Function(_) => Ok(Completion::normal(Value::Undefined)),
        }
    }

    /// Run `f` in a fresh frame, restoring the scope afterwards.
    fn scoped(&mut self, f: impl FnOnce(&mut Self) -> ScriptResult<Completion>) -> ScriptResult<Completion> {
        let saved = self.env.clone();
        self.env = saved.push();
        let result = f(self);
        self.env = saved;
        result
    }

    fn exec_for(
        &mut self,
        init: &[NodeId],
        cond: &[NodeId],
        step: &[NodeId],
        body: &[NodeId],
    ) -> ScriptResult<Completion> {
        for &id in init {
            self.exec_statement(id)?;
        }
        let mut last = Value::Undefined;
        loop {
            if !cond.is_empty() && !self.eval_list(cond)?.to_boolean() {
                break;
            }
            // Iterations count against the budget even with an empty body.
            self.tick()?;
            let done = self.exec_block(body)?;
            last = done.value.clone();
            match loop_step(done) {
                Step::Next => {}
                Step::Exit => break,
                Step::Leave(done) => return Ok(done),
            }
            self.eval_list(step)?;
        }
        Ok(Completion::normal(last))
    }

    fn exec_for_each(
        &mut self,
        var: &str,
        declared: bool,
        values: bool,
        source: NodeId,
        body: &[NodeId],
    ) -> ScriptResult<Completion> {
        let src = self.eval(source)?;
        let items = if values { self.iteration_values(&src)? } else { iteration_keys(&src) };
        if declared {
            self.env.set_local(var, Value::Undefined);
        }
        let mut last = Value::Undefined;
        for item in items {
            if declared {
                self.env.set_local(var, item);
            } else {
                self.env.set_deep(var, item);
            }
            let done = self.exec_block(body)?;
            last = done.value.clone();
            match loop_step(done) {
                Step::Next => {}
                Step::Exit => break,
                Step::Leave(done) => return Ok(done),
            }
        }
        Ok(Completion::normal(last))
    }

    fn iteration_values(&self, src: &Value) -> ScriptResult<Vec<Value>> {
        match src {
            Value::Structured(o) if matches!(o.extra(), Extra::Iterator { .. }) => self.spread_values(src),
            Value::Structured(o) => Ok(o.values()),
            Value::Str(_) => self.spread_values(src),
            other => Err(ScriptError::type_error(format!("{} is not iterable", other.to_js_string()))),
        }
    }

    fn declare(&mut self, kind: DeclareKind, target: NodeId) -> ScriptResult<()> {
        let program = Rc::clone(&self.program);
        let node = program.node(target);
        let mut names = Vec::new();
        let mut collect = |n: &Node| match n.plain_name() {
            Some(name) => names.push(Rc::clone(name)),
            None => {
                if let Some(&first) = n.children.first() {
                    if let Some(name) = program.node(first).plain_name() {
                        names.push(Rc::clone(name));
                    }
                }
            }
        };
        if node.operator() == Some(",") {
            for &c in &node.children {
                collect(program.node(c));
            }
        } else {
            collect(node);
        }
        for name in &names {
            match kind {
                DeclareKind::Var => self.env.declare_var(name),
                DeclareKind::Let | DeclareKind::Const => {
                    if !self.env.contains_local(name) {
                        self.env.set_local(name, Value::Undefined);
                    }
                }
            }
        }
        if node.plain_name().is_none() {
            self.eval(target)?;
        }
        Ok(())
    }
}

fn iteration_keys(src: &Value) -> Vec<Value> {
    match src {
        Value::Structured(o) => o.keys().into_iter().map(Value::Str).collect(),
        Value::Str(s) => (0..s.chars().count()).map(|i| Value::from(i.to_string())).collect(),
        _ => Vec::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::error::ErrorKind;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        let engine = Engine::new();
        engine.eval(src, &Env::new()).unwrap().to_js_string()
    }

    fn run_err(src: &str) -> crate::error::ScriptError {
        let engine = Engine::new();
        engine.eval(src, &Env::new()).unwrap_err()
    }

    #[test]
    fn if_else_chain() {
        let src = "I=3; if (I==3) B=4; else if (I<4) B=5; else B=6; B";
        assert_eq!(run(src), "4");
        assert_eq!(run("I=2; if (I==3) {B=4} else if (I<4) {B=5} else {B=6}; B"), "5");
        assert_eq!(run("I=9; if (I==3) {B=4} else if (I<4) {B=5} else {B=6}; B"), "6");
    }

    #[test]
    fn loops() {
        assert_eq!(run("s = 0; for (let i = 0; i < 5; i++) { s += i }; s"), "10");
        assert_eq!(run("s = 0; i = 0; while (i < 4) { i++; if (i == 2) continue; s += i }; s"), "8");
        assert_eq!(run("i = 0; do { i++ } while (i < 3); i"), "3");
        assert_eq!(run("n = 0; for (;;) { n++; if (n > 6) break }; n"), "7");
    }

    #[test]
    fn for_in_and_of() {
        assert_eq!(run("s = ''; for (k in {a: 1, b: 2}) s += k; s"), "ab");
        assert_eq!(run("s = 0; for (const v of [1, 2, 3]) s += v; s"), "6");
        assert_eq!(run("s = ''; for (c of 'xyz') s = c + s; s"), "zyx");
    }

    #[test]
    fn return_leaves_loops() {
        assert_eq!(run("function f() { for (x of [1, 2, 3]) { if (x == 2) return x * 10 }; return 0 }; f()"), "20");
    }

    #[test]
    fn declarations_scope() {
        assert_eq!(run("x = 1; { let x = 2 }; x"), "1");
        assert_eq!(run("x = 1; { x = 2 }; x"), "2");
        assert_eq!(run("function f() { { var v = 5 }; return v }; f()"), "5");
        assert_eq!(run("let a = 1, b = a + 1; b"), "2");
    }

    #[test]
    fn hoisted_functions() {
        assert_eq!(run("g(2); function g(n) { return n * 3 }; g(4)"), "12");
    }

    #[test]
    fn top_level_break_is_an_error() {
        assert_eq!(run_err("break").kind(), ErrorKind::Syntax);
    }

    #[test]
    fn throw_surfaces_message() {
        let e = run_err("throw 'boom'");
        assert_eq!(e.kind(), ErrorKind::Thrown);
        assert!(e.to_string().starts_with("boom"));
    }

    #[test]
    fn statement_limit() {
        let engine = Engine::new().with_limits(crate::engine::Limits {
            max_statements: 50,
            ..Default::default()
        });
        let e = engine.eval("while (true) { 1 }", &Env::new()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Limit);
    }

    #[test]
    fn empty_loops_spend_the_budget() {
        let engine = Engine::new().with_limits(crate::engine::Limits {
            max_statements: 1000,
            ..Default::default()
        });
        for src in ["for (;;) {}", "for (;;);", "while (true) {}", "while (1);", "do {} while (true)"] {
            let e = engine.eval(src, &Env::new()).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Limit, "{src}");
            assert_eq!(e.message(), "Too many statements executed", "{src}");
        }
    }
}
