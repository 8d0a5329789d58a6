//! Parser: token slice → forest of statement trees.
//!
//! The forest is split on depth-0 statement separators.  Keyword statements
//! are driven by the per-keyword [`KeywordFeatures`] recorded in the grammar;
//! everything else goes through the expression tree builder in [`expr`].

mod expr;

use std::rc::Rc;

use tracing::trace;

use crate::ast::{Bracket, DeclareKind, FunctionDef, Node, NodeId, NodeKind, Param, Program, Statement};
use crate::error::{ScriptError, ScriptResult};
use crate::grammar::{KeywordFeatures as F, KeywordKind, KeywordRule, Language};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

/// Default bound on bracket nesting and operator chain depth.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tokenize and parse `src` in one step.
pub fn compile(src: &str, place: &str, language: &Language) -> ScriptResult<Program> {
    let tokens = tokenize(src.as_bytes(), place, language)?;
    parse(&tokens, language, place)
}

pub fn parse(tokens: &[Token], language: &Language, place: &str) -> ScriptResult<Program> {
    parse_with_depth(tokens, language, place, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_depth(
    tokens: &[Token],
    language: &Language,
    place: &str,
    max_depth: usize,
) -> ScriptResult<Program> {
    let mut p = Parser::new(tokens, language, max_depth);
    let roots = p.parse_forest(0, tokens.len(), Pairs::Forbidden)?;
    trace!(place, nodes = p.nodes.len(), roots = roots.len(), "parsed");
    Ok(Program::new(p.nodes, roots, Rc::from(place)))
}

/// Whether a bare `:` outside a ternary forms a key/value or slice pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pairs {
    Forbidden,
    Allowed,
}

pub(crate) fn else_error(tok: &Token) -> ScriptError {
    ScriptError::syntax("'else' should be used only inside 'if' declaration").at(tok)
}

#[derive(Default)]
struct KeywordParts {
    name: Option<Rc<str>>,
    parens: Option<(usize, usize)>,
    body: Option<Vec<NodeId>>,
    trailing: Option<(usize, usize)>,
    otherwise: Option<Vec<NodeId>>,
    argument: Option<NodeId>,
}

fn required<T>(part: Option<T>, kw: &Token, what: &str) -> ScriptResult<T> {
    part.ok_or_else(|| ScriptError::syntax(format!("'{}' requires {what}", kw.text)).at(kw))
}

fn declare_kind(word: &str) -> DeclareKind {
    match word {
        "let" => DeclareKind::Let,
        "const" => DeclareKind::Const,
        _ => DeclareKind::Var,
    }
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    lang: &'a Language,
    nodes: Vec<Node>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], lang: &'a Language, max_depth: usize) -> Self {
        Parser {
            tokens,
            lang,
            nodes: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    // ── Arena and cursor helpers ──────────────────────────────────────────────

    fn tok(&self, i: usize) -> &'a Token {
        &self.tokens[i]
    }

    fn tok_opt(&self, i: usize, end: usize) -> Option<&'a Token> {
        if i < end {
            self.tokens.get(i)
        } else {
            None
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn is_separator(&self, i: usize) -> bool {
        let t = self.tok(i);
        t.kind == TokenKind::Operator && self.lang.separator() == Some(&*t.text)
    }

    fn keyword_at(&self, i: usize, end: usize) -> Option<KeywordRule> {
        self.tok_opt(i, end)
            .filter(|t| t.kind == TokenKind::Operator)
            .and_then(|t| self.lang.keyword(&t.text))
    }

    fn enter(&mut self, tok: &Token) -> ScriptResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ScriptError::limit("Nesting is too deep").at(tok));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Index of the bracket closing the one at `open`.
    fn matching_close(&self, open: usize, end: usize) -> ScriptResult<usize> {
        let first = self.tok(open);
        let Some(bracket) = Bracket::from_open(&first.text) else {
            return Err(ScriptError::syntax(format!("Unexpected {}", first.text)).at(first));
        };
        let mut expected: Vec<&'static str> = vec![bracket.close()];
        for i in open + 1..end {
            let t = self.tok(i);
            if t.kind != TokenKind::Control {
                continue;
            }
            if let Some(b) = Bracket::from_open(&t.text) {
                expected.push(b.close());
            } else if t.is_close_bracket() {
                if expected.pop() != Some(&*t.text) {
                    return Err(ScriptError::syntax(format!("Unexpected {}", t.text)).at(t));
                }
                if expected.is_empty() {
                    return Ok(i);
                }
            }
        }
        Err(ScriptError::syntax(format!("Missing {}", bracket.close())).at(first))
    }

    /// First depth-0 separator at or after `from`, or `end`.
    fn statement_end(&self, from: usize, end: usize) -> ScriptResult<usize> {
        let mut i = from;
        while i < end {
            let t = self.tok(i);
            if t.is_open_bracket() {
                i = self.matching_close(i, end)? + 1;
                continue;
            }
            if t.is_close_bracket() {
                return Err(ScriptError::syntax(format!("Unexpected {}", t.text)).at(t));
            }
            if self.is_separator(i) {
                return Ok(i);
            }
            i += 1;
        }
        Ok(end)
    }

    // ── Forest and statements ─────────────────────────────────────────────────

    pub(crate) fn parse_forest(&mut self, start: usize, end: usize, pairs: Pairs) -> ScriptResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut pos = start;
        while pos < end {
            if self.is_separator(pos) {
                pos += 1;
                continue;
            }
            out.push(self.parse_statement(&mut pos, end, pairs)?);
        }
        Ok(out)
    }

    fn parse_statement(&mut self, pos: &mut usize, end: usize, pairs: Pairs) -> ScriptResult<NodeId> {
        if let Some(rule) = self.keyword_at(*pos, end) {
            let statement_form = match rule.kind {
                k if k.is_prefix() => false,
                // Only named functions are declarations.
                KeywordKind::Function => self.tok_opt(*pos + 1, end).is_some_and(|t| t.kind == TokenKind::Data),
                _ => true,
            };
            if statement_form {
                return self.parse_keyword(rule, pos, end);
            }
        }
        let stop = self.statement_end(*pos, end)?;
        let id = self.parse_expression(*pos, stop, pairs)?;
        *pos = stop;
        Ok(id)
    }

    fn parse_keyword(&mut self, rule: KeywordRule, pos: &mut usize, end: usize) -> ScriptResult<NodeId> {
        let kw = self.tok(*pos);
        *pos += 1;
        match rule.kind {
            KeywordKind::Unsupported => {
                return Err(ScriptError::syntax(format!("'{}' is not supported", kw.text)).at(kw));
            }
            KeywordKind::Else | KeywordKind::ElseIf => return Err(else_error(kw)),
            _ => {}
        }

        let f = rule.features;
        let mut parts = KeywordParts::default();
        if f.contains(F::NAME) {
            if let Some(t) = self.tok_opt(*pos, end).filter(|t| t.kind == TokenKind::Data) {
                parts.name = Some(Rc::clone(&t.text));
                *pos += 1;
            }
        }
        if f.contains(F::PARENS) {
            parts.parens = Some(self.expect_group(pos, end, Bracket::Paren, kw)?);
        }
        if f.contains(F::BLOCK) {
            let (open, close) = self.expect_group(pos, end, Bracket::Curly, kw)?;
            parts.body = Some(self.parse_block_interior(open, close)?);
        } else if f.contains(F::BODY) {
            parts.body = Some(self.parse_body(pos, end, kw)?);
        }
        if f.contains(F::TRAILING_CONDITION) {
            let mut look = *pos;
            while look < end && self.is_separator(look) {
                look += 1;
            }
            match self.tok_opt(look, end) {
                Some(_) if self.keyword_at(look, end).is_some_and(|r| r.kind == KeywordKind::While) => {
                    *pos = look + 1;
                }
                Some(t) => {
                    return Err(ScriptError::syntax(format!("Expected while but found {}", t.text)).at(t));
                }
                None => return Err(ScriptError::syntax("Expected while").after(self.tok(*pos - 1))),
            }
            parts.trailing = Some(self.expect_group(pos, end, Bracket::Paren, kw)?);
        }
        if f.contains(F::ELSE_CHAIN) {
            parts.otherwise = self.parse_else(pos, end)?;
        }
        if f.contains(F::ARGUMENT) {
            let stop = self.statement_end(*pos, end)?;
            if stop > *pos {
                parts.argument = Some(self.parse_expression(*pos, stop, Pairs::Forbidden)?);
            }
            *pos = stop;
        }
        if f.contains(F::NO_ARGUMENT) {
            if let Some(t) = self.tok_opt(*pos, end).filter(|_| !self.is_separator(*pos)) {
                return Err(ScriptError::syntax(format!("'{}' has no parameters", kw.text)).at(t));
            }
        }
        self.finish_keyword(rule.kind, kw, parts)
    }

    /// Expects a `bracket` group at `pos`; returns its (open, close) indices.
    fn expect_group(&self, pos: &mut usize, end: usize, bracket: Bracket, kw: &Token) -> ScriptResult<(usize, usize)> {
        match self.tok_opt(*pos, end) {
            None => Err(ScriptError::syntax(format!("Expected {} after {}", bracket.open(), kw.text))
                .after(self.tok(*pos - 1))),
            Some(t) if t.is_control(bracket.open()) => {
                let open = *pos;
                let close = self.matching_close(open, end)?;
                *pos = close + 1;
                Ok((open, close))
            }
            Some(t) => Err(ScriptError::syntax(format!("Expected {} but found {}", bracket.open(), t.text)).at(t)),
        }
    }

    fn parse_block_interior(&mut self, open: usize, close: usize) -> ScriptResult<Vec<NodeId>> {
        self.enter(self.tok(open))?;
        let body = self.parse_forest(open + 1, close, Pairs::Forbidden)?;
        self.leave();
        Ok(body)
    }

    /// A braced block, or one statement wrapped as a block.
    fn parse_body(&mut self, pos: &mut usize, end: usize, kw: &Token) -> ScriptResult<Vec<NodeId>> {
        match self.tok_opt(*pos, end) {
            None => Err(ScriptError::syntax(format!("Expected statement after {}", kw.text)).after(self.tok(*pos - 1))),
            Some(t) if t.is_control("{") => {
                let close = self.matching_close(*pos, end)?;
                let body = self.parse_block_interior(*pos, close)?;
                *pos = close + 1;
                Ok(body)
            }
            Some(_) if self.is_separator(*pos) => Ok(Vec::new()),
            Some(t) => {
                self.enter(t)?;
                let id = self.parse_statement(pos, end, Pairs::Forbidden)?;
                self.leave();
                Ok(vec![id])
            }
        }
    }

    fn parse_else(&mut self, pos: &mut usize, end: usize) -> ScriptResult<Option<Vec<NodeId>>> {
        let mut look = *pos;
        while look < end && self.is_separator(look) {
            look += 1;
        }
        let Some(rule) = self.keyword_at(look, end) else {
            return Ok(None);
        };
        let t = self.tok(look);
        match rule.kind {
            KeywordKind::Else => {
                *pos = look + 1;
                Ok(Some(self.parse_body(pos, end, t)?))
            }
            KeywordKind::ElseIf => {
                *pos = look;
                let Some(if_rule) = self.lang.keyword_of(KeywordKind::If) else {
                    return Err(else_error(t));
                };
                Ok(Some(vec![self.parse_keyword(if_rule, pos, end)?]))
            }
            _ => Ok(None),
        }
    }

    fn parse_condition(&mut self, group: (usize, usize), kw: &Token) -> ScriptResult<Vec<NodeId>> {
        let (open, close) = group;
        self.enter(kw)?;
        let cond = self.parse_forest(open + 1, close, Pairs::Forbidden)?;
        self.leave();
        if cond.is_empty() {
            return Err(ScriptError::syntax(format!("Missing condition in {}", kw.text)).at(kw));
        }
        Ok(cond)
    }

    fn finish_keyword(&mut self, kind: KeywordKind, kw: &Token, parts: KeywordParts) -> ScriptResult<NodeId> {
        let body = parts.body.unwrap_or_default();
        let stmt = match kind {
            KeywordKind::If => Statement::If {
                cond: self.parse_condition(required(parts.parens, kw, "a condition")?, kw)?,
                then: body,
                otherwise: parts.otherwise,
            },
            KeywordKind::For => self.parse_for(required(parts.parens, kw, "a loop header")?, body, kw)?,
            KeywordKind::While => Statement::While {
                cond: self.parse_condition(required(parts.parens, kw, "a condition")?, kw)?,
                body,
            },
            KeywordKind::Do => Statement::DoWhile {
                body,
                cond: self.parse_condition(required(parts.trailing, kw, "a condition")?, kw)?,
            },
            KeywordKind::Return => Statement::Return(parts.argument),
            KeywordKind::Break => Statement::Break,
            KeywordKind::Continue => Statement::Continue,
            KeywordKind::Throw => Statement::Throw(required(parts.argument, kw, "an expression")?),
            KeywordKind::Declare => {
                let target = required(parts.argument, kw, "a name")?;
                self.check_declaration(target)?;
                Statement::Declare {
                    kind: declare_kind(&kw.text),
                    target,
                }
            }
            KeywordKind::Function => {
                let params = self.parse_params(required(parts.parens, kw, "a parameter list")?)?;
                Statement::Function(Rc::new(FunctionDef {
                    name: parts.name,
                    params,
                    body,
                    arrow: false,
                }))
            }
            _ => return Err(ScriptError::syntax(format!("Unexpected {}", kw.text)).at(kw)),
        };
        Ok(self.push(Node::new(NodeKind::Statement(stmt), kw.clone(), Vec::new())))
    }

    fn check_declaration(&self, target: NodeId) -> ScriptResult<()> {
        let node = self.node(target);
        let ok = match node.operator() {
            _ if node.plain_name().is_some() => true,
            Some("=") => node.is_plain() && self.node(node.children[0]).plain_name().is_some(),
            Some(",") => {
                node.children.iter().all(|&c| {
                    let n = self.node(c);
                    n.plain_name().is_some()
                        || (n.operator() == Some("=") && self.node(n.children[0]).plain_name().is_some())
                })
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(ScriptError::syntax("Invalid declaration").at(&node.token))
        }
    }

    fn parse_for(&mut self, group: (usize, usize), body: Vec<NodeId>, kw: &Token) -> ScriptResult<Statement> {
        let (open, close) = group;
        let mut seps = Vec::new();
        let mut i = open + 1;
        while i < close {
            if self.tok(i).is_open_bracket() {
                i = self.matching_close(i, close)? + 1;
                continue;
            }
            if self.is_separator(i) {
                seps.push(i);
            }
            i += 1;
        }

        self.enter(kw)?;
        let stmt = match seps.as_slice() {
            [] => self.parse_for_each(open + 1, close, body, kw)?,
            &[a, b] => Statement::For {
                init: self.parse_forest(open + 1, a, Pairs::Forbidden)?,
                cond: self.parse_forest(a + 1, b, Pairs::Forbidden)?,
                step: self.parse_forest(b + 1, close, Pairs::Forbidden)?,
                body,
            },
            _ => return Err(for_header_error(kw)),
        };
        self.leave();
        Ok(stmt)
    }

    fn parse_for_each(&mut self, start: usize, end: usize, body: Vec<NodeId>, kw: &Token) -> ScriptResult<Statement> {
        let mut start = start;
        let mut declare = None;
        if let Some(rule) = self.keyword_at(start, end) {
            if rule.kind == KeywordKind::Declare {
                declare = Some(declare_kind(&self.tok(start).text));
                start += 1;
            }
        }
        if start >= end {
            return Err(for_header_error(kw));
        }
        let id = self.parse_expression(start, end, Pairs::Forbidden)?;
        let node = self.node(id);
        let values = match node.operator() {
            Some("IN") => false,
            Some("of") => true,
            _ => return Err(for_header_error(kw)),
        };
        if node.children.len() != 2 || !node.is_plain() {
            return Err(for_header_error(kw));
        }
        let Some(var) = self.node(node.children[0]).plain_name().cloned() else {
            return Err(ScriptError::syntax("Invalid left-hand side in for-loop").at(&node.token));
        };
        Ok(Statement::ForEach {
            var,
            declare,
            values,
            source: node.children[1],
            body,
        })
    }

    fn parse_params(&self, group: (usize, usize)) -> ScriptResult<Vec<Param>> {
        let (open, close) = group;
        let mut params: Vec<Param> = Vec::new();
        let mut expect_name = true;
        let mut i = open + 1;
        while i < close {
            let t = self.tok(i);
            if expect_name {
                let rest = t.is_operator("...");
                if rest {
                    i += 1;
                }
                match self.tok_opt(i, close) {
                    Some(n) if n.kind == TokenKind::Data => params.push(Param {
                        name: Rc::clone(&n.text),
                        rest,
                    }),
                    Some(n) => {
                        return Err(ScriptError::syntax(format!("Invalid function parameter {}", n.text)).at(n));
                    }
                    None => return Err(ScriptError::syntax("Invalid function parameter").after(t)),
                }
                expect_name = false;
            } else if t.is_operator(",") {
                expect_name = true;
            } else {
                return Err(ScriptError::syntax(format!("Unexpected {} in parameter list", t.text)).at(t));
            }
            i += 1;
        }
        if params.iter().rev().skip(1).any(|p| p.rest) {
            return Err(ScriptError::syntax("Rest parameter must be last").at(self.tok(open)));
        }
        Ok(params)
    }
}

fn for_header_error(kw: &Token) -> ScriptError {
    ScriptError::syntax("'for' expects (init; condition; step) or (name in/of source)").at(kw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tree(src: &str) -> String {
        compile(src, "test", &Language::common()).unwrap().to_sexpr()
    }

    fn err(src: &str) -> String {
        compile(src, "test", &Language::common()).unwrap_err().to_string()
    }

    #[test]
    fn precedence() {
        assert_eq!(tree("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(tree("1 * 2 + 3"), "(+ (* 1 2) 3)");
        assert_eq!(tree("a || b && c"), "(|| a (&& b c))");
        assert_eq!(tree("5 **2<=25.1"), "(<= (** 5 2) 25.1)");
    }

    #[test]
    fn multi_operators_flatten() {
        assert_eq!(tree("1 + 2 + 3 - 4"), "(- (+ 1 2 3) 4)");
        assert_eq!(tree("a = b = 5"), "(= a b 5)");
        assert_eq!(tree("a, b, c"), "(, a b c)");
    }

    #[test]
    fn right_to_left_groups_right() {
        assert_eq!(tree("2 ** 3 ** 2"), "(** 2 (** 3 2))");
        assert_eq!(tree("a += b -= 1"), "(+= a (-= b 1))");
    }

    #[test]
    fn ternary_reunification() {
        assert_eq!(tree("a ? b : c"), "(?: a b c)");
        assert_eq!(tree("x = a > 1 ? b + 1 : c"), "(= x (?: (> a 1) (+ b 1) c))");
        assert_eq!(tree("a ? b : c ? d : e"), "(?: a b (?: c d e))");
        assert_eq!(tree("a ? b ? c : d : e"), "(?: a (?: b c d) e)");
    }

    #[test]
    fn unary_attributes() {
        assert_eq!(tree("-!x"), "-!x");
        assert_eq!(tree("S++ + +4"), "(+ S++ +4)");
        assert_eq!(tree("--S+6"), "(+ --S 6)");
    }

    #[test]
    fn chains_and_members() {
        assert_eq!(tree("a.b[1](2)"), "a['b'][1](2)");
        assert_eq!(tree("D.0.3"), "D[0][3]");
        assert_eq!(tree("K[2:4]"), "K[(: 2 4)]");
    }

    #[test]
    fn literals_and_pairs() {
        assert_eq!(tree("{'a':1, b}"), "{(, (: 'a' 1) b)}");
        assert_eq!(tree("[1, [2]]"), "[(, 1 [2])]");
    }

    #[test]
    fn arrows_and_functions() {
        assert_eq!(tree("(a, b) => a * b"), "(=> (a b) {(* a b)})");
        assert_eq!(tree("f = x => {x}"), "(= f (=> (x) {x}))");
        assert_eq!(tree("[1].map(v => v + 1, 3)"), "[1]['map']((, (=> (v) {(+ v 1)}) 3))");
        assert_eq!(tree("function f(a, ...r) { return a }"), "(function (a ...r) {(return a)})");
    }

    #[test]
    fn keyword_statements() {
        assert_eq!(
            tree("if (I==3) B=4; else if (I<4) B=5; else B=6;B"),
            "(if (== I 3) {(= B 4)} {(if (< I 4) {(= B 5)} {(= B 6)})}); B"
        );
        assert_eq!(tree("for (let i = 0; i < 3; i++) { s += i }"), "(for {(let (= i 0))} {(< i 3)} {i++} {(+= s i)})");
        assert_eq!(tree("for (x of A) n++"), "(for x of A {n++})");
        assert_eq!(tree("do { i++ } while (i < 3)"), "(do {i++} (< i 3))");
        assert_eq!(tree("return"), "(return)");
    }

    #[test]
    fn keyword_errors() {
        assert!(err("if x=5 {x=7}").starts_with("Expected ( but found x"));
        assert!(err("for x=5 {x=7}").starts_with("Expected ( but found x"));
        assert!(err("if (x=5) x=7 else x=3")
            .starts_with("'else' should be used only inside 'if' declaration at else"));
        assert!(err("break 5").starts_with("'break' has no parameters"));
        assert!(err("class A {}").starts_with("'class' is not supported"));
    }

    #[test]
    fn structural_errors() {
        assert!(err("a b").starts_with("No operator between values at b"));
        assert!(err("1 +").starts_with("Unexpected end of expression"));
        assert!(err("-").starts_with("Unexpected unary operator at the end of expression"));
        assert!(err("(1 + 2").starts_with("Missing )"));
        assert!(err("1 + 2)").starts_with("Unexpected )"));
        assert!(err("a ? b").starts_with("Missing : for ?"));
        assert!(err("a : b").starts_with("Unexpected :"));
    }

    #[test]
    fn nesting_limit() {
        let src = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        let e = compile(&src, "test", &Language::common()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Limit);
    }
}
