//! Expression trees: operand reader plus precedence-climbing tree builder.
//!
//! An operand is a leaf, a bracket group, a function or a prefix keyword,
//! wrapped with its unary attributes and followed by its postfix chain.
//! Operands and binary operators alternate; the [`TreeBuilder`] keeps the
//! right spine of the tree built so far and attaches each operator where its
//! precedence says it belongs.

use std::rc::Rc;

use super::{else_error, Pairs, Parser};
use crate::ast::{Attrs, Bracket, FunctionDef, Node, NodeId, NodeKind, Param, PrefixOp};
use crate::error::{ScriptError, ScriptResult};
use crate::grammar::{KeywordKind, OperatorRule};
use crate::token::{Token, TokenKind};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self, start: usize, end: usize, pairs: Pairs) -> ScriptResult<NodeId> {
        if start >= end {
            let e = ScriptError::syntax("Unexpected end of expression");
            return Err(match start.checked_sub(1).and_then(|i| self.tokens.get(i)) {
                Some(t) => e.after(t),
                None => e,
            });
        }

        let lang = self.lang;
        let mut tree = TreeBuilder::default();
        let mut pos = start;
        loop {
            let operand = self.parse_operand(&mut pos, end)?;
            tree.attach_operand(self, operand);
            let Some(t) = self.tok_opt(pos, end) else {
                break;
            };
            if t.kind == TokenKind::Operator {
                if let Some(rule) = lang.operator(&t.text) {
                    pos += 1;
                    if pos >= end {
                        return Err(ScriptError::syntax("Unexpected end of expression").after(t));
                    }
                    tree.attach_operator(self, t, rule, pairs)?;
                    continue;
                }
                if lang
                    .keyword(&t.text)
                    .is_some_and(|k| matches!(k.kind, KeywordKind::Else | KeywordKind::ElseIf))
                {
                    return Err(else_error(t));
                }
            }
            // Juxtaposed operands join with the dialect's default operator.
            if let Some((glyph, rule)) = lang
                .default_operator()
                .and_then(|g| lang.operator(g).map(|r| (g, r)))
            {
                let joint = t.derive(TokenKind::Operator, glyph);
                tree.attach_operator(self, &joint, rule, pairs)?;
                continue;
            }
            return Err(ScriptError::syntax("No operator between values").at(t));
        }
        tree.finish(self)
    }

    fn parse_operand(&mut self, pos: &mut usize, end: usize) -> ScriptResult<NodeId> {
        let mut pre: Vec<Rc<str>> = Vec::new();
        while let Some(t) = self.tok_opt(*pos, end) {
            if t.kind == TokenKind::Operator && self.lang.unary(&t.text).is_some_and(|u| u.pre) {
                pre.push(Rc::clone(&t.text));
                *pos += 1;
            } else {
                break;
            }
        }

        let Some(t) = self.tok_opt(*pos, end) else {
            let msg = if pre.is_empty() {
                "Unexpected end of expression"
            } else {
                "Unexpected unary operator at the end of expression"
            };
            return Err(ScriptError::syntax(msg).after(self.tok(end - 1)));
        };

        let id = match t.kind {
            TokenKind::Control => {
                let Some(bracket) = Bracket::from_open(&t.text) else {
                    return Err(unexpected(t, &pre));
                };
                let close = self.matching_close(*pos, end)?;
                let id = self.parse_group(*pos, close, bracket, false)?;
                *pos = close + 1;
                id
            }
            TokenKind::Operator => {
                let Some(rule) = self.lang.keyword(&t.text) else {
                    return Err(unexpected(t, &pre));
                };
                match rule.kind {
                    KeywordKind::Function => {
                        let def = self.parse_function_def(pos, end)?;
                        self.push(Node::new(NodeKind::Function(def), t.clone(), Vec::new()))
                    }
                    KeywordKind::New => self.parse_prefix(PrefixOp::New, pos, end)?,
                    KeywordKind::Typeof => self.parse_prefix(PrefixOp::Typeof, pos, end)?,
                    KeywordKind::Delete => self.parse_prefix(PrefixOp::Delete, pos, end)?,
                    KeywordKind::Void => self.parse_prefix(PrefixOp::Void, pos, end)?,
                    KeywordKind::Else | KeywordKind::ElseIf => return Err(else_error(t)),
                    KeywordKind::Unsupported => {
                        return Err(ScriptError::syntax(format!("'{}' is not supported", t.text)).at(t));
                    }
                    _ => return Err(ScriptError::syntax(format!("Unexpected {}", t.text)).at(t)),
                }
            }
            _ => {
                *pos += 1;
                self.push(Node::new(NodeKind::Leaf, t.clone(), Vec::new()))
            }
        };

        self.parse_chain(id, pos, end)?;

        if let Some(t) = self.tok_opt(*pos, end).filter(|t| t.is_operator("=>")) {
            if !pre.is_empty() {
                return Err(ScriptError::syntax("Unexpected unary operator before =>").at(t));
            }
            return self.parse_arrow(id, pos, end);
        }

        let mut post = Attrs::new();
        while let Some(t) = self.tok_opt(*pos, end) {
            if t.kind == TokenKind::Operator && self.lang.unary(&t.text).is_some_and(|u| u.post) {
                post.push(Rc::clone(&t.text));
                *pos += 1;
            } else {
                break;
            }
        }

        let node = self.node_mut(id);
        node.pre.extend(pre.into_iter().rev());
        node.post = post;
        Ok(id)
    }

    fn parse_prefix(&mut self, op: PrefixOp, pos: &mut usize, end: usize) -> ScriptResult<NodeId> {
        let kw = self.tok(*pos);
        *pos += 1;
        self.enter(kw)?;
        let operand = self.parse_operand(pos, end)?;
        self.leave();
        Ok(self.push(Node::new(NodeKind::Prefix(op), kw.clone(), vec![operand])))
    }

    /// Member access, calls and follow-on brackets after an operand.
    fn parse_chain(&mut self, id: NodeId, pos: &mut usize, end: usize) -> ScriptResult<()> {
        while let Some(t) = self.tok_opt(*pos, end) {
            if t.is_control(".") {
                let Some(name) = self.tok_opt(*pos + 1, end) else {
                    return Err(ScriptError::syntax("Expected property name after .").after(t));
                };
                let key_kind = match name.kind {
                    TokenKind::Int => TokenKind::Int,
                    TokenKind::Data
                    | TokenKind::Bool
                    | TokenKind::Null
                    | TokenKind::Undefined
                    | TokenKind::NaN => TokenKind::Str,
                    _ => return Err(ScriptError::syntax(format!("Unexpected {} after .", name.text)).at(name)),
                };
                let key = self.push(Node::new(NodeKind::Leaf, name.derive(key_kind, &name.text), Vec::new()));
                let link = self.push(Node::new(
                    NodeKind::Group {
                        bracket: Bracket::Square,
                        chained: true,
                    },
                    t.clone(),
                    vec![key],
                ));
                self.node_mut(id).chain.push(link);
                *pos += 2;
                continue;
            }
            if t.kind == TokenKind::Control {
                if let Some(bracket) = Bracket::from_open(&t.text) {
                    let close = self.matching_close(*pos, end)?;
                    let link = self.parse_group(*pos, close, bracket, true)?;
                    self.node_mut(id).chain.push(link);
                    *pos = close + 1;
                    continue;
                }
            }
            break;
        }
        Ok(())
    }

    fn parse_group(&mut self, open: usize, close: usize, bracket: Bracket, chained: bool) -> ScriptResult<NodeId> {
        let tok = self.tok(open);
        self.enter(tok)?;
        let pairs = match bracket {
            Bracket::Paren => Pairs::Forbidden,
            Bracket::Square | Bracket::Curly => Pairs::Allowed,
        };
        let children = self.parse_forest(open + 1, close, pairs)?;
        self.leave();
        Ok(self.push(Node::new(NodeKind::Group { bracket, chained }, tok.clone(), children)))
    }

    /// `function [name](params) { body }` in expression position.
    fn parse_function_def(&mut self, pos: &mut usize, end: usize) -> ScriptResult<Rc<FunctionDef>> {
        let kw = self.tok(*pos);
        *pos += 1;
        let name = match self.tok_opt(*pos, end) {
            Some(t) if t.kind == TokenKind::Data => {
                *pos += 1;
                Some(Rc::clone(&t.text))
            }
            _ => None,
        };
        let params = self.expect_group(pos, end, Bracket::Paren, kw)?;
        let params = self.parse_params(params)?;
        let (open, close) = self.expect_group(pos, end, Bracket::Curly, kw)?;
        let body = self.parse_block_interior(open, close)?;
        Ok(Rc::new(FunctionDef {
            name,
            params,
            body,
            arrow: false,
        }))
    }

    fn parse_arrow(&mut self, params_id: NodeId, pos: &mut usize, end: usize) -> ScriptResult<NodeId> {
        let arrow = self.tok(*pos);
        *pos += 1;
        let params = self.arrow_params(params_id, arrow)?;
        let Some(t) = self.tok_opt(*pos, end) else {
            return Err(ScriptError::syntax("Unexpected end of expression").after(arrow));
        };
        let body = if t.is_control("{") {
            let close = self.matching_close(*pos, end)?;
            let body = self.parse_block_interior(*pos, close)?;
            *pos = close + 1;
            body
        } else {
            let stop = self.arrow_body_end(*pos, end)?;
            self.enter(arrow)?;
            let id = self.parse_expression(*pos, stop, Pairs::Forbidden)?;
            self.leave();
            *pos = stop;
            vec![id]
        };
        let def = Rc::new(FunctionDef {
            name: None,
            params,
            body,
            arrow: true,
        });
        Ok(self.push(Node::new(NodeKind::Function(def), arrow.clone(), Vec::new())))
    }

    fn arrow_params(&self, id: NodeId, arrow: &Token) -> ScriptResult<Vec<Param>> {
        let malformed = || ScriptError::syntax("Malformed arrow function parameter list").at(arrow);
        let node = self.node(id);
        if let Some(name) = node.plain_name() {
            return Ok(vec![Param {
                name: Rc::clone(name),
                rest: false,
            }]);
        }
        if !matches!(node.kind, NodeKind::Group { bracket: Bracket::Paren, chained: false }) || !node.is_plain() {
            return Err(malformed());
        }
        let items: Vec<NodeId> = match node.children.as_slice() {
            [] => Vec::new(),
            [only] if self.node(*only).operator() == Some(",") && self.node(*only).is_plain() => {
                self.node(*only).children.clone()
            }
            [only] => vec![*only],
            _ => return Err(malformed()),
        };
        let mut params = Vec::with_capacity(items.len());
        for item in items {
            let n = self.node(item);
            let rest = n.pre.len() == 1 && &*n.pre[0] == "...";
            let simple = matches!(n.kind, NodeKind::Leaf)
                && n.token.kind == TokenKind::Data
                && n.chain.is_empty()
                && n.post.is_empty()
                && (n.pre.is_empty() || rest);
            if !simple {
                return Err(ScriptError::syntax("Malformed arrow function parameter list").at(&n.token));
            }
            params.push(Param {
                name: Rc::clone(&n.token.text),
                rest,
            });
        }
        Ok(params)
    }

    /// An expression-bodied arrow ends at the next depth-0 `,` or separator.
    fn arrow_body_end(&self, from: usize, end: usize) -> ScriptResult<usize> {
        let mut i = from;
        while i < end {
            let t = self.tok(i);
            if t.is_open_bracket() {
                i = self.matching_close(i, end)? + 1;
                continue;
            }
            if t.is_operator(",") || self.is_separator(i) {
                return Ok(i);
            }
            i += 1;
        }
        Ok(end)
    }
}

fn unexpected(t: &Token, pre: &[Rc<str>]) -> ScriptError {
    if pre.is_empty() {
        ScriptError::syntax(format!("Unexpected {}", t.text)).at(t)
    } else {
        ScriptError::syntax(format!("Unexpected unary operator before {}", t.text)).at(t)
    }
}

// ── TreeBuilder ───────────────────────────────────────────────────────────────

/// Precedence-climbing attachment of operators onto the right spine.
#[derive(Default)]
struct TreeBuilder {
    root: Option<NodeId>,
    /// Operator nodes from the root down to the most recent one.
    spine: Vec<NodeId>,
}

impl TreeBuilder {
    fn attach_operand(&mut self, p: &mut Parser<'_>, id: NodeId) {
        match self.spine.last() {
            Some(&top) => p.node_mut(top).children.push(id),
            None => self.root = Some(id),
        }
    }

    /// Glyph whose rule governs node `id` when it sits on the spine.
    fn glyph_of<'p>(p: &'p Parser<'_>, id: NodeId) -> Option<&'p str> {
        match &p.node(id).kind {
            NodeKind::Operator(g) => Some(g),
            NodeKind::Ternary => p.lang.ternary().map(|(q, _)| q),
            _ => None,
        }
    }

    fn is_open_question(p: &Parser<'_>, id: NodeId) -> bool {
        match p.lang.ternary() {
            Some((q, _)) => p.node(id).operator() == Some(q),
            None => false,
        }
    }

    fn attach_operator(&mut self, p: &mut Parser<'_>, tok: &Token, rule: OperatorRule, pairs: Pairs) -> ScriptResult<()> {
        let lang = p.lang;
        let glyph: &str = &tok.text;

        if let Some((_, colon)) = lang.ternary() {
            if glyph == colon {
                if let Some(i) = self.spine.iter().rposition(|&n| Self::is_open_question(p, n)) {
                    self.spine.truncate(i + 1);
                    p.node_mut(self.spine[i]).kind = NodeKind::Ternary;
                    return Ok(());
                }
                if pairs == Pairs::Forbidden {
                    return Err(ScriptError::syntax(format!("Unexpected {colon}")).at(tok));
                }
            }
        }

        // Walk up past everything that binds tighter.  An unmatched `?`
        // owns everything up to its `:`.
        while let Some(&top) = self.spine.last() {
            if Self::is_open_question(p, top) {
                break;
            }
            let Some(top_glyph) = Self::glyph_of(p, top) else {
                break;
            };
            let same = top_glyph == glyph;
            let Some(top_rule) = lang.operator(top_glyph) else {
                break;
            };
            let tighter = top_rule.precedence > rule.precedence
                || (top_rule.precedence == rule.precedence && !rule.right_to_left && !(same && rule.multi));
            if !tighter {
                break;
            }
            self.spine.pop();
        }

        let top = self.spine.last().copied();
        let sibling = top.is_some_and(|t| rule.multi && p.node(t).operator() == Some(glyph));
        if sibling {
            // Next operand is appended to the existing node.
        } else if let Some(top) = top {
            let Some(last) = p.node_mut(top).children.pop() else {
                return Err(ScriptError::syntax(format!("Unexpected {glyph}")).at(tok));
            };
            let id = p.push(Node::new(NodeKind::Operator(Rc::clone(&tok.text)), tok.clone(), vec![last]));
            p.node_mut(top).children.push(id);
            self.spine.push(id);
        } else {
            let Some(root) = self.root.take() else {
                return Err(ScriptError::syntax(format!("Unexpected {glyph}")).at(tok));
            };
            let id = p.push(Node::new(NodeKind::Operator(Rc::clone(&tok.text)), tok.clone(), vec![root]));
            self.root = Some(id);
            self.spine.push(id);
        }

        if self.spine.len() > p.max_depth {
            return Err(ScriptError::limit("Nesting is too deep").at(tok));
        }
        Ok(())
    }

    fn finish(self, p: &Parser<'_>) -> ScriptResult<NodeId> {
        let lang = p.lang;
        if let Some((question, colon)) = lang.ternary() {
            if let Some(&open) = self.spine.iter().find(|&&n| Self::is_open_question(p, n)) {
                return Err(ScriptError::syntax(format!("Missing {colon} for {question}")).at(&p.node(open).token));
            }
        }
        self.root
            .ok_or_else(|| ScriptError::syntax("Unexpected end of expression"))
    }
}
