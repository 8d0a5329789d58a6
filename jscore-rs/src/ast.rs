//! Arena-allocated syntax tree.
//!
//! A compiled [`Program`] owns every [`Node`] in a flat vector; nodes refer
//! to each other through [`NodeId`] indices.  Programs are immutable after
//! parsing and shared via `Rc` between the compile cache and closures.

use std::fmt::Write as _;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unary operator glyphs attached to an operand.
pub type Attrs = SmallVec<[Rc<str>; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bracket {
    Paren,
    Square,
    Curly,
}

impl Bracket {
    pub fn from_open(glyph: &str) -> Option<Bracket> {
        match glyph {
            "(" => Some(Bracket::Paren),
            "[" => Some(Bracket::Square),
            "{" => Some(Bracket::Curly),
            _ => None,
        }
    }

    pub fn open(self) -> &'static str {
        match self {
            Bracket::Paren => "(",
            Bracket::Square => "[",
            Bracket::Curly => "{",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Bracket::Paren => ")",
            Bracket::Square => "]",
            Bracket::Curly => "}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    New,
    Typeof,
    Delete,
    Void,
}

impl PrefixOp {
    pub fn word(self) -> &'static str {
        match self {
            PrefixOp::New => "new",
            PrefixOp::Typeof => "typeof",
            PrefixOp::Delete => "delete",
            PrefixOp::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Rc<str>,
    pub rest: bool,
}

#[derive(Debug)]
pub struct FunctionDef {
    pub name: Option<Rc<str>>,
    pub params: Vec<Param>,
    pub body: Vec<NodeId>,
    /// Arrow functions do not bind their own `this`.
    pub arrow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclareKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub enum Statement {
    If {
        cond: Vec<NodeId>,
        then: Vec<NodeId>,
        otherwise: Option<Vec<NodeId>>,
    },
    For {
        init: Vec<NodeId>,
        cond: Vec<NodeId>,
        step: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    /// `for (x in src)` iterates keys, `for (x of src)` iterates values.
    ForEach {
        var: Rc<str>,
        declare: Option<DeclareKind>,
        values: bool,
        source: NodeId,
        body: Vec<NodeId>,
    },
    While {
        cond: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    DoWhile {
        body: Vec<NodeId>,
        cond: Vec<NodeId>,
    },
    Return(Option<NodeId>),
    Break,
    Continue,
    Throw(NodeId),
    Declare {
        kind: DeclareKind,
        target: NodeId,
    },
    Function(Rc<FunctionDef>),
}

#[derive(Debug)]
pub enum NodeKind {
    /// Binary (or multi-operand) operator.
    Operator(Rc<str>),
    /// `cond ? then : else`
    Ternary,
    /// Literal or identifier.
    Leaf,
    /// Bracket group.  `chained` groups are member access, calls or
    /// follow-on blocks attached to an operand's chain.
    Group { bracket: Bracket, chained: bool },
    Function(Rc<FunctionDef>),
    Prefix(PrefixOp),
    Statement(Statement),
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Token,
    pub children: Vec<NodeId>,
    /// Postfix brackets applied to this operand, in source order.
    pub chain: Vec<NodeId>,
    /// Prefix unary glyphs in application order (innermost first).
    pub pre: Attrs,
    /// Postfix unary glyphs in source order.
    pub post: Attrs,
}

impl Node {
    pub fn new(kind: NodeKind, token: Token, children: Vec<NodeId>) -> Self {
        Node {
            kind,
            token,
            children,
            chain: Vec::new(),
            pre: Attrs::new(),
            post: Attrs::new(),
        }
    }

    pub fn is_plain(&self) -> bool {
        self.chain.is_empty() && self.pre.is_empty() && self.post.is_empty()
    }

    /// A bare identifier without chain or attributes.
    pub fn plain_name(&self) -> Option<&Rc<str>> {
        match self.kind {
            NodeKind::Leaf if self.token.kind == TokenKind::Data && self.is_plain() => Some(&self.token.text),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Operator(g) => Some(g),
            _ => None,
        }
    }
}

/// A parsed forest of statements.
#[derive(Debug)]
pub struct Program {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    place: Rc<str>,
}

impl Program {
    pub(crate) fn new(nodes: Vec<Node>, roots: Vec<NodeId>, place: Rc<str>) -> Self {
        Program { nodes, roots, place }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn place(&self) -> &str {
        &self.place
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Compact S-expression rendering of the whole forest, `; `-separated.
    pub fn to_sexpr(&self) -> String {
        let parts: Vec<String> = self.roots.iter().map(|&r| self.sexpr(r)).collect();
        parts.join("; ")
    }

    pub fn sexpr(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_sexpr(&mut out, id);
        out
    }

    fn write_list(&self, out: &mut String, ids: &[NodeId]) {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write_sexpr(out, id);
        }
    }

    fn write_block(&self, out: &mut String, ids: &[NodeId]) {
        out.push('{');
        self.write_list(out, ids);
        out.push('}');
    }

    fn write_sexpr(&self, out: &mut String, id: NodeId) {
        let node = self.node(id);
        for g in node.pre.iter().rev() {
            out.push_str(g);
        }
        match &node.kind {
            NodeKind::Leaf => match node.token.kind {
                TokenKind::Str | TokenKind::Char => {
                    let _ = write!(out, "'{}'", node.token.text);
                }
                _ => out.push_str(&node.token.text),
            },
            NodeKind::Operator(g) => {
                let _ = write!(out, "({g} ");
                self.write_list(out, &node.children);
                out.push(')');
            }
            NodeKind::Ternary => {
                out.push_str("(?: ");
                self.write_list(out, &node.children);
                out.push(')');
            }
            NodeKind::Group { bracket, .. } => {
                out.push_str(bracket.open());
                self.write_list(out, &node.children);
                out.push_str(bracket.close());
            }
            NodeKind::Function(def) => self.write_function(out, def),
            NodeKind::Prefix(op) => {
                let _ = write!(out, "({} ", op.word());
                self.write_list(out, &node.children);
                out.push(')');
            }
            NodeKind::Statement(st) => self.write_statement(out, st),
        }
        for &link in &node.chain {
            self.write_sexpr(out, link);
        }
        for g in &node.post {
            out.push_str(g);
        }
    }

    fn write_function(&self, out: &mut String, def: &FunctionDef) {
        out.push_str(if def.arrow { "(=> (" } else { "(function (" });
        let params: Vec<String> = def
            .params
            .iter()
            .map(|p| if p.rest { format!("...{}", p.name) } else { p.name.to_string() })
            .collect();
        out.push_str(&params.join(" "));
        out.push_str(") ");
        self.write_block(out, &def.body);
        out.push(')');
    }

    fn write_statement(&self, out: &mut String, st: &Statement) {
        match st {
            Statement::If { cond, then, otherwise } => {
                out.push_str("(if ");
                self.write_list(out, cond);
                out.push(' ');
                self.write_block(out, then);
                if let Some(o) = otherwise {
                    out.push(' ');
                    self.write_block(out, o);
                }
                out.push(')');
            }
            Statement::For { init, cond, step, body } => {
                out.push_str("(for ");
                self.write_block(out, init);
                out.push(' ');
                self.write_block(out, cond);
                out.push(' ');
                self.write_block(out, step);
                out.push(' ');
                self.write_block(out, body);
                out.push(')');
            }
            Statement::ForEach { var, values, source, body, .. } => {
                let _ = write!(out, "(for {var} {} ", if *values { "of" } else { "in" });
                self.write_sexpr(out, *source);
                out.push(' ');
                self.write_block(out, body);
                out.push(')');
            }
            Statement::While { cond, body } => {
                out.push_str("(while ");
                self.write_list(out, cond);
                out.push(' ');
                self.write_block(out, body);
                out.push(')');
            }
            Statement::DoWhile { body, cond } => {
                out.push_str("(do ");
                self.write_block(out, body);
                out.push(' ');
                self.write_list(out, cond);
                out.push(')');
            }
            Statement::Return(arg) => {
                out.push_str("(return");
                if let Some(a) = arg {
                    out.push(' ');
                    self.write_sexpr(out, *a);
                }
                out.push(')');
            }
            Statement::Break => out.push_str("(break)"),
            Statement::Continue => out.push_str("(continue)"),
            Statement::Throw(arg) => {
                out.push_str("(throw ");
                self.write_sexpr(out, *arg);
                out.push(')');
            }
            Statement::Declare { kind, target } => {
                let word = match kind {
                    DeclareKind::Var => "var",
                    DeclareKind::Let => "let",
                    DeclareKind::Const => "const",
                };
                let _ = write!(out, "({word} ");
                self.write_sexpr(out, *target);
                out.push(')');
            }
            Statement::Function(def) => self.write_function(out, def),
        }
    }
}
