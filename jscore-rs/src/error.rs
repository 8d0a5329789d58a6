//! Error types.
//!
//! Every failure inside the engine is a [`ScriptError`]: a kind, a message,
//! an optional source position and a chain of enrichment strings appended by
//! enclosing evaluation levels as the error unwinds.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::token::Token;

/// Broad classification of a [`ScriptError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown byte, unterminated string.
    Lexical,
    /// Misplaced operator, missing bracket, malformed keyword statement.
    Syntax,
    /// Identifier not found in scope.
    Reference,
    /// Calling a non-callable, assigning into a non-structured value, ...
    Type,
    /// Out-of-range numeric argument to a built-in.
    Range,
    /// Nesting depth, call depth or statement budget exhausted.
    Limit,
    /// Raised by a script `throw` statement.
    Thrown,
}

/// Where an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub token: String,
    pub place: String,
    pub row: u32,
    pub col: u32,
    /// The error refers to the end of input following `token`.
    pub after: bool,
}

impl SourcePos {
    fn from_token(token: &Token, after: bool) -> Self {
        SourcePos {
            token: token.text.to_string(),
            place: token.place.to_string(),
            row: token.row,
            col: token.col,
            after,
        }
    }
}

/// An error produced while tokenizing, parsing or evaluating a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", render_tail(.pos, .chain))]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: Option<SourcePos>,
    pub chain: Vec<String>,
}

fn render_tail(pos: &Option<SourcePos>, chain: &[String]) -> String {
    let mut out = String::new();
    if let Some(p) = pos {
        if p.after {
            let _ = write!(out, " in {} (after {}:{})", p.place, p.row, p.col);
        } else {
            let _ = write!(out, " at {} in {} ({}:{})", p.token, p.place, p.row, p.col);
        }
    }
    for info in chain {
        out.push_str("\n   ");
        out.push_str(info);
    }
    out
}

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ScriptError {
            kind,
            message: message.into(),
            pos: None,
            chain: Vec::new(),
        }
    }

    pub fn lexical(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lexical, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message)
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Limit, message)
    }

    pub fn thrown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Thrown, message)
    }

    /// Attach the position of `token`, replacing any previous position.
    pub fn at(mut self, token: &Token) -> Self {
        self.pos = Some(SourcePos::from_token(token, false));
        self
    }

    /// Attach an end-of-input position following `token`.
    pub fn after(mut self, token: &Token) -> Self {
        self.pos = Some(SourcePos::from_token(token, true));
        self
    }

    /// Attach the position of `token` unless a deeper level already did.
    pub fn locate(self, token: &Token) -> Self {
        if self.pos.is_some() {
            self
        } else {
            self.at(token)
        }
    }

    /// Append a context line; the original message and position are kept.
    ///
    /// A line equal to the previous one bumps a `(xN)` count instead, so
    /// deep recursion reports one line per distinct frame.
    pub fn enrich(mut self, info: impl Into<String>) -> Self {
        let info = info.into();
        if let Some(last) = self.chain.last_mut() {
            let (base, n) = split_repeat(last);
            if base == info {
                *last = format!("{info} (x{})", n + 1);
                return self;
            }
        }
        self.chain.push(info);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Split a `"line (xN)"` chain entry into its line and count.
fn split_repeat(entry: &str) -> (&str, usize) {
    entry
        .strip_suffix(')')
        .and_then(|s| s.rsplit_once(" (x"))
        .and_then(|(base, n)| Some((base, n.parse().ok()?)))
        .unwrap_or((entry, 1))
}

/// Result alias used throughout the engine.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Top-level error for the configuration loader and the binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
