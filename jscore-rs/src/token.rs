//! Lexical tokens.

use std::fmt;
use std::rc::Rc;

/// Data-kind tag of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Brackets, separators and the member dot.
    Control,
    /// Operator glyphs and keywords matched through the control tables.
    Operator,
    Str,
    Char,
    Number,
    Int,
    Bool,
    Null,
    Undefined,
    NaN,
    /// Identifiers.
    Data,
}

/// One lexical unit with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Rc<str>,
    pub row: u32,
    pub col: u32,
    pub place: Rc<str>,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, row: u32, col: u32, place: Rc<str>) -> Self {
        Token {
            kind,
            text: Rc::from(text),
            row,
            col,
            place,
        }
    }

    /// A token at the same position as `self`, with other content.
    pub fn derive(&self, kind: TokenKind, text: &str) -> Token {
        Token {
            kind,
            text: Rc::from(text),
            row: self.row,
            col: self.col,
            place: Rc::clone(&self.place),
        }
    }

    pub fn is_control(&self, glyph: &str) -> bool {
        self.kind == TokenKind::Control && &*self.text == glyph
    }

    pub fn is_operator(&self, glyph: &str) -> bool {
        self.kind == TokenKind::Operator && &*self.text == glyph
    }

    pub fn is_open_bracket(&self) -> bool {
        self.kind == TokenKind::Control && matches!(&*self.text, "(" | "[" | "{")
    }

    pub fn is_close_bracket(&self) -> bool {
        self.kind == TokenKind::Control && matches!(&*self.text, ")" | "]" | "}")
    }

    /// Whether this token completes an operand, so a following `.` is member access.
    pub fn ends_value(&self) -> bool {
        match self.kind {
            TokenKind::Control => matches!(&*self.text, ")" | "]" | "}"),
            TokenKind::Operator => false,
            _ => true,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
