//! Grammar descriptions and language profiles.
//!
//! A [`Language`] couples a grammar (operator precedences, unary attributes,
//! keywords, aliases, lexer options) with the visitor functions that execute
//! each operator.  The byte-level lookup tables derived from it are built
//! lazily, once per language, and cached in [`Language::profile`].
//!
//! Two dialects ship with the crate:
//!
//! - [`Language::common`]: the JavaScript-flavored dialect.
//! - [`Language::logical`]: identifiers mean "is defined", combined with
//!   `&&`, `||` and `!`.

mod common;
mod logical;
pub mod table;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::ScriptResult;
use crate::exec::{Interp, Resolved};
use crate::ast::NodeId;
use crate::options::GrammarOptions;
use crate::value::Value;

pub use table::{ByteClass, Profile};

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Binary operator behaviour inside the tree builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorRule {
    /// Higher binds tighter.
    pub precedence: u8,
    /// Consecutive uses flatten into one node with many children.
    pub multi: bool,
    /// Equal precedence groups to the right.
    pub right_to_left: bool,
    /// The visitor receives the node instead of evaluated children.
    pub lazy: bool,
    /// The left operand is a write target.
    pub assignment: bool,
}

impl OperatorRule {
    pub const fn new(precedence: u8) -> Self {
        OperatorRule {
            precedence,
            multi: false,
            right_to_left: false,
            lazy: false,
            assignment: false,
        }
    }

    pub const fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub const fn rtl(mut self) -> Self {
        self.right_to_left = true;
        self
    }

    pub const fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub const fn assignment(mut self) -> Self {
        self.assignment = true;
        self.lazy = true;
        self
    }
}

/// Whether an operator glyph may appear before and/or after an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnaryRule {
    pub pre: bool,
    pub post: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    If,
    Else,
    ElseIf,
    For,
    While,
    Do,
    Return,
    Break,
    Continue,
    Throw,
    Function,
    Declare,
    New,
    Typeof,
    Delete,
    Void,
    /// Reserved word the engine refuses with "'word' is not supported".
    Unsupported,
}

impl KeywordKind {
    /// Keywords that apply to the following operand instead of starting a statement.
    pub fn is_prefix(self) -> bool {
        matches!(self, KeywordKind::New | KeywordKind::Typeof | KeywordKind::Delete | KeywordKind::Void)
    }
}

/// Parts a keyword statement consumes, in this order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeywordFeatures(u8);

impl KeywordFeatures {
    /// An optional identifier right after the keyword.
    pub const NAME: Self = KeywordFeatures(1 << 0);
    /// A mandatory parenthesised group.
    pub const PARENS: Self = KeywordFeatures(1 << 1);
    /// A braced block, or a single statement up to the next `;`.
    pub const BODY: Self = KeywordFeatures(1 << 2);
    /// A braced block only.
    pub const BLOCK: Self = KeywordFeatures(1 << 3);
    /// `while (...)` after the body.
    pub const TRAILING_CONDITION: Self = KeywordFeatures(1 << 4);
    /// An optional `else` / `else if` continuation.
    pub const ELSE_CHAIN: Self = KeywordFeatures(1 << 5);
    /// An optional expression up to the end of the statement.
    pub const ARGUMENT: Self = KeywordFeatures(1 << 6);
    /// Nothing may follow before the end of the statement.
    pub const NO_ARGUMENT: Self = KeywordFeatures(1 << 7);

    pub const fn empty() -> Self {
        KeywordFeatures(0)
    }

    pub const fn union(self, other: Self) -> Self {
        KeywordFeatures(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for KeywordFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeywordFeatures({:#010b})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRule {
    pub kind: KeywordKind,
    pub features: KeywordFeatures,
}

// ── Visitors ──────────────────────────────────────────────────────────────────

/// Receives the evaluated children of an operator node.
pub type EagerVisitor = fn(&mut Interp<'_>, &[Value]) -> ScriptResult<Value>;
/// Receives the operator node itself and evaluates children on demand.
pub type LazyVisitor = fn(&mut Interp<'_>, NodeId) -> ScriptResult<Value>;
/// Receives an operand together with its write-back place.
pub type UnaryVisitor = fn(&mut Interp<'_>, Resolved) -> ScriptResult<Value>;

#[derive(Clone, Copy)]
pub enum Visitor {
    Eager(EagerVisitor),
    Lazy(LazyVisitor),
}

impl fmt::Debug for Visitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visitor::Eager(_) => f.write_str("Eager"),
            Visitor::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

/// How leaf tokens turn into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataGetter {
    /// Literals decode, identifiers resolve through the scope chain and globals.
    Script,
    /// Identifiers evaluate to whether the scope chain defines them.
    Defined,
}

// ── Language ──────────────────────────────────────────────────────────────────

/// A complete dialect: grammar plus execution visitors.
pub struct Language {
    name: String,
    operators: HashMap<String, OperatorRule>,
    unary: HashMap<String, UnaryRule>,
    keywords: HashMap<String, KeywordRule>,
    aliases: HashMap<String, String>,
    options: GrammarOptions,
    default_operator: Option<String>,
    separator: Option<String>,
    ternary: Option<(String, String)>,
    visitors: HashMap<String, Visitor>,
    pre_visitors: HashMap<String, UnaryVisitor>,
    post_visitors: HashMap<String, UnaryVisitor>,
    data_getter: DataGetter,
    profile: OnceLock<Profile>,
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name)
            .field("operators", &self.operators.len())
            .field("keywords", &self.keywords.len())
            .field("data_getter", &self.data_getter)
            .finish()
    }
}

impl Language {
    pub fn builder(name: &str) -> LanguageBuilder {
        LanguageBuilder::new(name)
    }

    /// The JavaScript-flavored dialect, built once per process.
    pub fn common() -> Arc<Language> {
        static COMMON: OnceLock<Arc<Language>> = OnceLock::new();
        Arc::clone(COMMON.get_or_init(|| Arc::new(common::build())))
    }

    /// The "is defined" dialect, built once per process.
    pub fn logical() -> Arc<Language> {
        static LOGICAL: OnceLock<Arc<Language>> = OnceLock::new();
        Arc::clone(LOGICAL.get_or_init(|| Arc::new(logical::build())))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte tables for the lexer; built on first use.
    pub fn profile(&self) -> &Profile {
        self.profile.get_or_init(|| Profile::build(self))
    }

    pub fn options(&self) -> GrammarOptions {
        self.options
    }

    pub fn operator(&self, glyph: &str) -> Option<OperatorRule> {
        self.operators.get(glyph).copied()
    }

    pub fn unary(&self, glyph: &str) -> Option<UnaryRule> {
        self.unary.get(glyph).copied()
    }

    pub fn keyword(&self, word: &str) -> Option<KeywordRule> {
        self.keywords.get(word).copied()
    }

    pub fn keyword_of(&self, kind: KeywordKind) -> Option<KeywordRule> {
        self.keywords.values().copied().find(|k| k.kind == kind)
    }

    pub fn default_operator(&self) -> Option<&str> {
        self.default_operator.as_deref()
    }

    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    /// `(question, colon)` glyphs of the conditional operator.
    pub fn ternary(&self) -> Option<(&str, &str)> {
        self.ternary.as_ref().map(|(q, c)| (q.as_str(), c.as_str()))
    }

    pub fn visitor(&self, glyph: &str) -> Option<Visitor> {
        self.visitors.get(glyph).copied()
    }

    pub fn pre_visitor(&self, glyph: &str) -> Option<UnaryVisitor> {
        self.pre_visitors.get(glyph).copied()
    }

    pub fn post_visitor(&self, glyph: &str) -> Option<UnaryVisitor> {
        self.post_visitors.get(glyph).copied()
    }

    pub fn data_getter(&self) -> DataGetter {
        self.data_getter
    }

    /// Every token text the control tables must recognise, with its canonical form.
    pub(crate) fn control_words(&self) -> Vec<(&str, &str)> {
        let mut words: Vec<(&str, &str)> = Vec::new();
        words.extend(self.operators.keys().map(|k| (k.as_str(), k.as_str())));
        words.extend(self.unary.keys().map(|k| (k.as_str(), k.as_str())));
        words.extend(self.keywords.keys().map(|k| (k.as_str(), k.as_str())));
        words.extend(self.aliases.iter().map(|(from, to)| (from.as_str(), to.as_str())));
        words
    }

    pub(crate) fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub(crate) fn visitor_glyphs(&self) -> impl Iterator<Item = &str> {
        self.visitors.keys().map(String::as_str)
    }

    pub(crate) fn unary_visitor_glyphs(&self) -> impl Iterator<Item = (&str, bool)> {
        self.pre_visitors
            .keys()
            .map(|k| (k.as_str(), true))
            .chain(self.post_visitors.keys().map(|k| (k.as_str(), false)))
    }

    pub(crate) fn is_known_glyph(&self, glyph: &str) -> bool {
        self.operators.contains_key(glyph)
            || self.unary.contains_key(glyph)
            || self.keywords.contains_key(glyph)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Assembles a [`Language`]; used by the built-in dialects and by hosts
/// defining their own.
pub struct LanguageBuilder {
    lang: Language,
}

impl LanguageBuilder {
    pub fn new(name: &str) -> Self {
        LanguageBuilder {
            lang: Language {
                name: name.to_string(),
                operators: HashMap::new(),
                unary: HashMap::new(),
                keywords: HashMap::new(),
                aliases: HashMap::new(),
                options: GrammarOptions::empty(),
                default_operator: None,
                separator: None,
                ternary: None,
                visitors: HashMap::new(),
                pre_visitors: HashMap::new(),
                post_visitors: HashMap::new(),
                data_getter: DataGetter::Script,
                profile: OnceLock::new(),
            },
        }
    }

    pub fn operator(mut self, glyph: &str, rule: OperatorRule, visitor: Visitor) -> Self {
        self.lang.operators.insert(glyph.to_string(), rule);
        self.lang.visitors.insert(glyph.to_string(), visitor);
        self
    }

    /// A grammar entry without a visitor (handled structurally by the parser).
    pub fn grammar_only(mut self, glyph: &str, rule: OperatorRule) -> Self {
        self.lang.operators.insert(glyph.to_string(), rule);
        self
    }

    /// A visitor without a grammar entry; reported when the profile is built.
    pub fn visitor(mut self, glyph: &str, visitor: Visitor) -> Self {
        self.lang.visitors.insert(glyph.to_string(), visitor);
        self
    }

    pub fn prefix(mut self, glyph: &str, visitor: UnaryVisitor) -> Self {
        self.lang.unary.entry(glyph.to_string()).or_default().pre = true;
        self.lang.pre_visitors.insert(glyph.to_string(), visitor);
        self
    }

    pub fn postfix(mut self, glyph: &str, visitor: UnaryVisitor) -> Self {
        self.lang.unary.entry(glyph.to_string()).or_default().post = true;
        self.lang.post_visitors.insert(glyph.to_string(), visitor);
        self
    }

    pub fn keyword(mut self, word: &str, kind: KeywordKind, features: KeywordFeatures) -> Self {
        self.lang
            .keywords
            .insert(word.to_string(), KeywordRule { kind, features });
        self
    }

    pub fn alias(mut self, from: &str, to: &str) -> Self {
        self.lang.aliases.insert(from.to_string(), to.to_string());
        self
    }

    pub fn options(mut self, options: GrammarOptions) -> Self {
        self.lang.options = options;
        self
    }

    pub fn default_operator(mut self, glyph: &str) -> Self {
        self.lang.default_operator = Some(glyph.to_string());
        self
    }

    pub fn separator(mut self, glyph: &str) -> Self {
        self.lang.separator = Some(glyph.to_string());
        self
    }

    pub fn ternary(mut self, question: &str, colon: &str) -> Self {
        self.lang.ternary = Some((question.to_string(), colon.to_string()));
        self
    }

    pub fn data_getter(mut self, getter: DataGetter) -> Self {
        self.lang.data_getter = getter;
        self
    }

    pub fn build(self) -> Language {
        self.lang
    }
}
