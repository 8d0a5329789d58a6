//! Bit-packed option sets with named predicates.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

macro_rules! bitset {
    ($name:ident, $repr:ty) => {
        impl $name {
            pub const fn empty() -> Self {
                $name(0)
            }

            pub const fn bits(self) -> $repr {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                $name(self.0 | other.0)
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#b})"), self.0)
            }
        }
    };
}

/// Lexer switches carried by a grammar profile.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GrammarOptions(u16);

bitset!(GrammarOptions, u16);

impl GrammarOptions {
    /// Bytes >= 0x80 may appear only inside string literals.
    pub const NON_LATIN_LETTERS_ONLY_IN_STRINGS: Self = GrammarOptions(1 << 0);
    /// `'x'` produces a CHAR token instead of a STRING token.
    pub const SINGLE_QUOTE_HAS_TYPE_CHAR: Self = GrammarOptions(1 << 1);
    pub const EXCLUDE_LETTER: Self = GrammarOptions(1 << 2);
    pub const EXCLUDE_DIGIT: Self = GrammarOptions(1 << 3);
    pub const EXCLUDE_QUOTATION: Self = GrammarOptions(1 << 4);
    pub const EXCLUDE_CONTROL: Self = GrammarOptions(1 << 5);
    pub const EXCLUDE_LIST_CONTROL: Self = GrammarOptions(1 << 6);

    pub fn non_latin_letters_only_in_strings(self) -> bool {
        self.contains(Self::NON_LATIN_LETTERS_ONLY_IN_STRINGS)
    }

    pub fn single_quote_is_char(self) -> bool {
        self.contains(Self::SINGLE_QUOTE_HAS_TYPE_CHAR)
    }

    pub fn letters_enabled(self) -> bool {
        !self.contains(Self::EXCLUDE_LETTER)
    }

    pub fn digits_enabled(self) -> bool {
        !self.contains(Self::EXCLUDE_DIGIT)
    }

    pub fn quotations_enabled(self) -> bool {
        !self.contains(Self::EXCLUDE_QUOTATION)
    }

    pub fn control_enabled(self) -> bool {
        !self.contains(Self::EXCLUDE_CONTROL)
    }

    pub fn list_control_enabled(self) -> bool {
        !self.contains(Self::EXCLUDE_LIST_CONTROL)
    }
}

/// Per-evaluation switches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EvalOptions(u8);

bitset!(EvalOptions, u8);

impl EvalOptions {
    /// Reuse compiled programs keyed by source text.
    pub const CACHED: Self = EvalOptions(1 << 0);
    /// Unknown identifiers resolve to `undefined` instead of failing.
    pub const NAME: Self = EvalOptions(1 << 1);
    /// Assignments into non-structured values are silently dropped.
    pub const FORCE: Self = EvalOptions(1 << 2);
    /// Logical dialect: identifiers answer "is undefined" instead of "is defined".
    pub const UNDEFINED: Self = EvalOptions(1 << 3);

    pub fn is_cached(self) -> bool {
        self.contains(Self::CACHED)
    }

    pub fn tolerates_unknown_names(self) -> bool {
        self.contains(Self::NAME)
    }

    pub fn forces_assignment(self) -> bool {
        self.contains(Self::FORCE)
    }

    pub fn inverts_defined(self) -> bool {
        self.contains(Self::UNDEFINED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_predicates() {
        let o = EvalOptions::CACHED | EvalOptions::NAME;
        assert!(o.is_cached());
        assert!(o.tolerates_unknown_names());
        assert!(!o.forces_assignment());
        assert_eq!(o.bits(), 0b11);
    }

    #[test]
    fn remove_clears_only_named_bit() {
        let mut g = GrammarOptions::EXCLUDE_DIGIT | GrammarOptions::SINGLE_QUOTE_HAS_TYPE_CHAR;
        g.remove(GrammarOptions::EXCLUDE_DIGIT);
        assert!(g.digits_enabled());
        assert!(g.single_quote_is_char());
        assert!(g.letters_enabled());
    }
}
