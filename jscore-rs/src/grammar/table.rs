//! Byte classification and control-token lookup tables.
//!
//! Every byte value maps to a [`ByteClass`] that selects the lexer's
//! recognizer.  Bytes that begin an operator, keyword or alias additionally
//! carry a [`ControlBlock`]: candidate texts grouped by byte length, so the
//! lexer can try the longest match first.  Multi-word entries (`else if`,
//! `NOT IN`) are stored with single spaces and matched against any run of
//! whitespace in the input.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::Language;
use crate::options::GrammarOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteClass {
    /// Not valid outside a string literal.
    OnlyInsideString,
    /// Opening brackets and the member dot.
    Control,
    Digit,
    Letter,
    /// Closing brackets.
    ListClosing,
    /// `,` and `;` when the grammar does not claim them.
    ListSeparator,
    /// Punctuation claimed by an operator glyph.
    Operator,
    Quotation,
    Space,
}

/// Candidate control texts sharing a first byte.
#[derive(Debug, Default, Clone)]
struct ControlBlock {
    max_len: usize,
    max_words: usize,
    /// `by_len[n]` holds normalized candidates of exactly `n` bytes.
    by_len: Vec<HashMap<Vec<u8>, String>>,
}

impl ControlBlock {
    fn insert(&mut self, key: Vec<u8>, canonical: &str) -> Option<String> {
        let len = key.len();
        let words = key.iter().filter(|&&b| b == b' ').count() + 1;
        self.max_len = self.max_len.max(len);
        self.max_words = self.max_words.max(words);
        if self.by_len.len() <= len {
            self.by_len.resize_with(len + 1, HashMap::new);
        }
        self.by_len[len].insert(key, canonical.to_string())
    }

    fn find(&self, src: &[u8], pos: usize) -> Option<(&str, usize)> {
        // Normalized prefix of the input and, for each byte of it, the input
        // offset just past that byte.
        let mut norm: Vec<u8> = Vec::with_capacity(self.max_len);
        let mut ends: Vec<usize> = Vec::with_capacity(self.max_len);
        let mut words = 1;
        let mut i = pos;
        while i < src.len() && norm.len() < self.max_len {
            let b = src[i];
            if is_space(b) {
                if norm.is_empty() || words >= self.max_words {
                    break;
                }
                let mut j = i;
                while j < src.len() && is_space(src[j]) {
                    j += 1;
                }
                norm.push(b' ');
                ends.push(j);
                words += 1;
                i = j;
            } else {
                norm.push(b);
                i += 1;
                ends.push(i);
            }
        }

        for len in (1..=norm.len()).rev() {
            if norm[len - 1] == b' ' {
                continue;
            }
            let Some(canonical) = self.by_len.get(len).and_then(|m| m.get(&norm[..len])) else {
                continue;
            };
            let end = ends[len - 1];
            // `in` must not match the head of `index`.
            if is_word(norm[len - 1]) && src.get(end).is_some_and(|&b| is_word(b)) {
                continue;
            }
            return Some((canonical.as_str(), end));
        }
        None
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn normalize(word: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(word.len());
    for part in word.split_ascii_whitespace() {
        if !out.is_empty() {
            out.push(b' ');
        }
        out.extend_from_slice(part.as_bytes());
    }
    out
}

fn base_class(b: u8, opts: GrammarOptions) -> ByteClass {
    let class = match b {
        b'0'..=b'9' => ByteClass::Digit,
        b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => ByteClass::Letter,
        0x80..=0xff if opts.non_latin_letters_only_in_strings() => ByteClass::OnlyInsideString,
        0x80..=0xff => ByteClass::Letter,
        b'"' | b'\'' | b'`' => ByteClass::Quotation,
        b'(' | b'[' | b'{' | b'.' => ByteClass::Control,
        b')' | b']' | b'}' => ByteClass::ListClosing,
        b',' | b';' => ByteClass::ListSeparator,
        b if is_space(b) || b < 0x20 => ByteClass::Space,
        _ => ByteClass::OnlyInsideString,
    };
    let enabled = match class {
        ByteClass::Letter => opts.letters_enabled(),
        ByteClass::Digit => opts.digits_enabled(),
        ByteClass::Quotation => opts.quotations_enabled(),
        ByteClass::Control => opts.control_enabled(),
        ByteClass::ListClosing | ByteClass::ListSeparator => opts.list_control_enabled(),
        _ => true,
    };
    if enabled {
        class
    } else {
        ByteClass::OnlyInsideString
    }
}

// ── Profile ───────────────────────────────────────────────────────────────────

/// Lexer tables derived from a [`Language`].
#[derive(Debug)]
pub struct Profile {
    classes: Vec<ByteClass>,
    controls: Vec<Option<ControlBlock>>,
    control_count: usize,
}

impl Profile {
    pub fn build(lang: &Language) -> Profile {
        let opts = lang.options();
        let mut classes: Vec<ByteClass> = (0..=255u8).map(|b| base_class(b, opts)).collect();
        let mut controls: Vec<Option<ControlBlock>> = vec![None; 256];
        let mut control_count = 0;

        for (word, canonical) in lang.control_words() {
            let key = normalize(word);
            let Some(&first) = key.first() else {
                warn!(language = lang.name(), "empty control word ignored");
                continue;
            };
            let block = controls[first as usize].get_or_insert_with(ControlBlock::default);
            match block.insert(key, canonical) {
                Some(prev) if prev != canonical => {
                    warn!(
                        language = lang.name(),
                        word,
                        previous = prev.as_str(),
                        canonical,
                        "control word registered twice with different meanings"
                    );
                }
                Some(_) => {}
                None => control_count += 1,
            }
            if classes[first as usize] == ByteClass::OnlyInsideString {
                classes[first as usize] = ByteClass::Operator;
            }
        }

        for glyph in lang.visitor_glyphs() {
            if lang.operator(glyph).is_none() {
                warn!(language = lang.name(), glyph, "operator visitor is not described in the grammar");
            }
        }
        for (glyph, pre) in lang.unary_visitor_glyphs() {
            let described = lang
                .unary(glyph)
                .is_some_and(|u| if pre { u.pre } else { u.post });
            if !described {
                warn!(language = lang.name(), glyph, pre, "unary visitor is not described in the grammar");
            }
        }
        for (from, to) in lang.aliases() {
            if !lang.is_known_glyph(to) {
                warn!(language = lang.name(), alias = from, target = to, "alias refers to an unknown glyph");
            }
        }

        debug!(language = lang.name(), controls = control_count, "built grammar profile");
        Profile {
            classes,
            controls,
            control_count,
        }
    }

    pub fn class(&self, b: u8) -> ByteClass {
        self.classes[b as usize]
    }

    /// Longest control token starting at `pos`: canonical text and end offset.
    pub fn find_control(&self, src: &[u8], pos: usize) -> Option<(&str, usize)> {
        let first = *src.get(pos)?;
        self.controls[first as usize].as_ref()?.find(src, pos)
    }

    pub fn control_count(&self) -> usize {
        self.control_count
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn common() -> std::sync::Arc<Language> {
        Language::common()
    }

    #[test]
    fn longest_match_wins() {
        let lang = common();
        let p = lang.profile();
        assert_eq!(p.find_control(b">>>= 1", 0), Some((">>>=", 4)));
        assert_eq!(p.find_control(b"=== 1", 0), Some(("===", 3)));
        assert_eq!(p.find_control(b"=>x", 0), Some(("=>", 2)));
    }

    #[test]
    fn word_boundary_is_respected() {
        let lang = common();
        let p = lang.profile();
        assert_eq!(p.find_control(b"index", 0), None);
        assert_eq!(p.find_control(b"in x", 0), Some(("IN", 2)));
    }

    #[test]
    fn multi_word_collapses_whitespace() {
        let lang = common();
        let p = lang.profile();
        assert_eq!(p.find_control(b"else   if (", 0), Some(("else if", 9)));
        assert_eq!(p.find_control(b"else\n if(", 0), Some(("else if", 8)));
        assert_eq!(p.find_control(b"not  in V", 0), Some(("NOT IN", 7)));
        assert_eq!(p.find_control(b"else {", 0), Some(("else", 4)));
    }

    #[test]
    fn punctuation_claimed_by_operators() {
        let lang = common();
        let p = lang.profile();
        assert_eq!(p.class(b'+'), ByteClass::Operator);
        assert_eq!(p.class(b'#'), ByteClass::OnlyInsideString);
        assert_eq!(p.class(b'('), ByteClass::Control);
        assert_eq!(p.class(b'}'), ByteClass::ListClosing);
        assert!(p.control_count() > 40);
    }
}
