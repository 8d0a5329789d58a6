//! Table-driven lexer.
//!
//! Each input byte selects a recognizer through the language profile's
//! [`ByteClass`] table.  Before any recognizer runs, the control tables are
//! consulted for the longest operator, keyword or alias starting at the
//! current byte.  Rows and columns are 1-based; columns count characters,
//! not bytes.

use std::rc::Rc;

use tracing::trace;

use crate::error::{ScriptError, ScriptResult};
use crate::grammar::{ByteClass, Language, Profile};
use crate::options::GrammarOptions;
use crate::token::{Token, TokenKind};

/// Split `src` into tokens according to `language`.
pub fn tokenize(src: &[u8], place: &str, language: &Language) -> ScriptResult<Vec<Token>> {
    let mut lexer = Lexer::new(src, place, language);
    lexer.run()?;
    trace!(place, tokens = lexer.tokens.len(), "tokenized");
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    row: u32,
    col: u32,
    place: Rc<str>,
    profile: &'a Profile,
    options: GrammarOptions,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a [u8], place: &str, language: &'a Language) -> Self {
        Lexer {
            src,
            pos: 0,
            row: 1,
            col: 1,
            place: Rc::from(place),
            profile: language.profile(),
            options: language.options(),
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        match b {
            b'\n' => {
                self.row += 1;
                self.col = 1;
            }
            b'\r' if self.peek() != Some(b'\n') => {
                self.row += 1;
                self.col = 1;
            }
            b'\r' => {}
            // UTF-8 continuation bytes belong to the previous character.
            b if b & 0xC0 == 0x80 => {}
            _ => self.col += 1,
        }
        Some(b)
    }

    fn advance_to(&mut self, end: usize) {
        while self.pos < end {
            self.advance();
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn token(&self, kind: TokenKind, text: &str, row: u32, col: u32) -> Token {
        Token::new(kind, text, row, col, Rc::clone(&self.place))
    }

    fn push(&mut self, kind: TokenKind, text: &str, row: u32, col: u32) {
        let tok = self.token(kind, text, row, col);
        self.tokens.push(tok);
    }

    fn error(&self, e: ScriptError, text: &str, row: u32, col: u32) -> ScriptError {
        e.at(&self.token(TokenKind::Control, text, row, col))
    }

    /// The previous token is a member dot following an operand.
    fn after_member_dot(&self) -> bool {
        let n = self.tokens.len();
        n >= 2 && self.tokens[n - 1].is_control(".") && self.tokens[n - 2].ends_value()
    }

    fn run(&mut self) -> ScriptResult<()> {
        let profile = self.profile;
        while let Some(b) = self.peek() {
            let class = profile.class(b);
            if class == ByteClass::Space {
                self.advance();
                continue;
            }
            let (row, col) = (self.row, self.col);

            // Member names stay names: `x.delete`, `it.done`.
            let member_name = self.after_member_dot() && class == ByteClass::Letter;
            if !member_name {
                if let Some((canonical, end)) = profile.find_control(self.src, self.pos) {
                    self.advance_to(end);
                    self.push(TokenKind::Operator, canonical, row, col);
                    continue;
                }
            }

            match class {
                ByteClass::Letter => self.read_word(row, col),
                ByteClass::Digit => self.read_number(row, col)?,
                ByteClass::Quotation => self.read_quoted(b, row, col)?,
                ByteClass::Control => self.read_control(b, row, col)?,
                ByteClass::ListClosing | ByteClass::ListSeparator => {
                    self.advance();
                    self.push(TokenKind::Control, &(b as char).to_string(), row, col);
                }
                ByteClass::Operator | ByteClass::OnlyInsideString | ByteClass::Space => {
                    let shown = self.char_at_pos();
                    return Err(self.error(
                        ScriptError::lexical(format!("Unexpected character '{shown}'")),
                        &shown,
                        row,
                        col,
                    ));
                }
            }
        }
        Ok(())
    }

    fn char_at_pos(&self) -> String {
        let end = (self.pos + 4).min(self.src.len());
        let chunk = String::from_utf8_lossy(&self.src[self.pos..end]);
        chunk.chars().next().map(String::from).unwrap_or_default()
    }

    // ── Recognizers ───────────────────────────────────────────────────────────

    fn read_word(&mut self, row: u32, col: u32) {
        let start = self.pos;
        while let Some(b) = self.peek() {
            match self.profile.class(b) {
                ByteClass::Letter | ByteClass::Digit => {
                    self.advance();
                }
                _ => break,
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let kind = match text.as_str() {
            "true" | "false" => TokenKind::Bool,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "NaN" => TokenKind::NaN,
            _ => TokenKind::Data,
        };
        self.push(kind, &text, row, col);
    }

    fn read_digits(&mut self, out: &mut String) {
        while let Some(b @ b'0'..=b'9') = self.peek() {
            out.push(b as char);
            self.advance();
        }
    }

    fn read_number(&mut self, row: u32, col: u32) -> ScriptResult<()> {
        let mut s = String::new();

        // `D.0.3` reads as two integer member keys, not a float.
        if self.after_member_dot() {
            self.read_digits(&mut s);
            return self.finish_int(s, row, col);
        }

        if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'x' | b'X')) {
            self.advance();
            self.advance();
            let mut hex = String::new();
            while let Some(b) = self.peek().filter(u8::is_ascii_hexdigit) {
                hex.push(b as char);
                self.advance();
            }
            let value = i64::from_str_radix(&hex, 16).map_err(|_| {
                self.error(
                    ScriptError::lexical("Invalid hexadecimal literal"),
                    &format!("0x{hex}"),
                    row,
                    col,
                )
            })?;
            self.check_number_end(&format!("0x{hex}"), row, col)?;
            self.push(TokenKind::Int, &value.to_string(), row, col);
            return Ok(());
        }

        let mut is_float = false;
        self.read_digits(&mut s);
        if self.peek() == Some(b'.') && matches!(self.peek2(), Some(b'0'..=b'9')) {
            is_float = true;
            s.push('.');
            self.advance();
            self.read_digits(&mut s);
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = matches!(self.peek2(), Some(b'+' | b'-'));
            let digit_at = if sign { self.pos + 2 } else { self.pos + 1 };
            if matches!(self.src.get(digit_at), Some(b'0'..=b'9')) {
                is_float = true;
                s.push('e');
                self.advance();
                if sign {
                    if let Some(b) = self.advance() {
                        s.push(b as char);
                    }
                }
                self.read_digits(&mut s);
            }
        }
        self.check_number_end(&s, row, col)?;

        if is_float {
            self.push(TokenKind::Number, &s, row, col);
            Ok(())
        } else {
            self.finish_int(s, row, col)
        }
    }

    fn finish_int(&mut self, s: String, row: u32, col: u32) -> ScriptResult<()> {
        // Integers too wide for i64 degrade to floating point.
        let kind = if s.parse::<i64>().is_ok() {
            TokenKind::Int
        } else {
            TokenKind::Number
        };
        self.push(kind, &s, row, col);
        Ok(())
    }

    fn check_number_end(&self, text: &str, row: u32, col: u32) -> ScriptResult<()> {
        match self.peek() {
            Some(b) if self.profile.class(b) == ByteClass::Letter => Err(self.error(
                ScriptError::lexical(format!("Invalid number literal {text}{}", b as char)),
                text,
                row,
                col,
            )),
            _ => Ok(()),
        }
    }

    fn read_control(&mut self, b: u8, row: u32, col: u32) -> ScriptResult<()> {
        if b == b'.'
            && matches!(self.peek2(), Some(b'0'..=b'9'))
            && !self.tokens.last().is_some_and(Token::ends_value)
        {
            // `.5`
            let mut s = String::from("0.");
            self.advance();
            self.read_digits(&mut s);
            self.check_number_end(&s, row, col)?;
            self.push(TokenKind::Number, &s, row, col);
            return Ok(());
        }
        self.advance();
        self.push(TokenKind::Control, &(b as char).to_string(), row, col);
        Ok(())
    }

    fn read_quoted(&mut self, quote: u8, row: u32, col: u32) -> ScriptResult<()> {
        if quote == b'`' {
            return self.read_fenced(row, col);
        }
        self.advance();
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.advance() else {
                let shown = (quote as char).to_string();
                return Err(self.error(ScriptError::lexical("Unterminated string"), &shown, row, col));
            };
            match b {
                b if b == quote => break,
                b'\n' => {
                    let shown = (quote as char).to_string();
                    return Err(self.error(ScriptError::lexical("Unterminated string"), &shown, row, col));
                }
                b'\\' => self.read_escape(&mut buf, row, col)?,
                b => buf.push(b),
            }
        }
        let text = String::from_utf8_lossy(&buf).into_owned();
        let kind = if quote == b'\'' && self.options.single_quote_is_char() {
            TokenKind::Char
        } else {
            TokenKind::Str
        };
        self.push(kind, &text, row, col);
        Ok(())
    }

    /// A raw string between fences of one to three back-ticks.
    ///
    /// The closing fence is the first run of exactly as many back-ticks as
    /// opened it; shorter runs are content.  Nothing inside is unescaped.
    fn read_fenced(&mut self, row: u32, col: u32) -> ScriptResult<()> {
        let start = self.pos;
        let fence = self.src[start..].iter().take(3).take_while(|&&b| b == b'`').count();
        let body = start + fence;
        let close = find_fence(&self.src[body..], fence)
            .map(|at| (body + at, fence))
            // "``" with nothing to close it is an empty single-fence string.
            .or_else(|| (fence == 2).then_some((start + 1, 1)));
        let Some((end, width)) = close else {
            self.advance_to(self.src.len());
            return Err(self.error(ScriptError::lexical("Unterminated string"), "`", row, col));
        };
        let text = String::from_utf8_lossy(&self.src[start + width..end]).into_owned();
        self.advance_to(end + width);
        self.push(TokenKind::Str, &text, row, col);
        Ok(())
    }

    fn read_escape(&mut self, buf: &mut Vec<u8>, row: u32, col: u32) -> ScriptResult<()> {
        let Some(e) = self.advance() else {
            return Err(self.error(ScriptError::lexical("Unterminated string"), "\\", row, col));
        };
        let ch = match e {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'v' => '\u{b}',
            b'0' => '\0',
            b'x' => self.read_hex_escape(2, row, col)?,
            b'u' if self.eat(b'{') => self.read_braced_escape(row, col)?,
            b'u' => self.read_hex_escape(4, row, col)?,
            // Line continuation.
            b'\n' => return Ok(()),
            other => {
                buf.push(other);
                return Ok(());
            }
        };
        let mut tmp = [0u8; 4];
        buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
        Ok(())
    }

    fn read_hex_escape(&mut self, digits: usize, row: u32, col: u32) -> ScriptResult<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let Some(d) = self.peek().and_then(|b| (b as char).to_digit(16)) else {
                return Err(self.error(ScriptError::lexical("Invalid escape sequence"), "\\", row, col));
            };
            self.advance();
            code = code * 16 + d;
        }
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn read_braced_escape(&mut self, row: u32, col: u32) -> ScriptResult<char> {
        let mut code = 0u32;
        let mut seen = 0;
        while let Some(b) = self.advance() {
            if b == b'}' {
                break;
            }
            let Some(d) = (b as char).to_digit(16).filter(|_| seen < 6) else {
                return Err(self.error(ScriptError::lexical("Invalid escape sequence"), "\\u", row, col));
            };
            code = code * 16 + d;
            seen += 1;
        }
        if seen == 0 {
            return Err(self.error(ScriptError::lexical("Invalid escape sequence"), "\\u", row, col));
        }
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Offset of the first run of exactly `width` back-ticks in `src`.
fn find_fence(src: &[u8], width: usize) -> Option<usize> {
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'`' {
            i += 1;
            continue;
        }
        let run = src[i..].iter().take_while(|&&b| b == b'`').count();
        if run == width {
            return Some(i);
        }
        i += run;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn lex(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src.as_bytes(), "test", &Language::common())
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    fn texts(src: &str) -> Vec<String> {
        lex(src).into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn operators_and_literals() {
        use TokenKind::*;
        assert_eq!(
            lex("x >>>= 0x1F + 2.5e1"),
            vec![
                (Data, "x".into()),
                (Operator, ">>>=".into()),
                (Int, "31".into()),
                (Operator, "+".into()),
                (Number, "2.5e1".into()),
            ]
        );
    }

    #[test]
    fn reserved_literals_get_their_kinds() {
        use TokenKind::*;
        let kinds: Vec<_> = lex("true null undefined NaN Infinity").into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![Bool, Null, Undefined, NaN, Data]);
    }

    #[test]
    fn member_digits_stay_integers() {
        assert_eq!(texts("D.0.3"), vec!["D", ".", "0", ".", "3"]);
        assert_eq!(texts("x = .5"), vec!["x", "=", "0.5"]);
        assert_eq!(texts("1.5.toFixed"), vec!["1.5", ".", "toFixed"]);
    }

    #[test]
    fn member_names_are_not_keywords() {
        use TokenKind::*;
        assert_eq!(lex("it.done")[2], (Data, "done".into()));
        assert_eq!(lex("o.delete")[2], (Data, "delete".into()));
        assert_eq!(lex("delete o")[0], (Operator, "delete".into()));
    }

    #[test]
    fn aliases_canonicalize() {
        assert_eq!(texts("'a' in V"), vec!["a", "IN", "V"]);
        assert_eq!(texts("'a' not in V"), vec!["a", "NOT IN", "V"]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(texts(r#""a\tbA\x42\u{1F600}""#), vec!["a\tbAB\u{1F600}"]);
        assert_eq!(texts(r"'it\'s'"), vec!["it's"]);
    }

    #[test]
    fn back_tick_fences() {
        for (src, want) in [
            ("`plain`", "plain"),
            ("``a`b``", "a`b"),
            ("```x``y`z```", "x``y`z"),
            ("`a\\nb`", "a\\nb"),
            ("`two\nlines`", "two\nlines"),
            ("``", ""),
        ] {
            assert_eq!(texts(src), vec![want], "{src}");
        }
        assert_eq!(texts("``a`` + `b`"), vec!["a", "+", "b"]);
    }

    #[test]
    fn unclosed_fence_is_lexical() {
        let lang = Language::common();
        for src in ["`abc", "``a`", "```a``"] {
            let e = tokenize(src.as_bytes(), "p", &lang).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Lexical, "{src}");
            assert_eq!(e.message(), "Unterminated string");
        }
    }

    #[test]
    fn positions_count_characters() {
        let toks = tokenize("'жж' +\r\n  x".as_bytes(), "p", &Language::common()).unwrap();
        assert_eq!((toks[1].row, toks[1].col), (1, 6));
        assert_eq!((toks[2].row, toks[2].col), (2, 3));
    }

    #[test]
    fn errors() {
        let lang = Language::common();
        let e = tokenize(b"'abc", "p", &lang).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Lexical);
        assert!(e.to_string().starts_with("Unterminated string"));
        let e = tokenize(b"a # b", "p", &lang).unwrap_err();
        assert!(e.to_string().starts_with("Unexpected character '#' at # in p (1:3)"));
        let e = tokenize(b"3abc", "p", &lang).unwrap_err();
        assert!(e.to_string().starts_with("Invalid number literal"));
    }
}
