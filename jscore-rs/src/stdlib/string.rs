//! `String` constructor and `String.prototype`.
//!
//! Positions count Unicode scalar values, not bytes or UTF-16 units.

use std::cmp::Ordering;

use super::{arg, constructor, getter, method, relative_index};
use crate::engine::Prototypes;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::stdlib::regexp;
use crate::value::{Obj, Value};

const MAX_STRING_LEN: usize = 1 << 28;

pub fn install(globals: &Obj, protos: &Prototypes) {
    let proto = &protos.string;
    getter(proto, "length", length);
    method(proto, "charAt", char_at);
    method(proto, "charCodeAt", char_code_at);
    method(proto, "codePointAt", code_point_at);
    method(proto, "concat", concat);
    method(proto, "endsWith", ends_with);
    method(proto, "startsWith", starts_with);
    method(proto, "includes", includes);
    method(proto, "indexOf", index_of);
    method(proto, "lastIndexOf", last_index_of);
    method(proto, "localeCompare", locale_compare);
    method(proto, "split", split);
    method(proto, "slice", slice);
    method(proto, "substring", substring);
    method(proto, "substr", substr);
    method(proto, "toUpperCase", to_upper_case);
    method(proto, "toLowerCase", to_lower_case);
    method(proto, "trim", trim);
    method(proto, "trimStart", trim_start);
    method(proto, "trimEnd", trim_end);
    method(proto, "padStart", pad_start);
    method(proto, "padEnd", pad_end);
    method(proto, "repeat", repeat);
    method(proto, "replace", replace);
    method(proto, "replaceAll", replace_all);
    method(proto, "at", at);
    method(proto, "toString", to_string);
    method(proto, "valueOf", to_string);

    let ctor = constructor(globals, "String", construct, proto);
    method(&ctor, "fromCharCode", from_char_code);
    method(&ctor, "fromCodePoint", from_code_point);
}

fn chars(this: &Value) -> Vec<char> {
    this.to_js_string().chars().collect()
}

fn text(chars: &[char]) -> Value {
    Value::from(chars.iter().collect::<String>())
}

/// Char position of `needle` in `hay` at or after `from`.
fn find_from(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(hay.len()));
    }
    (from..=hay.len().saturating_sub(needle.len()))
        .find(|&i| hay.get(i..i + needle.len()) == Some(needle))
}

fn position(v: &Value, len: usize) -> usize {
    v.to_integer().clamp(0, len as i64) as usize
}

// ── Constructor ───────────────────────────────────────────────────────────────

fn construct(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(match args.first() {
        None => Value::from(""),
        Some(v) => Value::from(v.to_js_string()),
    })
}

fn from_char_code(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s: String = args
        .iter()
        .map(|v| char::from_u32(v.to_integer() as u32 & 0xFFFF).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    Ok(Value::from(s))
}

fn from_code_point(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut s = String::new();
    for v in args {
        let n = v.to_number();
        let c = (n.fract() == 0.0 && (0.0..=1_114_111.0).contains(&n))
            .then(|| char::from_u32(n as u32))
            .flatten()
            .ok_or_else(|| ScriptError::range(format!("Invalid code point {}", v.to_js_string())))?;
        s.push(c);
    }
    Ok(Value::from(s))
}

// ── Access ────────────────────────────────────────────────────────────────────

fn length(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string().chars().count()))
}

fn char_at(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let i = arg(args, 0).to_integer();
    Ok(Value::from(
        usize::try_from(i).ok().and_then(|i| c.get(i)).map(char::to_string).unwrap_or_default(),
    ))
}

fn char_code_at(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let i = arg(args, 0).to_integer();
    Ok(usize::try_from(i)
        .ok()
        .and_then(|i| c.get(i))
        .map_or(Value::NaN, |&ch| Value::Int(i64::from(u32::from(ch)))))
}

fn code_point_at(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let i = arg(args, 0).to_integer();
    Ok(usize::try_from(i)
        .ok()
        .and_then(|i| c.get(i))
        .map_or(Value::Undefined, |&ch| Value::Int(i64::from(u32::from(ch)))))
}

fn at(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let i = arg(args, 0).to_integer();
    let i = if i < 0 { c.len() as i64 + i } else { i };
    Ok(usize::try_from(i)
        .ok()
        .and_then(|i| c.get(i))
        .map_or(Value::Undefined, |ch| Value::from(ch.to_string())))
}

fn to_string(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string()))
}

// ── Search ────────────────────────────────────────────────────────────────────

fn index_of(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let hay = chars(this);
    let needle: Vec<char> = arg(args, 0).to_js_string().chars().collect();
    let from = position(&arg(args, 1), hay.len());
    Ok(find_from(&hay, &needle, from).map_or(Value::Int(-1), Value::from))
}

fn last_index_of(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let hay = chars(this);
    let needle: Vec<char> = arg(args, 0).to_js_string().chars().collect();
    let until = match arg(args, 1) {
        Value::Undefined => hay.len(),
        v => position(&v, hay.len()),
    };
    if needle.len() > hay.len() {
        return Ok(Value::Int(-1));
    }
    let last_start = until.min(hay.len() - needle.len());
    let found = (0..=last_start).rev().find(|&i| hay[i..i + needle.len()] == needle[..]);
    Ok(found.map_or(Value::Int(-1), Value::from))
}

fn includes(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let hay = chars(this);
    let needle: Vec<char> = arg(args, 0).to_js_string().chars().collect();
    let from = position(&arg(args, 1), hay.len());
    Ok(Value::Bool(find_from(&hay, &needle, from).is_some()))
}

fn starts_with(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let hay = chars(this);
    let needle: Vec<char> = arg(args, 0).to_js_string().chars().collect();
    let from = position(&arg(args, 1), hay.len());
    Ok(Value::Bool(hay[from..].starts_with(&needle)))
}

fn ends_with(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let hay = chars(this);
    let needle: Vec<char> = arg(args, 0).to_js_string().chars().collect();
    let end = match arg(args, 1) {
        Value::Undefined => hay.len(),
        v => position(&v, hay.len()),
    };
    Ok(Value::Bool(hay[..end].ends_with(&needle)))
}

fn locale_compare(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let ord = this.to_js_string().cmp(&arg(args, 0).to_js_string());
    Ok(Value::Int(match ord {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

// ── Extraction ────────────────────────────────────────────────────────────────

fn slice(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let start = relative_index(&arg(args, 0), c.len(), 0);
    let end = relative_index(&arg(args, 1), c.len(), c.len());
    Ok(text(c.get(start..end.max(start)).unwrap_or_default()))
}

fn substring(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let a = position(&arg(args, 0), c.len());
    let b = match arg(args, 1) {
        Value::Undefined => c.len(),
        v => position(&v, c.len()),
    };
    Ok(text(&c[a.min(b)..a.max(b)]))
}

fn substr(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let c = chars(this);
    let start = relative_index(&arg(args, 0), c.len(), 0);
    let count = match arg(args, 1) {
        Value::Undefined => c.len() - start,
        v => position(&v, c.len() - start),
    };
    Ok(text(&c[start..start + count]))
}

fn concat(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut s = this.to_js_string();
    for v in args {
        s.push_str(&v.to_js_string());
    }
    Ok(Value::from(s))
}

fn split(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this.to_js_string();
    let limit = match arg(args, 1) {
        Value::Undefined => usize::MAX,
        v => v.to_integer().max(0) as usize,
    };
    let parts: Vec<String> = match arg(args, 0) {
        Value::Undefined => vec![s],
        Value::Structured(o) if regexp::is_regexp(&o) => regexp::split(&o, &s),
        sep => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(String::from).collect()
            } else {
                s.split(sep.as_str()).map(String::from).collect()
            }
        }
    };
    Ok(Value::array(parts.into_iter().take(limit).map(Value::from).collect()))
}

// ── Transformation ────────────────────────────────────────────────────────────

fn to_upper_case(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string().to_uppercase()))
}

fn to_lower_case(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string().to_lowercase()))
}

fn trim(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string().trim()))
}

fn trim_start(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string().trim_start()))
}

fn trim_end(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.to_js_string().trim_end()))
}

/// Filler of `width - len` chars cycled from `fill`.
fn padding(len: usize, args: &[Value]) -> ScriptResult<String> {
    let width = arg(args, 0).to_integer().max(0) as usize;
    if width > MAX_STRING_LEN {
        return Err(ScriptError::range("Invalid string length"));
    }
    let fill = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        v => v.to_js_string(),
    };
    if width <= len || fill.is_empty() {
        return Ok(String::new());
    }
    Ok(fill.chars().cycle().take(width - len).collect())
}

fn pad_start(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this.to_js_string();
    let pad = padding(s.chars().count(), args)?;
    Ok(Value::from(pad + &s))
}

fn pad_end(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this.to_js_string();
    let pad = padding(s.chars().count(), args)?;
    Ok(Value::from(s + &pad))
}

fn repeat(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let s = this.to_js_string();
    let n = arg(args, 0).to_number();
    if n < 0.0 || n.is_infinite() || s.len() as f64 * n > MAX_STRING_LEN as f64 {
        return Err(ScriptError::range(format!("Invalid count value: {}", arg(args, 0).to_js_string())));
    }
    Ok(Value::from(s.repeat(if n.is_nan() { 0 } else { n as usize })))
}

/// Text substituted for one match: a callback result or the replacement
/// pattern with `$$`, `$&` and `$n` expanded.
pub(crate) fn substitution(
    it: &mut Interp<'_>,
    replacement: &Value,
    matched: &str,
    groups: &[Option<String>],
    offset: usize,
    whole: &str,
) -> ScriptResult<String> {
    if replacement.callable().is_some() {
        let mut args = vec![Value::from(matched)];
        args.extend(groups.iter().map(|g| g.as_deref().map_or(Value::Undefined, Value::from)));
        args.push(Value::from(offset));
        args.push(Value::from(whole));
        return Ok(it.call(replacement, Value::Undefined, args)?.to_js_string());
    }
    let pattern = replacement.to_js_string();
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern.chars().peekable();
    while let Some(c) = rest.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match rest.peek().copied() {
            Some('$') => {
                rest.next();
                out.push('$');
            }
            Some('&') => {
                rest.next();
                out.push_str(matched);
            }
            Some(d) if d.is_ascii_digit() && d != '0' => {
                rest.next();
                let n = d as usize - '0' as usize;
                match groups.get(n - 1) {
                    Some(g) => out.push_str(g.as_deref().unwrap_or("")),
                    None => {
                        out.push('$');
                        out.push(d);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    Ok(out)
}

fn replace_impl(it: &mut Interp<'_>, this: &Value, args: &[Value], all: bool) -> ScriptResult<Value> {
    let s = this.to_js_string();
    let replacement = arg(args, 1);
    if let Value::Structured(o) = arg(args, 0) {
        if regexp::is_regexp(&o) {
            return regexp::replace(it, &o, &s, &replacement, all).map(Value::from);
        }
    }
    let needle = arg(args, 0).to_js_string();
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut search = 0;
    while let Some(found) = s.get(search..).and_then(|tail| tail.find(&needle)) {
        let at = search + found;
        out.push_str(&s[last..at]);
        let offset = s[..at].chars().count();
        out.push_str(&substitution(it, &replacement, &needle, &[], offset, &s)?);
        last = at + needle.len();
        if !all {
            break;
        }
        search = if needle.is_empty() {
            match s[last..].chars().next() {
                Some(c) => {
                    out.push(c);
                    last += c.len_utf8();
                    last
                }
                None => break,
            }
        } else {
            last
        };
    }
    out.push_str(&s[last..]);
    Ok(Value::from(out))
}

fn replace(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    replace_impl(it, this, args, false)
}

fn replace_all(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    if let Value::Structured(o) = arg(args, 0) {
        if regexp::is_regexp(&o) && !regexp::is_global(&o) {
            return Err(ScriptError::type_error("replaceAll must be called with a global RegExp"));
        }
    }
    replace_impl(it, this, args, true)
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn length_and_access() {
        assert_eq!(run("'héllo'.length"), "5");
        assert_eq!(run("'abc'.charAt(1)"), "b");
        assert_eq!(run("'abc'.charCodeAt(0)"), "97");
        assert_eq!(run("'abc'.at(-1)"), "c");
        assert_eq!(run("'abc'[2]"), "c");
    }

    #[test]
    fn searching() {
        assert_eq!(run("'hello'.indexOf('l')"), "2");
        assert_eq!(run("'hello'.lastIndexOf('l')"), "3");
        assert_eq!(run("'hello'.includes('ell')"), "true");
        assert_eq!(run("'hello'.startsWith('he')"), "true");
        assert_eq!(run("'hello'.endsWith('lo')"), "true");
        assert_eq!(run("'a'.localeCompare('b')"), "-1");
    }

    #[test]
    fn extraction() {
        assert_eq!(run("'hello'.slice(1, -1)"), "ell");
        assert_eq!(run("'hello'.substring(3, 1)"), "el");
        assert_eq!(run("'hello'.substr(-3, 2)"), "ll");
        assert_eq!(run("'a,b,c'.split(',')"), "a,b,c");
        assert_eq!(run("'a,b,c'.split(',', 2).length"), "2");
        assert_eq!(run("'abc'.split('').length"), "3");
    }

    #[test]
    fn transformation() {
        assert_eq!(run("'Ab'.toUpperCase() + 'Ab'.toLowerCase()"), "ABab");
        assert_eq!(run("'  x '.trim() + '|'"), "x|");
        assert_eq!(run("'5'.padStart(3, '0')"), "005");
        assert_eq!(run("'5'.padEnd(3, 'ab')"), "5ab");
        assert_eq!(run("'ab'.repeat(3)"), "ababab");
    }

    #[test]
    fn replacing() {
        assert_eq!(run("'a-b-c'.replace('-', '+')"), "a+b-c");
        assert_eq!(run("'a-b-c'.replaceAll('-', '+')"), "a+b+c");
        assert_eq!(run("'abc'.replace('b', '[$&]')"), "a[b]c");
        assert_eq!(run("'abc'.replace('b', m => m.toUpperCase())"), "aBc");
    }

    #[test]
    fn statics() {
        assert_eq!(run("String.fromCharCode(104, 105)"), "hi");
        assert_eq!(run("String.fromCodePoint(128512).length"), "1");
        assert_eq!(run("String(12) + String()"), "12");
    }

    #[test]
    fn repeat_rejects_negative_counts() {
        assert!(Engine::new().eval("'x'.repeat(-1)", &Env::new()).is_err());
    }
}
