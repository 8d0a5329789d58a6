//! `RegExp` objects backed by the `regex` crate.
//!
//! A regexp value is an object whose extra slot holds the compiled
//! [`Pattern`] and whose own `lastIndex` field is writable.  Global (`g`)
//! and sticky (`y`) patterns resume from `lastIndex` and update it after
//! each `exec`/`test`; other patterns always search from the start.

use std::rc::Rc;

use regex::{Regex, RegexBuilder};

use super::string::substitution;
use super::{arg, constructor, getter, method};
use crate::engine::Prototypes;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::value::{Extra, Obj, Value};

const FLAGS: &str = "dgimsuy";

#[derive(Debug)]
pub struct Pattern {
    regex: Regex,
    source: String,
    flags: String,
}

impl Pattern {
    pub fn compile(source: &str, flags: &str) -> ScriptResult<Pattern> {
        let mut seen = String::new();
        for f in flags.chars() {
            if !FLAGS.contains(f) || seen.contains(f) {
                return Err(ScriptError::syntax(format!(
                    "Invalid flags supplied to RegExp constructor '{flags}'"
                )));
            }
            seen.push(f);
        }
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| ScriptError::syntax(format!("Invalid regular expression: /{source}/: {e}")))?;
        let mut sorted: Vec<char> = flags.chars().collect();
        sorted.sort_unstable();
        Ok(Pattern {
            regex,
            source: source.to_string(),
            flags: sorted.into_iter().collect(),
        })
    }

    pub fn has(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    fn tracks_last_index(&self) -> bool {
        self.has('g') || self.has('y')
    }
}

/// A successful match, with positions in chars.
struct Found {
    start: usize,
    end: usize,
    matched: String,
    groups: Vec<Option<String>>,
}

pub fn install(globals: &Obj, protos: &Prototypes) {
    let proto = &protos.regexp;
    method(proto, "test", test);
    method(proto, "exec", exec);
    method(proto, "toString", to_string);
    getter(proto, "source", source);
    getter(proto, "flags", flags);
    getter(proto, "global", |_, this, _| flag(this, 'g'));
    getter(proto, "ignoreCase", |_, this, _| flag(this, 'i'));
    getter(proto, "multiline", |_, this, _| flag(this, 'm'));
    getter(proto, "dotAll", |_, this, _| flag(this, 's'));
    getter(proto, "unicode", |_, this, _| flag(this, 'u'));
    getter(proto, "sticky", |_, this, _| flag(this, 'y'));
    getter(proto, "hasIndices", |_, this, _| flag(this, 'd'));
    constructor(globals, "RegExp", construct, proto);
}

pub fn is_regexp(o: &Obj) -> bool {
    o.opaque::<Pattern>().is_some()
}

pub fn is_global(o: &Obj) -> bool {
    o.opaque::<Pattern>().is_some_and(|p| p.has('g'))
}

/// A fresh regexp value.
pub fn new_regexp(source: &str, flags: &str) -> ScriptResult<Value> {
    let pattern = Pattern::compile(source, flags)?;
    let obj = Obj::object().with_extra(Extra::Opaque(Rc::new(pattern)));
    obj.set_named("lastIndex", Value::Int(0));
    Ok(Value::Structured(obj))
}

fn this_pattern(this: &Value) -> ScriptResult<(Obj, Rc<Pattern>)> {
    this.as_obj()
        .and_then(|o| o.opaque::<Pattern>().map(|p| (o.clone(), p)))
        .ok_or_else(|| ScriptError::type_error(format!("{} is not a RegExp", this.to_js_string())))
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b)
}

fn byte_to_char(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

/// Run one match honouring `lastIndex` for global and sticky patterns.
fn run_match(obj: &Obj, pattern: &Pattern, s: &str) -> Option<Found> {
    let tracks = pattern.tracks_last_index();
    let start = if tracks {
        obj.get_named("lastIndex").map_or(0, |v| v.to_integer())
    } else {
        0
    };
    let reset = || {
        if tracks {
            obj.set_named("lastIndex", Value::Int(0));
        }
    };
    let Ok(start) = usize::try_from(start) else {
        reset();
        return None;
    };
    if start > s.chars().count() {
        reset();
        return None;
    }
    let from = char_to_byte(s, start);
    let caps = pattern
        .regex
        .captures_at(s, from)
        .filter(|c| !pattern.has('y') || c.get(0).is_some_and(|m| m.start() == from));
    let Some(caps) = caps else {
        reset();
        return None;
    };
    let whole = caps.get(0)?;
    let found = Found {
        start: byte_to_char(s, whole.start()),
        end: byte_to_char(s, whole.end()),
        matched: whole.as_str().to_string(),
        groups: caps
            .iter()
            .skip(1)
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect(),
    };
    if tracks {
        obj.set_named("lastIndex", Value::from(found.end));
    }
    Some(found)
}

// ── Constructor and accessors ─────────────────────────────────────────────────

fn construct(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let (source, inherited) = match arg(args, 0) {
        Value::Structured(o) if is_regexp(&o) => {
            let p = o.opaque::<Pattern>();
            (
                p.as_ref().map(|p| p.source.clone()).unwrap_or_default(),
                p.map(|p| p.flags.clone()).unwrap_or_default(),
            )
        }
        Value::Undefined => ("(?:)".to_string(), String::new()),
        v => (v.to_js_string(), String::new()),
    };
    let flags = match arg(args, 1) {
        Value::Undefined => inherited,
        v => v.to_js_string(),
    };
    new_regexp(&source, &flags)
}

fn flag(this: &Value, f: char) -> ScriptResult<Value> {
    Ok(Value::Bool(this_pattern(this)?.1.has(f)))
}

fn source(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_pattern(this)?.1.source.as_str()))
}

fn flags(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this_pattern(this)?.1.flags.as_str()))
}

fn to_string(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let (_, p) = this_pattern(this)?;
    Ok(Value::from(format!("/{}/{}", p.source, p.flags)))
}

// ── Matching ──────────────────────────────────────────────────────────────────

fn test(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let (obj, p) = this_pattern(this)?;
    Ok(Value::Bool(run_match(&obj, &p, &arg(args, 0).to_js_string()).is_some()))
}

/// The match and its groups as an array, or `null`.
fn exec(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let (obj, p) = this_pattern(this)?;
    let Some(found) = run_match(&obj, &p, &arg(args, 0).to_js_string()) else {
        return Ok(Value::Null);
    };
    let mut items = vec![Value::from(found.matched)];
    items.extend(
        found
            .groups
            .into_iter()
            .map(|g| g.map_or(Value::Undefined, Value::from)),
    );
    Ok(Value::array(items))
}

/// `String.prototype.split` with a regexp separator.
pub fn split(obj: &Obj, s: &str) -> Vec<String> {
    match obj.opaque::<Pattern>() {
        Some(p) => p.regex.split(s).map(String::from).collect(),
        None => vec![s.to_string()],
    }
}

/// `String.prototype.replace` / `replaceAll` with a regexp pattern.
pub fn replace(it: &mut Interp<'_>, obj: &Obj, s: &str, replacement: &Value, all: bool) -> ScriptResult<String> {
    let Some(p) = obj.opaque::<Pattern>() else {
        return Ok(s.to_string());
    };
    let all = all || p.has('g');
    let mut matches: Vec<(usize, usize, Found)> = Vec::new();
    for caps in p.regex.captures_iter(s) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let found = Found {
            start: byte_to_char(s, whole.start()),
            end: byte_to_char(s, whole.end()),
            matched: whole.as_str().to_string(),
            groups: caps.iter().skip(1).map(|g| g.map(|m| m.as_str().to_string())).collect(),
        };
        matches.push((whole.start(), whole.end(), found));
        if !all {
            break;
        }
    }
    if p.has('g') {
        obj.set_named("lastIndex", Value::Int(0));
    }
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for (from, to, found) in matches {
        out.push_str(&s[last..from]);
        out.push_str(&substitution(it, replacement, &found.matched, &found.groups, found.start, s)?);
        last = to;
    }
    out.push_str(&s[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn flags_are_validated_and_sorted() {
        assert_eq!(Pattern::compile("a", "gi").map(|p| p.flags).unwrap(), "gi");
        assert_eq!(Pattern::compile("a", "yg").map(|p| p.flags).unwrap(), "gy");
        assert!(Pattern::compile("a", "gg").is_err());
        assert!(Pattern::compile("a", "q").is_err());
        assert!(Pattern::compile("(", "").is_err());
    }

    #[test]
    fn accessors() {
        assert_eq!(run("r = RegExp('a+', 'gi'); r.source + '/' + r.flags"), "a+/gi");
        assert_eq!(run("RegExp('x', 'm').multiline"), "true");
        assert_eq!(run("RegExp('x').global"), "false");
        assert_eq!(run("RegExp('x', 'g').toString()"), "/x/g");
    }

    #[test]
    fn global_test_advances_last_index() {
        assert_eq!(run("r = RegExp('o', 'g'); r.test('foo'); r.lastIndex"), "2");
        assert_eq!(run("r = RegExp('o', 'g'); r.test('foo'); r.test('foo'); r.test('foo')"), "false");
        assert_eq!(run("r = RegExp('o', 'g'); r.test('foo'); r.test('foo'); r.test('foo'); r.lastIndex"), "0");
        assert_eq!(run("r = RegExp('o'); r.test('foo'); r.lastIndex"), "0");
    }

    #[test]
    fn sticky_requires_match_at_last_index() {
        assert_eq!(run("r = RegExp('b', 'y'); r.test('ab')"), "false");
        assert_eq!(run("r = RegExp('b', 'y'); r.lastIndex = 1; r.test('ab')"), "true");
    }

    #[test]
    fn exec_returns_groups() {
        assert_eq!(run("RegExp('(\\\\d+)-(\\\\d+)').exec('10-20')[2]"), "20");
        assert_eq!(run("RegExp('z').exec('abc')"), "null");
    }

    #[test]
    fn string_integration() {
        assert_eq!(run("'a1b22c'.replace(RegExp('\\\\d+', 'g'), '#')"), "a#b#c");
        assert_eq!(run("'a1b22c'.replace(RegExp('\\\\d+'), '#')"), "a#b22c");
        assert_eq!(run("'John Smith'.replace(RegExp('(\\\\w+) (\\\\w+)'), '$2 $1')"), "Smith John");
        assert_eq!(run("'a, b,c'.split(RegExp(',\\\\s*')).length"), "3");
    }
}
