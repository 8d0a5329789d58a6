//! `Array` constructor, `Array.prototype` and array iterators.
//!
//! Callbacks receive `(element, index, array)`.  Mutating methods work on a
//! snapshot of the items and write the result back in one step, so a
//! callback that mutates the array mid-iteration sees the original items.

use std::cmp::Ordering;
use std::rc::Rc;

use super::{arg, constructor, getter, method, relative_index};
use crate::engine::Prototypes;
use crate::error::{ScriptError, ScriptResult};
use crate::exec::Interp;
use crate::value::{Extra, Obj, Value};

const MAX_FLAT_DEPTH: i64 = 64;

pub fn install(globals: &Obj, protos: &Prototypes) {
    let proto = &protos.array;
    getter(proto, "length", length);
    method(proto, "push", push);
    method(proto, "pop", pop);
    method(proto, "shift", shift);
    method(proto, "unshift", unshift);
    method(proto, "slice", slice);
    method(proto, "splice", splice);
    method(proto, "concat", concat);
    method(proto, "join", join);
    method(proto, "indexOf", index_of);
    method(proto, "lastIndexOf", last_index_of);
    method(proto, "includes", includes);
    method(proto, "reverse", reverse);
    method(proto, "sort", sort);
    method(proto, "map", map);
    method(proto, "filter", filter);
    method(proto, "forEach", for_each);
    method(proto, "reduce", reduce);
    method(proto, "reduceRight", reduce_right);
    method(proto, "every", every);
    method(proto, "some", some);
    method(proto, "find", find);
    method(proto, "findIndex", find_index);
    method(proto, "findLast", find_last);
    method(proto, "findLastIndex", find_last_index);
    method(proto, "fill", fill);
    method(proto, "flat", flat);
    method(proto, "flatMap", flat_map);
    method(proto, "copyWithin", copy_within);
    method(proto, "keys", keys);
    method(proto, "values", values);
    method(proto, "entries", entries);
    method(proto, "toString", to_string);
    method(proto, "toLocaleString", to_string);
    method(proto, "at", at);

    method(&protos.iterator, "next", next);
    getter(&protos.iterator, "length", length);

    let ctor = constructor(globals, "Array", construct, proto);
    method(&ctor, "isArray", is_array);
    method(&ctor, "from", from);
    method(&ctor, "of", of);
}

/// The receiver as an array.
fn this_array(this: &Value, name: &str) -> ScriptResult<Obj> {
    match this {
        Value::Structured(o) if o.is_array() => Ok(o.clone()),
        other => Err(ScriptError::type_error(format!(
            "Array.prototype.{name} called on {}",
            other.type_name()
        ))),
    }
}

fn callback(args: &[Value], name: &str) -> ScriptResult<Value> {
    let f = arg(args, 0);
    if f.callable().is_none() {
        return Err(ScriptError::type_error(format!(
            "{} is not a function in Array.prototype.{name}",
            f.to_js_string()
        )));
    }
    Ok(f)
}

/// An iterator over `items`: an array value with a cursor.
pub fn iterator(items: Vec<Value>) -> Value {
    Value::Structured(Obj::array(items).with_extra(Extra::Iterator { cursor: 0 }))
}

// ── Constructor ───────────────────────────────────────────────────────────────

fn construct(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    if let [n] = args {
        if n.is_numeric() {
            let f = n.to_number();
            if f < 0.0 || f.fract() != 0.0 || f > u32::MAX as f64 {
                return Err(ScriptError::range("Invalid array length"));
            }
            return Ok(Value::array(vec![Value::Undefined; f as usize]));
        }
    }
    Ok(Value::array(args.to_vec()))
}

fn is_array(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(matches!(arg(args, 0), Value::Structured(o) if o.is_array())))
}

/// Items of an array, iterator, string or `{length}`-shaped object.
fn items_of(v: &Value) -> Vec<Value> {
    match v {
        Value::Structured(o) if o.is_array() => o.values(),
        Value::Structured(o) => {
            let len = o.get_named("length").map_or(0, |l| l.to_integer().max(0) as usize);
            (0..len).map(|i| o.get_named(&i.to_string()).unwrap_or_default()).collect()
        }
        Value::Str(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        _ => Vec::new(),
    }
}

fn from(it: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = items_of(&arg(args, 0));
    let mapper = arg(args, 1);
    if mapper.is_nullish() {
        return Ok(Value::array(items));
    }
    let mut out = Vec::with_capacity(items.len());
    for (i, v) in items.into_iter().enumerate() {
        out.push(it.call(&mapper, Value::Undefined, vec![v, Value::from(i)])?);
    }
    Ok(Value::array(out))
}

fn of(_: &mut Interp<'_>, _: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::array(args.to_vec()))
}

// ── Shape ─────────────────────────────────────────────────────────────────────

fn length(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(Value::from(this.as_obj().map_or(0, Obj::len)))
}

fn push(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "push")?;
    for v in args {
        a.push(v.clone());
    }
    Ok(Value::from(a.len()))
}

fn pop(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "pop")?;
    let mut items = a.values();
    let last = items.pop().unwrap_or_default();
    a.replace_items(items);
    Ok(last)
}

fn shift(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "shift")?;
    let mut items = a.values();
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    let first = items.remove(0);
    a.replace_items(items);
    Ok(first)
}

fn unshift(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "unshift")?;
    let mut items = args.to_vec();
    items.extend(a.values());
    a.replace_items(items);
    Ok(Value::from(a.len()))
}

fn slice(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "slice")?.values();
    let len = items.len();
    let start = relative_index(&arg(args, 0), len, 0);
    let end = relative_index(&arg(args, 1), len, len);
    Ok(Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec()))
}

fn splice(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "splice")?;
    let mut items = a.values();
    let len = items.len();
    let start = relative_index(&arg(args, 0), len, 0);
    let count = match args.get(1) {
        None => len - start,
        Some(v) => (v.to_integer().max(0) as usize).min(len - start),
    };
    let inserted = args.get(2..).unwrap_or_default().iter().cloned();
    let removed: Vec<Value> = items.splice(start..start + count, inserted).collect();
    a.replace_items(items);
    Ok(Value::array(removed))
}

fn concat(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mut items = this_array(this, "concat")?.values();
    for v in args {
        match v {
            Value::Structured(o) if o.is_array() => items.extend(o.values()),
            other => items.push(other.clone()),
        }
    }
    Ok(Value::array(items))
}

fn join_items(items: &[Value], sep: &str) -> String {
    items
        .iter()
        .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
        .collect::<Vec<_>>()
        .join(sep)
}

fn join(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "join")?.values();
    let sep = match arg(args, 0) {
        Value::Undefined => ",".to_string(),
        v => v.to_js_string(),
    };
    Ok(Value::from(join_items(&items, &sep)))
}

fn to_string(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "toString")?.values();
    Ok(Value::from(join_items(&items, ",")))
}

fn at(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "at")?.values();
    let i = arg(args, 0).to_integer();
    let i = if i < 0 { items.len() as i64 + i } else { i };
    Ok(usize::try_from(i).ok().and_then(|i| items.get(i).cloned()).unwrap_or_default())
}

// ── Search ────────────────────────────────────────────────────────────────────

fn index_of(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "indexOf")?.values();
    let needle = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    let found = items.iter().enumerate().skip(from).find(|(_, v)| v.strict_equals(&needle));
    Ok(found.map_or(Value::Int(-1), |(i, _)| Value::from(i)))
}

fn last_index_of(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "lastIndexOf")?.values();
    let needle = arg(args, 0);
    let until = match args.get(1) {
        Some(v) => relative_index(v, items.len(), 0).saturating_add(1).min(items.len()),
        None => items.len(),
    };
    let found = items[..until].iter().rposition(|v| v.strict_equals(&needle));
    Ok(found.map_or(Value::Int(-1), Value::from))
}

fn includes(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "includes")?.values();
    let needle = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    Ok(Value::Bool(items.iter().skip(from).any(|v| v.same_value_zero(&needle))))
}

/// First `(index, element)` for which the callback is truthy, scanning
/// forwards or backwards.
fn find_entry(it: &mut Interp<'_>, this: &Value, args: &[Value], name: &str, backwards: bool) -> ScriptResult<Option<(usize, Value)>> {
    let a = this_array(this, name)?;
    let f = callback(args, name)?;
    let this_arg = arg(args, 1);
    let items = a.values();
    let order: Box<dyn Iterator<Item = usize>> = if backwards {
        Box::new((0..items.len()).rev())
    } else {
        Box::new(0..items.len())
    };
    for i in order {
        let v = items[i].clone();
        let hit = it.call(&f, this_arg.clone(), vec![v.clone(), Value::from(i), this.clone()])?;
        if hit.to_boolean() {
            return Ok(Some((i, v)));
        }
    }
    Ok(None)
}

fn find(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(find_entry(it, this, args, "find", false)?.map(|(_, v)| v).unwrap_or_default())
}

fn find_index(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(find_entry(it, this, args, "findIndex", false)?.map_or(Value::Int(-1), |(i, _)| Value::from(i)))
}

fn find_last(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(find_entry(it, this, args, "findLast", true)?.map(|(_, v)| v).unwrap_or_default())
}

fn find_last_index(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(find_entry(it, this, args, "findLastIndex", true)?.map_or(Value::Int(-1), |(i, _)| Value::from(i)))
}

// ── Iteration ─────────────────────────────────────────────────────────────────

/// Call the callback on each element, collecting results.
fn each(it: &mut Interp<'_>, this: &Value, args: &[Value], name: &str) -> ScriptResult<Vec<(Value, Value)>> {
    let a = this_array(this, name)?;
    let f = callback(args, name)?;
    let this_arg = arg(args, 1);
    let mut out = Vec::with_capacity(a.len());
    for (i, v) in a.values().into_iter().enumerate() {
        let r = it.call(&f, this_arg.clone(), vec![v.clone(), Value::from(i), this.clone()])?;
        out.push((v, r));
    }
    Ok(out)
}

fn map(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let pairs = each(it, this, args, "map")?;
    Ok(Value::array(pairs.into_iter().map(|(_, r)| r).collect()))
}

fn filter(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let pairs = each(it, this, args, "filter")?;
    Ok(Value::array(
        pairs.into_iter().filter(|(_, r)| r.to_boolean()).map(|(v, _)| v).collect(),
    ))
}

fn for_each(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    each(it, this, args, "forEach")?;
    Ok(Value::Undefined)
}

fn every(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "every")?;
    let f = callback(args, "every")?;
    for (i, v) in a.values().into_iter().enumerate() {
        if !it.call(&f, arg(args, 1), vec![v, Value::from(i), this.clone()])?.to_boolean() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn some(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Bool(find_entry(it, this, args, "some", false)?.is_some()))
}

fn fold(it: &mut Interp<'_>, this: &Value, args: &[Value], name: &str, backwards: bool) -> ScriptResult<Value> {
    let a = this_array(this, name)?;
    let f = callback(args, name)?;
    let mut indexed: Vec<(usize, Value)> = a.values().into_iter().enumerate().collect();
    if backwards {
        indexed.reverse();
    }
    let mut rest = indexed.into_iter();
    let mut acc = match args.get(1) {
        Some(init) => init.clone(),
        None => match rest.next() {
            Some((_, first)) => first,
            None => return Err(ScriptError::type_error("Reduce of empty array with no initial value")),
        },
    };
    for (i, v) in rest {
        acc = it.call(&f, Value::Undefined, vec![acc, v, Value::from(i), this.clone()])?;
    }
    Ok(acc)
}

fn reduce(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    fold(it, this, args, "reduce", false)
}

fn reduce_right(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    fold(it, this, args, "reduceRight", true)
}

// ── Reordering ────────────────────────────────────────────────────────────────

fn reverse(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "reverse")?;
    let mut items = a.values();
    items.reverse();
    a.replace_items(items);
    Ok(this.clone())
}

/// Stable merge sort tolerating comparators that are not total orders.
fn merge_sort(
    items: Vec<Value>,
    cmp: &mut dyn FnMut(&Value, &Value) -> ScriptResult<Ordering>,
) -> ScriptResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, cmp)?;
    let right = merge_sort(right, cmp)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut l = left.into_iter().peekable();
    let mut r = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (l.peek(), r.peek()) {
        if cmp(a, b)? == Ordering::Greater {
            out.extend(r.next());
        } else {
            out.extend(l.next());
        }
    }
    out.extend(l);
    out.extend(r);
    Ok(out)
}

fn sort(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "sort")?;
    let (mut defined, undefined): (Vec<Value>, Vec<Value>) =
        a.values().into_iter().partition(|v| !matches!(v, Value::Undefined));
    let cmp = arg(args, 0);
    defined = if cmp.is_nullish() {
        merge_sort(defined, &mut |x, y| Ok(x.to_js_string().cmp(&y.to_js_string())))?
    } else {
        if cmp.callable().is_none() {
            return Err(ScriptError::type_error("The comparison function must be either a function or undefined"));
        }
        merge_sort(defined, &mut |x, y| {
            let n = it.call(&cmp, Value::Undefined, vec![x.clone(), y.clone()])?.to_number();
            Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
        })?
    };
    defined.extend(undefined);
    a.replace_items(defined);
    Ok(this.clone())
}

fn fill(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "fill")?;
    let mut items = a.values();
    let len = items.len();
    let start = relative_index(&arg(args, 1), len, 0);
    let end = relative_index(&arg(args, 2), len, len);
    for slot in items.iter_mut().take(end).skip(start) {
        *slot = arg(args, 0);
    }
    a.replace_items(items);
    Ok(this.clone())
}

fn copy_within(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let a = this_array(this, "copyWithin")?;
    let mut items = a.values();
    let len = items.len();
    let target = relative_index(&arg(args, 0), len, 0);
    let start = relative_index(&arg(args, 1), len, 0);
    let end = relative_index(&arg(args, 2), len, len);
    let chunk: Vec<Value> = items.get(start..end.max(start)).unwrap_or_default().to_vec();
    for (offset, v) in chunk.into_iter().enumerate() {
        match items.get_mut(target + offset) {
            Some(slot) => *slot = v,
            None => break,
        }
    }
    a.replace_items(items);
    Ok(this.clone())
}

fn flatten_into(out: &mut Vec<Value>, items: Vec<Value>, depth: i64) {
    for v in items {
        match &v {
            Value::Structured(o) if o.is_array() && depth > 0 => flatten_into(out, o.values(), depth - 1),
            _ => out.push(v),
        }
    }
}

fn flat(_: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "flat")?.values();
    let depth = match arg(args, 0) {
        Value::Undefined => 1,
        v => v.to_integer().min(MAX_FLAT_DEPTH),
    };
    let mut out = Vec::with_capacity(items.len());
    flatten_into(&mut out, items, depth);
    Ok(Value::array(out))
}

fn flat_map(it: &mut Interp<'_>, this: &Value, args: &[Value]) -> ScriptResult<Value> {
    let mapped = each(it, this, args, "flatMap")?.into_iter().map(|(_, r)| r).collect();
    let mut out = Vec::new();
    flatten_into(&mut out, mapped, 1);
    Ok(Value::array(out))
}

// ── Iterators ─────────────────────────────────────────────────────────────────

fn keys(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let len = this_array(this, "keys")?.len();
    Ok(iterator((0..len).map(Value::from).collect()))
}

fn values(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    Ok(iterator(this_array(this, "values")?.values()))
}

fn entries(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let items = this_array(this, "entries")?.values();
    let pairs = items
        .into_iter()
        .enumerate()
        .map(|(i, v)| Value::array(vec![Value::from(i), v]));
    Ok(iterator(pairs.collect()))
}

/// `{value, done}` for the next position of an iterator.
fn next(_: &mut Interp<'_>, this: &Value, _: &[Value]) -> ScriptResult<Value> {
    let Value::Structured(o) = this else {
        return Err(ScriptError::type_error("next called on a non-iterator"));
    };
    let item = o.advance_cursor().and_then(|i| o.get_index(i));
    let done = item.is_none();
    Ok(Value::Structured(Obj::from_fields([
        (Rc::from("value"), item.unwrap_or_default()),
        (Rc::from("done"), Value::Bool(done)),
    ])))
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::scope::Env;

    fn run(src: &str) -> String {
        Engine::new().eval(src, &Env::new()).unwrap().to_js_string()
    }

    #[test]
    fn mutation() {
        assert_eq!(run("a = [1, 2]; a.push(3, 4); a"), "1,2,3,4");
        assert_eq!(run("a = [1, 2, 3]; a.pop(); a"), "1,2");
        assert_eq!(run("a = [1, 2, 3]; a.shift() + a.length"), "3");
        assert_eq!(run("a = [3]; a.unshift(1, 2); a"), "1,2,3");
        assert_eq!(run("a = [1, 2, 3, 4]; r = a.splice(1, 2, 'x'); a + '|' + r"), "1,x,4|2,3");
    }

    #[test]
    fn slicing_and_joining() {
        assert_eq!(run("[1, 2, 3, 4].slice(1, -1)"), "2,3");
        assert_eq!(run("[1, [2, 3]].concat(4, [5]).length"), "4");
        assert_eq!(run("[1, null, 3].join('-')"), "1--3");
        assert_eq!(run("[1, 2, 3].at(-1)"), "3");
    }

    #[test]
    fn callbacks() {
        assert_eq!(run("[1, 2, 3].map(x => x * 2)"), "2,4,6");
        assert_eq!(run("[1, 2, 3, 4].filter(x => x % 2 == 0)"), "2,4");
        assert_eq!(run("[1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(run("['a', 'b', 'c'].reduceRight((a, b) => a + b, '')"), "cba");
        assert_eq!(run("[1, 2, 3].find(x => x > 1)"), "2");
        assert_eq!(run("[1, 2, 3].findLastIndex(x => x < 3)"), "1");
        assert_eq!(run("[1, 2, 3].some(x => x > 2)"), "true");
        assert_eq!(run("[1, 2, 3].every(x => x > 2)"), "false");
        assert_eq!(run("s = 0; [1, 2, 3].forEach(x => { s += x }); s"), "6");
    }

    #[test]
    fn sorting() {
        assert_eq!(run("[3, 1, 10, 2].sort()"), "1,10,2,3");
        assert_eq!(run("[3, 1, 10, 2].sort((a, b) => a - b)"), "1,2,3,10");
        assert_eq!(run("[2, undefined, 1].sort()"), "1,2,");
        assert_eq!(run("[1, 2, 3].reverse()"), "3,2,1");
    }

    #[test]
    fn reshaping() {
        assert_eq!(run("[1, [2, [3, [4]]]].flat(2).length"), "4");
        assert_eq!(run("[1, 2].flatMap(x => [x, x])"), "1,1,2,2");
        assert_eq!(run("[0, 0, 0].fill(7, 1)"), "0,7,7");
        assert_eq!(run("[1, 2, 3, 4, 5].copyWithin(0, 3)"), "4,5,3,4,5");
        assert_eq!(run("[1, 2, 3].indexOf(2)"), "1");
        assert_eq!(run("[NaN].includes(NaN)"), "true");
    }

    #[test]
    fn constructor_and_statics() {
        assert_eq!(run("Array(3).length"), "3");
        assert_eq!(run("Array(1, 2)"), "1,2");
        assert_eq!(run("Array.isArray([])"), "true");
        assert_eq!(run("Array.from('abc')"), "a,b,c");
        assert_eq!(run("Array.from([1, 2], x => x + 1)"), "2,3");
        assert_eq!(run("Array.of(7)"), "7");
    }

    #[test]
    fn iterators() {
        assert_eq!(run("i = ['a', 'b'].values(); i.next().value + i.next().value"), "ab");
        assert_eq!(run("i = [].keys(); i.next().done"), "true");
        assert_eq!(run("s = ''; for (e of ['x', 'y'].entries()) { s += e[0] + e[1] }; s"), "0x1y");
    }
}
