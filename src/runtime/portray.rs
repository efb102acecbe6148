//! Human-readable rendering of values.
//!
//! Lists print as `[a, b]` or `[a, b | tail]`, dictionaries as `{k=v, k=v}`
//! and every other tuple as `<tag: a, b>`. Each tuple is rendered at most
//! once per call; meeting it again prints `TUPLE#[id]`, which keeps cyclic
//! structures finite.

use std::{collections::HashSet, fmt::Write};

use crate::runtime::{
    dict::Dict,
    fault::Fault,
    gc::{GcHandle, GcHeap},
    list::is_list_cell,
    process::ProcessId,
    stream::stream_write,
    system::System,
    value::{TAG_DICT, Value},
};

enum Piece {
    Value(Value),
    Text(&'static str),
    /// Remainder of a list whose opening bracket is already written.
    ListTail(Value),
}

pub fn portray(heap: &GcHeap, value: Value) -> Result<String, Fault> {
    let mut out = String::new();
    let mut seen: HashSet<GcHandle> = HashSet::new();
    let mut pieces = vec![Piece::Value(value)];

    while let Some(piece) = pieces.pop() {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Value(value) => {
                let Value::Tuple(handle) = value else {
                    portray_scalar(heap, value, &mut out)?;
                    continue;
                };
                if !seen.insert(handle) {
                    let _ = write!(out, "TUPLE#[{}]", handle.index());
                    continue;
                }
                let tag = heap.tuple_tag(handle)?;
                if tag == TAG_DICT {
                    out.push('{');
                    pieces.push(Piece::Text("}"));
                    let entries: Vec<(Value, Value)> =
                        Dict::from_value(heap, "portray", value)?.entries(heap).collect();
                    for (i, (key, value)) in entries.into_iter().enumerate().rev() {
                        pieces.push(Piece::Value(value));
                        pieces.push(Piece::Text("="));
                        pieces.push(Piece::Value(key));
                        if i > 0 {
                            pieces.push(Piece::Text(", "));
                        }
                    }
                } else if is_list_cell(heap, value) {
                    out.push('[');
                    pieces.push(Piece::ListTail(heap.tuple_fetch(handle, 1)?));
                    pieces.push(Piece::Value(heap.tuple_fetch(handle, 0)?));
                } else {
                    out.push('<');
                    pieces.push(Piece::Text(">"));
                    let slots = heap.tuple_slots(handle)?;
                    for (i, slot) in slots.iter().enumerate().rev() {
                        pieces.push(Piece::Value(*slot));
                        if i > 0 {
                            pieces.push(Piece::Text(", "));
                        }
                    }
                    pieces.push(Piece::Text(": "));
                    pieces.push(Piece::Value(tag));
                }
            }
            Piece::ListTail(Value::Null) => out.push(']'),
            Piece::ListTail(tail) => match tail {
                Value::Tuple(handle) if is_list_cell(heap, tail) && !seen.contains(&handle) => {
                    seen.insert(handle);
                    out.push_str(", ");
                    pieces.push(Piece::ListTail(heap.tuple_fetch(handle, 1)?));
                    pieces.push(Piece::Value(heap.tuple_fetch(handle, 0)?));
                }
                other => {
                    out.push_str(" | ");
                    pieces.push(Piece::Text("]"));
                    pieces.push(Piece::Value(other));
                }
            },
        }
    }
    Ok(out)
}

fn portray_scalar(heap: &GcHeap, value: Value, out: &mut String) -> Result<(), Fault> {
    match value {
        Value::Symbol(_) => out.push_str(&String::from_utf8_lossy(heap.symbol_bytes(value)?)),
        // The heap-free rendering already matches for every other scalar.
        other => {
            let _ = write!(out, "{}", other);
        }
    }
    Ok(())
}

/// Renders `value` and writes the text to the stream process `target`.
pub fn portray_to(sys: &mut System, target: ProcessId, value: Value) -> Result<(), Fault> {
    let text = portray(&sys.heap, value)?;
    stream_write(sys, target, text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::portray;
    use crate::runtime::{
        gc::GcHeap,
        list::{cons, list_from_values},
        value::{TAG_LIST, Value},
    };

    #[test]
    fn scalars() {
        let mut heap = GcHeap::new();
        let sym = heap.alloc_symbol(b"hello");
        assert_eq!(portray(&heap, Value::Null).unwrap(), "[]");
        assert_eq!(portray(&heap, Value::Integer(-7)).unwrap(), "-7");
        assert_eq!(portray(&heap, Value::Boolean(false)).unwrap(), "false");
        assert_eq!(portray(&heap, sym).unwrap(), "hello");
    }

    #[test]
    fn proper_and_improper_lists() {
        let mut heap = GcHeap::new();
        let list = list_from_values(&mut heap, &[Value::Integer(1), Value::Integer(2)]);
        assert_eq!(portray(&heap, list).unwrap(), "[1, 2]");

        let improper = cons(&mut heap, Value::Integer(1), Value::Integer(9));
        assert_eq!(portray(&heap, improper).unwrap(), "[1 | 9]");
    }

    #[test]
    fn self_referencing_tuple_is_cut_off() {
        let mut heap = GcHeap::new();
        let tuple = heap.alloc_tuple(Value::Integer(8), 2);
        let handle = tuple.handle().unwrap();
        heap.tuple_store(handle, 0, Value::Integer(1)).unwrap();
        heap.tuple_store(handle, 1, tuple).unwrap();
        assert_eq!(
            portray(&heap, tuple).unwrap(),
            format!("<8: 1, TUPLE#[{}]>", handle.index())
        );
    }

    #[test]
    fn circular_list_stops_at_the_revisited_cell() {
        let mut heap = GcHeap::new();
        let cell = heap.alloc_tuple_from(TAG_LIST, vec![Value::Integer(1), Value::Null]);
        let handle = cell.handle().unwrap();
        heap.tuple_store(handle, 1, cell).unwrap();
        assert_eq!(
            portray(&heap, cell).unwrap(),
            format!("[1 | TUPLE#[{}]]", handle.index())
        );
    }

    #[test]
    fn very_long_list_renders_without_recursion() {
        let mut heap = GcHeap::new();
        let values: Vec<Value> = (0..50_000).map(Value::Integer).collect();
        let list = list_from_values(&mut heap, &values);
        let text = portray(&heap, list).unwrap();
        assert!(text.starts_with("[0, 1, 2"));
        assert!(text.ends_with("49999]"));
    }
}
