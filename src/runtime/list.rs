//! Lists are chains of two-slot cells tagged `list`: `[head, tail]`, ending in `Null`.

use crate::runtime::{
    fault::Fault,
    gc::GcHeap,
    value::{TAG_LIST, Value},
};

/// Allocates a cell with `head` in front of `tail`.
pub fn cons(heap: &mut GcHeap, head: Value, tail: Value) -> Value {
    heap.alloc_tuple_from(TAG_LIST, vec![head, tail])
}

/// Builds a proper list holding `values` in order.
pub fn list_from_values(heap: &mut GcHeap, values: &[Value]) -> Value {
    values
        .iter()
        .rev()
        .fold(Value::Null, |tail, head| cons(heap, *head, tail))
}

/// Returns `true` when `value` is a tuple tagged `list` with two slots.
pub fn is_list_cell(heap: &GcHeap, value: Value) -> bool {
    let Value::Tuple(handle) = value else {
        return false;
    };
    matches!(heap.tuple_tag(handle), Ok(TAG_LIST)) && matches!(heap.tuple_size(handle), Ok(2))
}

/// Collects the elements of a list.
///
/// Returns the elements and the final tail, which is `Null` for a proper
/// list and the improper tail value otherwise. A list that loops back on
/// itself stops at the first revisited cell, which is returned as the tail.
pub fn list_to_values(heap: &GcHeap, list: Value) -> Result<(Vec<Value>, Value), Fault> {
    let mut values = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut cursor = list;
    while is_list_cell(heap, cursor) {
        let Value::Tuple(handle) = cursor else {
            break;
        };
        if !seen.insert(handle) {
            break;
        }
        values.push(heap.tuple_fetch(handle, 0)?);
        cursor = heap.tuple_fetch(handle, 1)?;
    }
    Ok((values, cursor))
}
