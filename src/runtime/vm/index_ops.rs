//! Locals, tuple and dictionary instructions.

use crate::runtime::{dict::Dict, fault::Fault, gc::checked_tuple_size};

use super::Interpreter;

pub(super) fn push(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let value = interp.operand()?;
    interp.push(value)
}

pub(super) fn pop(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    interp.pop().map(drop)
}

/// `GET`: the local index comes from the stack.
pub(super) fn get(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let index = interp.pop_integer()?;
    load_local(interp, index)
}

pub(super) fn set(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let index = interp.pop_integer()?;
    store_local(interp, index)
}

pub(super) fn get_immediate(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let index = interp.operand_int()?;
    load_local(interp, index)
}

pub(super) fn set_immediate(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let index = interp.operand_int()?;
    store_local(interp, index)
}

fn load_local(interp: &mut Interpreter<'_>, index: i32) -> Result<(), Fault> {
    let ar = interp.frame()?;
    let value = ar.local(interp.heap(), index)?;
    interp.push(value)
}

fn store_local(interp: &mut Interpreter<'_>, index: i32) -> Result<(), Fault> {
    let value = interp.pop()?;
    let ar = interp.frame()?;
    ar.set_local(interp.heap(), index, value)
}

/// `NEW_TUPLE size`: pops the tag, pushes a tuple of `size` nulls.
pub(super) fn new_tuple(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let size = interp.operand_int()?;
    let size = checked_tuple_size(size as i64)?;
    let tag = interp.pop()?;
    let tuple = interp.heap().alloc_tuple(tag, size);
    interp.push(tuple)
}

fn slot_index(index: i32, size: usize) -> Result<usize, Fault> {
    match usize::try_from(index) {
        Ok(i) if i < size => Ok(i),
        _ => Err(Fault::IndexOutOfBounds {
            index: index as i64,
            size,
        }),
    }
}

pub(super) fn fetch_tuple(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let tuple = interp.pop()?;
    let index = interp.pop_integer()?;
    let handle = interp.sys.heap.expect_tuple("FETCH_TUPLE", tuple)?;
    let slot = slot_index(index, interp.sys.heap.tuple_size(handle)?)?;
    let value = interp.sys.heap.tuple_fetch(handle, slot)?;
    interp.push(value)
}

pub(super) fn store_tuple(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let tuple = interp.pop()?;
    let index = interp.pop_integer()?;
    let value = interp.pop()?;
    let handle = interp.sys.heap.expect_tuple("STORE_TUPLE", tuple)?;
    let slot = slot_index(index, interp.sys.heap.tuple_size(handle)?)?;
    interp.heap().tuple_store(handle, slot, value)
}

/// `NEW_DICT layer_size`.
pub(super) fn new_dict(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let layer_size = interp.operand_int()?;
    let dict = Dict::new(interp.heap(), layer_size as i64)?;
    interp.push(dict.value())
}

pub(super) fn fetch_dict(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let dict = interp.pop()?;
    let key = interp.pop()?;
    let dict = Dict::from_value(&interp.sys.heap, "FETCH_DICT", dict)?;
    let value = dict.fetch(&interp.sys.heap, key)?;
    interp.push(value)
}

pub(super) fn store_dict(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let dict = interp.pop()?;
    let key = interp.pop()?;
    let value = interp.pop()?;
    let dict = Dict::from_value(&interp.sys.heap, "STORE_DICT", dict)?;
    dict.store(interp.heap(), key, value)
}
