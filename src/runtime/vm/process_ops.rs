//! Process creation and stream I/O.

use crate::{
    bytecode::term_format::save_to_stream,
    runtime::{
        fault::Fault,
        portray::portray_to,
        stream::{stream_close, stream_write},
        value::Value,
    },
};

use super::Interpreter;

fn pop_text(interp: &mut Interpreter<'_>) -> Result<String, Fault> {
    let value = interp.pop()?;
    match value {
        Value::Symbol(_) => {
            let bytes = interp.sys.heap.symbol_bytes(value)?;
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Err(Fault::type_mismatch(interp.op.mnemonic(), "Symbol", &other)),
    }
}

/// `OPEN`: pops the mode, then the locator.
pub(super) fn open(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let mode = pop_text(interp)?;
    let locator = pop_text(interp)?;
    let process = interp.sys.open(&locator, &mode)?;
    interp.push(Value::Process(process))
}

pub(super) fn stdout(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let process = interp.sys.open("*stdout", "w")?;
    interp.push(Value::Process(process))
}

pub(super) fn close(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let process = interp.pop_process()?;
    stream_close(interp.sys, process)
}

/// `SPAWN addr`: a new machine over the same code is scheduled right
/// after this process.
pub(super) fn spawn(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let entry = interp.operand_addr()?;
    let state = interp.vm.spawn_at(interp.heap(), entry)?;
    let spawned = interp.sys.spawn_vm(state);
    interp.sys.processes.insert_after(interp.me, spawned)?;
    interp.push(Value::Process(spawned))
}

/// `WRITE`: raw bytes from a symbol, or from a tuple of integers (each
/// truncated to its low byte).
pub(super) fn write(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let process = interp.pop_process()?;
    let value = interp.pop()?;
    let heap = &interp.sys.heap;
    let bytes = match value {
        Value::Symbol(_) => heap.symbol_bytes(value)?.to_vec(),
        Value::Tuple(handle) => heap
            .tuple_slots(handle)?
            .iter()
            .map(|slot| {
                slot.as_integer()
                    .map(|byte| byte as u8)
                    .ok_or_else(|| Fault::type_mismatch("WRITE", "Integer", slot))
            })
            .collect::<Result<Vec<u8>, Fault>>()?,
        other => return Err(Fault::type_mismatch("WRITE", "Symbol or Tuple", &other)),
    };
    stream_write(interp.sys, process, &bytes)
}

/// `SEND`: the value travels in the binary term format.
pub(super) fn send(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let process = interp.pop_process()?;
    let value = interp.pop()?;
    save_to_stream(interp.sys, process, value)?;
    Ok(())
}

pub(super) fn portray(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let process = interp.pop_process()?;
    let value = interp.pop()?;
    portray_to(interp.sys, process, value)
}
