//! Control transfer between activation records.
//!
//! A record's resume pc is where execution continues when control next
//! enters it: `CALL`, `RESUME` and `RET` save the address of the following
//! instruction into the record they leave, and jump to the resume pc of
//! the record they enter.

use crate::runtime::{activation_record::ActivationRecord, fault::Fault, value::Value};

use super::Interpreter;

pub(super) fn goto(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let target = interp.operand_addr()?;
    interp.jump(target);
    Ok(())
}

/// `FUN addr`: pops the operand-area size and pushes an unentered record
/// enclosed by the current one.
pub(super) fn fun(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let entry = interp.operand_addr()?;
    let size = interp.pop_integer()?;
    let enclosing = interp.ar.map_or(Value::Null, ActivationRecord::value);
    let record = ActivationRecord::new(interp.heap(), size as i64, Value::Null, enclosing, entry)?;
    interp.push(record.value())
}

/// `NEW_AR size`: a fresh record called from the current one becomes current.
pub(super) fn new_ar(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let size = interp.operand_int()?;
    let caller = interp.ar.map_or(Value::Null, ActivationRecord::value);
    let resume = interp.next_pc;
    let record = ActivationRecord::new(interp.heap(), size as i64, caller, Value::Null, resume)?;
    interp.ar = Some(record);
    Ok(())
}

pub(super) fn call(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    enter(interp, true)
}

/// Like `CALL`, but the target keeps the caller it already has.
pub(super) fn resume(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    enter(interp, false)
}

fn enter(interp: &mut Interpreter<'_>, link_caller: bool) -> Result<(), Fault> {
    let target = interp.pop_frame()?;
    let count = interp.operand_int()?;
    let current = interp.frame()?;
    let return_pc = interp.next_pc;
    let heap = interp.heap();
    current.set_resume_pc(heap, return_pc)?;
    if link_caller {
        target.set_caller(heap, Some(current))?;
    }
    current.transfer(heap, target, count)?;
    let entry = target.resume_pc(heap)?;
    interp.ar = Some(target);
    interp.jump(entry);
    Ok(())
}

/// `YIELD n`: hands the top `n` values to the caller without switching.
pub(super) fn yield_values(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let count = interp.operand_int()?;
    let current = interp.frame()?;
    let caller = current.caller(&interp.sys.heap)?.ok_or(Fault::NoCaller)?;
    current.transfer(interp.heap(), caller, count)
}

pub(super) fn ret(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let current = interp.frame()?;
    let return_pc = interp.next_pc;
    let heap = interp.heap();
    current.set_resume_pc(heap, return_pc)?;
    let caller = current.caller(heap)?.ok_or(Fault::NoCaller)?;
    let entry = caller.resume_pc(heap)?;
    interp.ar = Some(caller);
    interp.jump(entry);
    Ok(())
}

pub(super) fn rest(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    interp.yield_quantum();
    Ok(())
}

pub(super) fn halt(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let me = interp.me;
    interp.sys.processes.get_mut(me)?.done = true;
    interp.yield_quantum();
    Ok(())
}
