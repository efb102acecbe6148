use crate::{
    bytecode::op_code::OpCode,
    runtime::{
        fault::Fault,
        gc::GcHeap,
        value::{Label, Value},
    },
};

/// Rewrites the opcodes of `code` into dispatch labels, in place.
///
/// Walks instruction by instruction from pc 0 until `EOF`, which stays an
/// integer. Operands are never touched. Slots that already hold labels are
/// kept, so threading code shared with an already threaded machine is a
/// no-op. Returns the number of opcodes rewritten.
///
/// The walk stops at the first slot that is not an opcode. Past that point
/// instruction boundaries are unknown, so the rest of the code stays as
/// plain integers and the dispatcher decodes it one slot at a time; a bad
/// slot only faults if control actually reaches it.
pub fn thread_code(heap: &mut GcHeap, code: Value) -> Result<usize, Fault> {
    let handle = heap.expect_tuple("thread", code)?;
    let len = heap.tuple_size(handle)?;
    let mut pc = 0;
    let mut rewritten = 0;

    while pc < len {
        let op = match heap.tuple_fetch(handle, pc)? {
            Value::Integer(code) => {
                let Ok(op) = OpCode::try_from(code) else {
                    break;
                };
                if op == OpCode::OpEof {
                    break;
                }
                heap.tuple_store(handle, pc, Value::Label(Label(op as u32)))?;
                rewritten += 1;
                op
            }
            Value::Label(label) => match OpCode::try_from(label.index() as i32) {
                Ok(op) => op,
                Err(_) => break,
            },
            _ => break,
        };
        pc += 1 + op.arity();
    }
    Ok(rewritten)
}
