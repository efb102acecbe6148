use crate::{
    bytecode::op_code::OpCode,
    runtime::{
        compare::{compare, equal},
        fault::Fault,
        value::{Comparison, Value},
    },
};

use super::Interpreter;

pub(super) fn equ(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let right = interp.pop()?;
    let left = interp.pop()?;
    let result = equal(&interp.sys.heap, left, right);
    interp.push(Value::Boolean(result))
}

pub(super) fn neq(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let right = interp.pop()?;
    let left = interp.pop()?;
    let result = !equal(&interp.sys.heap, left, right);
    interp.push(Value::Boolean(result))
}

/// Conditional branches: pop `b` then `a` and jump when `compare(a, b)`
/// satisfies the opcode's relation.
pub(super) fn branch(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let right = interp.pop()?;
    let left = interp.pop()?;
    let target = interp.operand_addr()?;
    if takes_branch(interp.op, compare(&interp.sys.heap, left, right))? {
        interp.jump(target);
    }
    Ok(())
}

pub(super) fn takes_branch(op: OpCode, outcome: Comparison) -> Result<bool, Fault> {
    Ok(match op {
        OpCode::OpJeq => outcome == Comparison::Equal,
        OpCode::OpJne => outcome != Comparison::Equal,
        OpCode::OpJlt => outcome == Comparison::Less,
        // Incomparable satisfies both of the inclusive relations.
        OpCode::OpJle => outcome != Comparison::Greater,
        OpCode::OpJgt => outcome == Comparison::Greater,
        OpCode::OpJge => outcome != Comparison::Less,
        other => return Err(Fault::BadOpcode(other as i32)),
    })
}
