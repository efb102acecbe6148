use crate::{
    bytecode::op_code::OpCode,
    runtime::{fault::Fault, value::Value},
};

use super::Interpreter;

pub(super) fn not(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let value = interp.pop_boolean()?;
    interp.push(Value::Boolean(!value))
}

pub(super) fn and(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let right = interp.pop_boolean()?;
    let left = interp.pop_boolean()?;
    interp.push(Value::Boolean(left && right))
}

pub(super) fn or(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let right = interp.pop_boolean()?;
    let left = interp.pop_boolean()?;
    interp.push(Value::Boolean(left || right))
}

/// Integer arithmetic. The right operand is on top; results wrap.
pub(super) fn arithmetic(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    let right = interp.pop_integer()?;
    let left = interp.pop_integer()?;
    let result = integer_op(interp.op, left, right)?;
    interp.push(Value::Integer(result))
}

pub(super) fn integer_op(op: OpCode, left: i32, right: i32) -> Result<i32, Fault> {
    match op {
        OpCode::OpAddInt => Ok(left.wrapping_add(right)),
        OpCode::OpSubInt => Ok(left.wrapping_sub(right)),
        OpCode::OpMulInt => Ok(left.wrapping_mul(right)),
        OpCode::OpDivInt | OpCode::OpModInt if right == 0 => Err(Fault::DivisionByZero),
        OpCode::OpDivInt => Ok(left.wrapping_div(right)),
        OpCode::OpModInt => Ok(left.wrapping_rem(right)),
        other => Err(Fault::BadOpcode(other as i32)),
    }
}
