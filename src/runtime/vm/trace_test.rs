use crate::{bytecode::op_code::OpCode, runtime::value::Value};

use super::{Interpreter, test_support::machine};

#[test]
fn trace_line_shows_pc_opcode_operand_and_depth() {
    let mut m = machine(|b, _| {
        b.emit_int(OpCode::OpNewAr, 2);
        b.push(Value::Integer(7));
        b.emit(OpCode::OpHalt);
    });
    m.run(1).unwrap();

    let mut interp = Interpreter::load(&mut m.sys, m.vm, m.me).unwrap();
    interp.op = OpCode::OpPush;
    assert_eq!(interp.trace_line(), "PID=0 PC=0002 PUSH 7 depth=0");
}

#[test]
fn trace_line_without_a_record() {
    let mut m = machine(|b, _| {
        b.emit(OpCode::OpHalt);
    });
    let mut interp = Interpreter::load(&mut m.sys, m.vm, m.me).unwrap();
    interp.op = OpCode::OpHalt;
    assert_eq!(interp.trace_line(), "PID=0 PC=0000 HALT depth=-");
}
