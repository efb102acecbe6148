use crate::{
    bytecode::{builder::CodeBuilder, op_code::OpCode},
    runtime::{activation_record::ActivationRecord, fault::Fault, value::Value},
};

use super::test_support::machine;

#[test]
fn call_passes_arguments_and_yield_returns_results() {
    let mut m = machine(|b, _| {
        let f = b.new_label();
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(Value::Integer(5));
        b.push(Value::Integer(4));
        b.emit_jump(OpCode::OpFun, f);
        b.emit_int(OpCode::OpCall, 1);
        b.emit(OpCode::OpHalt);

        b.place_label(f);
        b.emit_int(OpCode::OpGetI, 0);
        b.push(Value::Integer(1));
        b.emit(OpCode::OpAddInt);
        b.emit_int(OpCode::OpYield, 1);
        b.emit(OpCode::OpRet);
    });
    m.finish().unwrap();
    assert_eq!(m.stack(), vec![Value::Integer(6)]);
}

#[test]
fn resume_continues_after_the_last_ret() {
    let mut m = machine(|b, _| {
        let g = b.new_label();
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(Value::Integer(2));
        b.emit_jump(OpCode::OpFun, g);
        b.emit_int(OpCode::OpGetI, 0);
        b.emit_int(OpCode::OpCall, 0);
        b.emit_int(OpCode::OpGetI, 0);
        b.emit_int(OpCode::OpResume, 0);
        b.emit(OpCode::OpHalt);

        b.place_label(g);
        b.push(Value::Integer(1));
        b.emit_int(OpCode::OpYield, 1);
        b.emit(OpCode::OpRet);
        b.push(Value::Integer(2));
        b.emit_int(OpCode::OpYield, 1);
        b.emit(OpCode::OpRet);
    });
    m.finish().unwrap();
    let stack = m.stack();
    assert_eq!(&stack[1..], &[Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn fun_records_its_enclosing_record() {
    let mut m = machine(|b, _| {
        let body = b.new_label();
        b.emit_int(OpCode::OpNewAr, 2);
        b.push(Value::Integer(3));
        b.emit_jump(OpCode::OpFun, body);
        b.emit(OpCode::OpHalt);
        b.place_label(body);
        b.emit(OpCode::OpNop);
    });
    m.finish().unwrap();
    let heap = &m.sys.heap;
    let current = m.vm.ar(heap).unwrap().unwrap();
    let fun = ActivationRecord::from_value(heap, "test", m.stack()[0]).unwrap();
    assert_eq!(fun.enclosing(heap).unwrap(), current.value());
    assert_eq!(fun.caller(heap).unwrap(), None);
    assert_eq!(fun.resume_pc(heap).unwrap(), 7);
    assert_eq!(fun.capacity(heap).unwrap(), 3);
}

#[test]
fn ret_without_caller_faults() {
    let mut m = machine(|b, _| {
        b.emit_int(OpCode::OpNewAr, 2);
        b.emit(OpCode::OpRet);
    });
    assert!(matches!(m.run(100).unwrap_err(), Fault::NoCaller));
    assert_eq!(m.pc(), 2);
}

#[test]
fn goto_skips_code() {
    let mut m = machine(|b, _| {
        let end = b.new_label();
        b.emit_int(OpCode::OpNewAr, 2);
        b.emit_jump(OpCode::OpGoto, end);
        b.push(Value::Integer(1));
        b.place_label(end);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert!(m.stack().is_empty());
}

#[test]
fn rest_ends_the_quantum_and_resumes_after_it() {
    let mut m = machine(|b, _| {
        b.emit_int(OpCode::OpNewAr, 1);
        b.emit(OpCode::OpRest);
        b.emit(OpCode::OpHalt);
    });
    assert_eq!(m.run(100).unwrap(), 2);
    assert!(!m.done());
    assert_eq!(m.pc(), 3);
    assert_eq!(m.run(100).unwrap(), 1);
    assert!(m.done());
}

#[test]
fn quantum_runs_exactly_the_given_number_of_steps() {
    let mut m = machine(|b, _| {
        for _ in 0..10 {
            b.emit(OpCode::OpNop);
        }
        b.emit(OpCode::OpHalt);
    });
    assert_eq!(m.run(3).unwrap(), 3);
    assert_eq!(m.pc(), 3);
    assert_eq!(m.run(0).unwrap(), 0);
    assert_eq!(m.pc(), 3);
}

fn countdown(b: &mut CodeBuilder) {
    // local 0 counts from 10 down, local 1 accumulates.
    let top = b.new_label();
    let end = b.new_label();
    b.emit_int(OpCode::OpNewAr, 4);
    b.push(Value::Integer(10));
    b.push(Value::Integer(0));
    b.place_label(top);
    b.emit_int(OpCode::OpGetI, 0);
    b.push(Value::Integer(0));
    b.emit_jump(OpCode::OpJeq, end);
    b.emit_int(OpCode::OpGetI, 1);
    b.emit_int(OpCode::OpGetI, 0);
    b.emit(OpCode::OpAddInt);
    b.emit_int(OpCode::OpSetI, 1);
    b.emit_int(OpCode::OpGetI, 0);
    b.push(Value::Integer(1));
    b.emit(OpCode::OpSubInt);
    b.emit_int(OpCode::OpSetI, 0);
    b.emit_jump(OpCode::OpGoto, top);
    b.place_label(end);
    b.emit(OpCode::OpHalt);
}

#[test]
fn split_quanta_match_one_uninterrupted_run() {
    let mut whole = machine(|b, _| countdown(b));
    whole.finish().unwrap();

    let mut split = machine(|b, _| countdown(b));
    let mut total = 0;
    while !split.done() {
        total += split.run(1).unwrap();
    }
    assert_eq!(split.stack(), whole.stack());
    assert_eq!(split.stack(), vec![Value::Integer(0), Value::Integer(55)]);
    assert!(total > 50);
}

#[test]
fn oversized_records_are_rejected() {
    let mut m = machine(|b, _| {
        b.emit_int(OpCode::OpNewAr, i32::MAX);
    });
    let err = m.run(10).unwrap_err();
    assert!(matches!(err, Fault::InvalidTupleSize(size) if size == i32::MAX as i64));

    let mut m = machine(|b, _| {
        let f = b.new_label();
        b.emit_int(OpCode::OpNewAr, 2);
        b.push(Value::Integer(i32::MAX));
        b.emit_jump(OpCode::OpFun, f);
        b.emit(OpCode::OpHalt);
        b.place_label(f);
        b.emit(OpCode::OpRet);
    });
    let err = m.run(10).unwrap_err();
    assert!(matches!(err, Fault::InvalidTupleSize(size) if size == i32::MAX as i64));
}
