use crate::{
    bytecode::op_code::OpCode,
    runtime::value::{Comparison, Value},
};

use super::{comparison_ops::takes_branch, test_support::machine};

#[test]
fn equ_compares_symbols_structurally() {
    let mut m = machine(|b, sys| {
        let x = sys.heap.alloc_symbol(b"same");
        let y = sys.heap.alloc_symbol(b"same");
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(x);
        b.push(y);
        b.emit(OpCode::OpEqu);
        b.push(x);
        b.push(y);
        b.emit(OpCode::OpNeq);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert_eq!(m.stack(), vec![Value::Boolean(true), Value::Boolean(false)]);
}

#[test]
fn jlt_branches_when_second_popped_is_smaller() {
    for (left, expected) in [(1, 100), (5, 200)] {
        let mut m = machine(|b, _| {
            let less = b.new_label();
            b.emit_int(OpCode::OpNewAr, 4);
            b.push(Value::Integer(left));
            b.push(Value::Integer(3));
            b.emit_jump(OpCode::OpJlt, less);
            b.push(Value::Integer(200));
            b.emit(OpCode::OpHalt);
            b.place_label(less);
            b.push(Value::Integer(100));
            b.emit(OpCode::OpHalt);
        });
        m.finish().unwrap();
        assert_eq!(m.stack(), vec![Value::Integer(expected)]);
    }
}

#[test]
fn incomparable_satisfies_only_inclusive_relations() {
    let outcome = Comparison::Incomparable;
    assert!(takes_branch(OpCode::OpJle, outcome).unwrap());
    assert!(takes_branch(OpCode::OpJge, outcome).unwrap());
    assert!(takes_branch(OpCode::OpJne, outcome).unwrap());
    assert!(!takes_branch(OpCode::OpJlt, outcome).unwrap());
    assert!(!takes_branch(OpCode::OpJgt, outcome).unwrap());
    assert!(!takes_branch(OpCode::OpJeq, outcome).unwrap());
}

#[test]
fn jle_takes_equal_and_less() {
    assert!(takes_branch(OpCode::OpJle, Comparison::Equal).unwrap());
    assert!(takes_branch(OpCode::OpJle, Comparison::Less).unwrap());
    assert!(!takes_branch(OpCode::OpJle, Comparison::Greater).unwrap());
    assert!(!takes_branch(OpCode::OpJge, Comparison::Less).unwrap());
}

#[test]
fn mixed_kinds_branch_on_jge() {
    let mut m = machine(|b, _| {
        let taken = b.new_label();
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(Value::Integer(1));
        b.push(Value::Boolean(true));
        b.emit_jump(OpCode::OpJge, taken);
        b.emit(OpCode::OpHalt);
        b.place_label(taken);
        b.push(Value::Integer(9));
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert_eq!(m.stack(), vec![Value::Integer(9)]);
}
