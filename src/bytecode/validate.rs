use crate::{
    bytecode::op_code::{OpCode, OperandKind},
    diagnostics::Reporter,
    runtime::{fault::Fault, gc::GcHeap, value::Value},
};

/// Scans a code tuple before it is run.
///
/// Problems go to `reporter` and scanning continues past them: a
/// non-integer opcode or one outside the instruction set is skipped one
/// slot at a time. Address operands must point inside the code, integer
/// operands must be integers, and the code must end in `EOF`. Returns the
/// number of instructions decoded, `EOF` included.
pub fn validate_code(heap: &GcHeap, code: Value, reporter: &mut Reporter) -> Result<usize, Fault> {
    let handle = heap.expect_tuple("validate", code)?;
    let slots = heap.tuple_slots(handle)?;
    let mut pc = 0;
    let mut instructions = 0;
    let mut saw_eof = false;

    while pc < slots.len() {
        let op = match slots[pc] {
            Value::Integer(n) => match OpCode::from_i32(n) {
                Some(op) => op,
                None => {
                    reporter.error(
                        Some(pc),
                        format!("opcode {} not in range 0..{}", n, OpCode::OpEof as i32),
                    );
                    pc += 1;
                    continue;
                }
            },
            // Already threaded code: the label indexes the handler table.
            Value::Label(label) => match OpCode::from_i32(label.index() as i32) {
                Some(op) => op,
                None => {
                    reporter.error(Some(pc), format!("unknown dispatch label {}", label.index()));
                    pc += 1;
                    continue;
                }
            },
            other => {
                reporter.error(
                    Some(pc),
                    format!("opcode is not an integer (found {})", other.type_name()),
                );
                pc += 1;
                continue;
            }
        };
        instructions += 1;

        if op == OpCode::OpEof {
            saw_eof = true;
            let trailing = slots.len() - pc - 1;
            if trailing > 0 {
                reporter.note(Some(pc), format!("{} slots after EOF are ignored", trailing));
            }
            break;
        }

        if op.arity() > 0 {
            match slots.get(pc + 1) {
                None => reporter.error(Some(pc), format!("{} is missing its operand", op)),
                Some(operand) => check_operand(op, *operand, pc, slots.len(), reporter),
            }
        }
        pc += 1 + op.arity();
    }

    if !saw_eof {
        reporter.error(None, "code does not end with EOF");
    }
    Ok(instructions)
}

fn check_operand(op: OpCode, operand: Value, pc: usize, len: usize, reporter: &mut Reporter) {
    match (op.operand(), operand) {
        (OperandKind::Addr, Value::Integer(addr)) => {
            if addr < 0 || addr as usize >= len {
                reporter.error(
                    Some(pc),
                    format!("{} target {} outside code of length {}", op, addr, len),
                );
            }
        }
        (OperandKind::Int, Value::Integer(_)) | (OperandKind::Value, _) | (OperandKind::None, _) => {}
        (kind, other) => reporter.error(
            Some(pc),
            format!(
                "{} expects an {:?} operand, found {}",
                op,
                kind,
                other.type_name()
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_code;
    use crate::{
        bytecode::{builder::CodeBuilder, op_code::OpCode},
        diagnostics::Reporter,
        runtime::{gc::GcHeap, value::Value},
    };

    #[test]
    fn clean_code_has_no_diagnostics() {
        let mut heap = GcHeap::new();
        let mut b = CodeBuilder::new();
        b.push(Value::Integer(1));
        b.emit(OpCode::OpPop);
        b.emit(OpCode::OpHalt);
        let code = b.finish(&mut heap).unwrap();

        let mut reporter = Reporter::new("Validating", false);
        assert_eq!(validate_code(&heap, code, &mut reporter).unwrap(), 4);
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn bad_opcodes_are_skipped_and_counted() {
        let mut heap = GcHeap::new();
        let sym = heap.alloc_symbol(b"x");
        let code = heap.alloc_tuple_from(
            Value::Null,
            vec![
                Value::Integer(99),
                sym,
                Value::Integer(OpCode::OpNop as i32),
                Value::Integer(OpCode::OpEof as i32),
            ],
        );
        let mut reporter = Reporter::new("Validating", false);
        validate_code(&heap, code, &mut reporter).unwrap();
        assert_eq!(reporter.errors(), 2);
    }

    #[test]
    fn wild_jumps_and_missing_eof_are_errors() {
        let mut heap = GcHeap::new();
        let code = heap.alloc_tuple_from(
            Value::Null,
            vec![Value::Integer(OpCode::OpGoto as i32), Value::Integer(50)],
        );
        let mut reporter = Reporter::new("Validating", false);
        validate_code(&heap, code, &mut reporter).unwrap();
        assert_eq!(reporter.errors(), 2);
        assert!(reporter.diagnostics()[0].message.contains("outside code"));
    }
}
