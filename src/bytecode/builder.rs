use thiserror::Error;

use crate::{
    bytecode::op_code::{OpCode, OperandKind},
    runtime::{gc::GcHeap, value::Value},
};

/// Forward or backward reference to a code position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeLabel(usize);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("{op} takes a {expected:?} operand")]
    OperandMismatch { op: OpCode, expected: OperandKind },
    #[error("label {0} is referenced but never placed")]
    UndefinedLabel(usize),
    #[error("label {0} is placed twice")]
    LabelRedefined(usize),
}

/// Accumulates a flat code tuple: opcodes interleaved with their operands.
///
/// Jumps may target labels that are placed later; their operand slots are
/// patched when the builder finishes. The first misuse is remembered and
/// returned from [`CodeBuilder::finish`].
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<Value>,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, CodeLabel)>,
    error: Option<BuildError>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position the next emitted opcode will occupy.
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    fn fail(&mut self, err: BuildError) {
        self.error.get_or_insert(err);
    }

    fn start(&mut self, op: OpCode, kind: OperandKind) -> usize {
        if op.operand() != kind {
            self.fail(BuildError::OperandMismatch {
                op,
                expected: op.operand(),
            });
        }
        let pc = self.code.len();
        self.code.push(op.into());
        pc
    }

    /// Emits an instruction without operands.
    pub fn emit(&mut self, op: OpCode) -> usize {
        self.start(op, OperandKind::None)
    }

    pub fn emit_int(&mut self, op: OpCode, operand: i32) -> usize {
        let pc = self.start(op, OperandKind::Int);
        self.code.push(Value::Integer(operand));
        pc
    }

    pub fn emit_value(&mut self, op: OpCode, operand: Value) -> usize {
        let pc = self.start(op, OperandKind::Value);
        self.code.push(operand);
        pc
    }

    /// `PUSH value`.
    pub fn push(&mut self, value: Value) -> usize {
        self.emit_value(OpCode::OpPush, value)
    }

    /// Emits a branch, call or spawn to a known address.
    pub fn emit_addr(&mut self, op: OpCode, address: usize) -> usize {
        let pc = self.start(op, OperandKind::Addr);
        self.code.push(Value::Integer(address as i32));
        pc
    }

    /// Emits a branch, call or spawn to `label`, patched on finish.
    pub fn emit_jump(&mut self, op: OpCode, label: CodeLabel) -> usize {
        let pc = self.start(op, OperandKind::Addr);
        self.fixups.push((self.code.len(), label));
        self.code.push(Value::Null);
        pc
    }

    pub fn new_label(&mut self) -> CodeLabel {
        self.labels.push(None);
        CodeLabel(self.labels.len() - 1)
    }

    /// Binds `label` to the current position.
    pub fn place_label(&mut self, label: CodeLabel) {
        let pc = self.code.len();
        match self.labels.get(label.0).copied() {
            Some(None) => self.labels[label.0] = Some(pc),
            Some(Some(_)) => self.fail(BuildError::LabelRedefined(label.0)),
            None => self.fail(BuildError::UndefinedLabel(label.0)),
        }
    }

    /// Resolves label references, appends `EOF` and allocates the code tuple.
    pub fn finish(mut self, heap: &mut GcHeap) -> Result<Value, BuildError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        for (slot, label) in &self.fixups {
            let target = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or(BuildError::UndefinedLabel(label.0))?;
            self.code[*slot] = Value::Integer(target as i32);
        }
        self.code.push(OpCode::OpEof.into());
        Ok(heap.alloc_tuple_from(Value::Null, self.code))
    }
}
