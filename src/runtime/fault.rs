use std::io;

use thiserror::Error;

/// Typed runtime fault.
///
/// Every violated interpreter precondition surfaces as one of these in every
/// build profile; nothing is downgraded to a debug-only assertion.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("{op}: expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("index {index} out of bounds for tuple of size {size}")]
    IndexOutOfBounds { index: i64, size: usize },
    #[error("activation record overflow: operand area of {capacity} slots is full")]
    StackOverflow { capacity: usize },
    #[error("activation record underflow")]
    StackUnderflow,
    #[error("{op}: no active activation record")]
    NoActivationRecord { op: &'static str },
    #[error("RET: activation record has no caller")]
    NoCaller,
    #[error("opcode {0} not in range")]
    BadOpcode(i32),
    #[error("EOF sentinel executed at pc {pc}")]
    ExecutedEof { pc: usize },
    #[error("pc {pc} outside code of length {len}")]
    PcOutOfRange { pc: usize, len: usize },
    #[error("negative program counter {0}")]
    NegativePc(i32),
    #[error("division by zero")]
    DivisionByZero,
    #[error("cannot serialize a cyclic term")]
    CyclicTerm,
    #[error("dictionary layer size must be a positive even number within the tuple limit, got {0}")]
    InvalidLayerSize(i64),
    #[error("tuple size {0} is negative or too large")]
    InvalidTupleSize(i64),
    #[error("no such process: {0}")]
    NoSuchProcess(u32),
    #[error("stale heap handle {0}")]
    StaleHandle(u32),
    #[error("could not open '{path}' in mode '{mode}': {source}")]
    Open {
        path: String,
        mode: String,
        #[source]
        source: io::Error,
    },
    #[error("stream i/o failed: {0}")]
    Io(#[from] io::Error),
}

impl Fault {
    pub(crate) fn type_mismatch(
        op: &'static str,
        expected: &'static str,
        found: &crate::runtime::value::Value,
    ) -> Self {
        Fault::TypeMismatch {
            op,
            expected,
            found: found.type_name(),
        }
    }
}
