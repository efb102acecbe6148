use std::fmt;

use crate::runtime::{gc::GcHandle, process::ProcessId};

/// Runtime value held in tuple slots, activation records and mailboxes.
///
/// ## Memory Management Model
///
/// `Value` is `Copy`: the scalar variants carry their payload inline, while
/// `Symbol` and `Tuple` carry a [`GcHandle`] into the [`GcHeap`] arena. Copying
/// one of those duplicates the handle, never the allocation, so many values may
/// alias one heap object. Heap objects live as long as they are reachable from
/// the root handed to [`GcHeap::collect`]; scope plays no part.
///
/// Equality of structured values is structural and lives in
/// [`crate::runtime::compare`]. The derived `PartialEq` is handle identity and
/// is only meant for tests and for the collector's bookkeeping.
///
/// [`GcHeap`]: crate::runtime::gc::GcHeap
/// [`GcHeap::collect`]: crate::runtime::gc::GcHeap::collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Value {
    /// Absence of value; also the empty list and the "not found" answer.
    #[default]
    Null,
    /// 32-bit signed integer.
    Integer(i32),
    /// Boolean value.
    Boolean(bool),
    /// Reference to a process in the process table.
    Process(ProcessId),
    /// Opaque dispatch token written by the threading pass.
    Label(Label),
    /// Immutable byte string on the heap.
    Symbol(GcHandle),
    /// Fixed-size tagged tuple on the heap.
    Tuple(GcHandle),
}

/// Tag of VM state tuples.
pub const TAG_VM: Value = Value::Integer(1);
/// Tag of activation record tuples.
pub const TAG_AR: Value = Value::Integer(3);
/// Tag of dictionary layers.
pub const TAG_DICT: Value = Value::Integer(4);
/// Tag of list cells.
pub const TAG_LIST: Value = Value::Integer(5);
/// Tag of dictionary iterators.
pub const TAG_ITER: Value = Value::Integer(6);

/// Direct-threaded dispatch token: an index into the interpreter's handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl Label {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Outcome of [`crate::runtime::compare::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    Less,
    Greater,
    Incomparable,
}

impl Value {
    /// Persisted type code of this value (see the binary term format).
    pub fn type_code(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::Boolean(_) => 2,
            Value::Process(_) => 3,
            Value::Label(_) => 4,
            Value::Symbol(_) => 9,
            Value::Tuple(_) => 10,
        }
    }

    /// Returns the canonical type label used in faults and traces.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Integer(_) => "Integer",
            Value::Boolean(_) => "Boolean",
            Value::Process(_) => "Process",
            Value::Label(_) => "Label",
            Value::Symbol(_) => "Symbol",
            Value::Tuple(_) => "Tuple",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for the kinds that live on the heap.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Symbol(_) | Value::Tuple(_))
    }

    /// Heap handle of a structured value.
    pub fn handle(&self) -> Option<GcHandle> {
        match self {
            Value::Symbol(handle) | Value::Tuple(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_process(&self) -> Option<ProcessId> {
        match self {
            Value::Process(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<ProcessId> for Value {
    fn from(value: ProcessId) -> Self {
        Value::Process(value)
    }
}

/// Heap-free rendering, used by traces. Structured values print their handle;
/// use [`crate::runtime::portray`] for the full textual form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "[]"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Process(id) => write!(f, "PROCESS#[{}]", id.index()),
            Value::Label(label) => write!(f, "LABEL#[{}]", label.index()),
            Value::Symbol(handle) => write!(f, "SYMBOL#[{}]", handle.index()),
            Value::Tuple(handle) => write!(f, "TUPLE#[{}]", handle.index()),
        }
    }
}
