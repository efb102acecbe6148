use crate::runtime::{
    fault::Fault,
    gc::{GcHandle, GcHeap, HeapObject, checked_tuple_size},
    value::{TAG_AR, Value},
};

/// Slots before the operand area: `[caller, enclosing, resume-pc, stack-top]`.
pub const AR_HEADER: usize = 4;
const CALLER: usize = 0;
const ENCLOSING: usize = 1;
const RESUME_PC: usize = 2;
const TOP: usize = 3;

/// Typed view of an activation record tuple.
///
/// The operand area doubles as the local-variable area: local `i` is slot
/// `AR_HEADER + i`, and pushes grow upward from `AR_HEADER`. The stored
/// stack-top always stays within `[AR_HEADER, size]`; every push, pop and
/// transfer checks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationRecord(GcHandle);

impl ActivationRecord {
    /// Allocates a record with `operand_slots` free slots.
    pub fn new(
        heap: &mut GcHeap,
        operand_slots: i64,
        caller: Value,
        enclosing: Value,
        resume_pc: usize,
    ) -> Result<Self, Fault> {
        let operand_slots = checked_tuple_size(operand_slots)?;
        let mut slots = vec![Value::Null; operand_slots + AR_HEADER];
        slots[CALLER] = caller;
        slots[ENCLOSING] = enclosing;
        slots[RESUME_PC] = Value::Integer(resume_pc as i32);
        slots[TOP] = Value::Integer(AR_HEADER as i32);
        Ok(Self(heap.alloc(HeapObject::Tuple {
            tag: TAG_AR,
            slots: slots.into_boxed_slice(),
        })))
    }

    /// Checks that `value` is an activation record.
    pub fn from_value(heap: &GcHeap, op: &'static str, value: Value) -> Result<Self, Fault> {
        let handle = heap.expect_tuple(op, value)?;
        if heap.tuple_tag(handle)? != TAG_AR || heap.tuple_size(handle)? < AR_HEADER {
            return Err(Fault::type_mismatch(op, "ActivationRecord", &value));
        }
        Ok(Self(handle))
    }

    pub fn value(self) -> Value {
        Value::Tuple(self.0)
    }

    pub fn caller(self, heap: &GcHeap) -> Result<Option<Self>, Fault> {
        match heap.tuple_fetch(self.0, CALLER)? {
            Value::Null => Ok(None),
            other => Self::from_value(heap, "caller", other).map(Some),
        }
    }

    pub fn set_caller(self, heap: &mut GcHeap, caller: Option<Self>) -> Result<(), Fault> {
        let value = caller.map_or(Value::Null, Self::value);
        heap.tuple_store(self.0, CALLER, value)
    }

    pub fn enclosing(self, heap: &GcHeap) -> Result<Value, Fault> {
        heap.tuple_fetch(self.0, ENCLOSING)
    }

    pub fn resume_pc(self, heap: &GcHeap) -> Result<usize, Fault> {
        let pc = heap.tuple_fetch_integer(self.0, RESUME_PC)?;
        usize::try_from(pc).map_err(|_| Fault::NegativePc(pc))
    }

    pub fn set_resume_pc(self, heap: &mut GcHeap, pc: usize) -> Result<(), Fault> {
        heap.tuple_store(self.0, RESUME_PC, Value::Integer(pc as i32))
    }

    /// Index one past the topmost operand.
    pub fn top(self, heap: &GcHeap) -> Result<usize, Fault> {
        let top = heap.tuple_fetch_integer(self.0, TOP)?;
        let size = heap.tuple_size(self.0)?;
        match usize::try_from(top) {
            Ok(top) if (AR_HEADER..=size).contains(&top) => Ok(top),
            _ => Err(Fault::IndexOutOfBounds {
                index: top as i64,
                size,
            }),
        }
    }

    fn set_top(self, heap: &mut GcHeap, top: usize) -> Result<(), Fault> {
        heap.tuple_store(self.0, TOP, Value::Integer(top as i32))
    }

    /// Number of values currently on the operand stack.
    pub fn depth(self, heap: &GcHeap) -> Result<usize, Fault> {
        Ok(self.top(heap)? - AR_HEADER)
    }

    pub fn capacity(self, heap: &GcHeap) -> Result<usize, Fault> {
        Ok(heap.tuple_size(self.0)? - AR_HEADER)
    }

    pub fn push(self, heap: &mut GcHeap, value: Value) -> Result<(), Fault> {
        let top = self.top(heap)?;
        let size = heap.tuple_size(self.0)?;
        if top >= size {
            return Err(Fault::StackOverflow {
                capacity: size - AR_HEADER,
            });
        }
        heap.tuple_store(self.0, top, value)?;
        self.set_top(heap, top + 1)
    }

    pub fn pop(self, heap: &mut GcHeap) -> Result<Value, Fault> {
        let top = self.top(heap)?;
        if top <= AR_HEADER {
            return Err(Fault::StackUnderflow);
        }
        let value = heap.tuple_fetch(self.0, top - 1)?;
        self.set_top(heap, top - 1)?;
        Ok(value)
    }

    fn local_slot(self, heap: &GcHeap, index: i32) -> Result<usize, Fault> {
        let size = heap.tuple_size(self.0)?;
        match usize::try_from(index) {
            Ok(i) if AR_HEADER + i < size => Ok(AR_HEADER + i),
            _ => Err(Fault::IndexOutOfBounds {
                index: index as i64,
                size: size - AR_HEADER,
            }),
        }
    }

    /// Reads local `index` (operand-area slot `index`).
    pub fn local(self, heap: &GcHeap, index: i32) -> Result<Value, Fault> {
        let slot = self.local_slot(heap, index)?;
        heap.tuple_fetch(self.0, slot)
    }

    pub fn set_local(self, heap: &mut GcHeap, index: i32, value: Value) -> Result<(), Fault> {
        let slot = self.local_slot(heap, index)?;
        heap.tuple_store(self.0, slot, value)
    }

    /// Moves the top `count` operands of `self` onto `to`, keeping their order.
    pub fn transfer(self, heap: &mut GcHeap, to: Self, count: i32) -> Result<(), Fault> {
        let count = usize::try_from(count).map_err(|_| Fault::IndexOutOfBounds {
            index: count as i64,
            size: 0,
        })?;
        let from_top = self.top(heap)?;
        if from_top - AR_HEADER < count {
            return Err(Fault::StackUnderflow);
        }
        let to_top = to.top(heap)?;
        let to_size = heap.tuple_size(to.0)?;
        if to_top + count > to_size {
            return Err(Fault::StackOverflow {
                capacity: to_size - AR_HEADER,
            });
        }
        // Read everything first: `to` may be `self`.
        let moved: Vec<Value> = heap.tuple_slots(self.0)?[from_top - count..from_top].to_vec();
        self.set_top(heap, from_top - count)?;
        let to_top = to.top(heap)?;
        for (i, value) in moved.into_iter().enumerate() {
            heap.tuple_store(to.0, to_top + i, value)?;
        }
        to.set_top(heap, to_top + count)
    }
}
