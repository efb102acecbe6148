use crate::runtime::{
    activation_record::ActivationRecord,
    fault::Fault,
    gc::{GcHandle, GcHeap, HeapObject},
    value::{TAG_VM, Value},
};

const PC: usize = 0;
const AR: usize = 1;
const IS_DIRECT: usize = 2;
const CODE: usize = 3;
const VM_SIZE: usize = 4;

/// Typed view of a VM state tuple: `[pc, current-AR, is-direct-threaded, code]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmState(GcHandle);

impl VmState {
    /// Fresh machine at pc 0 with no activation record.
    pub fn new(heap: &mut GcHeap, code: Value) -> Result<Self, Fault> {
        heap.expect_tuple("vm", code)?;
        let slots = vec![
            Value::Integer(0),
            Value::Null,
            Value::Boolean(false),
            code,
        ];
        Ok(Self(heap.alloc(HeapObject::Tuple {
            tag: TAG_VM,
            slots: slots.into_boxed_slice(),
        })))
    }

    pub fn from_value(heap: &GcHeap, value: Value) -> Result<Self, Fault> {
        let handle = heap.expect_tuple("vm", value)?;
        if heap.tuple_tag(handle)? != TAG_VM || heap.tuple_size(handle)? != VM_SIZE {
            return Err(Fault::type_mismatch("vm", "VmState", &value));
        }
        Ok(Self(handle))
    }

    pub fn value(self) -> Value {
        Value::Tuple(self.0)
    }

    /// New machine sharing this one's code and threading flag, starting at
    /// `pc` with no activation record.
    pub fn spawn_at(self, heap: &mut GcHeap, pc: usize) -> Result<Self, Fault> {
        let spawned = Self::new(heap, self.code(heap)?)?;
        spawned.set_threaded(heap, self.is_threaded(heap)?)?;
        spawned.set_pc(heap, pc)?;
        Ok(spawned)
    }

    pub fn pc(self, heap: &GcHeap) -> Result<usize, Fault> {
        let pc = heap.tuple_fetch_integer(self.0, PC)?;
        usize::try_from(pc).map_err(|_| Fault::NegativePc(pc))
    }

    pub fn set_pc(self, heap: &mut GcHeap, pc: usize) -> Result<(), Fault> {
        heap.tuple_store(self.0, PC, Value::Integer(pc as i32))
    }

    pub fn ar(self, heap: &GcHeap) -> Result<Option<ActivationRecord>, Fault> {
        match heap.tuple_fetch(self.0, AR)? {
            Value::Null => Ok(None),
            other => ActivationRecord::from_value(heap, "vm", other).map(Some),
        }
    }

    pub fn set_ar(self, heap: &mut GcHeap, ar: Option<ActivationRecord>) -> Result<(), Fault> {
        heap.tuple_store(self.0, AR, ar.map_or(Value::Null, ActivationRecord::value))
    }

    pub fn is_threaded(self, heap: &GcHeap) -> Result<bool, Fault> {
        let flag = heap.tuple_fetch(self.0, IS_DIRECT)?;
        match flag {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Fault::type_mismatch("vm", "Boolean", &other)),
        }
    }

    pub fn set_threaded(self, heap: &mut GcHeap, threaded: bool) -> Result<(), Fault> {
        heap.tuple_store(self.0, IS_DIRECT, Value::Boolean(threaded))
    }

    pub fn code(self, heap: &GcHeap) -> Result<Value, Fault> {
        heap.tuple_fetch(self.0, CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::VmState;
    use crate::runtime::{activation_record::ActivationRecord, gc::GcHeap, value::Value};

    #[test]
    fn spawned_state_shares_code_and_threading() {
        let mut heap = GcHeap::new();
        let code = heap.alloc_tuple_from(Value::Null, vec![Value::Integer(30)]);
        let vm = VmState::new(&mut heap, code).unwrap();
        let ar = ActivationRecord::new(&mut heap, 2, Value::Null, Value::Null, 0).unwrap();
        vm.set_ar(&mut heap, Some(ar)).unwrap();
        vm.set_threaded(&mut heap, true).unwrap();

        let child = vm.spawn_at(&mut heap, 7).unwrap();
        assert_eq!(child.code(&heap).unwrap(), code);
        assert!(child.is_threaded(&heap).unwrap());
        assert_eq!(child.pc(&heap).unwrap(), 7);
        assert_eq!(child.ar(&heap).unwrap(), None);
        assert_eq!(vm.ar(&heap).unwrap(), Some(ar));
    }

    #[test]
    fn code_must_be_a_tuple() {
        let mut heap = GcHeap::new();
        assert!(VmState::new(&mut heap, Value::Integer(1)).is_err());
    }
}
