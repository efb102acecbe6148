use std::collections::HashSet;

use crate::runtime::{
    fault::Fault,
    gc::{gc_handle::GcHandle, heap_entry::HeapEntry, heap_object::HeapObject},
    process::ProcessId,
    value::Value,
};

/// Largest tuple, activation record or dictionary layer a running program
/// may allocate, in slots.
pub const MAX_TUPLE_SLOTS: usize = 1 << 24;

/// Checks a program-supplied tuple size against [`MAX_TUPLE_SLOTS`].
pub fn checked_tuple_size(size: i64) -> Result<usize, Fault> {
    match usize::try_from(size) {
        Ok(slots) if slots <= MAX_TUPLE_SLOTS => Ok(slots),
        _ => Err(Fault::InvalidTupleSize(size)),
    }
}

/// Stop-the-world mark-and-sweep heap for symbols and tuples.
///
/// Every allocation is registered in `entries` the moment it is created,
/// independent of any value referring to it; that arena is exactly what the
/// sweep phase walks. There is no way to free an object other than
/// [`GcHeap::collect`], and the heap never decides on its own to collect: the
/// embedder calls it with a root covering everything still considered live.
pub struct GcHeap {
    entries: Vec<Option<HeapEntry>>,
    free_list: Vec<u32>,
    total_collections: usize,
    total_allocations: usize,
    last_freed: usize,
    /// Processes named by a value the last collection reached.
    reached_processes: HashSet<ProcessId>,
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl GcHeap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            total_collections: 0,
            total_allocations: 0,
            last_freed: 0,
            reached_processes: HashSet::new(),
        }
    }

    /// Allocates a new heap object and returns a stable handle to it.
    ///
    /// Freed slots are reused through the internal free-list before growing
    /// the storage vector.
    pub fn alloc(&mut self, object: HeapObject) -> GcHandle {
        self.total_allocations += 1;

        let entry = HeapEntry {
            object,
            marked: false,
        };

        if let Some(idx) = self.free_list.pop() {
            self.entries[idx as usize] = Some(entry);
            GcHandle(idx)
        } else {
            let idx = self.entries.len() as u32;
            self.entries.push(Some(entry));
            GcHandle(idx)
        }
    }

    /// Allocates a symbol holding a copy of `bytes`.
    pub fn alloc_symbol(&mut self, bytes: &[u8]) -> Value {
        Value::Symbol(self.alloc(HeapObject::Symbol(bytes.into())))
    }

    /// Allocates a tuple of `size` slots, all `Null`.
    pub fn alloc_tuple(&mut self, tag: Value, size: usize) -> Value {
        let slots = vec![Value::Null; size].into_boxed_slice();
        Value::Tuple(self.alloc(HeapObject::Tuple { tag, slots }))
    }

    /// Allocates a tuple holding exactly `values`.
    pub fn alloc_tuple_from(&mut self, tag: Value, values: Vec<Value>) -> Value {
        Value::Tuple(self.alloc(HeapObject::Tuple {
            tag,
            slots: values.into_boxed_slice(),
        }))
    }

    /// Returns an immutable reference to a live object by handle.
    pub fn get(&self, handle: GcHandle) -> Result<&HeapObject, Fault> {
        self.entries
            .get(handle.0 as usize)
            .and_then(|entry| entry.as_ref())
            .map(|entry| &entry.object)
            .ok_or(Fault::StaleHandle(handle.0))
    }

    fn get_mut(&mut self, handle: GcHandle) -> Result<&mut HeapObject, Fault> {
        self.entries
            .get_mut(handle.0 as usize)
            .and_then(|entry| entry.as_mut())
            .map(|entry| &mut entry.object)
            .ok_or(Fault::StaleHandle(handle.0))
    }

    /// Returns `true` if the handle still designates a live allocation.
    pub fn contains(&self, handle: GcHandle) -> bool {
        matches!(self.entries.get(handle.0 as usize), Some(Some(_)))
    }

    /// Bytes of a symbol value.
    pub fn symbol_bytes(&self, value: Value) -> Result<&[u8], Fault> {
        match value {
            Value::Symbol(handle) => match self.get(handle)? {
                HeapObject::Symbol(bytes) => Ok(&**bytes),
                HeapObject::Tuple { .. } => Err(Fault::type_mismatch("symbol", "Symbol", &value)),
            },
            other => Err(Fault::type_mismatch("symbol", "Symbol", &other)),
        }
    }

    /// Handle of a tuple value, or a type fault naming `op`.
    pub fn expect_tuple(&self, op: &'static str, value: Value) -> Result<GcHandle, Fault> {
        match value {
            Value::Tuple(handle) => Ok(handle),
            other => Err(Fault::type_mismatch(op, "Tuple", &other)),
        }
    }

    fn tuple_parts(&self, handle: GcHandle) -> Result<(&Value, &[Value]), Fault> {
        match self.get(handle)? {
            HeapObject::Tuple { tag, slots } => Ok((tag, &**slots)),
            HeapObject::Symbol(_) => Err(Fault::type_mismatch(
                "tuple",
                "Tuple",
                &Value::Symbol(handle),
            )),
        }
    }

    pub fn tuple_tag(&self, handle: GcHandle) -> Result<Value, Fault> {
        self.tuple_parts(handle).map(|(tag, _)| *tag)
    }

    pub fn tuple_size(&self, handle: GcHandle) -> Result<usize, Fault> {
        self.tuple_parts(handle).map(|(_, slots)| slots.len())
    }

    /// Borrowed view of all slots, used by traversals.
    pub fn tuple_slots(&self, handle: GcHandle) -> Result<&[Value], Fault> {
        self.tuple_parts(handle).map(|(_, slots)| slots)
    }

    /// Fetches slot `index`; `index` must be below the tuple size.
    pub fn tuple_fetch(&self, handle: GcHandle, index: usize) -> Result<Value, Fault> {
        let (_, slots) = self.tuple_parts(handle)?;
        slots
            .get(index)
            .copied()
            .ok_or(Fault::IndexOutOfBounds {
                index: index as i64,
                size: slots.len(),
            })
    }

    /// Stores into slot `index`; `index` must be below the tuple size.
    pub fn tuple_store(&mut self, handle: GcHandle, index: usize, value: Value) -> Result<(), Fault> {
        match self.get_mut(handle)? {
            HeapObject::Tuple { slots, .. } => {
                let size = slots.len();
                let slot = slots.get_mut(index).ok_or(Fault::IndexOutOfBounds {
                    index: index as i64,
                    size,
                })?;
                *slot = value;
                Ok(())
            }
            HeapObject::Symbol(_) => Err(Fault::type_mismatch(
                "tuple",
                "Tuple",
                &Value::Symbol(handle),
            )),
        }
    }

    /// Fetches an integer slot.
    pub fn tuple_fetch_integer(&self, handle: GcHandle, index: usize) -> Result<i32, Fault> {
        let value = self.tuple_fetch(handle, index)?;
        value
            .as_integer()
            .ok_or_else(|| Fault::type_mismatch("tuple slot", "Integer", &value))
    }

    /// Returns the number of currently live heap entries.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    /// Returns the total number of allocations performed by this heap.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    /// Returns the total number of completed GC cycles.
    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    /// Returns how many objects the most recent collection freed.
    pub fn last_freed(&self) -> usize {
        self.last_freed
    }

    /// Processes referred to by anything the most recent collection kept.
    pub fn reached_processes(&self) -> &HashSet<ProcessId> {
        &self.reached_processes
    }

    /// Approximate bytes held by live objects.
    pub fn live_bytes(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .map(|entry| entry.object.shallow_size_bytes())
            .sum()
    }

    /// Runs a full stop-the-world mark-and-sweep collection rooted at `root`.
    ///
    /// Everything transitively reachable from `root` survives, everything
    /// else is freed. Cycles are fine: a tuple's contents are traced only the
    /// first time the tuple is marked.
    pub fn collect(&mut self, root: &Value) {
        self.collect_many(std::slice::from_ref(root));
    }

    /// Same as [`Self::collect`] with several roots marked before one sweep.
    pub fn collect_many(&mut self, roots: &[Value]) {
        let mut worklist: Vec<Value> = Vec::with_capacity(16);
        self.reached_processes.clear();
        for root in roots {
            worklist.push(*root);
            self.mark(&mut worklist);
        }
        self.sweep();
        self.total_collections += 1;
    }

    fn mark(&mut self, worklist: &mut Vec<Value>) {
        while let Some(value) = worklist.pop() {
            if let Value::Process(id) = value {
                self.reached_processes.insert(id);
                continue;
            }
            let Some(handle) = value.handle() else {
                continue;
            };
            let idx = handle.0 as usize;

            // Mark first so cycles/shared nodes are visited once.
            let Some(Some(entry)) = self.entries.get_mut(idx) else {
                continue;
            };
            if entry.marked {
                continue;
            }
            entry.marked = true;

            if let HeapObject::Tuple { tag, slots } = &entry.object {
                worklist.push(*tag);
                worklist.extend(
                    slots
                        .iter()
                        .filter(|slot| slot.is_structured() || slot.as_process().is_some()),
                );
            }
        }
    }

    fn sweep(&mut self) {
        let mut freed = 0;
        for (i, slot) in self.entries.iter_mut().enumerate() {
            if let Some(entry) = slot {
                if entry.marked {
                    entry.marked = false;
                } else {
                    *slot = None;
                    self.free_list.push(i as u32);
                    freed += 1;
                }
            }
        }
        self.last_freed = freed;
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        gc::gc_heap::GcHeap,
        value::{TAG_LIST, Value},
    };

    #[test]
    fn test_alloc_and_fetch() {
        let mut heap = GcHeap::new();
        let t = heap.alloc_tuple(Value::Integer(7), 3);
        let h = t.handle().unwrap();
        assert_eq!(heap.tuple_size(h).unwrap(), 3);
        assert_eq!(heap.tuple_tag(h).unwrap(), Value::Integer(7));
        assert_eq!(heap.tuple_fetch(h, 2).unwrap(), Value::Null);
        heap.tuple_store(h, 1, Value::Boolean(true)).unwrap();
        assert_eq!(heap.tuple_fetch(h, 1).unwrap(), Value::Boolean(true));
        assert_eq!(heap.live_count(), 1);
    }

    #[test]
    fn test_fetch_out_of_bounds_is_a_fault() {
        let mut heap = GcHeap::new();
        let h = heap.alloc_tuple(Value::Null, 2).handle().unwrap();
        assert!(heap.tuple_fetch(h, 2).is_err());
        assert!(heap.tuple_store(h, 5, Value::Null).is_err());
    }

    #[test]
    fn test_collect_frees_unreachable() {
        let mut heap = GcHeap::new();
        for i in 0..100 {
            heap.alloc_tuple(Value::Integer(i), 2);
        }
        assert_eq!(heap.live_count(), 100);

        heap.collect(&Value::Null);
        assert_eq!(heap.live_count(), 0);
        assert_eq!(heap.last_freed(), 100);
        assert_eq!(heap.free_list.len(), 100);
    }

    #[test]
    fn test_collect_traces_nested_tuples_and_tags() {
        let mut heap = GcHeap::new();
        let sym = heap.alloc_symbol(b"tag");
        let inner = heap.alloc_tuple(sym, 1);
        let outer = heap.alloc_tuple(TAG_LIST, 2);
        heap.tuple_store(outer.handle().unwrap(), 0, inner).unwrap();

        for _ in 0..10 {
            heap.alloc_symbol(b"garbage");
        }
        assert_eq!(heap.live_count(), 13);

        heap.collect(&outer);
        assert_eq!(heap.live_count(), 3);
        assert!(heap.contains(sym.handle().unwrap()));
        assert!(heap.contains(inner.handle().unwrap()));
    }

    #[test]
    fn test_self_cycle_survives_when_rooted_and_dies_otherwise() {
        let mut heap = GcHeap::new();
        let t = heap.alloc_tuple(Value::Null, 1);
        let h = t.handle().unwrap();
        heap.tuple_store(h, 0, t).unwrap();

        heap.collect(&t);
        assert!(heap.contains(h));

        heap.collect(&Value::Null);
        assert!(!heap.contains(h));
    }

    #[test]
    fn test_mutual_cycle_is_collected_when_unreachable() {
        let mut heap = GcHeap::new();
        let a = heap.alloc_tuple(Value::Null, 1);
        let b = heap.alloc_tuple(Value::Null, 1);
        heap.tuple_store(a.handle().unwrap(), 0, b).unwrap();
        heap.tuple_store(b.handle().unwrap(), 0, a).unwrap();
        let keep = heap.alloc_symbol(b"keep");

        heap.collect(&keep);
        assert_eq!(heap.live_count(), 1);
        assert_eq!(heap.last_freed(), 2);
    }

    #[test]
    fn test_free_list_reuse() {
        let mut heap = GcHeap::new();
        heap.alloc_symbol(b"a");
        heap.alloc_symbol(b"b");
        heap.collect(&Value::Null);
        assert_eq!(heap.free_list.len(), 2);

        heap.alloc_symbol(b"c");
        assert_eq!(heap.entries.len(), 2);
        assert_eq!(heap.total_allocations(), 3);
    }

    #[test]
    fn test_collect_many_keeps_every_root() {
        let mut heap = GcHeap::new();
        let a = heap.alloc_symbol(b"a");
        let b = heap.alloc_symbol(b"b");
        heap.alloc_symbol(b"c");
        heap.collect_many(&[a, b]);
        assert_eq!(heap.live_count(), 2);
        assert_eq!(heap.total_collections(), 1);
    }

    #[test]
    fn test_long_chain_does_not_overflow_native_stack() {
        let mut heap = GcHeap::new();
        let mut list = Value::Null;
        for i in 0..200_000 {
            let cell = heap.alloc_tuple(TAG_LIST, 2);
            let h = cell.handle().unwrap();
            heap.tuple_store(h, 0, Value::Integer(i)).unwrap();
            heap.tuple_store(h, 1, list).unwrap();
            list = cell;
        }
        heap.collect(&list);
        assert_eq!(heap.live_count(), 200_000);
    }
}
