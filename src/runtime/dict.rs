use crate::runtime::{
    compare::equal,
    fault::Fault,
    gc::{GcHandle, GcHeap, HeapObject, MAX_TUPLE_SLOTS},
    value::{TAG_DICT, TAG_ITER, Value},
};

/// Slots before the first key in every layer: `[entry-count, next-layer]`.
pub const DICT_HEADER: usize = 2;
const COUNT: usize = 0;
const NEXT: usize = 1;

/// Hash used to pick a dictionary slot.
///
/// Integers and booleans hash to their numeric value, symbols to a shifted
/// byte sum. Tuples, processes and labels hash by identity, so two
/// structurally equal tuples with different allocations land in different
/// slots; such hashes do not survive serialization.
pub fn hash_value(heap: &GcHeap, value: Value) -> i32 {
    match value {
        Value::Null => 0,
        Value::Integer(i) => i,
        Value::Boolean(b) => b as i32,
        Value::Process(id) => id.index() as i32,
        Value::Label(label) => label.index() as i32,
        Value::Tuple(handle) => handle.index() as i32,
        Value::Symbol(_) => heap
            .symbol_bytes(value)
            .map(|bytes| {
                bytes.iter().enumerate().fold(0i32, |sum, (i, byte)| {
                    sum.wrapping_add((*byte as i8 as i32).wrapping_shl((i & 0xf) as u32))
                })
            })
            .unwrap_or(0),
    }
}

/// Typed view of a dictionary: a chain of `dict`-tagged layers.
///
/// Each layer is `[count, next, k0, v0, k1, v1, ...]`. A key hashes to the
/// same slot index in every layer; collisions spill into later layers.
/// A key lives in at most one layer, `Null` marks an empty slot and storing
/// `Null` deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dict(GcHandle);

impl Dict {
    /// Allocates an empty dictionary whose layers hold `layer_size` key/value slots.
    pub fn new(heap: &mut GcHeap, layer_size: i64) -> Result<Self, Fault> {
        if layer_size < 2 || layer_size % 2 != 0 || layer_size > MAX_TUPLE_SLOTS as i64 {
            return Err(Fault::InvalidLayerSize(layer_size));
        }
        Ok(Self::new_layer(heap, layer_size as usize))
    }

    fn new_layer(heap: &mut GcHeap, layer_size: usize) -> Self {
        let mut slots = vec![Value::Null; layer_size + DICT_HEADER];
        slots[COUNT] = Value::Integer(0);
        Dict(heap.alloc(HeapObject::Tuple {
            tag: TAG_DICT,
            slots: slots.into_boxed_slice(),
        }))
    }

    /// Checks that `value` is a dictionary layer.
    pub fn from_value(heap: &GcHeap, op: &'static str, value: Value) -> Result<Self, Fault> {
        let handle = heap.expect_tuple(op, value)?;
        if heap.tuple_tag(handle)? != TAG_DICT || heap.tuple_size(handle)? < DICT_HEADER + 2 {
            return Err(Fault::type_mismatch(op, "Dict", &value));
        }
        Ok(Dict(handle))
    }

    pub fn handle(self) -> GcHandle {
        self.0
    }

    pub fn value(self) -> Value {
        Value::Tuple(self.0)
    }

    /// Key/value slots per layer.
    pub fn layer_size(self, heap: &GcHeap) -> Result<usize, Fault> {
        Ok(heap.tuple_size(self.0)? - DICT_HEADER)
    }

    fn slot_for(self, heap: &GcHeap, key: Value) -> Result<usize, Fault> {
        // Buckets are picked from the hash read as unsigned.
        let buckets = (self.layer_size(heap)? / 2) as u32;
        let bucket = (hash_value(heap, key) as u32 % buckets) as usize;
        Ok(bucket * 2 + DICT_HEADER)
    }

    fn next_layer(heap: &GcHeap, layer: GcHandle) -> Result<Option<GcHandle>, Fault> {
        match heap.tuple_fetch(layer, NEXT)? {
            Value::Null => Ok(None),
            Value::Tuple(next) => Ok(Some(next)),
            other => Err(Fault::type_mismatch("dict", "Dict", &other)),
        }
    }

    fn count(heap: &GcHeap, layer: GcHandle) -> Result<i32, Fault> {
        match heap.tuple_fetch(layer, COUNT)? {
            Value::Null => Ok(0),
            Value::Integer(n) => Ok(n),
            other => Err(Fault::type_mismatch("dict", "Integer", &other)),
        }
    }

    /// Finds the layer holding `key` at `slot`, with the layer before it.
    fn find(
        self,
        heap: &GcHeap,
        key: Value,
        slot: usize,
    ) -> Result<Option<(Option<GcHandle>, GcHandle)>, Fault> {
        let mut prev = None;
        let mut layer = Some(self.0);
        while let Some(current) = layer {
            let stored = heap.tuple_fetch(current, slot)?;
            if !stored.is_null() && equal(heap, stored, key) {
                return Ok(Some((prev, current)));
            }
            prev = Some(current);
            layer = Self::next_layer(heap, current)?;
        }
        Ok(None)
    }

    /// Value stored under `key`, or `Null` when absent.
    pub fn fetch(self, heap: &GcHeap, key: Value) -> Result<Value, Fault> {
        if key.is_null() {
            return Ok(Value::Null);
        }
        let slot = self.slot_for(heap, key)?;
        match self.find(heap, key, slot)? {
            Some((_, layer)) => heap.tuple_fetch(layer, slot + 1),
            None => Ok(Value::Null),
        }
    }

    /// Inserts, overwrites, or (when `value` is `Null`) deletes `key`.
    pub fn store(self, heap: &mut GcHeap, key: Value, value: Value) -> Result<(), Fault> {
        if key.is_null() {
            return Ok(());
        }
        let slot = self.slot_for(heap, key)?;

        if let Some((prev, layer)) = self.find(heap, key, slot)? {
            if !value.is_null() {
                return heap.tuple_store(layer, slot + 1, value);
            }
            heap.tuple_store(layer, slot, Value::Null)?;
            heap.tuple_store(layer, slot + 1, Value::Null)?;
            let remaining = Self::count(heap, layer)? - 1;
            heap.tuple_store(layer, COUNT, Value::Integer(remaining))?;
            if let (0, Some(prev)) = (remaining, prev) {
                let next = heap.tuple_fetch(layer, NEXT)?;
                heap.tuple_store(prev, NEXT, next)?;
            }
            return Ok(());
        }

        if value.is_null() {
            return Ok(());
        }

        let mut last = self.0;
        let mut layer = Some(self.0);
        while let Some(current) = layer {
            if heap.tuple_fetch(current, slot)?.is_null() {
                return Self::write_entry(heap, current, slot, key, value);
            }
            last = current;
            layer = Self::next_layer(heap, current)?;
        }

        let fresh = Self::new_layer(heap, self.layer_size(heap)?);
        heap.tuple_store(last, NEXT, fresh.value())?;
        Self::write_entry(heap, fresh.0, slot, key, value)
    }

    fn write_entry(
        heap: &mut GcHeap,
        layer: GcHandle,
        slot: usize,
        key: Value,
        value: Value,
    ) -> Result<(), Fault> {
        heap.tuple_store(layer, slot, key)?;
        heap.tuple_store(layer, slot + 1, value)?;
        let count = Self::count(heap, layer)?;
        heap.tuple_store(layer, COUNT, Value::Integer(count + 1))
    }

    /// Number of entries across every layer.
    pub fn len(self, heap: &GcHeap) -> Result<usize, Fault> {
        let mut total = 0usize;
        let mut layer = Some(self.0);
        while let Some(current) = layer {
            total += Self::count(heap, current)?.max(0) as usize;
            layer = Self::next_layer(heap, current)?;
        }
        Ok(total)
    }

    pub fn is_empty(self, heap: &GcHeap) -> Result<bool, Fault> {
        Ok(self.len(heap)? == 0)
    }

    /// Number of layers in the chain.
    pub fn layer_count(self, heap: &GcHeap) -> Result<usize, Fault> {
        let mut layers = 0;
        let mut layer = Some(self.0);
        while let Some(current) = layer {
            layers += 1;
            layer = Self::next_layer(heap, current)?;
        }
        Ok(layers)
    }

    /// Borrowing iterator over `(key, value)` pairs in layer order, then slot order.
    pub fn entries(self, heap: &GcHeap) -> DictEntries<'_> {
        DictEntries {
            heap,
            layer: Some(self.0),
            position: DICT_HEADER,
        }
    }
}

/// Iterator returned by [`Dict::entries`].
pub struct DictEntries<'h> {
    heap: &'h GcHeap,
    layer: Option<GcHandle>,
    position: usize,
}

impl Iterator for DictEntries<'_> {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let layer = self.layer?;
            let slots = self.heap.tuple_slots(layer).ok()?;
            while self.position + 1 < slots.len() {
                let (key, value) = (slots[self.position], slots[self.position + 1]);
                self.position += 2;
                if !key.is_null() {
                    return Some((key, value));
                }
            }
            self.layer = Dict::next_layer(self.heap, layer).ok().flatten();
            self.position = DICT_HEADER;
        }
    }
}

/// Heap-resident dictionary iterator: a tuple tagged `iter` holding
/// `[current-layer, position]`.
///
/// Unlike [`DictEntries`] it can be stored in tuples and activation records
/// and survives across interpreter quanta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictIter(GcHandle);

const ITER_LAYER: usize = 0;
const ITER_POSITION: usize = 1;

impl DictIter {
    pub fn new(heap: &mut GcHeap, dict: Dict) -> Self {
        let slots = vec![dict.value(), Value::Integer(DICT_HEADER as i32)];
        DictIter(heap.alloc(HeapObject::Tuple {
            tag: TAG_ITER,
            slots: slots.into_boxed_slice(),
        }))
    }

    pub fn from_value(heap: &GcHeap, op: &'static str, value: Value) -> Result<Self, Fault> {
        let handle = heap.expect_tuple(op, value)?;
        if heap.tuple_tag(handle)? != TAG_ITER || heap.tuple_size(handle)? != 2 {
            return Err(Fault::type_mismatch(op, "DictIter", &value));
        }
        Ok(DictIter(handle))
    }

    pub fn value(self) -> Value {
        Value::Tuple(self.0)
    }

    fn position(self, heap: &GcHeap) -> Result<usize, Fault> {
        let position = heap.tuple_fetch_integer(self.0, ITER_POSITION)?;
        Ok(position.max(0) as usize)
    }

    /// Moves onto the next occupied slot at or after the current position,
    /// crossing into later layers. Returns the layer and slot, or `None` at
    /// the end.
    fn settle(self, heap: &mut GcHeap) -> Result<Option<(GcHandle, usize)>, Fault> {
        let mut position = self.position(heap)?;
        loop {
            let layer = match heap.tuple_fetch(self.0, ITER_LAYER)? {
                Value::Null => return Ok(None),
                Value::Tuple(layer) => layer,
                other => return Err(Fault::type_mismatch("dict iterator", "Dict", &other)),
            };
            let size = heap.tuple_size(layer)?;
            while position + 1 < size {
                if !heap.tuple_fetch(layer, position)?.is_null() {
                    heap.tuple_store(self.0, ITER_POSITION, Value::Integer(position as i32))?;
                    return Ok(Some((layer, position)));
                }
                position += 2;
            }
            let next = heap.tuple_fetch(layer, NEXT)?;
            heap.tuple_store(self.0, ITER_LAYER, next)?;
            position = DICT_HEADER;
            heap.tuple_store(self.0, ITER_POSITION, Value::Integer(position as i32))?;
        }
    }

    /// Key under the iterator, or `Null` once exhausted.
    pub fn current_key(self, heap: &mut GcHeap) -> Result<Value, Fault> {
        match self.settle(heap)? {
            Some((layer, slot)) => heap.tuple_fetch(layer, slot),
            None => Ok(Value::Null),
        }
    }

    /// Value under the iterator, or `Null` once exhausted.
    pub fn current_value(self, heap: &mut GcHeap) -> Result<Value, Fault> {
        match self.settle(heap)? {
            Some((layer, slot)) => heap.tuple_fetch(layer, slot + 1),
            None => Ok(Value::Null),
        }
    }

    /// Steps past the current entry.
    pub fn advance(self, heap: &mut GcHeap) -> Result<(), Fault> {
        if let Some((_, slot)) = self.settle(heap)? {
            heap.tuple_store(self.0, ITER_POSITION, Value::Integer(slot as i32 + 2))?;
        }
        Ok(())
    }

    pub fn is_done(self, heap: &mut GcHeap) -> Result<bool, Fault> {
        Ok(self.settle(heap)?.is_none())
    }
}

#[cfg(test)]
#[path = "dict_test.rs"]
mod dict_test;
