use crate::runtime::value::Value;

/// Objects that live on the GC-managed heap.
///
/// The tuple layout is shared by every logical role (generic tuple,
/// dictionary layer, list cell, activation record, VM state, iterator); the
/// role is told apart by `tag` and handled by the typed views in
/// [`crate::runtime`].
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// Immutable byte string.
    Symbol(Box<[u8]>),
    /// Fixed-size slot array plus its tag. The slot count never changes.
    Tuple { tag: Value, slots: Box<[Value]> },
}

impl HeapObject {
    /// Estimates the shallow byte size of this object, including inline storage.
    pub fn shallow_size_bytes(&self) -> usize {
        let base = std::mem::size_of::<Self>();
        match self {
            HeapObject::Symbol(bytes) => base + bytes.len(),
            HeapObject::Tuple { slots, .. } => base + std::mem::size_of_val(&**slots),
        }
    }
}
