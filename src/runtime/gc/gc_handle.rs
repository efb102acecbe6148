/// Handle into the GC heap.
///
/// A `GcHandle` is a lightweight, copyable index that refers to a symbol or
/// tuple owned by the collector. It is the runtime representation used inside
/// `Value::Symbol` and `Value::Tuple`, and it doubles as the allocation's
/// identity for cycle detection, identity hashing and debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcHandle(pub(crate) u32);

impl GcHandle {
    /// Returns the raw heap slot index backing this handle.
    pub fn index(self) -> u32 {
        self.0
    }
}
