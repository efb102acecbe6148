pub mod gc_handle;
pub mod gc_heap;
pub(crate) mod heap_entry;
pub mod heap_object;

pub use gc_handle::GcHandle;
pub use gc_heap::{GcHeap, MAX_TUPLE_SLOTS, checked_tuple_size};
pub use heap_object::HeapObject;
