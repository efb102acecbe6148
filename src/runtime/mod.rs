//! Runtime core: values, heap, interpreter and the process system.
//!
//! # Heap Invariant
//! Symbols and tuples live in a single [`gc::GcHeap`] arena and are addressed
//! by [`gc::GcHandle`]. Tuples may form arbitrary graphs, cycles included.
//! Nothing is freed until the embedder calls a collection with roots that cover
//! every value it still needs; [`system::System::collect_garbage`] supplies the
//! roots owned by processes.
//!
//! The logical entities built on tuples (dictionaries, lists, activation
//! records, VM states) are only touched through the typed views in this module
//! tree, never by raw slot index elsewhere.

pub mod activation_record;
pub mod compare;
pub mod config;
pub mod dict;
pub mod fault;
pub mod gc;
pub mod list;
pub mod portray;
pub mod process;
pub mod scheduler;
pub mod stream;
pub mod system;
pub mod value;
pub mod vm;
pub mod vm_state;
