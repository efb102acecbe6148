use crate::runtime::gc::heap_object::HeapObject;

pub(crate) struct HeapEntry {
    pub(crate) object: HeapObject,
    pub(crate) marked: bool,
}
