use std::{cmp::Ordering, collections::HashSet};

use crate::runtime::{
    gc::{GcHandle, GcHeap},
    value::{Comparison, Value},
};

/// Three-way structural comparison.
///
/// Values of different kinds are `Incomparable`. Tuples compare by identity
/// first, then tag, then size, then element by element. A tuple that is
/// already being compared further up the current comparison makes the nested
/// comparison `Incomparable`, which is what keeps cyclic data from looping.
pub fn compare(heap: &GcHeap, a: Value, b: Value) -> Comparison {
    Comparer {
        heap,
        active: HashSet::new(),
    }
    .compare(a, b)
}

/// `compare(a, b) == Equal`.
pub fn equal(heap: &GcHeap, a: Value, b: Value) -> bool {
    compare(heap, a, b) == Comparison::Equal
}

fn from_ordering(ordering: Ordering) -> Comparison {
    match ordering {
        Ordering::Less => Comparison::Less,
        Ordering::Equal => Comparison::Equal,
        Ordering::Greater => Comparison::Greater,
    }
}

struct Comparer<'h> {
    heap: &'h GcHeap,
    active: HashSet<GcHandle>,
}

impl<'h> Comparer<'h> {
    fn compare(&mut self, a: Value, b: Value) -> Comparison {
        let mut entered: Vec<GcHandle> = Vec::new();
        let (mut a, mut b) = (a, b);

        // The last element of a tuple is compared by looping rather than
        // recursing, so long lists (which nest through their final slot) do
        // not grow the native stack.
        let result = 'walk: loop {
            match (a, b) {
                (Value::Null, Value::Null) => break Comparison::Equal,
                (Value::Integer(x), Value::Integer(y)) => break from_ordering(x.cmp(&y)),
                (Value::Boolean(x), Value::Boolean(y)) => break from_ordering(x.cmp(&y)),
                (Value::Process(x), Value::Process(y)) => {
                    break if x == y {
                        Comparison::Equal
                    } else {
                        Comparison::Incomparable
                    };
                }
                (Value::Label(x), Value::Label(y)) => {
                    break if x == y {
                        Comparison::Equal
                    } else {
                        Comparison::Incomparable
                    };
                }
                (Value::Symbol(_), Value::Symbol(_)) => {
                    match (self.heap.symbol_bytes(a), self.heap.symbol_bytes(b)) {
                        (Ok(x), Ok(y)) => break from_ordering(x.cmp(y)),
                        _ => break Comparison::Incomparable,
                    }
                }
                (Value::Tuple(ha), Value::Tuple(hb)) => {
                    if ha == hb {
                        break Comparison::Equal;
                    }
                    if self.active.contains(&ha) || self.active.contains(&hb) {
                        break Comparison::Incomparable;
                    }
                    let heap = self.heap;
                    let (Ok(tag_a), Ok(tag_b)) = (heap.tuple_tag(ha), heap.tuple_tag(hb)) else {
                        break Comparison::Incomparable;
                    };
                    let (Ok(slots_a), Ok(slots_b)) = (heap.tuple_slots(ha), heap.tuple_slots(hb))
                    else {
                        break Comparison::Incomparable;
                    };

                    self.active.insert(ha);
                    self.active.insert(hb);
                    entered.push(ha);
                    entered.push(hb);

                    match self.compare(tag_a, tag_b) {
                        Comparison::Equal => {}
                        other => break other,
                    }
                    if slots_a.len() != slots_b.len() {
                        break from_ordering(slots_a.len().cmp(&slots_b.len()));
                    }
                    let Some(last) = slots_a.len().checked_sub(1) else {
                        break Comparison::Equal;
                    };
                    for i in 0..last {
                        match self.compare(slots_a[i], slots_b[i]) {
                            Comparison::Equal => {}
                            other => break 'walk other,
                        }
                    }
                    a = slots_a[last];
                    b = slots_b[last];
                }
                _ => break Comparison::Incomparable,
            }
        };

        for handle in entered {
            self.active.remove(&handle);
        }
        result
    }
}
