use std::{cell::RefCell, rc::Rc};

use crate::runtime::{
    fault::Fault,
    process::{ProcessBackend, ProcessId},
    system::System,
    value::Value,
};

/// Shared cell a [`ReplyReceiver`] deposits its reply into.
pub type ReplySlot = Rc<RefCell<Option<Value>>>;

/// Throwaway process that keeps the last value it was sent.
///
/// Synchronous stream calls create one, pass it as the reply address of a
/// `read` or `eof` request, run it once and then drop it.
pub struct ReplyReceiver {
    slot: ReplySlot,
}

impl ReplyReceiver {
    pub fn new() -> (Self, ReplySlot) {
        let slot = ReplySlot::default();
        (
            Self {
                slot: Rc::clone(&slot),
            },
            slot,
        )
    }
}

impl ProcessBackend for ReplyReceiver {
    fn kind(&self) -> &'static str {
        "receiver"
    }

    fn step(&mut self, sys: &mut System, me: ProcessId) -> Result<(), Fault> {
        while let Some(reply) = sys.processes.dequeue(me)? {
            *self.slot.borrow_mut() = Some(reply);
        }
        sys.processes.get_mut(me)?.waiting = true;
        Ok(())
    }

    fn roots(&self, out: &mut Vec<Value>) {
        if let Some(reply) = *self.slot.borrow() {
            out.push(reply);
        }
    }
}
