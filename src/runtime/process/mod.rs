//! Processes: a mailbox plus a backend that reacts to it.
//!
//! Every process, whether it wraps a file handle, a virtual machine or a
//! one-shot reply slot, is driven the same way: values are appended to its
//! mailbox with [`ProcessTable::enqueue`], and [`System::run_process`] hands
//! control to its backend for one step.
//!
//! [`System::run_process`]: crate::runtime::system::System::run_process

use std::collections::{HashSet, VecDeque};

use crate::runtime::{fault::Fault, system::System, value::Value};

mod file;
mod receiver;
mod vm_process;

pub use file::{Endpoint, FileBackend, FileMode};
pub use receiver::{ReplyReceiver, ReplySlot};
pub use vm_process::VmProcess;

/// Index of a process in the [`ProcessTable`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub(crate) u32);

impl ProcessId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Behaviour of one kind of process.
pub trait ProcessBackend {
    /// Short name used in traces and summaries.
    fn kind(&self) -> &'static str;

    /// Drain the mailbox of `me` and react, or make one quantum of progress.
    ///
    /// The backend is detached from its process while this runs, so a
    /// backend that sends a message to itself simply leaves it queued.
    fn step(&mut self, sys: &mut System, me: ProcessId) -> Result<(), Fault>;

    /// Heap values this backend keeps alive.
    fn roots(&self, _out: &mut Vec<Value>) {}

    /// Whether the process may be dropped once no live value names it.
    /// Only unscheduled backends that are driven by messages qualify.
    fn reclaimable(&self) -> bool {
        false
    }
}

pub struct Process {
    mailbox: VecDeque<Value>,
    /// Set by a backend that has nothing to do until its next message.
    pub waiting: bool,
    /// Set once the process has finished; the scheduler reaps it.
    pub done: bool,
    pub(crate) next: Option<ProcessId>,
    pub(crate) backend: Option<Box<dyn ProcessBackend>>,
    kind: &'static str,
}

impl Process {
    fn new(backend: Box<dyn ProcessBackend>) -> Self {
        Self {
            mailbox: VecDeque::new(),
            waiting: false,
            done: false,
            next: None,
            kind: backend.kind(),
            backend: Some(backend),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn mailbox_len(&self) -> usize {
        self.mailbox.len()
    }

    /// Process following this one in schedule order.
    pub fn next(&self) -> Option<ProcessId> {
        self.next
    }
}

/// Owner of every process, indexed by [`ProcessId`].
#[derive(Default)]
pub struct ProcessTable {
    slots: Vec<Option<Process>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new process; it is not scheduled until linked in.
    pub fn insert(&mut self, backend: Box<dyn ProcessBackend>) -> ProcessId {
        let id = ProcessId(self.slots.len() as u32);
        self.slots.push(Some(Process::new(backend)));
        id
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        matches!(self.slots.get(id.0 as usize), Some(Some(_)))
    }

    pub fn get(&self, id: ProcessId) -> Result<&Process, Fault> {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(Fault::NoSuchProcess(id.0))
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Result<&mut Process, Fault> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(Fault::NoSuchProcess(id.0))
    }

    /// Appends `value` to the mailbox of `id`. Never blocks.
    pub fn enqueue(&mut self, id: ProcessId, value: Value) -> Result<(), Fault> {
        let process = self.get_mut(id)?;
        process.mailbox.push_back(value);
        process.waiting = false;
        Ok(())
    }

    /// Oldest message of `id`, if any.
    pub fn dequeue(&mut self, id: ProcessId) -> Result<Option<Value>, Fault> {
        Ok(self.get_mut(id)?.mailbox.pop_front())
    }

    /// Links `new` into the schedule right after `anchor`.
    pub fn insert_after(&mut self, anchor: ProcessId, new: ProcessId) -> Result<(), Fault> {
        let following = self.get(anchor)?.next;
        self.get_mut(new)?.next = following;
        self.get_mut(anchor)?.next = Some(new);
        Ok(())
    }

    /// Drops a process, its mailbox and its backend.
    pub fn remove(&mut self, id: ProcessId) -> Option<Process> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProcessId, &Process)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (ProcessId(i as u32), p)))
    }

    /// Drops every reclaimable process with an empty mailbox whose id is not
    /// in `reached`. Returns how many were dropped.
    pub fn reclaim_unreached(&mut self, reached: &HashSet<ProcessId>) -> usize {
        let mut reclaimed = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let unreached = slot.as_ref().is_some_and(|process| {
                process.mailbox.is_empty()
                    && process.backend.as_ref().is_some_and(|b| b.reclaimable())
                    && !reached.contains(&ProcessId(i as u32))
            });
            if unreached {
                *slot = None;
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Every heap value owned by a process: mailbox contents and backend state.
    pub fn roots(&self, out: &mut Vec<Value>) {
        for (_, process) in self.iter() {
            out.extend(process.mailbox.iter().copied());
            if let Some(backend) = &process.backend {
                backend.roots(out);
            }
        }
    }
}
