use std::{
    cell::RefCell,
    io::{self, Cursor},
    rc::Rc,
};

use crate::runtime::{
    config::RunConfig,
    fault::Fault,
    gc::GcHeap,
    process::{Endpoint, FileBackend, ProcessBackend, ProcessId, ProcessTable, VmProcess},
    value::Value,
    vm_state::VmState,
};

/// In-memory sink that can stand in for standard output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything a running program touches: the heap, the process table and
/// the run configuration.
///
/// Single-threaded by construction; reply slots are `Rc`-shared.
pub struct System {
    pub heap: GcHeap,
    pub processes: ProcessTable,
    pub config: RunConfig,
    stdout: Option<SharedBuffer>,
}

impl System {
    pub fn new(config: RunConfig) -> Self {
        Self {
            heap: GcHeap::new(),
            processes: ProcessTable::new(),
            config,
            stdout: None,
        }
    }

    /// Redirects every `*stdout` stream opened from now on into a buffer.
    pub fn capture_stdout(&mut self) -> SharedBuffer {
        self.stdout.get_or_insert_with(SharedBuffer::default).clone()
    }

    /// Gives `id` one step.
    ///
    /// A process that is already running further up the call chain (for
    /// instance a VM writing to itself) is left alone; its message stays queued.
    pub fn run_process(&mut self, id: ProcessId) -> Result<(), Fault> {
        let Some(mut backend) = self.processes.get_mut(id)?.backend.take() else {
            return Ok(());
        };
        let result = backend.step(self, id);
        if let Ok(process) = self.processes.get_mut(id) {
            process.backend = Some(backend);
        }
        result
    }

    pub fn spawn(&mut self, backend: Box<dyn ProcessBackend>) -> ProcessId {
        self.processes.insert(backend)
    }

    /// Registers a VM process for `vm`; the caller links it into a schedule.
    pub fn spawn_vm(&mut self, vm: VmState) -> ProcessId {
        self.spawn(Box::new(VmProcess::new(vm)))
    }

    /// Opens a file process. `*stdin`, `*stdout` and `*stderr` name the
    /// standard streams.
    pub fn open(&mut self, locator: &str, mode: &str) -> Result<ProcessId, Fault> {
        let endpoint = match (locator, &self.stdout) {
            ("*stdout", Some(buffer)) => Endpoint::Writer(Box::new(buffer.clone())),
            _ => Endpoint::open(locator, mode)?,
        };
        Ok(self.spawn(Box::new(FileBackend::new(locator, endpoint))))
    }

    /// Readable stream process over an in-memory byte buffer.
    pub fn open_bytes(&mut self, name: &str, bytes: Vec<u8>) -> ProcessId {
        let endpoint = Endpoint::Reader(Box::new(Cursor::new(bytes)));
        self.spawn(Box::new(FileBackend::new(name, endpoint)))
    }

    /// Collects garbage, keeping everything owned by a process (VM states,
    /// mailbox contents, pending replies) plus `extra`.
    ///
    /// File processes that no surviving value names are closed and dropped
    /// too; an embedder holding a bare [`ProcessId`] across a collection
    /// must pass it in `extra` as a `Value::Process`. Returns how many
    /// processes were dropped.
    pub fn collect_garbage(&mut self, extra: &[Value]) -> usize {
        let mut roots = extra.to_vec();
        self.processes.roots(&mut roots);
        self.heap.collect_many(&roots);
        self.processes
            .reclaim_unreached(self.heap.reached_processes())
    }
}
