//! Mailbox protocol spoken by stream-like processes.
//!
//! A request is a tuple tagged with one of the symbols below:
//!
//! | tag     | slots                         | reply to `receiver`          |
//! |---------|-------------------------------|------------------------------|
//! | `write` | payload symbol                | none                         |
//! | `read`  | receiver process, max length  | symbol of up to `length` bytes |
//! | `eof`   | receiver process              | boolean                      |
//! | `close` | (none)                        | none                         |
//!
//! The helpers here enqueue a request and run the target immediately, so a
//! stream call completes before it returns.

use std::io;

use crate::runtime::{
    fault::Fault,
    gc::GcHeap,
    process::{ProcessId, ReplyReceiver},
    system::System,
    value::Value,
};

pub const MSG_WRITE: &[u8] = b"write";
pub const MSG_READ: &[u8] = b"read";
pub const MSG_EOF: &[u8] = b"eof";
pub const MSG_CLOSE: &[u8] = b"close";

/// Decoded stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Write(Vec<u8>),
    Read { receiver: ProcessId, length: usize },
    Eof { receiver: ProcessId },
    Close,
}

impl StreamMessage {
    /// Builds the request tuple.
    pub fn encode(&self, heap: &mut GcHeap) -> Value {
        match self {
            StreamMessage::Write(bytes) => {
                let tag = heap.alloc_symbol(MSG_WRITE);
                let payload = heap.alloc_symbol(bytes);
                heap.alloc_tuple_from(tag, vec![payload])
            }
            StreamMessage::Read { receiver, length } => {
                let tag = heap.alloc_symbol(MSG_READ);
                let length = Value::Integer(i32::try_from(*length).unwrap_or(i32::MAX));
                heap.alloc_tuple_from(tag, vec![Value::Process(*receiver), length])
            }
            StreamMessage::Eof { receiver } => {
                let tag = heap.alloc_symbol(MSG_EOF);
                heap.alloc_tuple_from(tag, vec![Value::Process(*receiver)])
            }
            StreamMessage::Close => {
                let tag = heap.alloc_symbol(MSG_CLOSE);
                heap.alloc_tuple_from(tag, Vec::new())
            }
        }
    }

    /// Reads a request back. Values that are not stream requests decode to
    /// `None`; a request with malformed arguments is a fault.
    pub fn decode(heap: &GcHeap, message: Value) -> Result<Option<Self>, Fault> {
        let Value::Tuple(handle) = message else {
            return Ok(None);
        };
        let tag = heap.tuple_tag(handle)?;
        if !matches!(tag, Value::Symbol(_)) {
            return Ok(None);
        }
        let name = heap.symbol_bytes(tag)?;
        let arg = |i: usize| heap.tuple_fetch(handle, i);
        let receiver = |v: Value, op: &'static str| {
            v.as_process()
                .ok_or_else(|| Fault::type_mismatch(op, "Process", &v))
        };

        let decoded = if name == MSG_WRITE {
            let payload = arg(0)?;
            StreamMessage::Write(heap.symbol_bytes(payload)?.to_vec())
        } else if name == MSG_READ {
            let length = arg(1)?;
            let length = length
                .as_integer()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| Fault::type_mismatch("read", "non-negative Integer", &length))?;
            StreamMessage::Read {
                receiver: receiver(arg(0)?, "read")?,
                length,
            }
        } else if name == MSG_EOF {
            StreamMessage::Eof {
                receiver: receiver(arg(0)?, "eof")?,
            }
        } else if name == MSG_CLOSE {
            StreamMessage::Close
        } else {
            return Ok(None);
        };
        Ok(Some(decoded))
    }
}

fn send(sys: &mut System, target: ProcessId, message: StreamMessage) -> Result<(), Fault> {
    let request = message.encode(&mut sys.heap);
    sys.processes.enqueue(target, request)?;
    sys.run_process(target)
}

/// Sends `bytes` to `target`.
pub fn stream_write(sys: &mut System, target: ProcessId, bytes: &[u8]) -> Result<(), Fault> {
    send(sys, target, StreamMessage::Write(bytes.to_vec()))
}

/// Asks `target` to send up to `length` bytes to `receiver`.
pub fn stream_read_to(
    sys: &mut System,
    target: ProcessId,
    receiver: ProcessId,
    length: usize,
) -> Result<(), Fault> {
    send(sys, target, StreamMessage::Read { receiver, length })
}

/// Runs `request` against `target` through a throwaway receiver and returns
/// whatever it replied.
fn round_trip(
    sys: &mut System,
    target: ProcessId,
    request: impl FnOnce(ProcessId) -> StreamMessage,
) -> Result<Option<Value>, Fault> {
    let (backend, slot) = ReplyReceiver::new();
    let receiver = sys.processes.insert(Box::new(backend));
    let outcome = send(sys, target, request(receiver)).and_then(|()| sys.run_process(receiver));
    sys.processes.remove(receiver);
    outcome?;
    let reply = slot.borrow_mut().take();
    Ok(reply)
}

/// Reads up to `length` bytes from `target`; fewer only at end of stream.
pub fn stream_read(sys: &mut System, target: ProcessId, length: usize) -> Result<Vec<u8>, Fault> {
    match round_trip(sys, target, |receiver| StreamMessage::Read { receiver, length })? {
        Some(reply) => Ok(sys.heap.symbol_bytes(reply)?.to_vec()),
        None => Ok(Vec::new()),
    }
}

/// Asks `target` whether it has reached end of stream.
pub fn stream_is_at_end(sys: &mut System, target: ProcessId) -> Result<bool, Fault> {
    match round_trip(sys, target, |receiver| StreamMessage::Eof { receiver })? {
        Some(Value::Boolean(at_end)) => Ok(at_end),
        Some(other) => Err(Fault::type_mismatch("eof", "Boolean", &other)),
        None => Ok(true),
    }
}

pub fn stream_close(sys: &mut System, target: ProcessId) -> Result<(), Fault> {
    send(sys, target, StreamMessage::Close)
}

fn to_io_error(fault: Fault) -> io::Error {
    match fault {
        Fault::Io(err) => err,
        other => io::Error::other(other),
    }
}

/// `std::io::Write` over a stream process.
pub struct StreamWriter<'s> {
    sys: &'s mut System,
    target: ProcessId,
}

impl<'s> StreamWriter<'s> {
    pub fn new(sys: &'s mut System, target: ProcessId) -> Self {
        Self { sys, target }
    }
}

impl io::Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        stream_write(self.sys, self.target, buf).map_err(to_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `std::io::Read` over a stream process.
pub struct StreamReader<'s> {
    sys: &'s mut System,
    target: ProcessId,
}

impl<'s> StreamReader<'s> {
    pub fn new(sys: &'s mut System, target: ProcessId) -> Self {
        Self { sys, target }
    }
}

impl io::Read for StreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = stream_read(self.sys, self.target, buf.len()).map_err(to_io_error)?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }
}
