use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
};

use crate::runtime::{
    fault::Fault,
    process::{ProcessBackend, ProcessId},
    stream::StreamMessage,
    system::System,
    value::Value,
};

/// How a named file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
    Append,
}

impl FileMode {
    /// Parses an `fopen`-style mode; only the first character matters
    /// (`"rb"` reads, `"w+"` writes).
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.as_bytes().first()? {
            b'r' => Some(FileMode::Read),
            b'w' => Some(FileMode::Write),
            b'a' => Some(FileMode::Append),
            _ => None,
        }
    }
}

/// The native side of a file process.
pub enum Endpoint {
    Reader(Box<dyn BufRead>),
    Writer(Box<dyn Write>),
    Closed,
}

impl Endpoint {
    /// Opens `locator`. `*stdin`, `*stdout` and `*stderr` name the standard
    /// streams; anything else is a path.
    pub fn open(locator: &str, mode: &str) -> Result<Self, Fault> {
        match locator {
            "*stdin" => return Ok(Endpoint::Reader(Box::new(BufReader::new(io::stdin())))),
            "*stdout" => return Ok(Endpoint::Writer(Box::new(io::stdout()))),
            "*stderr" => return Ok(Endpoint::Writer(Box::new(io::stderr()))),
            _ => {}
        }

        let open_err = |source: io::Error| Fault::Open {
            path: locator.to_string(),
            mode: mode.to_string(),
            source,
        };
        let file_mode = FileMode::parse(mode)
            .ok_or_else(|| open_err(io::Error::new(io::ErrorKind::InvalidInput, "unknown mode")))?;
        match file_mode {
            FileMode::Read => {
                let file = File::open(locator).map_err(open_err)?;
                Ok(Endpoint::Reader(Box::new(BufReader::new(file))))
            }
            FileMode::Write => {
                let file = File::create(locator).map_err(open_err)?;
                Ok(Endpoint::Writer(Box::new(BufWriter::new(file))))
            }
            FileMode::Append => {
                let file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(locator)
                    .map_err(open_err)?;
                Ok(Endpoint::Writer(Box::new(BufWriter::new(file))))
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Endpoint::Writer(writer) => {
                writer.write_all(bytes)?;
                writer.flush()
            }
            Endpoint::Reader(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stream is not open for writing",
            )),
            // Late writes to a closed stream are dropped.
            Endpoint::Closed => Ok(()),
        }
    }

    /// Reads up to `length` bytes; fewer only at end of stream.
    fn read_up_to(&mut self, length: usize) -> io::Result<Vec<u8>> {
        match self {
            Endpoint::Reader(reader) => {
                let mut buffer = Vec::with_capacity(length);
                reader.take(length as u64).read_to_end(&mut buffer)?;
                Ok(buffer)
            }
            Endpoint::Writer(_) | Endpoint::Closed => Ok(Vec::new()),
        }
    }

    fn at_end(&mut self) -> io::Result<bool> {
        match self {
            Endpoint::Reader(reader) => Ok(reader.fill_buf()?.is_empty()),
            Endpoint::Writer(_) => Ok(false),
            Endpoint::Closed => Ok(true),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if let Endpoint::Writer(writer) = self {
            writer.flush()?;
        }
        *self = Endpoint::Closed;
        Ok(())
    }
}

/// Process backend wrapping a file handle or standard stream.
pub struct FileBackend {
    name: String,
    endpoint: Endpoint,
}

impl FileBackend {
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, sys: &mut System, message: StreamMessage) -> Result<(), Fault> {
        match message {
            StreamMessage::Write(bytes) => self.endpoint.write_all(&bytes)?,
            StreamMessage::Read { receiver, length } => {
                let bytes = self.endpoint.read_up_to(length)?;
                let reply = sys.heap.alloc_symbol(&bytes);
                sys.processes.enqueue(receiver, reply)?;
            }
            StreamMessage::Eof { receiver } => {
                let at_end = self.endpoint.at_end()?;
                sys.processes.enqueue(receiver, Value::Boolean(at_end))?;
            }
            StreamMessage::Close => self.endpoint.close()?,
        }
        Ok(())
    }
}

impl ProcessBackend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn reclaimable(&self) -> bool {
        true
    }

    fn step(&mut self, sys: &mut System, me: ProcessId) -> Result<(), Fault> {
        while let Some(message) = sys.processes.dequeue(me)? {
            // Anything that is not a stream request is dropped.
            if let Some(message) = StreamMessage::decode(&sys.heap, message)? {
                self.handle(sys, message)?;
            }
        }
        sys.processes.get_mut(me)?.waiting = true;
        Ok(())
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        let _ = self.endpoint.close();
    }
}
