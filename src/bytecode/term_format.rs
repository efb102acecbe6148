//! Binary term format.
//!
//! Every value starts with one type byte:
//!
//! | byte | kind    | payload                                     |
//! |------|---------|---------------------------------------------|
//! | 0    | Null    | 4 bytes, zero                               |
//! | 1    | Integer | i32 little-endian                           |
//! | 2    | Boolean | 0 or 1 as u32 little-endian                 |
//! | 3    | Process | process id, u32 little-endian               |
//! | 4    | Label   | handler index, u32 little-endian            |
//! | 9    | Symbol  | u32 length, then the bytes                  |
//! | 10   | Tuple   | tag term, then a body depending on the tag  |
//!
//! A tuple tagged `dict` is written as its layer size, its entry count and
//! then each key and value in iteration order. Any other tuple is written as
//! its element count followed by the elements.
//!
//! Both directions walk the term with an explicit stack, so long lists do
//! not recurse on the native stack.

use std::{
    collections::HashSet,
    io::{self, Read, Write},
};

use thiserror::Error;

use crate::runtime::{
    dict::Dict,
    fault::Fault,
    gc::{GcHandle, GcHeap},
    process::ProcessId,
    stream::{StreamReader, StreamWriter},
    system::System,
    value::{Label, TAG_DICT, Value},
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unknown type byte {0}")]
    UnknownType(u8),
    #[error("term is truncated")]
    Truncated,
    #[error("term is malformed: {0}")]
    Invalid(#[from] Fault),
    #[error("reading term failed: {0}")]
    Io(io::Error),
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => LoadError::Truncated,
            _ => LoadError::Io(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot save a cyclic term")]
    Cyclic,
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("writing term failed: {0}")]
    Io(#[from] io::Error),
}

impl From<SaveError> for Fault {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::Cyclic => Fault::CyclicTerm,
            SaveError::Fault(fault) => fault,
            SaveError::Io(err) => Fault::Io(err),
        }
    }
}

const TYPE_NULL: u8 = 0;
const TYPE_INTEGER: u8 = 1;
const TYPE_BOOLEAN: u8 = 2;
const TYPE_PROCESS: u8 = 3;
const TYPE_LABEL: u8 = 4;
const TYPE_SYMBOL: u8 = 9;
const TYPE_TUPLE: u8 = 10;

enum SaveTask {
    Term(Value),
    Word(u32),
    Leave(GcHandle),
}

fn write_word(out: &mut impl Write, word: u32) -> io::Result<()> {
    out.write_all(&word.to_le_bytes())
}

/// Writes `value` to `out`.
///
/// A tuple that contains itself (directly or further down) cannot be
/// written and yields [`SaveError::Cyclic`]; shared, acyclic substructure is
/// written once per occurrence.
pub fn save(heap: &GcHeap, value: Value, out: &mut impl Write) -> Result<(), SaveError> {
    let mut active: HashSet<GcHandle> = HashSet::new();
    let mut tasks = vec![SaveTask::Term(value)];

    while let Some(task) = tasks.pop() {
        let value = match task {
            SaveTask::Word(word) => {
                write_word(out, word)?;
                continue;
            }
            SaveTask::Leave(handle) => {
                active.remove(&handle);
                continue;
            }
            SaveTask::Term(value) => value,
        };

        out.write_all(&[value.type_code()])?;
        match value {
            Value::Null => write_word(out, 0)?,
            Value::Integer(i) => out.write_all(&i.to_le_bytes())?,
            Value::Boolean(b) => write_word(out, b as u32)?,
            Value::Process(id) => write_word(out, id.index())?,
            Value::Label(label) => write_word(out, label.index())?,
            Value::Symbol(_) => {
                let bytes = heap.symbol_bytes(value)?;
                write_word(out, bytes.len() as u32)?;
                out.write_all(bytes)?;
            }
            Value::Tuple(handle) => {
                if !active.insert(handle) {
                    return Err(SaveError::Cyclic);
                }
                let tag = heap.tuple_tag(handle)?;
                tasks.push(SaveTask::Leave(handle));
                if tag == TAG_DICT {
                    let dict = Dict::from_value(heap, "save", value)?;
                    let entries: Vec<(Value, Value)> = dict.entries(heap).collect();
                    for (key, value) in entries.iter().rev() {
                        tasks.push(SaveTask::Term(*value));
                        tasks.push(SaveTask::Term(*key));
                    }
                    tasks.push(SaveTask::Word(entries.len() as u32));
                    tasks.push(SaveTask::Word(dict.layer_size(heap)? as u32));
                } else {
                    let slots = heap.tuple_slots(handle)?;
                    tasks.extend(slots.iter().rev().map(|slot| SaveTask::Term(*slot)));
                    tasks.push(SaveTask::Word(slots.len() as u32));
                }
                tasks.push(SaveTask::Term(tag));
            }
        }
    }
    Ok(())
}

pub fn save_to_vec(heap: &GcHeap, value: Value) -> Result<Vec<u8>, SaveError> {
    let mut bytes = Vec::new();
    save(heap, value, &mut bytes)?;
    Ok(bytes)
}

/// Serializes `value` and writes it to a stream process.
pub fn save_to_stream(sys: &mut System, target: ProcessId, value: Value) -> Result<(), SaveError> {
    let bytes = save_to_vec(&sys.heap, value)?;
    StreamWriter::new(sys, target).write_all(&bytes)?;
    Ok(())
}

enum LoadFrame {
    /// Next term is the tag of a tuple.
    Tag,
    Elements {
        tag: Value,
        values: Vec<Value>,
        remaining: usize,
    },
    Entries {
        dict: Dict,
        key: Option<Value>,
        remaining: usize,
    },
}

fn read_byte(input: &mut impl Read) -> Result<u8, LoadError> {
    let mut byte = [0u8; 1];
    input.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_word(input: &mut impl Read) -> Result<u32, LoadError> {
    let mut word = [0u8; 4];
    input.read_exact(&mut word)?;
    Ok(u32::from_le_bytes(word))
}

/// Reads one term from `input`, allocating its symbols and tuples in `heap`.
pub fn load(heap: &mut GcHeap, input: &mut impl Read) -> Result<Value, LoadError> {
    let mut frames: Vec<LoadFrame> = Vec::new();

    loop {
        let mut produced = match read_byte(input)? {
            TYPE_NULL => {
                read_word(input)?;
                Some(Value::Null)
            }
            TYPE_INTEGER => Some(Value::Integer(read_word(input)? as i32)),
            TYPE_BOOLEAN => Some(Value::Boolean(read_word(input)? != 0)),
            TYPE_PROCESS => Some(Value::Process(ProcessId(read_word(input)?))),
            TYPE_LABEL => Some(Value::Label(Label(read_word(input)?))),
            TYPE_SYMBOL => {
                let length = read_word(input)? as u64;
                let mut bytes = Vec::new();
                Read::take(&mut *input, length).read_to_end(&mut bytes)?;
                if bytes.len() as u64 != length {
                    return Err(LoadError::Truncated);
                }
                Some(heap.alloc_symbol(&bytes))
            }
            TYPE_TUPLE => {
                frames.push(LoadFrame::Tag);
                None
            }
            other => return Err(LoadError::UnknownType(other)),
        };

        while let Some(value) = produced.take() {
            let Some(frame) = frames.last_mut() else {
                return Ok(value);
            };
            match frame {
                LoadFrame::Tag => {
                    frames.pop();
                    produced = begin_tuple(heap, input, value, &mut frames)?;
                }
                LoadFrame::Elements {
                    values, remaining, ..
                } => {
                    values.push(value);
                    *remaining -= 1;
                    if *remaining == 0 {
                        if let Some(LoadFrame::Elements { tag, values, .. }) = frames.pop() {
                            produced = Some(heap.alloc_tuple_from(tag, values));
                        }
                    }
                }
                LoadFrame::Entries {
                    dict,
                    key,
                    remaining,
                } => match key.take() {
                    None => *key = Some(value),
                    Some(k) => {
                        dict.store(heap, k, value)?;
                        *remaining -= 1;
                        if *remaining == 0 {
                            let dict = *dict;
                            frames.pop();
                            produced = Some(dict.value());
                        }
                    }
                },
            }
        }
    }
}

/// Reads the body header that follows a tuple's tag. Returns the finished
/// tuple when it has no elements, otherwise pushes a frame for them.
fn begin_tuple(
    heap: &mut GcHeap,
    input: &mut impl Read,
    tag: Value,
    frames: &mut Vec<LoadFrame>,
) -> Result<Option<Value>, LoadError> {
    if tag == TAG_DICT {
        let layer_size = read_word(input)?;
        let count = read_word(input)? as usize;
        let dict = Dict::new(heap, layer_size as i64)?;
        if count == 0 {
            return Ok(Some(dict.value()));
        }
        frames.push(LoadFrame::Entries {
            dict,
            key: None,
            remaining: count,
        });
        return Ok(None);
    }

    let count = read_word(input)? as usize;
    if count == 0 {
        return Ok(Some(heap.alloc_tuple_from(tag, Vec::new())));
    }
    frames.push(LoadFrame::Elements {
        tag,
        values: Vec::with_capacity(count.min(1 << 16)),
        remaining: count,
    });
    Ok(None)
}

pub fn load_from_slice(heap: &mut GcHeap, mut bytes: &[u8]) -> Result<Value, LoadError> {
    load(heap, &mut bytes)
}

/// Reads everything `source` has to offer and loads one term from it.
pub fn load_from_stream(sys: &mut System, source: ProcessId) -> Result<Value, LoadError> {
    let mut bytes = Vec::new();
    StreamReader::new(sys, source).read_to_end(&mut bytes)?;
    load_from_slice(&mut sys.heap, &bytes)
}
