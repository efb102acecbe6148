//! Code images: a code tuple saved in the binary term format.

use std::io::Read;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    bytecode::term_format::{LoadError, load_from_slice},
    runtime::{
        fault::Fault,
        process::ProcessId,
        scheduler::{RunReport, Scheduler},
        stream::{StreamReader, stream_close},
        system::System,
        value::Value,
        vm_state::VmState,
    },
};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("could not read image '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not load image '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },
}

/// A loaded image and what was read to get it.
#[derive(Debug, Clone, Copy)]
pub struct CodeImage {
    pub term: Value,
    /// Size of the image file in bytes.
    pub size: usize,
    pub digest: [u8; 32],
}

impl CodeImage {
    pub fn fingerprint(&self) -> String {
        to_hex(&self.digest)
    }
}

pub fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Reads and loads the term stored at `path`, going through a file process
/// the same way a running program would.
pub fn read_image(sys: &mut System, path: &str) -> Result<CodeImage, ImageError> {
    let file = sys.open(path, "r")?;
    let mut bytes = Vec::new();
    let read = StreamReader::new(sys, file).read_to_end(&mut bytes);
    stream_close(sys, file)?;
    sys.processes.remove(file);
    read.map_err(|source| ImageError::Read {
        path: path.to_string(),
        source,
    })?;

    let term = load_from_slice(&mut sys.heap, &bytes).map_err(|source| ImageError::Load {
        path: path.to_string(),
        source,
    })?;
    Ok(CodeImage {
        term,
        size: bytes.len(),
        digest: hash_bytes(&bytes),
    })
}

/// Creates the first VM process over `code`.
pub fn boot(sys: &mut System, code: Value) -> Result<ProcessId, Fault> {
    let vm = VmState::new(&mut sys.heap, code)?;
    Ok(sys.spawn_vm(vm))
}

/// Boots `code` and schedules until every process is done.
pub fn run_program(sys: &mut System, code: Value) -> Result<RunReport, Fault> {
    let first = boot(sys, code)?;
    Scheduler::new(first).run_to_completion(sys)
}
