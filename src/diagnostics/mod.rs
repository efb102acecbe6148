//! Counting reporter for checks that skip bad input and keep going.

pub mod reporter;
pub mod types;

pub use reporter::{Diagnostic, Reporter};
pub use types::Severity;
