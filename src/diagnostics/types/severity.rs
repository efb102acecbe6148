//! Diagnostic severity levels

use std::fmt;

/// Severity level of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Error: the input cannot be used
    Error,
    /// Warning: suspicious but usable input
    Warning,
    /// Note: provides additional context or information
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
            Severity::Note => write!(f, "Note"),
        }
    }
}
