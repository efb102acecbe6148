use std::fmt;

use crate::diagnostics::types::Severity;

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Code position the message refers to, when there is one.
    pub pc: Option<usize>,
    pub message: String,
}

/// Collects diagnostics for one named phase ("Validating", "Loading", ...)
/// and counts errors and warnings.
///
/// The reporter never prints by itself; callers render it to stderr.
#[derive(Debug, Clone)]
pub struct Reporter {
    phase: &'static str,
    verbose: bool,
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Reporter {
    pub fn new(phase: &'static str, verbose: bool) -> Self {
        Self {
            phase,
            verbose,
            diagnostics: Vec::new(),
            errors: 0,
            warnings: 0,
        }
    }

    pub fn report(&mut self, severity: Severity, pc: Option<usize>, message: impl Into<String>) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(Diagnostic {
            severity,
            pc,
            message: message.into(),
        });
    }

    pub fn error(&mut self, pc: Option<usize>, message: impl Into<String>) {
        self.report(Severity::Error, pc, message);
    }

    pub fn warning(&mut self, pc: Option<usize>, message: impl Into<String>) {
        self.report(Severity::Warning, pc, message);
    }

    pub fn note(&mut self, pc: Option<usize>, message: impl Into<String>) {
        self.report(Severity::Note, pc, message);
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `"<phase> finished with N errors and M warnings"`.
    pub fn summary(&self) -> String {
        format!(
            "{} finished with {} errors and {} warnings",
            self.phase, self.errors, self.warnings
        )
    }

    /// Every diagnostic, one per line, followed by the summary in verbose mode.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for diag in &self.diagnostics {
            if diag.severity == Severity::Note && !self.verbose {
                continue;
            }
            out.push_str(&format!("{} {}\n", self.phase, diag));
        }
        if self.verbose {
            out.push_str(&self.summary());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pc {
            Some(pc) => write!(f, "{} at {:04}: {}.", self.severity, pc, self.message),
            None => write!(f, "{}: {}.", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Reporter;

    #[test]
    fn counts_by_severity() {
        let mut reporter = Reporter::new("Validating", false);
        reporter.error(Some(3), "opcode is not an integer");
        reporter.warning(None, "odd");
        reporter.note(None, "fyi");
        assert_eq!(reporter.errors(), 1);
        assert_eq!(reporter.warnings(), 1);
        assert!(reporter.has_errors());
        assert_eq!(reporter.diagnostics().len(), 3);
    }

    #[test]
    fn render_hides_notes_unless_verbose() {
        let mut quiet = Reporter::new("Validating", false);
        quiet.error(Some(3), "opcode is not an integer");
        quiet.note(None, "fyi");
        assert_eq!(
            quiet.render(),
            "Validating Error at 0003: opcode is not an integer.\n"
        );

        let mut verbose = Reporter::new("Validating", true);
        verbose.note(None, "fyi");
        assert_eq!(
            verbose.render(),
            "Validating Note: fyi.\nValidating finished with 0 errors and 0 warnings\n"
        );
    }
}
