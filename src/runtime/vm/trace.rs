use super::Interpreter;

impl Interpreter<'_> {
    /// One stderr line per executed instruction.
    pub(super) fn trace_instruction(&self) {
        eprintln!("{}", self.trace_line());
    }

    pub(super) fn trace_line(&self) -> String {
        let operand = match self.op.arity() {
            0 => String::new(),
            _ => match self.operand() {
                Ok(value) => format!(" {}", value),
                Err(_) => " <missing>".to_string(),
            },
        };
        let depth = match self.ar {
            Some(ar) => ar
                .depth(&self.sys.heap)
                .map_or_else(|_| "?".to_string(), |d| d.to_string()),
            None => "-".to_string(),
        };
        format!(
            "PID={} PC={:04} {}{} depth={}",
            self.me.index(),
            self.pc,
            self.op,
            operand,
            depth
        )
    }
}
