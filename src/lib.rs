pub mod bytecode;
pub mod diagnostics;
pub mod runtime;
