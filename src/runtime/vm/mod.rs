//! Bytecode interpreter.
//!
//! A machine's whole state lives on the heap in its [`VmState`] tuple:
//! program counter, current activation record and the shared code tuple.
//! [`run`] loads that state into an [`Interpreter`], executes a bounded
//! number of instructions and writes the state back, so a later call
//! continues exactly where this one stopped.
//!
//! Two dispatch strategies share the same instruction handlers. The switch
//! strategy decodes each integer opcode and matches on it. The threaded
//! strategy first rewrites the code tuple, replacing each opcode with a
//! [`Label`] that indexes the handler table directly, and from then on
//! jumps through the table.
//!
//! [`Label`]: crate::runtime::value::Label

use crate::{
    bytecode::op_code::OpCode,
    runtime::{
        activation_record::ActivationRecord,
        config::DispatchMode,
        fault::Fault,
        gc::{GcHandle, GcHeap},
        process::ProcessId,
        system::System,
        value::Value,
        vm_state::VmState,
    },
};

mod binary_ops;
mod comparison_ops;
mod dispatch;
mod function_call;
mod index_ops;
mod process_ops;
mod threading;
mod trace;

pub use threading::thread_code;

/// Executes up to `cycles` instructions of `vm` on behalf of process `me`.
///
/// Returns early after `REST` or `HALT` and reports how many instructions
/// ran. Program counter and activation record are stored back into `vm`
/// before returning, also when an instruction faults; in that case the
/// stored pc is the faulting instruction's.
pub fn run(sys: &mut System, vm: VmState, me: ProcessId, cycles: u32) -> Result<u32, Fault> {
    if sys.config.dispatch == DispatchMode::Threaded && !vm.is_threaded(&sys.heap)? {
        let code = vm.code(&sys.heap)?;
        thread_code(&mut sys.heap, code)?;
        vm.set_threaded(&mut sys.heap, true)?;
    }

    let mut interp = Interpreter::load(sys, vm, me)?;
    let result = interp.run_quantum(cycles);
    interp.store()?;
    result
}

/// Registers of one machine while it runs.
pub struct Interpreter<'s> {
    sys: &'s mut System,
    me: ProcessId,
    vm: VmState,
    code: GcHandle,
    code_len: usize,
    threaded: bool,
    /// Instruction being executed.
    pc: usize,
    /// Where execution continues; branches overwrite it.
    next_pc: usize,
    op: OpCode,
    ar: Option<ActivationRecord>,
    stop: bool,
}

impl<'s> Interpreter<'s> {
    fn load(sys: &'s mut System, vm: VmState, me: ProcessId) -> Result<Self, Fault> {
        let code_value = vm.code(&sys.heap)?;
        let code = sys.heap.expect_tuple("vm code", code_value)?;
        let code_len = sys.heap.tuple_size(code)?;
        let pc = vm.pc(&sys.heap)?;
        let ar = vm.ar(&sys.heap)?;
        let threaded = vm.is_threaded(&sys.heap)?;
        Ok(Self {
            sys,
            me,
            vm,
            code,
            code_len,
            threaded,
            pc,
            next_pc: pc,
            op: OpCode::OpNop,
            ar,
            stop: false,
        })
    }

    fn store(&mut self) -> Result<(), Fault> {
        self.vm.set_pc(&mut self.sys.heap, self.pc)?;
        self.vm.set_ar(&mut self.sys.heap, self.ar)
    }

    fn run_quantum(&mut self, cycles: u32) -> Result<u32, Fault> {
        let mut steps = 0;
        while steps < cycles && !self.stop {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    fn step(&mut self) -> Result<(), Fault> {
        if self.pc >= self.code_len {
            return Err(Fault::PcOutOfRange {
                pc: self.pc,
                len: self.code_len,
            });
        }
        let slot = self.sys.heap.tuple_fetch(self.code, self.pc)?;
        let op = dispatch::decode(slot)?;
        self.op = op;
        self.next_pc = self.pc + 1 + op.arity();
        if self.sys.config.trace {
            self.trace_instruction();
        }

        if self.threaded {
            dispatch::jump_through_table(self, slot)?;
        } else {
            dispatch::execute(self, op)?;
        }
        self.pc = self.next_pc;
        Ok(())
    }

    pub(super) fn heap(&mut self) -> &mut GcHeap {
        &mut self.sys.heap
    }

    /// Current activation record, required by every operand-stack access.
    fn frame(&self) -> Result<ActivationRecord, Fault> {
        self.ar
            .ok_or(Fault::NoActivationRecord { op: self.op.mnemonic() })
    }

    fn push(&mut self, value: Value) -> Result<(), Fault> {
        let ar = self.frame()?;
        ar.push(&mut self.sys.heap, value)
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        let ar = self.frame()?;
        ar.pop(&mut self.sys.heap)
    }

    fn pop_integer(&mut self) -> Result<i32, Fault> {
        let value = self.pop()?;
        value
            .as_integer()
            .ok_or_else(|| Fault::type_mismatch(self.op.mnemonic(), "Integer", &value))
    }

    fn pop_boolean(&mut self) -> Result<bool, Fault> {
        let value = self.pop()?;
        value
            .as_boolean()
            .ok_or_else(|| Fault::type_mismatch(self.op.mnemonic(), "Boolean", &value))
    }

    fn pop_process(&mut self) -> Result<ProcessId, Fault> {
        let value = self.pop()?;
        value
            .as_process()
            .ok_or_else(|| Fault::type_mismatch(self.op.mnemonic(), "Process", &value))
    }

    fn pop_frame(&mut self) -> Result<ActivationRecord, Fault> {
        let value = self.pop()?;
        ActivationRecord::from_value(&self.sys.heap, self.op.mnemonic(), value)
    }

    /// The slot right after the opcode.
    fn operand(&self) -> Result<Value, Fault> {
        self.sys.heap.tuple_fetch(self.code, self.pc + 1)
    }

    fn operand_int(&self) -> Result<i32, Fault> {
        let value = self.operand()?;
        value
            .as_integer()
            .ok_or_else(|| Fault::type_mismatch(self.op.mnemonic(), "Integer", &value))
    }

    /// Address operand, checked against the code length.
    fn operand_addr(&self) -> Result<usize, Fault> {
        let addr = self.operand_int()?;
        match usize::try_from(addr) {
            Ok(addr) if addr < self.code_len => Ok(addr),
            Ok(addr) => Err(Fault::PcOutOfRange {
                pc: addr,
                len: self.code_len,
            }),
            Err(_) => Err(Fault::NegativePc(addr)),
        }
    }

    fn jump(&mut self, addr: usize) {
        self.next_pc = addr;
    }

    /// Ends the current quantum after this instruction.
    fn yield_quantum(&mut self) {
        self.stop = true;
    }
}

#[cfg(test)]
mod comparison_ops_test;
#[cfg(test)]
mod function_call_test;
#[cfg(test)]
mod process_ops_test;
#[cfg(test)]
mod test_support;
#[cfg(test)]
mod trace_test;
