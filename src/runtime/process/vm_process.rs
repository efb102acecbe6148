use crate::runtime::{
    fault::Fault,
    process::{ProcessBackend, ProcessId},
    system::System,
    value::Value,
    vm,
    vm_state::VmState,
};

/// Process backed by a virtual machine; each step runs one quantum.
pub struct VmProcess {
    vm: VmState,
}

impl VmProcess {
    pub fn new(vm: VmState) -> Self {
        Self { vm }
    }

    pub fn state(&self) -> VmState {
        self.vm
    }
}

impl ProcessBackend for VmProcess {
    fn kind(&self) -> &'static str {
        "vm"
    }

    fn step(&mut self, sys: &mut System, me: ProcessId) -> Result<(), Fault> {
        let quantum = sys.config.quantum;
        vm::run(sys, self.vm, me, quantum)?;
        Ok(())
    }

    fn roots(&self, out: &mut Vec<Value>) {
        out.push(self.vm.value());
    }
}
