use crate::{
    bytecode::builder::CodeBuilder,
    runtime::{
        config::{DispatchMode, RunConfig},
        fault::Fault,
        process::ProcessId,
        system::System,
        value::Value,
        vm_state::VmState,
    },
};

pub(super) struct Machine {
    pub sys: System,
    pub vm: VmState,
    pub me: ProcessId,
}

pub(super) fn machine(build: impl FnOnce(&mut CodeBuilder, &mut System)) -> Machine {
    machine_with(RunConfig::default(), build)
}

pub(super) fn threaded_machine(build: impl FnOnce(&mut CodeBuilder, &mut System)) -> Machine {
    machine_with(
        RunConfig {
            dispatch: DispatchMode::Threaded,
            ..RunConfig::default()
        },
        build,
    )
}

pub(super) fn machine_with(
    config: RunConfig,
    build: impl FnOnce(&mut CodeBuilder, &mut System),
) -> Machine {
    let mut sys = System::new(config);
    let mut builder = CodeBuilder::new();
    build(&mut builder, &mut sys);
    let code = builder.finish(&mut sys.heap).unwrap();
    let vm = VmState::new(&mut sys.heap, code).unwrap();
    let me = sys.spawn_vm(vm);
    Machine { sys, vm, me }
}

/// Machine over hand-written code slots, for code the builder cannot emit.
pub(super) fn raw_machine(config: RunConfig, slots: Vec<Value>) -> Machine {
    let mut sys = System::new(config);
    let code = sys.heap.alloc_tuple_from(Value::Null, slots);
    let vm = VmState::new(&mut sys.heap, code).unwrap();
    let me = sys.spawn_vm(vm);
    Machine { sys, vm, me }
}

impl Machine {
    pub fn run(&mut self, cycles: u32) -> Result<u32, Fault> {
        super::run(&mut self.sys, self.vm, self.me, cycles)
    }

    /// Runs until the machine halts or faults.
    pub fn finish(&mut self) -> Result<(), Fault> {
        while !self.done() {
            self.run(1000)?;
        }
        Ok(())
    }

    pub fn done(&self) -> bool {
        self.sys.processes.get(self.me).unwrap().done
    }

    pub fn pc(&self) -> usize {
        self.vm.pc(&self.sys.heap).unwrap()
    }

    /// Operand stack of the current activation record, bottom first.
    pub fn stack(&self) -> Vec<Value> {
        let heap = &self.sys.heap;
        let Some(ar) = self.vm.ar(heap).unwrap() else {
            return Vec::new();
        };
        (0..ar.depth(heap).unwrap())
            .map(|i| ar.local(heap, i as i32).unwrap())
            .collect()
    }
}
