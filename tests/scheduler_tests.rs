use tuplevm::bytecode::{builder::CodeBuilder, image::run_program, op_code::OpCode};
use tuplevm::runtime::{
    config::RunConfig,
    fault::Fault,
    scheduler::{RunReport, Scheduler},
    system::System,
    value::Value,
    vm_state::VmState,
};

struct Outcome {
    sys: System,
    output: String,
    result: Result<RunReport, Fault>,
}

fn run_with(config: RunConfig, build: impl FnOnce(&mut CodeBuilder, &mut System)) -> Outcome {
    let mut sys = System::new(config);
    let out = sys.capture_stdout();
    let mut builder = CodeBuilder::new();
    build(&mut builder, &mut sys);
    let code = builder.finish(&mut sys.heap).unwrap();
    let result = run_program(&mut sys, code);
    Outcome {
        sys,
        output: out.to_string_lossy(),
        result,
    }
}

fn quantum(n: u32) -> RunConfig {
    RunConfig {
        quantum: n,
        ..RunConfig::default()
    }
}

fn print_int(b: &mut CodeBuilder, n: i32) {
    b.push(Value::Integer(n));
    b.emit(OpCode::OpStdout);
    b.emit(OpCode::OpPortray);
}

/// Parent prints 1 and 3, the spawned child prints 2.
fn parent_and_child(b: &mut CodeBuilder, _: &mut System) {
    let child = b.new_label();
    b.emit_int(OpCode::OpNewAr, 4);
    b.emit_jump(OpCode::OpSpawn, child);
    b.emit(OpCode::OpPop);
    print_int(b, 1);
    print_int(b, 3);
    b.emit(OpCode::OpHalt);

    b.place_label(child);
    b.emit_int(OpCode::OpNewAr, 4);
    print_int(b, 2);
    b.emit(OpCode::OpHalt);
}

#[test]
fn large_quantum_runs_parent_to_completion_first() {
    let outcome = run_with(quantum(100), parent_and_child);
    let report = outcome.result.unwrap();
    assert_eq!(outcome.output, "132");
    assert_eq!(report.reaped, 2);
}

#[test]
fn small_quantum_interleaves_parent_and_child() {
    let outcome = run_with(quantum(3), parent_and_child);
    assert_eq!(outcome.output, "123");
    assert_eq!(outcome.result.unwrap().reaped, 2);
}

#[test]
fn spawned_processes_run_in_spawn_order_after_their_parent() {
    let outcome = run_with(quantum(100), |b, _| {
        let first = b.new_label();
        let second = b.new_label();
        b.emit_int(OpCode::OpNewAr, 4);
        b.emit_jump(OpCode::OpSpawn, second);
        b.emit_jump(OpCode::OpSpawn, first);
        b.emit(OpCode::OpHalt);

        b.place_label(first);
        b.emit_int(OpCode::OpNewAr, 4);
        print_int(b, 1);
        b.emit(OpCode::OpHalt);

        b.place_label(second);
        b.emit_int(OpCode::OpNewAr, 4);
        print_int(b, 2);
        b.emit(OpCode::OpHalt);
    });
    // The later spawn is linked directly behind the parent.
    assert_eq!(outcome.output, "12");
    assert_eq!(outcome.result.unwrap().reaped, 3);
}

#[test]
fn single_halting_process_takes_one_round() {
    let outcome = run_with(RunConfig::default(), |b, _| {
        b.emit(OpCode::OpHalt);
    });
    let report = outcome.result.unwrap();
    assert_eq!(report.rounds, 1);
    assert_eq!(report.quanta, 1);
    assert_eq!(report.reaped, 1);
    assert_eq!(outcome.sys.processes.live_count(), 0);
}

#[test]
fn fault_in_a_spawned_process_stops_the_run() {
    let outcome = run_with(quantum(1), |b, _| {
        let child = b.new_label();
        let spin = b.new_label();
        b.emit_int(OpCode::OpNewAr, 4);
        b.emit_jump(OpCode::OpSpawn, child);
        b.place_label(spin);
        b.emit_jump(OpCode::OpGoto, spin);

        b.place_label(child);
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(Value::Integer(1));
        b.push(Value::Integer(0));
        b.emit(OpCode::OpModInt);
        b.emit(OpCode::OpHalt);
    });
    assert!(matches!(outcome.result, Err(Fault::DivisionByZero)));
}

#[test]
fn periodic_collection_frees_garbage_and_keeps_live_code() {
    let config = RunConfig {
        quantum: 4,
        collect_every: Some(1),
        ..RunConfig::default()
    };
    let outcome = run_with(config, |b, _| {
        let top = b.new_label();
        b.emit_int(OpCode::OpNewAr, 6);
        b.push(Value::Integer(50));
        b.place_label(top);
        b.push(Value::Null);
        b.emit_int(OpCode::OpNewTuple, 3);
        b.emit(OpCode::OpPop);
        b.emit_int(OpCode::OpGetI, 0);
        b.push(Value::Integer(1));
        b.emit(OpCode::OpSubInt);
        b.emit_int(OpCode::OpSetI, 0);
        b.emit_int(OpCode::OpGetI, 0);
        b.push(Value::Integer(0));
        b.emit_jump(OpCode::OpJgt, top);
        print_int(b, 0);
        b.emit(OpCode::OpHalt);
    });
    let report = outcome.result.unwrap();
    assert_eq!(outcome.output, "0");
    assert!(report.collections > 10);
    assert!(outcome.sys.heap.total_collections() >= report.collections);
    assert!(outcome.sys.heap.live_count() < outcome.sys.heap.total_allocations());
}

#[test]
fn closed_stdout_streams_do_not_pile_up() {
    let config = RunConfig {
        quantum: 4,
        collect_every: Some(1),
        ..RunConfig::default()
    };
    let outcome = run_with(config, |b, _| {
        let top = b.new_label();
        b.emit_int(OpCode::OpNewAr, 6);
        b.push(Value::Integer(50));
        b.place_label(top);
        b.emit(OpCode::OpStdout);
        b.emit(OpCode::OpClose);
        b.emit_int(OpCode::OpGetI, 0);
        b.push(Value::Integer(1));
        b.emit(OpCode::OpSubInt);
        b.emit_int(OpCode::OpSetI, 0);
        b.emit_int(OpCode::OpGetI, 0);
        b.push(Value::Integer(0));
        b.emit_jump(OpCode::OpJgt, top);
        b.emit(OpCode::OpHalt);
    });
    let report = outcome.result.unwrap();
    assert!(report.collections > 10);
    assert_eq!(outcome.sys.processes.live_count(), 0);
}

#[test]
fn scheduler_driven_directly_over_a_booted_vm() {
    let mut sys = System::new(RunConfig::default());
    let mut builder = CodeBuilder::new();
    builder.emit_int(OpCode::OpNewAr, 2);
    builder.emit(OpCode::OpHalt);
    let code = builder.finish(&mut sys.heap).unwrap();
    let vm = VmState::new(&mut sys.heap, code).unwrap();
    let first = sys.spawn_vm(vm);

    let mut scheduler = Scheduler::new(first);
    let report = scheduler.run_to_completion(&mut sys).unwrap();
    assert_eq!(scheduler.head(), None);
    assert_eq!(report.reaped, 1);
    assert!(!sys.processes.contains(first));
}
