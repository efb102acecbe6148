use crate::{
    bytecode::{builder::CodeBuilder, op_code::OpCode, term_format::save_to_vec},
    runtime::{
        fault::Fault,
        list::list_from_values,
        system::{SharedBuffer, System},
        value::Value,
    },
};

use super::test_support::{Machine, machine};

fn with_captured_stdout(
    build: impl FnOnce(&mut CodeBuilder, &mut System),
) -> (Machine, SharedBuffer) {
    let mut out = None;
    let m = machine(|b, sys| {
        out = Some(sys.capture_stdout());
        build(b, sys);
    });
    (m, out.unwrap())
}

#[test]
fn write_symbol_to_stdout() {
    let (mut m, out) = with_captured_stdout(|b, sys| {
        let text = sys.heap.alloc_symbol(b"hello\n");
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(text);
        b.emit(OpCode::OpStdout);
        b.emit(OpCode::OpWrite);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert_eq!(out.to_string_lossy(), "hello\n");
}

#[test]
fn write_tuple_of_small_integers() {
    let (mut m, out) = with_captured_stdout(|b, sys| {
        let bytes = sys.heap.alloc_tuple_from(
            Value::Null,
            vec![
                Value::Integer(b'o' as i32),
                Value::Integer(b'k' as i32),
                Value::Integer(256 + 10),
            ],
        );
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(bytes);
        b.emit(OpCode::OpStdout);
        b.emit(OpCode::OpWrite);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert_eq!(out.contents(), b"ok\n".to_vec());
}

#[test]
fn portray_renders_text() {
    let (mut m, out) = with_captured_stdout(|b, sys| {
        let list = list_from_values(&mut sys.heap, &[Value::Integer(1), Value::Boolean(true)]);
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(list);
        b.emit(OpCode::OpStdout);
        b.emit(OpCode::OpPortray);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert_eq!(out.to_string_lossy(), "[1, true]");
}

#[test]
fn send_writes_the_binary_term() {
    let mut term = Value::Null;
    let (mut m, out) = with_captured_stdout(|b, sys| {
        term = sys
            .heap
            .alloc_tuple_from(Value::Integer(7), vec![Value::Integer(-1), Value::Null]);
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(term);
        b.emit(OpCode::OpStdout);
        b.emit(OpCode::OpSend);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    assert_eq!(out.contents(), save_to_vec(&m.sys.heap, term).unwrap());
}

#[test]
fn spawn_links_the_child_after_the_parent() {
    let mut m = machine(|b, _| {
        let child = b.new_label();
        b.emit_int(OpCode::OpNewAr, 2);
        b.emit_jump(OpCode::OpSpawn, child);
        b.emit(OpCode::OpHalt);
        b.place_label(child);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    let Value::Process(child) = m.stack()[0] else {
        panic!("SPAWN must push a process");
    };
    let parent = m.sys.processes.get(m.me).unwrap();
    assert_eq!(parent.next(), Some(child));
    assert_eq!(m.sys.processes.get(child).unwrap().kind(), "vm");
}

#[test]
fn open_write_close_round_trips_through_a_file() {
    let path = std::env::temp_dir().join(format!("tuplevm-open-{}.txt", std::process::id()));
    let locator = path.to_string_lossy().into_owned();
    let mut m = machine(|b, sys| {
        let name = sys.heap.alloc_symbol(locator.as_bytes());
        let mode = sys.heap.alloc_symbol(b"w");
        let text = sys.heap.alloc_symbol(b"written");
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(name);
        b.push(mode);
        b.emit(OpCode::OpOpen);
        b.push(text);
        b.emit_int(OpCode::OpGetI, 0);
        b.emit(OpCode::OpWrite);
        b.emit(OpCode::OpClose);
        b.emit(OpCode::OpHalt);
    });
    m.finish().unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(contents, "written");
}

#[test]
fn open_failure_is_a_fault() {
    let mut m = machine(|b, sys| {
        let name = sys.heap.alloc_symbol(b"/nonexistent/tuplevm/dir/file");
        let mode = sys.heap.alloc_symbol(b"r");
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(name);
        b.push(mode);
        b.emit(OpCode::OpOpen);
    });
    assert!(matches!(m.run(100).unwrap_err(), Fault::Open { .. }));
}

#[test]
fn send_rejects_cyclic_terms() {
    let mut m = machine(|b, sys| {
        let tuple = sys.heap.alloc_tuple(Value::Null, 1);
        sys.heap.tuple_store(tuple.handle().unwrap(), 0, tuple).unwrap();
        b.emit_int(OpCode::OpNewAr, 4);
        b.push(tuple);
        b.emit(OpCode::OpStdout);
        b.emit(OpCode::OpSend);
    });
    assert!(matches!(m.run(100).unwrap_err(), Fault::CyclicTerm));
}
