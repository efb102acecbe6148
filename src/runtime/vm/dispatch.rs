use crate::{
    bytecode::op_code::{OPCODE_COUNT, OpCode},
    runtime::{fault::Fault, value::Value},
};

use super::{
    Interpreter, binary_ops, comparison_ops, function_call, index_ops, process_ops,
};

type Handler = fn(&mut Interpreter<'_>) -> Result<(), Fault>;

/// Handlers indexed by opcode number; a threaded code slot holds the index.
static HANDLERS: [Handler; OPCODE_COUNT] = [
    index_ops::push,
    index_ops::pop,
    index_ops::get,
    index_ops::set,
    index_ops::get_immediate,
    index_ops::set_immediate,
    index_ops::new_tuple,
    index_ops::fetch_tuple,
    index_ops::store_tuple,
    index_ops::new_dict,
    index_ops::fetch_dict,
    index_ops::store_dict,
    binary_ops::not,
    binary_ops::and,
    binary_ops::or,
    comparison_ops::equ,
    comparison_ops::neq,
    binary_ops::arithmetic,
    binary_ops::arithmetic,
    binary_ops::arithmetic,
    binary_ops::arithmetic,
    binary_ops::arithmetic,
    function_call::goto,
    function_call::fun,
    function_call::new_ar,
    function_call::call,
    function_call::resume,
    function_call::yield_values,
    function_call::ret,
    function_call::rest,
    function_call::halt,
    comparison_ops::branch,
    comparison_ops::branch,
    comparison_ops::branch,
    comparison_ops::branch,
    comparison_ops::branch,
    comparison_ops::branch,
    process_ops::open,
    process_ops::stdout,
    process_ops::close,
    process_ops::spawn,
    process_ops::write,
    process_ops::send,
    process_ops::portray,
    nop,
    eof,
];

/// Reads an instruction slot, plain or threaded.
pub(super) fn decode(slot: Value) -> Result<OpCode, Fault> {
    match slot {
        Value::Integer(code) => OpCode::try_from(code),
        Value::Label(label) => OpCode::try_from(label.index() as i32),
        other => Err(Fault::type_mismatch("dispatch", "Integer", &other)),
    }
}

/// Switch dispatch.
pub(super) fn execute(interp: &mut Interpreter<'_>, op: OpCode) -> Result<(), Fault> {
    match op {
        OpCode::OpPush => index_ops::push(interp),
        OpCode::OpPop => index_ops::pop(interp),
        OpCode::OpGet => index_ops::get(interp),
        OpCode::OpSet => index_ops::set(interp),
        OpCode::OpGetI => index_ops::get_immediate(interp),
        OpCode::OpSetI => index_ops::set_immediate(interp),
        OpCode::OpNewTuple => index_ops::new_tuple(interp),
        OpCode::OpFetchTuple => index_ops::fetch_tuple(interp),
        OpCode::OpStoreTuple => index_ops::store_tuple(interp),
        OpCode::OpNewDict => index_ops::new_dict(interp),
        OpCode::OpFetchDict => index_ops::fetch_dict(interp),
        OpCode::OpStoreDict => index_ops::store_dict(interp),
        OpCode::OpNot => binary_ops::not(interp),
        OpCode::OpAnd => binary_ops::and(interp),
        OpCode::OpOr => binary_ops::or(interp),
        OpCode::OpEqu => comparison_ops::equ(interp),
        OpCode::OpNeq => comparison_ops::neq(interp),
        OpCode::OpAddInt
        | OpCode::OpMulInt
        | OpCode::OpSubInt
        | OpCode::OpDivInt
        | OpCode::OpModInt => binary_ops::arithmetic(interp),
        OpCode::OpGoto => function_call::goto(interp),
        OpCode::OpFun => function_call::fun(interp),
        OpCode::OpNewAr => function_call::new_ar(interp),
        OpCode::OpCall => function_call::call(interp),
        OpCode::OpResume => function_call::resume(interp),
        OpCode::OpYield => function_call::yield_values(interp),
        OpCode::OpRet => function_call::ret(interp),
        OpCode::OpRest => function_call::rest(interp),
        OpCode::OpHalt => function_call::halt(interp),
        OpCode::OpJeq
        | OpCode::OpJne
        | OpCode::OpJlt
        | OpCode::OpJle
        | OpCode::OpJgt
        | OpCode::OpJge => comparison_ops::branch(interp),
        OpCode::OpOpen => process_ops::open(interp),
        OpCode::OpStdout => process_ops::stdout(interp),
        OpCode::OpClose => process_ops::close(interp),
        OpCode::OpSpawn => process_ops::spawn(interp),
        OpCode::OpWrite => process_ops::write(interp),
        OpCode::OpSend => process_ops::send(interp),
        OpCode::OpPortray => process_ops::portray(interp),
        OpCode::OpNop => nop(interp),
        OpCode::OpEof => eof(interp),
    }
}

/// Threaded dispatch: a label slot selects its handler without decoding.
/// Slots the threading pass never reached (`EOF` and anything after it)
/// still hold integers and go through the same table by opcode number.
pub(super) fn jump_through_table(interp: &mut Interpreter<'_>, slot: Value) -> Result<(), Fault> {
    let index = match slot {
        Value::Label(label) => label.index() as usize,
        _ => interp.op as usize,
    };
    let handler = HANDLERS
        .get(index)
        .ok_or(Fault::BadOpcode(index as i32))?;
    handler(interp)
}

fn nop(_interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    Ok(())
}

fn eof(interp: &mut Interpreter<'_>) -> Result<(), Fault> {
    Err(Fault::ExecutedEof { pc: interp.pc })
}
