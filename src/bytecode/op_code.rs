use std::fmt;

use crate::runtime::{
    fault::Fault,
    gc::{GcHandle, GcHeap},
    value::Value,
};

/// Instruction set. The discriminants are the persisted encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    OpPush = 0,
    OpPop = 1,
    OpGet = 2,
    OpSet = 3,
    OpGetI = 4,
    OpSetI = 5,
    OpNewTuple = 6,
    OpFetchTuple = 7,
    OpStoreTuple = 8,
    OpNewDict = 9,
    OpFetchDict = 10,
    OpStoreDict = 11,
    OpNot = 12,
    OpAnd = 13,
    OpOr = 14,
    OpEqu = 15,
    OpNeq = 16,
    OpAddInt = 17,
    OpMulInt = 18,
    OpSubInt = 19,
    OpDivInt = 20,
    OpModInt = 21,
    OpGoto = 22,
    OpFun = 23,
    OpNewAr = 24,
    OpCall = 25,
    OpResume = 26,
    OpYield = 27,
    OpRet = 28,
    OpRest = 29,
    OpHalt = 30,
    OpJeq = 31,
    OpJne = 32,
    OpJlt = 33,
    OpJle = 34,
    OpJgt = 35,
    OpJge = 36,
    OpOpen = 37,
    OpStdout = 38,
    OpClose = 39,
    OpSpawn = 40,
    OpWrite = 41,
    OpSend = 42,
    OpPortray = 43,
    OpNop = 44,
    OpEof = 45,
}

pub const OPCODE_COUNT: usize = 46;

/// What follows an opcode in the code tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    /// Any literal value.
    Value,
    /// Integer immediate.
    Int,
    /// Integer code address.
    Addr,
}

impl OpCode {
    pub const ALL: [OpCode; OPCODE_COUNT] = [
        OpCode::OpPush,
        OpCode::OpPop,
        OpCode::OpGet,
        OpCode::OpSet,
        OpCode::OpGetI,
        OpCode::OpSetI,
        OpCode::OpNewTuple,
        OpCode::OpFetchTuple,
        OpCode::OpStoreTuple,
        OpCode::OpNewDict,
        OpCode::OpFetchDict,
        OpCode::OpStoreDict,
        OpCode::OpNot,
        OpCode::OpAnd,
        OpCode::OpOr,
        OpCode::OpEqu,
        OpCode::OpNeq,
        OpCode::OpAddInt,
        OpCode::OpMulInt,
        OpCode::OpSubInt,
        OpCode::OpDivInt,
        OpCode::OpModInt,
        OpCode::OpGoto,
        OpCode::OpFun,
        OpCode::OpNewAr,
        OpCode::OpCall,
        OpCode::OpResume,
        OpCode::OpYield,
        OpCode::OpRet,
        OpCode::OpRest,
        OpCode::OpHalt,
        OpCode::OpJeq,
        OpCode::OpJne,
        OpCode::OpJlt,
        OpCode::OpJle,
        OpCode::OpJgt,
        OpCode::OpJge,
        OpCode::OpOpen,
        OpCode::OpStdout,
        OpCode::OpClose,
        OpCode::OpSpawn,
        OpCode::OpWrite,
        OpCode::OpSend,
        OpCode::OpPortray,
        OpCode::OpNop,
        OpCode::OpEof,
    ];

    pub fn from_i32(code: i32) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn operand(self) -> OperandKind {
        match self {
            OpCode::OpPush => OperandKind::Value,
            OpCode::OpGetI
            | OpCode::OpSetI
            | OpCode::OpNewTuple
            | OpCode::OpNewDict
            | OpCode::OpNewAr
            | OpCode::OpCall
            | OpCode::OpResume
            | OpCode::OpYield => OperandKind::Int,
            OpCode::OpGoto
            | OpCode::OpFun
            | OpCode::OpJeq
            | OpCode::OpJne
            | OpCode::OpJlt
            | OpCode::OpJle
            | OpCode::OpJgt
            | OpCode::OpJge
            | OpCode::OpSpawn => OperandKind::Addr,
            _ => OperandKind::None,
        }
    }

    /// Number of operand slots following the opcode.
    pub fn arity(self) -> usize {
        match self.operand() {
            OperandKind::None => 0,
            _ => 1,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::OpPush => "PUSH",
            OpCode::OpPop => "POP",
            OpCode::OpGet => "GET",
            OpCode::OpSet => "SET",
            OpCode::OpGetI => "GETI",
            OpCode::OpSetI => "SETI",
            OpCode::OpNewTuple => "NEW_TUPLE",
            OpCode::OpFetchTuple => "FETCH_TUPLE",
            OpCode::OpStoreTuple => "STORE_TUPLE",
            OpCode::OpNewDict => "NEW_DICT",
            OpCode::OpFetchDict => "FETCH_DICT",
            OpCode::OpStoreDict => "STORE_DICT",
            OpCode::OpNot => "NOT",
            OpCode::OpAnd => "AND",
            OpCode::OpOr => "OR",
            OpCode::OpEqu => "EQU",
            OpCode::OpNeq => "NEQ",
            OpCode::OpAddInt => "ADD_INT",
            OpCode::OpMulInt => "MUL_INT",
            OpCode::OpSubInt => "SUB_INT",
            OpCode::OpDivInt => "DIV_INT",
            OpCode::OpModInt => "MOD_INT",
            OpCode::OpGoto => "GOTO",
            OpCode::OpFun => "FUN",
            OpCode::OpNewAr => "NEW_AR",
            OpCode::OpCall => "CALL",
            OpCode::OpResume => "RESUME",
            OpCode::OpYield => "YIELD",
            OpCode::OpRet => "RET",
            OpCode::OpRest => "REST",
            OpCode::OpHalt => "HALT",
            OpCode::OpJeq => "JEQ",
            OpCode::OpJne => "JNE",
            OpCode::OpJlt => "JLT",
            OpCode::OpJle => "JLE",
            OpCode::OpJgt => "JGT",
            OpCode::OpJge => "JGE",
            OpCode::OpOpen => "OPEN",
            OpCode::OpStdout => "STDOUT",
            OpCode::OpClose => "CLOSE",
            OpCode::OpSpawn => "SPAWN",
            OpCode::OpWrite => "WRITE",
            OpCode::OpSend => "SEND",
            OpCode::OpPortray => "PORTRAY",
            OpCode::OpNop => "NOP",
            OpCode::OpEof => "EOF",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == name)
    }
}

impl TryFrom<i32> for OpCode {
    type Error = Fault;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_i32(code).ok_or(Fault::BadOpcode(code))
    }
}

impl From<OpCode> for Value {
    fn from(op: OpCode) -> Self {
        Value::Integer(op as i32)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Renders a code tuple one instruction per line, `pc  MNEMONIC operand`.
///
/// Opcodes already rewritten into dispatch labels are resolved back to their
/// mnemonic. Stops after `EOF` or at the end of the tuple.
pub fn disassemble(heap: &GcHeap, code: GcHandle) -> Result<String, Fault> {
    let slots = heap.tuple_slots(code)?;
    let mut result = String::new();
    let mut pc = 0;

    while pc < slots.len() {
        let op = match slots[pc] {
            Value::Integer(n) => OpCode::from_i32(n),
            Value::Label(label) => OpCode::from_i32(label.index() as i32),
            _ => None,
        };
        let Some(op) = op else {
            result.push_str(&format!("{:04} ?? {}\n", pc, slots[pc]));
            pc += 1;
            continue;
        };
        let operand = match op.arity() {
            0 => String::new(),
            _ => match slots.get(pc + 1) {
                Some(v) => format!(" {}", v),
                None => " <missing>".to_string(),
            },
        };
        result.push_str(&format!("{:04} {}{}\n", pc, op, operand));
        if op == OpCode::OpEof {
            break;
        }
        pc += 1 + op.arity();
    }

    Ok(result)
}
