//! Lua 5.1 bytecode model: instruction decoding and function prototypes.

pub mod opcode;
pub mod proto;

pub use opcode::{Annotation, Arg, Decoded, Instruction, InvalidOpcode, OpCode, Operands};
pub use proto::{Constant, LocalVar, Proto, ProtoId, SourceKind};
