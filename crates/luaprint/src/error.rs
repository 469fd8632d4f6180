//! Rendering errors.

use std::io;
use thiserror::Error;

/// Why a listing could not be completed.
///
/// Apart from `Io`, every variant means the prototype tree broke one of its
/// own invariants. Output already written for the current function is left
/// in the sink and should be treated as incomplete.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("pc {pc}: invalid opcode {value}")]
    UnknownOpcode { pc: usize, value: u8 },

    #[error("pc {pc}: constant index {index} out of range ({len} constants)")]
    ConstantOutOfRange { pc: usize, index: usize, len: usize },

    #[error("pc {pc}: upvalue index {index} out of range ({len} upvalue names)")]
    UpvalueOutOfRange { pc: usize, index: usize, len: usize },

    #[error("pc {pc}: function index {index} out of range ({len} nested functions)")]
    NestedOutOfRange { pc: usize, index: usize, len: usize },

    #[error("pc {pc}: global name constant {index} is a {found}, not a string")]
    NotAString {
        pc: usize,
        index: usize,
        found: &'static str,
    },

    #[error("pc {pc}: SETLIST with C = 0 is the last instruction")]
    MissingListLength { pc: usize },

    #[error("functions nested deeper than {limit}")]
    TooDeep { limit: usize },
}

pub type Result<T> = std::result::Result<T, RenderError>;
