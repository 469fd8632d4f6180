//! Structured listings of Lua 5.1 function prototypes.
//!
//! Each function is printed as a brace-delimited block with its header, one
//! block per instruction (operands plus an annotation resolving constants,
//! upvalue and global names, jump targets and closures) and an FNV-1 hash of
//! the listed content. Two builds of the same source list the same hashes.

pub mod body;
pub mod constant;
pub mod error;
pub mod fnv;
pub mod options;
pub mod tree;

pub use error::{RenderError, Result};
pub use options::{Detail, NumberFormat, RenderOptions};
pub use tree::{fingerprint, render, render_to_string, FunctionHash};
