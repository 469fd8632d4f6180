/// Function prototype: holds compiled bytecode, constants, and debug info.
use crate::opcode::Instruction;
use std::fmt;

/// First byte of a precompiled chunk (`"\x1bLua"`).
pub const LUA_SIGNATURE: &[u8; 4] = b"\x1bLua";

/// A constant value in the constant pool.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Number(f64),
    /// Raw bytes; Lua strings need not be UTF-8.
    String(Vec<u8>),
}

impl Constant {
    /// Convenience constructor for string constants.
    pub fn str(s: impl AsRef<[u8]>) -> Self {
        Constant::String(s.as_ref().to_vec())
    }

    /// The string bytes, if this is a string constant.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Constant::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Lua type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Nil => "nil",
            Constant::Boolean(_) => "boolean",
            Constant::Number(_) => "number",
            Constant::String(_) => "string",
        }
    }
}

/// A local variable debug entry.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVar {
    pub name: Vec<u8>,
    /// First PC where the variable is active.
    pub start_pc: u32,
    /// First PC where the variable is dead.
    pub end_pc: u32,
}

impl LocalVar {
    pub fn new(name: impl AsRef<[u8]>, start_pc: u32, end_pc: u32) -> Self {
        LocalVar {
            name: name.as_ref().to_vec(),
            start_pc,
            end_pc,
        }
    }
}

/// Opaque identity of a prototype within its tree.
///
/// Stands in for the prototype's address in listings and fingerprints, so it
/// is stable across runs for the same tree shape. Prototypes are numbered in
/// pre-order from [`ProtoId::ROOT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtoId(pub u32);

impl ProtoId {
    /// Identity of the outermost prototype.
    pub const ROOT: ProtoId = ProtoId(1);
}

impl fmt::Display for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Where a chunk's source name says it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind<'a> {
    /// `@file` or `=name`: the name without its marker.
    Named(&'a [u8]),
    /// Loaded from a precompiled binary chunk.
    Binary,
    /// Loaded from an in-memory string.
    String,
}

impl<'a> SourceKind<'a> {
    /// Classify a raw source name by its leading byte.
    pub fn classify(source: &'a [u8]) -> Self {
        match source.first() {
            Some(b'@') | Some(b'=') => SourceKind::Named(&source[1..]),
            Some(&b) if b == LUA_SIGNATURE[0] => SourceKind::Binary,
            _ => SourceKind::String,
        }
    }

    /// Bytes shown for this source in a listing.
    pub fn display_bytes(&self) -> &'a [u8] {
        match self {
            SourceKind::Named(name) => name,
            SourceKind::Binary => b"(bstring)",
            SourceKind::String => b"(string)",
        }
    }
}

/// A compiled function prototype.
#[derive(Clone, Debug)]
pub struct Proto {
    /// Bytecode instructions.
    pub code: Vec<Instruction>,
    /// Constant pool.
    pub constants: Vec<Constant>,
    /// Nested function prototypes.
    pub protos: Vec<Proto>,
    /// Source name, including its `@`/`=` marker.
    pub source: Vec<u8>,
    /// Line where the function starts; 0 for the main chunk.
    pub linedefined: u32,
    pub lastlinedefined: u32,
    /// Number of fixed parameters.
    pub num_params: u8,
    /// Whether this function accepts varargs.
    pub is_vararg: bool,
    /// Maximum stack size needed.
    pub max_stack_size: u8,
    /// Number of upvalues, whether or not their names are known.
    pub num_upvalues: u8,

    // --- Debug info ---
    /// Source line per instruction; empty when stripped.
    pub line_info: Vec<u32>,
    /// Local variable debug info.
    pub local_vars: Vec<LocalVar>,
    /// Upvalue names; empty when stripped.
    pub upvalue_names: Vec<Vec<u8>>,
}

impl Proto {
    /// Create a new empty prototype.
    pub fn new() -> Self {
        Proto {
            code: Vec::new(),
            constants: Vec::new(),
            protos: Vec::new(),
            source: Vec::new(),
            linedefined: 0,
            lastlinedefined: 0,
            num_params: 0,
            is_vararg: false,
            max_stack_size: 2, // minimum
            num_upvalues: 0,
            line_info: Vec::new(),
            local_vars: Vec::new(),
            upvalue_names: Vec::new(),
        }
    }

    /// Create an empty prototype with the given source name.
    pub fn with_source(source: impl AsRef<[u8]>) -> Self {
        Proto {
            source: source.as_ref().to_vec(),
            ..Proto::new()
        }
    }

    /// Append an instruction at the given source line.
    pub fn emit(&mut self, inst: Instruction, line: u32) -> usize {
        let pc = self.code.len();
        self.code.push(inst);
        self.line_info.push(line);
        pc
    }

    /// Append a constant, returning its index. Does not deduplicate.
    pub fn add_constant(&mut self, k: Constant) -> usize {
        self.constants.push(k);
        self.constants.len() - 1
    }

    /// Append a nested prototype, returning its index.
    pub fn add_proto(&mut self, p: Proto) -> usize {
        self.protos.push(p);
        self.protos.len() - 1
    }

    /// Append a named upvalue, keeping `num_upvalues` in step.
    pub fn add_upvalue(&mut self, name: impl AsRef<[u8]>) -> usize {
        self.upvalue_names.push(name.as_ref().to_vec());
        self.num_upvalues = self.upvalue_names.len() as u8;
        self.upvalue_names.len() - 1
    }

    /// Get the line number for a given PC, or 0 if unknown.
    pub fn get_line(&self, pc: usize) -> u32 {
        self.line_info.get(pc).copied().unwrap_or(0)
    }

    /// How the source name is displayed.
    pub fn source_kind(&self) -> SourceKind<'_> {
        SourceKind::classify(&self.source)
    }

    /// Number of prototypes in this tree, including this one.
    pub fn tree_size(&self) -> usize {
        1 + self.protos.iter().map(Proto::tree_size).sum::<usize>()
    }

    /// Identity of nested prototype `index` when this one is `id`.
    ///
    /// In pre-order a child comes after its parent and after every prototype
    /// under its earlier siblings.
    pub fn child_id(&self, id: ProtoId, index: usize) -> Option<ProtoId> {
        if index >= self.protos.len() {
            return None;
        }
        let skipped: usize = self.protos[..index].iter().map(Proto::tree_size).sum();
        Some(ProtoId(id.0 + 1 + skipped as u32))
    }
}

impl Default for Proto {
    fn default() -> Self {
        Self::new()
    }
}
