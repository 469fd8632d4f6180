/// Lua 5.1 opcodes and instruction encoding.
///
/// Instruction format (32 bits):
/// - Bits 0-5: OpCode (6 bits)
/// - Bits 6-13: A (8 bits)
/// - For iABC format:
///   - Bits 14-22: C (9 bits)
///   - Bits 23-31: B (9 bits)
/// - For iABx: Bx = bits 14-31 (unsigned 18 bits)
/// - For iAsBx: sBx = Bx - offset (signed interpretation)
///
/// B and C operands of constant-capable roles use the high bit of their
/// 9-bit field to select the constant table instead of a register.
use std::fmt;
use thiserror::Error;

/// Size constants for instruction fields.
const SIZE_OP: u32 = 6;
const SIZE_A: u32 = 8;
const SIZE_B: u32 = 9;
const SIZE_C: u32 = 9;
const SIZE_BX: u32 = SIZE_B + SIZE_C; // 18

/// Position constants.
const POS_OP: u32 = 0;
const POS_A: u32 = POS_OP + SIZE_OP; // 6
const POS_C: u32 = POS_A + SIZE_A; // 14
const POS_B: u32 = POS_C + SIZE_C; // 23
const POS_BX: u32 = POS_C;

/// Mask helpers.
const fn mask(n: u32) -> u32 {
    (1 << n) - 1
}

pub const MAX_A: u32 = mask(SIZE_A); // 255
pub const MAX_B: u32 = mask(SIZE_B); // 511
pub const MAX_C: u32 = mask(SIZE_C); // 511
pub const MAX_BX: u32 = mask(SIZE_BX); // 262143
pub const MAX_SBX: i32 = (MAX_BX >> 1) as i32; // 131071
pub const MIN_SBX: i32 = -MAX_SBX;

/// Bit that marks a B/C field as a constant reference.
pub const BIT_RK: u32 = 1 << (SIZE_B - 1); // 256

const OFFSET_SBX: i32 = MAX_SBX;

/// Returns true if a raw B/C field value refers to the constant table.
pub const fn is_k(field: u32) -> bool {
    field & BIT_RK != 0
}

/// Constant index encoded in a constant-flagged B/C field.
pub const fn index_k(field: u32) -> u32 {
    field & !BIT_RK
}

/// Encode a constant index as a B/C field value.
pub const fn rk_as_k(index: u32) -> u32 {
    index | BIT_RK
}

/// Error returned when the opcode field does not name a Lua 5.1 opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid opcode {0}")]
pub struct InvalidOpcode(pub u8);

/// All 38 Lua 5.1 opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Move = 0,
    LoadK,
    LoadBool,
    LoadNil,
    GetUpval,
    GetGlobal,
    GetTable,
    SetGlobal,
    SetUpval,
    SetTable,
    NewTable,
    Self_,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    Not,
    Len,
    Concat,
    Jmp,
    Eq,
    Lt,
    Le,
    Test,
    TestSet,
    Call,
    TailCall,
    Return,
    ForLoop,
    ForPrep,
    TForLoop,
    SetList,
    Close,
    Closure,
    VarArg,
}

/// Instruction format types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionFormat {
    IABC,
    IABx,
    IAsBx,
}

/// How an instruction uses its B or C operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpArgMode {
    /// Not used; omitted from listings.
    N,
    /// Used as a plain value.
    U,
    /// A register or a jump offset.
    R,
    /// A register or, when flagged, a constant index.
    K,
}

/// Static properties of one opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    pub name: &'static str,
    pub format: InstructionFormat,
    pub b_mode: OpArgMode,
    pub c_mode: OpArgMode,
}

/// Extra text an opcode contributes next to its operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotation {
    None,
    /// Constant at index Bx.
    Constant,
    /// Name of upvalue B.
    UpvalueName,
    /// String constant at index Bx, used as a global name.
    GlobalName,
    /// Constant C, if flagged.
    KeyedConstant,
    /// Constants B and C, whichever are flagged.
    ConstantPair,
    /// Absolute target of sBx.
    JumpTarget,
    /// Identity of nested function Bx.
    ClosureRef,
    /// Element count C, or the following word when C is 0.
    ListLength,
}

const fn op(
    name: &'static str,
    b_mode: OpArgMode,
    c_mode: OpArgMode,
    format: InstructionFormat,
) -> OpInfo {
    OpInfo {
        name,
        format,
        b_mode,
        c_mode,
    }
}

use InstructionFormat::{IABx, IAsBx, IABC};
use OpArgMode::{K, N, R, U};

/// Opcode properties, indexed by opcode value.
static OP_INFO: [OpInfo; OpCode::COUNT] = [
    op("MOVE", R, N, IABC),
    op("LOADK", K, N, IABx),
    op("LOADBOOL", U, U, IABC),
    op("LOADNIL", R, N, IABC),
    op("GETUPVAL", U, N, IABC),
    op("GETGLOBAL", K, N, IABx),
    op("GETTABLE", R, K, IABC),
    op("SETGLOBAL", K, N, IABx),
    op("SETUPVAL", U, N, IABC),
    op("SETTABLE", K, K, IABC),
    op("NEWTABLE", U, U, IABC),
    op("SELF", R, K, IABC),
    op("ADD", K, K, IABC),
    op("SUB", K, K, IABC),
    op("MUL", K, K, IABC),
    op("DIV", K, K, IABC),
    op("MOD", K, K, IABC),
    op("POW", K, K, IABC),
    op("UNM", R, N, IABC),
    op("NOT", R, N, IABC),
    op("LEN", R, N, IABC),
    op("CONCAT", R, R, IABC),
    op("JMP", R, N, IAsBx),
    op("EQ", K, K, IABC),
    op("LT", K, K, IABC),
    op("LE", K, K, IABC),
    op("TEST", R, U, IABC),
    op("TESTSET", R, U, IABC),
    op("CALL", U, U, IABC),
    op("TAILCALL", U, U, IABC),
    op("RETURN", U, N, IABC),
    op("FORLOOP", R, N, IAsBx),
    op("FORPREP", R, N, IAsBx),
    op("TFORLOOP", N, U, IABC),
    op("SETLIST", U, U, IABC),
    op("CLOSE", N, N, IABC),
    op("CLOSURE", U, N, IABx),
    op("VARARG", U, N, IABC),
];

impl OpCode {
    /// Number of opcodes.
    pub const COUNT: usize = 38;

    /// Every opcode in value order.
    pub const ALL: [OpCode; OpCode::COUNT] = {
        use OpCode::*;
        [
            Move, LoadK, LoadBool, LoadNil, GetUpval, GetGlobal, GetTable, SetGlobal, SetUpval,
            SetTable, NewTable, Self_, Add, Sub, Mul, Div, Mod, Pow, Unm, Not, Len, Concat, Jmp,
            Eq, Lt, Le, Test, TestSet, Call, TailCall, Return, ForLoop, ForPrep, TForLoop,
            SetList, Close, Closure, VarArg,
        ]
    };

    /// Get the opcode from a u8 value.
    pub fn from_u8(val: u8) -> Option<OpCode> {
        Self::ALL.get(val as usize).copied()
    }

    /// Static properties of this opcode.
    pub fn info(&self) -> &'static OpInfo {
        &OP_INFO[*self as usize]
    }

    /// Get the instruction format for this opcode.
    pub fn format(&self) -> InstructionFormat {
        self.info().format
    }

    /// Get the name of this opcode.
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Which annotation a listing shows for this opcode.
    pub fn annotation(&self) -> Annotation {
        use OpCode::*;
        match self {
            LoadK => Annotation::Constant,
            GetUpval | SetUpval => Annotation::UpvalueName,
            GetGlobal | SetGlobal => Annotation::GlobalName,
            GetTable | Self_ => Annotation::KeyedConstant,
            SetTable | Add | Sub | Mul | Div | Pow | Eq | Lt | Le => Annotation::ConstantPair,
            Jmp | ForLoop | ForPrep => Annotation::JumpTarget,
            Closure => Annotation::ClosureRef,
            SetList => Annotation::ListLength,
            _ => Annotation::None,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = InvalidOpcode;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        OpCode::from_u8(val).ok_or(InvalidOpcode(val))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A B or C operand as it appears in a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    /// Register, count or other plain value.
    Value(u32),
    /// Index into the constant table.
    Constant(u32),
}

impl Arg {
    /// The constant index, if this operand refers to one.
    pub fn constant(&self) -> Option<u32> {
        match self {
            Arg::Constant(idx) => Some(*idx),
            Arg::Value(_) => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => write!(f, "{v}"),
            // Constants are listed as -(index+1) to tell them from registers.
            Arg::Constant(idx) => write!(f, "{}", -1 - i64::from(*idx)),
        }
    }
}

/// Operand fields of a decoded instruction, laid out per format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operands {
    Abc {
        a: u32,
        b: Option<Arg>,
        c: Option<Arg>,
    },
    Abx {
        a: u32,
        bx: Arg,
    },
    /// `a` is `None` for JMP, which ignores it.
    AsBx {
        a: Option<u32>,
        sbx: i32,
    },
}

impl fmt::Display for Operands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operands::Abc { a, b, c } => {
                write!(f, "{a}")?;
                if let Some(b) = b {
                    write!(f, " {b}")?;
                }
                if let Some(c) = c {
                    write!(f, " {c}")?;
                }
                Ok(())
            }
            Operands::Abx { a, bx } => write!(f, "{a} {bx}"),
            Operands::AsBx { a: Some(a), sbx } => write!(f, "{a} {sbx}"),
            Operands::AsBx { a: None, sbx } => write!(f, "{sbx}"),
        }
    }
}

/// An instruction split into its opcode and listing operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub op: OpCode,
    pub operands: Operands,
}

/// A 32-bit Lua bytecode instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(pub u32);

impl Instruction {
    // ---- Constructors ----

    /// Create an iABC instruction.
    pub fn abc(op: OpCode, a: u32, b: u32, c: u32) -> Self {
        debug_assert!(a <= MAX_A, "A out of range: {a}");
        debug_assert!(b <= MAX_B, "B out of range: {b}");
        debug_assert!(c <= MAX_C, "C out of range: {c}");
        let mut i = (op as u32) << POS_OP;
        i |= a << POS_A;
        i |= b << POS_B;
        i |= c << POS_C;
        Instruction(i)
    }

    /// Create an iABx instruction.
    pub fn abx(op: OpCode, a: u32, bx: u32) -> Self {
        debug_assert!(a <= MAX_A, "A out of range: {a}");
        debug_assert!(bx <= MAX_BX, "Bx out of range: {bx}");
        let mut i = (op as u32) << POS_OP;
        i |= a << POS_A;
        i |= bx << POS_BX;
        Instruction(i)
    }

    /// Create an iAsBx instruction (signed Bx).
    pub fn asbx(op: OpCode, a: u32, sbx: i32) -> Self {
        debug_assert!(
            (MIN_SBX..=MAX_SBX).contains(&sbx),
            "sBx out of range: {sbx}"
        );
        let bx = (sbx + OFFSET_SBX) as u32;
        Self::abx(op, a, bx)
    }

    // ---- Decoders ----

    /// Raw value of the opcode field.
    pub fn opcode_field(&self) -> u8 {
        ((self.0 >> POS_OP) & mask(SIZE_OP)) as u8
    }

    /// Get the opcode.
    pub fn opcode(&self) -> Result<OpCode, InvalidOpcode> {
        OpCode::try_from(self.opcode_field())
    }

    /// Get field A.
    pub fn a(&self) -> u32 {
        (self.0 >> POS_A) & mask(SIZE_A)
    }

    /// Get field B.
    pub fn b(&self) -> u32 {
        (self.0 >> POS_B) & mask(SIZE_B)
    }

    /// Get field C.
    pub fn c(&self) -> u32 {
        (self.0 >> POS_C) & mask(SIZE_C)
    }

    /// Get field Bx (unsigned).
    pub fn bx(&self) -> u32 {
        (self.0 >> POS_BX) & mask(SIZE_BX)
    }

    /// Get field sBx (signed).
    pub fn sbx(&self) -> i32 {
        self.bx() as i32 - OFFSET_SBX
    }

    /// Split the instruction into opcode and operands using the opcode table.
    pub fn decode(&self) -> Result<Decoded, InvalidOpcode> {
        let op = self.opcode()?;
        let info = op.info();
        let operands = match info.format {
            InstructionFormat::IABC => Operands::Abc {
                a: self.a(),
                b: rk_arg(info.b_mode, self.b()),
                c: rk_arg(info.c_mode, self.c()),
            },
            InstructionFormat::IABx => Operands::Abx {
                a: self.a(),
                bx: match info.b_mode {
                    // Bx always names a constant for K roles; no flag bit.
                    OpArgMode::K => Arg::Constant(self.bx()),
                    _ => Arg::Value(self.bx()),
                },
            },
            InstructionFormat::IAsBx => Operands::AsBx {
                a: (op != OpCode::Jmp).then(|| self.a()),
                sbx: self.sbx(),
            },
        };
        Ok(Decoded { op, operands })
    }
}

fn rk_arg(mode: OpArgMode, field: u32) -> Option<Arg> {
    match mode {
        OpArgMode::N => None,
        OpArgMode::K if is_k(field) => Some(Arg::Constant(index_k(field))),
        _ => Some(Arg::Value(field)),
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.opcode() {
            Ok(op) => op,
            Err(InvalidOpcode(v)) => return write!(f, "OP_{v} 0x{:08x}", self.0),
        };
        write!(f, "{}", op.name())?;
        match op.format() {
            InstructionFormat::IABC => {
                write!(f, " A={} B={} C={}", self.a(), self.b(), self.c())?;
            }
            InstructionFormat::IABx => {
                write!(f, " A={} Bx={}", self.a(), self.bx())?;
            }
            InstructionFormat::IAsBx => {
                write!(f, " A={} sBx={}", self.a(), self.sbx())?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
