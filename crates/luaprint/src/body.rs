//! Listing of one function: header, instructions, fingerprint.

use crate::constant::{c_name, write_constant};
use crate::error::{RenderError, Result};
use crate::fnv::Fnv1;
use crate::options::RenderOptions;
use luaprint_bytecode::opcode::{Annotation, Decoded, Instruction, InvalidOpcode, Operands};
use luaprint_bytecode::{Constant, Proto, ProtoId};
use std::io::Write;
use tracing::{debug, trace};

/// Write the header and instruction blocks of `proto` and return its hash.
///
/// `id` is the prototype's identity in its tree; nested functions named by
/// CLOSURE are identified relative to it. The hash folds, in listing order,
/// every instruction word and every value shown in the instruction
/// annotations. Nested functions are not listed.
pub fn render_body<W: Write + ?Sized>(
    out: &mut W,
    proto: &Proto,
    id: ProtoId,
    opts: &RenderOptions,
) -> Result<u32> {
    BodyRenderer {
        out,
        proto,
        id,
        opts,
        hash: Fnv1::new(),
    }
    .run()
}

struct BodyRenderer<'a, W: Write + ?Sized> {
    out: &'a mut W,
    proto: &'a Proto,
    id: ProtoId,
    opts: &'a RenderOptions,
    hash: Fnv1,
}

impl<'a, W: Write + ?Sized> BodyRenderer<'a, W> {
    fn run(mut self) -> Result<u32> {
        debug!(
            id = %self.id,
            instructions = self.proto.code.len(),
            "rendering function"
        );
        self.header()?;
        self.code()?;
        let hash = self.hash.finish();
        debug!(id = %self.id, hash, "function rendered");
        Ok(hash)
    }

    fn header(&mut self) -> Result<()> {
        let p = self.proto;
        let out = &mut *self.out;
        writeln!(out, "header={{")?;
        out.write_all(b"source = [[")?;
        out.write_all(c_name(p.source_kind().display_bytes()))?;
        out.write_all(b"]],\n")?;
        writeln!(out, "linedefined = {},", p.linedefined)?;
        writeln!(out, "lastlinedefined = {},", p.lastlinedefined)?;
        writeln!(out, "sizecode = {},", p.code.len())?;
        writeln!(out, "address = {},", self.id)?;
        writeln!(out, "numparams = {},", p.num_params)?;
        writeln!(out, "vararg = {},", p.is_vararg)?;
        writeln!(out, "maxstacksize = {},", p.max_stack_size)?;
        writeln!(out, "nups = {},", p.num_upvalues)?;
        writeln!(out, "sizelocvars = {},", p.local_vars.len())?;
        writeln!(out, "sizek = {},", p.constants.len())?;
        writeln!(out, "sizep = {},", p.protos.len())?;
        writeln!(out, "}},-- end of header ")?;
        Ok(())
    }

    fn code(&mut self) -> Result<()> {
        writeln!(self.out, "opcode = {{")?;
        let mut pc = 0;
        while pc < self.proto.code.len() {
            pc += self.instruction(pc)?;
        }
        writeln!(self.out, "hash = {},", self.hash.finish())?;
        writeln!(self.out, "}},")?;
        Ok(())
    }

    /// List the instruction at `pc`; returns how many words it used.
    fn instruction(&mut self, pc: usize) -> Result<usize> {
        let inst = self.proto.code[pc];
        self.hash.write_u32(inst.0);
        let decoded = inst
            .decode()
            .map_err(|InvalidOpcode(value)| RenderError::UnknownOpcode { pc, value })?;
        trace!(pc, op = decoded.op.name(), word = inst.0, "decoded");

        writeln!(self.out, "{{")?;
        writeln!(self.out, "line={},", self.proto.get_line(pc))?;
        writeln!(self.out, "opname=\"{}\",", decoded.op.name())?;
        writeln!(self.out, "opargs=\"{}\",", decoded.operands)?;
        write!(self.out, "constant = [=====[")?;
        let words = self.annotate(pc, inst, &decoded)?;
        writeln!(self.out, "]=====],")?;
        writeln!(self.out, "}},")?;
        Ok(words)
    }

    fn annotate(&mut self, pc: usize, inst: Instruction, decoded: &Decoded) -> Result<usize> {
        let proto = self.proto;
        match decoded.op.annotation() {
            Annotation::None => {}
            Annotation::Constant => {
                let k = self.constant(pc, inst.bx())?;
                let digest = self.write_constant(k)?;
                self.hash.write_u32(digest);
            }
            Annotation::UpvalueName => {
                let names = &proto.upvalue_names;
                let name: &[u8] = if names.is_empty() {
                    b"-"
                } else {
                    let index = inst.b() as usize;
                    names
                        .get(index)
                        .map(Vec::as_slice)
                        .ok_or(RenderError::UpvalueOutOfRange {
                            pc,
                            index,
                            len: names.len(),
                        })?
                };
                self.write_name(name)?;
            }
            Annotation::GlobalName => {
                let index = inst.bx();
                let k = self.constant(pc, index)?;
                let name = k.as_bytes().ok_or(RenderError::NotAString {
                    pc,
                    index: index as usize,
                    found: k.type_name(),
                })?;
                self.write_name(name)?;
            }
            Annotation::KeyedConstant => {
                if let Some(index) = c_constant(decoded) {
                    let k = self.constant(pc, index)?;
                    let digest = self.write_constant(k)?;
                    self.hash.write_u32(digest);
                }
            }
            Annotation::ConstantPair => {
                let (b, c) = match decoded.operands {
                    Operands::Abc { b, c, .. } => {
                        (b.and_then(|b| b.constant()), c.and_then(|c| c.constant()))
                    }
                    _ => (None, None),
                };
                if b.is_some() || c.is_some() {
                    let mut sum = self.constant_or_dash(pc, b)?;
                    self.out.write_all(b" ")?;
                    sum = sum.wrapping_add(self.constant_or_dash(pc, c)?);
                    self.hash.write_u32(sum);
                }
            }
            Annotation::JumpTarget => {
                let target = inst.sbx() + pc as i32 + 2;
                write!(self.out, "to {target}")?;
                self.hash.write_i32(target);
            }
            Annotation::ClosureRef => {
                let index = inst.bx() as usize;
                let child = proto
                    .child_id(self.id, index)
                    .ok_or(RenderError::NestedOutOfRange {
                        pc,
                        index,
                        len: proto.protos.len(),
                    })?;
                write!(self.out, "{child}")?;
                self.hash.write_u32(child.0);
            }
            Annotation::ListLength => {
                // C = 0 means the count did not fit and occupies the next word.
                let (count, words) = match inst.c() {
                    0 => {
                        let next = proto
                            .code
                            .get(pc + 1)
                            .ok_or(RenderError::MissingListLength { pc })?;
                        (next.0 as i32, 2)
                    }
                    c => (c as i32, 1),
                };
                write!(self.out, "{count}")?;
                self.hash.write_i32(count);
                return Ok(words);
            }
        }
        Ok(1)
    }

    fn constant(&self, pc: usize, index: u32) -> Result<&'a Constant> {
        let proto: &'a Proto = self.proto;
        let constants = &proto.constants;
        constants
            .get(index as usize)
            .ok_or(RenderError::ConstantOutOfRange {
                pc,
                index: index as usize,
                len: constants.len(),
            })
    }

    fn write_constant(&mut self, k: &Constant) -> Result<u32> {
        Ok(write_constant(&mut *self.out, k, self.opts.number_format)?)
    }

    /// Write constant `index` and return its digest, or `-` and 0.
    fn constant_or_dash(&mut self, pc: usize, index: Option<u32>) -> Result<u32> {
        match index {
            Some(index) => {
                let k = self.constant(pc, index)?;
                self.write_constant(k)
            }
            None => {
                self.out.write_all(b"-")?;
                Ok(0)
            }
        }
    }

    /// Names are written raw and cut at the first NUL, like C strings.
    fn write_name(&mut self, name: &[u8]) -> Result<()> {
        let name = c_name(name);
        self.out.write_all(name)?;
        self.hash.write(name);
        Ok(())
    }
}

fn c_constant(decoded: &Decoded) -> Option<u32> {
    match decoded.operands {
        Operands::Abc { c, .. } => c.and_then(|c| c.constant()),
        _ => None,
    }
}
