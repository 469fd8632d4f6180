//! Listing of a whole prototype tree.

use crate::body::render_body;
use crate::constant::{c_name, write_constant};
use crate::error::{RenderError, Result};
use crate::options::RenderOptions;
use luaprint_bytecode::{Proto, ProtoId};
use std::io::{self, Write};
use tracing::debug;

/// Fingerprint of one function in a rendered tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FunctionHash {
    /// Pre-order position in the tree, starting at [`ProtoId::ROOT`].
    pub id: ProtoId,
    /// Nesting depth; the root is 0.
    pub depth: usize,
    pub hash: u32,
}

/// Write the listing of `proto` and all nested functions to `out`.
///
/// Returns the fingerprint of every function in listing (pre-)order.
pub fn render<W: Write + ?Sized>(
    out: &mut W,
    proto: &Proto,
    opts: &RenderOptions,
) -> Result<Vec<FunctionHash>> {
    let functions = proto.tree_size();
    debug!(functions, detail = ?opts.detail, "rendering prototype tree");
    let mut hashes = Vec::with_capacity(functions);
    render_function(out, proto, opts, 0, &mut hashes)?;
    Ok(hashes)
}

/// Render to a string. Raw bytes in names and sources that are not UTF-8
/// are replaced.
pub fn render_to_string(proto: &Proto, opts: &RenderOptions) -> Result<String> {
    let mut buf = Vec::new();
    render(&mut buf, proto, opts)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Fingerprints only; the listing itself is discarded.
pub fn fingerprint(proto: &Proto) -> Result<Vec<FunctionHash>> {
    render(&mut io::sink(), proto, &RenderOptions::new())
}

fn render_function<W: Write + ?Sized>(
    out: &mut W,
    proto: &Proto,
    opts: &RenderOptions,
    depth: usize,
    hashes: &mut Vec<FunctionHash>,
) -> Result<()> {
    if let Some(limit) = opts.max_depth {
        if depth >= limit {
            return Err(RenderError::TooDeep { limit });
        }
    }
    // Every function listed so far precedes this one in pre-order.
    let id = ProtoId(ProtoId::ROOT.0 + hashes.len() as u32);

    writeln!(out, "{{")?;
    let hash = render_body(out, proto, id, opts)?;
    hashes.push(FunctionHash { id, depth, hash });
    if opts.is_full() {
        write_constants(out, proto, id, opts)?;
        write_locals(out, proto, id)?;
        write_upvalues(out, proto, id)?;
    }
    for child in &proto.protos {
        render_function(out, child, opts, depth + 1, hashes)?;
    }
    writeln!(out, "}},-- end of function")?;
    Ok(())
}

fn write_constants<W: Write + ?Sized>(
    out: &mut W,
    proto: &Proto,
    id: ProtoId,
    opts: &RenderOptions,
) -> io::Result<()> {
    writeln!(out, "constants ({}) for {id}:", proto.constants.len())?;
    for (i, k) in proto.constants.iter().enumerate() {
        write!(out, "\t{}\t", i + 1)?;
        write_constant(out, k, opts.number_format)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_locals<W: Write + ?Sized>(out: &mut W, proto: &Proto, id: ProtoId) -> io::Result<()> {
    writeln!(out, "locals ({}) for {id}:", proto.local_vars.len())?;
    for (i, local) in proto.local_vars.iter().enumerate() {
        write!(out, "\t{i}\t")?;
        out.write_all(c_name(&local.name))?;
        writeln!(out, "\t{}\t{}", local.start_pc + 1, local.end_pc + 1)?;
    }
    Ok(())
}

/// Stripped chunks have no names; only the empty table is listed.
fn write_upvalues<W: Write + ?Sized>(out: &mut W, proto: &Proto, id: ProtoId) -> io::Result<()> {
    let names = &proto.upvalue_names;
    writeln!(out, "upvalues ({}) for {id}:", names.len())?;
    for (i, name) in names.iter().enumerate() {
        write!(out, "\t{i}\t")?;
        out.write_all(c_name(name))?;
        writeln!(out)?;
    }
    Ok(())
}
