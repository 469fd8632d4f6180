//! Constant literals: string escaping, number text and per-constant digests.

use crate::fnv::Fnv1;
use crate::options::NumberFormat;
use luaprint_bytecode::Constant;
use std::io::{self, Write};

/// Write `k` as a Lua literal and return its digest.
///
/// The digest is the FNV-1 hash of the constant's raw value (the unescaped
/// string bytes, the f64 bits, or the boolean as a 4-byte 1/0); nil has no
/// bytes and digests to 0.
pub fn write_constant<W: Write + ?Sized>(
    out: &mut W,
    k: &Constant,
    format: NumberFormat,
) -> io::Result<u32> {
    let mut hash = Fnv1::new();
    match k {
        Constant::Nil => out.write_all(b"nil")?,
        Constant::Boolean(b) => {
            let text: &[u8] = if *b { b"true" } else { b"false" };
            out.write_all(text)?;
            hash.write_i32(i32::from(*b));
        }
        Constant::Number(n) => {
            out.write_all(format_number(*n, format).as_bytes())?;
            hash.write_f64(*n);
        }
        Constant::String(bytes) => {
            let mut buf = Vec::with_capacity(bytes.len() + 2);
            buf.push(b'"');
            escape_into(&mut buf, bytes);
            buf.push(b'"');
            out.write_all(&buf)?;
            hash.write(bytes);
        }
    }
    Ok(hash.finish())
}

/// Render `k` to a string, discarding the digest.
pub fn constant_to_string(k: &Constant, format: NumberFormat) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_constant(&mut buf, k, format);
    // Escaping leaves only printable ASCII.
    String::from_utf8_lossy(&buf).into_owned()
}

/// Append the escaped form of a Lua string body (without quotes).
pub fn escape_into(buf: &mut Vec<u8>, bytes: &[u8]) {
    for &c in bytes {
        match c {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            0x07 => buf.extend_from_slice(b"\\a"),
            0x08 => buf.extend_from_slice(b"\\b"),
            0x0c => buf.extend_from_slice(b"\\f"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0x0b => buf.extend_from_slice(b"\\v"),
            // Space through tilde, as C isprint in the "C" locale.
            0x20..=0x7e => buf.push(c),
            _ => {
                // Cannot fail on a Vec.
                let _ = write!(buf, "\\{c:03}");
            }
        }
    }
}

/// The part of a name before its first NUL, as C string output shows it.
///
/// Applies to source, local and upvalue names; string constants keep every
/// byte.
pub fn c_name(bytes: &[u8]) -> &[u8] {
    bytes.split(|&b| b == 0).next().unwrap_or_default()
}

/// Format a number constant.
pub fn format_number(v: f64, format: NumberFormat) -> String {
    if v.is_nan() {
        return if v.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    match format {
        NumberFormat::Fixed => format!("{v:.6}"),
        NumberFormat::Lua => format_general(v, 14),
    }
}

/// C `%.<precision>g` for finite values.
fn format_general(v: f64, precision: usize) -> String {
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or_default();
    if exp < -4 || exp >= precision as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{v:.decimals$}")).to_string()
    }
}

/// Drop trailing zeros after a decimal point, and the point if bare.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
