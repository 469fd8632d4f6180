use super::helpers::*;
use luaprint::constant::{constant_to_string, escape_into};
use luaprint::{fingerprint, render_to_string, NumberFormat, RenderOptions};
use luaprint_bytecode::opcode::{Annotation, Instruction, OpCode};
use luaprint_bytecode::{Constant, Proto};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Inverse of the string escaping rules.
fn unescape(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < text.len() {
        if text[i] != b'\\' {
            out.push(text[i]);
            i += 1;
            continue;
        }
        let c = text[i + 1];
        let simple = match c {
            b'"' => Some(b'"'),
            b'\\' => Some(b'\\'),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0b),
            _ => None,
        };
        match simple {
            Some(b) => {
                out.push(b);
                i += 2;
            }
            None => {
                let digits = std::str::from_utf8(&text[i + 1..i + 4]).unwrap();
                out.push(digits.parse().unwrap());
                i += 4;
            }
        }
    }
    out
}

fn escaped(bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    escape_into(&mut buf, bytes);
    buf
}

#[test]
fn test_every_byte_round_trips() {
    for b in 0..=255u8 {
        let text = escaped(&[b]);
        assert_eq!(unescape(&text), vec![b], "byte {b}");
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            assert_eq!(text, vec![b], "printable byte {b} must pass through");
        } else {
            assert_eq!(text[0], b'\\', "byte {b} must be escaped");
            assert!(text.iter().all(|c| (0x20..0x7f).contains(c)));
        }
    }
}

#[test]
fn test_bell_and_quote_example() {
    let k = Constant::str([0x07, b'"']);
    assert_eq!(constant_to_string(&k, NumberFormat::Fixed), r#""\a\"""#);
}

#[test]
fn test_hash_changes_with_constant_content() {
    let code = [Instruction::abx(OpCode::LoadK, 0, 0)];
    let a = proto_with(&code, vec![Constant::str("hello")]);
    let b = proto_with(&code, vec![Constant::str("hellp")]);
    let c = proto_with(&code, vec![Constant::Number(1.0)]);
    let d = proto_with(&code, vec![Constant::Number(1.5)]);
    let hashes: Vec<u32> = [a, b, c, d]
        .iter()
        .map(|p| fingerprint(p).unwrap()[0].hash)
        .collect();
    for i in 0..hashes.len() {
        for j in i + 1..hashes.len() {
            assert_ne!(hashes[i], hashes[j], "constants {i} and {j} collide");
        }
    }
}

#[test]
fn test_hash_changes_with_jump_target() {
    let a = proto_with(&[Instruction::asbx(OpCode::Jmp, 0, 3)], vec![]);
    let b = proto_with(&[Instruction::asbx(OpCode::Jmp, 0, 4)], vec![]);
    assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
}

/// Opcodes that list no annotation, so an instruction's hash input is its word.
fn plain_opcode() -> impl Strategy<Value = OpCode> {
    let plain: Vec<OpCode> = OpCode::ALL
        .into_iter()
        .filter(|op| op.annotation() == Annotation::None)
        .collect();
    prop::sample::select(plain)
}

fn plain_instruction() -> impl Strategy<Value = Instruction> {
    (plain_opcode(), 0u32..256, 0u32..512, 0u32..512)
        .prop_map(|(op, a, b, c)| Instruction::abc(op, a, b, c))
}

fn string_constant() -> impl Strategy<Value = Constant> {
    prop::collection::vec(any::<u8>(), 0..64).prop_map(Constant::String)
}

proptest! {
    #[test]
    fn prop_rendering_is_deterministic(
        code in prop::collection::vec(plain_instruction(), 0..32),
        constants in prop::collection::vec(string_constant(), 0..8),
    ) {
        let mut p = Proto::with_source("@prop.lua");
        for inst in &code {
            p.emit(*inst, 1);
        }
        p.constants = constants;
        p.add_proto(p.clone());
        let opts = RenderOptions::new().full();
        let first = render_to_string(&p, &opts).unwrap();
        let second = render_to_string(&p.clone(), &opts).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_escaping_round_trips(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let text = escaped(&bytes);
        prop_assert!(text.iter().all(|c| (0x20..0x7f).contains(c)));
        prop_assert_eq!(unescape(&text), bytes);
    }

    #[test]
    fn prop_single_bit_flip_changes_hash(
        code in prop::collection::vec(plain_instruction(), 1..32),
        pick in any::<prop::sample::Index>(),
        bit in 6u32..32,
    ) {
        let original = proto_with(&code, vec![]);
        let mut flipped = original.clone();
        let pc = pick.index(code.len());
        flipped.code[pc] = Instruction(code[pc].0 ^ (1 << bit));

        let a = fingerprint(&original).unwrap();
        let b = fingerprint(&flipped).unwrap();
        prop_assert_ne!(a[0].hash, b[0].hash);
    }
}
