#![no_main]

use libfuzzer_sys::fuzz_target;
use luaprint::{render, RenderOptions};
use luaprint_bytecode::opcode::Instruction;
use luaprint_bytecode::{Constant, Proto};

fuzz_target!(|data: &[u8]| {
    // Arbitrary words break the prototype invariants on purpose: rendering
    // must report them as errors, never panic.
    let mut p = Proto::with_source("=fuzz");
    p.add_constant(Constant::str("k"));
    p.add_constant(Constant::Number(1.0));
    p.add_upvalue("u");
    p.add_proto(Proto::new());
    for (pc, word) in data.chunks_exact(4).enumerate() {
        let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        p.emit(Instruction(word), pc as u32);
    }
    let _ = render(&mut std::io::sink(), &p, &RenderOptions::new().full());
});
