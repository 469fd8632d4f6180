use luaprint::{render_to_string, RenderOptions};
use luaprint_bytecode::opcode::{rk_as_k, Instruction, OpCode};
use luaprint_bytecode::{Constant, LocalVar, Proto};

/// Initialize a tracing subscriber with DEBUG level; safe to call from
/// every test.
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// `function add(a, b) return a + b end`, as luac 5.1 compiles it.
pub fn add_function() -> Proto {
    let mut p = Proto::with_source("@sample.lua");
    p.linedefined = 2;
    p.lastlinedefined = 2;
    p.num_params = 2;
    p.max_stack_size = 3;
    p.emit(Instruction::abc(OpCode::Add, 2, 0, 1), 2);
    p.emit(Instruction::abc(OpCode::Return, 2, 2, 0), 2);
    p.emit(Instruction::abc(OpCode::Return, 0, 1, 0), 2);
    p.local_vars.push(LocalVar::new("a", 0, 3));
    p.local_vars.push(LocalVar::new("b", 0, 3));
    p
}

/// A main chunk with one nested function:
///
/// ```lua
/// local t = {1, 2, 3}
/// function add(a, b) return a + b end
/// print(add(t[1], 10))
/// ```
pub fn sample_chunk() -> Proto {
    let mut p = Proto::with_source("@sample.lua");
    p.is_vararg = true;
    p.max_stack_size = 5;
    for n in [1.0, 2.0, 3.0] {
        p.add_constant(Constant::Number(n));
    }
    p.add_constant(Constant::str("add"));
    p.add_constant(Constant::str("print"));
    p.add_constant(Constant::Number(10.0));

    p.emit(Instruction::abc(OpCode::NewTable, 0, 3, 0), 1);
    p.emit(Instruction::abx(OpCode::LoadK, 1, 0), 1);
    p.emit(Instruction::abx(OpCode::LoadK, 2, 1), 1);
    p.emit(Instruction::abx(OpCode::LoadK, 3, 2), 1);
    p.emit(Instruction::abc(OpCode::SetList, 0, 3, 1), 1);
    p.emit(Instruction::abx(OpCode::Closure, 1, 0), 2);
    p.emit(Instruction::abx(OpCode::SetGlobal, 1, 3), 2);
    p.emit(Instruction::abx(OpCode::GetGlobal, 1, 4), 3);
    p.emit(Instruction::abx(OpCode::GetGlobal, 2, 3), 3);
    p.emit(Instruction::abc(OpCode::GetTable, 3, 0, rk_as_k(0)), 3);
    p.emit(Instruction::abx(OpCode::LoadK, 4, 5), 3);
    p.emit(Instruction::abc(OpCode::Call, 2, 3, 0), 3);
    p.emit(Instruction::abc(OpCode::Call, 1, 0, 1), 3);
    p.emit(Instruction::abc(OpCode::Return, 0, 1, 0), 3);
    p.local_vars.push(LocalVar::new("t", 5, 14));

    p.add_proto(add_function());
    p
}

/// A single-function prototype running `code` with `constants`.
pub fn proto_with(code: &[Instruction], constants: Vec<Constant>) -> Proto {
    let mut p = Proto::with_source("=test");
    p.constants = constants;
    for (pc, inst) in code.iter().enumerate() {
        p.emit(*inst, pc as u32 + 1);
    }
    p
}

pub fn summary(p: &Proto) -> String {
    render_to_string(p, &RenderOptions::new()).unwrap_or_else(|e| panic!("render failed: {e}"))
}

pub fn full(p: &Proto) -> String {
    render_to_string(p, &RenderOptions::new().full())
        .unwrap_or_else(|e| panic!("render failed: {e}"))
}

/// `(opname, opargs, annotation)` for every listed instruction.
pub fn instructions(text: &str) -> Vec<(String, String, String)> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if let Some(name) = line.strip_prefix("opname=\"") {
            let args = lines[i + 1]
                .strip_prefix("opargs=\"")
                .and_then(|s| s.strip_suffix("\","))
                .unwrap_or_else(|| panic!("no opargs after {line}"));
            let constant = lines[i + 2]
                .strip_prefix("constant = [=====[")
                .and_then(|s| s.strip_suffix("]=====],"))
                .unwrap_or_else(|| panic!("no constant after {line}"));
            out.push((
                name.trim_end_matches("\",").to_string(),
                args.to_string(),
                constant.to_string(),
            ));
        }
    }
    out
}

/// The `hash = N` values in listing order.
pub fn hashes(text: &str) -> Vec<u32> {
    text.lines()
        .filter_map(|l| l.strip_prefix("hash = "))
        .map(|h| h.trim_end_matches(',').parse().unwrap())
        .collect()
}
