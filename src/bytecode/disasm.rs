use crate::bytecode::ir::{CompiledProgram, FunctionBytecode};
use crate::bytecode::op::OpCode;

/// Print disassembly of a compiled program, functions sorted by name.
pub fn print_program(program: &CompiledProgram) {
    println!("=== BYTECODE PROGRAM ===\n");

    let mut names: Vec<_> = program.functions.keys().collect();
    names.sort();

    for name in names {
        let bytecode = &program.functions[name];
        println!("════════════════════════════════════════");
        println!(" {}", name);
        println!(" {} bytes, {} local slots", bytecode.code.len(), bytecode.n_locals);
        println!("════════════════════════════════════════");
        print!("{}", disassemble_to_string(bytecode));
        println!();
    }
}

/// One decoded instruction: opcode, rendered operand, and the offset of the
/// following instruction. `None` when the stream is truncated mid-operand
/// or the opcode byte is unassigned.
fn decode_at(code: &[u8], ip: usize) -> Option<(OpCode, String, usize)> {
    let op = OpCode::from_byte(*code.get(ip)?)?;
    let mut cursor = ip + 1;

    let operand = match op {
        OpCode::PushInt => {
            let value = i64::from_le_bytes(code.get(cursor..cursor + 8)?.try_into().ok()?);
            cursor += 8;
            format!("{}", value)
        }
        OpCode::PushFloat => {
            let value = f64::from_le_bytes(code.get(cursor..cursor + 8)?.try_into().ok()?);
            cursor += 8;
            format!("{:?}", value)
        }
        OpCode::PushBool => {
            let value = *code.get(cursor)?;
            cursor += 1;
            format!("{}", value != 0)
        }
        OpCode::PushStr => {
            let len = u32::from_le_bytes(code.get(cursor..cursor + 4)?.try_into().ok()?) as usize;
            cursor += 4;
            let text = String::from_utf8_lossy(code.get(cursor..cursor + len)?).into_owned();
            cursor += len;
            format!("{:?}", text)
        }
        OpCode::LoadLocal => {
            let slot = u32::from_le_bytes(code.get(cursor..cursor + 4)?.try_into().ok()?);
            cursor += 4;
            format!("[{}]", slot)
        }
        OpCode::Jump | OpCode::JumpIfFalse => {
            let displacement =
                i32::from_le_bytes(code.get(cursor..cursor + 4)?.try_into().ok()?);
            cursor += 4;
            let target = cursor as i64 + displacement as i64;
            format!("{:+} (→ {:04})", displacement, target)
        }
        OpCode::Call => {
            let len = u32::from_le_bytes(code.get(cursor..cursor + 4)?.try_into().ok()?) as usize;
            cursor += 4;
            let name = String::from_utf8_lossy(code.get(cursor..cursor + len)?).into_owned();
            cursor += len;
            let argc = u32::from_le_bytes(code.get(cursor..cursor + 4)?.try_into().ok()?);
            cursor += 4;
            format!("\"{}\" argc={}", name, argc)
        }
        _ => String::new(),
    };

    Some((op, operand, cursor))
}

/// Byte offsets that some jump in the stream lands on.
fn collect_jump_targets(code: &[u8]) -> Vec<usize> {
    let mut targets = Vec::new();
    let mut ip = 0;

    while ip < code.len() {
        let Some((op, _, next)) = decode_at(code, ip) else {
            break;
        };
        if matches!(op, OpCode::Jump | OpCode::JumpIfFalse) {
            let displacement = i32::from_le_bytes(
                code[ip + 1..ip + 5].try_into().unwrap_or([0; 4]),
            );
            let target = (next as i64 + displacement as i64) as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        ip = next;
    }

    targets
}

/// Return disassembly as a String (also used by tests).
pub fn disassemble_to_string(bytecode: &FunctionBytecode) -> String {
    let code = &bytecode.code;
    let targets = collect_jump_targets(code);
    let mut output = String::new();
    let mut ip = 0;

    while ip < code.len() {
        let marker = if targets.contains(&ip) { "► " } else { "  " };

        match decode_at(code, ip) {
            Some((op, operand, next)) => {
                if operand.is_empty() {
                    output.push_str(&format!("{:04} {}{}\n", ip, marker, op.mnemonic()));
                } else {
                    output.push_str(&format!(
                        "{:04} {}{:<11} {}\n",
                        ip,
                        marker,
                        op.mnemonic(),
                        operand
                    ));
                }
                ip = next;
            }
            None => {
                output.push_str(&format!("{:04} {}<truncated or unknown byte 0x{:02x}>\n",
                    ip, marker, code[ip]));
                break;
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::Compiler;
    use crate::frontend::parser::Parser;

    fn compile(source: &str) -> CompiledProgram {
        let program = Parser::from_source(source).parse_program().unwrap();
        Compiler::new().compile(&program).unwrap()
    }

    #[test]
    fn test_straight_line_listing() {
        let compiled = compile("1 + 2");
        let listing = disassemble_to_string(compiled.get("main").unwrap());

        assert!(listing.contains("PUSH_INT    1"));
        assert!(listing.contains("PUSH_INT    2"));
        assert!(listing.contains("ADD"));
        assert!(listing.contains("RET"));
    }

    #[test]
    fn test_conditional_shows_jumps_and_targets() {
        let compiled = compile("if true then 1 else 2 fi");
        let listing = disassemble_to_string(compiled.get("main").unwrap());

        assert!(listing.contains("JUMP_FALSE"), "listing:\n{}", listing);
        assert!(listing.contains("JUMP"), "listing:\n{}", listing);
        // both jump targets get a marker
        assert_eq!(listing.matches('►').count(), 2, "listing:\n{}", listing);
    }

    #[test]
    fn test_call_shows_name_and_argc() {
        let compiled = compile(
            "func add(x: int, y: int): int == x + y\n\
             func main(): int == add(3, 4)",
        );
        let listing = disassemble_to_string(compiled.get("main").unwrap());
        assert!(listing.contains("CALL        \"add\" argc=2"), "listing:\n{}", listing);
    }

    #[test]
    fn test_truncated_stream_does_not_panic() {
        let bytecode = FunctionBytecode {
            code: vec![OpCode::PushInt as u8, 0x01, 0x02],
            n_locals: 1,
        };
        let listing = disassemble_to_string(&bytecode);
        assert!(listing.contains("truncated"));
    }

    #[test]
    fn test_unknown_byte_does_not_panic() {
        let bytecode = FunctionBytecode {
            code: vec![0xfe],
            n_locals: 1,
        };
        let listing = disassemble_to_string(&bytecode);
        assert!(listing.contains("0xfe"));
    }
}
