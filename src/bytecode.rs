// File: src/bytecode.rs
//
// The artifact a compile pass produces: the instruction stream, the
// constant pool, and the root symbol table (kept around so the REPL can
// extend the same global scope across lines). `Display` disassembles the
// instruction stream for `--dump-bytecode` and for compiler tests that
// assert on emitted shape.

use crate::code::{read_operands, OpCode};
use crate::symbol_table::SymbolTable;
use crate::value::{inspect, Value};
use std::fmt;

pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
    pub symbol_table: SymbolTable,
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut offset = 0;
        while offset < self.instructions.len() {
            let byte = self.instructions[offset];
            let Some(op) = OpCode::from_byte(byte) else {
                writeln!(f, "{:04} ERROR: unknown opcode {}", offset, byte)?;
                offset += 1;
                continue;
            };
            let (operands, width) = read_operands(op, &self.instructions, offset + 1);
            write!(f, "{:04} {}", offset, op.name())?;
            for operand in &operands {
                write!(f, " {}", operand)?;
            }
            if op == OpCode::Constant {
                if let Some(constant) = operands.first().and_then(|i| self.constants.get(*i as usize)) {
                    write!(f, "  ; {}", inspect(constant))?;
                }
            }
            writeln!(f)?;
            offset += 1 + width;
        }
        Ok(())
    }
}
