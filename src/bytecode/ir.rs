use crate::bytecode::op::OpCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single compiled instruction stream.
///
/// `code` is immutable once the compiler is done with it; `n_locals` sizes
/// the local-slot array of every frame created for this function
/// (parameters first, plus slack for temporaries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionBytecode {
    pub code: Vec<u8>,
    pub n_locals: usize,
}

impl FunctionBytecode {
    pub fn new(n_locals: usize) -> Self {
        Self {
            code: Vec::new(),
            n_locals,
        }
    }

    pub fn emit_op(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_i64(&mut self, value: i64) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_f64(&mut self, value: f64) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed string: u32 byte count, then the raw UTF-8 bytes.
    pub fn emit_str(&mut self, value: &str) {
        self.emit_u32(value.len() as u32);
        self.code.extend_from_slice(value.as_bytes());
    }

    /// Emits a jump opcode with a placeholder displacement and returns the
    /// patch site (the offset of the 4 displacement bytes).
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        let site = self.code.len();
        self.emit_u32(0);
        site
    }

    /// Patches the displacement at `site` to land on the current end of the
    /// stream. Displacements are relative to the cursor after the operand.
    pub fn patch_jump_to_here(&mut self, site: usize) -> Result<(), std::num::TryFromIntError> {
        let displacement = i32::try_from(self.code.len() - (site + 4))?;
        self.code[site..site + 4].copy_from_slice(&displacement.to_le_bytes());
        Ok(())
    }
}

/// A compiled program: the mapping from function name to bytecode.
///
/// This is the only surface the VM consumes from the compiler. It also
/// round-trips through postcard, so a compiled image can be written to
/// disk and executed later without the front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub functions: HashMap<String, FunctionBytecode>,
}

impl CompiledProgram {
    pub fn get(&self, name: &str) -> Option<&FunctionBytecode> {
        self.functions.get(name)
    }

    /// Serializes the program with postcard.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a program previously written by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_immediates_are_little_endian() {
        let mut bc = FunctionBytecode::new(1);
        bc.emit_op(OpCode::PushInt);
        bc.emit_i64(0x0102030405060708);

        assert_eq!(
            bc.code,
            vec![0x01, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn test_float_immediates_are_ieee754_bits() {
        let mut bc = FunctionBytecode::new(1);
        bc.emit_f64(1.5);
        assert_eq!(bc.code, 1.5f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_strings_are_length_prefixed() {
        let mut bc = FunctionBytecode::new(1);
        bc.emit_str("ab");
        assert_eq!(bc.code, vec![2, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn test_jump_patching_lands_on_stream_end() {
        let mut bc = FunctionBytecode::new(1);
        let site = bc.emit_jump(OpCode::JumpIfFalse);
        bc.emit_op(OpCode::PushBool);
        bc.emit_u8(1);
        bc.patch_jump_to_here(site).unwrap();

        // opcode + 4 displacement bytes + 2 skipped bytes
        assert_eq!(bc.code[0], OpCode::JumpIfFalse as u8);
        let displacement = i32::from_le_bytes(bc.code[1..5].try_into().unwrap());
        assert_eq!(displacement, 2);
    }

    #[test]
    fn test_empty_jump_patches_to_zero() {
        let mut bc = FunctionBytecode::new(1);
        let site = bc.emit_jump(OpCode::Jump);
        bc.patch_jump_to_here(site).unwrap();

        let displacement = i32::from_le_bytes(bc.code[1..5].try_into().unwrap());
        assert_eq!(displacement, 0);
    }

    #[test]
    fn test_postcard_round_trip() {
        let mut main = FunctionBytecode::new(5);
        main.emit_op(OpCode::PushInt);
        main.emit_i64(42);
        main.emit_op(OpCode::Ret);

        let mut program = CompiledProgram::default();
        program.functions.insert("main".to_string(), main);

        let bytes = program.to_bytes().unwrap();
        let restored = CompiledProgram::from_bytes(&bytes).unwrap();
        assert_eq!(restored, program);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(CompiledProgram::from_bytes(&[0xff, 0xff, 0xff, 0xff]).is_err());
    }
}
