use std::collections::HashMap;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::{CompiledProgram, FunctionBytecode};
use crate::bytecode::op::OpCode;
use crate::lang::ast::{BinaryOp, Expr, FuncDecl, Literal, Program, UnaryOp};

/// Extra local slots beyond the parameters, reserved for temporaries.
const LOCAL_SLACK: usize = 4;

/// Lowers a parsed `Program` to a `CompiledProgram`.
///
/// Compilation is a two-pass walk: the first pass collects every declared
/// function name and arity so call targets resolve regardless of
/// declaration order; the second pass compiles each body. Within a body,
/// identifiers resolve against a name->slot table built from the parameter
/// list; a name that is not a parameter is an error, as is a call to an
/// undeclared function or a call with the wrong number of arguments.
///
/// Output is deterministic: the same `Program` always compiles to
/// byte-identical streams.
pub struct Compiler {
    /// Declared function name -> arity.
    declared: HashMap<String, usize>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            declared: HashMap::new(),
        }
    }

    pub fn compile(mut self, program: &Program) -> Result<CompiledProgram, CompileError> {
        for func in &program.funcs {
            if self
                .declared
                .insert(func.name.clone(), func.params.len())
                .is_some()
            {
                eprintln!("Warning: redefining function '{}'", func.name);
            }
        }

        let mut compiled = CompiledProgram::default();
        for func in &program.funcs {
            let bytecode = self.compile_func(func)?;
            compiled.functions.insert(func.name.clone(), bytecode);
        }

        Ok(compiled)
    }

    fn compile_func(&self, func: &FuncDecl) -> Result<FunctionBytecode, CompileError> {
        let n_locals = std::cmp::max(1, func.params.len() + LOCAL_SLACK);
        let mut bc = FunctionBytecode::new(n_locals);

        let mut slots: HashMap<&str, u32> = HashMap::new();
        for (slot, param) in func.params.iter().enumerate() {
            slots.insert(param.name.as_str(), slot as u32);
        }

        self.compile_expr(&func.body, &slots, &mut bc, &func.name)?;
        bc.emit_op(OpCode::Ret);
        Ok(bc)
    }

    fn compile_expr(
        &self,
        expr: &Expr,
        slots: &HashMap<&str, u32>,
        bc: &mut FunctionBytecode,
        function: &str,
    ) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(literal) => {
                match literal {
                    Literal::Int(value) => {
                        bc.emit_op(OpCode::PushInt);
                        bc.emit_i64(*value);
                    }
                    Literal::Float(value) => {
                        bc.emit_op(OpCode::PushFloat);
                        bc.emit_f64(*value);
                    }
                    Literal::Bool(value) => {
                        bc.emit_op(OpCode::PushBool);
                        bc.emit_u8(if *value { 1 } else { 0 });
                    }
                    Literal::Str(value) => {
                        bc.emit_op(OpCode::PushStr);
                        bc.emit_str(value);
                    }
                }
                Ok(())
            }

            Expr::Ident(name) => {
                let slot = slots
                    .get(name.as_str())
                    .ok_or_else(|| CompileError::unresolved(name, function))?;
                bc.emit_op(OpCode::LoadLocal);
                bc.emit_u32(*slot);
                Ok(())
            }

            Expr::Unary { op, operand } => {
                self.compile_expr(operand, slots, bc, function)?;
                bc.emit_op(match op {
                    UnaryOp::Neg => OpCode::Neg,
                    UnaryOp::Not => OpCode::Not,
                });
                Ok(())
            }

            Expr::Binary { op, lhs, rhs } => {
                self.compile_expr(lhs, slots, bc, function)?;
                self.compile_expr(rhs, slots, bc, function)?;
                bc.emit_op(binary_opcode(*op));
                Ok(())
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                // cond; JUMP_FALSE ->else; then; JUMP ->end; else:
                // Exactly one branch executes; both leave one value.
                self.compile_expr(cond, slots, bc, function)?;
                let to_else = bc.emit_jump(OpCode::JumpIfFalse);

                self.compile_expr(then_branch, slots, bc, function)?;
                let to_end = bc.emit_jump(OpCode::Jump);

                bc.patch_jump_to_here(to_else)
                    .map_err(|_| CompileError::internal("branch displacement overflow"))?;
                self.compile_expr(else_branch, slots, bc, function)?;

                bc.patch_jump_to_here(to_end)
                    .map_err(|_| CompileError::internal("branch displacement overflow"))?;
                Ok(())
            }

            Expr::Call { callee, args } => {
                let arity = *self
                    .declared
                    .get(callee)
                    .ok_or_else(|| CompileError::unresolved(callee, function))?;
                if arity != args.len() {
                    return Err(CompileError::unsupported(
                        format!(
                            "call to '{}' with {} arguments ({} declared)",
                            callee,
                            args.len(),
                            arity
                        ),
                        function,
                    ));
                }

                for arg in args {
                    self.compile_expr(arg, slots, bc, function)?;
                }
                bc.emit_op(OpCode::Call);
                bc.emit_str(callee);
                bc.emit_u32(args.len() as u32);
                Ok(())
            }
        }
    }
}

/// Direct, total mapping from binary operator to opcode.
fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Eq => OpCode::Eq,
        BinaryOp::Ne => OpCode::Ne,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Le => OpCode::Le,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Ge => OpCode::Ge,
        BinaryOp::And => OpCode::And,
        BinaryOp::Or => OpCode::Or,
    }
}
