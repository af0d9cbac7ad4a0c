use std::collections::HashMap;
use std::rc::Rc;

use crate::bytecode::ir::{CompiledProgram, FunctionBytecode};
use crate::bytecode::op::OpCode;
use crate::lang::value::Value;
use crate::runtime::fault::{Fault, FaultKind, type_fault};

/// Safety limits. Exceeding either one is a fault; there are no timeout or
/// step-count semantics.
#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_call_depth: usize,
    pub max_stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 1000,
            max_stack_size: 10_000,
        }
    }
}

/// One function activation: a handle to its instruction stream, the
/// instruction cursor, and the local-variable slots (parameters first).
struct Frame {
    function: String,
    code: Rc<FunctionBytecode>,
    ip: usize,
    locals: Vec<Value>,
}

fn truncated() -> FaultKind {
    FaultKind::InvalidBytecode("truncated instruction stream".to_string())
}

impl Frame {
    fn new(function: &str, code: Rc<FunctionBytecode>) -> Self {
        let locals = vec![Value::None; code.n_locals];
        Frame {
            function: function.to_string(),
            code,
            ip: 0,
            locals,
        }
    }

    fn at_end(&self) -> bool {
        self.ip >= self.code.code.len()
    }

    // Bounds-checked immediate readers; the cursor advances past the
    // consumed bytes.

    fn read_u8(&mut self) -> Result<u8, FaultKind> {
        let byte = self.code.code.get(self.ip).copied().ok_or_else(truncated)?;
        self.ip += 1;
        Ok(byte)
    }

    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], FaultKind> {
        let end = self.ip + N;
        let bytes: [u8; N] = self
            .code
            .code
            .get(self.ip..end)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(truncated)?;
        self.ip = end;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32, FaultKind> {
        Ok(u32::from_le_bytes(self.read_exact::<4>()?))
    }

    fn read_i32(&mut self) -> Result<i32, FaultKind> {
        Ok(i32::from_le_bytes(self.read_exact::<4>()?))
    }

    fn read_i64(&mut self) -> Result<i64, FaultKind> {
        Ok(i64::from_le_bytes(self.read_exact::<8>()?))
    }

    fn read_f64(&mut self) -> Result<f64, FaultKind> {
        Ok(f64::from_le_bytes(self.read_exact::<8>()?))
    }

    fn read_str(&mut self) -> Result<String, FaultKind> {
        let len = self.read_u32()? as usize;
        let end = self.ip.checked_add(len).ok_or_else(truncated)?;
        let bytes = self
            .code
            .code
            .get(self.ip..end)
            .ok_or_else(truncated)?
            .to_vec();
        self.ip = end;
        String::from_utf8(bytes)
            .map_err(|_| FaultKind::InvalidBytecode("non-UTF-8 string constant".to_string()))
    }
}

enum Control {
    Continue,
    Halt,
}

enum NumPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Stack-based virtual machine.
///
/// The function registry is built once from the compiler's output and never
/// mutated during execution. All frames share one operand stack: a callee
/// leaves its return value (and nothing else) on that stack, where the
/// caller finds it after the frame pops. One `Vm` runs one program; for
/// concurrent programs, instantiate one `Vm` per unit of work.
pub struct Vm {
    functions: HashMap<String, Rc<FunctionBytecode>>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    config: VmConfig,
}

impl Vm {
    pub fn new(program: CompiledProgram) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: CompiledProgram, config: VmConfig) -> Self {
        let functions = program
            .functions
            .into_iter()
            .map(|(name, bytecode)| (name, Rc::new(bytecode)))
            .collect();
        Vm {
            functions,
            stack: Vec::new(),
            frames: Vec::new(),
            config,
        }
    }

    #[allow(dead_code)]
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Executes `main` to completion.
    ///
    /// Returns the value on top of the shared operand stack when the frame
    /// stack empties (or a `HALT` executes), `None` if the stack is empty.
    pub fn run(&mut self) -> Result<Option<Value>, Fault> {
        let main = self
            .functions
            .get("main")
            .cloned()
            .ok_or_else(|| Fault::new(FaultKind::MissingEntryPoint))?;
        self.frames.push(Frame::new("main", main));

        while let Some(frame) = self.frames.last_mut() {
            if frame.at_end() {
                // implicit return
                self.frames.pop();
                continue;
            }

            let byte = frame.code.code[frame.ip];
            frame.ip += 1;

            let op = match OpCode::from_byte(byte) {
                Some(op) => op,
                None => {
                    let kind =
                        FaultKind::InvalidBytecode(format!("unassigned opcode byte 0x{:02x}", byte));
                    return Err(self.fault(kind, None));
                }
            };

            match self.execute(op) {
                Ok(Control::Continue) => {}
                Ok(Control::Halt) => break,
                Err(kind) => return Err(self.fault(kind, Some(op))),
            }
        }

        Ok(self.stack.last().cloned())
    }

    /// Attaches diagnostic context to a fault.
    fn fault(&self, kind: FaultKind, opcode: Option<OpCode>) -> Fault {
        Fault {
            kind,
            opcode,
            frame_depth: self.frames.len(),
            function: self.frames.last().map(|f| f.function.clone()),
        }
    }

    fn frame(&mut self) -> Result<&mut Frame, FaultKind> {
        self.frames
            .last_mut()
            .ok_or_else(|| FaultKind::InvalidBytecode("no active frame".to_string()))
    }

    fn push(&mut self, value: Value) -> Result<(), FaultKind> {
        if self.stack.len() >= self.config.max_stack_size {
            return Err(FaultKind::StackOverflow(self.config.max_stack_size));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, FaultKind> {
        self.stack.pop().ok_or(FaultKind::StackUnderflow)
    }

    fn pop_bool(&mut self, what: &str) -> Result<bool, FaultKind> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(type_fault(format!(
                "{} requires a bool operand, got {}",
                what,
                other.type_name()
            ))),
        }
    }

    fn pop_int(&mut self, what: &str) -> Result<i64, FaultKind> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            other => Err(type_fault(format!(
                "{} requires int operands, got {}",
                what,
                other.type_name()
            ))),
        }
    }

    /// Pops right then left and pairs them for comparison: two ints stay
    /// ints, any float promotes both.
    fn pop_numeric_pair(&mut self, symbol: &str) -> Result<NumPair, FaultKind> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => Ok(NumPair::Ints(*x, *y)),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(NumPair::Floats(x, y)),
                _ => Err(type_fault(format!(
                    "cannot compare {} and {} with '{}'",
                    a.type_name(),
                    b.type_name(),
                    symbol
                ))),
            },
        }
    }

    /// Equality over matching kinds: int/int, bool/bool, string/string,
    /// and numeric with float promotion.
    fn pop_equal(&mut self) -> Result<bool, FaultKind> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => Ok(x == y),
            (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
            (Value::Str(x), Value::Str(y)) => Ok(x == y),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x == y),
                _ => Err(type_fault(format!(
                    "cannot compare {} and {} for equality",
                    a.type_name(),
                    b.type_name()
                ))),
            },
        }
    }

    fn branch(&mut self, displacement: i32) -> Result<(), FaultKind> {
        let frame = self.frame()?;
        let target = frame.ip as i64 + displacement as i64;
        if target < 0 || target as usize > frame.code.code.len() {
            return Err(FaultKind::InvalidBytecode(format!(
                "jump target {} out of range",
                target
            )));
        }
        frame.ip = target as usize;
        Ok(())
    }

    fn execute(&mut self, op: OpCode) -> Result<Control, FaultKind> {
        match op {
            OpCode::Halt => return Ok(Control::Halt),

            // Literals
            OpCode::PushInt => {
                let value = self.frame()?.read_i64()?;
                self.push(Value::Int(value))?;
            }
            OpCode::PushFloat => {
                let value = self.frame()?.read_f64()?;
                self.push(Value::Float(value))?;
            }
            OpCode::PushBool => {
                let value = self.frame()?.read_u8()?;
                self.push(Value::Bool(value != 0))?;
            }
            OpCode::PushStr => {
                let value = self.frame()?.read_str()?;
                self.push(Value::Str(value))?;
            }

            OpCode::LoadLocal => {
                let slot = self.frame()?.read_u32()? as usize;
                let frame = self.frame()?;
                let value = frame.locals.get(slot).cloned().ok_or_else(|| {
                    FaultKind::InvalidBytecode(format!(
                        "local slot {} out of range ({} allocated)",
                        slot,
                        frame.locals.len()
                    ))
                })?;
                self.push(value)?;
            }

            // Arithmetic: right is on top of the stack.
            OpCode::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_add(*y)),
                    (Value::Float(x), Value::Float(y)) => Value::Float(x + y),
                    (Value::Int(x), Value::Float(y)) => Value::Float(*x as f64 + y),
                    (Value::Float(x), Value::Int(y)) => Value::Float(x + *y as f64),
                    (Value::Str(x), Value::Str(y)) => Value::Str(format!("{}{}", x, y)),
                    _ => {
                        return Err(type_fault(format!(
                            "cannot add {} and {}",
                            a.type_name(),
                            b.type_name()
                        )));
                    }
                };
                self.push(result)?;
            }
            OpCode::Sub => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_sub(*y)),
                    (Value::Float(x), Value::Float(y)) => Value::Float(x - y),
                    (Value::Int(x), Value::Float(y)) => Value::Float(*x as f64 - y),
                    (Value::Float(x), Value::Int(y)) => Value::Float(x - *y as f64),
                    _ => {
                        return Err(type_fault(format!(
                            "cannot subtract {} from {}",
                            b.type_name(),
                            a.type_name()
                        )));
                    }
                };
                self.push(result)?;
            }
            OpCode::Mul => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_mul(*y)),
                    (Value::Float(x), Value::Float(y)) => Value::Float(x * y),
                    (Value::Int(x), Value::Float(y)) => Value::Float(*x as f64 * y),
                    (Value::Float(x), Value::Int(y)) => Value::Float(x * *y as f64),
                    _ => {
                        return Err(type_fault(format!(
                            "cannot multiply {} and {}",
                            a.type_name(),
                            b.type_name()
                        )));
                    }
                };
                self.push(result)?;
            }
            OpCode::Div => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match (&a, &b) {
                    // int/int division truncates toward zero
                    (Value::Int(x), Value::Int(y)) => {
                        if *y == 0 {
                            return Err(FaultKind::DivisionByZero);
                        }
                        Value::Int(x.wrapping_div(*y))
                    }
                    // float division follows IEEE-754 (no zero fault)
                    (Value::Float(x), Value::Float(y)) => Value::Float(x / y),
                    (Value::Int(x), Value::Float(y)) => Value::Float(*x as f64 / y),
                    (Value::Float(x), Value::Int(y)) => Value::Float(x / *y as f64),
                    _ => {
                        return Err(type_fault(format!(
                            "cannot divide {} by {}",
                            a.type_name(),
                            b.type_name()
                        )));
                    }
                };
                self.push(result)?;
            }
            OpCode::Mod => {
                let b = self.pop_int("'%'")?;
                let a = self.pop_int("'%'")?;
                if b == 0 {
                    return Err(FaultKind::DivisionByZero);
                }
                self.push(Value::Int(a.wrapping_rem(b)))?;
            }
            OpCode::Neg => {
                let a = self.pop()?;
                let result = match a {
                    Value::Int(n) => Value::Int(n.wrapping_neg()),
                    Value::Float(x) => Value::Float(-x),
                    other => {
                        return Err(type_fault(format!("cannot negate {}", other.type_name())));
                    }
                };
                self.push(result)?;
            }
            OpCode::Not => {
                let a = self.pop_bool("'!'")?;
                self.push(Value::Bool(!a))?;
            }

            // Comparison: result is always a bool.
            OpCode::Eq => {
                let equal = self.pop_equal()?;
                self.push(Value::Bool(equal))?;
            }
            OpCode::Ne => {
                let equal = self.pop_equal()?;
                self.push(Value::Bool(!equal))?;
            }
            OpCode::Lt => {
                let result = match self.pop_numeric_pair("<")? {
                    NumPair::Ints(a, b) => a < b,
                    NumPair::Floats(a, b) => a < b,
                };
                self.push(Value::Bool(result))?;
            }
            OpCode::Le => {
                let result = match self.pop_numeric_pair("<=")? {
                    NumPair::Ints(a, b) => a <= b,
                    NumPair::Floats(a, b) => a <= b,
                };
                self.push(Value::Bool(result))?;
            }
            OpCode::Gt => {
                let result = match self.pop_numeric_pair(">")? {
                    NumPair::Ints(a, b) => a > b,
                    NumPair::Floats(a, b) => a > b,
                };
                self.push(Value::Bool(result))?;
            }
            OpCode::Ge => {
                let result = match self.pop_numeric_pair(">=")? {
                    NumPair::Ints(a, b) => a >= b,
                    NumPair::Floats(a, b) => a >= b,
                };
                self.push(Value::Bool(result))?;
            }

            // Logic. Both operands were pushed before this opcode executes;
            // there is no short-circuit in the instruction set.
            OpCode::And => {
                let b = self.pop_bool("'&'")?;
                let a = self.pop_bool("'&'")?;
                self.push(Value::Bool(a && b))?;
            }
            OpCode::Or => {
                let b = self.pop_bool("'|'")?;
                let a = self.pop_bool("'|'")?;
                self.push(Value::Bool(a || b))?;
            }

            OpCode::Jump => {
                let displacement = self.frame()?.read_i32()?;
                self.branch(displacement)?;
            }
            OpCode::JumpIfFalse => {
                let displacement = self.frame()?.read_i32()?;
                let condition = self.pop_bool("conditional branch")?;
                if !condition {
                    self.branch(displacement)?;
                }
            }

            OpCode::Call => {
                let frame = self.frame()?;
                let name = frame.read_str()?;
                let argc = frame.read_u32()? as usize;

                if self.frames.len() >= self.config.max_call_depth {
                    return Err(FaultKind::CallDepthExceeded(self.config.max_call_depth));
                }

                let code = self
                    .functions
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| FaultKind::UnknownFunction(name.clone()))?;
                let mut callee = Frame::new(&name, code);

                if argc > callee.locals.len() {
                    return Err(FaultKind::InvalidBytecode(format!(
                        "call to '{}' with {} arguments but only {} local slots",
                        name,
                        argc,
                        callee.locals.len()
                    )));
                }
                // arguments were pushed left to right, so fill slots from
                // the back
                for slot in (0..argc).rev() {
                    callee.locals[slot] = self.pop()?;
                }

                self.frames.push(callee);
            }
            OpCode::Ret => {
                self.frames.pop();
            }
        }

        Ok(Control::Continue)
    }
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

    fn run_source(source: &str) -> Result<Option<Value>, Fault> {
        Vm::new(compile(source)).run()
    }

    fn eval(source: &str) -> Value {
        run_source(source).unwrap().expect("program left no result")
    }

    fn program_with_main(main: FunctionBytecode) -> CompiledProgram {
        let mut program = CompiledProgram::default();
        program.functions.insert("main".to_string(), main);
        program
    }

    // ------------------------------------------------------------------
    // Arithmetic & precedence
    // ------------------------------------------------------------------

    #[test]
    fn test_precedence_multiplication_first() {
        assert_eq!(eval("2 + 3 * 4"), Value::Int(14));
        assert_eq!(eval("(2 + 3) * 4"), Value::Int(20));
    }

    #[test]
    fn test_integer_division_truncates_toward_zero() {
        assert_eq!(eval("7 / 2"), Value::Int(3));
        assert_eq!(eval("-7 / 2"), Value::Int(-3));
        assert_eq!(eval("7 / -2"), Value::Int(-3));
    }

    #[test]
    fn test_integer_division_by_zero_faults() {
        let fault = run_source("1 / 0").unwrap_err();
        assert_eq!(fault.kind, FaultKind::DivisionByZero);
        assert_eq!(fault.opcode, Some(OpCode::Div));
        assert_eq!(fault.frame_depth, 1);
        assert_eq!(fault.function.as_deref(), Some("main"));
    }

    #[test]
    fn test_modulo_by_zero_faults() {
        let fault = run_source("1 % 0").unwrap_err();
        assert_eq!(fault.kind, FaultKind::DivisionByZero);
    }

    #[test]
    fn test_modulo_requires_ints() {
        let fault = run_source("1.5 % 2").unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
    }

    #[test]
    fn test_float_operand_widens_both_sides() {
        assert_eq!(eval("1 + 2.5"), Value::Float(3.5));
        assert_eq!(eval("2.5 * 2"), Value::Float(5.0));
        assert_eq!(eval("1.0 / 4"), Value::Float(0.25));
    }

    #[test]
    fn test_float_division_by_zero_is_ieee() {
        assert_eq!(eval("1.0 / 0.0"), Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_string_addition_concatenates() {
        assert_eq!(
            eval(r#""foo" + "bar""#),
            Value::Str("foobar".to_string())
        );
    }

    #[test]
    fn test_mixed_kind_addition_faults() {
        let fault = run_source("1 + true").unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));

        let fault = run_source(r#""a" + 1"#).unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
    }

    #[test]
    fn test_negation_preserves_numeric_kind() {
        assert_eq!(eval("-(3)"), Value::Int(-3));
        assert_eq!(eval("-(3.5)"), Value::Float(-3.5));
    }

    #[test]
    fn test_not_requires_bool() {
        assert_eq!(eval("!true"), Value::Bool(false));
        assert_eq!(eval("!!false"), Value::Bool(false));

        let fault = run_source("!1").unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
    }

    // ------------------------------------------------------------------
    // Comparison & logic
    // ------------------------------------------------------------------

    #[test]
    fn test_integer_comparisons() {
        assert_eq!(eval("1 < 2"), Value::Bool(true));
        assert_eq!(eval("2 <= 2"), Value::Bool(true));
        assert_eq!(eval("2 > 2"), Value::Bool(false));
        assert_eq!(eval("3 >= 2"), Value::Bool(true));
        assert_eq!(eval("1 != 2"), Value::Bool(true));
    }

    #[test]
    fn test_float_operand_promotes_comparison() {
        assert_eq!(eval("3 > 4.0"), Value::Bool(false));
        assert_eq!(eval("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval("1.5 <= 2"), Value::Bool(true));
    }

    #[test]
    fn test_equality_on_bools_and_strings() {
        assert_eq!(eval("true == true"), Value::Bool(true));
        assert_eq!(eval(r#""a" = "a""#), Value::Bool(true));
        assert_eq!(eval(r#""a" != "b""#), Value::Bool(true));
    }

    #[test]
    fn test_equality_across_kinds_faults() {
        let fault = run_source(r#"1 == "1""#).unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
    }

    #[test]
    fn test_relational_on_strings_faults() {
        let fault = run_source(r#""a" < "b""#).unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
    }

    #[test]
    fn test_logical_operators_on_bools() {
        assert_eq!(eval("true & false"), Value::Bool(false));
        assert_eq!(eval("true | false"), Value::Bool(true));
        assert_eq!(eval("1 < 2 & 3 < 4"), Value::Bool(true));
    }

    #[test]
    fn test_logical_operators_require_bools() {
        let fault = run_source("1 & true").unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
    }

    #[test]
    fn test_and_is_eager_not_short_circuit() {
        // Both operands are compiled and pushed before the operator runs,
        // so the right-hand side faults even though the left is false.
        let fault = run_source("false & 1 / 0 = 1").unwrap_err();
        assert_eq!(fault.kind, FaultKind::DivisionByZero);
    }

    // ------------------------------------------------------------------
    // Functions & frames
    // ------------------------------------------------------------------

    #[test]
    fn test_function_call_passes_arguments_in_order() {
        let result = eval(
            "func add(x: int, y: int): int == x + y\n\
             func main(): int == add(3, 4)",
        );
        assert_eq!(result, Value::Int(7));

        let result = eval(
            "func sub2(x: int, y: int): int == x - y\n\
             func main(): int == sub2(10, 4)",
        );
        assert_eq!(result, Value::Int(6));
    }

    #[test]
    fn test_recursion_over_shared_operand_stack() {
        let result = eval(
            "func fact(n: int): int == if n <= 1 then 1 else n * fact(n - 1) fi\n\
             func main(): int == fact(5)",
        );
        assert_eq!(result, Value::Int(120));
    }

    #[test]
    fn test_two_recursive_calls_in_one_expression() {
        let result = eval(
            "func fib(n: int): int == if n < 2 then n else fib(n - 1) + fib(n - 2) fi\n\
             func main(): int == fib(10)",
        );
        assert_eq!(result, Value::Int(55));
    }

    #[test]
    fn test_declared_return_type_is_never_enforced() {
        let result = eval(
            "func s(): int == \"not an int\"\n\
             func main(): int == s()",
        );
        assert_eq!(result, Value::Str("not an int".to_string()));
    }

    #[test]
    fn test_unknown_function_faults_at_call_time() {
        let mut compiled = compile(
            "func helper(): int == 1\n\
             func main(): int == helper()",
        );
        compiled.functions.remove("helper");

        let fault = Vm::new(compiled).run().unwrap_err();
        assert_eq!(
            fault.kind,
            FaultKind::UnknownFunction("helper".to_string())
        );
        assert_eq!(fault.opcode, Some(OpCode::Call));
    }

    #[test]
    fn test_missing_entry_point_is_a_startup_fault() {
        let fault = run_source("func helper(): int == 1").unwrap_err();
        assert_eq!(fault.kind, FaultKind::MissingEntryPoint);
    }

    #[test]
    fn test_runaway_recursion_hits_the_depth_limit() {
        let fault = run_source(
            "func spin(n: int): int == spin(n + 1)\n\
             func main(): int == spin(0)",
        )
        .unwrap_err();
        assert!(matches!(fault.kind, FaultKind::CallDepthExceeded(_)));
    }

    // ------------------------------------------------------------------
    // Conditionals
    // ------------------------------------------------------------------

    #[test]
    fn test_conditional_takes_exactly_one_branch() {
        assert_eq!(eval("if 1 < 2 then 10 else 20 fi"), Value::Int(10));
        assert_eq!(eval("if 1 > 2 then 10 else 20 fi"), Value::Int(20));
    }

    #[test]
    fn test_untaken_branch_has_no_observable_effect() {
        // boom() would fault; it must never run
        let result = eval(
            "func boom(): int == 1 / 0\n\
             func main(): int == if 1 < 2 then 10 else boom() fi",
        );
        assert_eq!(result, Value::Int(10));

        let result = eval(
            "func boom(): int == 1 / 0\n\
             func main(): int == if 1 > 2 then boom() else 20 fi",
        );
        assert_eq!(result, Value::Int(20));
    }

    #[test]
    fn test_conditional_condition_must_be_bool() {
        let fault = run_source("if 1 then 2 else 3 fi").unwrap_err();
        assert!(matches!(fault.kind, FaultKind::Type(_)));
        assert_eq!(fault.opcode, Some(OpCode::JumpIfFalse));
    }

    #[test]
    fn test_nested_conditionals() {
        let result = eval(
            "func sign(n: int): int == if n < 0 then -(1) else if n > 0 then 1 else 0 fi fi\n\
             func main(): int == sign(-5) * 100 + sign(7) * 10 + sign(0)",
        );
        assert_eq!(result, Value::Int(-90));
    }

    // ------------------------------------------------------------------
    // Termination, limits, malformed streams
    // ------------------------------------------------------------------

    #[test]
    fn test_halt_stops_mid_stream() {
        let mut main = FunctionBytecode::new(1);
        main.emit_op(OpCode::PushInt);
        main.emit_i64(42);
        main.emit_op(OpCode::Halt);
        main.emit_op(OpCode::PushInt);
        main.emit_i64(7);

        let result = Vm::new(program_with_main(main)).run().unwrap();
        assert_eq!(result, Some(Value::Int(42)));
    }

    #[test]
    fn test_empty_main_runs_to_no_result() {
        let main = FunctionBytecode::new(1);
        let result = Vm::new(program_with_main(main)).run().unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_stack_underflow_faults() {
        let mut main = FunctionBytecode::new(1);
        main.emit_op(OpCode::Add);

        let fault = Vm::new(program_with_main(main)).run().unwrap_err();
        assert_eq!(fault.kind, FaultKind::StackUnderflow);
        assert_eq!(fault.opcode, Some(OpCode::Add));
    }

    #[test]
    fn test_truncated_immediate_faults() {
        let main = FunctionBytecode {
            code: vec![OpCode::PushInt as u8, 0x01, 0x02],
            n_locals: 1,
        };
        let fault = Vm::new(program_with_main(main)).run().unwrap_err();
        assert!(matches!(fault.kind, FaultKind::InvalidBytecode(_)));
    }

    #[test]
    fn test_unassigned_opcode_byte_faults() {
        let main = FunctionBytecode {
            code: vec![0xfe],
            n_locals: 1,
        };
        let fault = Vm::new(program_with_main(main)).run().unwrap_err();
        assert!(matches!(fault.kind, FaultKind::InvalidBytecode(_)));
    }

    #[test]
    fn test_operand_stack_limit_is_enforced() {
        let config = VmConfig {
            max_call_depth: 16,
            max_stack_size: 3,
        };
        let compiled = compile("1 + (2 + (3 + (4 + 5)))");
        let fault = Vm::with_config(compiled, config).run().unwrap_err();
        assert_eq!(fault.kind, FaultKind::StackOverflow(3));
    }

    #[test]
    fn test_result_surface_is_top_of_stack() {
        let mut vm = Vm::new(compile("41 + 1"));
        let result = vm.run().unwrap();
        assert_eq!(result, Some(Value::Int(42)));
        assert_eq!(vm.stack(), &[Value::Int(42)]);
    }
}
