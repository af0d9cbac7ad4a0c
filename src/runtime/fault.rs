use crate::bytecode::op::OpCode;

/// What went wrong at runtime.
///
/// Every fault is unrecoverable for the VM instance that raised it; there
/// are no retries anywhere in this engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultKind {
    /// Operand kind mismatch, e.g. `NOT` on a non-boolean.
    Type(String),
    /// Integer division or modulo by zero.
    DivisionByZero,
    /// An instruction needed more operands than the stack holds.
    StackUnderflow,
    /// The operand stack grew past the configured limit.
    StackOverflow(usize),
    /// Call to a name the function registry does not contain.
    UnknownFunction(String),
    /// No `main` function to run.
    MissingEntryPoint,
    /// The frame stack grew past the configured limit.
    CallDepthExceeded(usize),
    /// Truncated stream, unassigned opcode byte, or malformed frame setup.
    InvalidBytecode(String),
}

/// A runtime fault plus the context needed to diagnose it: the opcode that
/// raised it, the frame depth, and the executing function.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub opcode: Option<OpCode>,
    pub frame_depth: usize,
    pub function: Option<String>,
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Fault {
            kind,
            opcode: None,
            frame_depth: 0,
            function: None,
        }
    }
}

pub fn type_fault(message: impl Into<String>) -> FaultKind {
    FaultKind::Type(message.into())
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::Type(message) => write!(f, "type fault: {}", message),
            FaultKind::DivisionByZero => write!(f, "division by zero"),
            FaultKind::StackUnderflow => write!(f, "operand stack underflow"),
            FaultKind::StackOverflow(limit) => {
                write!(f, "operand stack size limit exceeded ({})", limit)
            }
            FaultKind::UnknownFunction(name) => {
                write!(f, "call to unknown function '{}'", name)
            }
            FaultKind::MissingEntryPoint => write!(f, "no 'main' function to run"),
            FaultKind::CallDepthExceeded(limit) => write!(
                f,
                "call depth limit exceeded ({}) - possible infinite recursion",
                limit
            ),
            FaultKind::InvalidBytecode(message) => write!(f, "invalid bytecode: {}", message),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fault: {}", self.kind)?;

        write!(f, " (frame depth {}", self.frame_depth)?;
        if let Some(op) = self.opcode {
            write!(f, ", opcode {}", op.mnemonic())?;
        }
        if let Some(function) = &self.function {
            write!(f, ", in '{}'", function)?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display_carries_context() {
        let fault = Fault {
            kind: FaultKind::DivisionByZero,
            opcode: Some(OpCode::Div),
            frame_depth: 2,
            function: Some("main".to_string()),
        };
        let msg = fault.to_string();
        assert!(msg.contains("division by zero"));
        assert!(msg.contains("frame depth 2"));
        assert!(msg.contains("DIV"));
        assert!(msg.contains("'main'"));
    }

    #[test]
    fn test_bare_fault_has_no_opcode_or_function() {
        let fault = Fault::new(FaultKind::MissingEntryPoint);
        let msg = fault.to_string();
        assert!(msg.contains("no 'main' function"));
        assert!(!msg.contains("opcode"));
    }

    #[test]
    fn test_type_fault_helper() {
        let kind = type_fault("cannot add int and bool");
        assert!(matches!(kind, FaultKind::Type(_)));
        assert!(kind.to_string().contains("cannot add int and bool"));
    }
}
