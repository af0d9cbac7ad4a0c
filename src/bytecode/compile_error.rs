/// Errors produced while lowering an AST to bytecode.
///
/// Any compile error aborts compilation of the whole program.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// An identifier or call target that does not resolve to anything.
    UnresolvedSymbol { name: String, function: String },

    /// A construct the bytecode cannot express, e.g. a call whose argument
    /// count does not match the callee's declared parameter list.
    UnsupportedConstruct { what: String, function: String },

    /// Internal compiler error (shouldn't happen in normal use).
    Internal(String),
}

impl CompileError {
    pub fn unresolved(name: impl Into<String>, function: impl Into<String>) -> Self {
        CompileError::UnresolvedSymbol {
            name: name.into(),
            function: function.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>, function: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            what: what.into(),
            function: function.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnresolvedSymbol { name, function } => {
                write!(
                    f,
                    "compile error: unresolved symbol '{}' in function '{}'",
                    name, function
                )
            }
            CompileError::UnsupportedConstruct { what, function } => {
                write!(
                    f,
                    "compile error: {} in function '{}'",
                    what, function
                )
            }
            CompileError::Internal(msg) => {
                write!(f, "compile error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompileError {}
