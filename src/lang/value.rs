/// Runtime value in the alder VM.
///
/// Values are a tagged union with exactly one active variant, copied by
/// value on every push and pop; there are no reference semantics and no
/// heap-allocated aggregates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit floating-point number.
    Float(f64),

    /// Boolean value.
    Bool(bool),

    /// UTF-8 string value.
    Str(String),

    /// "No value": the content of an unfilled local slot, and the result
    /// surface of a program that leaves nothing on the stack.
    None,
}

impl Value {
    /// Human-readable kind name, used in fault messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::None => "none",
        }
    }

    /// Numeric widening: the float view of an `Int` or `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::None => write!(f, "<none>"),
        }
    }
}
