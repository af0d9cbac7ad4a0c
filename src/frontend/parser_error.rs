/// A syntax error at a required grammar point.
///
/// `offset` is the character offset of the offending token; `found` is its
/// verbatim text (empty at end of input). The first syntax error aborts the
/// whole parse — there is no recovery.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
    pub found: String,
}

impl std::fmt::Display for SyntaxError {
    /// Formats as `syntax error at offset N: <expected>, found '<text>'`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "syntax error at offset {}: {}, found '{}'",
            self.offset, self.message, self.found
        )
    }
}

impl std::error::Error for SyntaxError {}
