/// Kind of a lexed token.
///
/// Two-character punctuation (`->`, `==`, `!=`, `<=`, `>=`) gets its own
/// kind; `Eq` (`=`) and `EqEq` (`==`) are distinct because `==` doubles as
/// the declaration's name/body separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EndOfStream,

    // Literals and names
    Ident,
    IntLiteral,
    FloatLiteral,
    BoolLiteral,
    CharLiteral,
    StringLiteral,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Eq,
    EqEq,
    NotEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Amp,
    Pipe,
    Bang,

    // Keywords
    KwType,
    KwFunc,
    KwIf,
    KwThen,
    KwElse,
    KwFi,
    KwCase,
    KwOf,
    KwOthers,
    KwFo,
    KwInt,
    KwBool,
    KwChar,
    KwString,

    // Anything the lexer does not recognize. Not a lex error; the parser
    // rejects it when it shows up at a required production.
    Unknown,
}

/// One lexed token: kind, verbatim text, and the character offset of its
/// first character in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            offset,
        }
    }
}

impl TokenKind {
    /// Maps an identifier's text to its keyword kind, if it is one.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "type" => TokenKind::KwType,
            "func" => TokenKind::KwFunc,
            "if" => TokenKind::KwIf,
            "then" => TokenKind::KwThen,
            "else" => TokenKind::KwElse,
            "fi" => TokenKind::KwFi,
            "case" => TokenKind::KwCase,
            "of" => TokenKind::KwOf,
            "others" => TokenKind::KwOthers,
            "fo" => TokenKind::KwFo,
            "int" => TokenKind::KwInt,
            "bool" => TokenKind::KwBool,
            "char" => TokenKind::KwChar,
            "string" => TokenKind::KwString,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::EndOfStream => write!(f, "<end of input>"),
            TokenKind::StringLiteral => write!(f, "\"{}\"", self.text),
            TokenKind::CharLiteral => write!(f, "'{}'", self.text),
            _ => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword("func"), Some(TokenKind::KwFunc));
        assert_eq!(TokenKind::keyword("fi"), Some(TokenKind::KwFi));
        assert_eq!(TokenKind::keyword("string"), Some(TokenKind::KwString));
        assert_eq!(TokenKind::keyword("funcs"), None);
        assert_eq!(TokenKind::keyword("Main"), None);
    }

    #[test]
    fn test_display_quotes_literals() {
        let s = Token::new(TokenKind::StringLiteral, "hi", 0);
        assert_eq!(s.to_string(), "\"hi\"");

        let c = Token::new(TokenKind::CharLiteral, "\\n", 0);
        assert_eq!(c.to_string(), "'\\n'");

        let p = Token::new(TokenKind::Plus, "+", 3);
        assert_eq!(p.to_string(), "+");
    }
}
