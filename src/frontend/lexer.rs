use crate::frontend::token::{Token, TokenKind};

/// Single-pass tokenizer.
///
/// `next()` produces one token at a time and never rewinds; once the input
/// is exhausted it returns `EndOfStream` forever. Restarting requires a
/// fresh `Lexer`.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_ws_and_comments(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek() == Some('/') {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Returns the next token, advancing the cursor.
    pub fn next(&mut self) -> Token {
        self.skip_ws_and_comments();

        let start = self.pos;
        let ch = match self.current() {
            Some(c) => c,
            None => return Token::new(TokenKind::EndOfStream, "", start),
        };

        if ch.is_ascii_alphabetic() || ch == '_' {
            return self.read_identifier(start);
        }
        if ch.is_ascii_digit() {
            return self.read_number(start);
        }
        if ch == '\'' {
            return self.read_char(start);
        }
        if ch == '"' {
            return self.read_string(start);
        }

        self.read_punctuation(start, ch)
    }

    /// Collects tokens up to and including the first `EndOfStream`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next();
            let done = token.kind == TokenKind::EndOfStream;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(kind) = TokenKind::keyword(&text) {
            return Token::new(kind, text, start);
        }
        if text == "true" || text == "false" {
            return Token::new(TokenKind::BoolLiteral, text, start);
        }
        Token::new(TokenKind::Ident, text, start)
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut text = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // '.' only starts a fraction when a digit follows; otherwise it is
        // left in place for the Dot token.
        if self.current() == Some('.') && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current(), Some('e') | Some('E')) {
            is_float = true;
            text.push(self.advance().unwrap_or('e'));
            if matches!(self.current(), Some('+') | Some('-')) {
                text.push(self.advance().unwrap_or('+'));
            }
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if is_float {
            Token::new(TokenKind::FloatLiteral, text, start)
        } else {
            Token::new(TokenKind::IntLiteral, text, start)
        }
    }

    /// Char literal: `'x'` or `'\x'`. The escape is preserved verbatim in
    /// the token text. Unterminated literals stop at end of input.
    fn read_char(&mut self, start: usize) -> Token {
        self.advance(); // opening quote

        let mut text = String::new();
        match self.current() {
            Some('\\') => {
                text.push('\\');
                self.advance();
                if let Some(escaped) = self.advance() {
                    text.push(escaped);
                }
            }
            Some(ch) if ch != '\'' => {
                text.push(ch);
                self.advance();
            }
            _ => {}
        }

        if self.current() == Some('\'') {
            self.advance();
        }
        Token::new(TokenKind::CharLiteral, text, start)
    }

    /// String literal. Backslash escapes are copied through unprocessed;
    /// an unterminated literal stops at end of input.
    fn read_string(&mut self, start: usize) -> Token {
        self.advance(); // opening quote

        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch == '"' {
                break;
            }
            if ch == '\\' {
                text.push(ch);
                self.advance();
                if let Some(escaped) = self.advance() {
                    text.push(escaped);
                }
            } else {
                text.push(ch);
                self.advance();
            }
        }

        if self.current() == Some('"') {
            self.advance();
        }
        Token::new(TokenKind::StringLiteral, text, start)
    }

    fn read_punctuation(&mut self, start: usize, ch: char) -> Token {
        // Two-character punctuation before one-character.
        if let Some(next) = self.peek() {
            let two = match (ch, next) {
                ('-', '>') => Some(TokenKind::Arrow),
                ('=', '=') => Some(TokenKind::EqEq),
                ('!', '=') => Some(TokenKind::NotEq),
                ('<', '=') => Some(TokenKind::LessEq),
                ('>', '=') => Some(TokenKind::GreaterEq),
                _ => None,
            };
            if let Some(kind) = two {
                self.advance();
                self.advance();
                let text: String = [ch, next].iter().collect();
                return Token::new(kind, text, start);
            }
        }

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '=' => TokenKind::Eq,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '!' => TokenKind::Bang,
            _ => TokenKind::Unknown,
        };

        self.advance();
        Token::new(kind, ch.to_string(), start)
    }
}
