use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the surface text instead
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const RED: &'static str = "\x1b[31m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        for token in tokens {
            self.print_one(token);
        }
    }

    fn print_one(&self, token: &Token) {
        let kind = self.kind(token.kind);
        let colr = if self.color { self.color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            println!(
                "[{:04}] {}{:<8} {:?}{}",
                token.offset, colr, kind, token.text, reset
            );
        } else {
            println!(
                "[{:04}] {}{:<8} {}{}",
                token.offset, colr, kind, token, reset
            );
        }
    }

    fn kind(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            EndOfStream => "EOS",
            Unknown => "UNKNOWN",

            // literals
            IntLiteral => "INT",
            FloatLiteral => "FLOAT",
            BoolLiteral => "BOOL",
            CharLiteral => "CHAR",
            StringLiteral => "STRING",

            // names
            Ident => "IDENT",

            // structure
            LParen | RParen | LBrace | RBrace => "DELIM",
            Comma | Colon | Semicolon | Dot | Arrow => "PUNCT",

            // ops / comparisons
            Plus | Minus | Star | Slash | Percent | Amp | Pipe | Bang => "OP",
            Eq | EqEq | NotEq | Less | LessEq | Greater | GreaterEq => "CMP",

            // everything else = keyword
            _ => "KEYWORD",
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            EndOfStream => Self::DIM,
            Unknown => Self::RED,
            StringLiteral | CharLiteral => Self::GRN,
            IntLiteral | FloatLiteral | BoolLiteral => Self::CYN,
            Ident => Self::YEL,
            Plus | Minus | Star | Slash | Percent | Amp | Pipe | Bang => Self::MAG,
            Eq | EqEq | NotEq | Less | LessEq | Greater | GreaterEq => Self::MAG,
            _ => Self::RESET,
        }
    }
}
