use crate::frontend::lexer::Lexer;
use crate::frontend::parser_error::SyntaxError;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::ast::{BinaryOp, Expr, FuncDecl, Literal, Param, Program, TypeExpr, UnaryOp};

/// Recursive-descent parser with precedence climbing for expressions.
///
/// The parser pulls tokens lazily from an owned `Lexer` with a single token
/// of lookahead and produces a `Program`: an ordered list of function
/// declarations. A bare top-level expression is wrapped into an implicit
/// `main` declaration with no parameters.
///
/// Notes:
/// - The declaration grammar uses `==` as the name/body separator
///   (`func f(x: int): int == x + 1`) — a grammar choice, not an error.
/// - Bare `=` inside an expression is equality shorthand, at the same
///   precedence as `==` and `!=`.
/// - Any unexpected token at a required production point aborts the parse;
///   there is no error recovery.
pub struct Parser {
    lexer: Lexer,
    cur: Token,
}

impl Parser {
    /// Creates a parser over a fresh lexer, priming one token of lookahead.
    pub fn new(mut lexer: Lexer) -> Self {
        let cur = lexer.next();
        Parser { lexer, cur }
    }

    /// Convenience constructor straight from source text.
    pub fn from_source(source: &str) -> Self {
        Parser::new(Lexer::new(source))
    }

    /// Consumes the current token and returns it, pulling the next one.
    fn bump(&mut self) -> Token {
        let next = self.lexer.next();
        std::mem::replace(&mut self.cur, next)
    }

    /// Consumes the current token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.cur.kind == kind {
            self.bump();
            return true;
        }
        false
    }

    /// Consumes a token of the given kind or fails with `expected <what>`.
    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.cur.kind == kind {
            return Ok(self.bump());
        }
        Err(self.error(&format!("expected {}", what)))
    }

    /// Constructs a `SyntaxError` at the current token.
    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError {
            message: message.to_string(),
            offset: self.cur.offset,
            found: self.cur.text.clone(),
        }
    }

    /// Parses a complete program: function declarations until end of input.
    ///
    /// A top-level token that does not start a declaration is parsed as an
    /// expression and becomes the body of an implicit `main`.
    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let mut funcs = Vec::new();

        while self.cur.kind != TokenKind::EndOfStream {
            if self.cur.kind == TokenKind::KwFunc {
                funcs.push(self.parse_func()?);
            } else {
                let body = self.parse_expr()?;
                funcs.push(FuncDecl {
                    name: "main".to_string(),
                    params: Vec::new(),
                    ret: TypeExpr::Int,
                    body,
                });
            }
        }

        Ok(Program { funcs })
    }

    /// Parses one declaration:
    ///
    /// ```text
    /// func <name> [( <name> ':' <type> {',' <name> ':' <type>} )] ':' <type> '==' <expr>
    /// ```
    ///
    /// The parameter list is optional; `func f: int == 1` is valid.
    fn parse_func(&mut self) -> Result<FuncDecl, SyntaxError> {
        self.expect(TokenKind::KwFunc, "'func'")?;
        let name = self.expect(TokenKind::Ident, "function name after 'func'")?.text;

        let mut params = Vec::new();
        if self.eat(TokenKind::LParen) {
            if self.cur.kind != TokenKind::RParen {
                loop {
                    let pname = self.expect(TokenKind::Ident, "parameter name")?.text;
                    self.expect(TokenKind::Colon, "':' after parameter name")?;
                    let ty = self.parse_type_expr()?;
                    params.push(Param { name: pname, ty });
                    if self.eat(TokenKind::Comma) {
                        continue;
                    }
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')' after parameter list")?;
        }

        self.expect(TokenKind::Colon, "':' before return type")?;
        let ret = self.parse_type_expr()?;
        self.expect(TokenKind::EqEq, "'==' before function body")?;
        let body = self.parse_expr()?;

        Ok(FuncDecl {
            name,
            params,
            ret,
            body,
        })
    }

    /// Parses a type expression: one of the built-in type keywords or an
    /// identifier (a named type, structurally unvalidated).
    fn parse_type_expr(&mut self) -> Result<TypeExpr, SyntaxError> {
        let ty = match self.cur.kind {
            TokenKind::KwInt => TypeExpr::Int,
            TokenKind::KwBool => TypeExpr::Bool,
            TokenKind::KwChar => TypeExpr::Char,
            TokenKind::KwString => TypeExpr::Str,
            TokenKind::Ident => TypeExpr::Named(self.cur.text.clone()),
            _ => return Err(self.error("expected type expression")),
        };
        self.bump();
        Ok(ty)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_unary()?;
        self.parse_binary_rhs(lhs, 0)
    }

    /// Precedence-climbing loop: fold operators of precedence >= `min_prec`
    /// into `lhs`, recursing with `prec + 1` when the next operator binds
    /// tighter. Same-precedence chains come out left-leaning.
    fn parse_binary_rhs(&mut self, mut lhs: Expr, min_prec: u8) -> Result<Expr, SyntaxError> {
        loop {
            let (prec, op) = match precedence(self.cur.kind) {
                Some((prec, op)) if prec >= min_prec => (prec, op),
                _ => return Ok(lhs),
            };
            self.bump();

            let mut rhs = self.parse_unary()?;
            if let Some((next_prec, _)) = precedence(self.cur.kind) {
                if next_prec > prec {
                    rhs = self.parse_binary_rhs(rhs, prec + 1)?;
                }
            }

            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.cur.kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    /// Primary expressions: literals, identifiers (a call when immediately
    /// followed by `(`), parenthesized expressions, and `if` expressions.
    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.cur.kind {
            TokenKind::IntLiteral => {
                let token = self.bump();
                let value: i64 = token.text.parse().map_err(|_| SyntaxError {
                    message: "integer literal out of range".to_string(),
                    offset: token.offset,
                    found: token.text.clone(),
                })?;
                Ok(Expr::Literal(Literal::Int(value)))
            }
            TokenKind::FloatLiteral => {
                let token = self.bump();
                let value: f64 = token.text.parse().map_err(|_| SyntaxError {
                    message: "malformed float literal".to_string(),
                    offset: token.offset,
                    found: token.text.clone(),
                })?;
                Ok(Expr::Literal(Literal::Float(value)))
            }
            TokenKind::BoolLiteral => {
                let token = self.bump();
                Ok(Expr::Literal(Literal::Bool(token.text == "true")))
            }
            TokenKind::StringLiteral => {
                let token = self.bump();
                Ok(Expr::Literal(Literal::Str(token.text)))
            }
            TokenKind::Ident => {
                let name = self.bump().text;
                if self.cur.kind == TokenKind::LParen {
                    return self.parse_call(name);
                }
                Ok(Expr::Ident(name))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::KwIf => self.parse_if(),
            _ => Err(self.error("expected expression")),
        }
    }

    /// `<callee> ( [expr {',' expr}] )` — the opening paren is current.
    fn parse_call(&mut self, callee: String) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        if self.cur.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' after arguments")?;

        Ok(Expr::Call { callee, args })
    }

    /// `if <expr> then <expr> else <expr> fi` — all four keywords required.
    fn parse_if(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::KwIf, "'if'")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::KwThen, "'then' after condition")?;
        let then_branch = self.parse_expr()?;
        self.expect(TokenKind::KwElse, "'else' after then-branch")?;
        let else_branch = self.parse_expr()?;
        self.expect(TokenKind::KwFi, "'fi' after else-branch")?;

        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }
}

/// Binding strength table for binary operators; higher binds tighter.
/// Bare `=` sits at the equality level.
fn precedence(kind: TokenKind) -> Option<(u8, BinaryOp)> {
    let entry = match kind {
        TokenKind::Pipe => (10, BinaryOp::Or),
        TokenKind::Amp => (20, BinaryOp::And),
        TokenKind::EqEq | TokenKind::Eq => (30, BinaryOp::Eq),
        TokenKind::NotEq => (30, BinaryOp::Ne),
        TokenKind::Less => (40, BinaryOp::Lt),
        TokenKind::LessEq => (40, BinaryOp::Le),
        TokenKind::Greater => (40, BinaryOp::Gt),
        TokenKind::GreaterEq => (40, BinaryOp::Ge),
        TokenKind::Plus => (50, BinaryOp::Add),
        TokenKind::Minus => (50, BinaryOp::Sub),
        TokenKind::Star => (60, BinaryOp::Mul),
        TokenKind::Slash => (60, BinaryOp::Div),
        TokenKind::Percent => (60, BinaryOp::Mod),
        _ => return None,
    };
    Some(entry)
}
