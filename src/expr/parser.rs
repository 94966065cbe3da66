use super::Value;
use super::lexer::Token;

/// Binary operators, in the order of the characters that spell them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinOp::Add),
            '-' => Some(BinOp::Sub),
            '*' => Some(BinOp::Mul),
            '/' => Some(BinOp::Div),
            '%' => Some(BinOp::Rem),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Rem => '%',
        }
    }
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

/// A complete line of the language.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`: store the value in the shared state.
    Assign { name: String, value: Expr },
    /// A bare expression, evaluated for its value.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParsingError {
    /// A token that cannot appear at this position.
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    /// Input ended in the middle of an expression.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// Nothing to parse.
    #[error("empty expression")]
    Empty,
    /// More than [`MAX_DEPTH`] levels of nesting or chained operators.
    #[error("expression nested too deeply")]
    TooDeep,
}

/// Deepest nesting the builder accepts.
///
/// Parentheses, negations, calls and every chained binary operator each add
/// a level.
pub const MAX_DEPTH: usize = 256;

struct AstBuilder {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl AstBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        AstBuilder {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn build_ast(mut self) -> Result<Statement, ParsingError> {
        if self.tokens.is_empty() {
            return Err(ParsingError::Empty);
        }

        let statement = match (self.peek(), self.peek_n(1)) {
            (Some(Token::Ident(name)), Some(Token::Assign)) => {
                let name = name.clone();
                self.pos += 2;
                Statement::Assign {
                    name,
                    value: self.parse_sum()?,
                }
            }
            _ => Statement::Expr(self.parse_sum()?),
        };

        // Ensure we consumed all tokens
        if let Some(token) = self.consume() {
            return Err(ParsingError::UnexpectedToken(token));
        }

        Ok(statement)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_n(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParsingError> {
        match self.consume() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ParsingError::UnexpectedToken(token)),
            None => Err(ParsingError::UnexpectedEnd),
        }
    }

    fn descend(&mut self) -> Result<(), ParsingError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParsingError::TooDeep);
        }
        Ok(())
    }

    fn peek_op(&self, ops: &[char]) -> Option<BinOp> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => BinOp::from_char(*c),
            _ => None,
        }
    }

    /// sum: product (('+' | '-') product)*
    fn parse_sum(&mut self) -> Result<Expr, ParsingError> {
        let saved = self.depth;
        let mut lhs = self.parse_product()?;
        while let Some(op) = self.peek_op(&['+', '-']) {
            self.pos += 1;
            self.descend()?;
            let rhs = self.parse_product()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = saved;
        Ok(lhs)
    }

    /// product: unary (('*' | '/' | '%') unary)*
    fn parse_product(&mut self) -> Result<Expr, ParsingError> {
        let saved = self.depth;
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_op(&['*', '/', '%']) {
            self.pos += 1;
            self.descend()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = saved;
        Ok(lhs)
    }

    /// unary: '-' unary | primary
    fn parse_unary(&mut self) -> Result<Expr, ParsingError> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_primary()
    }

    /// primary: literal | name | name '(' args ')' | '(' sum ')'
    fn parse_primary(&mut self) -> Result<Expr, ParsingError> {
        match self.consume() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    self.descend()?;
                    let args = self.parse_args()?;
                    self.depth -= 1;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_sum()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(token) => Err(ParsingError::UnexpectedToken(token)),
            None => Err(ParsingError::UnexpectedEnd),
        }
    }

    /// args: (sum (',' sum)*)? ')'
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParsingError> {
        let mut args = Vec::new();
        if let Some(Token::RParen) = self.peek() {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_sum()?);
            match self.consume() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(ParsingError::UnexpectedToken(token)),
                None => return Err(ParsingError::UnexpectedEnd),
            }
        }
    }
}

/// Build the statement tree for a token sequence.
pub fn construct_ast(tokens: Vec<Token>) -> Result<Statement, ParsingError> {
    AstBuilder::from(tokens).build_ast()
}
