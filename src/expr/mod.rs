//! A small, side-effect-free expression language.
//!
//! Used by `@exec` to evaluate statements against the shared state and by
//! `@bind` to create new commands from a formula over their argument `x`,
//! without ever evaluating arbitrary host code.
//!
//! ```text
//! statement := name '=' sum | sum
//! sum       := product (('+' | '-') product)*
//! product   := unary (('*' | '/' | '%') unary)*
//! unary     := '-' unary | primary
//! primary   := int | float | string | name | name '(' args ')' | '(' sum ')'
//! ```

mod lexer;
mod parser;

use crate::error::ShellError;
use crate::state::SharedState;
use anyhow::{Result, anyhow, bail};
use std::fmt;

pub use lexer::LexingError;
pub use parser::{BinOp, Expr, ParsingError, Statement};

/// A value of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Interpret a command argument: integer if possible, then float, else text.
    pub fn from_arg(arg: &str) -> Self {
        let trimmed = arg.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            Value::Int(n)
        } else if let Ok(f) = trimmed.parse::<f64>() {
            Value::Float(f)
        } else {
            Value::Str(arg.to_string())
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Where names are looked up during evaluation.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Scope for SharedState {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get::<Value>(name)
            .or_else(|| self.get::<i64>(name).map(Value::Int))
            .or_else(|| self.get::<i32>(name).map(|n| Value::Int(i64::from(n))))
            .or_else(|| self.get::<f64>(name).map(Value::Float))
            .or_else(|| self.get::<String>(name).map(Value::Str))
            .or_else(|| self.get::<&'static str>(name).map(|s| Value::Str(s.to_string())))
    }
}

/// Scope binding the argument `x` on top of another scope.
struct ArgScope<'a> {
    arg: Option<Value>,
    outer: &'a dyn Scope,
}

impl Scope for ArgScope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match (&self.arg, name) {
            (Some(arg), "x") => Some(arg.clone()),
            _ => self.outer.lookup(name),
        }
    }
}

/// Errors raised while turning text into a [`Program`].
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lexing(#[from] LexingError),
    #[error(transparent)]
    Parsing(#[from] ParsingError),
}

/// A parsed statement, ready to run any number of times.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    statement: Statement,
}

impl Program {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the statement. Assignments store into `state` and yield `None`.
    pub fn run(&self, state: &SharedState, arg: Option<Value>) -> Result<Option<Value>> {
        let scope = ArgScope { arg, outer: state };
        match &self.statement {
            Statement::Assign { name, value } => {
                let value = eval(value, &scope)?;
                state.set(name.clone(), value);
                Ok(None)
            }
            Statement::Expr(expr) => eval(expr, &scope).map(Some),
        }
    }
}

/// Parse `source` into a runnable program.
pub fn compile(source: &str) -> std::result::Result<Program, SyntaxError> {
    let tokens = lexer::split_into_tokens(source)?;
    let statement = parser::construct_ast(tokens)?;
    Ok(Program {
        source: source.to_string(),
        statement,
    })
}

/// Evaluate an expression tree.
pub fn eval(expr: &Expr, scope: &dyn Scope) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Name(name) => scope
            .lookup(name)
            .ok_or_else(|| ShellError::UnboundReference(name.clone()).into()),
        Expr::Neg(inner) => match eval(inner, scope)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| anyhow!("integer overflow")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(bad_operand(&format!("unary -: {}", other.type_name()))),
        },
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            binary(*op, lhs, rhs)
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>>>()?;
            call(name, args)
        }
    }
}

/// Longest string, in bytes, that `+` or `*` may produce.
pub const MAX_STR_LEN: usize = 1 << 20;

fn bounded_len(len: Option<usize>) -> Result<usize> {
    match len {
        Some(len) if len <= MAX_STR_LEN => Ok(len),
        _ => Err(ShellError::BadArgument(format!("string result longer than {MAX_STR_LEN} bytes")).into()),
    }
}

fn bad_operand(detail: &str) -> anyhow::Error {
    ShellError::BadArgument(format!("unsupported operand type(s) for {detail}")).into()
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    use Value::{Float, Int, Str};

    let overflow = || anyhow!("integer overflow in '{}'", op.symbol());
    match (op, lhs, rhs) {
        (BinOp::Add, Str(a), Str(b)) => {
            bounded_len(a.len().checked_add(b.len()))?;
            Ok(Str(a + &b))
        }
        (BinOp::Mul, Str(s), Int(n)) | (BinOp::Mul, Int(n), Str(s)) => {
            let count = usize::try_from(n).unwrap_or(0);
            bounded_len(s.len().checked_mul(count))?;
            Ok(Str(s.repeat(count)))
        }
        (_, Int(_), Int(0)) if matches!(op, BinOp::Div | BinOp::Rem) => bail!("division by zero"),
        (BinOp::Add, Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(overflow),
        (BinOp::Sub, Int(a), Int(b)) => a.checked_sub(b).map(Int).ok_or_else(overflow),
        (BinOp::Mul, Int(a), Int(b)) => a.checked_mul(b).map(Int).ok_or_else(overflow),
        (BinOp::Rem, Int(a), Int(b)) => a.checked_rem(b).map(Int).ok_or_else(overflow),
        (BinOp::Div, Int(a), Int(b)) => match a.checked_rem(b) {
            Some(0) => a.checked_div(b).map(Int).ok_or_else(overflow),
            Some(_) => Ok(Float(a as f64 / b as f64)),
            None => Err(overflow()),
        },
        (op, a, b) => {
            let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
                return Err(bad_operand(&format!(
                    "{}: {} and {}",
                    op.symbol(),
                    a.type_name(),
                    b.type_name()
                )));
            };
            match op {
                BinOp::Add => Ok(Float(x + y)),
                BinOp::Sub => Ok(Float(x - y)),
                BinOp::Mul => Ok(Float(x * y)),
                BinOp::Div | BinOp::Rem if y == 0.0 => bail!("division by zero"),
                BinOp::Div => Ok(Float(x / y)),
                BinOp::Rem => Ok(Float(x % y)),
            }
        }
    }
}

fn expect_arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(ShellError::BadArgument(format!(
            "{name}() takes {n} argument(s), {} given",
            args.len()
        ))
        .into());
    }
    Ok(())
}

fn numeric(name: &str, v: &Value) -> Result<f64> {
    v.as_f64().ok_or_else(|| {
        ShellError::BadArgument(format!("{name}() needs a number, not {}", v.type_name())).into()
    })
}

fn call(name: &str, args: Vec<Value>) -> Result<Value> {
    match name {
        "int" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Int(n) => Ok(Value::Int(*n)),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                Value::Float(f) => Err(ShellError::BadArgument(format!("cannot convert {f} to int")).into()),
                Value::Str(s) => Ok(Value::Int(s.trim().parse::<i64>()?)),
            }
        }
        "float" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Float(s.trim().parse::<f64>()?)),
                v => Ok(Value::Float(numeric(name, v)?)),
            }
        }
        "str" => {
            expect_arity(name, &args, 1)?;
            Ok(Value::Str(args[0].to_string()))
        }
        "hex" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Int(n) if *n < 0 => Ok(Value::Str(format!("-{:x}", n.unsigned_abs()))),
                Value::Int(n) => Ok(Value::Str(format!("{n:x}"))),
                v => Err(ShellError::BadArgument(format!("hex() needs an int, not {}", v.type_name())).into()),
            }
        }
        "abs" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Int(n) => n
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| anyhow!("integer overflow in abs()")),
                v => Ok(Value::Float(numeric(name, v)?.abs())),
            }
        }
        "sqrt" => {
            expect_arity(name, &args, 1)?;
            let x = numeric(name, &args[0])?;
            if x < 0.0 {
                return Err(ShellError::BadArgument("math domain error".to_string()).into());
            }
            Ok(Value::Float(x.sqrt()))
        }
        "len" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                v => Err(ShellError::BadArgument(format!("len() needs a str, not {}", v.type_name())).into()),
            }
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(ShellError::BadArgument(format!("{name}() needs at least one argument")).into());
            }
            let mut best = args[0].clone();
            let mut best_key = numeric(name, &best)?;
            for v in &args[1..] {
                let key = numeric(name, v)?;
                let better = if name == "min" { key < best_key } else { key > best_key };
                if better {
                    best = v.clone();
                    best_key = key;
                }
            }
            Ok(best)
        }
        _ => Err(ShellError::UnboundReference(name.to_string()).into()),
    }
}
