//! Lexical analysis for the expression language.

use regex::Regex;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?").expect("number pattern is valid")
});

/// A token of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Quoted string literal, quotes removed.
    Str(String),
    /// A name: variable or function.
    Ident(String),
    /// One of `+ - * / %`.
    Op(char),
    /// `=`, only valid right after the target name of a statement.
    Assign,
    LParen,
    RParen,
    Comma,
}

/// Errors that can occur while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unfinished string literal")]
    UnfinishedQuote,
    /// Digits that do not form a representable number.
    #[error("malformed number '{0}'")]
    BadNumber(String),
    /// A character with no meaning in the language.
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingIdent,
    ReadingQuote(char),
}

struct LexingFSM<'a> {
    input: &'a str,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl<'a> LexingFSM<'a> {
    fn new(input: &'a str) -> Self {
        LexingFSM {
            input,
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.peek_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out)?,
                LexingState::ReadingIdent => self.handle_ident(ch, &mut out),
                LexingState::ReadingQuote(quote) => self.handle_quote(ch, quote, &mut out),
            }
        }

        match self.state {
            LexingState::ReadingQuote(_) => return Err(LexingError::UnfinishedQuote),
            LexingState::ReadingIdent => out.push(Token::Ident(std::mem::take(&mut self.buffer))),
            LexingState::Start => {}
        }

        Ok(out)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        match ch {
            c if c.is_whitespace() => self.advance(c),
            c if c.is_ascii_digit() || (c == '.' && self.next_is_digit()) => {
                out.push(self.read_number()?);
            }
            c if c.is_alphabetic() || c == '_' => {
                self.advance(c);
                self.buffer.push(c);
                self.state = LexingState::ReadingIdent;
            }
            '\'' | '"' => {
                self.advance(ch);
                self.state = LexingState::ReadingQuote(ch);
            }
            '+' | '-' | '*' | '/' | '%' => {
                self.advance(ch);
                out.push(Token::Op(ch));
            }
            '=' => {
                self.advance(ch);
                out.push(Token::Assign);
            }
            '(' => {
                self.advance(ch);
                out.push(Token::LParen);
            }
            ')' => {
                self.advance(ch);
                out.push(Token::RParen);
            }
            ',' => {
                self.advance(ch);
                out.push(Token::Comma);
            }
            c => return Err(LexingError::UnexpectedChar(c)),
        }
        Ok(())
    }

    fn handle_ident(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch.is_alphanumeric() || ch == '_' {
            self.advance(ch);
            self.buffer.push(ch);
        } else {
            // Leave `ch` for the start state.
            out.push(Token::Ident(std::mem::take(&mut self.buffer)));
            self.state = LexingState::Start;
        }
    }

    fn handle_quote(&mut self, ch: char, quote: char, out: &mut Vec<Token>) {
        self.advance(ch);
        if ch == quote {
            out.push(Token::Str(std::mem::take(&mut self.buffer)));
            self.state = LexingState::Start;
        } else {
            self.buffer.push(ch);
        }
    }

    fn next_is_digit(&self) -> bool {
        self.input[self.pos..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn read_number(&mut self) -> Result<Token, LexingError> {
        let rest = &self.input[self.pos..];
        let text = match NUMBER.find(rest) {
            Some(m) => m.as_str(),
            None => return Err(LexingError::BadNumber(rest.to_string())),
        };
        self.pos += text.len();

        let is_float = text.contains(['.', 'e', 'E']);
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexingError::BadNumber(text.to_string()))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| LexingError::BadNumber(text.to_string()))
        }
    }
}

/// Split an expression or statement into tokens.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Token {
        Token::Ident(s.to_string())
    }

    #[test]
    fn test_arithmetic_tokens() {
        let tokens = split_into_tokens("x * 2 + 1.5").unwrap();
        assert_eq!(
            tokens,
            vec![ident("x"), Token::Op('*'), Token::Int(2), Token::Op('+'), Token::Float(1.5)]
        );
    }

    #[test]
    fn test_assignment_and_call() {
        let tokens = split_into_tokens("total=max(a, 3)").unwrap();
        assert_eq!(
            tokens,
            vec![
                ident("total"),
                Token::Assign,
                ident("max"),
                Token::LParen,
                ident("a"),
                Token::Comma,
                Token::Int(3),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_strings_keep_inner_whitespace() {
        let tokens = split_into_tokens(r#"'a b' + "c""#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Str("a b".into()), Token::Op('+'), Token::Str("c".into())]
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(split_into_tokens(".5").unwrap(), vec![Token::Float(0.5)]);
        assert_eq!(split_into_tokens("2e3").unwrap(), vec![Token::Float(2000.0)]);
        assert_eq!(split_into_tokens("7.").unwrap(), vec![Token::Float(7.0)]);
        assert_eq!(split_into_tokens("42").unwrap(), vec![Token::Int(42)]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(split_into_tokens("'open"), Err(LexingError::UnfinishedQuote));
        assert_eq!(split_into_tokens("a ; b"), Err(LexingError::UnexpectedChar(';')));
        assert!(matches!(
            split_into_tokens("99999999999999999999"),
            Err(LexingError::BadNumber(_))
        ));
    }
}
