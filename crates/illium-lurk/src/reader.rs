//! Reader: source text to data
//!
//! Reads exactly one expression. Supported syntax: lists and dotted pairs,
//! `'x` quote, `;` line comments, strings, `#\c` characters, decimal and
//! `0x` hex numbers (optionally negative), `u64`-suffixed integers,
//! `:keywords`, `nil`, and symbols.

use std::rc::Rc;

use k256::Scalar;

use crate::error::{EvalError, Result};
use crate::num;
use crate::value::Value;

/// Nesting limit, keeps the recursive reader off the end of the stack
const MAX_DEPTH: usize = 512;

/// Read a single expression; anything but whitespace and comments after it is an error
pub fn read(src: &str) -> Result<Value> {
    let mut reader = Reader::new(src);
    let value = reader.read_expr(0)?;
    reader.skip_atmosphere();
    if let Some((offset, c)) = reader.peek() {
        return Err(EvalError::parse(
            offset,
            format!("unexpected trailing input starting with {:?}", c),
        ));
    }
    Ok(value)
}

/// Read a parameter blob; blank text reads as `nil`
pub fn read_or_nil(src: &str) -> Result<Value> {
    let mut reader = Reader::new(src);
    reader.skip_atmosphere();
    if reader.peek().is_none() {
        return Ok(Value::Nil);
    }
    read(src)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '"' | ';')
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.src[self.pos..].chars().next().map(|c| (self.pos, c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.src[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_atmosphere(&mut self) {
        while let Some((_, c)) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_expr(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(EvalError::parse(self.pos, "nesting too deep"));
        }
        self.skip_atmosphere();
        let (offset, c) = self
            .peek()
            .ok_or_else(|| EvalError::parse(self.pos, "unexpected end of input"))?;

        match c {
            '(' => {
                self.bump();
                self.read_list(offset, depth)
            }
            ')' => Err(EvalError::parse(offset, "unexpected ')'")),
            '\'' => {
                self.bump();
                let quoted = self.read_expr(depth + 1)?;
                Ok(Value::list(vec![Value::sym("quote"), quoted]))
            }
            '"' => {
                self.bump();
                self.read_string(offset)
            }
            '#' => {
                self.bump();
                self.read_char(offset)
            }
            _ => {
                let token = self.read_token();
                parse_atom(offset, token)
            }
        }
    }

    fn read_list(&mut self, open: usize, depth: usize) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            self.skip_atmosphere();
            let (offset, c) = self
                .peek()
                .ok_or_else(|| EvalError::parse(open, "unclosed '('"))?;

            if c == ')' {
                self.bump();
                return Ok(Value::list(items));
            }

            if c == '.' && self.is_lone_dot(offset) {
                if items.is_empty() {
                    return Err(EvalError::parse(offset, "dot with no preceding element"));
                }
                self.bump();
                let tail = self.read_expr(depth + 1)?;
                self.skip_atmosphere();
                return match self.bump() {
                    Some(')') => Ok(Value::list_with_tail(items, tail)),
                    _ => Err(EvalError::parse(offset, "expected ')' after dotted tail")),
                };
            }

            items.push(self.read_expr(depth + 1)?);
        }
    }

    fn is_lone_dot(&self, offset: usize) -> bool {
        self.src[offset + 1..]
            .chars()
            .next()
            .map_or(true, is_delimiter)
    }

    fn read_string(&mut self, open: usize) -> Result<Value> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(EvalError::parse(open, "unterminated string")),
                Some('"') => return Ok(Value::Str(Rc::from(out.as_str()))),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        return Err(EvalError::parse(
                            self.pos,
                            format!("unknown escape \\{}", other),
                        ))
                    }
                    None => return Err(EvalError::parse(open, "unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn read_char(&mut self, open: usize) -> Result<Value> {
        if self.bump() != Some('\\') {
            return Err(EvalError::parse(open, "expected '\\' after '#'"));
        }
        let first = self
            .bump()
            .ok_or_else(|| EvalError::parse(open, "missing character after #\\"))?;

        if !first.is_alphabetic() {
            return Ok(Value::Char(first));
        }

        let start = self.pos - first.len_utf8();
        while let Some((_, c)) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            self.bump();
        }
        let name = &self.src[start..self.pos];
        if name.chars().count() == 1 {
            return Ok(Value::Char(first));
        }
        match name {
            "space" => Ok(Value::Char(' ')),
            "newline" => Ok(Value::Char('\n')),
            "tab" => Ok(Value::Char('\t')),
            _ => Err(EvalError::parse(open, format!("unknown character name {}", name))),
        }
    }

    fn read_token(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while let Some((_, c)) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            self.bump();
        }
        &src[start..self.pos]
    }
}

fn parse_atom(offset: usize, token: &str) -> Result<Value> {
    if token == "nil" {
        return Ok(Value::Nil);
    }
    if let Some(name) = token.strip_prefix(':') {
        if name.is_empty() {
            return Err(EvalError::parse(offset, "empty keyword"));
        }
        return Ok(Value::Key(Rc::from(name)));
    }

    let (negative, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    if !body.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(Value::Sym(Rc::from(token)));
    }

    if let Some(digits) = body.strip_suffix("u64") {
        if negative {
            return Err(EvalError::parse(offset, "u64 literals cannot be negative"));
        }
        return digits
            .parse::<u64>()
            .map(Value::U64)
            .map_err(|_| EvalError::parse(offset, format!("invalid u64 literal {}", token)));
    }

    let parsed = match body.strip_prefix("0x") {
        Some(hex) => num::parse_hex(hex),
        None => num::parse_decimal(body),
    };
    let n: Scalar = parsed
        .ok_or_else(|| EvalError::parse(offset, format!("invalid numeric literal {}", token)))?;
    Ok(Value::Num(if negative { -n } else { n }))
}
