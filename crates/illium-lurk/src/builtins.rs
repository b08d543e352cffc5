//! Strict builtin operators

use std::cmp::Ordering;
use std::rc::Rc;

use k256::Scalar;

use crate::commit::CommitmentStore;
use crate::error::{EvalError, Result};
use crate::num;
use crate::value::Value;

/// A builtin operator, applied to fully evaluated arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cons,
    StrCons,
    Car,
    Cdr,
    Atom,
    Eq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    NumEq,
    Lt,
    Gt,
    Le,
    Ge,
    Num,
    U64,
    Char,
    Comm,
    Commit,
    Hide,
    Open,
    Secret,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "cons" => Self::Cons,
            "strcons" => Self::StrCons,
            "car" => Self::Car,
            "cdr" => Self::Cdr,
            "atom" => Self::Atom,
            "eq" => Self::Eq,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "=" => Self::NumEq,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "num" => Self::Num,
            "u64" => Self::U64,
            "char" => Self::Char,
            "comm" => Self::Comm,
            "commit" => Self::Commit,
            "hide" => Self::Hide,
            "open" => Self::Open,
            "secret" => Self::Secret,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cons => "cons",
            Self::StrCons => "strcons",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::Atom => "atom",
            Self::Eq => "eq",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::NumEq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Num => "num",
            Self::U64 => "u64",
            Self::Char => "char",
            Self::Comm => "comm",
            Self::Commit => "commit",
            Self::Hide => "hide",
            Self::Open => "open",
            Self::Secret => "secret",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Car
            | Self::Cdr
            | Self::Atom
            | Self::Num
            | Self::U64
            | Self::Char
            | Self::Comm
            | Self::Commit
            | Self::Open
            | Self::Secret => 1,
            _ => 2,
        }
    }
}

/// Apply a builtin to evaluated arguments
pub fn apply(op: Builtin, args: Vec<Value>, store: &mut CommitmentStore) -> Result<Value> {
    if args.len() != op.arity() {
        return Err(EvalError::ArityMismatch {
            op: op.name().to_string(),
            expected: op.arity(),
            actual: args.len(),
        });
    }
    let mut args = args.into_iter();
    let a = args.next().unwrap_or(Value::Nil);
    let b = args.next().unwrap_or(Value::Nil);

    match op {
        Builtin::Cons => Ok(Value::cons(a, b)),
        Builtin::StrCons => strcons(a, b),
        Builtin::Car => car(a),
        Builtin::Cdr => cdr(a),
        Builtin::Atom => Ok(Value::from_bool(!matches!(a, Value::Cons(..)))),
        Builtin::Eq => Ok(Value::from_bool(a == b)),
        Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div | Builtin::Rem => {
            arithmetic(op, &a, &b)
        }
        Builtin::NumEq | Builtin::Lt | Builtin::Gt | Builtin::Le | Builtin::Ge => {
            compare(op, &a, &b)
        }
        Builtin::Num => to_num(&a),
        Builtin::U64 => to_u64(&a),
        Builtin::Char => to_char(&a),
        Builtin::Comm => match a {
            Value::Num(n) => Ok(Value::Comm(num::to_bytes(&n))),
            Value::Comm(_) => Ok(a),
            other => Err(mismatch("comm", "num", &other)),
        },
        Builtin::Commit => Ok(Value::Comm(store.hide(Scalar::ZERO, a))),
        Builtin::Hide => {
            let secret = match a {
                Value::Num(n) => n,
                Value::U64(n) => Scalar::from(n),
                other => return Err(mismatch("hide", "num", &other)),
            };
            Ok(Value::Comm(store.hide(secret, b)))
        }
        Builtin::Open => {
            let digest = comm_digest("open", &a)?;
            opening(store, &digest).map(|(_, payload)| payload.clone())
        }
        Builtin::Secret => {
            let digest = comm_digest("secret", &a)?;
            opening(store, &digest).map(|(secret, _)| Value::Num(*secret))
        }
    }
}

fn mismatch(op: &'static str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op,
        expected,
        found: found.type_name(),
    }
}

fn strcons(head: Value, tail: Value) -> Result<Value> {
    let c = match head {
        Value::Char(c) => c,
        other => return Err(mismatch("strcons", "char", &other)),
    };
    let rest = match tail {
        Value::Str(s) => s,
        other => return Err(mismatch("strcons", "string", &other)),
    };
    let mut out = String::with_capacity(rest.len() + c.len_utf8());
    out.push(c);
    out.push_str(&rest);
    Ok(Value::Str(Rc::from(out.as_str())))
}

fn car(v: Value) -> Result<Value> {
    match v {
        Value::Cons(pair) => Ok(pair.car.clone()),
        Value::Nil => Ok(Value::Nil),
        Value::Str(s) => Ok(s.chars().next().map_or(Value::Nil, Value::Char)),
        other => Err(mismatch("car", "list", &other)),
    }
}

fn cdr(v: Value) -> Result<Value> {
    match v {
        Value::Cons(pair) => Ok(pair.cdr.clone()),
        Value::Nil => Ok(Value::Nil),
        Value::Str(s) => {
            let rest = s.chars().next().map_or("", |c| &s[c.len_utf8()..]);
            Ok(Value::str(rest))
        }
        other => Err(mismatch("cdr", "list", &other)),
    }
}

/// Operands after promotion
enum Operands {
    Field(Scalar, Scalar),
    Word(u64, u64),
}

fn operands(op: &'static str, a: &Value, b: &Value) -> Result<Operands> {
    match (a, b) {
        (Value::U64(x), Value::U64(y)) => Ok(Operands::Word(*x, *y)),
        (Value::Num(x), Value::Num(y)) => Ok(Operands::Field(*x, *y)),
        (Value::Num(x), Value::U64(y)) => Ok(Operands::Field(*x, Scalar::from(*y))),
        (Value::U64(x), Value::Num(y)) => Ok(Operands::Field(Scalar::from(*x), *y)),
        (Value::Num(_) | Value::U64(_), other) | (other, _) => Err(mismatch(op, "num", other)),
    }
}

fn arithmetic(op: Builtin, a: &Value, b: &Value) -> Result<Value> {
    match operands(op.name(), a, b)? {
        Operands::Field(x, y) => match op {
            Builtin::Add => Ok(Value::Num(x + y)),
            Builtin::Sub => Ok(Value::Num(x - y)),
            Builtin::Mul => Ok(Value::Num(x * y)),
            Builtin::Div => {
                let inverse: Option<Scalar> = y.invert().into();
                inverse
                    .map(|inv| Value::Num(x * inv))
                    .ok_or(EvalError::DivisionByZero)
            }
            _ => Err(EvalError::TypeMismatch {
                op: "%",
                expected: "u64",
                found: "num".to_string(),
            }),
        },
        Operands::Word(x, y) => match op {
            Builtin::Add => Ok(Value::U64(x.wrapping_add(y))),
            Builtin::Sub => Ok(Value::U64(x.wrapping_sub(y))),
            Builtin::Mul => Ok(Value::U64(x.wrapping_mul(y))),
            Builtin::Div => x
                .checked_div(y)
                .map(Value::U64)
                .ok_or(EvalError::DivisionByZero),
            _ => x
                .checked_rem(y)
                .map(Value::U64)
                .ok_or(EvalError::DivisionByZero),
        },
    }
}

fn compare(op: Builtin, a: &Value, b: &Value) -> Result<Value> {
    let ordering = match operands(op.name(), a, b)? {
        Operands::Field(x, y) => num::cmp(&x, &y),
        Operands::Word(x, y) => x.cmp(&y),
    };
    let holds = match op {
        Builtin::NumEq => ordering == Ordering::Equal,
        Builtin::Lt => ordering == Ordering::Less,
        Builtin::Gt => ordering == Ordering::Greater,
        Builtin::Le => ordering != Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::from_bool(holds))
}

fn to_num(v: &Value) -> Result<Value> {
    match v {
        Value::Num(_) => Ok(v.clone()),
        Value::U64(n) => Ok(Value::Num(Scalar::from(*n))),
        Value::Char(c) => Ok(Value::Num(Scalar::from(u64::from(u32::from(*c))))),
        Value::Comm(d) => Ok(Value::Num(num::reduce(d))),
        other => Err(mismatch("num", "num, u64, char or comm", other)),
    }
}

fn to_u64(v: &Value) -> Result<Value> {
    match v {
        Value::Num(n) => Ok(Value::U64(num::low_u64(n))),
        Value::U64(_) => Ok(v.clone()),
        Value::Char(c) => Ok(Value::U64(u64::from(u32::from(*c)))),
        other => Err(mismatch("u64", "num, u64 or char", other)),
    }
}

fn to_char(v: &Value) -> Result<Value> {
    let code = match v {
        Value::Char(_) => return Ok(v.clone()),
        Value::Num(n) => num::low_u64(n),
        Value::U64(n) => *n,
        other => return Err(mismatch("char", "num, u64 or char", other)),
    };
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Char)
        .ok_or(EvalError::InvalidChar(code))
}

fn comm_digest(op: &'static str, v: &Value) -> Result<[u8; 32]> {
    match v {
        Value::Comm(d) => Ok(*d),
        Value::Num(n) => Ok(num::to_bytes(n)),
        other => Err(mismatch(op, "comm", other)),
    }
}

fn opening<'a>(store: &'a CommitmentStore, digest: &[u8; 32]) -> Result<&'a (Scalar, Value)> {
    store
        .open(digest)
        .ok_or_else(|| EvalError::UnknownCommitment(hex::encode(digest)))
}
