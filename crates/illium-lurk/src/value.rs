//! Values, closures and environments
//!
//! Every value has a content digest, so structurally equal data always maps
//! to the same [`TaggedValue`]. Pairs, closures and environment frames cache
//! their digest, so shared structure is hashed once. Digesting, printing and
//! dropping walk values with an explicit stack, never the native one.

use std::cell::OnceCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use k256::Scalar;
use sha2::{Digest, Sha256};

use crate::num;
use crate::tag::{Tag, TaggedValue};

/// Domain separator for all content digests
const DIGEST_DOMAIN: &[u8] = b"illium.lurk.v1";

/// A value in the language
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Cons(Rc<Pair>),
    Sym(Rc<str>),
    Key(Rc<str>),
    Num(Scalar),
    U64(u64),
    Char(char),
    Str(Rc<str>),
    Comm([u8; 32]),
    Fun(Rc<Closure>),
}

/// A cons cell
pub struct Pair {
    pub car: Value,
    pub cdr: Value,
    digest: OnceCell<[u8; 32]>,
}

/// A function value: parameters, body and captured environment
pub struct Closure {
    pub params: Vec<Rc<str>>,
    pub body: Value,
    pub env: Env,
    digest: OnceCell<[u8; 32]>,
}

impl Closure {
    pub fn new(params: Vec<Rc<str>>, body: Value, env: Env) -> Self {
        Self {
            params,
            body,
            env,
            digest: OnceCell::new(),
        }
    }
}

impl Value {
    pub fn sym(name: &str) -> Self {
        Value::Sym(Rc::from(name))
    }

    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn num(n: u64) -> Self {
        Value::Num(Scalar::from(n))
    }

    /// The canonical true value, the symbol `t`
    pub fn t() -> Self {
        Value::sym("t")
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            Value::t()
        } else {
            Value::Nil
        }
    }

    pub fn cons(car: Value, cdr: Value) -> Self {
        Value::Cons(Rc::new(Pair {
            car,
            cdr,
            digest: OnceCell::new(),
        }))
    }

    /// Build a proper list
    pub fn list(items: Vec<Value>) -> Self {
        Self::list_with_tail(items, Value::Nil)
    }

    /// Build a list ending in `tail` (dotted when tail is not nil)
    pub fn list_with_tail(items: Vec<Value>, tail: Value) -> Self {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Value::cons(item, acc))
    }

    /// Elements of a proper list, or `None` for dotted lists and non-lists
    pub fn list_items(&self) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Value::Nil => return Some(items),
                Value::Cons(pair) => {
                    items.push(pair.car.clone());
                    cur = &pair.cdr;
                }
                _ => return None,
            }
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Value::Sym(s) => Some(s),
            _ => None,
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Value::Nil => Tag::Nil,
            Value::Cons(..) => Tag::Cons,
            Value::Sym(_) => Tag::Sym,
            Value::Key(_) => Tag::Key,
            Value::Num(_) => Tag::Num,
            Value::U64(_) => Tag::U64,
            Value::Char(_) => Tag::Char,
            Value::Str(_) => Tag::Str,
            Value::Comm(_) => Tag::Comm,
            Value::Fun(_) => Tag::Fun,
        }
    }

    /// Fixed-width `(tag, value)` encoding
    pub fn tagged(&self) -> TaggedValue {
        TaggedValue::new(self.tag().to_field(), self.digest())
    }

    /// The 32-byte value field
    ///
    /// Immediate types carry their big-endian value; everything else carries
    /// a domain-separated content hash.
    pub fn digest(&self) -> [u8; 32] {
        match self {
            Value::Cons(pair) => Node::Pair(pair).digest(),
            Value::Fun(f) => Node::Fun(f).digest(),
            _ => self.known_digest().unwrap_or_default(),
        }
    }

    /// The digest if it needs no further hashing of children
    fn known_digest(&self) -> Option<[u8; 32]> {
        Some(match self {
            Value::Num(n) => num::to_bytes(n),
            Value::U64(n) => right_aligned(&n.to_be_bytes()),
            Value::Char(c) => right_aligned(&u32::from(*c).to_be_bytes()),
            Value::Comm(d) => *d,
            Value::Nil => content_digest(Tag::Nil, &[]),
            Value::Sym(s) => content_digest(Tag::Sym, &[s.as_bytes()]),
            Value::Key(s) => content_digest(Tag::Key, &[s.as_bytes()]),
            Value::Str(s) => content_digest(Tag::Str, &[s.as_bytes()]),
            Value::Cons(pair) => return pair.digest.get().copied(),
            Value::Fun(f) => return f.digest.get().copied(),
        })
    }

    /// Tagged form of a value whose children are already digested
    fn known_tagged(&self) -> Option<TaggedValue> {
        self.known_digest()
            .map(|digest| TaggedValue::new(self.tag().to_field(), digest))
    }

    /// Type name for error messages
    pub fn type_name(&self) -> String {
        self.tag().name().to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag() && self.digest() == other.digest()
    }
}

impl Eq for Value {}

fn right_aligned(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    out
}

/// SHA-256 over the domain, the tag code and length-prefixed parts
pub(crate) fn content_digest(tag: Tag, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(tag.code().to_be_bytes());
    for part in parts {
        hasher.update((part.len() as u32).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn pair_digest(car: &TaggedValue, cdr: &TaggedValue) -> [u8; 32] {
    content_digest(Tag::Cons, &[&car.tag, &car.value, &cdr.tag, &cdr.value])
}

fn empty_env_digest() -> [u8; 32] {
    content_digest(Tag::Nil, &[b"env"])
}

/// A node whose digest is cached
#[derive(Clone, Copy)]
enum Node<'a> {
    Pair(&'a Pair),
    Fun(&'a Closure),
    Frame(&'a Frame),
}

impl<'a> Node<'a> {
    fn of_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Cons(pair) => Some(Node::Pair(pair)),
            Value::Fun(f) => Some(Node::Fun(f)),
            _ => None,
        }
    }

    fn of_env(env: &'a Env) -> Option<Self> {
        env.0.as_deref().map(Node::Frame)
    }

    fn cell(self) -> &'a OnceCell<[u8; 32]> {
        match self {
            Node::Pair(p) => &p.digest,
            Node::Fun(f) => &f.digest,
            Node::Frame(fr) => &fr.digest,
        }
    }

    fn children(self, out: &mut Vec<Node<'a>>) {
        match self {
            Node::Pair(p) => {
                out.extend(Node::of_value(&p.car));
                out.extend(Node::of_value(&p.cdr));
            }
            Node::Fun(f) => {
                out.extend(Node::of_value(&f.body));
                out.extend(Node::of_env(&f.env));
            }
            Node::Frame(fr) => {
                out.extend(Node::of_value(fr.binding.value()));
                out.extend(Node::of_env(&fr.next));
            }
        }
    }

    /// Hash this node once all children are cached
    fn compute(self) -> Option<[u8; 32]> {
        Some(match self {
            Node::Pair(p) => pair_digest(&p.car.known_tagged()?, &p.cdr.known_tagged()?),
            Node::Fun(f) => {
                let params = f.params.iter().rev().fold(Value::Nil.known_tagged()?, |tail, p| {
                    let sym = TaggedValue::new(
                        Tag::Sym.to_field(),
                        content_digest(Tag::Sym, &[p.as_bytes()]),
                    );
                    TaggedValue::new(Tag::Cons.to_field(), pair_digest(&sym, &tail))
                });
                let body = f.body.known_tagged()?;
                let env = f.env.known_digest()?;
                content_digest(
                    Tag::Fun,
                    &[&params.tag, &params.value, &body.tag, &body.value, &env],
                )
            }
            Node::Frame(fr) => {
                let (kind, bound): (&[u8], _) = match &fr.binding {
                    Binding::Value(v) => (b"val", v.known_tagged()?),
                    Binding::Rec(e) => (b"rec", e.known_tagged()?),
                };
                let next = fr.next.known_digest()?;
                content_digest(
                    Tag::Fun,
                    &[b"env", fr.name.as_bytes(), kind, &bound.tag, &bound.value, &next],
                )
            }
        })
    }

    /// Digest with an explicit work stack, caching every node visited
    fn digest(self) -> [u8; 32] {
        let mut stack = vec![(self, false)];
        let mut children = Vec::new();
        while let Some((node, expanded)) = stack.pop() {
            if node.cell().get().is_some() {
                continue;
            }
            if expanded {
                if let Some(digest) = node.compute() {
                    let _ = node.cell().set(digest);
                }
                continue;
            }
            stack.push((node, true));
            node.children(&mut children);
            stack.extend(
                children
                    .drain(..)
                    .filter(|c| c.cell().get().is_none())
                    .map(|c| (c, false)),
            );
        }
        self.cell().get().copied().unwrap_or_default()
    }
}

/// Owned values released by the iterative destructor
enum Garbage {
    Value(Value),
    Env(Env),
}

impl Garbage {
    fn is_leaf(&self) -> bool {
        match self {
            Garbage::Value(v) => Node::of_value(v).is_none(),
            Garbage::Env(e) => e.0.is_none(),
        }
    }
}

/// Unlink uniquely owned children one at a time so long chains drop without recursion
fn release(items: [Garbage; 2]) {
    if items.iter().all(Garbage::is_leaf) {
        return;
    }
    let mut stack = Vec::from(items);
    while let Some(item) = stack.pop() {
        match item {
            Garbage::Value(Value::Cons(pair)) => {
                if let Ok(mut pair) = Rc::try_unwrap(pair) {
                    stack.push(Garbage::Value(mem::take(&mut pair.car)));
                    stack.push(Garbage::Value(mem::take(&mut pair.cdr)));
                }
            }
            Garbage::Value(Value::Fun(f)) => {
                if let Ok(mut f) = Rc::try_unwrap(f) {
                    stack.push(Garbage::Value(mem::take(&mut f.body)));
                    stack.push(Garbage::Env(mem::take(&mut f.env)));
                }
            }
            Garbage::Env(Env(Some(frame))) => {
                if let Ok(mut frame) = Rc::try_unwrap(frame) {
                    stack.push(Garbage::Value(frame.binding.take()));
                    stack.push(Garbage::Env(mem::take(&mut frame.next)));
                }
            }
            _ => {}
        }
    }
}

impl Drop for Pair {
    fn drop(&mut self) {
        release([
            Garbage::Value(mem::take(&mut self.car)),
            Garbage::Value(mem::take(&mut self.cdr)),
        ]);
    }
}

impl Drop for Closure {
    fn drop(&mut self) {
        release([
            Garbage::Value(mem::take(&mut self.body)),
            Garbage::Env(mem::take(&mut self.env)),
        ]);
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        release([
            Garbage::Value(self.binding.take()),
            Garbage::Env(mem::take(&mut self.next)),
        ]);
    }
}

/// Pending output while printing
enum Piece<'a> {
    Value(&'a Value),
    /// Remainder of a list after its first element
    Rest(&'a Value),
    Text(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Value(self)];
        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Text(s) => f.write_str(s)?,
                Piece::Rest(Value::Nil) => f.write_str(")")?,
                Piece::Rest(Value::Cons(pair)) => {
                    f.write_str(" ")?;
                    stack.push(Piece::Rest(&pair.cdr));
                    stack.push(Piece::Value(&pair.car));
                }
                Piece::Rest(tail) => {
                    f.write_str(" . ")?;
                    stack.push(Piece::Text(")"));
                    stack.push(Piece::Value(tail));
                }
                Piece::Value(value) => match value {
                    Value::Nil => write!(f, "nil")?,
                    Value::Sym(s) => write!(f, "{}", s)?,
                    Value::Key(s) => write!(f, ":{}", s)?,
                    Value::Num(n) => write!(f, "{}", num::display(n))?,
                    Value::U64(n) => write!(f, "{}u64", n)?,
                    Value::Char(c) => write!(f, "#\\{}", c)?,
                    Value::Str(s) => write!(f, "{:?}", s)?,
                    Value::Comm(d) => write!(f, "(comm 0x{})", hex::encode(d))?,
                    Value::Fun(c) => {
                        write!(f, "<FUNCTION (")?;
                        for (i, p) in c.params.iter().enumerate() {
                            if i > 0 {
                                write!(f, " ")?;
                            }
                            write!(f, "{}", p)?;
                        }
                        write!(f, ") ")?;
                        stack.push(Piece::Text(">"));
                        stack.push(Piece::Value(&c.body));
                    }
                    Value::Cons(pair) => {
                        f.write_str("(")?;
                        stack.push(Piece::Rest(&pair.cdr));
                        stack.push(Piece::Value(&pair.car));
                    }
                },
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body)
            .field("env_depth", &self.env.depth())
            .finish()
    }
}

/// What a name resolves to
pub enum Lookup {
    /// An ordinary binding
    Value(Value),
    /// A `letrec` binding: evaluate `expr` in `env`, which contains the binding itself
    Rec { expr: Value, env: Env },
}

enum Binding {
    Value(Value),
    Rec(Value),
}

impl Binding {
    fn value(&self) -> &Value {
        match self {
            Binding::Value(v) | Binding::Rec(v) => v,
        }
    }

    fn take(&mut self) -> Value {
        match self {
            Binding::Value(v) | Binding::Rec(v) => mem::take(v),
        }
    }
}

struct Frame {
    name: Rc<str>,
    binding: Binding,
    next: Env,
    digest: OnceCell<[u8; 32]>,
}

/// Persistent, immutable environment (innermost binding first)
#[derive(Clone, Default)]
pub struct Env(Option<Rc<Frame>>);

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Env(depth {})", self.depth())
    }
}

impl Env {
    pub fn empty() -> Self {
        Env(None)
    }

    fn push(&self, name: Rc<str>, binding: Binding) -> Self {
        Env(Some(Rc::new(Frame {
            name,
            binding,
            next: self.clone(),
            digest: OnceCell::new(),
        })))
    }

    /// New environment with `name` bound to `value`
    pub fn extend(&self, name: Rc<str>, value: Value) -> Self {
        self.push(name, Binding::Value(value))
    }

    /// New environment with a recursive binding of `name` to `expr`
    pub fn extend_rec(&self, name: Rc<str>, expr: Value) -> Self {
        self.push(name, Binding::Rec(expr))
    }

    pub fn lookup(&self, name: &str) -> Option<Lookup> {
        let mut cur = self;
        while let Some(frame) = &cur.0 {
            if &*frame.name == name {
                return Some(match &frame.binding {
                    Binding::Value(v) => Lookup::Value(v.clone()),
                    Binding::Rec(expr) => Lookup::Rec {
                        expr: expr.clone(),
                        env: cur.clone(),
                    },
                });
            }
            cur = &frame.next;
        }
        None
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of frames
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut cur = self;
        while let Some(frame) = &cur.0 {
            n += 1;
            cur = &frame.next;
        }
        n
    }

    /// Content digest of the whole environment, chained from the outermost frame
    pub fn digest(&self) -> [u8; 32] {
        match Node::of_env(self) {
            Some(node) => node.digest(),
            None => empty_env_digest(),
        }
    }

    fn known_digest(&self) -> Option<[u8; 32]> {
        match &self.0 {
            Some(frame) => frame.digest.get().copied(),
            None => Some(empty_env_digest()),
        }
    }
}
