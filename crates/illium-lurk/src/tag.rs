//! Type tags and the fixed-width tagged value encoding

use illium_core::types::hex_array;
use serde::{Deserialize, Serialize};

/// Width of the tag field in bytes
pub const TAG_SIZE: usize = 32;

/// Width of the value field in bytes
pub const VALUE_SIZE: usize = 32;

/// Type tag of a value in the language's value universe
///
/// Codes are stable: they are part of every proof statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Tag {
    Nil = 0,
    Cons = 1,
    Sym = 2,
    Fun = 3,
    Num = 4,
    Str = 6,
    Char = 7,
    Comm = 8,
    U64 = 9,
    Key = 10,
}

impl Tag {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Nil),
            1 => Some(Self::Cons),
            2 => Some(Self::Sym),
            3 => Some(Self::Fun),
            4 => Some(Self::Num),
            6 => Some(Self::Str),
            7 => Some(Self::Char),
            8 => Some(Self::Comm),
            9 => Some(Self::U64),
            10 => Some(Self::Key),
            _ => None,
        }
    }

    /// Tag encoded as a big-endian, right-aligned field
    pub fn to_field(self) -> [u8; TAG_SIZE] {
        let mut out = [0u8; TAG_SIZE];
        out[TAG_SIZE - 2..].copy_from_slice(&self.code().to_be_bytes());
        out
    }

    /// Decode a tag field; all bytes but the last two must be zero
    pub fn from_field(field: &[u8; TAG_SIZE]) -> Option<Self> {
        if field[..TAG_SIZE - 2].iter().any(|&b| b != 0) {
            return None;
        }
        Self::from_code(u16::from_be_bytes([field[TAG_SIZE - 2], field[TAG_SIZE - 1]]))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Cons => "cons",
            Self::Sym => "symbol",
            Self::Fun => "function",
            Self::Num => "num",
            Self::Str => "string",
            Self::Char => "char",
            Self::Comm => "comm",
            Self::U64 => "u64",
            Self::Key => "keyword",
        }
    }
}

/// A `(tag, value)` pair of fixed-size fields
///
/// This is the externally visible form of an evaluation result and the
/// output a proof attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedValue {
    #[serde(with = "hex_array")]
    pub tag: [u8; TAG_SIZE],
    #[serde(with = "hex_array")]
    pub value: [u8; VALUE_SIZE],
}

impl TaggedValue {
    pub fn new(tag: [u8; TAG_SIZE], value: [u8; VALUE_SIZE]) -> Self {
        Self { tag, value }
    }

    /// The decoded tag, if the tag field is a known code
    pub fn tag_kind(&self) -> Option<Tag> {
        Tag::from_field(&self.tag)
    }
}
