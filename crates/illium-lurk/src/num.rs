//! Field element helpers for `Num` values
//!
//! Numbers live in the secp256k1 scalar field. Elements above `n/2` read and
//! print as negatives and order below the positives.

use std::cmp::Ordering;

use k256::{
    elliptic_curve::{ops::Reduce, scalar::IsHigh},
    FieldBytes, Scalar, U256,
};

/// Big-endian 32-byte encoding
pub fn to_bytes(s: &Scalar) -> [u8; 32] {
    s.to_bytes().into()
}

/// Reduce any 32 bytes into the field
pub fn reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*bytes))
}

/// Parse unsigned decimal digits
pub fn parse_decimal(digits: &str) -> Option<Scalar> {
    if digits.is_empty() {
        return None;
    }
    let ten = Scalar::from(10u64);
    let mut acc = Scalar::ZERO;
    for c in digits.chars() {
        let d = c.to_digit(10)?;
        acc = acc * ten + Scalar::from(u64::from(d));
    }
    Some(acc)
}

/// Parse up to 64 hex digits, reducing into the field
pub fn parse_hex(digits: &str) -> Option<Scalar> {
    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let padded = format!("{:0>64}", digits);
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(padded, &mut bytes).ok()?;
    Some(reduce(&bytes))
}

pub fn is_negative(s: &Scalar) -> bool {
    bool::from(s.is_high())
}

/// Signed comparison
pub fn cmp(a: &Scalar, b: &Scalar) -> Ordering {
    match (is_negative(a), is_negative(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => to_bytes(a).cmp(&to_bytes(b)),
    }
}

/// Low 64 bits of the canonical encoding
pub fn low_u64(s: &Scalar) -> u64 {
    let bytes = to_bytes(s);
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[24..]);
    u64::from_be_bytes(low)
}

fn fits_u64(s: &Scalar) -> bool {
    to_bytes(s)[..24].iter().all(|&b| b == 0)
}

/// Render as decimal when it fits in 64 bits (either sign), hex otherwise
pub fn display(s: &Scalar) -> String {
    if fits_u64(s) {
        return low_u64(s).to_string();
    }
    let neg = -*s;
    if is_negative(s) && fits_u64(&neg) {
        return format!("-{}", low_u64(&neg));
    }
    format!("0x{}", hex::encode(to_bytes(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0"), Some(Scalar::ZERO));
        assert_eq!(parse_decimal("1234"), Some(Scalar::from(1234u64)));
        assert_eq!(parse_decimal("12a"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("ff"), Some(Scalar::from(255u64)));
        assert_eq!(parse_hex(&"1".repeat(65)), None);
        assert_eq!(parse_hex("xyz"), None);
    }

    #[test]
    fn test_signed_ordering() {
        let minus_one = -Scalar::ONE;
        assert_eq!(cmp(&minus_one, &Scalar::ZERO), Ordering::Less);
        assert_eq!(cmp(&Scalar::from(3u64), &Scalar::from(2u64)), Ordering::Greater);
        assert_eq!(cmp(&-Scalar::from(3u64), &-Scalar::from(2u64)), Ordering::Less);
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&Scalar::from(42u64)), "42");
        assert_eq!(display(&-Scalar::from(7u64)), "-7");
        let big = parse_hex(&format!("1{}", "0".repeat(40))).unwrap();
        assert!(display(&big).starts_with("0x"));
    }
}
