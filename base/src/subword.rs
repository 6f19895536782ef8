//! Various convenience utilities for splitting 36-bit DPS8/M words
//! into smaller components and for joining them together.
//!
//! Bit positions here are counted from the least-significant end of
//! the word (bit 0 has the value 1).  Hardware documentation numbers
//! bits from the other end; callers convert where needed.
use std::ops::Shl;

use crate::unsigned::{Unsigned18Bit, Unsigned36Bit};

/// Split a 36-bit word into two 18-bit values.
pub fn split_halves(w: Unsigned36Bit) -> (Unsigned18Bit, Unsigned18Bit) {
    (left_half(w), right_half(w))
}

/// Join two 18-bit values into a 36-bit word.
pub fn join_halves(left: Unsigned18Bit, right: Unsigned18Bit) -> Unsigned36Bit {
    Unsigned36Bit::from(left).shl(18) | Unsigned36Bit::from(right)
}

/// Extract the right (less-significant) halfword from a full word.
pub fn right_half(word: Unsigned36Bit) -> Unsigned18Bit {
    let bits: u64 = u64::from(word);
    Unsigned18Bit::truncating(bits)
}

/// Extract the left (more-significant) halfword from a full word.
pub fn left_half(word: Unsigned36Bit) -> Unsigned18Bit {
    let bits: u64 = u64::from(word) >> 18;
    Unsigned18Bit::truncating(bits)
}

/// Returns true if bit `n` (counting from the least-significant end)
/// of `word` is set.
pub fn test_bit(word: Unsigned36Bit, n: u32) -> bool {
    u64::from(word).checked_shr(n).unwrap_or(0) & 1 != 0
}

/// Returns `word` with bit `n` (counting from the least-significant
/// end) set.
pub fn set_bit(word: Unsigned36Bit, n: u32) -> Unsigned36Bit {
    word | (Unsigned36Bit::ONE << n)
}

/// Returns `word` with bit `n` (counting from the least-significant
/// end) cleared.
pub fn clear_bit(word: Unsigned36Bit, n: u32) -> Unsigned36Bit {
    word & !(Unsigned36Bit::ONE << n)
}

/// Extract the field of `width` bits whose lowest bit is at
/// position `shift`.
pub fn field(word: Unsigned36Bit, shift: u32, width: u32) -> u64 {
    let mask: u64 = (1_u64 << width) - 1;
    u64::from(word).checked_shr(shift).unwrap_or(0) & mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unsigned::{Unsigned18Bit, Unsigned36Bit};

    macro_rules! assert_octal_eq {
        ($left:expr, $right:expr $(,)?) => {{
            match (&$left, &$right) {
                (left_val, right_val) => {
                    if !(*left_val == *right_val) {
                        panic!(
                            "Assertion failed: {:>#012o} != {:>#012o}",
                            left_val, right_val
                        );
                    }
                }
            }
        }};
    }

    #[test]
    fn test_join_halves() {
        assert_octal_eq!(
            join_halves(
                Unsigned18Bit::try_from(0o123_456_u32).unwrap(),
                Unsigned18Bit::try_from(0o525_252_u32).unwrap()
            ),
            0o123_456_525_252_u64
        );
    }

    #[test]
    fn test_split_halves() {
        let (l, r) = split_halves(Unsigned36Bit::try_from(0o123_456_525_252_u64).unwrap());
        assert_octal_eq!(l, 0o123_456_u32);
        assert_octal_eq!(r, 0o525_252_u32);
    }

    #[test]
    fn test_bits() {
        let w = Unsigned36Bit::from(0o100_u8);
        assert!(test_bit(w, 6));
        assert!(!test_bit(w, 5));
        assert!(!test_bit(w, 64));
        assert_octal_eq!(set_bit(w, 9), 0o1100_u64);
        assert_octal_eq!(clear_bit(w, 6), 0_u64);
        assert_octal_eq!(set_bit(w, 35), 0o400_000_000_100_u64);
    }

    #[test]
    fn test_field() {
        let w = Unsigned36Bit::try_from(0o001_234_567_070_u64).unwrap();
        assert_eq!(field(w, 3, 3), 0o7);
        assert_eq!(field(w, 12, 24), 0o00_123_456);
        assert_eq!(field(w, 0, 36), 0o001_234_567_070);
    }
}
