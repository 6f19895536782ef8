//! Address-space constants of the DPS8/M.
use super::unsigned::{Unsigned18Bit, Unsigned24Bit};

/// Number of words in a page.
pub const PAGE_SIZE: u32 = 1024;

/// Mask selecting the offset of a word within its page.
pub const PAGE_OFFSET_MASK: u32 = PAGE_SIZE - 1;

/// Mask selecting the page-number part of an 18-bit offset.
pub const PAGE_NUMBER_MASK: u32 = 0o776_000;

/// Segment numbers at or above this value are never held in the
/// micro-translation cache.
pub const UCACHE_SEGMENTS: u32 = 512;

/// Absolute (physical) main-memory address.
pub type AbsoluteAddress = Unsigned24Bit;

/// Offset of a word within a segment.
pub type WordOffset = Unsigned18Bit;

/// The 16-word block number of an offset, which is what segment
/// bounds are compared against.
pub fn block_number(offset: WordOffset) -> u32 {
    (u32::from(offset) >> 4) & 0o37_777
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_number() {
        assert_eq!(block_number(Unsigned18Bit::ZERO), 0);
        assert_eq!(block_number(Unsigned18Bit::from(0o17_u8)), 0);
        assert_eq!(block_number(Unsigned18Bit::from(0o20_u8)), 1);
        assert_eq!(block_number(Unsigned18Bit::MAX), 0o37_777);
    }
}
