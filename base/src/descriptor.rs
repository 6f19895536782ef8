//! The in-core formats of segment descriptor words (SDWs) and page
//! table words (PTWs).
//!
//! An SDW occupies an even/odd pair of words in the descriptor
//! segment.  A PTW occupies one word of a page table; the page
//! table of a paged descriptor segment (whose entries are called
//! DSPTWs) uses the same layout.
//!
//! ```text
//! SDW even word:  ADDR (24) | R1 (3) | R2 (3) | R3 (3) | - | DF | FC (2)
//! SDW odd word:   BOUND (14) | R E W P U G C | EB (14)
//! PTW:            ADDR (18) | - (8) | U | - (2) | M | - (3) | DF | FC (2)
//! ```
use serde::Serialize;

use crate::subword::{field, set_bit, test_bit};
use crate::unsigned::{
    Unsigned14Bit, Unsigned18Bit, Unsigned24Bit, Unsigned2Bit, Unsigned36Bit, Unsigned3Bit,
};

const SDW0_DF_BIT: u32 = 2;
const SDW1_R_BIT: u32 = 20;
const SDW1_E_BIT: u32 = 19;
const SDW1_W_BIT: u32 = 18;
const SDW1_P_BIT: u32 = 17;
const SDW1_U_BIT: u32 = 16;
const SDW1_G_BIT: u32 = 15;
const SDW1_C_BIT: u32 = 14;

/// Bit number of the "used" flag of a PTW (only meaningful in a
/// DSPTW).
pub const PTW_USED_BIT: u32 = 9;
/// Bit number of the "modified" flag of a PTW.
pub const PTW_MODIFIED_BIT: u32 = 6;
const PTW_DF_BIT: u32 = 2;

/// A segment descriptor word, describing the location and access
/// rights of one segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SegmentDescriptor {
    /// Absolute address of the segment (if `unpaged`) or of its page
    /// table.
    pub addr: Unsigned24Bit,
    pub r1: Unsigned3Bit,
    pub r2: Unsigned3Bit,
    pub r3: Unsigned3Bit,
    /// Directed fault flag: the segment is present when this is set.
    pub df: bool,
    /// Directed fault code, used when `df` is off.
    pub fc: Unsigned2Bit,
    /// Highest valid 16-word block of the segment.
    pub bound: Unsigned14Bit,
    pub read: bool,
    pub execute: bool,
    pub write: bool,
    pub privileged: bool,
    pub unpaged: bool,
    /// When set, calls need not go through the entry bound.
    pub gate: bool,
    pub cache: bool,
    /// Entry bound; CALL6 targets must lie below it.
    pub eb: Unsigned14Bit,
}

impl SegmentDescriptor {
    /// Decode the even/odd word pair of an SDW.
    pub fn from_words(even: Unsigned36Bit, odd: Unsigned36Bit) -> SegmentDescriptor {
        SegmentDescriptor {
            addr: Unsigned24Bit::truncating(field(even, 12, 24)),
            r1: Unsigned3Bit::truncating(field(even, 9, 3)),
            r2: Unsigned3Bit::truncating(field(even, 6, 3)),
            r3: Unsigned3Bit::truncating(field(even, 3, 3)),
            df: test_bit(even, SDW0_DF_BIT),
            fc: Unsigned2Bit::truncating(field(even, 0, 2)),
            bound: Unsigned14Bit::truncating(field(odd, 21, 14)),
            read: test_bit(odd, SDW1_R_BIT),
            execute: test_bit(odd, SDW1_E_BIT),
            write: test_bit(odd, SDW1_W_BIT),
            privileged: test_bit(odd, SDW1_P_BIT),
            unpaged: test_bit(odd, SDW1_U_BIT),
            gate: test_bit(odd, SDW1_G_BIT),
            cache: test_bit(odd, SDW1_C_BIT),
            eb: Unsigned14Bit::truncating(field(odd, 0, 14)),
        }
    }

    /// Encode this SDW as its even/odd word pair.
    pub fn to_words(&self) -> (Unsigned36Bit, Unsigned36Bit) {
        let flag = |on: bool, bit: u32| -> u64 {
            if on {
                1 << bit
            } else {
                0
            }
        };
        let even: u64 = (u64::from(self.addr) << 12)
            | (u64::from(self.r1) << 9)
            | (u64::from(self.r2) << 6)
            | (u64::from(self.r3) << 3)
            | flag(self.df, SDW0_DF_BIT)
            | u64::from(self.fc);
        let odd: u64 = (u64::from(self.bound) << 21)
            | flag(self.read, SDW1_R_BIT)
            | flag(self.execute, SDW1_E_BIT)
            | flag(self.write, SDW1_W_BIT)
            | flag(self.privileged, SDW1_P_BIT)
            | flag(self.unpaged, SDW1_U_BIT)
            | flag(self.gate, SDW1_G_BIT)
            | flag(self.cache, SDW1_C_BIT)
            | u64::from(self.eb);
        (
            Unsigned36Bit::truncating(even),
            Unsigned36Bit::truncating(odd),
        )
    }

    /// Returns true when the ring brackets are ordered `R1 <= R2 <= R3`.
    pub fn ring_brackets_ordered(&self) -> bool {
        self.r1 <= self.r2 && self.r2 <= self.r3
    }
}

/// A page table word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PageTableWord {
    /// Page frame number; the absolute address of the page is this
    /// value multiplied by 64 (after clearing its low four bits).
    pub addr: Unsigned18Bit,
    /// Used flag (descriptor segment page tables only).
    pub used: bool,
    /// The page has been written to.
    pub modified: bool,
    /// Directed fault flag: the page is present when this is set.
    pub df: bool,
    pub fc: Unsigned2Bit,
}

impl PageTableWord {
    pub fn from_word(w: Unsigned36Bit) -> PageTableWord {
        PageTableWord {
            addr: Unsigned18Bit::truncating(field(w, 18, 18)),
            used: test_bit(w, PTW_USED_BIT),
            modified: test_bit(w, PTW_MODIFIED_BIT),
            df: test_bit(w, PTW_DF_BIT),
            fc: Unsigned2Bit::truncating(field(w, 0, 2)),
        }
    }

    pub fn to_word(&self) -> Unsigned36Bit {
        let mut w = Unsigned36Bit::from(self.addr) << 18 | Unsigned36Bit::from(self.fc);
        for (on, bit) in [
            (self.used, PTW_USED_BIT),
            (self.modified, PTW_MODIFIED_BIT),
            (self.df, PTW_DF_BIT),
        ] {
            if on {
                w = set_bit(w, bit);
            }
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdw_decode() {
        let sdw = SegmentDescriptor::from_words(
            Unsigned36Bit::try_from(0o010_000_000_124_u64).expect("in range"),
            Unsigned36Bit::try_from(0o000_007_600_077_u64).expect("in range"),
        );
        assert_eq!(sdw.addr, 0o1_000_000_u32);
        assert_eq!(sdw.r1, 0_u8);
        assert_eq!(sdw.r2, 1_u8);
        assert_eq!(sdw.r3, 2_u8);
        assert!(sdw.df);
        assert_eq!(sdw.fc, 0_u8);
        assert_eq!(sdw.bound, 0_u32);
        assert!(sdw.read);
        assert!(sdw.execute);
        assert!(sdw.write);
        assert!(sdw.privileged);
        assert!(sdw.unpaged);
        assert!(!sdw.gate);
        assert_eq!(sdw.eb, 0o77_u32);
    }

    #[test]
    fn test_sdw_encode_matches_decode() {
        let sdw = SegmentDescriptor {
            addr: Unsigned24Bit::truncating(0o12_345_600),
            r1: Unsigned3Bit::truncating(1),
            r2: Unsigned3Bit::truncating(4),
            r3: Unsigned3Bit::truncating(5),
            df: false,
            fc: Unsigned2Bit::truncating(3),
            bound: Unsigned14Bit::truncating(0o1234),
            read: true,
            execute: false,
            write: true,
            privileged: false,
            unpaged: false,
            gate: true,
            cache: false,
            eb: Unsigned14Bit::truncating(0o20),
        };
        let (even, odd) = sdw.to_words();
        assert_eq!(u64::from(even), 0o123_456_001_453);
        assert_eq!(SegmentDescriptor::from_words(even, odd), sdw);
    }

    #[test]
    fn test_ring_brackets_ordered() {
        let mut sdw = SegmentDescriptor {
            r1: Unsigned3Bit::truncating(1),
            r2: Unsigned3Bit::truncating(1),
            r3: Unsigned3Bit::truncating(4),
            ..SegmentDescriptor::default()
        };
        assert!(sdw.ring_brackets_ordered());
        sdw.r2 = Unsigned3Bit::truncating(5);
        assert!(!sdw.ring_brackets_ordered());
    }

    #[test]
    fn test_ptw_decode() {
        let ptw = PageTableWord::from_word(
            Unsigned36Bit::try_from(0o000_400_001_107_u64).expect("in range"),
        );
        assert_eq!(ptw.addr, 0o400_u32);
        assert!(ptw.used);
        assert!(ptw.modified);
        assert!(ptw.df);
        assert_eq!(ptw.fc, 3_u8);
        assert_eq!(u64::from(ptw.to_word()), 0o000_400_001_107);
    }
}
