//! Indirect pointer pairs.  An even/odd pair of words whose even word
//! carries the tag 043 is an ITS ("indirect to segment") pointer; the
//! tag 041 makes it an ITP ("indirect to pointer register") pointer.
//!
//! ```text
//! ITS even word:  - (3) | SEGNO (15) | RN (3) | - (9) | 043
//! ITP even word:  PRNUM (3) | - (27) | 041
//! odd word:       WORDNO (18) | - (3) | BITNO (6) | - (3) | MOD (6)
//! ```
use serde::Serialize;

use crate::subword::field;
use crate::unsigned::{Unsigned15Bit, Unsigned18Bit, Unsigned36Bit, Unsigned3Bit, Unsigned6Bit};

/// The tag value which marks an ITS pointer pair.
pub const ITS_TAG: u8 = 0o43;
/// The tag value which marks an ITP pointer pair.
pub const ITP_TAG: u8 = 0o41;

fn low_tag(even: Unsigned36Bit) -> u64 {
    field(even, 0, 6)
}

/// Returns true if `even` is the even word of an ITS pointer pair.
pub fn is_its(even: Unsigned36Bit) -> bool {
    low_tag(even) == u64::from(ITS_TAG)
}

/// Returns true if `even` is the even word of an ITP pointer pair.
pub fn is_itp(even: Unsigned36Bit) -> bool {
    low_tag(even) == u64::from(ITP_TAG)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ItsPointer {
    pub segno: Unsigned15Bit,
    pub ring: Unsigned3Bit,
    pub wordno: Unsigned18Bit,
    pub bitno: Unsigned6Bit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ItpPointer {
    /// The pointer register whose ring and segment are used.
    pub prnum: Unsigned3Bit,
    pub wordno: Unsigned18Bit,
    pub bitno: Unsigned6Bit,
}

impl ItsPointer {
    /// Decode the ITS fields of a pair without looking at its tag.
    /// RTCD takes its operand in this layout whatever the tag says.
    pub fn from_pair(even: Unsigned36Bit, odd: Unsigned36Bit) -> ItsPointer {
        ItsPointer {
            segno: Unsigned15Bit::truncating(field(even, 18, 15)),
            ring: Unsigned3Bit::truncating(field(even, 15, 3)),
            wordno: Unsigned18Bit::truncating(field(odd, 18, 18)),
            bitno: Unsigned6Bit::truncating(field(odd, 9, 6)),
        }
    }
}

/// A decoded even/odd pointer pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IndirectPair {
    Its(ItsPointer),
    Itp(ItpPointer),
}

impl IndirectPair {
    /// Decode a word pair.  Returns `None` when the even word is
    /// tagged neither ITS nor ITP.
    pub fn decode(even: Unsigned36Bit, odd: Unsigned36Bit) -> Option<IndirectPair> {
        if is_its(even) {
            Some(IndirectPair::Its(ItsPointer::from_pair(even, odd)))
        } else if is_itp(even) {
            Some(IndirectPair::Itp(ItpPointer {
                prnum: Unsigned3Bit::truncating(field(even, 33, 3)),
                wordno: Unsigned18Bit::truncating(field(odd, 18, 18)),
                bitno: Unsigned6Bit::truncating(field(odd, 9, 6)),
            }))
        } else {
            None
        }
    }
}
