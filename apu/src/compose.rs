//! Composition of the final (absolute) address, sheets H and I.
use serde::Serialize;

use base::prelude::*;

use crate::walker::page_frame_address;

/// Mask applied to an unpaged segment's base address.
const SDW_ADDR_MASK: u32 = 0o77_777_760;

/// Width mask of an absolute address.
const ADDRESS_MASK: u32 = 0o77_777_777;

/// The outcome of address composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Translation {
    /// The address of the word `TPR.CA` refers to.
    pub final_address: Unsigned24Bit,
    /// Base address of the segment (unpaged) or page frame (paged).
    /// This is what the micro-translation cache remembers.
    pub page_address: u32,
    pub paged: bool,
}

impl Translation {
    /// Add `ca` to a base address which is already known.  Only the
    /// offset within the page is added when `paged` is set.
    pub fn from_base(page_address: u32, paged: bool, ca: Unsigned18Bit) -> Translation {
        let offset = if paged {
            u32::from(ca) & PAGE_OFFSET_MASK
        } else {
            u32::from(ca)
        };
        Translation {
            final_address: Unsigned24Bit::truncating(u64::from(
                page_address.wrapping_add(offset) & ADDRESS_MASK,
            )),
            page_address,
            paged,
        }
    }
}

/// Sheet H: final address within an unpaged segment.
pub fn unpaged(sdw: &SegmentDescriptor, ca: Unsigned18Bit) -> Translation {
    Translation::from_base(u32::from(sdw.addr) & SDW_ADDR_MASK, false, ca)
}

/// Sheet I: final address within a paged segment.
pub fn paged(ptw: &PageTableWord, ca: Unsigned18Bit) -> Translation {
    Translation::from_base(page_frame_address(ptw), true, ca)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_unpaged() {
        let sdw = SegmentDescriptor {
            addr: Unsigned24Bit::truncating(0o1_000_017),
            unpaged: true,
            ..SegmentDescriptor::default()
        };
        let t = unpaged(&sdw, Unsigned18Bit::truncating(0o2_345));
        assert!(!t.paged);
        // The low four bits of the base are ignored.
        assert_eq!(t.page_address, 0o1_000_000);
        assert_eq!(t.final_address, 0o1_002_345_u32);
    }

    #[test]
    fn test_paged() {
        let ptw = PageTableWord {
            addr: Unsigned18Bit::truncating(0o20),
            df: true,
            ..PageTableWord::default()
        };
        // CA 0o3_123 is word 0o1_123 of page 1.
        let t = paged(&ptw, Unsigned18Bit::truncating(0o3_123));
        assert!(t.paged);
        assert_eq!(t.page_address, 0o2_000);
        assert_eq!(t.final_address, 0o3_123_u32);
    }

    #[test]
    fn test_wraps_to_address_width() {
        let t = Translation::from_base(0o77_777_000, false, Unsigned18Bit::truncating(0o1_000));
        assert_eq!(t.final_address, 0_u32);
    }

    #[proptest]
    fn paged_offset_stays_within_frame(
        #[strategy(0..0o1_000_000u32)] ca: u32,
        #[strategy(0..0o1_000_000u32)] frame: u32,
    ) {
        let ptw = PageTableWord {
            addr: Unsigned18Bit::try_from(frame).expect("strategy keeps this in range"),
            ..PageTableWord::default()
        };
        let t = paged(&ptw, Unsigned18Bit::try_from(ca).expect("strategy keeps this in range"));
        let base = page_frame_address(&ptw);
        assert_eq!(u32::from(t.final_address), (base + (ca % PAGE_SIZE)) & 0o77_777_777);
    }
}
