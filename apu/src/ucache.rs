//! The micro-translation cache ("ucache").
//!
//! This is a simulator optimisation, not a hardware feature.  For a
//! few kinds of cycle it remembers, per segment, the result of the
//! last full translation so that a later access to the same page of
//! the same segment can skip the descriptor walk and the protection
//! checks.  Entries are indexed by cycle class and segment number;
//! segments numbered 512 and above are never cached.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::compose::Translation;

/// The kind of cycle a cache entry belongs to.  Entries made for one
/// class are never used for another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum UcacheClass {
    InstructionFetch,
    OperandRead,
    OperandReadTransfer,
    OperandReadCall6,
}

impl UcacheClass {
    pub const COUNT: usize = 4;

    #[must_use]
    pub const fn all() -> [UcacheClass; UcacheClass::COUNT] {
        [
            UcacheClass::InstructionFetch,
            UcacheClass::OperandRead,
            UcacheClass::OperandReadTransfer,
            UcacheClass::OperandReadCall6,
        ]
    }

    const fn index(&self) -> usize {
        *self as usize
    }

    /// The class of an operand read made by `inst`.
    pub fn for_operand_read(inst: &Instruction) -> UcacheClass {
        if inst.is_call6() {
            UcacheClass::OperandReadCall6
        } else if inst.is_transfer() {
            UcacheClass::OperandReadTransfer
        } else {
            UcacheClass::OperandRead
        }
    }
}

impl Display for UcacheClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UcacheClass::InstructionFetch => "instruction fetch",
            UcacheClass::OperandRead => "operand read",
            UcacheClass::OperandReadTransfer => "operand read (transfer)",
            UcacheClass::OperandReadCall6 => "operand read (CALL6)",
        })
    }
}

/// What a cache hit hands back to the cycle driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UcacheHit {
    pub bound: Unsigned14Bit,
    pub p: bool,
    pub page_address: u32,
    pub r1: Unsigned3Bit,
    pub paged: bool,
}

impl UcacheHit {
    /// The final address of `ca` in the cached segment or page.
    pub fn translate(&self, ca: Unsigned18Bit) -> Translation {
        Translation::from_base(self.page_address, self.paged, ca)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct UcacheEntry {
    valid: bool,
    offset: Unsigned18Bit,
    hit: UcacheHit,
}

/// Hit, miss and skip counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UcacheStats {
    pub hits: [u64; UcacheClass::COUNT],
    pub misses: [u64; UcacheClass::COUNT],
    pub skips: [u64; UcacheClass::COUNT],
    /// Operand reads of transfers not cached because of the ring
    /// alarm register.
    pub ralr_skips: u64,
    pub call6_skips: u64,
    /// Lookups of segments too high-numbered to be cached.
    pub segno_skips: u64,
}

impl UcacheStats {
    pub fn hits_for(&self, class: UcacheClass) -> u64 {
        self.hits[class.index()]
    }

    pub fn misses_for(&self, class: UcacheClass) -> u64 {
        self.misses[class.index()]
    }

    pub fn skips_for(&self, class: UcacheClass) -> u64 {
        self.skips[class.index()]
    }
}

/// Why a cycle may not use the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ineligible {
    /// The instruction is RTCD or an uninterruptible EIS instruction.
    Instruction,
    /// The ring alarm register is set.
    RingAlarm,
    Call6,
}

/// Decide whether an instruction fetch may use the cache.
pub fn instruction_fetch_eligibility(
    inst: &Instruction,
    ralr: Unsigned3Bit,
) -> Result<(), Ineligible> {
    if inst.is_rtcd() || inst.is_uninterruptible_eis() {
        Err(Ineligible::Instruction)
    } else if !ralr.is_zero() {
        Err(Ineligible::RingAlarm)
    } else {
        Ok(())
    }
}

/// Decide whether an operand read may use the cache.
pub fn operand_read_eligibility(
    inst: &Instruction,
    prr: Unsigned3Bit,
    ralr: Unsigned3Bit,
) -> Result<(), Ineligible> {
    if inst.is_call6() {
        Err(Ineligible::Call6)
    } else if inst.is_transfer() && !ralr.is_zero() && prr >= ralr {
        Err(Ineligible::RingAlarm)
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MicroCache {
    entries: Vec<UcacheEntry>,
    stats: UcacheStats,
}

impl Default for MicroCache {
    fn default() -> MicroCache {
        MicroCache::new()
    }
}

impl MicroCache {
    #[must_use]
    pub fn new() -> MicroCache {
        MicroCache {
            entries: vec![UcacheEntry::default(); UcacheClass::COUNT * UCACHE_SEGMENTS as usize],
            stats: UcacheStats::default(),
        }
    }

    fn slot(class: UcacheClass, segno: Unsigned15Bit) -> Option<usize> {
        let segno = u32::from(segno);
        if segno < UCACHE_SEGMENTS {
            Some(class.index() * UCACHE_SEGMENTS as usize + segno as usize)
        } else {
            None
        }
    }

    /// Forget every entry.  The statistics are kept.
    pub fn invalidate(&mut self) {
        for e in self.entries.iter_mut() {
            e.valid = false;
        }
    }

    /// Look for a usable translation of `segno`/`ca`.
    pub fn check(
        &mut self,
        class: UcacheClass,
        segno: Unsigned15Bit,
        ca: Unsigned18Bit,
    ) -> Option<UcacheHit> {
        let Some(slot) = MicroCache::slot(class, segno) else {
            self.stats.segno_skips += 1;
            self.stats.misses[class.index()] += 1;
            return None;
        };
        let entry = self.entries[slot];
        let same_page = || {
            u32::from(entry.offset) & PAGE_NUMBER_MASK == u32::from(ca) & PAGE_NUMBER_MASK
        };
        if !entry.valid
            || (entry.hit.paged && !same_page())
            || block_number(ca) > u32::from(entry.hit.bound)
        {
            self.stats.misses[class.index()] += 1;
            return None;
        }
        self.stats.hits[class.index()] += 1;
        event!(
            Level::TRACE,
            "ucache hit ({}): segno {:05o} ca {:06o} base {:08o} paged {}",
            class,
            segno,
            ca,
            entry.hit.page_address,
            entry.hit.paged,
        );
        Some(entry.hit)
    }

    /// Remember the translation just made for `segno`/`ca`.
    pub fn save(
        &mut self,
        class: UcacheClass,
        segno: Unsigned15Bit,
        ca: Unsigned18Bit,
        hit: UcacheHit,
    ) {
        if let Some(slot) = MicroCache::slot(class, segno) {
            self.entries[slot] = UcacheEntry {
                valid: true,
                offset: ca,
                hit,
            };
        }
    }

    /// Count a cycle which was not allowed to use the cache.
    pub fn note_skip(&mut self, class: UcacheClass, why: Ineligible) {
        self.stats.skips[class.index()] += 1;
        match why {
            Ineligible::RingAlarm => self.stats.ralr_skips += 1,
            Ineligible::Call6 => self.stats.call6_skips += 1,
            Ineligible::Instruction => (),
        }
    }

    pub fn stats(&self) -> UcacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::instruction::opcodes;

    fn segno(n: u16) -> Unsigned15Bit {
        Unsigned15Bit::try_from(n).expect("valid test data")
    }

    fn ca(n: u32) -> Unsigned18Bit {
        Unsigned18Bit::try_from(n).expect("valid test data")
    }

    fn op(n: u16, extended: bool) -> Instruction {
        Instruction::from_opcode(
            Unsigned9Bit::try_from(n).expect("valid test data"),
            extended,
        )
    }

    fn paged_entry() -> UcacheHit {
        UcacheHit {
            bound: Unsigned14Bit::truncating(0o777),
            p: false,
            page_address: 0o40_000,
            r1: Unsigned3Bit::truncating(4),
            paged: true,
        }
    }

    #[test]
    fn test_only_cached_cycles_have_classes() {
        let all = UcacheClass::all();
        for (i, class) in all.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
        assert_eq!(
            all.map(|c| c.to_string()),
            [
                "instruction fetch",
                "operand read",
                "operand read (transfer)",
                "operand read (CALL6)",
            ]
        );
        assert_eq!(
            MicroCache::new().entries.len(),
            UcacheClass::COUNT * UCACHE_SEGMENTS as usize
        );
    }

    #[test]
    fn test_empty_cache_misses() {
        let mut uc = MicroCache::new();
        assert_eq!(uc.check(UcacheClass::OperandRead, segno(1), ca(0)), None);
        assert_eq!(uc.stats().misses_for(UcacheClass::OperandRead), 1);
        assert_eq!(uc.stats().hits_for(UcacheClass::OperandRead), 0);
    }

    #[test]
    fn test_hit_within_page() {
        let mut uc = MicroCache::new();
        uc.save(UcacheClass::OperandRead, segno(1), ca(0o2_010), paged_entry());
        let hit = uc
            .check(UcacheClass::OperandRead, segno(1), ca(0o3_777))
            .expect("same page should hit");
        assert_eq!(hit, paged_entry());
        assert_eq!(hit.translate(ca(0o3_777)).final_address, 0o41_777_u32);
        assert_eq!(uc.stats().hits_for(UcacheClass::OperandRead), 1);
    }

    #[test]
    fn test_other_page_misses() {
        let mut uc = MicroCache::new();
        uc.save(UcacheClass::OperandRead, segno(1), ca(0o2_010), paged_entry());
        assert_eq!(uc.check(UcacheClass::OperandRead, segno(1), ca(0o4_000)), None);
    }

    #[test]
    fn test_unpaged_any_offset_within_bound() {
        let mut uc = MicroCache::new();
        let entry = UcacheHit {
            paged: false,
            bound: Unsigned14Bit::truncating(0o100),
            ..paged_entry()
        };
        uc.save(UcacheClass::InstructionFetch, segno(3), ca(0), entry);
        assert!(uc
            .check(UcacheClass::InstructionFetch, segno(3), ca(0o2_017))
            .is_some());
        // Beyond the bound.
        assert_eq!(
            uc.check(UcacheClass::InstructionFetch, segno(3), ca(0o2_020)),
            None
        );
    }

    #[test]
    fn test_classes_are_separate() {
        let mut uc = MicroCache::new();
        uc.save(UcacheClass::OperandRead, segno(1), ca(0), paged_entry());
        assert_eq!(
            uc.check(UcacheClass::OperandReadTransfer, segno(1), ca(0)),
            None
        );
        assert_eq!(uc.check(UcacheClass::InstructionFetch, segno(1), ca(0)), None);
    }

    #[test]
    fn test_high_segments_not_cached() {
        let mut uc = MicroCache::new();
        uc.save(UcacheClass::OperandRead, segno(0o1_000), ca(0), paged_entry());
        assert_eq!(uc.check(UcacheClass::OperandRead, segno(0o1_000), ca(0)), None);
        assert_eq!(uc.stats().segno_skips, 1);
    }

    #[test]
    fn test_invalidate() {
        let mut uc = MicroCache::new();
        uc.save(UcacheClass::OperandRead, segno(1), ca(0), paged_entry());
        uc.invalidate();
        assert_eq!(uc.check(UcacheClass::OperandRead, segno(1), ca(0)), None);
    }

    #[test]
    fn test_instruction_fetch_eligibility() {
        let lda = op(0o235, false);
        assert_eq!(instruction_fetch_eligibility(&lda, Unsigned3Bit::ZERO), Ok(()));
        assert_eq!(
            instruction_fetch_eligibility(&lda, Unsigned3Bit::ONE),
            Err(Ineligible::RingAlarm)
        );
        let rtcd = op(opcodes::RTCD, false);
        assert_eq!(
            instruction_fetch_eligibility(&rtcd, Unsigned3Bit::ZERO),
            Err(Ineligible::Instruction)
        );
        let mvn = op(0o300, true);
        assert_eq!(
            instruction_fetch_eligibility(&mvn, Unsigned3Bit::ZERO),
            Err(Ineligible::Instruction)
        );
    }

    #[test]
    fn test_operand_read_eligibility() {
        let four = Unsigned3Bit::truncating(4);
        let call6 = op(opcodes::CALL6, false);
        assert_eq!(
            operand_read_eligibility(&call6, Unsigned3Bit::ZERO, Unsigned3Bit::ZERO),
            Err(Ineligible::Call6)
        );
        let tra = op(opcodes::TRA, false);
        assert_eq!(operand_read_eligibility(&tra, Unsigned3Bit::ONE, four), Ok(()));
        assert_eq!(
            operand_read_eligibility(&tra, four, four),
            Err(Ineligible::RingAlarm)
        );
        // Only transfers care about the ring alarm.
        let lda = op(0o235, false);
        assert_eq!(operand_read_eligibility(&lda, four, four), Ok(()));
        assert_eq!(
            UcacheClass::for_operand_read(&call6),
            UcacheClass::OperandReadCall6
        );
        assert_eq!(
            UcacheClass::for_operand_read(&tra),
            UcacheClass::OperandReadTransfer
        );
        assert_eq!(UcacheClass::for_operand_read(&lda), UcacheClass::OperandRead);
    }

    #[test]
    fn test_skip_counters() {
        let mut uc = MicroCache::new();
        uc.note_skip(UcacheClass::OperandReadCall6, Ineligible::Call6);
        uc.note_skip(UcacheClass::OperandReadTransfer, Ineligible::RingAlarm);
        uc.note_skip(UcacheClass::InstructionFetch, Ineligible::Instruction);
        let stats = uc.stats();
        assert_eq!(stats.call6_skips, 1);
        assert_eq!(stats.ralr_skips, 1);
        assert_eq!(stats.skips_for(UcacheClass::InstructionFetch), 1);
        assert_eq!(stats.skips_for(UcacheClass::OperandReadCall6), 1);
    }
}
