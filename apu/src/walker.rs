//! Walks of the descriptor segment and of page tables.
//!
//! These functions only read (and, for the "modify" passes, update)
//! descriptor words in memory.  Deciding whether a descriptor which
//! is not present should fault is left to the caller, since not
//! every cycle faults on every kind of descriptor.
use tracing::{event, Level};

use base::descriptor::{PTW_MODIFIED_BIT, PTW_USED_BIT};
use base::prelude::*;
use base::subword::set_bit;

use crate::memory::{MemoryOpFailure, PhysicalMemory};
use crate::registers::Dsbr;

/// Mask applied to a PTW's address field before it is shifted into
/// page-frame position.
const PTW_ADDR_MASK: u32 = 0o777_760;

/// A page table word, together with the absolute address it was
/// read from (which a "modify" pass writes back to).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchedPtw {
    pub ptw: PageTableWord,
    pub location: Unsigned24Bit,
}

fn absolute(n: u32) -> Unsigned24Bit {
    Unsigned24Bit::truncating(u64::from(n))
}

/// Returns true when segment `segno` lies beyond the end of the
/// descriptor segment.
pub fn dsbr_bound_violated(dsbr: &Dsbr, segno: Unsigned15Bit) -> bool {
    2 * u32::from(segno) >= 16 * (u32::from(dsbr.bnd) + 1)
}

/// The absolute address of a page frame, given the PTW which maps it.
pub fn page_frame_address(ptw: &PageTableWord) -> u32 {
    (u32::from(ptw.addr) & PTW_ADDR_MASK) << 6
}

/// Fetch the DSPTW (descriptor segment page table word) for the page
/// of the descriptor segment holding the SDW of `segno`.
pub fn fetch_dsptw<M: PhysicalMemory>(
    mem: &mut M,
    dsbr: &Dsbr,
    segno: Unsigned15Bit,
) -> Result<FetchedPtw, MemoryOpFailure> {
    let x1 = (2 * u32::from(segno)) / PAGE_SIZE;
    let location = absolute(u32::from(dsbr.addr) + x1);
    let ptw = PageTableWord::from_word(mem.read_word(location)?);
    event!(
        Level::TRACE,
        "fetch_dsptw: segno {:05o} DSPTW at {:08o} ADDR {:06o} U {} DF {} FC {}",
        segno,
        location,
        ptw.addr,
        ptw.used,
        ptw.df,
        ptw.fc,
    );
    Ok(FetchedPtw { ptw, location })
}

/// Mark a DSPTW used.
pub fn modify_dsptw<M: PhysicalMemory>(
    mem: &mut M,
    dsptw: &mut FetchedPtw,
) -> Result<(), MemoryOpFailure> {
    let w = mem.read_word(dsptw.location)?;
    mem.write_word(dsptw.location, set_bit(w, PTW_USED_BIT))?;
    dsptw.ptw.used = true;
    Ok(())
}

fn fetch_sdw_pair<M: PhysicalMemory>(
    mem: &mut M,
    location: Unsigned24Bit,
) -> Result<SegmentDescriptor, MemoryOpFailure> {
    let mut pair = [Unsigned36Bit::ZERO; 2];
    mem.read_words(location, &mut pair)?;
    let sdw = SegmentDescriptor::from_words(pair[0], pair[1]);
    event!(
        Level::TRACE,
        "SDW at {:08o}: ADDR {:08o} R1 {} R2 {} R3 {} BOUND {:05o} R {} E {} W {} P {} U {} G {} EB {:05o} DF {} FC {}",
        location,
        sdw.addr,
        sdw.r1,
        sdw.r2,
        sdw.r3,
        sdw.bound,
        sdw.read,
        sdw.execute,
        sdw.write,
        sdw.privileged,
        sdw.unpaged,
        sdw.gate,
        sdw.eb,
        sdw.df,
        sdw.fc,
    );
    Ok(sdw)
}

/// Fetch the SDW of `segno` from a paged descriptor segment.
pub fn fetch_psdw<M: PhysicalMemory>(
    mem: &mut M,
    dsptw: &PageTableWord,
    segno: Unsigned15Bit,
) -> Result<SegmentDescriptor, MemoryOpFailure> {
    let y1 = (2 * u32::from(segno)) % PAGE_SIZE;
    fetch_sdw_pair(mem, absolute(page_frame_address(dsptw) + y1))
}

/// Fetch the SDW of `segno` from an unpaged descriptor segment.
pub fn fetch_nsdw<M: PhysicalMemory>(
    mem: &mut M,
    dsbr: &Dsbr,
    segno: Unsigned15Bit,
) -> Result<SegmentDescriptor, MemoryOpFailure> {
    fetch_sdw_pair(mem, absolute(u32::from(dsbr.addr) + 2 * u32::from(segno)))
}

/// The absolute address of the PTW for page `page` of a paged segment.
pub fn ptw_location(sdw: &SegmentDescriptor, page: u32) -> Unsigned24Bit {
    absolute(u32::from(sdw.addr) + page)
}

/// Fetch the PTW for page `page` of the (paged) segment described by
/// `sdw`.
pub fn fetch_ptw_for_page<M: PhysicalMemory>(
    mem: &mut M,
    sdw: &SegmentDescriptor,
    page: u32,
) -> Result<FetchedPtw, MemoryOpFailure> {
    let location = ptw_location(sdw, page);
    let ptw = PageTableWord::from_word(mem.read_word(location)?);
    event!(
        Level::TRACE,
        "fetch_ptw: page {:o} PTW at {:08o} ADDR {:06o} M {} DF {} FC {}",
        page,
        location,
        ptw.addr,
        ptw.modified,
        ptw.df,
        ptw.fc,
    );
    Ok(FetchedPtw { ptw, location })
}

/// Fetch the PTW for the page holding offset `ca`.
pub fn fetch_ptw<M: PhysicalMemory>(
    mem: &mut M,
    sdw: &SegmentDescriptor,
    ca: Unsigned18Bit,
) -> Result<FetchedPtw, MemoryOpFailure> {
    fetch_ptw_for_page(mem, sdw, u32::from(ca) / PAGE_SIZE)
}

/// Mark a page modified.
pub fn modify_ptw<M: PhysicalMemory>(
    mem: &mut M,
    ptw: &mut FetchedPtw,
) -> Result<(), MemoryOpFailure> {
    let w = mem.read_word(ptw.location)?;
    mem.write_word(ptw.location, set_bit(w, PTW_MODIFIED_BIT))?;
    ptw.ptw.modified = true;
    Ok(())
}
