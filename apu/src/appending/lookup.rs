use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use base::prelude::*;

use crate::appending::AppendingUnit;
use crate::compose;
use crate::memory::{MemoryOpFailure, PhysicalMemory};
use crate::walker;

/// Reasons why [`AppendingUnit::lookup_address`] could not translate
/// an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// The segment number is beyond the end of the descriptor
    /// segment.
    DescriptorSegmentBound,
    DsptwNotPresent,
    SdwNotPresent,
    /// The offset is beyond the end of the segment.
    SegmentBound,
    PtwNotPresent,
    Memory(MemoryOpFailure),
}

impl LookupFailure {
    /// The numeric failure code used by the simulator's debugger
    /// commands (memory failures have none).
    pub fn code(&self) -> Option<u8> {
        match self {
            LookupFailure::DescriptorSegmentBound => Some(1),
            LookupFailure::DsptwNotPresent => Some(2),
            LookupFailure::SdwNotPresent => Some(3),
            LookupFailure::SegmentBound => Some(4),
            LookupFailure::PtwNotPresent => Some(5),
            LookupFailure::Memory(_) => None,
        }
    }
}

impl Display for LookupFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::DescriptorSegmentBound => {
                f.write_str("segment number is outside the descriptor segment")
            }
            LookupFailure::DsptwNotPresent => {
                f.write_str("descriptor segment page is not present")
            }
            LookupFailure::SdwNotPresent => f.write_str("segment is not present"),
            LookupFailure::SegmentBound => f.write_str("offset is outside the segment"),
            LookupFailure::PtwNotPresent => f.write_str("page is not present"),
            LookupFailure::Memory(e) => write!(f, "{e}"),
        }
    }
}

impl Error for LookupFailure {}

impl From<MemoryOpFailure> for LookupFailure {
    fn from(e: MemoryOpFailure) -> LookupFailure {
        LookupFailure::Memory(e)
    }
}

impl AppendingUnit {
    /// Translate `segno|offset` for a debugger.  Neither the
    /// registers, the associative memories nor any descriptor in
    /// memory are changed, and no ring checks are made.
    pub fn lookup_address<M: PhysicalMemory>(
        &self,
        mem: &mut M,
        segno: Unsigned15Bit,
        offset: Unsigned18Bit,
    ) -> Result<Unsigned24Bit, LookupFailure> {
        let dsbr = &self.regs.dsbr;
        if walker::dsbr_bound_violated(dsbr, segno) {
            return Err(LookupFailure::DescriptorSegmentBound);
        }
        let sdw = if dsbr.u {
            walker::fetch_nsdw(mem, dsbr, segno)?
        } else {
            let dsptw = walker::fetch_dsptw(mem, dsbr, segno)?;
            if !dsptw.ptw.df {
                return Err(LookupFailure::DsptwNotPresent);
            }
            walker::fetch_psdw(mem, &dsptw.ptw, segno)?
        };
        if !sdw.df {
            return Err(LookupFailure::SdwNotPresent);
        }
        if block_number(offset) > u32::from(sdw.bound) {
            return Err(LookupFailure::SegmentBound);
        }
        let t = if sdw.unpaged {
            compose::unpaged(&sdw, offset)
        } else {
            let ptw = walker::fetch_ptw(mem, &sdw, offset)?;
            if !ptw.ptw.df {
                return Err(LookupFailure::PtwNotPresent);
            }
            compose::paged(&ptw.ptw, offset)
        };
        event!(
            Level::TRACE,
            "lookup {:05o}|{:06o} -> {:08o}",
            segno,
            offset,
            t.final_address
        );
        Ok(t.final_address)
    }
}
