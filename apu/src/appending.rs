//! Emulates the appending unit of the DPS8/M.
//!
//! The appending unit turns a segmented address held in the TPR
//! (segment number, effective ring and word offset) into an absolute
//! main memory address.  Within this emulator it performs the
//! following functions:
//!
//! - Fetch segment descriptors, through the SDWAM or by walking the
//!   descriptor segment
//! - Check ring brackets and access rights, accumulating access
//!   violations
//! - Check the segment bound
//! - Fetch page table words, through the PTWAM or from memory
//! - Compose the final address and perform the memory access
//! - Update the PPR and pointer registers after transfers
//!
//! Each kind of memory cycle has its own driver (see the `cycle_*`
//! modules).  The drivers follow the steps of the hardware
//! flowchart, whose sheets are named by letter (A through N); the
//! shared steps live in this file.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::compose::{self, Translation};
use crate::config::ApuConfig;
use crate::fault::{AccessViolation, AccessViolations, Fault};
use crate::memory::{MemoryOpFailure, PhysicalMemory};
use crate::protection::check_bound;
use crate::registers::{Dsbr, Registers};
use crate::ucache::{MicroCache, UcacheHit, UcacheStats};
use crate::walker::{self, FetchedPtw};
use crate::wam::{Ptwam, PtwamKey, Sdwam};

mod cycle_absa;
mod cycle_apu_data;
mod cycle_indirect;
mod cycle_instruction;
mod cycle_operand_read;
mod cycle_operand_write;
mod cycle_rtcd;
mod lookup;

pub use lookup::LookupFailure;


/// The kinds of memory cycle the appending unit performs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessorCycle {
    /// No cycle has been performed since the unit was created.
    #[default]
    Unknown,
    InstructionFetch,
    OperandRead,
    OperandStore,
    OperandRmw,
    IndirectWordFetch,
    RtcdOperandFetch,
    Absa,
    ApuDataRead,
    ApuDataRmw,
}

impl Display for ProcessorCycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessorCycle::Unknown => "UNKNOWN_CYCLE",
            ProcessorCycle::InstructionFetch => "INSTRUCTION_FETCH",
            ProcessorCycle::OperandRead => "OPERAND_READ",
            ProcessorCycle::OperandStore => "OPERAND_STORE",
            ProcessorCycle::OperandRmw => "OPERAND_RMW",
            ProcessorCycle::IndirectWordFetch => "INDIRECT_WORD_FETCH",
            ProcessorCycle::RtcdOperandFetch => "RTCD_OPERAND_FETCH",
            ProcessorCycle::Absa => "ABSA_CYCLE",
            ProcessorCycle::ApuDataRead => "APU_DATA_READ",
            ProcessorCycle::ApuDataRmw => "APU_DATA_RMW",
        })
    }
}

/// The appending unit status bits which the control unit exposes
/// (in hardware, bits 24-32 of the APU history word).  Only the most
/// recent step of the most recent cycle is remembered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ApuStatus {
    #[default]
    Idle,
    /// Instruction fetch append cycle.
    PiAp,
    /// Fetch descriptor segment PTW.
    Dsptw,
    /// Modify (mark used) descriptor segment PTW.
    Mdsptw,
    /// Fetch SDW, non-paged descriptor segment.
    Sdwnp,
    /// Fetch SDW, paged descriptor segment.
    Sdwp,
    /// Fetch PTW.
    Ptw,
    /// Modify (mark modified) PTW.
    Mptw,
    /// Fetch prepage PTW.
    Ptw2,
    /// Fetch final address, paged.
    Fap,
    /// Fetch final address, non-paged.
    Fanp,
    /// Fetch final address, absolute.
    Fabs,
}

impl ApuStatus {
    /// The status bit as it appears in the history word.  The
    /// "modify" statuses share a bit with the corresponding fetch.
    pub const fn bits(&self) -> u64 {
        let bit = match self {
            ApuStatus::Idle => return 0,
            ApuStatus::PiAp => 24,
            ApuStatus::Dsptw | ApuStatus::Mdsptw => 25,
            ApuStatus::Sdwnp => 26,
            ApuStatus::Sdwp => 27,
            ApuStatus::Ptw | ApuStatus::Mptw => 28,
            ApuStatus::Ptw2 => 29,
            ApuStatus::Fap => 30,
            ApuStatus::Fanp => 31,
            ApuStatus::Fabs => 32,
        };
        1 << (35 - bit)
    }
}

/// Whether sheet A (and the paging step) should raise a directed
/// fault for a descriptor which is marked not present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PresenceCheck {
    Enforced,
    /// ABSA computes the address without faulting on a missing
    /// segment or page.
    Ignored,
}

/// What the PTW step should do to the page table word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageAccess {
    Read,
    /// Mark the page modified if it is not already.
    Write,
}

/// The state of the appending unit of one processor.
#[derive(Debug, Clone)]
pub struct AppendingUnit {
    config: ApuConfig,
    regs: Registers,
    sdwam: Sdwam,
    ptwam: Ptwam,
    ucache: MicroCache,
    /// Access violations found so far in the current cycle.
    acvs: AccessViolations,
    /// R1 of the segment most recently translated.
    rsdwh_r1: Unsigned3Bit,
    last_cycle: ProcessorCycle,
    sdw: SegmentDescriptor,
    ptw: Option<FetchedPtw>,
    dsptw: Option<FetchedPtw>,
    ptw2: Option<FetchedPtw>,
    status: ApuStatus,
}

impl Default for AppendingUnit {
    fn default() -> AppendingUnit {
        AppendingUnit::new(ApuConfig::default())
    }
}

impl AppendingUnit {
    #[must_use]
    pub fn new(config: ApuConfig) -> AppendingUnit {
        let size = config.model.associative_memory_size();
        AppendingUnit {
            config,
            regs: Registers::default(),
            sdwam: Sdwam::new(size),
            ptwam: Ptwam::new(size),
            ucache: MicroCache::new(),
            acvs: AccessViolations::NONE,
            rsdwh_r1: Unsigned3Bit::ZERO,
            last_cycle: ProcessorCycle::default(),
            sdw: SegmentDescriptor::default(),
            ptw: None,
            dsptw: None,
            ptw2: None,
            status: ApuStatus::default(),
        }
    }

    pub fn config(&self) -> &ApuConfig {
        &self.config
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn sdwam(&self) -> &Sdwam {
        &self.sdwam
    }

    pub fn ptwam(&self) -> &Ptwam {
        &self.ptwam
    }

    pub fn status(&self) -> ApuStatus {
        self.status
    }

    pub fn last_cycle(&self) -> ProcessorCycle {
        self.last_cycle
    }

    /// The `R1` ring of the segment most recently translated.
    pub fn rsdwh_r1(&self) -> Unsigned3Bit {
        self.rsdwh_r1
    }

    /// The access violations accumulated by the most recent cycle.
    pub fn access_violations(&self) -> AccessViolations {
        self.acvs
    }

    /// The SDW used by the most recent slow-path translation.
    pub fn current_sdw(&self) -> &SegmentDescriptor {
        &self.sdw
    }

    pub fn current_ptw(&self) -> Option<&PageTableWord> {
        self.ptw.as_ref().map(|f| &f.ptw)
    }

    pub fn current_dsptw(&self) -> Option<&PageTableWord> {
        self.dsptw.as_ref().map(|f| &f.ptw)
    }

    /// The PTW of the following page, fetched for an uninterruptible
    /// EIS instruction.
    pub fn prepage_ptw(&self) -> Option<&PageTableWord> {
        self.ptw2.as_ref().map(|f| &f.ptw)
    }

    pub fn ucache_stats(&self) -> UcacheStats {
        self.ucache.stats()
    }

    /// Returns true when the associative memories must not be
    /// searched while preparing addresses for `inst`.
    pub fn nomatch(&self, inst: &Instruction) -> bool {
        !self.config.enable_wam || inst.forces_associative_memory_miss()
    }

    /// Implements LDBR: load the DSBR from a Y-pair and empty both
    /// associative memories.
    pub fn load_dsbr(&mut self, y_pair: &[Unsigned36Bit; 2]) {
        self.regs.dsbr = Dsbr::from_pair(y_pair[0], y_pair[1]);
        event!(
            Level::DEBUG,
            "LDBR: ADDR {:08o} BND {:05o} U {} STACK {:04o}",
            self.regs.dsbr.addr,
            self.regs.dsbr.bnd,
            self.regs.dsbr.u,
            self.regs.dsbr.stack,
        );
        self.sdwam.clear();
        self.ptwam.clear();
        self.ucache.invalidate();
    }

    /// Implements SDBR: the Y-pair image of the DSBR.
    pub fn store_dsbr(&self) -> [Unsigned36Bit; 2] {
        let (even, odd) = self.regs.dsbr.to_pair();
        [even, odd]
    }

    /// Implements CAMS (clear the SDWAM).
    pub fn clear_sdwam(&mut self) {
        event!(Level::DEBUG, "clearing the SDWAM");
        self.sdwam.clear();
        self.ucache.invalidate();
    }

    /// Implements CAMP (clear the PTWAM).
    pub fn clear_ptwam(&mut self) {
        event!(Level::DEBUG, "clearing the PTWAM");
        self.ptwam.clear();
        self.ucache.invalidate();
    }

    /// Common start of every cycle.  Returns the kind of the
    /// previous cycle.
    fn start_cycle(&mut self, cycle: ProcessorCycle) -> ProcessorCycle {
        event!(
            Level::TRACE,
            "{} START: TSR {:05o} TRR {} CA {:06o}",
            cycle,
            self.regs.tpr.tsr,
            self.regs.tpr.trr,
            self.regs.tpr.ca,
        );
        self.acvs = AccessViolations::NONE;
        self.rsdwh_r1 = Unsigned3Bit::ZERO;
        self.ptw = None;
        self.ptw2 = None;
        std::mem::replace(&mut self.last_cycle, cycle)
    }

    fn warn_if_after_rtcd(&self, previous: ProcessorCycle) {
        if previous == ProcessorCycle::RtcdOperandFetch {
            event!(
                Level::WARN,
                "{} follows {}",
                self.last_cycle,
                ProcessorCycle::RtcdOperandFetch
            );
        }
    }

    fn directed_fault(&self, fc: Unsigned2Bit, diagnostic: &'static str) -> Fault {
        let fault = Fault::Directed { fc, diagnostic };
        event!(Level::DEBUG, "{} cycle raises {}", self.last_cycle, fault);
        fault
    }

    fn access_violation(&self, diagnostic: &'static str) -> Fault {
        let fault = Fault::AccessViolation {
            violations: self.acvs,
            diagnostic,
        };
        event!(Level::DEBUG, "{} cycle raises {}", self.last_cycle, fault);
        fault
    }

    /// Sheet A: obtain the SDW of segment `TPR.TSR`.
    fn get_sdw<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        nomatch: bool,
        presence: PresenceCheck,
    ) -> Result<(), Fault> {
        let segno = self.regs.tpr.tsr;
        let cached = if nomatch {
            None
        } else {
            self.sdwam.lookup(&segno)
        };
        if let Some(sdw) = cached {
            event!(Level::TRACE, "A: SDWAM hit for segment {:05o}", segno);
            self.sdw = sdw;
        } else {
            event!(
                Level::TRACE,
                "A: no SDWAM match for segment {:05o} (nomatch {})",
                segno,
                nomatch
            );
            if walker::dsbr_bound_violated(&self.regs.dsbr, segno) {
                self.acvs.set(AccessViolation::OOSB);
                return Err(self.access_violation("segment number beyond the descriptor segment"));
            }
            let sdw = if self.regs.dsbr.u {
                self.status = ApuStatus::Sdwnp;
                walker::fetch_nsdw(mem, &self.regs.dsbr, segno)?
            } else {
                self.status = ApuStatus::Dsptw;
                let mut dsptw = walker::fetch_dsptw(mem, &self.regs.dsbr, segno)?;
                if !dsptw.ptw.df {
                    self.dsptw = Some(dsptw);
                    return Err(self.directed_fault(dsptw.ptw.fc, "DSPTW not present"));
                }
                if !dsptw.ptw.used {
                    self.status = ApuStatus::Mdsptw;
                    walker::modify_dsptw(mem, &mut dsptw)?;
                }
                self.dsptw = Some(dsptw);
                self.status = ApuStatus::Sdwp;
                walker::fetch_psdw(mem, &dsptw.ptw, segno)?
            };
            self.sdw = sdw;
            if presence == PresenceCheck::Enforced && !sdw.df {
                return Err(self.directed_fault(sdw.fc, "SDW not present"));
            }
            self.sdwam.load(segno, sdw);
        }
        self.rsdwh_r1 = self.sdw.r1;
        Ok(())
    }

    /// Sheet G: check the bound and raise any access violation found
    /// so far.
    fn finish_checks(&mut self, diagnostic: &'static str) -> Result<(), Fault> {
        check_bound(self.regs.tpr.ca, self.sdw.bound, &mut self.acvs);
        if self.acvs.is_empty() {
            Ok(())
        } else {
            Err(self.access_violation(diagnostic))
        }
    }

    /// Sheets G (paging part), H and I: find the final address of
    /// `TPR.CA`.
    fn translate<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        nomatch: bool,
        access: PageAccess,
        presence: PresenceCheck,
    ) -> Result<Translation, Fault> {
        let ca = self.regs.tpr.ca;
        if self.sdw.unpaged {
            // H
            self.status = ApuStatus::Fanp;
            let t = compose::unpaged(&self.sdw, ca);
            event!(Level::TRACE, "H: final address {:08o}", t.final_address);
            return Ok(t);
        }

        let key = PtwamKey::new(self.regs.tpr.tsr, ca);
        let cached = if nomatch {
            None
        } else {
            self.ptwam.lookup(&key)
        };
        let mut fetched = match cached {
            Some(ptw) => {
                event!(Level::TRACE, "G: PTWAM hit");
                FetchedPtw {
                    ptw,
                    location: walker::ptw_location(&self.sdw, u32::from(ca) / PAGE_SIZE),
                }
            }
            None => {
                self.status = ApuStatus::Ptw;
                let fetched = walker::fetch_ptw(mem, &self.sdw, ca)?;
                if presence == PresenceCheck::Enforced && !fetched.ptw.df {
                    self.ptw = Some(fetched);
                    return Err(self.directed_fault(fetched.ptw.fc, "PTW not present"));
                }
                self.ptwam.load(key, fetched.ptw);
                fetched
            }
        };

        if inst.is_uninterruptible_eis() {
            self.prepage(mem)?;
        }

        // I
        if access == PageAccess::Write && !fetched.ptw.modified {
            self.status = ApuStatus::Mptw;
            walker::modify_ptw(mem, &mut fetched)?;
            self.ptwam.load(key, fetched.ptw);
        }
        self.ptw = Some(fetched);
        self.status = ApuStatus::Fap;
        let t = compose::paged(&fetched.ptw, ca);
        event!(Level::TRACE, "I: final address {:08o}", t.final_address);
        Ok(t)
    }

    /// Fetch the PTW of the page after the one holding `TPR.CA`, so
    /// that an EIS instruction which runs onto that page cannot take
    /// a page fault after it has started to change memory.
    fn prepage<M: PhysicalMemory>(&mut self, mem: &mut M) -> Result<(), Fault> {
        let next_page = u32::from(self.regs.tpr.ca) / PAGE_SIZE + 1;
        if next_page * (PAGE_SIZE >> 4) > u32::from(self.sdw.bound) {
            // The segment ends on this page.
            return Ok(());
        }
        self.status = ApuStatus::Ptw2;
        let ptw2 = walker::fetch_ptw_for_page(mem, &self.sdw, next_page)?;
        self.ptw2 = Some(ptw2);
        if !ptw2.ptw.df {
            return Err(self.directed_fault(ptw2.ptw.fc, "prepage PTW not present"));
        }
        Ok(())
    }

    /// The entry which the micro-translation cache should remember
    /// for the translation just made.
    fn ucache_entry(&self, t: &Translation) -> UcacheHit {
        UcacheHit {
            bound: self.sdw.bound,
            p: self.sdw.privileged,
            page_address: t.page_address,
            r1: self.sdw.r1,
            paged: t.paged,
        }
    }

    /// Sheet HI: the address has been prepared; read the operand.
    fn read_final<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        address: Unsigned24Bit,
        data: &mut [Unsigned36Bit],
    ) -> Result<(), MemoryOpFailure> {
        self.regs.xsf = true;
        event!(
            Level::TRACE,
            "HI: reading {} word(s) at {:08o}",
            data.len(),
            address
        );
        mem.read_words(address, data)
    }

    /// Sheet M: set `PPR.P` for the procedure just entered.
    fn set_privilege(&mut self, p: bool) {
        self.regs.ppr.p = self.regs.tpr.trr.is_zero() && p;
        event!(Level::TRACE, "M: PPR.P {}", self.regs.ppr.p);
    }
}
