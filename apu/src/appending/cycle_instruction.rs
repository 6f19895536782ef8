use tracing::{event, span, Level};

use base::prelude::*;

use crate::appending::{AppendingUnit, ApuStatus, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{
    check_execute_access, check_ring_alarm, check_ring_order, check_rtcd_return,
};
use crate::ucache::{instruction_fetch_eligibility, UcacheClass};

/// ## Instruction fetch
///
/// - [`AppendingUnit::instruction_fetch`]
impl AppendingUnit {
    /// Fetch `data.len()` instruction words at `TPR.TSR|TPR.CA`, and
    /// make that location the current procedure location (`PPR.PSR`
    /// and `PPR.IC`).  `inst` is the instruction being executed,
    /// which is RTCD when this fetch completes an RTCD transfer.
    pub fn instruction_fetch<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        let span = span!(Level::INFO,
                         "fetch",
                         tsr=?self.regs.tpr.tsr,
                         ca=?self.regs.tpr.ca);
        let _enter = span.enter();
        let previous = self.start_cycle(ProcessorCycle::InstructionFetch);
        self.status = ApuStatus::PiAp;
        let nomatch = self.nomatch(inst);
        let class = UcacheClass::InstructionFetch;
        let tsr = self.regs.tpr.tsr;
        let ca = self.regs.tpr.ca;

        let eligible = match instruction_fetch_eligibility(inst, self.regs.ralr) {
            Ok(()) => true,
            Err(why) => {
                self.ucache.note_skip(class, why);
                false
            }
        };
        let cached = if eligible {
            self.ucache.check(class, tsr, ca)
        } else {
            None
        };

        let (address, p) = match cached {
            Some(hit) => {
                self.rsdwh_r1 = hit.r1;
                (hit.translate(ca).final_address, hit.p)
            }
            None => {
                self.get_sdw(mem, nomatch, PresenceCheck::Enforced)?;
                check_ring_order(&self.sdw, &mut self.acvs);
                if inst.is_rtcd() {
                    event!(Level::TRACE, "C: return from RTCD");
                    check_rtcd_return(&self.regs.tpr, &self.regs.ppr, &self.sdw, &mut self.acvs);
                } else {
                    self.warn_if_after_rtcd(previous);
                    event!(Level::TRACE, "F: execute access");
                    check_execute_access(
                        &self.regs.tpr,
                        &self.regs.ppr,
                        &self.sdw,
                        &mut self.acvs,
                    );
                }
                event!(Level::TRACE, "D: ring alarm");
                check_ring_alarm(&self.regs.ppr, self.regs.ralr, &mut self.acvs);
                self.finish_checks("instruction fetch")?;
                let t = self.translate(
                    mem,
                    inst,
                    nomatch,
                    PageAccess::Read,
                    PresenceCheck::Enforced,
                )?;
                if eligible {
                    let entry = self.ucache_entry(&t);
                    self.ucache.save(class, tsr, ca, entry);
                }
                (t.final_address, self.sdw.privileged)
            }
        };

        self.read_final(mem, address, data)?;

        if inst.is_rtcd() {
            let trr = self.regs.tpr.trr;
            for pr in self.regs.pr.iter_mut() {
                pr.rnr = trr;
            }
        }
        // KL
        self.regs.ppr.psr = self.regs.tpr.tsr;
        self.regs.ppr.ic = self.regs.tpr.ca;
        self.set_privilege(p);
        Ok(address)
    }
}
