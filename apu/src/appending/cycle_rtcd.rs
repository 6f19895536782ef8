use tracing::{event, Level};

use base::prelude::*;
use base::pointer::ItsPointer;

use crate::appending::{AppendingUnit, ApuStatus, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{check_read_access, check_ring_order};

impl AppendingUnit {
    /// Fetch the ITS pair which is the operand of RTCD, and make the
    /// location it points to the next procedure location.
    ///
    /// In absolute mode, before anything has gone through the
    /// appending unit (XSF clear) and with bit 29 of the instruction
    /// clear, the operand is taken from segment 0 and its offset is
    /// used as an absolute address.  `ApuConfig::rtcd_direct_addressing`
    /// turns this off.
    pub fn rtcd_operand_fetch<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit; 2],
    ) -> Result<Unsigned24Bit, Fault> {
        let previous = self.start_cycle(ProcessorCycle::RtcdOperandFetch);
        let nomatch = self.nomatch(inst);
        let direct = self.config.rtcd_direct_addressing
            && self.regs.is_absolute_mode()
            && !(self.regs.xsf || inst.b29());
        if direct {
            self.regs.tpr.tsr = Unsigned15Bit::ZERO;
        }

        self.get_sdw(mem, nomatch, PresenceCheck::Enforced)?;
        check_ring_order(&self.sdw, &mut self.acvs);
        self.warn_if_after_rtcd(previous);
        check_read_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        self.finish_checks("RTCD operand fetch")?;
        let address = if direct && self.sdw.unpaged {
            self.status = ApuStatus::Fabs;
            let ca = self.regs.tpr.ca;
            event!(Level::TRACE, "H: absolute RTCD operand at {:08o}", ca);
            Unsigned24Bit::from(ca)
        } else {
            self.translate(
                mem,
                inst,
                nomatch,
                PageAccess::Read,
                PresenceCheck::Enforced,
            )?
            .final_address
        };
        self.read_final(mem, address, data)?;

        // K
        let [even, odd] = *data;
        let its = ItsPointer::from_pair(even, odd);
        let trr = its.ring.max(self.regs.tpr.trr).max(self.rsdwh_r1);
        self.regs.tpr.tsr = its.segno;
        self.regs.tpr.trr = trr;
        self.regs.ppr.prr = trr;
        self.regs.tpr.ca = its.wordno;
        event!(
            Level::TRACE,
            "K: returning to {:05o}|{:06o} in ring {}",
            self.regs.tpr.tsr,
            self.regs.tpr.ca,
            trr
        );

        // KL
        self.regs.ppr.psr = self.regs.tpr.tsr;
        self.regs.ppr.ic = self.regs.tpr.ca;
        self.set_privilege(self.sdw.privileged);
        Ok(address)
    }
}
