use tracing::{event, Level};

use base::prelude::*;

use crate::appending::{AppendingUnit, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{check_read_access, check_ring_order};

impl AppendingUnit {
    /// Implements the address preparation of ABSA: compute the
    /// absolute address of `TPR.TSR|TPR.CA` without reading it.
    ///
    /// A segment or page which is marked not present is not
    /// faulted; the address is computed from the descriptor as it
    /// stands.  A missing page of a paged descriptor segment is
    /// still a directed fault.
    pub fn absa<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
    ) -> Result<Unsigned24Bit, Fault> {
        let previous = self.start_cycle(ProcessorCycle::Absa);
        let nomatch = self.nomatch(inst);
        self.get_sdw(mem, nomatch, PresenceCheck::Ignored)?;
        check_ring_order(&self.sdw, &mut self.acvs);
        self.warn_if_after_rtcd(previous);
        check_read_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        self.finish_checks("ABSA")?;
        let t = self.translate(
            mem,
            inst,
            nomatch,
            PageAccess::Read,
            PresenceCheck::Ignored,
        )?;
        event!(Level::TRACE, "ABSA: {:08o}", t.final_address);
        Ok(t.final_address)
    }
}
