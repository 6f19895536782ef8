use tracing::{event, Level};

use base::prelude::*;

use crate::appending::{AppendingUnit, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{check_read_access, check_ring_order};

/// ## APU data cycles
///
/// - [`AppendingUnit::apu_data_read`]
/// - [`AppendingUnit::apu_data_rmw`]
///
/// These are the operand cycles used by the appending unit's own
/// microcode (for example while fetching descriptors on behalf of an
/// instruction).  They never take the transfer or CALL6 branches and
/// never use the micro-translation cache.
impl AppendingUnit {
    pub fn apu_data_read<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        let previous = self.start_cycle(ProcessorCycle::ApuDataRead);
        let nomatch = self.nomatch(inst);
        self.get_sdw(mem, nomatch, PresenceCheck::Enforced)?;
        check_ring_order(&self.sdw, &mut self.acvs);
        self.warn_if_after_rtcd(previous);
        event!(Level::TRACE, "B: read access");
        check_read_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        self.finish_checks("APU data read")?;
        let t = self.translate(
            mem,
            inst,
            nomatch,
            PageAccess::Read,
            PresenceCheck::Enforced,
        )?;
        self.read_final(mem, t.final_address, data)?;
        Ok(t.final_address)
    }

    pub fn apu_data_rmw<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        self.rmw_cycle(mem, inst, data, ProcessorCycle::ApuDataRmw)
    }
}
