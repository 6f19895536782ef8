use tracing::{event, Level};

use base::prelude::*;

use crate::appending::{AppendingUnit, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{check_read_access, check_ring_order, check_write_access};

/// ## Operand store and read-modify-write
///
/// - [`AppendingUnit::operand_store`]
/// - [`AppendingUnit::operand_store_zone`]
/// - [`AppendingUnit::operand_rmw`]
///
/// Neither uses the micro-translation cache.  Both mark the page
/// modified.
impl AppendingUnit {
    /// Prepare the address of a store to `TPR.TSR|TPR.CA`.
    fn prepare_store<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
    ) -> Result<Unsigned24Bit, Fault> {
        let previous = self.start_cycle(ProcessorCycle::OperandStore);
        let nomatch = self.nomatch(inst);
        self.get_sdw(mem, nomatch, PresenceCheck::Enforced)?;
        check_ring_order(&self.sdw, &mut self.acvs);
        self.warn_if_after_rtcd(previous);
        event!(Level::TRACE, "B: write access");
        check_write_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        self.finish_checks("operand store")?;
        let t = self.translate(
            mem,
            inst,
            nomatch,
            PageAccess::Write,
            PresenceCheck::Enforced,
        )?;
        self.regs.xsf = true;
        Ok(t.final_address)
    }

    /// Store `data` at `TPR.TSR|TPR.CA`.
    pub fn operand_store<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &[Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        let address = self.prepare_store(mem, inst)?;
        event!(
            Level::TRACE,
            "HI: writing {} word(s) at {:08o}",
            data.len(),
            address
        );
        mem.write_words(address, data)?;
        Ok(address)
    }

    /// Store those bits of `value` selected by `zone` at
    /// `TPR.TSR|TPR.CA`, leaving the other bits of the word alone.
    pub fn operand_store_zone<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        value: Unsigned36Bit,
        zone: Unsigned36Bit,
    ) -> Result<Unsigned24Bit, Fault> {
        let address = self.prepare_store(mem, inst)?;
        event!(
            Level::TRACE,
            "HI: zone store at {:08o}, zone {:012o}",
            address,
            zone
        );
        mem.write_zone(address, value, zone)?;
        Ok(address)
    }

    /// The read half of a read-modify-write.  The caller completes
    /// the cycle with [`AppendingUnit::operand_store`].
    pub fn operand_rmw<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        self.rmw_cycle(mem, inst, data, ProcessorCycle::OperandRmw)
    }

    pub(super) fn rmw_cycle<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
        cycle: ProcessorCycle,
    ) -> Result<Unsigned24Bit, Fault> {
        let previous = self.start_cycle(cycle);
        let nomatch = self.nomatch(inst);
        self.get_sdw(mem, nomatch, PresenceCheck::Enforced)?;
        check_ring_order(&self.sdw, &mut self.acvs);
        self.warn_if_after_rtcd(previous);
        event!(Level::TRACE, "B: read and write access");
        check_read_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        check_write_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        self.finish_checks("read-modify-write")?;
        let t = self.translate(
            mem,
            inst,
            nomatch,
            PageAccess::Write,
            PresenceCheck::Enforced,
        )?;
        let address = t.final_address;
        self.regs.xsf = true;
        if data.len() == 1 {
            event!(Level::TRACE, "HI: locked read at {:08o}", address);
            data[0] = mem.read_locked(address)?;
        } else {
            event!(
                Level::WARN,
                "{} of {} words at {:08o}; reading without a lock",
                cycle,
                data.len(),
                address
            );
            mem.read_words(address, data)?;
        }
        Ok(address)
    }
}
