use tracing::{event, Level};

use base::instruction::TagModifier;
use base::pointer::IndirectPair;
use base::prelude::*;

use crate::appending::{AppendingUnit, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{check_read_access, check_ring_order};

impl AppendingUnit {
    /// Fetch an indirect word (or word pair) at `TPR.TSR|TPR.CA`.
    ///
    /// When the instruction's tag calls for indirection through an
    /// even/odd pair which turns out to be an ITS or ITP pointer,
    /// the effective ring `TPR.TRR` is raised to the highest of its
    /// current value, the ring in the pointer and `R1` of the segment
    /// the pointer was read from.
    pub fn indirect_word_fetch<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        let previous = self.start_cycle(ProcessorCycle::IndirectWordFetch);
        let nomatch = self.nomatch(inst);
        self.get_sdw(mem, nomatch, PresenceCheck::Enforced)?;
        check_ring_order(&self.sdw, &mut self.acvs);
        self.warn_if_after_rtcd(previous);
        check_read_access(
            &mut self.regs.tpr,
            &self.regs.ppr,
            &self.sdw,
            &mut self.acvs,
        );
        self.finish_checks("indirect word fetch")?;
        let t = self.translate(
            mem,
            inst,
            nomatch,
            PageAccess::Read,
            PresenceCheck::Enforced,
        )?;
        self.read_final(mem, t.final_address, data)?;

        let pair_indirect = matches!(inst.tag_modifier(), TagModifier::IR | TagModifier::RI);
        let even_address = u32::from(self.regs.tpr.ca) % 2 == 0;
        if pair_indirect && even_address {
            if let [even, odd, ..] = *data {
                self.raise_ring_for_pointer(even, odd);
            }
        }
        Ok(t.final_address)
    }

    fn raise_ring_for_pointer(&mut self, even: Unsigned36Bit, odd: Unsigned36Bit) {
        let pointer_ring = match IndirectPair::decode(even, odd) {
            Some(IndirectPair::Its(its)) => its.ring,
            Some(IndirectPair::Itp(itp)) => self.regs.pr[usize::from(itp.prnum)].rnr,
            None => return,
        };
        let trr = pointer_ring.max(self.regs.tpr.trr).max(self.rsdwh_r1);
        event!(
            Level::TRACE,
            "indirect pointer: TRR {} -> {}",
            self.regs.tpr.trr,
            trr
        );
        self.regs.tpr.trr = trr;
    }
}
