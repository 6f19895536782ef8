use tracing::{event, span, Level};

use base::prelude::*;

use crate::appending::{AppendingUnit, PageAccess, PresenceCheck, ProcessorCycle};
use crate::fault::Fault;
use crate::memory::PhysicalMemory;
use crate::protection::{
    check_call_gate, check_execute_access, check_read_access, check_ring_alarm,
    check_ring_order,
};
use crate::registers::AddressingMode;
use crate::ucache::{operand_read_eligibility, UcacheClass};

/// ## Operand read
///
/// - [`AppendingUnit::operand_read`]
///
/// For most instructions this is a plain read.  The operand of a
/// transfer is the target of the transfer, so the checks are those
/// of an instruction fetch and the PPR is updated afterwards; CALL6
/// additionally goes through the gate checks and sets up PR7.
impl AppendingUnit {
    pub fn operand_read<M: PhysicalMemory>(
        &mut self,
        mem: &mut M,
        inst: &Instruction,
        data: &mut [Unsigned36Bit],
    ) -> Result<Unsigned24Bit, Fault> {
        let span = span!(Level::INFO,
                         "read",
                         tsr=?self.regs.tpr.tsr,
                         ca=?self.regs.tpr.ca);
        let _enter = span.enter();
        let previous = self.start_cycle(ProcessorCycle::OperandRead);
        let nomatch = self.nomatch(inst);
        let class = UcacheClass::for_operand_read(inst);
        let tsr = self.regs.tpr.tsr;
        let ca = self.regs.tpr.ca;

        let eligible = match operand_read_eligibility(inst, self.regs.ppr.prr, self.regs.ralr) {
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
                self.warn_if_after_rtcd(previous);
                if inst.is_call6() {
                    event!(Level::TRACE, "E: CALL6");
                    let absolute = self.regs.is_absolute_mode();
                    check_call_gate(
                        &mut self.regs.tpr,
                        &self.regs.ppr,
                        &self.sdw,
                        absolute,
                        &mut self.acvs,
                    );
                } else if inst.is_transfer() {
                    event!(Level::TRACE, "F: transfer");
                    check_execute_access(
                        &self.regs.tpr,
                        &self.regs.ppr,
                        &self.sdw,
                        &mut self.acvs,
                    );
                    event!(Level::TRACE, "D: ring alarm");
                    check_ring_alarm(&self.regs.ppr, self.regs.ralr, &mut self.acvs);
                } else {
                    event!(Level::TRACE, "B: read access");
                    check_read_access(
                        &mut self.regs.tpr,
                        &self.regs.ppr,
                        &self.sdw,
                        &mut self.acvs,
                    );
                }
                self.finish_checks("operand read")?;
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

        if inst.is_call6() {
            self.enter_called_procedure();
            self.set_privilege(p);
        } else if inst.is_transfer() {
            self.save_return_pointer(inst);
            // KL
            self.regs.ppr.psr = self.regs.tpr.tsr;
            self.regs.ppr.ic = self.regs.tpr.ca;
            self.set_privilege(p);
        }
        Ok(address)
    }

    /// Sheet N: CALL6 points PR7 at the base of the stack frame of
    /// the ring being entered, then transfers.
    fn enter_called_procedure(&mut self) {
        let trr = self.regs.tpr.trr;
        let snr = if trr == self.regs.ppr.prr {
            self.regs.pr[6].snr
        } else {
            // The stack segment of ring n is (DSBR.STACK << 3) | n.
            Unsigned15Bit::truncating(
                (u64::from(self.regs.dsbr.stack) << 3) | u64::from(trr),
            )
        };
        let pr7 = &mut self.regs.pr[7];
        pr7.snr = snr;
        pr7.rnr = trr;
        pr7.wordno = Unsigned18Bit::ZERO;
        pr7.bitno = Unsigned6Bit::ZERO;
        event!(Level::TRACE, "N: PR7 {:05o}|0 ring {}", snr, trr);
        self.regs.ppr.prr = trr;
        self.regs.ppr.psr = self.regs.tpr.tsr;
        self.regs.ppr.ic = self.regs.tpr.ca;
    }

    /// Sheet L: TSPn saves the return point in PRn.
    fn save_return_pointer(&mut self, inst: &Instruction) {
        if !inst.is_tspn() {
            return;
        }
        let n = usize::from(inst.tspn_register());
        let prr = self.regs.ppr.prr;
        let psr = self.regs.ppr.psr;
        let return_to = self.regs.ppr.ic.wrapping_add(Unsigned18Bit::ONE);
        let append_mode = self.regs.mode == AddressingMode::Append;
        let pr = &mut self.regs.pr[n];
        pr.rnr = prr;
        if append_mode {
            pr.snr = psr;
        }
        pr.wordno = return_to;
        pr.bitno = Unsigned6Bit::ZERO;
        event!(Level::TRACE, "L: PR{} := {:05o}|{:06o}", n, pr.snr, pr.wordno);
    }
}
