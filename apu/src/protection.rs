//! Ring-bracket and access checks.
//!
//! Each function here is one of the checking branches of the
//! appending unit's flowchart, named after the sheet on which it
//! appears.  Several of them change `TPR.TRR` as a side effect, and
//! the order in which a cycle applies them matters, so they are kept
//! separate rather than being folded into one predicate.
use tracing::{event, Level};

use base::prelude::*;

use crate::fault::{AccessViolation, AccessViolations};
use crate::registers::{Ppr, Tpr};

fn violation(acvs: &mut AccessViolations, acv: AccessViolation, why: &str) {
    event!(Level::TRACE, "{}: {}", acv, why);
    acvs.set(acv);
}

/// Sheet B: the ring brackets of the descriptor must be in order.
pub fn check_ring_order(sdw: &SegmentDescriptor, acvs: &mut AccessViolations) {
    if !sdw.ring_brackets_ordered() {
        violation(acvs, AccessViolation::IRO, "SDW.R1 <= SDW.R2 <= SDW.R3 does not hold");
    }
}

/// Sheet B, read access (operand reads, the read half of a
/// read-modify-write, indirect words).
pub fn check_read_access(
    tpr: &mut Tpr,
    ppr: &Ppr,
    sdw: &SegmentDescriptor,
    acvs: &mut AccessViolations,
) {
    if tpr.trr > sdw.r2 {
        violation(acvs, AccessViolation::ORB, "TPR.TRR > SDW.R2");
    }
    if !sdw.read {
        tpr.trr = ppr.prr;
        if ppr.psr != tpr.tsr {
            violation(acvs, AccessViolation::ROFF, "SDW.R is off and PPR.PSR != TPR.TSR");
        }
    }
}

/// Sheet B, write access (operand stores, the write half of a
/// read-modify-write).
pub fn check_write_access(
    tpr: &mut Tpr,
    ppr: &Ppr,
    sdw: &SegmentDescriptor,
    acvs: &mut AccessViolations,
) {
    if tpr.tsr == ppr.psr {
        tpr.trr = ppr.prr;
    }
    if tpr.trr > sdw.r1 {
        violation(acvs, AccessViolation::OWB, "TPR.TRR > SDW.R1");
    }
    if !sdw.write {
        tpr.trr = ppr.prr;
        violation(acvs, AccessViolation::WOFF, "SDW.W is off");
    }
}

/// Sheet C: the instruction fetch which follows RTCD.
pub fn check_rtcd_return(
    tpr: &Tpr,
    ppr: &Ppr,
    sdw: &SegmentDescriptor,
    acvs: &mut AccessViolations,
) {
    if tpr.trr < sdw.r1 || tpr.trr > sdw.r2 {
        violation(acvs, AccessViolation::OEB, "TPR.TRR not in [SDW.R1, SDW.R2]");
    }
    if !sdw.execute {
        violation(acvs, AccessViolation::EOFF, "SDW.E is off");
    }
    if tpr.trr > ppr.prr {
        event!(
            Level::WARN,
            "RTCD returns outward: TPR.TRR {} > PPR.PRR {}",
            tpr.trr,
            ppr.prr,
        );
    }
    if tpr.trr < ppr.prr {
        violation(acvs, AccessViolation::INRET, "TPR.TRR < PPR.PRR");
    }
}

/// Sheet D: the ring alarm register catches outbound transfers.
pub fn check_ring_alarm(ppr: &Ppr, ralr: Unsigned3Bit, acvs: &mut AccessViolations) {
    if !ralr.is_zero() && ppr.prr >= ralr {
        violation(acvs, AccessViolation::RALR, "PPR.PRR >= RALR");
    }
}

/// Sheet E and E1: the operand of CALL6.  `TPR.TRR` is lowered to
/// `SDW.R2` for an inward call.
pub fn check_call_gate(
    tpr: &mut Tpr,
    ppr: &Ppr,
    sdw: &SegmentDescriptor,
    absolute_mode: bool,
    acvs: &mut AccessViolations,
) {
    if !sdw.execute {
        violation(acvs, AccessViolation::EOFF, "SDW.E is off");
    }
    let within_segment = ppr.psr == tpr.tsr && !absolute_mode;
    if !sdw.gate && !within_segment && u32::from(tpr.ca) >= u32::from(sdw.eb) {
        violation(acvs, AccessViolation::NOGA, "TPR.CA >= SDW.EB");
    }

    // E1
    if tpr.trr > sdw.r3 {
        violation(acvs, AccessViolation::OCB, "TPR.TRR > SDW.R3");
    }
    if tpr.trr < sdw.r1 {
        violation(acvs, AccessViolation::OCALL, "TPR.TRR < SDW.R1");
    }
    if tpr.trr > ppr.prr && ppr.prr < sdw.r2 {
        violation(
            acvs,
            AccessViolation::BOC,
            "TPR.TRR > PPR.PRR and PPR.PRR < SDW.R2",
        );
    }
    if tpr.trr > sdw.r2 {
        tpr.trr = sdw.r2;
    }
}

/// Sheet F: instruction fetches and transfers.
pub fn check_execute_access(
    tpr: &Tpr,
    ppr: &Ppr,
    sdw: &SegmentDescriptor,
    acvs: &mut AccessViolations,
) {
    if tpr.trr < sdw.r1 || tpr.trr > sdw.r2 {
        violation(acvs, AccessViolation::OEB, "TPR.TRR not in [SDW.R1, SDW.R2]");
    }
    if !sdw.execute {
        violation(acvs, AccessViolation::EOFF, "SDW.E is off");
    }
    if ppr.prr != tpr.trr {
        violation(acvs, AccessViolation::CRT, "PPR.PRR != TPR.TRR");
    }
}

/// Sheet G: the offset must lie within the segment bound.
pub fn check_bound(ca: Unsigned18Bit, bound: Unsigned14Bit, acvs: &mut AccessViolations) {
    if block_number(ca) > u32::from(bound) {
        violation(acvs, AccessViolation::OOSB, "TPR.CA >> 4 > SDW.BOUND");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    fn ring(n: u8) -> Unsigned3Bit {
        Unsigned3Bit::try_from(n).expect("valid test data")
    }

    fn brackets(r1: u8, r2: u8, r3: u8) -> SegmentDescriptor {
        SegmentDescriptor {
            r1: ring(r1),
            r2: ring(r2),
            r3: ring(r3),
            read: true,
            execute: true,
            write: true,
            df: true,
            bound: Unsigned14Bit::MAX,
            ..SegmentDescriptor::default()
        }
    }

    fn tpr(tsr: u16, trr: u8, ca: u32) -> Tpr {
        Tpr {
            tsr: Unsigned15Bit::try_from(tsr).expect("valid test data"),
            trr: ring(trr),
            ca: Unsigned18Bit::try_from(ca).expect("valid test data"),
            ..Tpr::default()
        }
    }

    fn ppr(psr: u16, prr: u8) -> Ppr {
        Ppr {
            psr: Unsigned15Bit::try_from(psr).expect("valid test data"),
            prr: ring(prr),
            ..Ppr::default()
        }
    }

    fn only(acv: AccessViolation) -> AccessViolations {
        AccessViolations::from(acv)
    }

    #[test]
    fn test_ring_order() {
        let mut acvs = AccessViolations::NONE;
        check_ring_order(&brackets(1, 2, 3), &mut acvs);
        assert!(acvs.is_empty());
        check_ring_order(&brackets(2, 1, 3), &mut acvs);
        assert_eq!(acvs, only(AccessViolation::IRO));
    }

    #[test]
    fn test_read_outside_bracket() {
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o100, 3, 0);
        check_read_access(&mut t, &ppr(0o100, 3), &brackets(0, 1, 2), &mut acvs);
        assert_eq!(acvs, only(AccessViolation::ORB));
    }

    #[test]
    fn test_read_permission_off() {
        let sdw = SegmentDescriptor {
            read: false,
            ..brackets(4, 4, 4)
        };
        // Within the executing segment, R off is allowed but TRR
        // becomes PRR.
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o100, 1, 0);
        check_read_access(&mut t, &ppr(0o100, 4), &sdw, &mut acvs);
        assert!(acvs.is_empty());
        assert_eq!(t.trr, 4_u8);
        // From another segment it is a violation.
        let mut t = tpr(0o100, 1, 0);
        check_read_access(&mut t, &ppr(0o200, 4), &sdw, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::ROFF));
    }

    #[test]
    fn test_write_checks() {
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o100, 2, 0);
        check_write_access(&mut t, &ppr(0o200, 1), &brackets(1, 4, 5), &mut acvs);
        assert_eq!(acvs, only(AccessViolation::OWB));

        // Same segment: TRR is replaced by PRR first.
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o100, 2, 0);
        check_write_access(&mut t, &ppr(0o100, 1), &brackets(1, 4, 5), &mut acvs);
        assert!(acvs.is_empty());
        assert_eq!(t.trr, 1_u8);

        let sdw = SegmentDescriptor {
            write: false,
            ..brackets(4, 4, 4)
        };
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o100, 1, 0);
        check_write_access(&mut t, &ppr(0o200, 3), &sdw, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::WOFF));
        assert_eq!(t.trr, 3_u8);
    }

    #[test]
    fn test_rtcd_return() {
        let mut acvs = AccessViolations::NONE;
        check_rtcd_return(&tpr(0, 4, 0), &ppr(0, 4), &brackets(0, 4, 4), &mut acvs);
        assert!(acvs.is_empty());
        // Outward return is allowed (and logged).
        check_rtcd_return(&tpr(0, 4, 0), &ppr(0, 1), &brackets(0, 4, 4), &mut acvs);
        assert!(acvs.is_empty());
        check_rtcd_return(&tpr(0, 1, 0), &ppr(0, 4), &brackets(0, 4, 4), &mut acvs);
        assert_eq!(acvs, only(AccessViolation::INRET));
    }

    #[test]
    fn test_ring_alarm() {
        let mut acvs = AccessViolations::NONE;
        check_ring_alarm(&ppr(0, 7), Unsigned3Bit::ZERO, &mut acvs);
        assert!(acvs.is_empty());
        check_ring_alarm(&ppr(0, 3), ring(4), &mut acvs);
        assert!(acvs.is_empty());
        check_ring_alarm(&ppr(0, 4), ring(4), &mut acvs);
        assert_eq!(acvs, only(AccessViolation::RALR));
    }

    #[test]
    fn test_call_outside_gate() {
        let sdw = SegmentDescriptor {
            gate: false,
            eb: Unsigned14Bit::truncating(0o77),
            ..brackets(0, 4, 5)
        };
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o200, 4, 0o100);
        check_call_gate(&mut t, &ppr(0o100, 4), &sdw, false, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::NOGA));

        // Calls within the same segment need no gate.
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o100, 4, 0o100);
        check_call_gate(&mut t, &ppr(0o100, 4), &sdw, false, &mut acvs);
        assert!(acvs.is_empty());

        // ... except in absolute mode.
        let mut t = tpr(0o100, 4, 0o100);
        check_call_gate(&mut t, &ppr(0o100, 4), &sdw, true, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::NOGA));
    }

    #[test]
    fn test_inward_call_lowers_ring() {
        let sdw = SegmentDescriptor {
            gate: true,
            ..brackets(0, 1, 5)
        };
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o200, 4, 0);
        check_call_gate(&mut t, &ppr(0o100, 4), &sdw, false, &mut acvs);
        assert!(acvs.is_empty());
        assert_eq!(t.trr, 1_u8);
    }

    #[test]
    fn test_bad_calls() {
        let sdw = SegmentDescriptor {
            gate: true,
            ..brackets(2, 3, 4)
        };
        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o200, 5, 0);
        check_call_gate(&mut t, &ppr(0o100, 5), &sdw, false, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::OCB));

        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o200, 1, 0);
        check_call_gate(&mut t, &ppr(0o100, 1), &sdw, false, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::OCALL));

        let mut acvs = AccessViolations::NONE;
        let mut t = tpr(0o200, 3, 0);
        check_call_gate(&mut t, &ppr(0o100, 2), &sdw, false, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::BOC));
    }

    #[test]
    fn test_execute_checks() {
        let mut acvs = AccessViolations::NONE;
        check_execute_access(&tpr(0, 4, 0), &ppr(0, 4), &brackets(4, 4, 4), &mut acvs);
        assert!(acvs.is_empty());
        check_execute_access(&tpr(0, 5, 0), &ppr(0, 4), &brackets(4, 4, 4), &mut acvs);
        let mut expected = only(AccessViolation::OEB);
        expected.set(AccessViolation::CRT);
        assert_eq!(acvs, expected);

        let sdw = SegmentDescriptor {
            execute: false,
            ..brackets(4, 4, 4)
        };
        let mut acvs = AccessViolations::NONE;
        check_execute_access(&tpr(0, 4, 0), &ppr(0, 4), &sdw, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::EOFF));
    }

    #[test]
    fn test_bound_edge() {
        let mut acvs = AccessViolations::NONE;
        let bound = Unsigned14Bit::truncating(3);
        check_bound(Unsigned18Bit::truncating(0o77), bound, &mut acvs);
        assert!(acvs.is_empty());
        check_bound(Unsigned18Bit::truncating(0o100), bound, &mut acvs);
        assert_eq!(acvs, only(AccessViolation::OOSB));
    }

    #[proptest]
    fn bound_check_matches_block_number(
        #[strategy(0..0o1_000_000u32)] ca: u32,
        #[strategy(0..0o40_000u16)] bound: u16,
    ) {
        let mut acvs = AccessViolations::NONE;
        check_bound(
            Unsigned18Bit::try_from(ca).expect("strategy keeps this in range"),
            Unsigned14Bit::try_from(bound).expect("strategy keeps this in range"),
            &mut acvs,
        );
        assert_eq!(
            acvs.contains(AccessViolation::OOSB),
            ((ca >> 4) & 0o37_777) > u32::from(bound)
        );
    }
}
