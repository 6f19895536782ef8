//! Faults raised by the appending unit.
//!
//! On the real machine a fault is a non-local transfer to the fault
//! handler; nothing inside the appending unit ever recovers from one.
//! Here it is the error half of the `Result` returned by each cycle
//! driver, and the caller (the control unit) delivers it.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use base::prelude::*;

use crate::memory::MemoryOpFailure;

/// Architectural fault numbers of the faults which the appending
/// unit can raise.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum FaultNumber {
    /// Store fault (non-existent address).
    STR,
    DF0,
    DF1,
    DF2,
    DF3,
    /// Access violation.
    ACV,
}

impl FaultNumber {
    /// The fault vector number.
    #[must_use]
    pub const fn number(&self) -> u8 {
        match self {
            FaultNumber::STR => 1,
            FaultNumber::DF0 => 16,
            FaultNumber::DF1 => 17,
            FaultNumber::DF2 => 18,
            FaultNumber::DF3 => 19,
            FaultNumber::ACV => 20,
        }
    }

    /// The directed fault selected by a descriptor's fault code.
    #[must_use]
    pub fn directed(fc: Unsigned2Bit) -> FaultNumber {
        match u8::from(fc) {
            0 => FaultNumber::DF0,
            1 => FaultNumber::DF1,
            2 => FaultNumber::DF2,
            _ => FaultNumber::DF3,
        }
    }

    #[must_use]
    pub const fn all_fault_numbers() -> [FaultNumber; 6] {
        [
            FaultNumber::STR,
            FaultNumber::DF0,
            FaultNumber::DF1,
            FaultNumber::DF2,
            FaultNumber::DF3,
            FaultNumber::ACV,
        ]
    }
}

impl Display for FaultNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            FaultNumber::STR => "STR",
            FaultNumber::DF0 => "DF0",
            FaultNumber::DF1 => "DF1",
            FaultNumber::DF2 => "DF2",
            FaultNumber::DF3 => "DF3",
            FaultNumber::ACV => "ACV",
        })
    }
}

#[derive(Debug)]
pub struct UnknownFaultName(String);

impl Display for UnknownFaultName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "unknown fault name '{}'", self.0)
    }
}

impl Error for UnknownFaultName {}

impl TryFrom<&str> for FaultNumber {
    type Error = UnknownFaultName;
    fn try_from(s: &str) -> Result<FaultNumber, UnknownFaultName> {
        match s {
            "STR" => Ok(FaultNumber::STR),
            "DF0" => Ok(FaultNumber::DF0),
            "DF1" => Ok(FaultNumber::DF1),
            "DF2" => Ok(FaultNumber::DF2),
            "DF3" => Ok(FaultNumber::DF3),
            "ACV" => Ok(FaultNumber::ACV),
            _ => Err(UnknownFaultName(s.to_owned())),
        }
    }
}

/// The sixteen reasons for an access violation.  The names follow
/// the hardware documentation.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum AccessViolation {
    /// ACV0: ring brackets not in order (`R1 <= R2 <= R3`).
    IRO,
    /// ACV1: out of execute bracket.
    OEB,
    /// ACV2: execute permission off.
    EOFF,
    /// ACV3: out of read bracket.
    ORB,
    /// ACV4: read permission off.
    ROFF,
    /// ACV5: out of write bracket.
    OWB,
    /// ACV6: write permission off.
    WOFF,
    /// ACV7: call not to a gate.
    NOGA,
    /// ACV8: out of call bracket.
    OCB,
    /// ACV9: outward call.
    OCALL,
    /// ACV10: bad outward call.
    BOC,
    /// ACV11: inward return.
    INRET,
    /// ACV12: cross ring transfer.
    CRT,
    /// ACV13: ring alarm.
    RALR,
    /// ACV14: associative memory error.
    AME,
    /// ACV15: out of segment bounds.
    OOSB,
}

impl AccessViolation {
    /// The ACV number (0 to 15).
    #[must_use]
    pub const fn number(&self) -> u32 {
        *self as u32
    }

    /// The bit which represents this violation in the fault mask;
    /// ACV0 is the most significant of 16 bits.
    #[must_use]
    pub const fn mask_bit(&self) -> u16 {
        1 << (15 - self.number())
    }

    #[must_use]
    pub const fn all() -> [AccessViolation; 16] {
        [
            AccessViolation::IRO,
            AccessViolation::OEB,
            AccessViolation::EOFF,
            AccessViolation::ORB,
            AccessViolation::ROFF,
            AccessViolation::OWB,
            AccessViolation::WOFF,
            AccessViolation::NOGA,
            AccessViolation::OCB,
            AccessViolation::OCALL,
            AccessViolation::BOC,
            AccessViolation::INRET,
            AccessViolation::CRT,
            AccessViolation::RALR,
            AccessViolation::AME,
            AccessViolation::OOSB,
        ]
    }
}

impl Display for AccessViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let name = match self {
            AccessViolation::IRO => "IRO",
            AccessViolation::OEB => "OEB",
            AccessViolation::EOFF => "E-OFF",
            AccessViolation::ORB => "ORB",
            AccessViolation::ROFF => "R-OFF",
            AccessViolation::OWB => "OWB",
            AccessViolation::WOFF => "W-OFF",
            AccessViolation::NOGA => "NO GA",
            AccessViolation::OCB => "OCB",
            AccessViolation::OCALL => "OCALL",
            AccessViolation::BOC => "BOC",
            AccessViolation::INRET => "INRET",
            AccessViolation::CRT => "CRT",
            AccessViolation::RALR => "RALR",
            AccessViolation::AME => "AME",
            AccessViolation::OOSB => "OOSB",
        };
        write!(f, "ACV{} ({})", self.number(), name)
    }
}

/// A set of access violations, accumulated over one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AccessViolations(u16);

impl AccessViolations {
    pub const NONE: AccessViolations = AccessViolations(0);

    pub fn set(&mut self, acv: AccessViolation) {
        self.0 |= acv.mask_bit();
    }

    #[must_use]
    pub fn contains(&self, acv: AccessViolation) -> bool {
        self.0 & acv.mask_bit() != 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The 16-bit mask which accompanies the ACV fault.
    #[must_use]
    pub fn mask(&self) -> u16 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = AccessViolation> + '_ {
        AccessViolation::all()
            .into_iter()
            .filter(|acv| self.contains(*acv))
    }
}

impl From<AccessViolation> for AccessViolations {
    fn from(acv: AccessViolation) -> AccessViolations {
        AccessViolations(acv.mask_bit())
    }
}

impl Display for AccessViolations {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        if self.is_empty() {
            return f.write_str("no access violation");
        }
        let mut first = true;
        for acv in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{acv}")?;
        }
        Ok(())
    }
}

/// A fault raised while preparing or using an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A segment or page descriptor is marked not present.
    Directed {
        fc: Unsigned2Bit,
        diagnostic: &'static str,
    },
    /// One or more protection checks failed.
    AccessViolation {
        violations: AccessViolations,
        diagnostic: &'static str,
    },
    /// The memory collaborator could not complete an access.
    Store(MemoryOpFailure),
}

impl Fault {
    #[must_use]
    pub fn fault_number(&self) -> FaultNumber {
        match self {
            Fault::Directed { fc, .. } => FaultNumber::directed(*fc),
            Fault::AccessViolation { .. } => FaultNumber::ACV,
            Fault::Store(_) => FaultNumber::STR,
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fault::Directed { fc, diagnostic } => {
                write!(f, "{}: {}", FaultNumber::directed(*fc), diagnostic)
            }
            Fault::AccessViolation {
                violations,
                diagnostic,
            } => {
                write!(
                    f,
                    "ACV: {} (mask {:06o}): {}",
                    diagnostic,
                    violations.mask(),
                    violations
                )
            }
            Fault::Store(e) => write!(f, "STR: {e}"),
        }
    }
}

impl Error for Fault {}

impl From<MemoryOpFailure> for Fault {
    fn from(e: MemoryOpFailure) -> Fault {
        Fault::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_number_round_trip() {
        for orig in FaultNumber::all_fault_numbers() {
            let name = orig.to_string();
            match FaultNumber::try_from(name.as_str()) {
                Ok(k) => {
                    assert_eq!(k, orig);
                }
                Err(_) => {
                    panic!("unable to round-trip fault number {orig:?}");
                }
            }
        }
        assert!(FaultNumber::try_from("this is not a fault name").is_err());
    }

    #[test]
    fn test_directed_fault_numbers() {
        for fc in 0..4_u8 {
            let n = FaultNumber::directed(Unsigned2Bit::try_from(fc).expect("valid test data"));
            assert_eq!(n.number(), 16 + fc);
        }
    }

    #[test]
    fn test_mask_bits() {
        assert_eq!(AccessViolation::IRO.mask_bit(), 0o100_000);
        assert_eq!(AccessViolation::ORB.mask_bit(), 1 << 12);
        assert_eq!(AccessViolation::OOSB.mask_bit(), 1);
        for (n, acv) in AccessViolation::all().into_iter().enumerate() {
            assert_eq!(acv.number() as usize, n);
        }
    }

    #[test]
    fn test_access_violations_accumulate() {
        let mut acvs = AccessViolations::NONE;
        assert!(acvs.is_empty());
        acvs.set(AccessViolation::ORB);
        acvs.set(AccessViolation::OOSB);
        acvs.set(AccessViolation::ORB);
        assert!(acvs.contains(AccessViolation::ORB));
        assert!(acvs.contains(AccessViolation::OOSB));
        assert!(!acvs.contains(AccessViolation::IRO));
        assert_eq!(acvs.mask(), (1 << 12) | 1);
        assert_eq!(acvs.to_string(), "ACV3 (ORB), ACV15 (OOSB)");
    }

    #[test]
    fn test_fault_display() {
        let fault = Fault::AccessViolation {
            violations: AccessViolations::from(AccessViolation::OOSB),
            diagnostic: "fetch out of segment bounds",
        };
        assert_eq!(fault.fault_number(), FaultNumber::ACV);
        assert!(fault.to_string().contains("ACV15 (OOSB)"));
    }
}
