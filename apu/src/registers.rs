//! Architectural registers read and written by the appending unit.
use serde::Serialize;

use base::prelude::*;
use base::subword::field;

/// Temporary Pointer Register: the address being prepared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tpr {
    /// Target segment.
    pub tsr: Unsigned15Bit,
    /// Target (effective) ring.
    pub trr: Unsigned3Bit,
    /// Target bit offset.
    pub tbr: Unsigned6Bit,
    /// Computed address (word offset within the segment).
    pub ca: Unsigned18Bit,
}

/// Procedure Pointer Register: where execution currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Ppr {
    pub psr: Unsigned15Bit,
    pub prr: Unsigned3Bit,
    pub ic: Unsigned18Bit,
    /// The current procedure is privileged.
    pub p: bool,
}

/// Descriptor Segment Base Register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Dsbr {
    /// Absolute address of the descriptor segment, or of its page
    /// table.
    pub addr: Unsigned24Bit,
    /// Bound of the descriptor segment, in units of 16 words.
    pub bnd: Unsigned14Bit,
    /// The descriptor segment is unpaged.
    pub u: bool,
    /// High-order bits of the stack segment number used by CALL6.
    pub stack: Unsigned12Bit,
}

impl Dsbr {
    /// Decode the Y-pair operand of LDBR.
    pub fn from_pair(even: Unsigned36Bit, odd: Unsigned36Bit) -> Dsbr {
        Dsbr {
            addr: Unsigned24Bit::truncating(field(even, 12, 24)),
            bnd: Unsigned14Bit::truncating(field(odd, 21, 14)),
            u: field(odd, 16, 1) != 0,
            stack: Unsigned12Bit::truncating(field(odd, 0, 12)),
        }
    }

    /// Encode the register the way SDBR stores it.
    pub fn to_pair(&self) -> (Unsigned36Bit, Unsigned36Bit) {
        let even = u64::from(self.addr) << 12;
        let odd = (u64::from(self.bnd) << 21) | (u64::from(self.u) << 16) | u64::from(self.stack);
        (
            Unsigned36Bit::truncating(even),
            Unsigned36Bit::truncating(odd),
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PointerRegister {
    pub snr: Unsigned15Bit,
    pub rnr: Unsigned3Bit,
    pub wordno: Unsigned18Bit,
    pub bitno: Unsigned6Bit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AddressingMode {
    #[default]
    Absolute,
    Append,
}

/// The register state which the appending unit shares with the rest
/// of the processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Registers {
    pub tpr: Tpr,
    pub ppr: Ppr,
    pub dsbr: Dsbr,
    pub pr: [PointerRegister; 8],
    /// Ring alarm register.
    pub ralr: Unsigned3Bit,
    /// Execute/store flag: set once an address has been prepared
    /// through the appending unit.
    pub xsf: bool,
    pub mode: AddressingMode,
}

impl Registers {
    pub fn is_absolute_mode(&self) -> bool {
        self.mode == AddressingMode::Absolute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsbr_from_pair() {
        let dsbr = Dsbr::from_pair(
            Unsigned36Bit::try_from(0o012_345_670_000_u64).expect("valid test data"),
            Unsigned36Bit::try_from(0o000_000_201_234_u64).expect("valid test data"),
        );
        assert_eq!(dsbr.addr, 0o1_234_567_u32);
        assert_eq!(dsbr.bnd, 0_u32);
        assert!(dsbr.u);
        assert_eq!(dsbr.stack, 0o1234_u32);
    }

    #[test]
    fn test_dsbr_store_matches_load() {
        let dsbr = Dsbr {
            addr: Unsigned24Bit::truncating(0o7_654_321),
            bnd: Unsigned14Bit::truncating(0o3777),
            u: false,
            stack: Unsigned12Bit::truncating(0o77),
        };
        let (even, odd) = dsbr.to_pair();
        assert_eq!(Dsbr::from_pair(even, odd), dsbr);
    }
}
