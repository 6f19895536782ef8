//! Binary representation of DPS8/M instruction words, as far as the
//! appending unit needs to know about them.
//!
//! A DPS8/M single-word instruction occupies 36 bits (least
//! significant bit on the right, bits numbered 0 to 35 in decimal):
//!
//! |Address / offset|Opcode |Opcode X|Interrupt inhibit|A (bit 29)|Tag   |
//! |----------------|-------|--------|-----------------|----------|------|
//! |    18 bits     |9 bits | 1 bit  |     1 bit       |  1 bit   |6 bits|
//! |    (18-35)     |(9-17) |  (8)   |      (7)        |   (6)    |(0-5) |
//!
//! Hardware documentation numbers bits from the other end, which is
//! why the "A" bit is conventionally called bit 29.
//!
//! The appending unit never executes instructions; it only needs the
//! opcode (to decide whether the associative memories may be used,
//! whether the instruction is RTCD and so on), the tag (for indirect
//! word fetches) and a few class flags which the instruction decoder
//! derives from its opcode table.

use std::fmt::{self, Debug, Formatter};

use serde::Serialize;

use super::prelude::*;
use super::subword::{field, test_bit};

/// Named opcode values (9-bit opcode field, extended opcode bit
/// clear).
pub mod opcodes {
    /// Return to caller descriptor.
    pub const RTCD: u16 = 0o610;
    pub const CALL6: u16 = 0o713;
    pub const TRA: u16 = 0o710;
    pub const RET: u16 = 0o630;
    pub const TSP0: u16 = 0o270;
    pub const TSP3: u16 = 0o273;
    pub const TSP4: u16 = 0o670;
    pub const TSP7: u16 = 0o673;
}

/// Opcodes which make the associative memories report "no match",
/// when the extended opcode bit is set.
const NOMATCH_EXTENDED: [u16; 4] = [0o232, 0o254, 0o154, 0o173];
/// Opcodes which make the associative memories report "no match",
/// when the extended opcode bit is clear.
const NOMATCH_BASIC: [u16; 2] = [0o557, 0o257];
/// Values of `opcode & 0o770` (extended opcodes) identifying EIS
/// instructions which may not be interrupted once they start moving
/// data.
const UNINTERRUPTIBLE_EIS_GROUPS: [u16; 4] = [0o200, 0o220, 0o020, 0o300];

const OPCODE_X_BIT: u32 = 8;
const B29_BIT: u32 = 6;

/// The tag modifier (the top two bits of the tag field).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TagModifier {
    /// Register modification.
    R,
    /// Register then indirect.
    RI,
    /// Indirect then tally.
    IT,
    /// Indirect then register.
    IR,
}

impl From<Unsigned6Bit> for TagModifier {
    fn from(tag: Unsigned6Bit) -> TagModifier {
        match u8::from(tag) >> 4 {
            0 => TagModifier::R,
            1 => TagModifier::RI,
            2 => TagModifier::IT,
            _ => TagModifier::IR,
        }
    }
}

/// Flags derived by the instruction decoder from its opcode table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct InstructionClass {
    /// The instruction transfers control.
    pub transfer: bool,
    /// The instruction is CALL6.
    pub call6: bool,
    /// The instruction is one of TSP0 ... TSP7.
    pub tspn: bool,
}

impl InstructionClass {
    /// Classify the opcodes whose class affects address preparation.
    /// Other transfer instructions must be flagged by the caller.
    pub fn for_opcode(opcode: Unsigned9Bit, extended: bool) -> InstructionClass {
        if extended {
            return InstructionClass::default();
        }
        let op = u16::from(opcode);
        let tspn = (opcodes::TSP0..=opcodes::TSP3).contains(&op)
            || (opcodes::TSP4..=opcodes::TSP7).contains(&op);
        let call6 = op == opcodes::CALL6;
        InstructionClass {
            transfer: tspn
                || call6
                || op == opcodes::TRA
                || op == opcodes::RET
                || (0o700..=0o707).contains(&op)
                || (0o600..=0o607).contains(&op),
            call6,
            tspn,
        }
    }
}

/// The `Inst` trait provides a way to extract the various fields
/// within an instruction.
pub trait Inst {
    /// The 9-bit opcode field.
    fn opcode(&self) -> Unsigned9Bit;

    /// The extended-opcode bit.
    fn is_extended(&self) -> bool;

    /// Bit 29 (the "A" bit): the address field names a pointer
    /// register.
    fn b29(&self) -> bool;

    /// The tag field, used for address modification.
    fn tag(&self) -> Unsigned6Bit;
}

/// A decoded DPS8/M instruction.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    word: Unsigned36Bit,
    class: InstructionClass,
}

impl Instruction {
    /// Decode an instruction word whose class flags were looked up
    /// by the caller.
    pub fn decode(word: Unsigned36Bit, class: InstructionClass) -> Instruction {
        Instruction { word, class }
    }

    /// Build an instruction from its opcode, with an all-zero tag
    /// and bit 29 clear.  The class is derived with
    /// [`InstructionClass::for_opcode`].
    pub fn from_opcode(opcode: Unsigned9Bit, extended: bool) -> Instruction {
        let mut bits: u64 = u64::from(opcode) << 9;
        if extended {
            bits |= 1 << OPCODE_X_BIT;
        }
        Instruction {
            word: Unsigned36Bit::truncating(bits),
            class: InstructionClass::for_opcode(opcode, extended),
        }
    }

    #[must_use]
    pub fn with_tag(self, tag: Unsigned6Bit) -> Instruction {
        let bits = (u64::from(self.word) & !0o77_u64) | u64::from(tag);
        Instruction {
            word: Unsigned36Bit::truncating(bits),
            class: self.class,
        }
    }

    #[must_use]
    pub fn with_b29(self, b29: bool) -> Instruction {
        let mask: u64 = 1 << B29_BIT;
        let bits = if b29 {
            u64::from(self.word) | mask
        } else {
            u64::from(self.word) & !mask
        };
        Instruction {
            word: Unsigned36Bit::truncating(bits),
            class: self.class,
        }
    }

    #[must_use]
    pub fn with_class(self, class: InstructionClass) -> Instruction {
        Instruction {
            word: self.word,
            class,
        }
    }

    pub fn bits(&self) -> Unsigned36Bit {
        self.word
    }

    pub fn class(&self) -> InstructionClass {
        self.class
    }

    pub fn is_transfer(&self) -> bool {
        self.class.transfer
    }

    pub fn is_call6(&self) -> bool {
        self.class.call6
    }

    pub fn is_tspn(&self) -> bool {
        self.class.tspn
    }

    /// RTCD is opcode 0610 with the extended bit clear.
    pub fn is_rtcd(&self) -> bool {
        !self.is_extended() && self.opcode() == opcodes::RTCD
    }

    /// Returns true for the instructions which load or store
    /// segment and page table pointers; while one of these is being
    /// prepared, the associative memories must not be searched.
    pub fn forces_associative_memory_miss(&self) -> bool {
        let op = u16::from(self.opcode());
        if self.is_extended() {
            NOMATCH_EXTENDED.contains(&op)
        } else {
            NOMATCH_BASIC.contains(&op)
        }
    }

    /// Returns true for the multi-word EIS instructions (decimal
    /// arithmetic and moves) which must not fault part way through.
    pub fn is_uninterruptible_eis(&self) -> bool {
        let op = u16::from(self.opcode());
        self.is_extended() && UNINTERRUPTIBLE_EIS_GROUPS.contains(&(op & 0o770))
    }

    pub fn tag_modifier(&self) -> TagModifier {
        TagModifier::from(self.tag())
    }

    /// The pointer register saved by a TSPn instruction.  TSP0-3 and
    /// TSP4-7 occupy two separate blocks of opcodes.
    pub fn tspn_register(&self) -> Unsigned3Bit {
        let op = u16::from(self.opcode());
        let n = if op <= opcodes::TSP3 {
            op & 3
        } else {
            (op & 3) + 4
        };
        Unsigned3Bit::truncating(u64::from(n))
    }
}

impl Inst for Instruction {
    fn opcode(&self) -> Unsigned9Bit {
        Unsigned9Bit::truncating(field(self.word, 9, 9))
    }

    fn is_extended(&self) -> bool {
        test_bit(self.word, OPCODE_X_BIT)
    }

    fn b29(&self) -> bool {
        test_bit(self.word, B29_BIT)
    }

    fn tag(&self) -> Unsigned6Bit {
        Unsigned6Bit::truncating(field(self.word, 0, 6))
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "Instruction{{opcode: {:03o}{}, tag: {:02o}, b29: {}, class: {:?}}}",
            self.opcode(),
            if self.is_extended() { "(1)" } else { "" },
            self.tag(),
            self.b29(),
            self.class
        )
    }
}
