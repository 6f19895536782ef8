//! The prelude exports a number of structs which are useful in
//! representing things to do with the DPS8/M appending unit.
//! Providing this prelude is the main purpose of the base crate.
pub use super::descriptor::{PageTableWord, SegmentDescriptor};
pub use super::error::*;
pub use super::instruction::{Inst, Instruction, InstructionClass, TagModifier};
pub use super::pointer::{IndirectPair, ItpPointer, ItsPointer};
pub use super::subword::{join_halves, left_half, right_half, split_halves};
pub use super::types::*;
pub use super::unsigned::*;
pub use super::{u14, u15, u18, u24, u3, u36};
