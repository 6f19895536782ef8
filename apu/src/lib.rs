//! This crate emulates the appending unit of the DPS8/M: segmented
//! and paged address translation, and the ring protection checks
//! made along the way.
#![crate_name = "apu"]

mod appending;
mod compose;
mod config;
mod fault;
mod memory;
mod protection;
mod registers;
mod ucache;
mod walker;
mod wam;

pub use appending::{AppendingUnit, ApuStatus, LookupFailure, ProcessorCycle};
pub use compose::Translation;
pub use config::{ApuConfig, CpuModel};
pub use fault::{AccessViolation, AccessViolations, Fault, FaultNumber, UnknownFaultName};
pub use memory::{MemoryConfiguration, MemoryOpFailure, MemoryUnit, PhysicalMemory};
pub use registers::{AddressingMode, Dsbr, PointerRegister, Ppr, Registers, Tpr};
pub use ucache::{UcacheClass, UcacheStats};
pub use wam::{AmEntry, AssociativeMemory, PtwamKey, Ptwam, Sdwam, SdwamKey};
