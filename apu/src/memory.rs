//! The memory collaborator.
//!
//! The appending unit only produces absolute addresses; the words
//! themselves live in the system controllers, which are shared by
//! all processors.  [`PhysicalMemory`] is the interface the
//! appending unit uses to reach them, and [`MemoryUnit`] is a simple
//! single-processor implementation of it.
use std::error;
use std::fmt::{self, Debug, Display, Formatter};

use conv::ValueFrom;
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use base::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOpFailure {
    /// No memory is configured at this absolute address.
    NotMapped(Unsigned24Bit),
}

impl Display for MemoryOpFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            MemoryOpFailure::NotMapped(addr) => {
                write!(f, "address {addr:08o} is not mapped to functioning memory")
            }
        }
    }
}

impl error::Error for MemoryOpFailure {}

/// Operations on absolute (physical) memory.
pub trait PhysicalMemory {
    /// Read consecutive words starting at `addr`.
    fn read_words(
        &mut self,
        addr: Unsigned24Bit,
        out: &mut [Unsigned36Bit],
    ) -> Result<(), MemoryOpFailure>;

    /// Read one word and hold the location locked until it is next
    /// written (the first half of a read-modify-write pair).
    fn read_locked(&mut self, addr: Unsigned24Bit) -> Result<Unsigned36Bit, MemoryOpFailure>;

    /// Write consecutive words starting at `addr`.
    fn write_words(
        &mut self,
        addr: Unsigned24Bit,
        words: &[Unsigned36Bit],
    ) -> Result<(), MemoryOpFailure>;

    fn read_word(&mut self, addr: Unsigned24Bit) -> Result<Unsigned36Bit, MemoryOpFailure> {
        let mut w = [Unsigned36Bit::ZERO];
        self.read_words(addr, &mut w)?;
        Ok(w[0])
    }

    fn write_word(
        &mut self,
        addr: Unsigned24Bit,
        value: Unsigned36Bit,
    ) -> Result<(), MemoryOpFailure> {
        self.write_words(addr, &[value])
    }

    /// Replace only those bits of the word at `addr` which are set in
    /// `zone`.
    fn write_zone(
        &mut self,
        addr: Unsigned24Bit,
        value: Unsigned36Bit,
        zone: Unsigned36Bit,
    ) -> Result<(), MemoryOpFailure> {
        let old = self.read_word(addr)?;
        self.write_word(addr, (old & !zone) | (value & zone))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfiguration {
    /// Number of words of memory, starting at absolute address 0.
    pub size_words: u32,
}

impl Default for MemoryConfiguration {
    fn default() -> MemoryConfiguration {
        MemoryConfiguration {
            size_words: 1 << 20,
        }
    }
}

/// A contiguous block of memory starting at absolute address 0.
pub struct MemoryUnit {
    words: Vec<Unsigned36Bit>,
    locked: Option<Unsigned24Bit>,
}

impl Debug for MemoryUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("MemoryUnit")
            .field("size_words", &self.words.len())
            .field("locked", &self.locked)
            .finish()
    }
}

impl MemoryUnit {
    #[must_use]
    pub fn new(config: &MemoryConfiguration) -> MemoryUnit {
        let size = usize::value_from(config.size_words).unwrap_or(usize::MAX);
        MemoryUnit {
            words: vec![Unsigned36Bit::ZERO; size],
            locked: None,
        }
    }

    /// The location held by the last locked read, if it has not been
    /// written since.
    pub fn locked_address(&self) -> Option<Unsigned24Bit> {
        self.locked
    }

    fn index(&self, addr: Unsigned24Bit) -> Result<usize, MemoryOpFailure> {
        match usize::value_from(u32::from(addr)) {
            Ok(i) if i < self.words.len() => Ok(i),
            _ => {
                event!(
                    Level::DEBUG,
                    "memory access to unconfigured address {:08o}",
                    addr,
                );
                Err(MemoryOpFailure::NotMapped(addr))
            }
        }
    }
}

impl PhysicalMemory for MemoryUnit {
    fn read_words(
        &mut self,
        addr: Unsigned24Bit,
        out: &mut [Unsigned36Bit],
    ) -> Result<(), MemoryOpFailure> {
        let mut a = addr;
        for w in out.iter_mut() {
            *w = self.words[self.index(a)?];
            a = a.wrapping_add(Unsigned24Bit::ONE);
        }
        Ok(())
    }

    fn read_locked(&mut self, addr: Unsigned24Bit) -> Result<Unsigned36Bit, MemoryOpFailure> {
        let w = self.words[self.index(addr)?];
        self.locked = Some(addr);
        Ok(w)
    }

    fn write_words(
        &mut self,
        addr: Unsigned24Bit,
        words: &[Unsigned36Bit],
    ) -> Result<(), MemoryOpFailure> {
        let mut a = addr;
        for w in words {
            let i = self.index(a)?;
            self.words[i] = *w;
            if self.locked == Some(a) {
                self.locked = None;
            }
            a = a.wrapping_add(Unsigned24Bit::ONE);
        }
        Ok(())
    }
}
