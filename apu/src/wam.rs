//! Associative memories (the SDWAM and the PTWAM).
//!
//! Each associative memory is a small fully-associative cache with a
//! usage count per entry.  The entry with usage count 0 is the least
//! recently used and is the one replaced when there is no free entry.
use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

/// Key of an SDWAM entry: the segment number.
pub type SdwamKey = Unsigned15Bit;

/// Key of a PTWAM entry: the segment number and the page number
/// field `(CA >> 6) & 07760`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PtwamKey {
    pub segno: Unsigned15Bit,
    pub pageno: Unsigned12Bit,
}

impl PtwamKey {
    pub fn new(segno: Unsigned15Bit, ca: Unsigned18Bit) -> PtwamKey {
        PtwamKey {
            segno,
            pageno: Unsigned12Bit::truncating(u64::from((u32::from(ca) >> 6) & 0o7760)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AmEntry<K, T> {
    /// The entry holds valid data.
    pub full: bool,
    /// Usage count; higher is more recently used.
    pub usage: usize,
    pub key: K,
    pub value: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssociativeMemory<K, T> {
    entries: Vec<AmEntry<K, T>>,
}

pub type Sdwam = AssociativeMemory<SdwamKey, SegmentDescriptor>;
pub type Ptwam = AssociativeMemory<PtwamKey, PageTableWord>;

impl<K, T> AssociativeMemory<K, T>
where
    K: Copy + PartialEq + Default,
    T: Copy + Default,
{
    #[must_use]
    pub fn new(size: usize) -> AssociativeMemory<K, T> {
        let mut am = AssociativeMemory {
            entries: vec![AmEntry::default(); size],
        };
        am.clear();
        am
    }

    /// Invalidate every entry and reset the usage counts to the slot
    /// numbers.
    pub fn clear(&mut self) {
        for (i, e) in self.entries.iter_mut().enumerate() {
            e.full = false;
            e.usage = i;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AmEntry<K, T>] {
        &self.entries
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|e| e.full && e.key == *key)
    }

    /// Make entry `slot` the most recently used one.
    fn promote(&mut self, slot: usize) {
        let hit_usage = self.entries[slot].usage;
        for e in self.entries.iter_mut() {
            if e.usage > hit_usage {
                e.usage -= 1;
            }
        }
        self.entries[slot].usage = self.entries.len().saturating_sub(1);
    }

    /// Search for `key`.  A hit makes the entry the most recently
    /// used one.
    pub fn lookup(&mut self, key: &K) -> Option<T> {
        let slot = self.position(key)?;
        self.promote(slot);
        Some(self.entries[slot].value)
    }

    /// Search for `key` without changing the usage counts.
    pub fn peek(&self, key: &K) -> Option<T> {
        self.position(key).map(|slot| self.entries[slot].value)
    }

    /// Load `value` under `key`, replacing the entry which already
    /// holds `key`, else the first empty entry, else the least
    /// recently used one.
    pub fn load(&mut self, key: K, value: T) {
        let slot = self
            .position(&key)
            .or_else(|| self.entries.iter().position(|e| !e.full))
            .or_else(|| self.entries.iter().position(|e| e.usage == 0));
        match slot {
            Some(slot) => {
                self.entries[slot] = AmEntry {
                    full: true,
                    usage: self.entries[slot].usage,
                    key,
                    value,
                };
                self.promote(slot);
            }
            None => {
                // Only possible for a zero-sized memory.
                event!(
                    Level::TRACE,
                    "associative memory of size {} has no slot to load",
                    self.entries.len(),
                );
            }
        }
    }
}
