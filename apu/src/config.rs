//! Configuration of the appending unit.
//!
//! These mirror the simulator's "tweak" switches, which select
//! between behaviours that differ across CPU models or which are
//! useful when debugging the operating system.
use serde::{Deserialize, Serialize};

/// Which processor the appending unit belongs to.  The models differ
/// in the size of their associative memories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuModel {
    #[default]
    Dps8m,
    L68,
}

impl CpuModel {
    /// Number of entries in each of the SDWAM and the PTWAM.
    #[must_use]
    pub const fn associative_memory_size(&self) -> usize {
        match self {
            CpuModel::Dps8m => 64,
            CpuModel::L68 => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApuConfig {
    /// When false, the associative memories are never searched (every
    /// lookup reports "no match"), though they are still loaded.
    pub enable_wam: bool,
    pub model: CpuModel,
    /// When true, an RTCD operand fetch in absolute mode (with
    /// neither XSF nor bit 29 set) addresses segment 0 directly.
    pub rtcd_direct_addressing: bool,
}

impl Default for ApuConfig {
    fn default() -> ApuConfig {
        ApuConfig {
            enable_wam: false,
            model: CpuModel::default(),
            rtcd_direct_addressing: true,
        }
    }
}

#[test]
fn test_default_config() {
    let config = ApuConfig::default();
    assert!(!config.enable_wam);
    assert!(config.rtcd_direct_addressing);
    assert_eq!(config.model.associative_memory_size(), 64);
    assert_eq!(CpuModel::L68.associative_memory_size(), 16);
}
