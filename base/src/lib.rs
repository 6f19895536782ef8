//! The `base` crate defines the DPS8/M-related things which are
//! useful both in the appending unit and in other associated tools
//! (for example something which inspects a memory dump).  The idea
//! is that such a tool would depend on the base crate but would not
//! need to depend on the emulator library itself.

mod error;
mod types;
mod unsigned;

pub mod descriptor;
pub mod instruction;
pub mod pointer;
pub mod prelude;
pub mod subword;
pub use crate::unsigned::*;

#[macro_export]
macro_rules! u36 {
    ($n:expr) => {
        $crate::prelude::Unsigned36Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u24 {
    ($n:expr) => {
        $crate::prelude::Unsigned24Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u18 {
    ($n:expr) => {
        $crate::prelude::Unsigned18Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u15 {
    ($n:expr) => {
        $crate::prelude::Unsigned15Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u14 {
    ($n:expr) => {
        $crate::prelude::Unsigned14Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u3 {
    ($n:expr) => {
        $crate::prelude::Unsigned3Bit::new::<{ $n }>()
    };
}

#[test]
fn test_u36() {
    use prelude::Unsigned36Bit;
    let m: Unsigned36Bit = u36!(40_u64);
    let n: Unsigned36Bit = Unsigned36Bit::from(40_u32);
    assert_eq!(m, n);

    let p: Unsigned36Bit = u36!(1u64 << 34);
    let q: Unsigned36Bit =
        Unsigned36Bit::try_from(1u64 << 34).expect("test data should be in range");
    assert_eq!(p, q);
}

#[test]
fn test_u24() {
    use prelude::Unsigned24Bit;
    let p: Unsigned24Bit = u24!(0o1_000_000);
    let q: Unsigned24Bit =
        Unsigned24Bit::try_from(0o1_000_000_u32).expect("test data should be in range");
    assert_eq!(p, q);
}

#[test]
fn test_u3() {
    use prelude::Unsigned3Bit;
    let p: Unsigned3Bit = u3!(7);
    assert_eq!(p, Unsigned3Bit::MAX);
}
