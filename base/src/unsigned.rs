//! Unsigned types of the various bit widths which make up DPS8/M
//! machine words and registers.  A 36-bit memory word is divided into
//! fields of many sizes: 24-bit absolute addresses, 18-bit offsets,
//! 15-bit segment numbers, 14-bit bounds, 3-bit ring numbers and so
//! on.  Each of the types here guarantees that its value fits within
//! its width, so a ring number can never silently become 8.
//!
//! The types are all generated by one macro so that they share an
//! interface.  Conversions from native integer types which may not
//! fit are fallible (`TryFrom`); extraction of a field from a wider
//! value uses [`Unsigned36Bit::truncating`] and friends, which keep
//! only the low-order bits.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter, Octal};
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::error::ConversionFailed;

#[cfg(test)]
mod tests;

/// This macro implements conversions from native types to
/// Unsigned*Bit which are always possible (e.g. From<u8> for
/// Unsigned15Bit).
macro_rules! from_native_type_to_self {
    ($SelfT:ty, $($from:ty)*) => {
        $(
            impl From<$from> for $SelfT {
                fn from(n: $from) -> Self {
                    Self {
                        bits: n.into(),
                    }
                }
            }
        )*
    }
}

/// This macro implements conversions from Unsigned*Bit to native
/// types which are always possible (e.g. From<Unsigned15Bit> for
/// i16).
macro_rules! from_self_to_native_type {
    ($SelfT:ty, $($to:ty)*) => {
        $(
            impl From<$SelfT> for $to {
                fn from(n: $SelfT) -> $to {
                    // The inner type of Unsigned15Bit is u16, and we
                    // are called with $to = i16, because the limits
                    // of Unsigned15Bit are wholly inside the limits
                    // of i16.  The compiler can't know that about
                    // n.bits, so we cannot use .into() here.
                    n.bits as $to
                }
            }
        )*
    }
}

/// This macro implements conversions from Unsigned*Bit to native
/// types where the conversion may not always fit.  For example
/// TryFrom<Unsigned18Bit> for u8.
macro_rules! try_from_self_to_native_type {
    ($SelfT:ty, $($to:ty)*) => {
        $(
            impl TryFrom<$SelfT> for $to {
                type Error = ConversionFailed;
                fn try_from(n: $SelfT) -> Result<$to, ConversionFailed> {
                    <$to>::try_from(n.bits).map_err(|_| ConversionFailed::TooLarge)
                }
            }
        )*
    }
}

/// This macro implements a conversions from native types to
/// Unsigned*Bit where the conversion may not always fit.  For example
/// TryFrom<u64> for Unsigned36Bit.
macro_rules! try_from_native_type_to_self {
    ($SelfT:ty, $InnerT:ty, $($from:ty)*) => {
        $(
            impl TryFrom<$from> for $SelfT {
                type Error = ConversionFailed;
                fn try_from(n: $from) -> Result<Self, ConversionFailed> {
                    let bits: $InnerT = match n.try_into() {
                        Err(_) => {
                            // Because $InnerT is unsigned, we know
                            // that n < 0 is always an error case.
                            // Since this macro also gets used for
                            // conversions from unsigned types,
                            // sometimes this conditional is useless
                            // (and we expect it to be optimized
                            // away).
                            #[allow(unused_comparisons)]
                            if n < 0 {
                                return Err(ConversionFailed::TooSmall);
                            } else {
                                return Err(ConversionFailed::TooLarge);
                            }
                        }
                        Ok(value) if value > Self::VALUE_BITS => {
                            return Err(ConversionFailed::TooLarge);
                        }
                        Ok(value) => value,
                    };
                    Ok(
                        Self {
                            bits,
                        }
                    )
                }
            }
        )*
    }
}

/// This macro implements conversions between our own types where
/// the destination is at least as wide as the source.
macro_rules! widening_conversion {
    ($FromT:ty => $($to:ty)*) => {
        $(
            impl From<$FromT> for $to {
                fn from(n: $FromT) -> $to {
                    Self {
                        bits: n.bits.into(),
                    }
                }
            }
        )*
    }
}

/// This macro implements the base functionality of the unsigned
/// types.  The `SelfT` argument is the name of the type we are
/// defining.  `BITS` is the bit width of the type we are defining.
/// `InnerT` is the name of the native type which will store those
/// bits.
macro_rules! unsigned_word_impl {
    ($SelfT:ty, $BITS:expr, $InnerT:ty) => {
        impl $SelfT {
            const MODULUS: $InnerT = (1 << $BITS);
            const VALUE_BITS: $InnerT = Self::MODULUS - 1;

            /// The width of this type, in bits.
            pub const BITS: u32 = $BITS;

            pub const MAX: Self = Self {
                bits: Self::MODULUS - 1,
            };

            pub const ZERO: Self = Self { bits: 0 };
            pub const ONE: Self = Self { bits: 1 };
            pub const MIN: Self = Self::ZERO;

            // This will always fail at compile time, so no need to
            // hide it.  It's pub so that it can be used in u15!() and
            // similar.
            pub const fn new<const N: $InnerT>() -> $SelfT {
                type Word = $SelfT;
                struct Helper<const M: $InnerT>;
                impl<const M: $InnerT> Helper<M> {
                    const U: Word = {
                        if M > Word::MAX.bits {
                            panic!("input value is out of range")
                        } else {
                            Word {
                                bits: Word::MAX.bits & M,
                            }
                        }
                    };
                }
                Helper::<N>::U
            }

            /// Keeps only those low-order bits of `n` which fit into
            /// this type.  This is the way hardware fields are
            /// extracted from a wider word (after shifting the field
            /// down to bit 0).
            pub const fn truncating(n: u64) -> $SelfT {
                Self {
                    bits: (n & (Self::VALUE_BITS as u64)) as $InnerT,
                }
            }

            pub const fn is_zero(&self) -> bool {
                self.bits == 0
            }

            pub fn wrapping_add(self, rhs: $SelfT) -> $SelfT {
                Self {
                    bits: self.bits.wrapping_add(rhs.bits) & Self::VALUE_BITS,
                }
            }

            pub fn wrapping_sub(self, rhs: $SelfT) -> $SelfT {
                Self {
                    bits: self.bits.wrapping_sub(rhs.bits) & Self::VALUE_BITS,
                }
            }

            pub fn checked_add(self, rhs: $SelfT) -> Option<$SelfT> {
                match self.bits.checked_add(rhs.bits) {
                    Some(bits) if bits <= Self::VALUE_BITS => Some(Self { bits }),
                    _ => None,
                }
            }

            pub fn checked_sub(self, rhs: $SelfT) -> Option<$SelfT> {
                self.bits.checked_sub(rhs.bits).map(|bits| Self { bits })
            }

            // We cannot call std::ops::BitAnd in a const because
            // trait methods cannot be const.  So we have this
            // work-alike in impl, since it can be called in a const
            // context.
            pub const fn and(self, mask: $InnerT) -> Self {
                Self {
                    bits: self.bits & mask,
                }
            }

            // We cannot call std::ops::BitOr in a const because trait
            // methods cannot be const.  So we have this work-alike in
            // impl, since it can be called in a const context.
            pub const fn bitor(self, mask: $InnerT) -> Self {
                Self {
                    bits: (self.bits | mask) & Self::VALUE_BITS,
                }
            }
        }

        impl Default for $SelfT {
            fn default() -> Self {
                Self { bits: 0 }
            }
        }

        impl Display for $SelfT {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
                Octal::fmt(&self.bits, f)
            }
        }

        impl Octal for $SelfT {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
                Octal::fmt(&self.bits, f)
            }
        }

        impl Debug for $SelfT {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, concat!(stringify!($SelfT), "{{bits: {:#o}}}"), self.bits)
            }
        }

        impl Hash for $SelfT {
            fn hash<H>(&self, state: &mut H)
            where
                H: Hasher,
            {
                self.bits.hash(state)
            }
        }

        impl<T> PartialEq<T> for $SelfT
        where
            T: TryInto<$SelfT> + Copy,
        {
            fn eq(&self, other: &T) -> bool {
                let converted: Result<$SelfT, _> = (*other).try_into();
                match converted {
                    Ok(rhs) => self.bits == rhs.bits,
                    Err(_) => false,
                }
            }
        }

        impl Eq for $SelfT {}

        impl PartialOrd<$SelfT> for $SelfT {
            fn partial_cmp(&self, other: &$SelfT) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl PartialOrd<u32> for $SelfT {
            fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
                match <$SelfT>::try_from(*other) {
                    Ok(value) => Some(self.cmp(&value)),
                    // The error case tells us that `other` doesn't fit
                    // into $SelfT, so `other` must be greater.
                    Err(_) => Some(Ordering::Less),
                }
            }
        }

        impl PartialOrd<u64> for $SelfT {
            fn partial_cmp(&self, other: &u64) -> Option<Ordering> {
                match <$SelfT>::try_from(*other) {
                    Ok(value) => Some(self.cmp(&value)),
                    // The error case tells us that `other` doesn't fit
                    // into $SelfT, so `other` must be greater.
                    Err(_) => Some(Ordering::Less),
                }
            }
        }

        impl Ord for $SelfT {
            fn cmp(&self, other: &$SelfT) -> Ordering {
                self.bits.cmp(&other.bits)
            }
        }

        impl std::ops::Not for $SelfT {
            type Output = Self;
            fn not(self) -> Self {
                Self {
                    bits: (!self.bits) & Self::VALUE_BITS,
                }
            }
        }

        impl std::ops::BitAnd<$InnerT> for $SelfT {
            type Output = Self;
            fn bitand(self, mask: $InnerT) -> Self {
                Self {
                    bits: self.bits & mask,
                }
            }
        }

        impl std::ops::BitAnd<$SelfT> for $SelfT {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self {
                    bits: self.bits & rhs.bits,
                }
            }
        }

        impl std::ops::BitOr<$InnerT> for $SelfT {
            type Output = Self;
            fn bitor(self, mask: $InnerT) -> Self {
                Self {
                    bits: (self.bits | mask) & Self::VALUE_BITS,
                }
            }
        }

        impl std::ops::BitOr for $SelfT {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self {
                    bits: self.bits | rhs.bits,
                }
            }
        }

        // Logical shifts: bits shifted off either end are lost.
        impl std::ops::Shr<u32> for $SelfT {
            type Output = $SelfT;
            fn shr(self, shift_by: u32) -> Self {
                Self {
                    bits: self.bits.checked_shr(shift_by).unwrap_or(0),
                }
            }
        }

        impl std::ops::Shl<u32> for $SelfT {
            type Output = $SelfT;
            fn shl(self, shift_by: u32) -> Self {
                Self {
                    bits: self.bits.checked_shl(shift_by).unwrap_or(0) & Self::VALUE_BITS,
                }
            }
        }
    };
}

/// `Unsigned2Bit` holds a directed fault code (the `FC` field of an
/// SDW or PTW).
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned2Bit {
    pub(crate) bits: u8,
}

/// `Unsigned3Bit` holds a ring number (0 is the most privileged) or
/// the number of a pointer register.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned3Bit {
    pub(crate) bits: u8,
}

/// `Unsigned6Bit` holds the tag field of an instruction word or the
/// bit offset of a pointer register.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned6Bit {
    pub(crate) bits: u8,
}

/// `Unsigned9Bit` holds the opcode field of an instruction word.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned9Bit {
    pub(crate) bits: u16,
}

/// `Unsigned12Bit` holds `DSBR.STACK` and the page-number key of a
/// PTWAM entry.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned12Bit {
    pub(crate) bits: u16,
}

/// `Unsigned14Bit` holds a segment bound or entry bound, in units of
/// 16 words.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned14Bit {
    pub(crate) bits: u16,
}

/// `Unsigned15Bit` holds a segment number.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned15Bit {
    pub(crate) bits: u16,
}

/// `Unsigned18Bit` is a half word.  It holds a word offset within a
/// segment (`TPR.CA`, `PPR.IC`, `PRn.WORDNO`) and the page frame
/// field of a PTW.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned18Bit {
    pub(crate) bits: u32,
}

/// `Unsigned24Bit` is an absolute main-memory address.  The machine
/// implements 24 bits of physical address, so every final address
/// produced by the appending unit fits in this type.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned24Bit {
    pub(crate) bits: u32,
}

/// `Unsigned36Bit` is the basic machine word of the DPS8/M.  This is
/// the unit in which memory is read and written.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned36Bit {
    pub(crate) bits: u64,
}

unsigned_word_impl!(Unsigned2Bit, 2, u8);
unsigned_word_impl!(Unsigned3Bit, 3, u8);
unsigned_word_impl!(Unsigned6Bit, 6, u8);
unsigned_word_impl!(Unsigned9Bit, 9, u16);
unsigned_word_impl!(Unsigned12Bit, 12, u16);
unsigned_word_impl!(Unsigned14Bit, 14, u16);
unsigned_word_impl!(Unsigned15Bit, 15, u16);
unsigned_word_impl!(Unsigned18Bit, 18, u32);
unsigned_word_impl!(Unsigned24Bit, 24, u32);
unsigned_word_impl!(Unsigned36Bit, 36, u64);

////////////////////////////////////////////////////////////////////////
// Types held in a u8
////////////////////////////////////////////////////////////////////////

// all the things that these types always fit into
from_self_to_native_type!(Unsigned2Bit, u8 u16 i16 u32 i32 u64 i64 usize isize);
from_self_to_native_type!(Unsigned3Bit, u8 u16 i16 u32 i32 u64 i64 usize isize);
from_self_to_native_type!(Unsigned6Bit, u8 u16 i16 u32 i32 u64 i64 usize isize);
// all the things that may not fit into these types
try_from_native_type_to_self!(Unsigned2Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned3Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned6Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Types held in a u16
////////////////////////////////////////////////////////////////////////

// all the things that always fit into these types
from_native_type_to_self!(Unsigned9Bit, u8);
from_native_type_to_self!(Unsigned12Bit, u8);
from_native_type_to_self!(Unsigned14Bit, u8);
from_native_type_to_self!(Unsigned15Bit, u8);
// all the things that these types always fit into
from_self_to_native_type!(Unsigned9Bit, u16 i16 u32 i32 u64 i64 usize isize);
from_self_to_native_type!(Unsigned12Bit, u16 i16 u32 i32 u64 i64 usize isize);
from_self_to_native_type!(Unsigned14Bit, u16 i16 u32 i32 u64 i64 usize isize);
from_self_to_native_type!(Unsigned15Bit, u16 i16 u32 i32 u64 i64 usize isize);
// all the things that these types may not fit into
try_from_self_to_native_type!(Unsigned9Bit, u8 i8);
try_from_self_to_native_type!(Unsigned12Bit, u8 i8);
try_from_self_to_native_type!(Unsigned14Bit, u8 i8);
try_from_self_to_native_type!(Unsigned15Bit, u8 i8);
// all the things that may not fit into these types
try_from_native_type_to_self!(Unsigned9Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned12Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned14Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned15Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Types held in a u32
////////////////////////////////////////////////////////////////////////

// all the things that always fit into these types
from_native_type_to_self!(Unsigned18Bit, u8 u16);
from_native_type_to_self!(Unsigned24Bit, u8 u16);
// all the things that these types always fit into
from_self_to_native_type!(Unsigned18Bit, u32 i32 u64 i64 usize isize);
from_self_to_native_type!(Unsigned24Bit, u32 i32 u64 i64 usize isize);
// all the things these types may not fit into
try_from_self_to_native_type!(Unsigned18Bit, u8 i8 u16 i16);
try_from_self_to_native_type!(Unsigned24Bit, u8 i8 u16 i16);
// all the things that may not fit into these types
try_from_native_type_to_self!(Unsigned18Bit, u32, i8 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned24Bit, u32, i8 i16 u32 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Unsigned36Bit
////////////////////////////////////////////////////////////////////////

// all the things that always fit into Unsigned36Bit
from_native_type_to_self!(Unsigned36Bit, u8 u16 u32);
// all the things that Unsigned36Bit always fits into
from_self_to_native_type!(Unsigned36Bit, u64 i64);
// all the things Unsigned36Bit may not fit into
try_from_self_to_native_type!(Unsigned36Bit, u8 i8 u16 i16 u32 i32 usize);
// all the things that may not fit into Unsigned36Bit
try_from_native_type_to_self!(Unsigned36Bit, u64, i8 i16 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Conversions between our own types
////////////////////////////////////////////////////////////////////////

widening_conversion!(Unsigned2Bit => Unsigned3Bit Unsigned36Bit);
widening_conversion!(Unsigned3Bit => Unsigned15Bit Unsigned18Bit Unsigned36Bit);
widening_conversion!(Unsigned6Bit => Unsigned18Bit Unsigned36Bit);
widening_conversion!(Unsigned9Bit => Unsigned18Bit Unsigned36Bit);
widening_conversion!(Unsigned12Bit => Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widening_conversion!(Unsigned14Bit => Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widening_conversion!(Unsigned15Bit => Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widening_conversion!(Unsigned18Bit => Unsigned24Bit Unsigned36Bit);
widening_conversion!(Unsigned24Bit => Unsigned36Bit);
