use super::{
    ConversionFailed, Unsigned12Bit, Unsigned14Bit, Unsigned15Bit, Unsigned18Bit, Unsigned24Bit,
    Unsigned2Bit, Unsigned36Bit, Unsigned3Bit, Unsigned6Bit, Unsigned9Bit,
};

macro_rules! assert_octal_eq {
    ($left:expr_2021, $right:expr_2021 $(,)?) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    panic!(
                        "Assertion failed: {:>#012o} != {:>#012o}",
                        left_val, right_val
                    );
                }
            }
        }
    }};
}

#[test]
fn test_max_values() {
    assert_eq!(Unsigned2Bit::MAX.bits, 0o3);
    assert_eq!(Unsigned3Bit::MAX.bits, 0o7);
    assert_eq!(Unsigned6Bit::MAX.bits, 0o77);
    assert_eq!(Unsigned9Bit::MAX.bits, 0o777);
    assert_eq!(Unsigned12Bit::MAX.bits, 0o7777);
    assert_eq!(Unsigned14Bit::MAX.bits, 0o37777);
    assert_eq!(Unsigned15Bit::MAX.bits, 0o77777);
    assert_eq!(Unsigned18Bit::MAX.bits, 0o777_777);
    assert_eq!(Unsigned24Bit::MAX.bits, 0o77_777_777);
    assert_eq!(Unsigned36Bit::MAX.bits, 0o777_777_777_777);
}

#[test]
fn test_min_values() {
    assert_eq!(Unsigned3Bit::MIN.bits, 0);
    assert_eq!(Unsigned24Bit::MIN.bits, 0);
    assert!(Unsigned36Bit::ZERO.is_zero());
    assert!(!Unsigned36Bit::ONE.is_zero());
}

#[test]
fn test_bits_constant() {
    assert_eq!(Unsigned3Bit::BITS, 3);
    assert_eq!(Unsigned14Bit::BITS, 14);
    assert_eq!(Unsigned36Bit::BITS, 36);
}

#[test]
fn test_try_from_u8_ring_number() {
    assert_eq!(Unsigned3Bit::try_from(0_u8).map(u8::from), Ok(0));
    assert_eq!(Unsigned3Bit::try_from(7_u8).map(u8::from), Ok(7));
    assert_eq!(Unsigned3Bit::try_from(8_u8), Err(ConversionFailed::TooLarge));
    assert_eq!(Unsigned3Bit::try_from(-1_i32), Err(ConversionFailed::TooSmall));
}

#[test]
fn test_try_from_u32_too_large() {
    assert_eq!(
        Unsigned18Bit::try_from(0o1_000_000_u32),
        Err(ConversionFailed::TooLarge)
    );
    assert_eq!(
        Unsigned24Bit::try_from(1_u32 << 24),
        Err(ConversionFailed::TooLarge)
    );
    assert_eq!(
        Unsigned36Bit::try_from(1_u64 << 36),
        Err(ConversionFailed::TooLarge)
    );
}

#[test]
fn test_try_from_unsigned9bit_u8() {
    assert_eq!(u8::try_from(Unsigned9Bit::from(0o377_u8)), Ok(0o377_u8));
    assert_eq!(
        u8::try_from(Unsigned9Bit {
            bits: 0b110_000_000_u16
        }),
        Err(ConversionFailed::TooLarge)
    );
}

#[test]
fn test_truncating() {
    assert_octal_eq!(Unsigned3Bit::truncating(0o17), 0o7_u32);
    assert_octal_eq!(Unsigned14Bit::truncating(0o1_234_567), 0o34_567_u32);
    assert_octal_eq!(
        Unsigned24Bit::truncating(0o777_712_345_670),
        0o12_345_670_u32
    );
    assert_octal_eq!(Unsigned36Bit::truncating(u64::MAX), 0o777_777_777_777_u64);
}

#[test]
fn test_logical_shifts_lose_bits() {
    let w = Unsigned36Bit::try_from(0o400_000_000_001_u64).expect("in range");
    assert_octal_eq!(w << 1, 0o2_u64);
    assert_octal_eq!(w >> 1, 0o200_000_000_000_u64);
    assert_octal_eq!(w >> 36, 0_u64);
    assert_octal_eq!(w << 40, 0_u64);
}

#[test]
fn test_wrapping_add() {
    assert_octal_eq!(
        Unsigned24Bit::MAX.wrapping_add(Unsigned24Bit::ONE),
        0_u32
    );
    assert_octal_eq!(
        Unsigned18Bit::from(0o777_u16).wrapping_add(Unsigned18Bit::ONE),
        0o1000_u32
    );
}

#[test]
fn test_checked_arithmetic() {
    assert_eq!(Unsigned3Bit::MAX.checked_add(Unsigned3Bit::ONE), None);
    assert_eq!(
        Unsigned3Bit::ZERO.checked_sub(Unsigned3Bit::ONE),
        None
    );
    assert_eq!(
        Unsigned3Bit::truncating(5).checked_sub(Unsigned3Bit::truncating(2)),
        Some(Unsigned3Bit::truncating(3))
    );
}

#[test]
fn test_not_stays_in_range() {
    assert_octal_eq!(!Unsigned6Bit::ZERO, 0o77_u8);
    assert_octal_eq!(!Unsigned24Bit::MAX, 0_u32);
}

#[test]
fn test_bitor_masks() {
    assert_octal_eq!(Unsigned6Bit::ZERO | 0o377_u8, 0o77_u8);
    assert_octal_eq!(
        Unsigned36Bit::from(0o10_u8) | Unsigned36Bit::from(0o1_u8),
        0o11_u64
    );
}

#[test]
fn test_widening() {
    let ring = Unsigned3Bit::truncating(5);
    assert_eq!(u32::from(Unsigned18Bit::from(ring)), 5);
    let segno = Unsigned15Bit::MAX;
    assert_eq!(u64::from(Unsigned36Bit::from(segno)), 0o77777);
    assert_eq!(
        u32::from(Unsigned24Bit::from(Unsigned18Bit::MAX)),
        0o777_777
    );
}

#[test]
fn test_compare_with_native() {
    let bound = Unsigned14Bit::truncating(0o100);
    assert!(bound < 0o101_u32);
    assert!(bound > 0o77_u32);
    // Values too wide for the type always compare greater.
    assert!(bound < 0o1_000_000_u32);
    assert_eq!(bound, 0o100_u32);
    assert_ne!(bound, 0o1_000_100_u32);
}

#[test]
fn test_display_is_octal() {
    assert_eq!(Unsigned15Bit::truncating(0o1234).to_string(), "1234");
    assert_eq!(
        format!("{:?}", Unsigned3Bit::truncating(6)),
        "Unsigned3Bit{bits: 0o6}"
    );
}

mod u3_proptests {
    use super::super::Unsigned3Bit;
    use test_strategy::{proptest, Arbitrary};

    #[derive(Debug, Arbitrary)]
    struct RingPair {
        #[strategy(0..8u8)]
        greater: u8,
        #[strategy(0..=#greater)]
        lesser: u8,
    }

    #[proptest]
    fn ordering_matches_native(input: RingPair) {
        let g = Unsigned3Bit::try_from(input.greater).expect("strategy keeps this in range");
        let l = Unsigned3Bit::try_from(input.lesser).expect("strategy keeps this in range");
        assert!(l <= g);
        assert_eq!(l.max(g), g);
    }

    #[proptest]
    fn checked_sub_never_underflows(input: RingPair) {
        let g = Unsigned3Bit::try_from(input.greater).expect("strategy keeps this in range");
        let l = Unsigned3Bit::try_from(input.lesser).expect("strategy keeps this in range");
        let diff = g.checked_sub(l).expect("lesser <= greater");
        assert_eq!(u8::from(diff), input.greater - input.lesser);
    }
}

mod u36_proptests {
    use super::super::{Unsigned24Bit, Unsigned36Bit};
    use test_strategy::proptest;

    #[proptest]
    fn truncating_keeps_low_bits(n: u64) {
        assert_eq!(u64::from(Unsigned36Bit::truncating(n)), n & 0o777_777_777_777);
        assert_eq!(u32::from(Unsigned24Bit::truncating(n)), (n & 0o77_777_777) as u32);
    }

    #[proptest]
    fn shift_right_matches_native(#[strategy(0..(1u64 << 36))] n: u64, #[strategy(0..40u32)] by: u32) {
        let w = Unsigned36Bit::try_from(n).expect("strategy keeps this in range");
        assert_eq!(u64::from(w >> by), n.checked_shr(by).unwrap_or(0));
    }
}
