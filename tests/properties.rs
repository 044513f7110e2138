//! Property tests for the tiered copy/zero engine.
//!
//! Every tier, on every capability level the host can run, must agree with
//! `core::ptr::copy` / `slice::fill(0)` byte for byte.

use proptest::prelude::*;
use tiercopy::{AlignedBuf, Caps, Engine, Tier};

// =============================================================================
// GENERATORS
// =============================================================================

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Align16), Just(Tier::Align32), Just(Tier::Align64)]
}

fn engine_strategy() -> impl Strategy<Value = Engine> {
    prop_oneof![
        Just(Engine::detected()),
        Just(Engine::with_caps(Caps::new(true, true, true, false))),
        Just(Engine::with_caps(Caps::new(true, true, false, false))),
        Just(Engine::with_caps(Caps::new(true, false, false, false))),
        Just(Engine::with_caps(Caps::SCALAR)),
    ]
}

/// Lengths biased toward the size-class edges.
fn len_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        0usize..32,
        32usize..64,
        64usize..600,
        prop::sample::select(vec![127usize, 128, 129, 255, 256, 511, 512, 1023, 1024, 4096]),
        600usize..6000,
    ]
}

fn filled(len: usize, seed: u8) -> AlignedBuf {
    let mut buf = AlignedBuf::new(len, Tier::Align64).unwrap();
    for (i, b) in buf.iter_mut().enumerate() {
        *b = ((i % 241) as u8).wrapping_mul(3).wrapping_add(seed);
    }
    buf
}

// =============================================================================
// COPY
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_copy_writes_exactly_min_len(
        engine in engine_strategy(),
        tier in tier_strategy(),
        src_len in len_strategy(),
        dst_len in len_strategy(),
        seed in any::<u8>(),
    ) {
        let src = filled(src_len + 64, seed);
        let src_before = src.to_vec();
        let mut dst = AlignedBuf::new(dst_len + 64, Tier::Align64).unwrap();
        dst.fill(0x5A);

        let copied = unsafe {
            engine.copy_raw(tier, src.as_ptr(), src_len, dst.as_mut_ptr(), dst_len)
        };
        let n = src_len.min(dst_len);

        prop_assert_eq!(copied, n);
        prop_assert_eq!(&dst[..n], &src[..n]);
        prop_assert!(dst[n..].iter().all(|&b| b == 0x5A));
        prop_assert_eq!(&*src, &src_before[..]);
    }

    #[test]
    fn prop_overlapping_copy_matches_memmove(
        engine in engine_strategy(),
        tier in tier_strategy(),
        len in len_strategy(),
        shift_units in 0usize..40,
        upward in any::<bool>(),
    ) {
        let delta = shift_units * tier.bytes();
        let mut got = filled(len + delta + 64, 11);
        let mut expected = got.to_vec();

        let (src, dst) = if upward { (0, delta) } else { (delta, 0) };
        let moved = engine.copy_within(tier, &mut got, src..src + len, dst).unwrap();
        expected.copy_within(src..src + len, dst);

        prop_assert_eq!(moved, len);
        prop_assert_eq!(&*got, &expected[..]);
    }

    #[test]
    fn prop_scalar_fallback_matches_memmove(
        len in 0usize..700,
        src_off in 0usize..100,
        dst_off in 0usize..100,
    ) {
        let mut got: Vec<u8> = (0..900).map(|i| (i % 253) as u8).collect();
        let mut expected = got.clone();
        unsafe {
            let p = got.as_mut_ptr();
            tiercopy::copy(p.add(src_off), len, p.add(dst_off), len);
        }
        expected.copy_within(src_off..src_off + len, dst_off);
        prop_assert_eq!(got, expected);
    }
}

// =============================================================================
// ZERO
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_zero_clears_exactly_len(
        engine in engine_strategy(),
        tier in tier_strategy(),
        len in len_strategy(),
    ) {
        let mut buf = filled(len + 64, 1);
        for b in buf.iter_mut() {
            *b |= 0x80;
        }
        unsafe { engine.zero_raw(tier, buf.as_mut_ptr(), len) };
        prop_assert!(buf[..len].iter().all(|&b| b == 0));
        prop_assert!(buf[len..].iter().all(|&b| b & 0x80 != 0));
    }

    #[test]
    fn prop_zero_is_idempotent(
        engine in engine_strategy(),
        tier in tier_strategy(),
        len in len_strategy(),
    ) {
        let mut buf = filled(len, 9);
        engine.zero(tier, &mut buf).unwrap();
        let once = buf.to_vec();
        engine.zero(tier, &mut buf).unwrap();
        prop_assert_eq!(&*buf, &once[..]);
    }
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_disjoint_regions_from_many_threads() {
    let engine = Engine::detected();
    let chunk = 64 * 1024;
    let src = filled(chunk * 8, 42);
    let mut dst = AlignedBuf::new(chunk * 8, Tier::Align64).unwrap();

    std::thread::scope(|s| {
        for (src_part, dst_part) in src.chunks(chunk).zip(dst.chunks_mut(chunk)) {
            s.spawn(move || {
                assert_eq!(engine.copy(Tier::Align64, src_part, dst_part), Ok(chunk));
            });
        }
    });

    assert_eq!(&*dst, &*src);
}
