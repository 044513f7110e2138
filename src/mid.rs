//! Mid-range handler (32-63 bytes).
//!
//! Exact 32 and 48 are covered by whole, non-overlapping writes. Other
//! lengths use a 32-byte head window at 0 and a 32-byte tail window at
//! `n - 32`. With 256-bit support each window is one register, otherwise two
//! 16-byte registers. Loads always complete before stores.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use core::arch::x86_64::*;

/// Upper bound (exclusive) of the mid band.
pub const MID_LIMIT: usize = 64;

/// Copies `32 <= n < 64` bytes, memmove-safe.
///
/// # Safety
///
/// - `32 <= n < 64`
/// - `src` readable and `dest` writable for `n` bytes
/// - if `wide`, AVX2 must be available
#[inline(always)]
pub unsafe fn copy_mid(dest: *mut u8, src: *const u8, n: usize, wide: bool) {
    debug_assert!((32..MID_LIMIT).contains(&n));
    if wide {
        copy_mid_avx2(dest, src, n);
    } else {
        copy_mid_sse2(dest, src, n);
    }
}

/// Clears `32 <= n < 64` bytes.
///
/// # Safety
///
/// - `32 <= n < 64`
/// - `dest` writable for `n` bytes
/// - if `wide`, AVX2 must be available
#[inline(always)]
pub unsafe fn zero_mid(dest: *mut u8, n: usize, wide: bool) {
    debug_assert!((32..MID_LIMIT).contains(&n));
    if wide {
        zero_mid_avx2(dest, n);
    } else {
        zero_mid_sse2(dest, n);
    }
}

#[inline(always)]
unsafe fn copy_mid_sse2(dest: *mut u8, src: *const u8, n: usize) {
    match n {
        32 => {
            let v0 = _mm_loadu_si128(src as *const __m128i);
            let v1 = _mm_loadu_si128(src.add(16) as *const __m128i);
            _mm_storeu_si128(dest as *mut __m128i, v0);
            _mm_storeu_si128(dest.add(16) as *mut __m128i, v1);
        }
        48 => {
            let v0 = _mm_loadu_si128(src as *const __m128i);
            let v1 = _mm_loadu_si128(src.add(16) as *const __m128i);
            let v2 = _mm_loadu_si128(src.add(32) as *const __m128i);
            _mm_storeu_si128(dest as *mut __m128i, v0);
            _mm_storeu_si128(dest.add(16) as *mut __m128i, v1);
            _mm_storeu_si128(dest.add(32) as *mut __m128i, v2);
        }
        _ => {
            let v0 = _mm_loadu_si128(src as *const __m128i);
            let v1 = _mm_loadu_si128(src.add(16) as *const __m128i);
            let v2 = _mm_loadu_si128(src.add(n - 32) as *const __m128i);
            let v3 = _mm_loadu_si128(src.add(n - 16) as *const __m128i);
            _mm_storeu_si128(dest as *mut __m128i, v0);
            _mm_storeu_si128(dest.add(16) as *mut __m128i, v1);
            _mm_storeu_si128(dest.add(n - 32) as *mut __m128i, v2);
            _mm_storeu_si128(dest.add(n - 16) as *mut __m128i, v3);
        }
    }
}

#[target_feature(enable = "avx2")]
unsafe fn copy_mid_avx2(dest: *mut u8, src: *const u8, n: usize) {
    match n {
        32 => {
            let v = _mm256_loadu_si256(src as *const __m256i);
            _mm256_storeu_si256(dest as *mut __m256i, v);
        }
        48 => {
            let v0 = _mm256_loadu_si256(src as *const __m256i);
            let v1 = _mm_loadu_si128(src.add(32) as *const __m128i);
            _mm256_storeu_si256(dest as *mut __m256i, v0);
            _mm_storeu_si128(dest.add(32) as *mut __m128i, v1);
        }
        _ => {
            let v0 = _mm256_loadu_si256(src as *const __m256i);
            let v1 = _mm256_loadu_si256(src.add(n - 32) as *const __m256i);
            _mm256_storeu_si256(dest as *mut __m256i, v0);
            _mm256_storeu_si256(dest.add(n - 32) as *mut __m256i, v1);
        }
    }
}

#[inline(always)]
unsafe fn zero_mid_sse2(dest: *mut u8, n: usize) {
    let z = _mm_setzero_si128();
    _mm_storeu_si128(dest as *mut __m128i, z);
    _mm_storeu_si128(dest.add(16) as *mut __m128i, z);
    match n {
        32 => {}
        48 => _mm_storeu_si128(dest.add(32) as *mut __m128i, z),
        _ => {
            _mm_storeu_si128(dest.add(n - 32) as *mut __m128i, z);
            _mm_storeu_si128(dest.add(n - 16) as *mut __m128i, z);
        }
    }
}

#[target_feature(enable = "avx2")]
unsafe fn zero_mid_avx2(dest: *mut u8, n: usize) {
    let z = _mm256_setzero_si256();
    _mm256_storeu_si256(dest as *mut __m256i, z);
    match n {
        32 => {}
        48 => _mm_storeu_si128(dest.add(32) as *mut __m128i, _mm_setzero_si128()),
        _ => _mm256_storeu_si256(dest.add(n - 32) as *mut __m256i, z),
    }
}
