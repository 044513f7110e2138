//! Small-range handler (1-31 bytes).
//!
//! Powers of two move with a single access. Every other length uses two
//! fixed-width accesses, one anchored at the start and one at the end, whose
//! windows overlap in the middle. Both loads are issued before either store,
//! so the copy is correct for overlapping ranges in either direction.
//!
//! All accesses are unaligned: the tail anchor sits at `n - width` and is
//! never aligned in general, whatever tier the caller holds.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use core::arch::x86_64::*;
use core::ptr::{read_unaligned, write_unaligned};

/// Upper bound (exclusive) of the small band.
pub const SMALL_LIMIT: usize = 32;

/// Copies `n < 32` bytes from `src` to `dest`.
///
/// # Safety
///
/// - `n < 32`; `n == 0` is accepted as a no-op but callers guard it
/// - `src` readable and `dest` writable for `n` bytes
/// - Regions may overlap
#[inline(always)]
pub unsafe fn copy_small(dest: *mut u8, src: *const u8, n: usize) {
    debug_assert!(n < SMALL_LIMIT);

    match n {
        0 => {}
        1 => *dest = *src,
        2 => write_unaligned(dest as *mut u16, read_unaligned(src as *const u16)),
        3 => {
            let a = read_unaligned(src as *const u16);
            let b = read_unaligned(src.add(1) as *const u16);
            write_unaligned(dest as *mut u16, a);
            write_unaligned(dest.add(1) as *mut u16, b);
        }
        4 => write_unaligned(dest as *mut u32, read_unaligned(src as *const u32)),
        5..=7 => {
            let a = read_unaligned(src as *const u32);
            let b = read_unaligned(src.add(n - 4) as *const u32);
            write_unaligned(dest as *mut u32, a);
            write_unaligned(dest.add(n - 4) as *mut u32, b);
        }
        8 => write_unaligned(dest as *mut u64, read_unaligned(src as *const u64)),
        9..=15 => {
            let a = read_unaligned(src as *const u64);
            let b = read_unaligned(src.add(n - 8) as *const u64);
            write_unaligned(dest as *mut u64, a);
            write_unaligned(dest.add(n - 8) as *mut u64, b);
        }
        16 => {
            let v = _mm_loadu_si128(src as *const __m128i);
            _mm_storeu_si128(dest as *mut __m128i, v);
        }
        _ => {
            // 17-31: two 16-byte windows meeting somewhere in the middle.
            let v0 = _mm_loadu_si128(src as *const __m128i);
            let v1 = _mm_loadu_si128(src.add(n - 16) as *const __m128i);
            _mm_storeu_si128(dest as *mut __m128i, v0);
            _mm_storeu_si128(dest.add(n - 16) as *mut __m128i, v1);
        }
    }
}

/// Clears `n < 32` bytes at `dest`.
///
/// # Safety
///
/// - `n < 32`; `n == 0` is a no-op
/// - `dest` writable for `n` bytes
#[inline(always)]
pub unsafe fn zero_small(dest: *mut u8, n: usize) {
    debug_assert!(n < SMALL_LIMIT);

    match n {
        0 => {}
        1 => *dest = 0,
        2 => write_unaligned(dest as *mut u16, 0),
        3 => {
            write_unaligned(dest as *mut u16, 0);
            write_unaligned(dest.add(1) as *mut u16, 0);
        }
        4 => write_unaligned(dest as *mut u32, 0),
        5..=7 => {
            write_unaligned(dest as *mut u32, 0);
            write_unaligned(dest.add(n - 4) as *mut u32, 0);
        }
        8 => write_unaligned(dest as *mut u64, 0),
        9..=15 => {
            write_unaligned(dest as *mut u64, 0);
            write_unaligned(dest.add(n - 8) as *mut u64, 0);
        }
        16 => _mm_storeu_si128(dest as *mut __m128i, _mm_setzero_si128()),
        _ => {
            let z = _mm_setzero_si128();
            _mm_storeu_si128(dest as *mut __m128i, z);
            _mm_storeu_si128(dest.add(n - 16) as *mut __m128i, z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    #[test]
    fn test_copy_small_every_length() {
        let src = pattern(64);
        for n in 0..SMALL_LIMIT {
            for off in 0..8 {
                let mut dst = vec![0u8; 64];
                unsafe { copy_small(dst.as_mut_ptr().add(off), src.as_ptr(), n) };
                assert_eq!(&dst[off..off + n], &src[..n], "n={n} off={off}");
                assert!(dst[..off].iter().all(|&b| b == 0), "head clobbered n={n}");
                assert!(dst[off + n..].iter().all(|&b| b == 0), "tail clobbered n={n}");
            }
        }
    }

    #[test]
    fn test_copy_small_overlap_both_directions() {
        for n in 1..SMALL_LIMIT {
            for delta in 1..n.max(2) {
                let mut got = pattern(80);
                let mut expected = got.clone();
                unsafe {
                    copy_small(got.as_mut_ptr().add(delta), got.as_ptr(), n);
                    core::ptr::copy(expected.as_ptr(), expected.as_mut_ptr().add(delta), n);
                }
                assert_eq!(got, expected, "backward n={n} delta={delta}");

                let mut got = pattern(80);
                let mut expected = got.clone();
                unsafe {
                    copy_small(got.as_mut_ptr(), got.as_ptr().add(delta), n);
                    core::ptr::copy(expected.as_ptr().add(delta), expected.as_mut_ptr(), n);
                }
                assert_eq!(got, expected, "forward n={n} delta={delta}");
            }
        }
    }

    #[test]
    fn test_zero_small_every_length() {
        for n in 0..SMALL_LIMIT {
            let mut buf = vec![0xAAu8; 48];
            unsafe { zero_small(buf.as_mut_ptr().add(3), n) };
            assert!(buf[3..3 + n].iter().all(|&b| b == 0), "n={n}");
            assert!(buf[..3].iter().all(|&b| b == 0xAA));
            assert!(buf[3 + n..].iter().all(|&b| b == 0xAA), "n={n}");
        }
    }
}
