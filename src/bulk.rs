//! Bulk vectorized loop.
//!
//! Each iteration moves 8 registers with aligned non-temporal loads and
//! stores, so one step is 128, 256 or 512 bytes depending on the width.
//! After the main loop, blocks of 4, 2 and 1 registers consume the remainder
//! until less than one register is left; the small or mid handler finishes
//! that tail with ordinary unaligned accesses.
//!
//! Every block issues all of its loads before any of its stores. Together
//! with the traversal order this makes the copy memmove-safe:
//!
//! - [`Direction::Forward`] walks up from the base. Correct when the regions
//!   are disjoint or when `dest < src`.
//! - [`Direction::Backward`] first finishes the sub-register tail at the top,
//!   then walks blocks down from `n - step` to the base. Required when
//!   `src < dest < src + n`.
//!
//! A store fence closes every non-temporal run before returning.
//!
//! # Safety
//!
//! Base addresses must be aligned to the register width of the run. The
//! routines do not check it.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use core::arch::x86_64::*;

use crate::caps::Width;
use crate::mid::{MID_LIMIT, copy_mid, zero_mid};
use crate::small::{SMALL_LIMIT, copy_small, zero_small};
use crate::tier::Direction;

macro_rules! bulk_width {
    (
        feature = $feature:literal,
        reg = $reg:ty,
        load = $load:path,
        store = $store:path,
        zero = $zero:path,
        copy_forward = $copy_fwd:ident,
        copy_backward = $copy_bwd:ident,
        zero_forward = $zero_fwd:ident $(,)?
    ) => {
        /// Copies the largest register multiple of `n` upwards and returns
        /// how many bytes were moved.
        #[target_feature(enable = $feature)]
        unsafe fn $copy_fwd(dest: *mut u8, src: *const u8, n: usize) -> usize {
            const W: usize = core::mem::size_of::<$reg>();
            let mut d = dest;
            let mut s = src;
            let mut rem = n;

            while rem >= 8 * W {
                let v0: $reg = $load(s.cast());
                let v1: $reg = $load(s.add(W).cast());
                let v2: $reg = $load(s.add(2 * W).cast());
                let v3: $reg = $load(s.add(3 * W).cast());
                let v4: $reg = $load(s.add(4 * W).cast());
                let v5: $reg = $load(s.add(5 * W).cast());
                let v6: $reg = $load(s.add(6 * W).cast());
                let v7: $reg = $load(s.add(7 * W).cast());
                $store(d.cast(), v0);
                $store(d.add(W).cast(), v1);
                $store(d.add(2 * W).cast(), v2);
                $store(d.add(3 * W).cast(), v3);
                $store(d.add(4 * W).cast(), v4);
                $store(d.add(5 * W).cast(), v5);
                $store(d.add(6 * W).cast(), v6);
                $store(d.add(7 * W).cast(), v7);
                d = d.add(8 * W);
                s = s.add(8 * W);
                rem -= 8 * W;
            }

            if rem >= 4 * W {
                let v0: $reg = $load(s.cast());
                let v1: $reg = $load(s.add(W).cast());
                let v2: $reg = $load(s.add(2 * W).cast());
                let v3: $reg = $load(s.add(3 * W).cast());
                $store(d.cast(), v0);
                $store(d.add(W).cast(), v1);
                $store(d.add(2 * W).cast(), v2);
                $store(d.add(3 * W).cast(), v3);
                d = d.add(4 * W);
                s = s.add(4 * W);
                rem -= 4 * W;
            }

            if rem >= 2 * W {
                let v0: $reg = $load(s.cast());
                let v1: $reg = $load(s.add(W).cast());
                $store(d.cast(), v0);
                $store(d.add(W).cast(), v1);
                d = d.add(2 * W);
                s = s.add(2 * W);
                rem -= 2 * W;
            }

            if rem >= W {
                let v0: $reg = $load(s.cast());
                $store(d.cast(), v0);
                rem -= W;
            }

            _mm_sfence();
            n - rem
        }

        /// Copies `n` bytes downwards. `n` must be a register multiple.
        #[target_feature(enable = $feature)]
        unsafe fn $copy_bwd(dest: *mut u8, src: *const u8, n: usize) {
            const W: usize = core::mem::size_of::<$reg>();
            debug_assert!(n % W == 0);
            let mut rem = n;

            while rem >= 8 * W {
                rem -= 8 * W;
                let s = src.add(rem);
                let d = dest.add(rem);
                let v0: $reg = $load(s.cast());
                let v1: $reg = $load(s.add(W).cast());
                let v2: $reg = $load(s.add(2 * W).cast());
                let v3: $reg = $load(s.add(3 * W).cast());
                let v4: $reg = $load(s.add(4 * W).cast());
                let v5: $reg = $load(s.add(5 * W).cast());
                let v6: $reg = $load(s.add(6 * W).cast());
                let v7: $reg = $load(s.add(7 * W).cast());
                $store(d.add(7 * W).cast(), v7);
                $store(d.add(6 * W).cast(), v6);
                $store(d.add(5 * W).cast(), v5);
                $store(d.add(4 * W).cast(), v4);
                $store(d.add(3 * W).cast(), v3);
                $store(d.add(2 * W).cast(), v2);
                $store(d.add(W).cast(), v1);
                $store(d.cast(), v0);
            }

            if rem >= 4 * W {
                rem -= 4 * W;
                let s = src.add(rem);
                let d = dest.add(rem);
                let v0: $reg = $load(s.cast());
                let v1: $reg = $load(s.add(W).cast());
                let v2: $reg = $load(s.add(2 * W).cast());
                let v3: $reg = $load(s.add(3 * W).cast());
                $store(d.add(3 * W).cast(), v3);
                $store(d.add(2 * W).cast(), v2);
                $store(d.add(W).cast(), v1);
                $store(d.cast(), v0);
            }

            if rem >= 2 * W {
                rem -= 2 * W;
                let s = src.add(rem);
                let d = dest.add(rem);
                let v0: $reg = $load(s.cast());
                let v1: $reg = $load(s.add(W).cast());
                $store(d.add(W).cast(), v1);
                $store(d.cast(), v0);
            }

            if rem >= W {
                rem -= W;
                let v0: $reg = $load(src.add(rem).cast());
                $store(dest.add(rem).cast(), v0);
            }

            debug_assert_eq!(rem, 0);
            _mm_sfence();
        }

        /// Clears the largest register multiple of `n` and returns how many
        /// bytes were cleared.
        #[target_feature(enable = $feature)]
        unsafe fn $zero_fwd(dest: *mut u8, n: usize) -> usize {
            const W: usize = core::mem::size_of::<$reg>();
            let z: $reg = $zero();
            let mut d = dest;
            let mut rem = n;

            while rem >= 8 * W {
                $store(d.cast(), z);
                $store(d.add(W).cast(), z);
                $store(d.add(2 * W).cast(), z);
                $store(d.add(3 * W).cast(), z);
                $store(d.add(4 * W).cast(), z);
                $store(d.add(5 * W).cast(), z);
                $store(d.add(6 * W).cast(), z);
                $store(d.add(7 * W).cast(), z);
                d = d.add(8 * W);
                rem -= 8 * W;
            }

            if rem >= 4 * W {
                $store(d.cast(), z);
                $store(d.add(W).cast(), z);
                $store(d.add(2 * W).cast(), z);
                $store(d.add(3 * W).cast(), z);
                d = d.add(4 * W);
                rem -= 4 * W;
            }

            if rem >= 2 * W {
                $store(d.cast(), z);
                $store(d.add(W).cast(), z);
                d = d.add(2 * W);
                rem -= 2 * W;
            }

            if rem >= W {
                $store(d.cast(), z);
                rem -= W;
            }

            _mm_sfence();
            n - rem
        }
    };
}

bulk_width! {
    feature = "sse4.1",
    reg = __m128i,
    load = _mm_stream_load_si128,
    store = _mm_stream_si128,
    zero = _mm_setzero_si128,
    copy_forward = copy_forward_128,
    copy_backward = copy_backward_128,
    zero_forward = zero_forward_128,
}

bulk_width! {
    feature = "avx2",
    reg = __m256i,
    load = _mm256_stream_load_si256,
    store = _mm256_stream_si256,
    zero = _mm256_setzero_si256,
    copy_forward = copy_forward_256,
    copy_backward = copy_backward_256,
    zero_forward = zero_forward_256,
}

bulk_width! {
    feature = "avx512f",
    reg = __m512i,
    load = _mm512_stream_load_si512,
    store = _mm512_stream_si512,
    zero = _mm512_setzero_si512,
    copy_forward = copy_forward_512,
    copy_backward = copy_backward_512,
    zero_forward = zero_forward_512,
}

/// Copies a sub-register tail with the mid or small handler.
#[inline(always)]
unsafe fn copy_tail(dest: *mut u8, src: *const u8, n: usize, width: Width) {
    debug_assert!(n < width.bytes());
    if n >= SMALL_LIMIT {
        debug_assert!(n < MID_LIMIT);
        // Only a 512-bit run leaves 32+ bytes, and AVX-512F implies AVX2.
        copy_mid(dest, src, n, width == Width::W512);
    } else if n > 0 {
        copy_small(dest, src, n);
    }
}

#[inline(always)]
unsafe fn zero_tail(dest: *mut u8, n: usize, width: Width) {
    debug_assert!(n < width.bytes());
    if n >= SMALL_LIMIT {
        zero_mid(dest, n, width == Width::W512);
    } else if n > 0 {
        zero_small(dest, n);
    }
}

/// Copies `n` bytes in the given direction at the given register width.
///
/// # Safety
///
/// - `src` readable and `dest` writable for `n` bytes
/// - both base addresses aligned to `width.bytes()`
/// - the CPU supports `width` (see [`crate::Caps`])
/// - `Direction::Forward` requires `dest <= src` or disjoint regions;
///   `Direction::Backward` requires `dest >= src` or disjoint regions
pub unsafe fn copy(dest: *mut u8, src: *const u8, n: usize, width: Width, dir: Direction) {
    match dir {
        Direction::Forward => {
            let done = match width {
                Width::W128 => copy_forward_128(dest, src, n),
                Width::W256 => copy_forward_256(dest, src, n),
                Width::W512 => copy_forward_512(dest, src, n),
            };
            copy_tail(dest.add(done), src.add(done), n - done, width);
        }
        Direction::Backward => {
            let body = n - n % width.bytes();
            copy_tail(dest.add(body), src.add(body), n - body, width);
            match width {
                Width::W128 => copy_backward_128(dest, src, body),
                Width::W256 => copy_backward_256(dest, src, body),
                Width::W512 => copy_backward_512(dest, src, body),
            }
        }
    }
}

/// Clears `n` bytes at the given register width.
///
/// # Safety
///
/// - `dest` writable for `n` bytes and aligned to `width.bytes()`
/// - the CPU supports `width`
pub unsafe fn zero(dest: *mut u8, n: usize, width: Width) {
    let done = match width {
        Width::W128 => zero_forward_128(dest, n),
        Width::W256 => zero_forward_256(dest, n),
        Width::W512 => zero_forward_512(dest, n),
    };
    zero_tail(dest.add(done), n - done, width);
}
