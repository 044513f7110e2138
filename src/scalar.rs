//! Alignment-agnostic copy and zero.
//!
//! Used by callers that cannot promise more than byte alignment, by the tier
//! dispatcher when no vector width is usable, and on targets without the
//! vector paths. Moves 8-byte words with unaligned accesses, then bytes.

#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use core::ptr::{read_unaligned, write_unaligned};

use crate::tier::Direction;

const WORD: usize = core::mem::size_of::<u64>();

/// Copies `min(src_len, dst_len)` bytes from `src` to `dst` with memmove
/// semantics and returns the number of bytes copied.
///
/// # Safety
///
/// - `src` readable for `src_len` bytes, `dst` writable for `dst_len` bytes
/// - regions may overlap
pub unsafe fn copy(src: *const u8, src_len: usize, dst: *mut u8, dst_len: usize) -> usize {
    let n = src_len.min(dst_len);
    if n == 0 || core::ptr::eq(src, dst as *const u8) {
        return n;
    }
    copy_bytes(dst, src, n);
    n
}

/// Clears `len` bytes at `dst`.
///
/// # Safety
///
/// - `dst` writable for `len` bytes
pub unsafe fn zero(dst: *mut u8, len: usize) {
    let mut i = 0;
    while i + WORD <= len {
        write_unaligned(dst.add(i) as *mut u64, 0);
        i += WORD;
    }
    while i < len {
        *dst.add(i) = 0;
        i += 1;
    }
}

/// Safe slice form of [`copy`]. Returns the number of bytes copied.
///
/// # Examples
/// ```
/// let mut dst = [0u8; 3];
/// assert_eq!(tiercopy::scalar::copy_slice(b"hello", &mut dst), 3);
/// assert_eq!(&dst, b"hel");
/// ```
pub fn copy_slice(src: &[u8], dst: &mut [u8]) -> usize {
    // SAFETY: both pointers come from live slices of the given lengths.
    unsafe { copy(src.as_ptr(), src.len(), dst.as_mut_ptr(), dst.len()) }
}

/// Safe slice form of [`zero`].
pub fn zero_slice(dst: &mut [u8]) {
    // SAFETY: the pointer comes from a live mutable slice of `dst.len()` bytes.
    unsafe { zero(dst.as_mut_ptr(), dst.len()) }
}

/// Copies `n` bytes in whichever direction the overlap requires.
#[inline]
pub(crate) unsafe fn copy_bytes(dest: *mut u8, src: *const u8, n: usize) {
    match Direction::for_copy(dest, src, n) {
        Direction::Forward => copy_forward(dest, src, n),
        Direction::Backward => copy_backward(dest, src, n),
    }
}

unsafe fn copy_forward(dest: *mut u8, src: *const u8, n: usize) {
    let mut i = 0;
    while i + WORD <= n {
        let w = read_unaligned(src.add(i) as *const u64);
        write_unaligned(dest.add(i) as *mut u64, w);
        i += WORD;
    }
    while i < n {
        *dest.add(i) = *src.add(i);
        i += 1;
    }
}

unsafe fn copy_backward(dest: *mut u8, src: *const u8, n: usize) {
    let mut i = n;
    while i >= WORD {
        i -= WORD;
        let w = read_unaligned(src.add(i) as *const u64);
        write_unaligned(dest.add(i) as *mut u64, w);
    }
    while i > 0 {
        i -= 1;
        *dest.add(i) = *src.add(i);
    }
}
