//! Tier dispatcher.
//!
//! One entry point per (alignment tier, operation). The dispatcher computes
//! the effective length, picks the small, mid or bulk handler by size class,
//! and for bulk copies picks the traversal direction from the overlap
//! relation.
//!
//! | length   | 16-byte tier | 32/64-byte tier |
//! |----------|--------------|-----------------|
//! | 1-31     | small        | small           |
//! | 32-63    | bulk         | mid             |
//! | 64+      | bulk         | bulk            |
//!
//! The raw entry points trust the caller's alignment promise. The slice entry
//! points on [`Engine`] check it and report [`Error::Misaligned`] instead.
#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]

use core::ops::Range;

use crate::caps::{self, Caps};
use crate::error::{Error, Result};
use crate::scalar;

#[cfg(target_arch = "x86_64")]
use crate::{
    bulk,
    mid::{MID_LIMIT, copy_mid, zero_mid},
    small::{SMALL_LIMIT, copy_small, zero_small},
};

/// Alignment the caller guarantees for every base address it passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// 16-byte aligned
    Align16,
    /// 32-byte aligned
    Align32,
    /// 64-byte aligned
    Align64,
}

impl Tier {
    /// Guaranteed alignment in bytes.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Tier::Align16 => 16,
            Tier::Align32 => 32,
            Tier::Align64 => 64,
        }
    }

    /// Whether `addr` meets this tier.
    #[inline]
    pub fn admits(self, addr: *const u8) -> bool {
        (addr as usize) & (self.bytes() - 1) == 0
    }

    /// Widest tier `addr` meets, if any.
    pub fn of(addr: *const u8) -> Option<Tier> {
        [Tier::Align64, Tier::Align32, Tier::Align16]
            .into_iter()
            .find(|t| t.admits(addr))
    }

    fn check(self, addr: *const u8) -> Result<()> {
        if self.admits(addr) {
            Ok(())
        } else {
            Err(Error::Misaligned {
                addr: addr as usize,
                required: self.bytes(),
            })
        }
    }
}

/// Traversal order of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending addresses.
    Forward,
    /// Descending addresses.
    Backward,
}

impl Direction {
    /// Direction that keeps a copy of `n` bytes from `src` to `dest` correct.
    ///
    /// Backward only when `dest` lies strictly inside `(src, src + n)`. The
    /// test uses a wrapping distance, so it cannot overflow near the top of
    /// the address space.
    #[inline]
    pub fn for_copy(dest: *const u8, src: *const u8, n: usize) -> Direction {
        let distance = (dest as usize).wrapping_sub(src as usize);
        if distance != 0 && distance < n {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

/// Copy/zero engine bound to a capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    caps: Caps,
}

impl Engine {
    /// Engine using the process-wide probed capabilities.
    #[inline]
    pub fn detected() -> Self {
        Engine { caps: caps::caps() }
    }

    /// Engine using `caps`, limited to what the host actually supports.
    pub fn with_caps(caps: Caps) -> Self {
        Engine {
            caps: caps.restrict(caps::caps()),
        }
    }

    /// Capability set this engine dispatches on.
    #[inline]
    pub fn caps(&self) -> Caps {
        self.caps
    }

    /// Copies `min(src_len, dst_len)` bytes with memmove semantics and
    /// returns the number of bytes copied.
    ///
    /// # Safety
    ///
    /// - `src` readable for `src_len` bytes, `dst` writable for `dst_len`
    /// - both addresses aligned to `tier.bytes()`
    /// - regions may overlap
    pub unsafe fn copy_raw(
        &self,
        tier: Tier,
        src: *const u8,
        src_len: usize,
        dst: *mut u8,
        dst_len: usize,
    ) -> usize {
        let n = src_len.min(dst_len);
        if n == 0 || core::ptr::eq(src, dst as *const u8) {
            return n;
        }
        self.dispatch_copy(tier, dst, src, n);
        n
    }

    /// Clears `len` bytes at `dst`.
    ///
    /// # Safety
    ///
    /// - `dst` writable for `len` bytes and aligned to `tier.bytes()`
    pub unsafe fn zero_raw(&self, tier: Tier, dst: *mut u8, len: usize) {
        if len == 0 {
            return;
        }
        self.dispatch_zero(tier, dst, len);
    }

    #[cfg(target_arch = "x86_64")]
    #[inline]
    unsafe fn dispatch_copy(&self, tier: Tier, dest: *mut u8, src: *const u8, n: usize) {
        if n < SMALL_LIMIT {
            copy_small(dest, src, n);
            return;
        }
        if tier != Tier::Align16 && n < MID_LIMIT {
            copy_mid(dest, src, n, self.caps.has256());
            return;
        }
        match self.caps.width_for(tier) {
            Some(width) => {
                let dir = Direction::for_copy(dest, src, n);
                bulk::copy(dest, src, n, width, dir);
            }
            None => scalar::copy_bytes(dest, src, n),
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[inline]
    unsafe fn dispatch_zero(&self, tier: Tier, dest: *mut u8, n: usize) {
        if n < SMALL_LIMIT {
            zero_small(dest, n);
            return;
        }
        if tier != Tier::Align16 && n < MID_LIMIT {
            zero_mid(dest, n, self.caps.has256());
            return;
        }
        match self.caps.width_for(tier) {
            Some(width) => bulk::zero(dest, n, width),
            None => scalar::zero(dest, n),
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[inline]
    unsafe fn dispatch_copy(&self, _tier: Tier, dest: *mut u8, src: *const u8, n: usize) {
        scalar::copy_bytes(dest, src, n);
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[inline]
    unsafe fn dispatch_zero(&self, _tier: Tier, dest: *mut u8, n: usize) {
        scalar::zero(dest, n);
    }

    /// Copies `min(src.len(), dst.len())` bytes after checking that both
    /// slices meet `tier`.
    ///
    /// # Examples
    /// ```
    /// use tiercopy::{AlignedBuf, Engine, Tier};
    ///
    /// let mut src = AlignedBuf::new(100, Tier::Align32).unwrap();
    /// src.fill(9);
    /// let mut dst = AlignedBuf::new(64, Tier::Align32).unwrap();
    /// let n = Engine::detected().copy(Tier::Align32, &src, &mut dst).unwrap();
    /// assert_eq!(n, 64);
    /// assert!(dst.iter().all(|&b| b == 9));
    /// ```
    pub fn copy(&self, tier: Tier, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        if src.is_empty() || dst.is_empty() {
            return Ok(0);
        }
        tier.check(src.as_ptr())?;
        tier.check(dst.as_ptr())?;
        // SAFETY: slices are live for their lengths and alignment was checked.
        Ok(unsafe { self.copy_raw(tier, src.as_ptr(), src.len(), dst.as_mut_ptr(), dst.len()) })
    }

    /// Clears `dst` after checking that it meets `tier`.
    pub fn zero(&self, tier: Tier, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        tier.check(dst.as_ptr())?;
        // SAFETY: slice is live for its length and alignment was checked.
        unsafe { self.zero_raw(tier, dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    /// Moves `buf[src]` to `buf[dest..]`, which may overlap, and returns the
    /// number of bytes moved.
    ///
    /// Both `buf[src.start..]` and `buf[dest..]` must meet `tier`.
    pub fn copy_within(
        &self,
        tier: Tier,
        buf: &mut [u8],
        src: Range<usize>,
        dest: usize,
    ) -> Result<usize> {
        let len = buf.len();
        if src.start > src.end || src.end > len {
            return Err(Error::OutOfBounds {
                start: src.start,
                end: src.end,
                len,
            });
        }
        let n = src.end - src.start;
        let dest_end = dest.checked_add(n).filter(|&end| end <= len).ok_or(
            Error::OutOfBounds {
                start: dest,
                end: dest.saturating_add(n),
                len,
            },
        )?;
        if n == 0 {
            return Ok(0);
        }

        let base = buf.as_mut_ptr();
        // SAFETY: both offsets were bounds-checked against `buf`.
        let (s, d) = unsafe { (base.add(src.start), base.add(dest)) };
        tier.check(s)?;
        tier.check(d)?;
        // SAFETY: both ranges lie inside `buf` and alignment was checked.
        Ok(unsafe { self.copy_raw(tier, s, n, d, dest_end - dest) })
    }
}

/// Process-wide engine using the probed capabilities.
#[inline]
pub fn engine() -> Engine {
    Engine::detected()
}

macro_rules! tier_entry {
    ($copy:ident, $zero:ident, $tier:expr, $bytes:literal) => {
        #[doc = concat!("Copies `min(src_len, dst_len)` bytes between ", $bytes, "-byte aligned regions.")]
        ///
        /// # Safety
        ///
        /// See [`Engine::copy_raw`].
        #[inline]
        pub unsafe fn $copy(src: *const u8, src_len: usize, dst: *mut u8, dst_len: usize) -> usize {
            engine().copy_raw($tier, src, src_len, dst, dst_len)
        }

        #[doc = concat!("Clears `len` bytes of a ", $bytes, "-byte aligned region.")]
        ///
        /// # Safety
        ///
        /// See [`Engine::zero_raw`].
        #[inline]
        pub unsafe fn $zero(dst: *mut u8, len: usize) {
            engine().zero_raw($tier, dst, len)
        }
    };
}

tier_entry!(copy16, zero16, Tier::Align16, "16");
tier_entry!(copy32, zero32, Tier::Align32, "32");
tier_entry!(copy64, zero64, Tier::Align64, "64");
