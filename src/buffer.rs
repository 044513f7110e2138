//! # AlignedBuf
//!
//! Owning, zero-initialised heap buffer whose base address is aligned to a
//! [`Tier`].
//!
//! The engine itself never allocates. This type sits above it: it owns the
//! memory, knows the alignment it allocated with, and therefore knows which
//! tier entry point is safe to call on itself.
#![allow(unsafe_code)]

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::scalar;
use crate::tier::{Tier, engine};

/// Heap buffer aligned to 16, 32 or 64 bytes.
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    len: usize,
    tier: Tier,
}

// SAFETY: AlignedBuf uniquely owns its allocation, like Box<[u8]>.
unsafe impl Send for AlignedBuf {}
// SAFETY: shared access only hands out &[u8].
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// Allocates `len` zeroed bytes aligned to `tier`.
    ///
    /// A zero-length buffer allocates nothing but still reports an aligned
    /// base address.
    pub fn new(len: usize, tier: Tier) -> Result<Self> {
        let align = tier.bytes();
        if len == 0 {
            let ptr = NonNull::new(std::ptr::without_provenance_mut::<u8>(align))
                .ok_or(Error::Layout { len, align })?;
            return Ok(AlignedBuf { ptr, len, tier });
        }

        let layout = Layout::from_size_align(len, align).map_err(|_| Error::Layout { len, align })?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(Error::AllocFailed { len, align })?;
        tracing::trace!(len, align, "aligned buffer allocated");
        Ok(AlignedBuf { ptr, len, tier })
    }

    /// Allocates a buffer aligned to `tier` holding a copy of `data`.
    pub fn from_slice(data: &[u8], tier: Tier) -> Result<Self> {
        let mut buf = AlignedBuf::new(data.len(), tier)?;
        buf.copy_from(data);
        Ok(buf)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment the buffer was allocated with.
    #[inline]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Copies `min(src.len(), self.len())` bytes from `src` into the start
    /// of the buffer and returns the count.
    ///
    /// Runs at the widest tier both sides satisfy, or the scalar fallback
    /// if `src` is not even 16-byte aligned.
    pub fn copy_from(&mut self, src: &[u8]) -> usize {
        match Tier::of(src.as_ptr()) {
            Some(src_tier) => {
                let tier = self.tier.min(src_tier);
                // SAFETY: both regions are live for their lengths and both
                // base addresses satisfy `tier`.
                unsafe {
                    engine().copy_raw(tier, src.as_ptr(), src.len(), self.as_mut_ptr(), self.len)
                }
            }
            None => scalar::copy_slice(src, self),
        }
    }

    /// Clears the whole buffer.
    pub fn zero(&mut self) {
        let tier = self.tier;
        let len = self.len;
        // SAFETY: the allocation is `len` bytes long and aligned to `tier`.
        unsafe { engine().zero_raw(tier, self.as_mut_ptr(), len) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: same size and alignment that `new` validated and allocated with.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.len, self.tier.bytes());
            dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        // SAFETY: `ptr` is valid (or dangling-aligned for len 0) for `len` initialised bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuf {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `deref`, and `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.len)
            .field("tier", &self.tier)
            .finish()
    }
}
