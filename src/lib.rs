//! tiercopy: alignment-tiered, width-adaptive bulk copy and zeroing.
//!
//! Callers pick the tier matching the alignment they can promise (16, 32 or
//! 64 bytes). The engine then chooses between exact small-size routines and
//! an unrolled non-temporal vector loop whose width depends on the CPU and
//! the tier. Copies have memmove semantics.
//!
//! ```
//! use tiercopy::{AlignedBuf, Tier};
//!
//! let mut buf = AlignedBuf::new(4096, Tier::Align64).unwrap();
//! buf.fill(1);
//! unsafe {
//!     let p = buf.as_mut_ptr();
//!     // overlapping move up by one cache line
//!     tiercopy::copy64(p, 1024, p.add(64), 1024);
//!     tiercopy::zero64(p, 64);
//! }
//! assert!(buf[..64].iter().all(|&b| b == 0));
//! assert!(buf[64..].iter().all(|&b| b == 1));
//! ```

#[cfg(target_arch = "x86_64")]
pub mod bulk;
pub mod buffer;
pub mod caps;
pub mod error;
#[cfg(target_arch = "x86_64")]
mod mid;
pub mod scalar;
#[cfg(target_arch = "x86_64")]
mod small;
pub mod tier;

pub use buffer::AlignedBuf;
pub use caps::{Caps, Width, caps};
pub use error::{Error, Result};
pub use scalar::{copy, zero};
pub use tier::{
    Direction, Engine, Tier, copy16, copy32, copy64, engine, zero16, zero32, zero64,
};
