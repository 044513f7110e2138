//! Error type for the checked entry points.
//!
//! The raw copy/zero routines never fail; every variant here comes from a
//! slice-level wrapper, the aligned buffer, or configuration parsing.

use thiserror::Error;

/// Errors reported by the checked surface of the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A region does not satisfy the alignment of the requested tier.
    #[error("address {addr:#x} is not aligned to {required} bytes")]
    Misaligned {
        /// Base address of the offending region
        addr: usize,
        /// Alignment promised by the tier
        required: usize,
    },

    /// A `copy_within` range lies outside the buffer.
    #[error("range {start}..{end} out of bounds for buffer of length {len}")]
    OutOfBounds {
        /// Start of the requested range
        start: usize,
        /// End of the requested range
        end: usize,
        /// Length of the buffer
        len: usize,
    },

    /// The requested allocation cannot be described by a `Layout`.
    #[error("invalid layout: {len} bytes aligned to {align}")]
    Layout {
        /// Requested size in bytes
        len: usize,
        /// Requested alignment in bytes
        align: usize,
    },

    /// The global allocator returned null.
    #[error("allocation of {len} bytes aligned to {align} failed")]
    AllocFailed {
        /// Requested size in bytes
        len: usize,
        /// Requested alignment in bytes
        align: usize,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidOverride {
        /// Variable name
        var: &'static str,
        /// Raw value found in the environment
        value: String,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = Error::Misaligned {
            addr: 0x1008,
            required: 64,
        };
        assert_eq!(e.to_string(), "address 0x1008 is not aligned to 64 bytes");

        let e = Error::OutOfBounds {
            start: 10,
            end: 80,
            len: 64,
        };
        assert_eq!(
            e.to_string(),
            "range 10..80 out of bounds for buffer of length 64"
        );

        let e = Error::InvalidOverride {
            var: "TIERCOPY_MAX_WIDTH",
            value: "wide".to_string(),
        };
        assert_eq!(e.to_string(), "invalid value \"wide\" for TIERCOPY_MAX_WIDTH");
    }
}
