//! Runtime capability probe.
//!
//! Answers which vector widths the host accelerates and whether 512-bit
//! non-temporal stores may be used. The answer is computed once per process
//! and never changes afterwards.
//!
//! Two environment variables can lower (never raise) what the hardware
//! reports:
//!
//! - `TIERCOPY_MAX_WIDTH`: `0`, `128`, `256` or `512`. Caps the widest
//!   register width; `0` sends bulk transfers to the scalar fallback.
//! - `TIERCOPY_NT512`: `0`/`false` disables 512-bit non-temporal stores, so
//!   the 64-byte tier runs its bulk loop at 256 bits.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::tier::Tier;

const MAX_WIDTH_VAR: &str = "TIERCOPY_MAX_WIDTH";
const NT512_VAR: &str = "TIERCOPY_NT512";

/// Register width used by one bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    /// 128-bit registers (SSE4.1 streaming loads)
    W128,
    /// 256-bit registers (AVX2)
    W256,
    /// 512-bit registers (AVX-512F)
    W512,
}

impl Width {
    /// Bytes held by one register.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Width::W128 => 16,
            Width::W256 => 32,
            Width::W512 => 64,
        }
    }

    /// Bytes moved by one unrolled iteration (8 registers).
    #[inline]
    pub const fn step(self) -> usize {
        self.bytes() * 8
    }

    /// Width in bits.
    #[inline]
    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }
}

/// Hardware capability flags.
///
/// A narrower flag is never false while a wider one is true, and
/// `has512_nontemporal` implies `has512`. Every constructor enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Caps {
    has128: bool,
    has256: bool,
    has512: bool,
    has512_nt: bool,
}

impl Caps {
    /// Capability set with every vector width disabled.
    pub const SCALAR: Caps = Caps {
        has128: false,
        has256: false,
        has512: false,
        has512_nt: false,
    };

    /// Builds a capability set, clearing any flag whose narrower
    /// counterpart is false.
    pub const fn new(has128: bool, has256: bool, has512: bool, has512_nt: bool) -> Self {
        let has256 = has256 && has128;
        let has512 = has512 && has256;
        Caps {
            has128,
            has256,
            has512,
            has512_nt: has512_nt && has512,
        }
    }

    /// Queries the CPU directly, ignoring overrides and the process cache.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            let has512 = is_x86_feature_detected!("avx512f");
            Caps::new(
                is_x86_feature_detected!("sse4.1"),
                is_x86_feature_detected!("avx2"),
                has512,
                has512,
            )
        }

        #[cfg(not(target_arch = "x86_64"))]
        {
            Caps::SCALAR
        }
    }

    #[inline]
    pub const fn has128(&self) -> bool {
        self.has128
    }

    #[inline]
    pub const fn has256(&self) -> bool {
        self.has256
    }

    #[inline]
    pub const fn has512(&self) -> bool {
        self.has512
    }

    #[inline]
    pub const fn has512_nontemporal(&self) -> bool {
        self.has512_nt
    }

    /// Flags present in both sets.
    pub const fn restrict(self, other: Caps) -> Caps {
        Caps::new(
            self.has128 && other.has128,
            self.has256 && other.has256,
            self.has512 && other.has512,
            self.has512_nt && other.has512_nt,
        )
    }

    /// Drops every width wider than `max`. `None` drops them all.
    pub const fn cap_width(self, max: Option<Width>) -> Caps {
        match max {
            None => Caps::SCALAR,
            Some(Width::W128) => Caps::new(self.has128, false, false, false),
            Some(Width::W256) => Caps::new(self.has128, self.has256, false, false),
            Some(Width::W512) => self,
        }
    }

    /// Widest accelerated width, if any.
    pub const fn widest(&self) -> Option<Width> {
        if self.has512 {
            Some(Width::W512)
        } else if self.has256 {
            Some(Width::W256)
        } else if self.has128 {
            Some(Width::W128)
        } else {
            None
        }
    }

    /// Width the bulk loop runs at for `tier`, or `None` for the scalar
    /// fallback.
    ///
    /// The 64-byte tier only goes to 512 bits when non-temporal 512-bit
    /// stores are available; otherwise it steps down to 256, then 128.
    pub const fn width_for(&self, tier: Tier) -> Option<Width> {
        match tier {
            Tier::Align64 if self.has512_nt => Some(Width::W512),
            Tier::Align64 | Tier::Align32 if self.has256 => Some(Width::W256),
            _ if self.has128 => Some(Width::W128),
            _ => None,
        }
    }

    /// Applies environment-style overrides read through `lookup`.
    ///
    /// Malformed values are returned as errors; the caller decides whether
    /// to ignore them.
    pub fn with_overrides<F>(self, lookup: F) -> (Caps, Vec<Error>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut caps = self;
        let mut errors = Vec::new();

        if let Some(raw) = lookup(MAX_WIDTH_VAR) {
            match parse_max_width(&raw) {
                Ok(max) => caps = caps.cap_width(max),
                Err(e) => errors.push(e),
            }
        }

        if let Some(raw) = lookup(NT512_VAR) {
            match parse_switch(NT512_VAR, &raw) {
                Ok(false) => caps = Caps::new(caps.has128, caps.has256, caps.has512, false),
                Ok(true) => {}
                Err(e) => errors.push(e),
            }
        }

        (caps, errors)
    }
}

fn parse_max_width(raw: &str) -> Result<Option<Width>> {
    match raw.trim() {
        "0" | "none" | "scalar" => Ok(None),
        "128" => Ok(Some(Width::W128)),
        "256" => Ok(Some(Width::W256)),
        "512" => Ok(Some(Width::W512)),
        _ => Err(Error::InvalidOverride {
            var: MAX_WIDTH_VAR,
            value: raw.to_string(),
        }),
    }
}

fn parse_switch(var: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(Error::InvalidOverride {
            var,
            value: raw.to_string(),
        }),
    }
}

static CAPS: OnceLock<Caps> = OnceLock::new();

fn probe() -> Caps {
    let hw = Caps::detect();
    let (caps, errors) = hw.with_overrides(|var| std::env::var(var).ok());
    for err in &errors {
        tracing::warn!(error = %err, "ignoring capability override");
    }
    tracing::debug!(
        has128 = caps.has128,
        has256 = caps.has256,
        has512 = caps.has512,
        has512_nontemporal = caps.has512_nt,
        overridden = caps != hw,
        "vector capabilities probed"
    );
    caps
}

/// Process-wide capability flags, probed on first use.
#[inline]
pub fn caps() -> Caps {
    *CAPS.get_or_init(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |var: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_new_normalizes_monotonic() {
        let c = Caps::new(false, true, true, true);
        assert_eq!(c, Caps::SCALAR);

        let c = Caps::new(true, false, true, true);
        assert!(c.has128());
        assert!(!c.has256());
        assert!(!c.has512());
        assert!(!c.has512_nontemporal());

        let c = Caps::new(true, true, false, true);
        assert!(c.has256());
        assert!(!c.has512_nontemporal());

        let c = Caps::new(true, true, true, false);
        assert!(c.has512());
        assert!(!c.has512_nontemporal());
    }

    #[test]
    fn test_detect_is_monotonic_and_cached() {
        let c = Caps::detect();
        assert!(!c.has256() || c.has128());
        assert!(!c.has512() || c.has256());
        assert!(!c.has512_nontemporal() || c.has512());
        assert_eq!(caps(), caps());
        assert_eq!(caps().restrict(c), caps());
    }

    #[test]
    fn test_width_for_tiers() {
        let full = Caps::new(true, true, true, true);
        assert_eq!(full.width_for(Tier::Align16), Some(Width::W128));
        assert_eq!(full.width_for(Tier::Align32), Some(Width::W256));
        assert_eq!(full.width_for(Tier::Align64), Some(Width::W512));

        let no_nt = Caps::new(true, true, true, false);
        assert_eq!(no_nt.width_for(Tier::Align64), Some(Width::W256));

        let sse = Caps::new(true, false, false, false);
        assert_eq!(sse.width_for(Tier::Align64), Some(Width::W128));
        assert_eq!(sse.width_for(Tier::Align32), Some(Width::W128));

        assert_eq!(Caps::SCALAR.width_for(Tier::Align64), None);
        assert_eq!(Caps::SCALAR.widest(), None);
        assert_eq!(no_nt.widest(), Some(Width::W512));
    }

    #[test]
    fn test_width_sizes() {
        assert_eq!(Width::W128.step(), 128);
        assert_eq!(Width::W256.step(), 256);
        assert_eq!(Width::W512.step(), 512);
        assert_eq!(Width::W512.bits(), 512);
    }

    #[test]
    fn test_overrides_only_lower() {
        let full = Caps::new(true, true, true, true);

        let (c, errs) = full.with_overrides(env(&[("TIERCOPY_MAX_WIDTH", "256")]));
        assert!(errs.is_empty());
        assert_eq!(c, Caps::new(true, true, false, false));

        let (c, _) = full.with_overrides(env(&[("TIERCOPY_MAX_WIDTH", "0")]));
        assert_eq!(c, Caps::SCALAR);

        let (c, _) = full.with_overrides(env(&[("TIERCOPY_NT512", "off")]));
        assert_eq!(c, Caps::new(true, true, true, false));

        let sse = Caps::new(true, false, false, false);
        let (c, _) = sse.with_overrides(env(&[
            ("TIERCOPY_MAX_WIDTH", "512"),
            ("TIERCOPY_NT512", "1"),
        ]));
        assert_eq!(c, sse);
    }

    #[test]
    fn test_overrides_report_garbage() {
        let full = Caps::new(true, true, true, true);
        let (c, errs) = full.with_overrides(env(&[
            ("TIERCOPY_MAX_WIDTH", "wide"),
            ("TIERCOPY_NT512", "maybe"),
        ]));
        assert_eq!(c, full);
        assert_eq!(errs.len(), 2);
        assert!(matches!(
            &errs[0],
            Error::InvalidOverride { var: "TIERCOPY_MAX_WIDTH", .. }
        ));
    }
}
