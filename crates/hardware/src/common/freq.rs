//! Frequency type.
//!
//! Clock targets are carried as integral hertz so that constraint sets compare
//! exactly; periods are derived on demand for constraint files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A clock frequency in hertz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(pub u64);

impl Frequency {
    /// Creates a frequency from a value in hertz.
    #[inline]
    pub const fn hz(hz: u64) -> Self {
        Self(hz)
    }

    /// Creates a frequency from a value in megahertz.
    #[inline]
    pub const fn mhz(mhz: u64) -> Self {
        Self(mhz * 1_000_000)
    }

    /// Returns the raw value in hertz.
    #[inline]
    pub const fn as_hz(self) -> u64 {
        self.0
    }

    /// Returns the value in megahertz.
    pub fn as_mhz(self) -> f64 {
        self.0 as f64 / 1e6
    }

    /// Clock period in nanoseconds.
    pub fn period_ns(self) -> f64 {
        1e9 / self.0 as f64
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} MHz", self.as_mhz())
    }
}
