//! Types shared by every layer of the composer.
//!
//! 1. **Errors:** the [`SocError`] taxonomy and the crate `Result` alias.
//! 2. **Frequencies:** the [`Frequency`] newtype used for all clock targets.

/// Error types.
pub mod error;

/// Clock frequency type.
pub mod freq;

pub use error::{Result, SocError, Unavailability};
pub use freq::Frequency;
