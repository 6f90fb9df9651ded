//! SoC composer for the Colorlight 5A-75B (Lattice ECP5 LFE5U-25F).
//!
//! This crate assembles a complete system-on-chip description from reusable subsystems:
//! 1. **Platform:** Pinout catalog per board revision, exclusive pad ownership, timing constraints.
//! 2. **CRG:** ECP5 PLL solver and clock/reset tree derived from the 25 MHz oscillator.
//! 3. **Features:** Status blinker, SDRAM controller, raw Ethernet and Etherbone.
//! 4. **SoC:** Validation, the CPU core, dependency-ordered elaboration and the bus fabric.
//! 5. **Build:** Verilog/LPF/script generation, toolchain runs and the openocd programmer.

/// Common types (errors, frequencies).
pub mod common;
/// Invocation configuration (defaults, enums, feature declarations).
pub mod config;
/// Clock and reset generator.
pub mod crg;
/// Optional subsystems behind a common capability trait.
pub mod feature;
/// Minimal structural HDL and Verilog emitter.
pub mod hdl;
/// Board resources and timing constraints.
pub mod platform;
/// Composition (graph, interconnect, SoC core, `Soc`).
pub mod soc;
/// Gateware builder, programmer and action controller.
pub mod build;

/// Root configuration type; use `SocConfig::default()` or deserialize from JSON.
pub use crate::config::SocConfig;
/// Error type and result alias.
pub use crate::common::{Result, SocError};
/// Composed design; construct with `Soc::compose`.
pub use crate::soc::Soc;
