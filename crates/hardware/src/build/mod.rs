//! Build backend and command controller.
//!
//! This module turns a composed design into files and drives the external
//! programs around it:
//! 1. **Layout:** where each artifact of a design lives.
//! 2. **Toolchain:** LPF constraints and Trellis/Diamond build scripts.
//! 3. **Builder:** writes the gateware and runs the toolchain.
//! 4. **Programmer:** openocd load and SPI flash programming.
//! 5. **Controller:** the action state machine behind the CLI.

/// Gateware builder.
pub mod builder;

/// Action state machine.
pub mod controller;

/// Artifact paths.
pub mod layout;

/// openocd programmer.
pub mod programmer;

/// External program execution.
pub mod runner;

/// Toolchain backends.
pub mod toolchain;

pub use builder::{BuildOutput, Builder};
pub use controller::{Actions, Controller, ControllerState, Outcome};
pub use layout::ArtifactLayout;
pub use programmer::OpenOcd;
pub use runner::{SystemRunner, ToolInvocation, ToolRunner, ToolStatus};
