//! System-on-Chip composition.
//!
//! This module organizes the pieces the composer produces: the module graph,
//! the shared bus interconnect, the SoC core every design carries, and the
//! builder that assembles the [`Soc`].

/// SoC composition.
pub mod builder;

/// Module dependency graph.
pub mod graph;

/// Shared bus interconnect.
pub mod interconnect;

/// CPU, integrated memories and console.
pub mod soc_core;

pub use builder::Soc;
pub use graph::{ModuleGraph, ModuleNode};
pub use interconnect::{CsrBank, Interconnect, MemoryRegion};
pub use soc_core::SocCore;
