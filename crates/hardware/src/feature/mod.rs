//! Feature modules.
//!
//! A feature is an optional subsystem the composer can add to the SoC without
//! knowing anything about the others. Every feature answers the same set of
//! questions through the [`Feature`] trait:
//! 1. **Identity:** name and the graph nodes it depends on.
//! 2. **Clocking:** domains it needs from the CRG, and domains it introduces itself.
//! 3. **Bus:** bus masters, optional memory-mapped region, CSR banks. Every
//!    master and region is backed by a wishbone [`Channel`] the feature wires to
//!    one of its instances while elaborating; the composer connects the other
//!    end to the interconnect.
//! 4. **Timing:** constraints appended to the platform after elaboration.
//! 5. **Elaboration:** pad requests and logic added to the top module.
//!
//! Features are created from their [`FeatureKind`] before the clock tree exists
//! so that the CRG can be built with the union of their clock requirements.
//!
//! [`Channel`]: crate::hdl::Channel

/// Status LED blinker.
pub mod blinker;

/// Raw Ethernet and the shared RGMII PHY.
pub mod ethernet;

/// Etherbone remote bus access.
pub mod etherbone;

/// SDRAM memory controller.
pub mod sdram;

use std::fmt;

use crate::common::{Result, SocError};
use crate::config::{FeatureKind, SocConfig};
use crate::crg::Crg;
use crate::hdl::{ClockDomain, Module};
use crate::platform::{ConstraintSet, Platform};
use crate::soc::interconnect::MemoryRegion;

pub use blinker::{BlinkerOutputs, StatusBlinker};
pub use etherbone::Etherbone;
pub use ethernet::{Ethernet, RgmiiPhy};
pub use sdram::{MemoryController, SdramModule};

/// What a feature sees while it elaborates.
#[derive(Debug)]
pub struct Elaboration<'a> {
    /// Board pads and constraint registry.
    pub platform: &'a mut Platform,
    /// Top-level module being built.
    pub top: &'a mut Module,
    /// Invocation configuration.
    pub config: &'a SocConfig,
    /// Clock domains available so far.
    pub domains: &'a [ClockDomain],
}

impl Elaboration<'_> {
    /// Looks up an available clock domain.
    ///
    /// # Errors
    ///
    /// [`SocError::InvalidConfig`] if no such domain was generated.
    pub fn domain(&self, name: &str) -> Result<&ClockDomain> {
        self.domains
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SocError::InvalidConfig(format!("clock domain `{name}` is not generated")))
    }
}

/// Capability interface shared by every subsystem the composer instantiates.
pub trait Feature: fmt::Debug {
    /// Node name in the module graph.
    fn name(&self) -> &'static str;

    /// Graph nodes that must exist before this one.
    fn depends_on(&self) -> &[&'static str] {
        &[Crg::NAME]
    }

    /// Domains the CRG must generate for this feature.
    fn required_clocks(&self) -> Vec<ClockDomain> {
        Vec::new()
    }

    /// Requests pads and adds the feature's logic to the top module.
    fn elaborate(&mut self, ctx: &mut Elaboration<'_>) -> Result<()>;

    /// Domains the feature drives itself (e.g. PHY RX/TX clocks).
    fn clock_domains(&self) -> &[ClockDomain] {
        &[]
    }

    /// Bus masters the feature drives, highest priority first.
    ///
    /// Each name must have its wishbone channel declared and attached during
    /// [`Feature::elaborate`].
    fn bus_masters(&self) -> &[&'static str] {
        &[]
    }

    /// Memory-mapped slave region, if any; wired like a master, under the
    /// region's name.
    fn memory_region(&self) -> Option<MemoryRegion> {
        None
    }

    /// CSR banks, in allocation order.
    fn csr_banks(&self) -> &[&'static str] {
        &[]
    }

    /// Timing constraints, appended after elaboration.
    fn constraints(&self) -> ConstraintSet {
        ConstraintSet::new()
    }

    /// Parameters recorded in the design descriptor.
    fn parameters(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Creates the feature for `kind`, parameterized by `config`.
pub fn from_kind(kind: FeatureKind, config: &SocConfig) -> Box<dyn Feature> {
    match kind {
        FeatureKind::Sdram => Box::new(MemoryController::new(config)),
        FeatureKind::Ethernet => Box::new(Ethernet::new(config)),
        FeatureKind::Etherbone => Box::new(Etherbone::new(config)),
    }
}
