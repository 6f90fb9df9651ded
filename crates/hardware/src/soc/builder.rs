//! SoC composition and the top-level `Soc` type.
//!
//! This module assembles the complete design from configuration. It performs:
//! 1. **Validation:** Feature exclusivity and parameter ranges, before anything is
//!    instantiated.
//! 2. **Clocking:** CRG built with the union of the features' clock requirements,
//!    after the SoC core has claimed the serial pads (if it uses them).
//! 3. **Elaboration:** SoC core, status blinker, then every enabled feature in
//!    declaration order; constraints are appended in the same order.
//! 4. **Bus attachment:** Masters, slave regions and CSR banks registered in
//!    elaboration order, which fixes arbitration priority. The wiring of every
//!    attachment is checked before the fabric is instantiated in the top module.
//!
//! The standalone path ([`Soc::compose_blinker_only`]) skips 2 and 4 entirely:
//! the blinker runs straight off the board oscillator.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::build::layout::ArtifactLayout;
use crate::common::{Frequency, Result, SocError};
use crate::config::{BoardRevision, FeatureKind, SocConfig, Toolchain};
use crate::crg::{Crg, PllConfig};
use crate::feature::{self, BlinkerOutputs, Elaboration, Feature, StatusBlinker};
use crate::hdl::{ClockDomain, Expr, Module, ResetPolicy};
use crate::platform::{self, ClockRef, ConstraintSet, PadBundle, Platform};
use crate::soc::graph::ModuleGraph;
use crate::soc::interconnect::Interconnect;
use crate::soc::soc_core::SocCore;

/// Name of the generated top-level module.
pub const TOP_NAME: &str = "top";

/// A fully composed design, immutable once built.
#[derive(Debug)]
pub struct Soc {
    class_name: &'static str,
    revision: BoardRevision,
    toolchain: Toolchain,
    sys_clk_freq: Frequency,
    graph: ModuleGraph,
    top: Module,
    pads: Vec<PadBundle>,
    constraints: ConstraintSet,
    domains: Vec<ClockDomain>,
    pll: Option<PllConfig>,
    interconnect: Option<Interconnect>,
    features: Vec<Box<dyn Feature>>,
    layout: ArtifactLayout,
    builder_options: BTreeMap<String, String>,
}

/// Adds the declaration's opaque `options` to a module's descriptor parameters.
fn with_options(
    parameters: serde_json::Value,
    options: Option<&serde_json::Value>,
) -> serde_json::Value {
    let Some(options) = options.filter(|o| !o.is_null()) else {
        return parameters;
    };
    match parameters {
        serde_json::Value::Object(mut map) => {
            let _ = map.insert("options".to_string(), options.clone());
            serde_json::Value::Object(map)
        }
        serde_json::Value::Null => serde_json::json!({ "options": options }),
        other => serde_json::json!({ "value": other, "options": options }),
    }
}

/// Union of the domains requested by `features`, in first-request order.
fn clock_requirements(features: &[Box<dyn Feature>]) -> Result<Vec<ClockDomain>> {
    let mut union: Vec<(ClockDomain, &'static str)> = Vec::new();
    for feature in features {
        for domain in feature.required_clocks() {
            match union.iter().find(|(d, _)| d.name == domain.name) {
                Some((existing, _)) if *existing == domain => {}
                Some((_, owner)) => {
                    return Err(SocError::ConfigurationConflict {
                        first: (*owner).to_string(),
                        second: feature.name().to_string(),
                        detail: format!("incompatible definitions of clock domain `{}`", domain.name),
                    });
                }
                None => union.push((domain, feature.name())),
            }
        }
    }
    Ok(union.into_iter().map(|(d, _)| d).collect())
}

impl Soc {
    /// Composes the SoC described by `config`.
    ///
    /// With `config.no_soc` set this is [`Soc::compose_blinker_only`].
    ///
    /// # Errors
    ///
    /// [`SocError::ConfigurationConflict`] for exclusive features or colliding bus
    /// attachments, [`SocError::ResourceUnavailable`] for missing or doubly claimed
    /// pads, [`SocError::UnreachableFrequency`] when the PLL cannot be configured,
    /// [`SocError::InvalidConfig`] when a bus port is registered but left unwired.
    pub fn compose(config: &SocConfig) -> Result<Self> {
        config.validate()?;
        if config.no_soc {
            return Self::compose_blinker_only(config);
        }

        let kinds: Vec<FeatureKind> = config.features.enabled().collect();
        let mut features: Vec<Box<dyn Feature>> = kinds
            .iter()
            .map(|&kind| feature::from_kind(kind, config))
            .collect();
        let extra = clock_requirements(&features)?;
        info!(
            revision = %config.revision,
            class = config.class_name(),
            features = features.len(),
            "composing SoC"
        );

        let mut platform = Platform::new(config.revision);
        let mut top = Module::new(TOP_NAME);
        let mut graph = ModuleGraph::new();

        let mut soc_core = SocCore::new(config);
        soc_core.claim_pads(&mut platform)?;
        let crg = Crg::new(&mut platform, &mut top, config.sys_clk_freq, &extra)?;
        graph.add(
            Crg::NAME,
            &[],
            serde_json::to_value(crg.pll()).map_err(SocError::Json)?,
        )?;
        let mut domains = crg.domains().to_vec();

        let mut modules: Vec<Box<dyn Feature>> = vec![
            Box::new(soc_core),
            Box::new(StatusBlinker::new(BlinkerOutputs::Header)),
        ];
        let builtin = modules.len();
        modules.append(&mut features);

        for (i, module) in modules.iter_mut().enumerate() {
            let mut ctx = Elaboration {
                platform: &mut platform,
                top: &mut top,
                config,
                domains: &domains,
            };
            module.elaborate(&mut ctx)?;
            platform.add_constraints(module.constraints());
            domains.extend(module.clock_domains().iter().cloned());
            let options = i
                .checked_sub(builtin)
                .map(|f| config.features.parameters(kinds[f]));
            graph.add(
                module.name(),
                module.depends_on(),
                with_options(module.parameters(), options),
            )?;
            debug!(module = module.name(), "elaborated");
        }

        let mut interconnect = Interconnect::new(&config.soc)?;
        for module in &modules {
            for master in module.bus_masters() {
                let _ = interconnect.add_master(master)?;
            }
        }
        for module in &modules {
            if let Some(region) = module.memory_region() {
                interconnect.add_slave(region)?;
            }
            for bank in module.csr_banks() {
                let _ = interconnect.add_csr_bank(bank)?;
            }
        }

        interconnect.check_wiring(&top)?;
        top.instantiate(interconnect.instance());

        let (pads, constraints) = platform.finish();
        info!(
            modules = graph.len(),
            masters = interconnect.masters().len(),
            constraints = constraints.len(),
            "SoC composed"
        );
        Ok(Self {
            class_name: config.class_name(),
            revision: config.revision,
            toolchain: config.toolchain,
            sys_clk_freq: config.sys_clk_freq,
            graph,
            top,
            pads,
            constraints,
            domains,
            pll: Some(crg.pll().clone()),
            interconnect: Some(interconnect),
            features: modules,
            layout: ArtifactLayout::for_soc(&config.output_dir, config.class_name()),
            builder_options: config.builder_options.clone(),
        })
    }

    /// Elaborates only the status blinker against the raw platform.
    ///
    /// `sys` is the board oscillator itself: no PLL, no reset, no interconnect.
    /// Feature declarations are ignored.
    pub fn compose_blinker_only(config: &SocConfig) -> Result<Self> {
        if config.features.enabled().next().is_some() {
            warn!("standalone build ignores the declared features");
        }
        let mut platform = Platform::new(config.revision);
        let mut top = Module::new(TOP_NAME);
        let mut graph = ModuleGraph::new();

        let clk = platform.request(platform::DEFAULT_CLK_NAME, 0, StatusBlinker::NAME)?;
        clk.declare_ports(&mut top)?;
        let sys = ClockDomain::new("sys", platform::DEFAULT_CLK_FREQ, ResetPolicy::ResetLess);
        top.declare_domain(sys.clone())?;
        top.comb(sys.clk(), Expr::sig(clk.port_name("")?));
        platform.add_period_constraint(
            ClockRef::Pad(platform::DEFAULT_CLK_NAME.to_string()),
            platform::DEFAULT_CLK_FREQ,
        );

        let domains = vec![sys];
        let mut blinker = StatusBlinker::new(BlinkerOutputs::Hub75);
        let mut ctx = Elaboration {
            platform: &mut platform,
            top: &mut top,
            config,
            domains: &domains,
        };
        blinker.elaborate(&mut ctx)?;
        graph.add(blinker.name(), blinker.depends_on(), blinker.parameters())?;

        let (pads, constraints) = platform.finish();
        info!(revision = %config.revision, "standalone blinker composed");
        Ok(Self {
            class_name: ArtifactLayout::STANDALONE_CLASS,
            revision: config.revision,
            toolchain: config.toolchain,
            sys_clk_freq: platform::DEFAULT_CLK_FREQ,
            graph,
            top,
            pads,
            constraints,
            domains,
            pll: None,
            interconnect: None,
            features: vec![Box::new(blinker)],
            layout: ArtifactLayout::standalone(&config.output_dir),
            builder_options: config.builder_options.clone(),
        })
    }

    /// Class name used for artifact naming.
    pub const fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Board revision.
    pub const fn revision(&self) -> BoardRevision {
        self.revision
    }

    /// Gateware toolchain the design is built with.
    pub const fn toolchain(&self) -> Toolchain {
        self.toolchain
    }

    /// Frequency of `sys`.
    pub const fn sys_clk_freq(&self) -> Frequency {
        self.sys_clk_freq
    }

    /// Instantiated subsystems in dependency order.
    pub const fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// The generated top-level module.
    pub const fn top(&self) -> &Module {
        &self.top
    }

    /// Claimed pads, in claim order.
    pub fn pads(&self) -> &[PadBundle] {
        &self.pads
    }

    /// Timing constraints.
    pub const fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Every clock domain in the design.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    /// PLL configuration, absent for the standalone blinker.
    pub const fn pll(&self) -> Option<&PllConfig> {
        self.pll.as_ref()
    }

    /// Bus interconnect, absent for the standalone blinker.
    pub const fn interconnect(&self) -> Option<&Interconnect> {
        self.interconnect.as_ref()
    }

    /// Instantiated modules in elaboration order: SoC core, blinker, then features.
    pub fn features(&self) -> &[Box<dyn Feature>] {
        &self.features
    }

    /// Where build artifacts for this design live.
    pub const fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Opaque builder options carried from the configuration.
    pub const fn builder_options(&self) -> &BTreeMap<String, String> {
        &self.builder_options
    }

    /// Design descriptor written next to the gateware.
    pub fn descriptor(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Descriptor<'a> {
            platform: &'static str,
            device: &'static str,
            revision: String,
            class: &'static str,
            toolchain: String,
            sys_clk_freq: Frequency,
            modules: &'a ModuleGraph,
            clock_domains: &'a [ClockDomain],
            pll: Option<&'a PllConfig>,
            interconnect: Option<&'a Interconnect>,
            constraints: &'a ConstraintSet,
            builder_options: &'a BTreeMap<String, String>,
        }

        let descriptor = Descriptor {
            platform: platform::NAME,
            device: platform::DEVICE,
            revision: self.revision.to_string(),
            class: self.class_name,
            toolchain: self.toolchain.to_string(),
            sys_clk_freq: self.sys_clk_freq,
            modules: &self.graph,
            clock_domains: &self.domains,
            pll: self.pll.as_ref(),
            interconnect: self.interconnect.as_ref(),
            constraints: &self.constraints,
            builder_options: &self.builder_options,
        };
        Ok(serde_json::to_string_pretty(&descriptor)?)
    }
}
