//! Board platform: resource ownership and constraint registration.
//!
//! A [`Platform`] is built for one [`BoardRevision`] and hands out pad bundles
//! from the revision's pinout. It enforces:
//! 1. **Presence:** requesting a resource the revision lacks is `ResourceUnavailable`.
//! 2. **Exclusive ownership:** each `(name, index)` pair is handed out once, and so is
//!    each package pin (some resources overlay others, e.g. `serial` on the LED and
//!    button). A second request is `ResourceUnavailable` naming the current owner.
//! 3. **Constraints:** period and false-path declarations accumulate in an
//!    append-only [`ConstraintSet`] that is consumed when the platform is finished.

/// Timing constraint set.
pub mod constraints;

/// Static pinout tables per revision.
pub mod pinout;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::common::{Frequency, Result, SocError, Unavailability};
use crate::config::BoardRevision;
use crate::hdl::{Direction, Expr, Module};

pub use constraints::{ClockRef, Constraint, ConstraintSet};

/// Platform name used in artifact directory names.
pub const NAME: &str = "colorlight_5a_75b";

/// FPGA part on the board.
pub const DEVICE: &str = "LFE5U-25F-6BG256C";

/// Oscillator resource feeding the design.
pub const DEFAULT_CLK_NAME: &str = "clk25";

/// Oscillator frequency.
pub const DEFAULT_CLK_FREQ: Frequency = Frequency::mhz(25);

/// One subsignal of a claimed pad bundle, bound to a top-level port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadSignal {
    /// Subsignal name (empty for single-signal resources).
    pub name: String,
    /// Top-level port name.
    pub port: String,
    /// Direction seen from the FPGA.
    pub dir: Direction,
    /// Package pins, LSB first.
    pub pins: Vec<String>,
    /// IO standard.
    pub io_standard: String,
}

/// Pads of one `(resource, index)` pair, owned by exactly one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadBundle {
    /// Resource name.
    pub resource: String,
    /// Resource index.
    pub index: u32,
    /// Owning module.
    pub owner: String,
    /// Subsignals in catalog order.
    pub signals: Vec<PadSignal>,
}

impl PadBundle {
    /// Looks up a subsignal by name.
    pub fn signal(&self, name: &str) -> Option<&PadSignal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Top-level port bound to subsignal `name` (use `""` for single-signal resources).
    pub fn port_name(&self, name: &str) -> Result<&str> {
        self.signal(name).map(|s| s.port.as_str()).ok_or_else(|| {
            SocError::InvalidConfig(format!(
                "resource `{}:{}` has no subsignal `{name}`",
                self.resource, self.index
            ))
        })
    }

    /// Port expression for subsignal `name`.
    pub fn port(&self, name: &str) -> Result<Expr> {
        self.port_name(name).map(Expr::sig)
    }

    /// Declares every subsignal as a port of `top`.
    pub fn declare_ports(&self, top: &mut Module) -> Result<()> {
        for s in &self.signals {
            top.add_port(s.port.clone(), s.dir, s.pins.len() as u32)?;
        }
        Ok(())
    }
}

/// Top-level port name: `clk25`, `j1_2`, `eth_rx_data`, `eth_1_rx_data`.
fn port_name(resource: &str, index: u32, sub: &str) -> String {
    let base = if index == 0 {
        resource.to_string()
    } else {
        format!("{resource}_{index}")
    };
    if sub.is_empty() { base } else { format!("{base}_{sub}") }
}

/// The board, as seen by one composition pass.
#[derive(Debug)]
pub struct Platform {
    revision: BoardRevision,
    catalog: &'static [pinout::Resource],
    claims: BTreeMap<(String, u32), String>,
    pins: BTreeMap<&'static str, String>,
    pads: Vec<PadBundle>,
    constraints: ConstraintSet,
}

impl Platform {
    /// Builds the platform for `revision`.
    pub fn new(revision: BoardRevision) -> Self {
        Self {
            revision,
            catalog: pinout::catalog(revision),
            claims: BTreeMap::new(),
            pins: BTreeMap::new(),
            pads: Vec::new(),
            constraints: ConstraintSet::new(),
        }
    }

    /// Board revision.
    pub const fn revision(&self) -> BoardRevision {
        self.revision
    }

    fn lookup(&self, name: &str, index: u32) -> Option<&'static pinout::Resource> {
        self.catalog
            .iter()
            .find(|r| r.name == name && r.index == index)
    }

    /// Returns `true` if the revision has the resource, claimed or not.
    pub fn has_resource(&self, name: &str, index: u32) -> bool {
        self.lookup(name, index).is_some()
    }

    /// Returns `true` if the revision has the resource and none of its pins is claimed.
    pub fn is_free(&self, name: &str, index: u32) -> bool {
        self.lookup(name, index).is_some_and(|r| {
            r.subsignals
                .iter()
                .flat_map(|s| s.pins.iter())
                .all(|pin| !self.pins.contains_key(pin))
        })
    }

    /// Claims `(name, index)` for `owner`.
    ///
    /// # Errors
    ///
    /// [`SocError::ResourceUnavailable`] if the revision lacks the resource or it
    /// was already claimed.
    pub fn request(&mut self, name: &str, index: u32, owner: &str) -> Result<PadBundle> {
        if let Some(current) = self.claims.get(&(name.to_string(), index)) {
            return Err(SocError::ResourceUnavailable {
                resource: name.to_string(),
                index,
                revision: self.revision,
                reason: Unavailability::Claimed {
                    owner: current.clone(),
                },
            });
        }
        let resource = self
            .lookup(name, index)
            .ok_or_else(|| SocError::ResourceUnavailable {
                resource: name.to_string(),
                index,
                revision: self.revision,
                reason: Unavailability::Absent,
            })?;
        let pins = resource.subsignals.iter().flat_map(|s| s.pins.iter());
        if let Some(current) = pins.clone().find_map(|pin| self.pins.get(pin)) {
            return Err(SocError::ResourceUnavailable {
                resource: name.to_string(),
                index,
                revision: self.revision,
                reason: Unavailability::Claimed {
                    owner: current.clone(),
                },
            });
        }

        let bundle = PadBundle {
            resource: name.to_string(),
            index,
            owner: owner.to_string(),
            signals: resource
                .subsignals
                .iter()
                .map(|s| PadSignal {
                    name: s.name.to_string(),
                    port: port_name(name, index, s.name),
                    dir: s.dir,
                    pins: s.pins.iter().map(|p| (*p).to_string()).collect(),
                    io_standard: s.io_standard.to_string(),
                })
                .collect(),
        };
        debug!(resource = name, index, owner, "pads claimed");
        let _ = self.claims.insert((name.to_string(), index), owner.to_string());
        for pin in pins {
            let _ = self.pins.insert(*pin, owner.to_string());
        }
        self.pads.push(bundle.clone());
        Ok(bundle)
    }

    /// Declares the period of `clock`.
    pub fn add_period_constraint(&mut self, clock: ClockRef, freq: Frequency) {
        debug!(%clock, %freq, "period constraint");
        self.constraints.add_period(clock, freq);
    }

    /// Declares all pairs of `clocks` as unrelated.
    pub fn add_false_path_constraints(&mut self, clocks: &[ClockRef]) {
        self.constraints.add_false_paths(clocks);
    }

    /// Appends a batch of constraints, preserving their order.
    pub fn add_constraints(&mut self, constraints: ConstraintSet) {
        self.constraints.extend(constraints);
    }

    /// Constraints declared so far.
    pub const fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Pad bundles claimed so far, in claim order.
    pub fn pads(&self) -> &[PadBundle] {
        &self.pads
    }

    /// Ends the composition pass, yielding claimed pads and the constraint set.
    pub fn finish(self) -> (Vec<PadBundle>, ConstraintSet) {
        (self.pads, self.constraints)
    }
}
