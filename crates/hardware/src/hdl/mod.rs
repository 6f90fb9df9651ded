//! Minimal hardware-description substrate.
//!
//! The composer only needs a handful of structural operations from its HDL:
//! 1. **Clock domains:** declare a named clock with a frequency, phase and reset policy.
//! 2. **Signals and ports:** declare a signal or top-level port of width W.
//! 3. **Statements:** assign combinationally or synchronously to a domain.
//! 4. **Black boxes:** instantiate an opaque primitive or IP core with parameters and
//!    port connections.
//! 5. **Channels:** point-to-point bundles (bus ports, streams) packed into a
//!    forward and a return net.
//!
//! The resulting [`Module`] is rendered to structural Verilog by [`verilog::emit`].

/// Structural Verilog emitter.
pub mod verilog;

use std::fmt;

use serde::Serialize;

use crate::common::{Frequency, Result, SocError};

/// Reset behaviour of a clock domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Reset released through an asynchronous-assert / synchronous-release synchronizer.
    AsyncReset,
    /// No reset signal at all.
    ResetLess,
    /// Plain synchronous reset.
    Synchronous,
}

/// A named clock with its frequency target and reset policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockDomain {
    /// Domain name (`sys`, `sys_ps`, `eth_rx`, ...).
    pub name: String,
    /// Frequency target.
    pub freq: Frequency,
    /// Phase offset in degrees relative to the PLL reference.
    pub phase_deg: u32,
    /// Reset policy.
    pub reset: ResetPolicy,
}

impl ClockDomain {
    /// Creates a zero-phase domain.
    pub fn new(name: impl Into<String>, freq: Frequency, reset: ResetPolicy) -> Self {
        Self {
            name: name.into(),
            freq,
            phase_deg: 0,
            reset,
        }
    }

    /// Returns the same domain shifted by `phase_deg`.
    #[must_use]
    pub const fn with_phase(mut self, phase_deg: u32) -> Self {
        self.phase_deg = phase_deg;
        self
    }

    /// Name of the clock net.
    pub fn clk(&self) -> String {
        format!("{}_clk", self.name)
    }

    /// Name of the reset net, if the domain has one.
    pub fn rst(&self) -> Option<String> {
        match self.reset {
            ResetPolicy::ResetLess => None,
            ResetPolicy::AsyncReset | ResetPolicy::Synchronous => Some(format!("{}_rst", self.name)),
        }
    }
}

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Driven from outside the module.
    Input,
    /// Driven by the module.
    Output,
    /// Bidirectional pad.
    Inout,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
            Self::Inout => write!(f, "inout"),
        }
    }
}

/// Expression tree for assignments and instance connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    /// A whole signal or port.
    Sig(String),
    /// A single bit of a signal.
    Bit(String, u32),
    /// Constant of the given width.
    Const {
        /// Value.
        value: u64,
        /// Width in bits.
        width: u32,
    },
    /// Bitwise inversion.
    Not(Box<Expr>),
    /// Bitwise or.
    Or(Box<Expr>, Box<Expr>),
    /// Signal plus a constant increment.
    Add(Box<Expr>, u64),
}

impl Expr {
    /// A whole signal.
    pub fn sig(name: impl Into<String>) -> Self {
        Self::Sig(name.into())
    }

    /// Bit `index` of a signal.
    pub fn bit(name: impl Into<String>, index: u32) -> Self {
        Self::Bit(name.into(), index)
    }

    /// Bitwise inversion of `self`.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Bitwise or of `self` and `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }
}

/// A port of the top-level module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Direction.
    pub dir: Direction,
    /// Width in bits.
    pub width: u32,
}

/// An internal signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    /// Signal name.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Value loaded on reset (synchronous targets only).
    pub reset: u64,
}

/// `target = value`, continuously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombAssign {
    /// Driven signal.
    pub target: String,
    /// Driving expression.
    pub value: Expr,
}

/// `target <= value` on every edge of `domain`'s clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncAssign {
    /// Clock domain.
    pub domain: String,
    /// Register.
    pub target: String,
    /// Next-state expression.
    pub value: Expr,
}

/// Parameter value of a black-box instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Param {
    /// Integer parameter.
    Int(i64),
    /// String parameter.
    Str(String),
}

/// An opaque primitive or IP core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    /// Module type (`EHXPLLL`, `liteeth_core`, ...).
    pub kind: String,
    /// Instance name.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<(String, Param)>,
    /// Port connections in declaration order.
    pub ports: Vec<(String, Expr)>,
}

impl Instance {
    /// Starts an instance with no parameters or connections.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            params: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// Adds an integer parameter.
    #[must_use]
    pub fn param_int(mut self, name: &str, value: i64) -> Self {
        self.params.push((name.to_string(), Param::Int(value)));
        self
    }

    /// Adds a string parameter.
    #[must_use]
    pub fn param_str(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((name.to_string(), Param::Str(value.into())));
        self
    }

    /// Connects a port.
    #[must_use]
    pub fn port(mut self, name: &str, expr: Expr) -> Self {
        self.ports.push((name.to_string(), expr));
        self
    }
}

/// Wishbone field widths (32-bit data, word addressing).
pub mod wishbone {
    /// `adr`, `dat_w`, `sel`, `cyc`, `stb`, `we`, `cti`, `bte`.
    pub const M2S_WIDTH: u32 = 30 + 32 + 4 + 1 + 1 + 1 + 3 + 2;
    /// `dat_r`, `ack`, `err`.
    pub const S2M_WIDTH: u32 = 32 + 1 + 1;
}

/// A point-to-point bundle between two instances.
///
/// The bundle is packed into two nets: `<name>_fwd` driven by the initiator
/// and `<name>_bwd` driven by the target. Both ends connect to the same nets
/// through [`Channel::attach`], so a channel only exists in the netlist once
/// one side has [declared](Channel::declare) it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    /// Channel name, also the net prefix.
    pub name: String,
    /// Width of the initiator-driven net.
    pub forward: u32,
    /// Width of the target-driven net.
    pub backward: u32,
}

impl Channel {
    /// Wishbone bus port `wb_<name>`; the master side is the initiator.
    pub fn wishbone(name: &str) -> Self {
        Self {
            name: format!("wb_{name}"),
            forward: wishbone::M2S_WIDTH,
            backward: wishbone::S2M_WIDTH,
        }
    }

    /// Valid/ready stream carrying `data_width` bits plus `valid` and `last`.
    pub fn stream(name: impl Into<String>, data_width: u32) -> Self {
        Self {
            name: name.into(),
            forward: data_width + 2,
            backward: 1,
        }
    }

    /// Initiator-driven net.
    pub fn forward_net(&self) -> String {
        format!("{}_fwd", self.name)
    }

    /// Target-driven net.
    pub fn backward_net(&self) -> String {
        format!("{}_bwd", self.name)
    }

    /// Declares both nets in `top`.
    pub fn declare(&self, top: &mut Module) -> Result<()> {
        let _ = top.declare_signal(self.forward_net(), self.forward)?;
        let _ = top.declare_signal(self.backward_net(), self.backward)?;
        Ok(())
    }

    /// Returns `true` once both nets exist in `top`.
    pub fn is_declared_in(&self, top: &Module) -> bool {
        top.is_declared(&self.forward_net()) && top.is_declared(&self.backward_net())
    }

    /// Returns `true` if some instance in `top` connects to the forward net.
    pub fn is_attached_in(&self, top: &Module) -> bool {
        let net = Expr::sig(self.forward_net());
        top.instances()
            .iter()
            .any(|i| i.ports.iter().any(|(_, expr)| *expr == net))
    }

    /// Connects instance ports `<port>_fwd` / `<port>_bwd` to the channel.
    #[must_use]
    pub fn attach(&self, instance: Instance, port: &str) -> Instance {
        instance
            .port(&format!("{port}_fwd"), Expr::sig(self.forward_net()))
            .port(&format!("{port}_bwd"), Expr::sig(self.backward_net()))
    }
}

/// A flat module: the top level of the composed design.
///
/// Statements are append-only; names are unique across ports and signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    name: String,
    ports: Vec<Port>,
    signals: Vec<Signal>,
    domains: Vec<ClockDomain>,
    comb: Vec<CombAssign>,
    sync: Vec<SyncAssign>,
    instances: Vec<Instance>,
}

impl Module {
    /// Creates an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            signals: Vec::new(),
            domains: Vec::new(),
            comb: Vec::new(),
            sync: Vec::new(),
            instances: Vec::new(),
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.ports.iter().any(|p| p.name == name) || self.signals.iter().any(|s| s.name == name)
    }

    fn ensure_unique(&self, name: &str) -> Result<()> {
        if self.is_declared(name) {
            return Err(SocError::InvalidConfig(format!(
                "signal `{name}` declared twice in module `{}`",
                self.name
            )));
        }
        Ok(())
    }

    /// Declares a top-level port.
    pub fn add_port(&mut self, name: impl Into<String>, dir: Direction, width: u32) -> Result<()> {
        let name = name.into();
        self.ensure_unique(&name)?;
        self.ports.push(Port { name, dir, width });
        Ok(())
    }

    /// Declares an internal signal with a reset value of zero.
    pub fn declare_signal(&mut self, name: impl Into<String>, width: u32) -> Result<Expr> {
        let name = name.into();
        self.ensure_unique(&name)?;
        self.signals.push(Signal {
            name: name.clone(),
            width,
            reset: 0,
        });
        Ok(Expr::Sig(name))
    }

    /// Declares a clock domain together with its clock and reset nets.
    pub fn declare_domain(&mut self, domain: ClockDomain) -> Result<()> {
        if self.domains.iter().any(|d| d.name == domain.name) {
            return Err(SocError::InvalidConfig(format!(
                "clock domain `{}` declared twice",
                domain.name
            )));
        }
        let _ = self.declare_signal(domain.clk(), 1)?;
        if let Some(rst) = domain.rst() {
            let _ = self.declare_signal(rst, 1)?;
        }
        self.domains.push(domain);
        Ok(())
    }

    /// Continuous assignment.
    pub fn comb(&mut self, target: impl Into<String>, value: Expr) {
        self.comb.push(CombAssign {
            target: target.into(),
            value,
        });
    }

    /// Registered assignment in `domain`.
    pub fn sync(&mut self, domain: impl Into<String>, target: impl Into<String>, value: Expr) {
        self.sync.push(SyncAssign {
            domain: domain.into(),
            target: target.into(),
            value,
        });
    }

    /// Adds a black-box instance.
    pub fn instantiate(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Internal signals in declaration order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Clock domains in declaration order.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    /// Looks up a clock domain.
    pub fn domain(&self, name: &str) -> Option<&ClockDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    /// Continuous assignments.
    pub fn comb_statements(&self) -> &[CombAssign] {
        &self.comb
    }

    /// Registered assignments.
    pub fn sync_statements(&self) -> &[SyncAssign] {
        &self.sync
    }

    /// Black-box instances.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Looks up an instance by name.
    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }
}
