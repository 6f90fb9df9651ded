//! Configuration for a Colorlight 5A-75B SoC build.
//!
//! This module defines every structure the composer and the build controller
//! consume. It provides:
//! 1. **Defaults:** Board constants (system clock, network addressing, memory sizes).
//! 2. **Enums:** Board revision, gateware toolchain, SDRAM PHY rate, UART variant and
//!    feature kinds.
//! 3. **Structures:** Feature declarations, network/SDRAM/SoC-core parameters and the
//!    root [`SocConfig`].
//!
//! Configuration is built by the CLI from flags, optionally on top of a JSON file
//! deserialized into [`SocConfig`]. Once validated it is never mutated; the composer
//! and the controller only borrow it.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::build::layout::ArtifactLayout;
use crate::common::{Frequency, Result, SocError};

/// Default configuration constants for the board target.
mod defaults {
    /// System clock target (125 MHz).
    pub const SYS_CLK_FREQ: u64 = 125_000_000;

    /// Ethernet PHY used when none is selected (the board carries two).
    pub const ETH_PHY: u32 = 0;

    /// MAC address burned into the network core.
    pub const MAC_ADDRESS: u64 = 0x10e2_d500_0000;

    /// IPv4 address burned into the network core.
    pub const IP_ADDRESS: [u8; 4] = [192, 168, 1, 50];

    /// UDP port the Etherbone transport listens on.
    pub const ETHERBONE_PORT: u16 = 1234;

    /// Integrated boot ROM size in bytes (32 KiB).
    pub const INTEGRATED_ROM_SIZE: u64 = 0x8000;

    /// Integrated SRAM size in bytes (8 KiB).
    pub const INTEGRATED_SRAM_SIZE: u64 = 0x2000;

    /// Root directory under which artifact directories are created.
    pub const OUTPUT_DIR: &str = ".";
}

/// Board revision selecting the pinout variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoardRevision {
    /// Revision 7.0 (M12L64322A SDRAM, user button present).
    #[default]
    #[serde(rename = "7.0")]
    V7_0,
    /// Revision 6.1 (M12L16161A SDRAM, no user button).
    #[serde(rename = "6.1")]
    V6_1,
}

impl fmt::Display for BoardRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V7_0 => write!(f, "7.0"),
            Self::V6_1 => write!(f, "6.1"),
        }
    }
}

impl FromStr for BoardRevision {
    type Err = SocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "7.0" => Ok(Self::V7_0),
            "6.1" => Ok(Self::V6_1),
            other => Err(SocError::InvalidConfig(format!(
                "unknown board revision `{other}` (expected 7.0 or 6.1)"
            ))),
        }
    }
}

/// Gateware toolchain that turns the composed design into a bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// Open-source flow: yosys, nextpnr-ecp5, ecppack.
    #[default]
    Trellis,
    /// Lattice Diamond.
    Diamond,
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trellis => write!(f, "trellis"),
            Self::Diamond => write!(f, "diamond"),
        }
    }
}

impl FromStr for Toolchain {
    type Err = SocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trellis" => Ok(Self::Trellis),
            "diamond" => Ok(Self::Diamond),
            other => Err(SocError::InvalidConfig(format!(
                "unknown gateware toolchain `{other}` (expected trellis or diamond)"
            ))),
        }
    }
}

/// SDRAM PHY clock ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SdramRate {
    /// Single data rate PHY clocked by `sys` (`GENSDRPHY`).
    #[default]
    #[serde(rename = "1:1")]
    Full,
    /// Half-rate PHY clocked by `sys2x` (`HalfRateGENSDRPHY`).
    #[serde(rename = "1:2")]
    Half,
}

impl fmt::Display for SdramRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "1:1"),
            Self::Half => write!(f, "1:2"),
        }
    }
}

impl FromStr for SdramRate {
    type Err = SocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1:1" => Ok(Self::Full),
            "1:2" => Ok(Self::Half),
            other => Err(SocError::InvalidConfig(format!(
                "unknown SDRAM rate `{other}` (expected 1:1 or 1:2)"
            ))),
        }
    }
}

/// How the SoC console UART is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UartName {
    /// Physical serial pads; they overlay the user LED and button.
    Serial,
    /// Crossover UART reachable from the bus (e.g. over Etherbone).
    #[default]
    Crossover,
    /// Register-compatible stub with no I/O.
    Stub,
}

impl fmt::Display for UartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Crossover => write!(f, "crossover"),
            Self::Stub => write!(f, "stub"),
        }
    }
}

impl FromStr for UartName {
    type Err = SocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "serial" => Ok(Self::Serial),
            "crossover" => Ok(Self::Crossover),
            "stub" => Ok(Self::Stub),
            other => Err(SocError::InvalidConfig(format!(
                "unknown UART `{other}` (expected serial, crossover or stub)"
            ))),
        }
    }
}

/// Optional subsystems the composer can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// SDRAM memory controller backing `main_ram`.
    Sdram,
    /// Raw Ethernet: PHY + MAC exposed to software.
    Ethernet,
    /// Etherbone: PHY + UDP/IP + remote bus master.
    Etherbone,
}

impl FeatureKind {
    /// Stable name used in the module graph and in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sdram => "sdram",
            Self::Ethernet => "ethernet",
            Self::Etherbone => "etherbone",
        }
    }

    /// Exclusive resource group; two enabled features in the same group conflict.
    ///
    /// Both network modes drive the same Ethernet PHY pads.
    pub const fn exclusive_group(self) -> Option<&'static str> {
        match self {
            Self::Ethernet | Self::Etherbone => Some("ethernet PHY pads"),
            Self::Sdram => None,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the feature list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDecl {
    /// Which subsystem.
    pub kind: FeatureKind,
    /// Whether it is instantiated.
    #[serde(default = "FeatureDecl::default_enabled")]
    pub enabled: bool,
    /// Opaque per-feature parameters, recorded with the feature's module node.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

impl FeatureDecl {
    /// Declarations listed in a file are enabled unless stated otherwise.
    const fn default_enabled() -> bool {
        true
    }
}

/// Ordered feature declarations.
///
/// Declaration order is significant: features are instantiated, constrained
/// and attached to the interconnect in this order, which fixes bus-master
/// arbitration priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureConfig {
    decls: Vec<FeatureDecl>,
}

impl FeatureConfig {
    /// Creates an empty feature list.
    pub const fn new() -> Self {
        Self { decls: Vec::new() }
    }

    /// Appends a declaration, keeping declaration order.
    #[must_use]
    pub fn with(self, kind: FeatureKind, enabled: bool) -> Self {
        self.with_parameters(kind, enabled, serde_json::Value::Null)
    }

    /// Appends a declaration carrying opaque parameters.
    #[must_use]
    pub fn with_parameters(
        mut self,
        kind: FeatureKind,
        enabled: bool,
        parameters: serde_json::Value,
    ) -> Self {
        self.decls.push(FeatureDecl {
            kind,
            enabled,
            parameters,
        });
        self
    }

    /// Parameters of the enabled declaration of `kind` (`Null` if none were given).
    pub fn parameters(&self, kind: FeatureKind) -> &serde_json::Value {
        self.decls
            .iter()
            .find(|d| d.enabled && d.kind == kind)
            .map_or(&serde_json::Value::Null, |d| &d.parameters)
    }

    /// All declarations, enabled or not, in declaration order.
    pub fn declarations(&self) -> &[FeatureDecl] {
        &self.decls
    }

    /// Enabled feature kinds in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = FeatureKind> + '_ {
        self.decls.iter().filter(|d| d.enabled).map(|d| d.kind)
    }

    /// Returns `true` if `kind` is declared and enabled.
    pub fn is_enabled(&self, kind: FeatureKind) -> bool {
        self.enabled().any(|k| k == kind)
    }

    /// Checks the mutual-exclusion invariant without instantiating anything.
    ///
    /// A feature enabled twice, or two features of the same exclusive group,
    /// are rejected naming the earlier and the later declaration. The check is
    /// pure, so repeated calls return the same error.
    pub fn validate(&self) -> Result<()> {
        let enabled: Vec<FeatureKind> = self.enabled().collect();
        for (i, later) in enabled.iter().enumerate() {
            for earlier in &enabled[..i] {
                if earlier == later {
                    return Err(SocError::ConfigurationConflict {
                        first: earlier.name().to_string(),
                        second: later.name().to_string(),
                        detail: "feature declared twice".to_string(),
                    });
                }
                if let (Some(a), Some(b)) = (earlier.exclusive_group(), later.exclusive_group()) {
                    if a == b {
                        return Err(SocError::ConfigurationConflict {
                            first: earlier.name().to_string(),
                            second: later.name().to_string(),
                            detail: format!("both require exclusive use of the {a}"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A 48-bit Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(pub u64);

impl MacAddress {
    /// Largest 48-bit address.
    pub const MAX: u64 = 0xFFFF_FFFF_FFFF;
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// Network addressing shared by both Ethernet modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Which of the two PHYs to use (0 or 1).
    #[serde(default = "NetworkConfig::default_eth_phy")]
    pub eth_phy: u32,

    /// MAC address burned into the image.
    #[serde(default = "NetworkConfig::default_mac")]
    pub mac_address: MacAddress,

    /// IPv4 address burned into the image.
    #[serde(default = "NetworkConfig::default_ip")]
    pub ip_address: Ipv4Addr,

    /// UDP port of the Etherbone transport.
    #[serde(default = "NetworkConfig::default_port")]
    pub etherbone_port: u16,
}

impl NetworkConfig {
    fn default_eth_phy() -> u32 {
        defaults::ETH_PHY
    }

    fn default_mac() -> MacAddress {
        MacAddress(defaults::MAC_ADDRESS)
    }

    fn default_ip() -> Ipv4Addr {
        Ipv4Addr::from(defaults::IP_ADDRESS)
    }

    fn default_port() -> u16 {
        defaults::ETHERBONE_PORT
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            eth_phy: defaults::ETH_PHY,
            mac_address: MacAddress(defaults::MAC_ADDRESS),
            ip_address: Ipv4Addr::from(defaults::IP_ADDRESS),
            etherbone_port: defaults::ETHERBONE_PORT,
        }
    }
}

/// SDRAM controller parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdramConfig {
    /// PHY clock ratio.
    #[serde(default)]
    pub rate: SdramRate,
}

/// SoC core: integrated memories and console UART.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocCoreConfig {
    /// Boot ROM size in bytes.
    #[serde(default = "SocCoreConfig::default_rom_size")]
    pub integrated_rom_size: u64,

    /// On-chip SRAM size in bytes.
    #[serde(default = "SocCoreConfig::default_sram_size")]
    pub integrated_sram_size: u64,

    /// Console UART variant.
    #[serde(default)]
    pub uart_name: UartName,
}

impl SocCoreConfig {
    fn default_rom_size() -> u64 {
        defaults::INTEGRATED_ROM_SIZE
    }

    fn default_sram_size() -> u64 {
        defaults::INTEGRATED_SRAM_SIZE
    }
}

impl Default for SocCoreConfig {
    fn default() -> Self {
        Self {
            integrated_rom_size: defaults::INTEGRATED_ROM_SIZE,
            integrated_sram_size: defaults::INTEGRATED_SRAM_SIZE,
            uart_name: UartName::default(),
        }
    }
}

/// Root configuration for one invocation.
///
/// # Examples
///
/// ```
/// use colorlight_soc::config::{BoardRevision, FeatureKind, SocConfig};
///
/// let json = r#"{
///     "revision": "6.1",
///     "features": [
///         { "kind": "sdram" },
///         { "kind": "etherbone" }
///     ]
/// }"#;
///
/// let config = SocConfig::from_json_str(json).unwrap();
/// assert_eq!(config.revision, BoardRevision::V6_1);
/// assert!(config.features.is_enabled(FeatureKind::Etherbone));
/// assert_eq!(config.class_name(), "etherbonesoc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocConfig {
    /// Board revision.
    #[serde(default)]
    pub revision: BoardRevision,

    /// Gateware toolchain.
    #[serde(default)]
    pub toolchain: Toolchain,

    /// System clock target.
    #[serde(default = "SocConfig::default_sys_clk_freq")]
    pub sys_clk_freq: Frequency,

    /// Ordered feature declarations.
    #[serde(default)]
    pub features: FeatureConfig,

    /// Network addressing.
    #[serde(default)]
    pub network: NetworkConfig,

    /// SDRAM parameters.
    #[serde(default)]
    pub sdram: SdramConfig,

    /// SoC core: integrated memories and console UART.
    #[serde(default)]
    pub soc: SocCoreConfig,

    /// Opaque builder/backend options, passed through to the build descriptor.
    #[serde(default)]
    pub builder_options: BTreeMap<String, String>,

    /// Root directory for artifact directories.
    #[serde(default = "SocConfig::default_output_dir")]
    pub output_dir: PathBuf,

    /// Run the toolchain after writing gateware files.
    #[serde(default = "SocConfig::default_compile_gateware")]
    pub compile_gateware: bool,

    /// Elaborate only the status blinker against the raw platform.
    #[serde(default)]
    pub no_soc: bool,
}

impl SocConfig {
    fn default_sys_clk_freq() -> Frequency {
        Frequency::hz(defaults::SYS_CLK_FREQ)
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from(defaults::OUTPUT_DIR)
    }

    const fn default_compile_gateware() -> bool {
        true
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SocError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Validates every invariant that can be checked before elaboration.
    ///
    /// # Errors
    ///
    /// [`SocError::ConfigurationConflict`] for exclusive features,
    /// [`SocError::InvalidConfig`] for out-of-range parameters.
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        if self.sys_clk_freq.as_hz() == 0 {
            return Err(SocError::InvalidConfig(
                "system clock frequency must be non-zero".to_string(),
            ));
        }
        if self.network.eth_phy > 1 {
            return Err(SocError::InvalidConfig(format!(
                "ethernet PHY {} does not exist (expected 0 or 1)",
                self.network.eth_phy
            )));
        }
        if self.network.mac_address.0 > MacAddress::MAX {
            return Err(SocError::InvalidConfig(format!(
                "MAC address {:#x} does not fit in 48 bits",
                self.network.mac_address.0
            )));
        }
        Ok(())
    }

    /// Lower-case class name of the composed SoC, used for artifact naming.
    pub fn class_name(&self) -> &'static str {
        if self.features.is_enabled(FeatureKind::Etherbone) {
            "etherbonesoc"
        } else if self.features.is_enabled(FeatureKind::Ethernet) {
            "ethernetsoc"
        } else {
            "basesoc"
        }
    }

    /// Where this configuration's build artifacts live.
    pub fn artifact_layout(&self) -> ArtifactLayout {
        ArtifactLayout::for_config(self)
    }
}

impl Default for SocConfig {
    fn default() -> Self {
        Self {
            revision: BoardRevision::default(),
            toolchain: Toolchain::default(),
            sys_clk_freq: Frequency::hz(defaults::SYS_CLK_FREQ),
            features: FeatureConfig::new(),
            network: NetworkConfig::default(),
            sdram: SdramConfig::default(),
            soc: SocCoreConfig::default(),
            builder_options: BTreeMap::new(),
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            compile_gateware: true,
            no_soc: false,
        }
    }
}
