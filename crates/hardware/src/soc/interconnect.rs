//! Shared bus interconnect.
//!
//! This module implements the attachment contract between features and the
//! system bus. It provides:
//! 1. **Masters:** Registered in arbitration priority order; the first registered
//!    master has default priority.
//! 2. **Slaves:** Memory regions kept sorted by origin, with overlap and
//!    duplicate-name checks and address decoding.
//! 3. **CSR banks:** Named register banks allocated at fixed strides inside the
//!    CSR region, `ctrl` always first.
//!
//! Every attachment that would collide with an earlier one is rejected with
//! [`SocError::ConfigurationConflict`]; nothing is ever overwritten.
//!
//! Once every attachment is known, [`Interconnect::instance`] renders the
//! shared fabric as one black box whose master and slave ports connect to the
//! `wb_<name>` channels the attached instances drive.

use serde::Serialize;
use tracing::debug;

use crate::common::{Result, SocError};
use crate::config::SocCoreConfig;
use crate::hdl::{Channel, Expr, Instance, Module};

/// Default memory map.
pub mod mem_map {
    /// Boot ROM origin.
    pub const ROM: u64 = 0x0000_0000;
    /// Integrated SRAM origin.
    pub const SRAM: u64 = 0x0100_0000;
    /// External SDRAM origin.
    pub const MAIN_RAM: u64 = 0x4000_0000;
    /// CSR region origin.
    pub const CSR: u64 = 0x8200_0000;
    /// CSR region size.
    pub const CSR_SIZE: u64 = 0x1_0000;
    /// Ethernet MAC buffers origin.
    pub const ETHMAC: u64 = 0xb000_0000;
    /// Ethernet MAC buffers size.
    pub const ETHMAC_SIZE: u64 = 0x2000;
    /// Stride between CSR banks.
    pub const CSR_BANK_STRIDE: u64 = 0x800;
}

/// A memory-mapped slave window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    /// Region name (`rom`, `main_ram`, ...).
    pub name: String,
    /// Base address.
    pub origin: u64,
    /// Size in bytes.
    pub size: u64,
    /// Whether the region is cacheable.
    pub cached: bool,
}

impl MemoryRegion {
    /// Creates a region.
    pub fn new(name: impl Into<String>, origin: u64, size: u64, cached: bool) -> Self {
        Self {
            name: name.into(),
            origin,
            size,
            cached,
        }
    }

    /// One past the last address.
    pub const fn end(&self) -> u64 {
        self.origin.saturating_add(self.size)
    }

    /// Returns `true` if `addr` falls inside the region.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.origin && addr < self.end()
    }

    /// Returns `true` if the two regions share at least one address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.origin < other.end() && other.origin < self.end()
    }
}

/// A named CSR bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrBank {
    /// Bank name.
    pub name: String,
    /// Allocation index.
    pub index: u32,
    /// Base address.
    pub base: u64,
}

/// The system bus of a composed SoC.
#[derive(Debug, Clone, Serialize)]
pub struct Interconnect {
    masters: Vec<String>,
    slaves: Vec<MemoryRegion>,
    csr_banks: Vec<CsrBank>,
}

impl Interconnect {
    /// Bank always allocated first.
    pub const CTRL_BANK: &'static str = "ctrl";

    /// Module type of the rendered fabric.
    pub const FABRIC_KIND: &'static str = "WishboneInterconnect";

    /// Instance name of the rendered fabric.
    pub const FABRIC_NAME: &'static str = "bus";

    /// Integrated ROM region.
    pub const ROM_REGION: &'static str = "rom";

    /// Integrated SRAM region.
    pub const SRAM_REGION: &'static str = "sram";

    /// CSR bridge region.
    pub const CSR_REGION: &'static str = "csr";

    /// Creates an interconnect with the integrated memories and the CSR region.
    pub fn new(core: &SocCoreConfig) -> Result<Self> {
        let mut bus = Self {
            masters: Vec::new(),
            slaves: Vec::new(),
            csr_banks: Vec::new(),
        };
        if core.integrated_rom_size > 0 {
            bus.add_slave(MemoryRegion::new(
                Self::ROM_REGION,
                mem_map::ROM,
                core.integrated_rom_size,
                true,
            ))?;
        }
        if core.integrated_sram_size > 0 {
            bus.add_slave(MemoryRegion::new(
                Self::SRAM_REGION,
                mem_map::SRAM,
                core.integrated_sram_size,
                true,
            ))?;
        }
        bus.add_slave(MemoryRegion::new(
            Self::CSR_REGION,
            mem_map::CSR,
            mem_map::CSR_SIZE,
            false,
        ))?;
        let _ = bus.add_csr_bank(Self::CTRL_BANK)?;
        Ok(bus)
    }

    /// Registers a bus master and returns its arbitration priority (0 = highest).
    ///
    /// # Errors
    ///
    /// [`SocError::ConfigurationConflict`] if a master of the same name exists.
    pub fn add_master(&mut self, name: &str) -> Result<usize> {
        if self.masters.iter().any(|m| m == name) {
            return Err(SocError::ConfigurationConflict {
                first: name.to_string(),
                second: name.to_string(),
                detail: "bus master slot already occupied".to_string(),
            });
        }
        self.masters.push(name.to_string());
        let priority = self.masters.len() - 1;
        debug!(master = name, priority, "bus master registered");
        Ok(priority)
    }

    /// Registers a slave region; regions stay sorted by origin.
    ///
    /// # Errors
    ///
    /// [`SocError::ConfigurationConflict`] on a duplicate name or an address overlap,
    /// [`SocError::InvalidConfig`] for an empty region.
    pub fn add_slave(&mut self, region: MemoryRegion) -> Result<()> {
        if region.size == 0 {
            return Err(SocError::InvalidConfig(format!(
                "memory region `{}` has zero size",
                region.name
            )));
        }
        if let Some(existing) = self
            .slaves
            .iter()
            .find(|r| r.name == region.name || r.overlaps(&region))
        {
            let detail = if existing.name == region.name {
                "memory region already attached".to_string()
            } else {
                format!(
                    "address ranges overlap ({:#x}..{:#x} and {:#x}..{:#x})",
                    existing.origin,
                    existing.end(),
                    region.origin,
                    region.end()
                )
            };
            return Err(SocError::ConfigurationConflict {
                first: existing.name.clone(),
                second: region.name,
                detail,
            });
        }
        debug!(region = %region.name, origin = region.origin, size = region.size, "slave attached");
        self.slaves.push(region);
        self.slaves.sort_by_key(|r| r.origin);
        Ok(())
    }

    /// Allocates the next CSR bank.
    ///
    /// # Errors
    ///
    /// [`SocError::ConfigurationConflict`] if the bank name is taken,
    /// [`SocError::InvalidConfig`] if the CSR region is full.
    pub fn add_csr_bank(&mut self, name: &str) -> Result<&CsrBank> {
        if self.csr_banks.iter().any(|b| b.name == name) {
            return Err(SocError::ConfigurationConflict {
                first: name.to_string(),
                second: name.to_string(),
                detail: "CSR bank already allocated".to_string(),
            });
        }
        let index = self.csr_banks.len() as u32;
        let offset = u64::from(index) * mem_map::CSR_BANK_STRIDE;
        if offset >= mem_map::CSR_SIZE {
            return Err(SocError::InvalidConfig(format!(
                "no room left in the CSR region for bank `{name}`"
            )));
        }
        self.csr_banks.push(CsrBank {
            name: name.to_string(),
            index,
            base: mem_map::CSR + offset,
        });
        Ok(&self.csr_banks[self.csr_banks.len() - 1])
    }

    /// Region decoding `addr`, if any.
    pub fn decode(&self, addr: u64) -> Option<&MemoryRegion> {
        let idx = self.slaves.partition_point(|r| r.origin <= addr);
        idx.checked_sub(1)
            .map(|i| &self.slaves[i])
            .filter(|r| r.contains(addr))
    }

    /// Masters in priority order.
    pub fn masters(&self) -> &[String] {
        &self.masters
    }

    /// Slave regions sorted by origin.
    pub fn slaves(&self) -> &[MemoryRegion] {
        &self.slaves
    }

    /// Looks up a slave region by name.
    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.slaves.iter().find(|r| r.name == name)
    }

    /// CSR banks in allocation order.
    pub fn csr_banks(&self) -> &[CsrBank] {
        &self.csr_banks
    }

    /// Looks up a CSR bank by name.
    pub fn csr_bank(&self, name: &str) -> Option<&CsrBank> {
        self.csr_banks.iter().find(|b| b.name == name)
    }

    /// Bus channels of every master then every slave, in port order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.masters
            .iter()
            .map(String::as_str)
            .chain(self.slaves.iter().map(|r| r.name.as_str()))
            .map(Channel::wishbone)
    }

    /// Checks that every registered master and slave has its channel declared
    /// in `top` and connected to an instance.
    ///
    /// # Errors
    ///
    /// [`SocError::InvalidConfig`] naming the first channel left unwired.
    pub fn check_wiring(&self, top: &Module) -> Result<()> {
        match self
            .channels()
            .find(|c| !c.is_declared_in(top) || !c.is_attached_in(top))
        {
            Some(channel) => Err(SocError::InvalidConfig(format!(
                "bus port `{}` is registered but not wired in `{}`",
                channel.name,
                top.name()
            ))),
            None => Ok(()),
        }
    }

    /// The fabric black box: masters `m<i>` by priority, slaves `s<i>` by origin.
    pub fn instance(&self) -> Instance {
        let mut bus = Instance::new(Self::FABRIC_KIND, Self::FABRIC_NAME)
            .param_int("NMASTERS", self.masters.len() as i64)
            .param_int("NSLAVES", self.slaves.len() as i64);
        for (i, master) in self.masters.iter().enumerate() {
            bus = bus.param_str(&format!("M{i}_NAME"), master.as_str());
        }
        for (i, slave) in self.slaves.iter().enumerate() {
            bus = bus
                .param_str(&format!("S{i}_NAME"), slave.name.as_str())
                .param_int(&format!("S{i}_ORIGIN"), slave.origin as i64)
                .param_int(&format!("S{i}_SIZE"), slave.size as i64);
        }
        bus = bus
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"));
        for (i, master) in self.masters.iter().enumerate() {
            bus = Channel::wishbone(master).attach(bus, &format!("m{i}"));
        }
        for (i, slave) in self.slaves.iter().enumerate() {
            bus = Channel::wishbone(&slave.name).attach(bus, &format!("s{i}"));
        }
        bus
    }
}
