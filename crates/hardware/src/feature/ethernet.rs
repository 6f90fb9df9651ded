//! Ethernet: the RGMII PHY shared by both network modes, and the raw MAC feature.
//!
//! The PHY owns two byte streams, `ethphy_rx` (PHY to consumer) and
//! `ethphy_tx` (consumer to PHY); whichever core sits on top of it attaches
//! to both as `phy_rx` / `phy_tx`.

use serde_json::json;
use tracing::debug;

use crate::common::{Frequency, Result};
use crate::config::SocConfig;
use crate::feature::{Elaboration, Feature};
use crate::hdl::{Channel, ClockDomain, Expr, Instance, ResetPolicy};
use crate::platform::{ClockRef, ConstraintSet};
use crate::soc::interconnect::{MemoryRegion, mem_map};

/// RGMII link clock.
pub const ETH_CLK_FREQ: Frequency = Frequency::mhz(125);

/// RGMII PHY on one of the two board ports.
///
/// The PHY adds the TX clock delay itself; the FPGA delays RX by 2 ns to
/// compensate clock routing to the input registers.
#[derive(Debug, Clone)]
pub struct RgmiiPhy {
    index: u32,
    tx_delay_ps: u32,
    rx_delay_ps: u32,
    domains: Vec<ClockDomain>,
}

impl RgmiiPhy {
    /// Node and CSR bank name.
    pub const NAME: &'static str = "ethphy";

    /// Width of the PHY data path.
    pub const DATA_WIDTH: u32 = 8;

    /// Describes the PHY on port `index`; nothing is requested yet.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            tx_delay_ps: 0,
            rx_delay_ps: 2000,
            domains: vec![
                ClockDomain::new("eth_rx", ETH_CLK_FREQ, ResetPolicy::Synchronous),
                ClockDomain::new("eth_tx", ETH_CLK_FREQ, ResetPolicy::Synchronous),
            ],
        }
    }

    /// Board port.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// RX/TX domains.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    /// Received frames, PHY to consumer.
    pub fn rx_stream() -> Channel {
        Channel::stream("ethphy_rx", Self::DATA_WIDTH)
    }

    /// Frames to send, consumer to PHY.
    pub fn tx_stream() -> Channel {
        Channel::stream("ethphy_tx", Self::DATA_WIDTH)
    }

    /// Attaches a consumer instance to both PHY streams.
    #[must_use]
    pub fn attach_consumer(instance: Instance) -> Instance {
        let instance = Self::rx_stream().attach(instance, "phy_rx");
        Self::tx_stream().attach(instance, "phy_tx")
    }

    /// Claims the PHY pads, declares the RX/TX domains and instantiates the PHY.
    pub fn elaborate(&self, ctx: &mut Elaboration<'_>) -> Result<()> {
        let clock_pads = ctx.platform.request("eth_clocks", self.index, Self::NAME)?;
        let pads = ctx.platform.request("eth", self.index, Self::NAME)?;
        clock_pads.declare_ports(ctx.top)?;
        pads.declare_ports(ctx.top)?;
        for domain in &self.domains {
            ctx.top.declare_domain(domain.clone())?;
        }

        let mut phy = Instance::new("LiteEthPHYRGMII", Self::NAME)
            .param_int("TX_DELAY_PS", i64::from(self.tx_delay_ps))
            .param_int("RX_DELAY_PS", i64::from(self.rx_delay_ps))
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"));
        for bundle in [&clock_pads, &pads] {
            for signal in &bundle.signals {
                phy = phy.port(
                    &format!("{}_{}", bundle.resource, signal.name),
                    Expr::sig(signal.port.clone()),
                );
            }
        }
        for domain in &self.domains {
            phy = phy.port(&format!("{}_clk", domain.name), Expr::sig(domain.clk()));
            if let Some(rst) = domain.rst() {
                phy = phy.port(&format!("{}_rst", domain.name), Expr::sig(rst));
            }
        }
        let rx = Self::rx_stream();
        let tx = Self::tx_stream();
        rx.declare(ctx.top)?;
        tx.declare(ctx.top)?;
        phy = tx.attach(rx.attach(phy, "rx"), "tx");
        ctx.top.instantiate(phy);
        debug!(phy = self.index, "RGMII PHY elaborated");
        Ok(())
    }

    /// Period on both link clocks; `sys`, RX and TX mutually unrelated.
    pub fn constraints(&self) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        for domain in &self.domains {
            set.add_period(ClockRef::Domain(domain.name.clone()), domain.freq);
        }
        let mut unrelated = vec![ClockRef::Domain("sys".to_string())];
        unrelated.extend(self.domains.iter().map(|d| ClockRef::Domain(d.name.clone())));
        set.add_false_paths(&unrelated);
        set
    }

    /// Descriptor fields shared by both network modes.
    pub fn parameters(&self) -> serde_json::Value {
        json!({
            "index": self.index,
            "tx_delay_ps": self.tx_delay_ps,
            "rx_delay_ps": self.rx_delay_ps,
        })
    }
}

/// Raw Ethernet: PHY plus a MAC whose buffers software reaches over the bus.
#[derive(Debug, Clone)]
pub struct Ethernet {
    phy: RgmiiPhy,
}

impl Ethernet {
    /// Node name.
    pub const NAME: &'static str = "ethernet";

    /// MAC buffer region and bus slave name.
    pub const REGION: &'static str = "ethmac";

    /// Uses the PHY selected by `config.network.eth_phy`.
    pub fn new(config: &SocConfig) -> Self {
        Self {
            phy: RgmiiPhy::new(config.network.eth_phy),
        }
    }

    /// The PHY.
    pub const fn phy(&self) -> &RgmiiPhy {
        &self.phy
    }
}

impl Feature for Ethernet {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elaborate(&mut self, ctx: &mut Elaboration<'_>) -> Result<()> {
        self.phy.elaborate(ctx)?;
        let bus = Channel::wishbone(Self::REGION);
        bus.declare(ctx.top)?;
        let mac = Instance::new("LiteEthMAC", Self::REGION)
            .param_str("INTERFACE", "wishbone")
            .param_str("ENDIANNESS", "little")
            .param_int("WITH_PREAMBLE_CRC", 1)
            .param_int("NRXSLOTS", 2)
            .param_int("NTXSLOTS", 2)
            .param_int("BUS_BASE", mem_map::ETHMAC as i64)
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"))
            .port("eth_rx_clk", Expr::sig("eth_rx_clk"))
            .port("eth_tx_clk", Expr::sig("eth_tx_clk"));
        let mac = bus.attach(RgmiiPhy::attach_consumer(mac), "bus");
        ctx.top.instantiate(mac);
        Ok(())
    }

    fn clock_domains(&self) -> &[ClockDomain] {
        self.phy.domains()
    }

    fn memory_region(&self) -> Option<MemoryRegion> {
        Some(MemoryRegion::new(
            Self::REGION,
            mem_map::ETHMAC,
            mem_map::ETHMAC_SIZE,
            false,
        ))
    }

    fn csr_banks(&self) -> &[&'static str] {
        &[RgmiiPhy::NAME, Self::REGION]
    }

    fn constraints(&self) -> ConstraintSet {
        self.phy.constraints()
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "phy": self.phy.parameters() })
    }
}
