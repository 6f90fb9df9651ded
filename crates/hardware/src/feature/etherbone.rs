//! Etherbone: remote bus access over UDP.
//!
//! Stacks a UDP/IP core with fixed addressing on the RGMII PHY and bridges
//! Etherbone packets on a fixed port to a bus master. Data flows
//! `ethphy` -> `ethcore` -> `etherbone` over stream channels, and the bridge
//! drives the `wb_etherbone` master channel.

use std::net::Ipv4Addr;

use serde_json::json;

use crate::common::Result;
use crate::config::{MacAddress, SocConfig};
use crate::feature::ethernet::RgmiiPhy;
use crate::feature::{Elaboration, Feature};
use crate::hdl::{Channel, ClockDomain, Expr, Instance};
use crate::platform::ConstraintSet;

/// PHY + UDP/IP + Etherbone bridge.
#[derive(Debug, Clone)]
pub struct Etherbone {
    phy: RgmiiPhy,
    mac_address: MacAddress,
    ip_address: Ipv4Addr,
    udp_port: u16,
}

impl Etherbone {
    /// Node and bus-master name.
    pub const NAME: &'static str = "etherbone";

    /// Uses the PHY and addressing from `config.network`.
    pub fn new(config: &SocConfig) -> Self {
        let net = &config.network;
        Self {
            phy: RgmiiPhy::new(net.eth_phy),
            mac_address: net.mac_address,
            ip_address: net.ip_address,
            udp_port: net.etherbone_port,
        }
    }

    /// The PHY.
    pub const fn phy(&self) -> &RgmiiPhy {
        &self.phy
    }

    /// UDP port the bridge listens on.
    pub const fn udp_port(&self) -> u16 {
        self.udp_port
    }

    /// UDP payload from the core to the bridge.
    pub fn udp_rx_stream() -> Channel {
        Channel::stream("ethcore_udp_rx", RgmiiPhy::DATA_WIDTH)
    }

    /// UDP payload from the bridge to the core.
    pub fn udp_tx_stream() -> Channel {
        Channel::stream("ethcore_udp_tx", RgmiiPhy::DATA_WIDTH)
    }
}

impl Feature for Etherbone {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elaborate(&mut self, ctx: &mut Elaboration<'_>) -> Result<()> {
        self.phy.elaborate(ctx)?;
        let clk_freq = ctx.domain("sys")?.freq;
        let udp_rx = Self::udp_rx_stream();
        let udp_tx = Self::udp_tx_stream();
        let bus = Channel::wishbone(Self::NAME);
        for channel in [&udp_rx, &udp_tx, &bus] {
            channel.declare(ctx.top)?;
        }

        let core = Instance::new("LiteEthUDPIPCore", "ethcore")
            .param_int("MAC_ADDRESS", self.mac_address.0 as i64)
            .param_int("IP_ADDRESS", i64::from(u32::from(self.ip_address)))
            .param_int("CLK_FREQ", clk_freq.as_hz() as i64)
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"))
            .port("eth_rx_clk", Expr::sig("eth_rx_clk"))
            .port("eth_tx_clk", Expr::sig("eth_tx_clk"));
        let core = RgmiiPhy::attach_consumer(core);
        ctx.top.instantiate(udp_tx.attach(udp_rx.attach(core, "udp_rx"), "udp_tx"));

        let bridge = Instance::new("LiteEthEtherbone", Self::NAME)
            .param_int("UDP_PORT", i64::from(self.udp_port))
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"));
        let bridge = udp_tx.attach(udp_rx.attach(bridge, "udp_sink"), "udp_source");
        ctx.top.instantiate(bus.attach(bridge, "wishbone"));
        Ok(())
    }

    fn clock_domains(&self) -> &[ClockDomain] {
        self.phy.domains()
    }

    fn bus_masters(&self) -> &[&'static str] {
        &[Self::NAME]
    }

    fn csr_banks(&self) -> &[&'static str] {
        &[RgmiiPhy::NAME]
    }

    fn constraints(&self) -> ConstraintSet {
        self.phy.constraints()
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "phy": self.phy.parameters(),
            "mac_address": self.mac_address.to_string(),
            "ip_address": self.ip_address.to_string(),
            "udp_port": self.udp_port,
        })
    }
}
