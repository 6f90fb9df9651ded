//! SDRAM memory controller.
//!
//! Generic SDR PHY plus controller core, backing the `main_ram` region. The
//! PHY runs either at the system clock (1:1) or at twice the system clock
//! (1:2); in both cases the external chip clock comes from a phase-shifted PLL
//! output. PHY and controller talk over a DFI channel (`sdram_dfi`); the
//! controller serves `main_ram` on the bus.

use serde::Serialize;
use serde_json::json;

use crate::common::Result;
use crate::config::{BoardRevision, SdramRate, SocConfig};
use crate::feature::{Elaboration, Feature};
use crate::hdl::{Channel, ClockDomain, Expr, Instance, ResetPolicy};
use crate::soc::interconnect::{MemoryRegion, mem_map};

/// Chip geometry and timings (nanoseconds).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdramModule {
    /// Part number.
    pub name: &'static str,
    /// Banks.
    pub nbanks: u32,
    /// Rows per bank.
    pub nrows: u32,
    /// Columns per row.
    pub ncols: u32,
    /// Data bus width on the board.
    pub databits: u32,
    /// Precharge period.
    pub t_rp: f64,
    /// Activate to read/write delay.
    pub t_rcd: f64,
    /// Write recovery.
    pub t_wr: f64,
    /// Refresh cycle time.
    pub t_rfc: f64,
    /// Row active time.
    pub t_ras: f64,
    /// Average refresh interval.
    pub t_refi: f64,
}

/// 7.0 boards: 64 Mbit, 4 banks.
pub const M12L64322A: SdramModule = SdramModule {
    name: "M12L64322A",
    nbanks: 4,
    nrows: 2048,
    ncols: 256,
    databits: 32,
    t_rp: 15.0,
    t_rcd: 15.0,
    t_wr: 15.0,
    t_rfc: 55.0,
    t_ras: 40.0,
    t_refi: 64e6 / 4096.0,
};

/// 6.1 boards: 16 Mbit parts, 2 banks.
pub const M12L16161A: SdramModule = SdramModule {
    name: "M12L16161A",
    nbanks: 2,
    nrows: 2048,
    ncols: 256,
    databits: 32,
    t_rp: 15.0,
    t_rcd: 15.0,
    t_wr: 15.0,
    t_rfc: 55.0,
    t_ras: 40.0,
    t_refi: 64e6 / 4096.0,
};

impl SdramModule {
    /// Chip fitted on `revision`.
    pub const fn for_revision(revision: BoardRevision) -> &'static Self {
        match revision {
            BoardRevision::V7_0 => &M12L64322A,
            BoardRevision::V6_1 => &M12L16161A,
        }
    }

    /// Capacity in bytes.
    pub const fn size(&self) -> u64 {
        self.nbanks as u64 * self.nrows as u64 * self.ncols as u64 * (self.databits as u64 / 8)
    }

    /// Bank address width.
    pub const fn bank_bits(&self) -> u32 {
        self.nbanks.trailing_zeros()
    }

    /// Row/column address width on the chip.
    pub const fn address_bits(&self) -> u32 {
        let rows = self.nrows.trailing_zeros();
        let cols = self.ncols.trailing_zeros();
        if rows > cols { rows } else { cols }
    }
}

/// SDRAM PHY + controller feature.
#[derive(Debug, Clone)]
pub struct MemoryController {
    rate: SdramRate,
    module: &'static SdramModule,
    clocks: Vec<ClockDomain>,
}

impl MemoryController {
    /// Node name.
    pub const NAME: &'static str = "sdram";

    /// Region and bus slave name.
    pub const REGION: &'static str = "main_ram";

    /// Phase shift of the chip clock.
    pub const CLOCK_PHASE_DEG: u32 = 90;

    /// Configures the controller for the board revision and PHY rate.
    pub fn new(config: &SocConfig) -> Self {
        let sys = config.sys_clk_freq;
        let clocks = match config.sdram.rate {
            SdramRate::Full => vec![
                ClockDomain::new("sys_ps", sys, ResetPolicy::ResetLess)
                    .with_phase(Self::CLOCK_PHASE_DEG),
            ],
            SdramRate::Half => {
                let sys2x = crate::common::Frequency::hz(sys.as_hz() * 2);
                vec![
                    ClockDomain::new("sys2x", sys2x, ResetPolicy::ResetLess),
                    ClockDomain::new("sys2x_ps", sys2x, ResetPolicy::ResetLess)
                        .with_phase(Self::CLOCK_PHASE_DEG),
                ]
            }
        };
        Self {
            rate: config.sdram.rate,
            module: SdramModule::for_revision(config.revision),
            clocks,
        }
    }

    /// Fitted chip.
    pub const fn module(&self) -> &'static SdramModule {
        self.module
    }

    /// PHY rate.
    pub const fn rate(&self) -> SdramRate {
        self.rate
    }

    /// Domain clocking the external chip.
    pub fn chip_clock_domain(&self) -> &str {
        match self.rate {
            SdramRate::Full => "sys_ps",
            SdramRate::Half => "sys2x_ps",
        }
    }

    /// DFI phases per `sys` cycle.
    pub const fn nphases(&self) -> u32 {
        match self.rate {
            SdramRate::Full => 1,
            SdramRate::Half => 2,
        }
    }

    /// DFI link between PHY and controller.
    ///
    /// Per phase, the controller drives address, bank, `cs_n`/`cke`/`ras_n`/`cas_n`/`we_n`,
    /// write data with its mask and enables; the PHY returns read data and its valid flag.
    pub fn dfi(&self) -> Channel {
        let m = self.module;
        let per_phase = m.address_bits() + m.bank_bits() + 5 + m.databits + m.databits / 8 + 2;
        Channel {
            name: "sdram_dfi".to_string(),
            forward: self.nphases() * per_phase,
            backward: self.nphases() * (m.databits + 1),
        }
    }

    const fn phy_kind(&self) -> &'static str {
        match self.rate {
            SdramRate::Full => "GENSDRPHY",
            SdramRate::Half => "HalfRateGENSDRPHY",
        }
    }
}

impl Feature for MemoryController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_clocks(&self) -> Vec<ClockDomain> {
        self.clocks.clone()
    }

    fn elaborate(&mut self, ctx: &mut Elaboration<'_>) -> Result<()> {
        let chip_clk = ctx.domain(self.chip_clock_domain())?.clk();
        let sys_freq = ctx.domain("sys")?.freq;

        let clock = ctx.platform.request("sdram_clock", 0, Self::NAME)?;
        clock.declare_ports(ctx.top)?;
        ctx.top.comb(clock.port_name("")?, Expr::sig(chip_clk));

        let pads = ctx.platform.request("sdram", 0, Self::NAME)?;
        pads.declare_ports(ctx.top)?;

        let dfi = self.dfi();
        let bus = Channel::wishbone(Self::REGION);
        dfi.declare(ctx.top)?;
        bus.declare(ctx.top)?;

        let mut phy = Instance::new(self.phy_kind(), "sdrphy")
            .param_int("DATABITS", i64::from(self.module.databits))
            .param_int("NPHASES", i64::from(self.nphases()))
            .param_int("CL", 2)
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"));
        if self.rate == SdramRate::Half {
            phy = phy.port("sys2x_clk", Expr::sig("sys2x_clk"));
        }
        for signal in &pads.signals {
            phy = phy.port(&format!("pads_{}", signal.name), Expr::sig(signal.port.clone()));
        }
        ctx.top.instantiate(dfi.attach(phy, "dfi"));

        let m = self.module;
        let core = Instance::new("LiteDRAMCore", Self::NAME)
            .param_str("MODULE", m.name)
            .param_int("NBANKS", i64::from(m.nbanks))
            .param_int("NROWS", i64::from(m.nrows))
            .param_int("NCOLS", i64::from(m.ncols))
            .param_int("DATABITS", i64::from(m.databits))
            .param_int("CLK_FREQ", sys_freq.as_hz() as i64)
            .param_int("T_RP_PS", (m.t_rp * 1e3) as i64)
            .param_int("T_RCD_PS", (m.t_rcd * 1e3) as i64)
            .param_int("T_WR_PS", (m.t_wr * 1e3) as i64)
            .param_int("T_RFC_PS", (m.t_rfc * 1e3) as i64)
            .param_int("T_RAS_PS", (m.t_ras * 1e3) as i64)
            .param_int("T_REFI_PS", (m.t_refi * 1e3) as i64)
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"));
        ctx.top.instantiate(bus.attach(dfi.attach(core, "dfi"), "bus"));
        Ok(())
    }

    fn memory_region(&self) -> Option<MemoryRegion> {
        Some(MemoryRegion::new(
            Self::REGION,
            mem_map::MAIN_RAM,
            self.module.size(),
            true,
        ))
    }

    fn csr_banks(&self) -> &[&'static str] {
        &["sdram"]
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "module": self.module,
            "rate": self.rate.to_string(),
            "phy": self.phy_kind(),
            "chip_clock": self.chip_clock_domain(),
        })
    }
}
