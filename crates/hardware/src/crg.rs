//! Clock and reset generation.
//!
//! This module derives every internal clock domain from the 25 MHz board
//! oscillator. It provides:
//! 1. **PLL solver:** [`Ecp5Pll`] searches the ECP5 `EHXPLLL` divider space for a
//!    configuration that reaches every requested output within 1%.
//! 2. **Clock tree:** [`Crg`] requests the oscillator (and the user button when the
//!    revision has one), declares `sys` plus any extra domains, and instantiates
//!    the PLL and the reset synchronizer in the top module.
//!
//! `sys` is released from reset only once the PLL reports lock and the button is
//! released. Without a button pad, reset follows PLL lock alone.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::{Frequency, Result, SocError};
use crate::hdl::{ClockDomain, Expr, Instance, Module, ResetPolicy};
use crate::platform::{self, ClockRef, Platform};

/// `EHXPLLL` operating limits.
mod limits {
    pub const CLKI_DIV: (u32, u32) = (1, 128);
    pub const CLKFB_DIV: (u32, u32) = (1, 128);
    pub const CLKO_DIV: (u32, u32) = (1, 128);
    pub const CLKI_FREQ: (f64, f64) = (8e6, 400e6);
    pub const CLKO_FREQ: (f64, f64) = (3.125e6, 400e6);
    pub const VCO_FREQ: (f64, f64) = (400e6, 800e6);
    pub const MAX_OUTPUTS: usize = 3;
    pub const MARGIN: f64 = 1e-2;
}

/// Output port names in allocation order.
const OUTPUT_PORTS: [&str; limits::MAX_OUTPUTS] = ["CLKOP", "CLKOS", "CLKOS2"];

/// One solved PLL output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PllOutput {
    /// Domain driven by this output.
    pub domain: String,
    /// `EHXPLLL` output port.
    pub port: &'static str,
    /// Requested frequency.
    pub target: Frequency,
    /// Output divider.
    pub div: u32,
    /// Coarse phase setting.
    pub cphase: u32,
    /// Requested phase in degrees.
    pub phase_deg: u32,
    /// Frequency actually produced, in hertz.
    pub achieved_hz: f64,
}

/// A complete `EHXPLLL` configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PllConfig {
    /// Reference frequency.
    pub clkin: Frequency,
    /// Reference divider.
    pub clki_div: u32,
    /// Feedback divider (through `CLKOS3`, divider 1).
    pub clkfb_div: u32,
    /// VCO frequency in hertz.
    pub vco_hz: f64,
    /// Outputs in allocation order.
    pub outputs: Vec<PllOutput>,
}

impl PllConfig {
    /// Output driving `domain`.
    pub fn output(&self, domain: &str) -> Option<&PllOutput> {
        self.outputs.iter().find(|o| o.domain == domain)
    }
}

#[derive(Debug, Clone)]
struct ClkOut {
    domain: String,
    freq: Frequency,
    phase_deg: u32,
}

/// ECP5 PLL request builder and solver.
#[derive(Debug, Clone)]
pub struct Ecp5Pll {
    clkin: Frequency,
    outputs: Vec<ClkOut>,
}

impl Ecp5Pll {
    /// Registers the reference clock.
    ///
    /// # Errors
    ///
    /// [`SocError::UnreachableFrequency`] if the reference is outside the input range.
    pub fn new(clkin: Frequency) -> Result<Self> {
        let hz = clkin.as_hz() as f64;
        if hz < limits::CLKI_FREQ.0 || hz > limits::CLKI_FREQ.1 {
            return Err(SocError::UnreachableFrequency {
                domain: "clkin".to_string(),
                target_hz: clkin.as_hz(),
            });
        }
        Ok(Self {
            clkin,
            outputs: Vec::new(),
        })
    }

    /// Requests an output for `domain`.
    ///
    /// # Errors
    ///
    /// [`SocError::InvalidConfig`] when all three outputs are taken,
    /// [`SocError::UnreachableFrequency`] when the frequency is outside the output range.
    pub fn create_clkout(&mut self, domain: &ClockDomain) -> Result<()> {
        if self.outputs.len() >= limits::MAX_OUTPUTS {
            return Err(SocError::InvalidConfig(format!(
                "PLL has no free output left for clock domain `{}` (max {})",
                domain.name,
                limits::MAX_OUTPUTS
            )));
        }
        let hz = domain.freq.as_hz() as f64;
        if hz < limits::CLKO_FREQ.0 || hz > limits::CLKO_FREQ.1 {
            return Err(SocError::UnreachableFrequency {
                domain: domain.name.clone(),
                target_hz: domain.freq.as_hz(),
            });
        }
        self.outputs.push(ClkOut {
            domain: domain.name.clone(),
            freq: domain.freq,
            phase_deg: domain.phase_deg,
        });
        Ok(())
    }

    fn place(vco: f64, out: &ClkOut) -> Option<(u32, f64)> {
        let target = out.freq.as_hz() as f64;
        (limits::CLKO_DIV.0..=limits::CLKO_DIV.1)
            .map(|d| (d, vco / f64::from(d)))
            .find(|(_, f)| (f - target).abs() <= target * limits::MARGIN)
    }

    /// Searches the divider space; the first configuration found wins.
    ///
    /// # Errors
    ///
    /// [`SocError::UnreachableFrequency`] naming the first output no VCO setting
    /// could reach.
    pub fn compute_config(&self) -> Result<PllConfig> {
        let clkin = self.clkin.as_hz() as f64;
        for clki_div in limits::CLKI_DIV.0..=limits::CLKI_DIV.1 {
            for clkfb_div in limits::CLKFB_DIV.0..=limits::CLKFB_DIV.1 {
                let vco = clkin / f64::from(clki_div) * f64::from(clkfb_div);
                if vco < limits::VCO_FREQ.0 || vco > limits::VCO_FREQ.1 {
                    continue;
                }
                let placed: Option<Vec<PllOutput>> = self
                    .outputs
                    .iter()
                    .zip(OUTPUT_PORTS)
                    .map(|(out, port)| {
                        Self::place(vco, out).map(|(div, achieved_hz)| PllOutput {
                            domain: out.domain.clone(),
                            port,
                            target: out.freq,
                            div,
                            cphase: out.phase_deg * (div + 1) / 360 + div,
                            phase_deg: out.phase_deg,
                            achieved_hz,
                        })
                    })
                    .collect();
                if let Some(outputs) = placed {
                    debug!(clki_div, clkfb_div, vco_mhz = vco / 1e6, "PLL solved");
                    return Ok(PllConfig {
                        clkin: self.clkin,
                        clki_div,
                        clkfb_div,
                        vco_hz: vco,
                        outputs,
                    });
                }
            }
        }
        let culprit = self
            .outputs
            .iter()
            .max_by_key(|o| o.freq)
            .map_or_else(|| ("clkin".to_string(), self.clkin), |o| (o.domain.clone(), o.freq));
        Err(SocError::UnreachableFrequency {
            domain: culprit.0,
            target_hz: culprit.1.as_hz(),
        })
    }

    /// Builds the `EHXPLLL` instance for `config`.
    pub fn instance(config: &PllConfig, clkin: Expr, locked: Expr) -> Instance {
        let mut inst = Instance::new("EHXPLLL", "pll")
            .param_str("FEEDBK_PATH", "INT_OS3")
            .param_str("CLKOS3_ENABLE", "ENABLED")
            .param_int("CLKOS3_DIV", 1)
            .param_int("CLKFB_DIV", i64::from(config.clkfb_div))
            .param_int("CLKI_DIV", i64::from(config.clki_div));
        for out in &config.outputs {
            let suffix = &out.port["CLKO".len()..];
            inst = inst
                .param_str(&format!("CLKO{suffix}_ENABLE"), "ENABLED")
                .param_int(&format!("CLKO{suffix}_DIV"), i64::from(out.div))
                .param_int(&format!("CLKO{suffix}_FPHASE"), 0)
                .param_int(&format!("CLKO{suffix}_CPHASE"), i64::from(out.cphase));
        }
        inst = inst
            .port("RST", Expr::Const { value: 0, width: 1 })
            .port("STDBY", Expr::Const { value: 0, width: 1 })
            .port("CLKI", clkin)
            .port("CLKFB", Expr::sig("pll_clkfb"))
            .port("CLKINTFB", Expr::sig("pll_clkfb"))
            .port("LOCK", locked);
        for out in &config.outputs {
            inst = inst.port(out.port, Expr::sig(format!("{}_clk", out.domain)));
        }
        inst
    }
}

/// The clock tree of a composed SoC.
#[derive(Debug, Clone)]
pub struct Crg {
    domains: Vec<ClockDomain>,
    pll: PllConfig,
    has_button: bool,
}

impl Crg {
    /// Name of the CRG in the module graph and in pad ownership.
    pub const NAME: &'static str = "crg";

    /// Builds the clock tree.
    ///
    /// `extra` lists domains requested by features (`sys_ps`, `sys2x`, ...); they
    /// are created reset-less unless they carry another policy.
    ///
    /// # Errors
    ///
    /// [`SocError::ResourceUnavailable`] if the oscillator pad is missing,
    /// [`SocError::UnreachableFrequency`] if no PLL configuration fits,
    /// [`SocError::InvalidConfig`] if more than three outputs are needed.
    pub fn new(
        platform: &mut Platform,
        top: &mut Module,
        sys_clk_freq: Frequency,
        extra: &[ClockDomain],
    ) -> Result<Self> {
        let clk25 = platform.request(platform::DEFAULT_CLK_NAME, 0, Self::NAME)?;
        clk25.declare_ports(top)?;
        let button = if platform.is_free("user_btn_n", 0) {
            let pads = platform.request("user_btn_n", 0, Self::NAME)?;
            pads.declare_ports(top)?;
            Some(pads)
        } else {
            warn!(
                revision = %platform.revision(),
                "user button absent or in use, sys reset follows PLL lock only"
            );
            None
        };
        let clk_port = clk25.port("")?;
        platform.add_period_constraint(
            ClockRef::Pad(platform::DEFAULT_CLK_NAME.to_string()),
            platform::DEFAULT_CLK_FREQ,
        );

        let sys = ClockDomain::new("sys", sys_clk_freq, ResetPolicy::AsyncReset);
        let mut domains = vec![sys];
        domains.extend(extra.iter().cloned());

        let mut pll = Ecp5Pll::new(platform::DEFAULT_CLK_FREQ)?;
        for domain in &domains {
            pll.create_clkout(domain)?;
        }
        let config = pll.compute_config()?;

        for domain in &domains {
            top.declare_domain(domain.clone())?;
        }
        let locked = top.declare_signal("pll_locked", 1)?;
        let _ = top.declare_signal("pll_clkfb", 1)?;
        top.instantiate(Ecp5Pll::instance(&config, clk_port, locked.clone()));

        // Asserted while the PLL is unlocked or the button is pressed.
        let reset_req = top.declare_signal("crg_reset_req", 1)?;
        let mut req = locked.not();
        if let Some(pads) = &button {
            req = req.or(pads.port("")?.not());
        }
        top.comb("crg_reset_req", req);
        for domain in domains.iter().filter(|d| d.reset == ResetPolicy::AsyncReset) {
            Self::reset_synchronizer(top, domain, &reset_req)?;
        }

        info!(
            sys = %sys_clk_freq,
            vco_mhz = config.vco_hz / 1e6,
            domains = domains.len(),
            "clock tree built"
        );
        Ok(Self {
            domains,
            pll: config,
            has_button: button.is_some(),
        })
    }

    /// Two preset flip-flops: asynchronous assertion, release on the domain clock.
    fn reset_synchronizer(top: &mut Module, domain: &ClockDomain, reset_req: &Expr) -> Result<()> {
        let Some(rst) = domain.rst() else {
            return Ok(());
        };
        let stage = format!("{}_rst_meta", domain.name);
        let meta = top.declare_signal(stage.clone(), 1)?;
        top.instantiate(
            Instance::new("FD1S3BX", format!("{stage}_ff"))
                .port("D", Expr::Const { value: 0, width: 1 })
                .port("PD", reset_req.clone())
                .port("CK", Expr::sig(domain.clk()))
                .port("Q", meta.clone()),
        );
        top.instantiate(
            Instance::new("FD1S3BX", format!("{}_rst_ff", domain.name))
                .port("D", meta)
                .port("PD", reset_req.clone())
                .port("CK", Expr::sig(domain.clk()))
                .port("Q", Expr::sig(rst)),
        );
        Ok(())
    }

    /// Every domain driven by the PLL, `sys` first.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    /// Looks up a domain by name.
    pub fn domain(&self, name: &str) -> Option<&ClockDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    /// The system domain.
    pub fn sys(&self) -> &ClockDomain {
        &self.domains[0]
    }

    /// Solved PLL configuration.
    pub const fn pll(&self) -> &PllConfig {
        &self.pll
    }

    /// Whether `sys` reset also follows the user button.
    pub const fn has_button(&self) -> bool {
        self.has_button
    }
}
