//! SoC core: CPU, integrated memories, CSR bridge, console UART and timer.
//!
//! The core elaborates before every other module, so the CPU's instruction and
//! data buses are registered as the two highest-priority masters. Its slave
//! channels are the integrated regions the interconnect always creates
//! (`rom`, `sram`, `csr`). The console UART is selected by
//! [`UartName`]:
//! 1. **serial:** the physical `serial` pads, which overlay the user LED and
//!    button. They are claimed by [`SocCore::claim_pads`] before the CRG runs.
//! 2. **crossover:** a UART reachable only from the bus, plus its `uart_xover`
//!    CSR bank.
//! 3. **stub:** a UART that discards output.

use serde_json::json;
use tracing::debug;

use crate::common::{Result, SocError};
use crate::config::{SocConfig, UartName};
use crate::feature::{Elaboration, Feature};
use crate::hdl::{Channel, Expr, Instance};
use crate::platform::{PadBundle, Platform};
use crate::soc::interconnect::{Interconnect, mem_map};

const INTERRUPTS: &str = "cpu_interrupt";
const INTERRUPT_WIDTH: u32 = 32;
const UART_IRQ: u32 = 0;
const TIMER_IRQ: u32 = 1;

/// CPU, memories and console of every composed SoC.
#[derive(Debug, Clone)]
pub struct SocCore {
    uart: UartName,
    rom_size: u64,
    sram_size: u64,
    serial: Option<PadBundle>,
}

impl SocCore {
    /// Node name; owner of the serial pads.
    pub const NAME: &'static str = "soc_core";

    /// CPU black box.
    pub const CPU_TYPE: &'static str = "VexRiscv";

    /// Instruction bus master.
    pub const IBUS: &'static str = "cpu_ibus";

    /// Data bus master.
    pub const DBUS: &'static str = "cpu_dbus";

    /// Console UART instance and CSR bank.
    pub const UART: &'static str = "uart";

    /// Crossover side of the console UART.
    pub const UART_XOVER: &'static str = "uart_xover";

    /// System timer instance and CSR bank.
    pub const TIMER: &'static str = "timer0";

    /// Reads sizes and the console from `config.soc`.
    pub const fn new(config: &SocConfig) -> Self {
        Self {
            uart: config.soc.uart_name,
            rom_size: config.soc.integrated_rom_size,
            sram_size: config.soc.integrated_sram_size,
            serial: None,
        }
    }

    /// Console UART kind.
    pub const fn uart_name(&self) -> UartName {
        self.uart
    }

    /// Claims the serial pads when the console uses them.
    ///
    /// Must run before anything requests the user LED or button.
    ///
    /// # Errors
    ///
    /// [`SocError::ResourceUnavailable`] if the pads are absent or taken.
    pub fn claim_pads(&mut self, platform: &mut Platform) -> Result<()> {
        if self.uart == UartName::Serial && self.serial.is_none() {
            self.serial = Some(platform.request("serial", 0, Self::NAME)?);
        }
        Ok(())
    }

    /// Integrated slaves as `(region, instance)`, in the order the interconnect creates them.
    fn slaves(&self) -> Vec<(&'static str, Instance)> {
        let mut slaves = Vec::with_capacity(3);
        if self.rom_size > 0 {
            slaves.push((
                Interconnect::ROM_REGION,
                Instance::new("WishboneROM", Interconnect::ROM_REGION)
                    .param_int("SIZE", self.rom_size as i64),
            ));
        }
        if self.sram_size > 0 {
            slaves.push((
                Interconnect::SRAM_REGION,
                Instance::new("WishboneSRAM", Interconnect::SRAM_REGION)
                    .param_int("SIZE", self.sram_size as i64),
            ));
        }
        slaves.push((
            Interconnect::CSR_REGION,
            Instance::new("Wishbone2CSR", "csr_bridge").param_int("BASE", mem_map::CSR as i64),
        ));
        slaves
    }

    fn uart_instance(&self) -> Result<Instance> {
        let uart = match self.uart {
            UartName::Serial => {
                let pads = self.serial.as_ref().ok_or_else(|| {
                    SocError::InvalidConfig("serial pads were not claimed".to_string())
                })?;
                Instance::new("UART", Self::UART)
                    .port("tx", pads.port("tx")?)
                    .port("rx", pads.port("rx")?)
            }
            UartName::Crossover => Instance::new("UARTCrossover", Self::UART),
            UartName::Stub => Instance::new("UARTStub", Self::UART),
        };
        Ok(uart
            .port("sys_clk", Expr::sig("sys_clk"))
            .port("sys_rst", Expr::sig("sys_rst"))
            .port("irq", Expr::bit(INTERRUPTS, UART_IRQ)))
    }
}

impl Feature for SocCore {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn elaborate(&mut self, ctx: &mut Elaboration<'_>) -> Result<()> {
        self.claim_pads(ctx.platform)?;
        if let Some(pads) = &self.serial {
            pads.declare_ports(ctx.top)?;
        }
        let _ = ctx.top.declare_signal(INTERRUPTS, INTERRUPT_WIDTH)?;

        let ibus = Channel::wishbone(Self::IBUS);
        let dbus = Channel::wishbone(Self::DBUS);
        ibus.declare(ctx.top)?;
        dbus.declare(ctx.top)?;
        let reset_address = if self.rom_size > 0 {
            mem_map::ROM
        } else {
            mem_map::SRAM
        };
        let cpu = Instance::new(Self::CPU_TYPE, "cpu")
            .param_int("RESET_ADDRESS", reset_address as i64)
            .port("clk", Expr::sig("sys_clk"))
            .port("reset", Expr::sig("sys_rst"))
            .port("interrupt", Expr::sig(INTERRUPTS));
        ctx.top.instantiate(dbus.attach(ibus.attach(cpu, "ibus"), "dbus"));

        for (region, memory) in self.slaves() {
            let channel = Channel::wishbone(region);
            channel.declare(ctx.top)?;
            let memory = memory
                .port("sys_clk", Expr::sig("sys_clk"))
                .port("sys_rst", Expr::sig("sys_rst"));
            ctx.top.instantiate(channel.attach(memory, "bus"));
        }

        ctx.top.instantiate(self.uart_instance()?);
        ctx.top.instantiate(
            Instance::new("Timer", Self::TIMER)
                .port("sys_clk", Expr::sig("sys_clk"))
                .port("sys_rst", Expr::sig("sys_rst"))
                .port("irq", Expr::bit(INTERRUPTS, TIMER_IRQ)),
        );
        debug!(uart = %self.uart, "SoC core elaborated");
        Ok(())
    }

    fn bus_masters(&self) -> &[&'static str] {
        &[Self::IBUS, Self::DBUS]
    }

    fn csr_banks(&self) -> &[&'static str] {
        match self.uart {
            UartName::Crossover => &[Self::UART, Self::UART_XOVER, Self::TIMER],
            UartName::Serial | UartName::Stub => &[Self::UART, Self::TIMER],
        }
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "cpu_type": Self::CPU_TYPE,
            "uart_name": self.uart.to_string(),
            "integrated_rom_size": self.rom_size,
            "integrated_sram_size": self.sram_size,
        })
    }
}
