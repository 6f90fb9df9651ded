//! Status LED blinker: a free-running counter shown on the user LED.
//!
//! The LED ball doubles as the serial TX; when the console owns it the
//! counter only reaches the auxiliary outputs.

use serde_json::json;
use tracing::warn;

use crate::common::Result;
use crate::feature::{Elaboration, Feature};
use crate::hdl::Expr;

const COUNTER: &str = "led_counter";
const COUNTER_WIDTH: u32 = 32;
const LED_BIT: u32 = 26;
/// Counter bits mirrored on the three auxiliary outputs.
const AUX_BITS: [u32; 3] = [27, 26, 25];

/// Where the auxiliary counter bits are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkerOutputs {
    /// `j1` header pins 0, 1, 2 (SoC builds).
    Header,
    /// `hub75` R0/G0/B0 (standalone builds).
    Hub75,
}

/// 32-bit counter in `sys`; bit 26 drives the LED.
#[derive(Debug, Clone)]
pub struct StatusBlinker {
    outputs: BlinkerOutputs,
}

impl StatusBlinker {
    /// Node name.
    pub const NAME: &'static str = "led";

    /// Creates a blinker driving `outputs`.
    pub const fn new(outputs: BlinkerOutputs) -> Self {
        Self { outputs }
    }

    /// Auxiliary output set.
    pub const fn outputs(&self) -> BlinkerOutputs {
        self.outputs
    }
}

impl Feature for StatusBlinker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn depends_on(&self) -> &[&'static str] {
        match self.outputs {
            BlinkerOutputs::Header => &[crate::crg::Crg::NAME],
            BlinkerOutputs::Hub75 => &[],
        }
    }

    fn elaborate(&mut self, ctx: &mut Elaboration<'_>) -> Result<()> {
        let sys = ctx.domain("sys")?.name.clone();
        let counter = ctx.top.declare_signal(COUNTER, COUNTER_WIDTH)?;
        ctx.top.sync(sys, COUNTER, Expr::Add(Box::new(counter), 1));

        if ctx.platform.is_free("user_led_n", 0) {
            let led = ctx.platform.request("user_led_n", 0, Self::NAME)?;
            led.declare_ports(ctx.top)?;
            ctx.top.comb(led.port_name("")?, Expr::bit(COUNTER, LED_BIT));
        } else {
            warn!("user LED pin is carrying the serial console, LED left undriven");
        }

        match self.outputs {
            BlinkerOutputs::Header => {
                for (index, bit) in (0u32..).zip(AUX_BITS) {
                    let pin = ctx.platform.request("j1", index, Self::NAME)?;
                    pin.declare_ports(ctx.top)?;
                    ctx.top.comb(pin.port_name("")?, Expr::bit(COUNTER, bit));
                }
            }
            BlinkerOutputs::Hub75 => {
                let hub75 = ctx.platform.request("hub75", 0, Self::NAME)?;
                hub75.declare_ports(ctx.top)?;
                for (sub, bit) in ["R0", "G0", "B0"].into_iter().zip(AUX_BITS) {
                    ctx.top.comb(hub75.port_name(sub)?, Expr::bit(COUNTER, bit));
                }
            }
        }
        Ok(())
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "counter_width": COUNTER_WIDTH,
            "led_bit": LED_BIT,
            "outputs": match self.outputs {
                BlinkerOutputs::Header => "j1",
                BlinkerOutputs::Hub75 => "hub75",
            },
        })
    }
}
