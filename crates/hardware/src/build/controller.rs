//! Build / load / flash / simulate command state machine.
//!
//! One invocation walks `Idle → {Loading, Flashing, Simulating, Building} → Idle`
//! in a fixed priority order:
//! 1. **Load:** program the FPGA's SRAM, then stop; nothing else runs.
//! 2. **Flash:** convert the bitstream and program SPI flash, then continue.
//! 3. **Simulate:** acknowledge the request, then stop.
//! 4. **Build:** only when no other action was requested; compose and build.
//!
//! Load and flash use the artifact layout of the configuration; the build step
//! is the only producer of new images.

use std::fmt;

use tracing::{info, warn};

use crate::build::builder::{BuildOutput, Builder};
use crate::build::programmer::OpenOcd;
use crate::build::runner::ToolRunner;
use crate::common::Result;
use crate::config::SocConfig;
use crate::soc::Soc;

/// Actions requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actions {
    /// Load the last built image over JTAG.
    pub load: bool,
    /// Write the last built image to SPI flash.
    pub flash: bool,
    /// Run the simulation stub.
    pub sim: bool,
}

impl Actions {
    /// Returns `true` if no explicit action was requested (build by default).
    pub const fn is_empty(self) -> bool {
        !(self.load || self.flash || self.sim)
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting for the next action.
    Idle,
    /// Composing and building gateware.
    Building,
    /// Loading an image over JTAG.
    Loading,
    /// Programming SPI flash.
    Flashing,
    /// Simulation stub.
    Simulating,
    /// Invocation finished; no further action runs.
    Done,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Loading => "loading",
            Self::Flashing => "flashing",
            Self::Simulating => "simulating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What one action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Gateware written (and compiled when enabled).
    Built(BuildOutput),
    /// Image loaded into the FPGA.
    Loaded,
    /// Image written to flash.
    Flashed,
    /// Simulation acknowledged.
    Simulated,
}

/// Runs the requested actions for one configuration.
pub struct Controller<'a> {
    config: &'a SocConfig,
    runner: &'a dyn ToolRunner,
    state: ControllerState,
    history: Vec<ControllerState>,
}

impl fmt::Debug for Controller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl<'a> Controller<'a> {
    /// Creates an idle controller.
    pub fn new(config: &'a SocConfig, runner: &'a dyn ToolRunner) -> Self {
        Self {
            config,
            runner,
            state: ControllerState::Idle,
            history: vec![ControllerState::Idle],
        }
    }

    /// Current state.
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[ControllerState] {
        &self.history
    }

    fn enter(&mut self, state: ControllerState) {
        info!(from = %self.state, to = %state, "controller transition");
        self.state = state;
        self.history.push(state);
    }

    /// Executes `actions` in priority order.
    ///
    /// # Errors
    ///
    /// The first failing action's error; later actions do not run.
    pub fn run(&mut self, actions: Actions) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        let layout = self.config.artifact_layout();
        let programmer = OpenOcd::new(self.runner);

        if actions.load {
            self.enter(ControllerState::Loading);
            programmer.load(&layout)?;
            outcomes.push(Outcome::Loaded);
            self.enter(ControllerState::Done);
            return Ok(outcomes);
        }

        if actions.flash {
            self.enter(ControllerState::Flashing);
            programmer.flash(&layout)?;
            outcomes.push(Outcome::Flashed);
            self.enter(ControllerState::Idle);
        }

        if actions.sim {
            self.enter(ControllerState::Simulating);
            warn!("simulation is not implemented yet; nothing to do");
            outcomes.push(Outcome::Simulated);
            self.enter(ControllerState::Done);
            return Ok(outcomes);
        }

        if actions.is_empty() {
            self.enter(ControllerState::Building);
            let soc = Soc::compose(self.config)?;
            let output = Builder::new(self.config.compile_gateware).build(&soc, self.runner)?;
            outcomes.push(Outcome::Built(output));
            self.enter(ControllerState::Idle);
        }

        self.enter(ControllerState::Done);
        Ok(outcomes)
    }
}
