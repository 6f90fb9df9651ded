//! Gateware builder: writes the composed design to disk and runs the toolchain.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::build::layout::ArtifactLayout;
use crate::build::runner::{ToolRunner, run_checked};
use crate::build::toolchain;
use crate::common::{Result, SocError};
use crate::hdl::verilog;
use crate::soc::Soc;

/// Files written for one design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Where everything lives.
    pub layout: ArtifactLayout,
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
    /// Whether the toolchain ran.
    pub compiled: bool,
}

/// Turns a [`Soc`] into gateware files and, optionally, a bitstream.
#[derive(Debug, Clone, Copy)]
pub struct Builder {
    compile_gateware: bool,
}

fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| SocError::io(path, e))
}

impl Builder {
    /// Creates a builder; `compile_gateware = false` stops after writing files.
    pub const fn new(compile_gateware: bool) -> Self {
        Self { compile_gateware }
    }

    /// Writes `top.v`, `top.lpf`, `soc.json` and the toolchain script.
    pub fn write_files(soc: &Soc) -> Result<Vec<PathBuf>> {
        let layout = soc.layout();
        let dir = layout.gateware_dir();
        fs::create_dir_all(dir).map_err(|e| SocError::io(dir, e))?;

        let files = vec![
            (layout.verilog(), verilog::emit(soc.top())),
            (
                layout.lpf(),
                toolchain::render_lpf(soc.pads(), soc.constraints(), soc.toolchain()),
            ),
            (layout.descriptor(), soc.descriptor()?),
            (
                layout.script(soc.toolchain()),
                toolchain::render_script(soc.toolchain()),
            ),
        ];
        for (path, contents) in &files {
            write(path, contents)?;
        }
        info!(dir = %dir.display(), files = files.len(), "gateware written");
        Ok(files.into_iter().map(|(path, _)| path).collect())
    }

    /// Writes the design and runs the toolchain if enabled.
    ///
    /// # Errors
    ///
    /// [`SocError::Io`] if a file cannot be written,
    /// [`SocError::ExternalToolFailure`] if the toolchain fails.
    pub fn build(&self, soc: &Soc, runner: &dyn ToolRunner) -> Result<BuildOutput> {
        let files = Self::write_files(soc)?;
        if self.compile_gateware {
            run_checked(runner, &toolchain::invocation(soc.toolchain(), soc.layout()))?;
            info!(bitstream = %soc.layout().bitstream().display(), "gateware compiled");
        }
        Ok(BuildOutput {
            layout: soc.layout().clone(),
            files,
            compiled: self.compile_gateware,
        })
    }
}
