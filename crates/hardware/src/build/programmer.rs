//! JTAG programmer (openocd) for volatile load and SPI flash programming.
//!
//! Both operations consume artifacts of an earlier build located through the
//! [`ArtifactLayout`]. Their existence is not checked up front: a missing image
//! surfaces as the programmer's (or converter's) own failure.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::build::layout::ArtifactLayout;
use crate::build::runner::{ToolInvocation, ToolRunner, run_checked};
use crate::common::{Result, SocError};

/// FT2232-based adapter on the board's JTAG header, ECP5-25F tap.
pub const OPENOCD_CFG: &str = "
interface ftdi
ftdi_vid_pid 0x0403 0x6010
ftdi_channel 0
ftdi_layout_init 0x0098 0x008b
reset_config none
adapter_khz 25000
jtag newtap ecp5 tap -irlen 8 -expected-id 0x41111043
";

/// Bitstream to SPI-flash SVF converter.
pub const BIT_TO_FLASH: &str = include_str!("../../assets/bit_to_flash.py");

/// Python interpreter used to run the converter.
const PYTHON: &str = "python3";

fn warn_if_missing(path: &Path) {
    if !path.exists() {
        warn!(path = %path.display(), "image not found; was the design built?");
    }
}

/// Drives openocd through a [`ToolRunner`].
#[derive(Clone, Copy)]
pub struct OpenOcd<'a> {
    runner: &'a dyn ToolRunner,
}

impl std::fmt::Debug for OpenOcd<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenOcd").finish_non_exhaustive()
    }
}

impl<'a> OpenOcd<'a> {
    /// Programmer using `runner` to start processes.
    pub const fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Writes the adapter configuration file.
    pub fn write_config(layout: &ArtifactLayout) -> Result<()> {
        let path = layout.openocd_cfg();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| SocError::io(dir, e))?;
        }
        fs::write(&path, OPENOCD_CFG).map_err(|e| SocError::io(&path, e))
    }

    fn svf_invocation(layout: &ArtifactLayout, image: &Path) -> ToolInvocation {
        ToolInvocation::new("openocd")
            .arg("-f")
            .arg(layout.openocd_cfg().display().to_string())
            .arg("-c")
            .arg(format!(
                "transport select jtag; init; svf {}; exit",
                image.display()
            ))
    }

    /// Loads the SVF image into the FPGA's configuration SRAM.
    ///
    /// The adapter configuration is written before openocd starts and is left
    /// in place.
    pub fn load(&self, layout: &ArtifactLayout) -> Result<()> {
        let image = layout.svf();
        warn_if_missing(&image);
        Self::write_config(layout)?;
        run_checked(self.runner, &Self::svf_invocation(layout, &image))?;
        info!(image = %image.display(), "bitstream loaded");
        Ok(())
    }

    /// Converts the bitstream to a flash image and writes it to SPI flash.
    ///
    /// The adapter configuration is removed afterwards, whether or not
    /// programming succeeded. A programming failure takes precedence over a
    /// failed removal, which is only logged.
    pub fn flash(&self, layout: &ArtifactLayout) -> Result<()> {
        let bitstream = layout.bitstream();
        warn_if_missing(&bitstream);

        let dir = layout.gateware_dir();
        fs::create_dir_all(dir).map_err(|e| SocError::io(dir, e))?;
        let script = layout.flash_script();
        fs::write(&script, BIT_TO_FLASH).map_err(|e| SocError::io(&script, e))?;

        let image = layout.flash_image();
        run_checked(
            self.runner,
            &ToolInvocation::new(PYTHON)
                .arg(script.display().to_string())
                .arg(bitstream.display().to_string())
                .arg(image.display().to_string()),
        )?;

        Self::write_config(layout)?;
        let result = run_checked(self.runner, &Self::svf_invocation(layout, &image));
        let cfg = layout.openocd_cfg();
        match (fs::remove_file(&cfg), result) {
            (Err(e), Err(tool)) => {
                warn!(path = %cfg.display(), error = %e, "could not remove adapter configuration");
                return Err(tool);
            }
            (Err(e), Ok(())) => return Err(SocError::io(&cfg, e)),
            (Ok(()), result) => result?,
        }
        info!(image = %image.display(), "flash programmed");
        Ok(())
    }
}
