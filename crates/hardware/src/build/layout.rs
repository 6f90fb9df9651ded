//! Artifact directory layout.
//!
//! The composer decides where a design's files live and hands the layout to the
//! builder and to the programmer, so that load and flash never re-derive paths
//! from configuration flags.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{SocConfig, Toolchain};
use crate::platform;

/// Paths of every file produced or consumed for one design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLayout {
    output_dir: PathBuf,
    gateware_dir: PathBuf,
}

impl ArtifactLayout {
    /// Build name shared by every gateware file.
    pub const BUILD_NAME: &'static str = "top";

    /// Class name reported for the standalone blinker.
    pub const STANDALONE_CLASS: &'static str = "standalone";

    /// Layout for `config`: standalone or SoC, by `config.no_soc`.
    pub fn for_config(config: &SocConfig) -> Self {
        if config.no_soc {
            Self::standalone(&config.output_dir)
        } else {
            Self::for_soc(&config.output_dir, config.class_name())
        }
    }

    /// `<out>/soc_<class>_colorlight_5a_75b/gateware`.
    pub fn for_soc(output_dir: &Path, class_name: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            gateware_dir: output_dir
                .join(format!("soc_{class_name}_{}", platform::NAME))
                .join("gateware"),
        }
    }

    /// `<out>/build`.
    pub fn standalone(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            gateware_dir: output_dir.join("build"),
        }
    }

    fn file(&self, ext: &str) -> PathBuf {
        self.gateware_dir.join(format!("{}.{ext}", Self::BUILD_NAME))
    }

    /// Root directory; the programmer configuration is written here.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding the gateware files.
    pub fn gateware_dir(&self) -> &Path {
        &self.gateware_dir
    }

    /// Structural Verilog.
    pub fn verilog(&self) -> PathBuf {
        self.file("v")
    }

    /// Pin and timing constraints.
    pub fn lpf(&self) -> PathBuf {
        self.file("lpf")
    }

    /// Design descriptor.
    pub fn descriptor(&self) -> PathBuf {
        self.gateware_dir.join("soc.json")
    }

    /// Toolchain script.
    pub fn script(&self, toolchain: Toolchain) -> PathBuf {
        self.gateware_dir.join(match toolchain {
            Toolchain::Trellis => "build_top.sh",
            Toolchain::Diamond => "build_top.tcl",
        })
    }

    /// Bitstream.
    pub fn bitstream(&self) -> PathBuf {
        self.file("bit")
    }

    /// JTAG programming image.
    pub fn svf(&self) -> PathBuf {
        self.file("svf")
    }

    /// SPI flash programming image.
    pub fn flash_image(&self) -> PathBuf {
        self.gateware_dir.join("top.svf.flash")
    }

    /// Bitstream-to-flash conversion script copied next to the image.
    pub fn flash_script(&self) -> PathBuf {
        self.gateware_dir.join("bit_to_flash.py")
    }

    /// Programmer adapter configuration.
    pub fn openocd_cfg(&self) -> PathBuf {
        self.output_dir.join("openocd.cfg")
    }
}
