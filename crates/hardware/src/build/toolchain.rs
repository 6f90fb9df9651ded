//! Toolchain backends: constraint files and build scripts.
//!
//! Two backends are supported:
//! 1. **Trellis:** yosys + nextpnr-ecp5 + ecppack, driven by a shell script.
//!    nextpnr has no notion of false paths, so those are left out of the LPF.
//! 2. **Diamond:** a Tcl project script run through `diamondc`; false paths become
//!    `BLOCK PATH` preferences.

use std::fmt::Write;

use tracing::info;

use crate::build::layout::ArtifactLayout;
use crate::build::runner::ToolInvocation;
use crate::config::Toolchain;
use crate::platform::{self, ClockRef, ConstraintSet, PadBundle};

const HEADER: &str = "Machine-generated by colorlight-soc. Do not edit.";

/// nextpnr device selection for the board's part.
const NEXTPNR_DEVICE: [&str; 6] = ["--25k", "--package", "CABGA256", "--speed", "6", "--timing-allow-fail"];

fn frequency_line(clock: &ClockRef, mhz: f64) -> String {
    match clock {
        ClockRef::Pad(port) => format!("FREQUENCY PORT \"{port}\" {mhz:.3} MHz;"),
        ClockRef::Domain(_) => format!("FREQUENCY NET \"{}\" {mhz:.3} MHz;", clock.net()),
    }
}

/// Renders pin locations, IO standards and timing constraints as an LPF file.
pub fn render_lpf(pads: &[PadBundle], constraints: &ConstraintSet, toolchain: Toolchain) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {HEADER}");
    let _ = writeln!(out, "BLOCK RESETPATHS;");
    let _ = writeln!(out, "BLOCK ASYNCPATHS;");

    for bundle in pads {
        for signal in &bundle.signals {
            let multi = signal.pins.len() > 1;
            for (bit, pin) in signal.pins.iter().enumerate() {
                let comp = if multi {
                    format!("{}[{bit}]", signal.port)
                } else {
                    signal.port.clone()
                };
                let _ = writeln!(out, "LOCATE COMP \"{comp}\" SITE \"{pin}\";");
                let _ = writeln!(
                    out,
                    "IOBUF PORT \"{comp}\" IO_TYPE={};",
                    signal.io_standard
                );
            }
        }
    }

    for (clock, freq) in constraints.periods() {
        let _ = writeln!(out, "{}", frequency_line(clock, freq.as_mhz()));
    }

    let false_paths: Vec<_> = constraints.false_paths().collect();
    match toolchain {
        Toolchain::Diamond => {
            for (from, to) in false_paths {
                let _ = writeln!(
                    out,
                    "BLOCK PATH FROM CLKNET \"{}\" TO CLKNET \"{}\";",
                    from.net(),
                    to.net()
                );
            }
        }
        Toolchain::Trellis => {
            if !false_paths.is_empty() {
                info!(
                    count = false_paths.len(),
                    "nextpnr does not support false paths, skipping"
                );
            }
        }
    }
    out
}

/// Renders the toolchain script that turns `top.v` and `top.lpf` into images.
pub fn render_script(toolchain: Toolchain) -> String {
    let name = ArtifactLayout::BUILD_NAME;
    let mut out = String::new();
    match toolchain {
        Toolchain::Trellis => {
            let _ = writeln!(out, "#!/usr/bin/env bash");
            let _ = writeln!(out, "# {HEADER}");
            let _ = writeln!(out, "set -e");
            let _ = writeln!(
                out,
                "yosys -l {name}.rpt -q -p \"read_verilog {name}.v; synth_ecp5 -top {name} -json {name}.json\""
            );
            let _ = writeln!(
                out,
                "nextpnr-ecp5 --json {name}.json --lpf {name}.lpf --textcfg {name}.config {}",
                NEXTPNR_DEVICE.join(" ")
            );
            let _ = writeln!(
                out,
                "ecppack {name}.config --svf {name}.svf --bit {name}.bit"
            );
        }
        Toolchain::Diamond => {
            let _ = writeln!(out, "# {HEADER}");
            let _ = writeln!(
                out,
                "prj_project new -name \"{name}\" -impl \"impl\" -dev {} -synthesis \"synplify\"",
                platform::DEVICE
            );
            let _ = writeln!(out, "prj_src add \"{name}.v\"");
            let _ = writeln!(out, "prj_src add \"{name}.lpf\"");
            let _ = writeln!(out, "prj_impl option top \"{name}\"");
            let _ = writeln!(out, "prj_project save");
            for step in ["Synthesis", "Translate", "Map", "PAR"] {
                let _ = writeln!(out, "prj_run {step} -impl impl -forceOne");
            }
            let _ = writeln!(out, "prj_run Export -impl impl -task Bitgen");
            let _ = writeln!(out, "prj_project close");
            let _ = writeln!(out, "file copy -force -- \"impl/{name}_impl.bit\" \"{name}.bit\"");
        }
    }
    out
}

/// Command running the script written for `toolchain`.
pub fn invocation(toolchain: Toolchain, layout: &ArtifactLayout) -> ToolInvocation {
    let script = layout.script(toolchain);
    let script = script
        .file_name()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let program = match toolchain {
        Toolchain::Trellis => "bash",
        Toolchain::Diamond => "diamondc",
    };
    ToolInvocation::new(program)
        .arg(script)
        .current_dir(layout.gateware_dir())
}
