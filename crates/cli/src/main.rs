//! Colorlight 5A-75B SoC builder CLI.
//!
//! This binary is the single entry point for every board action. It performs:
//! 1. **Build:** Compose the SoC from flags (optionally on top of a JSON file) and
//!    write/compile the gateware. This is the default action.
//! 2. **Load:** Program the last built image into the FPGA over JTAG.
//! 3. **Flash:** Write the last built image to the SPI configuration flash.
//! 4. **Simulate:** Placeholder; acknowledges the request and exits.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use colorlight_soc::build::{Actions, Controller, Outcome, SystemRunner};
use colorlight_soc::common::Frequency;
use colorlight_soc::config::{BoardRevision, FeatureKind, SdramRate, SocConfig, Toolchain, UartName};
use colorlight_soc::{Result, SocError};

#[derive(Parser, Debug)]
#[command(
    name = "colorlight",
    author,
    version,
    about = "SoC builder for the Colorlight 5A-75B",
    long_about = "Compose, build, load or flash a SoC for the Colorlight 5A-75B (ECP5 LFE5U-25F).\n\nExamples:\n  colorlight --with-etherbone --with-sdram\n  colorlight --with-etherbone --load\n  colorlight --no-soc --revision 6.1"
)]
struct Cli {
    /// Board revision (7.0 or 6.1).
    #[arg(long)]
    revision: Option<BoardRevision>,

    /// Gateware toolchain (trellis or diamond).
    #[arg(long = "gateware-toolchain")]
    toolchain: Option<Toolchain>,

    /// Add the raw Ethernet MAC.
    #[arg(long)]
    with_ethernet: bool,

    /// Add Etherbone (remote bus access over UDP).
    #[arg(long)]
    with_etherbone: bool,

    /// Add the SDRAM controller.
    #[arg(long)]
    with_sdram: bool,

    /// SDRAM PHY rate (1:1 or 1:2).
    #[arg(long)]
    sdram_rate: Option<SdramRate>,

    /// Ethernet PHY (0 or 1).
    #[arg(long)]
    eth_phy: Option<u32>,

    /// Console UART (serial, crossover or stub); serial uses the LED and button balls.
    #[arg(long)]
    uart_name: Option<UartName>,

    /// System clock frequency in Hz.
    #[arg(long)]
    sys_clk_freq: Option<u64>,

    /// Root directory for build artifacts.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write gateware files without running the toolchain.
    #[arg(long)]
    no_compile_gateware: bool,

    /// JSON configuration used as the base for all other flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Opaque builder option (repeatable).
    #[arg(long = "opt", value_name = "KEY=VALUE", value_parser = parse_opt)]
    opts: Vec<(String, String)>,

    /// Load the bitstream over JTAG.
    #[arg(long)]
    load: bool,

    /// Write the bitstream to SPI flash.
    #[arg(long)]
    flash: bool,

    /// Simulate (work in progress).
    #[arg(long)]
    sim: bool,

    /// Build only the status blinker, without SoC.
    #[arg(long)]
    no_soc: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_opt(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Merges flags over the base configuration (file or defaults).
fn build_config(cli: &Cli) -> Result<SocConfig> {
    let mut config = match &cli.config {
        Some(path) => SocConfig::from_json_file(path)?,
        None => SocConfig::default(),
    };
    if let Some(revision) = cli.revision {
        config.revision = revision;
    }
    if let Some(toolchain) = cli.toolchain {
        config.toolchain = toolchain;
    }
    if let Some(rate) = cli.sdram_rate {
        config.sdram.rate = rate;
    }
    if let Some(phy) = cli.eth_phy {
        config.network.eth_phy = phy;
    }
    if let Some(uart) = cli.uart_name {
        config.soc.uart_name = uart;
    }
    if let Some(hz) = cli.sys_clk_freq {
        config.sys_clk_freq = Frequency::hz(hz);
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if cli.no_compile_gateware {
        config.compile_gateware = false;
    }
    config.no_soc |= cli.no_soc;

    let requested = [
        (cli.with_sdram, FeatureKind::Sdram),
        (cli.with_ethernet, FeatureKind::Ethernet),
        (cli.with_etherbone, FeatureKind::Etherbone),
    ];
    for (flag, kind) in requested {
        if flag && !config.features.is_enabled(kind) {
            config.features = config.features.with(kind, true);
        }
    }
    config.builder_options.extend(cli.opts.iter().cloned());

    config.validate()?;
    Ok(config)
}

fn fail(err: &SocError) -> ! {
    eprintln!("error: {err}");
    process::exit(err.exit_code());
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli).unwrap_or_else(|e| fail(&e));
    tracing::debug!(?config, "configuration resolved");
    let actions = Actions {
        load: cli.load,
        flash: cli.flash,
        sim: cli.sim,
    };

    let runner = SystemRunner;
    let mut controller = Controller::new(&config, &runner);
    let outcomes = controller.run(actions).unwrap_or_else(|e| fail(&e));

    for outcome in outcomes {
        match outcome {
            Outcome::Built(output) => {
                println!(
                    "gateware written to {}{}",
                    output.layout.gateware_dir().display(),
                    if output.compiled { "" } else { " (not compiled)" }
                );
            }
            Outcome::Loaded => println!("bitstream loaded"),
            Outcome::Flashed => println!("flash programmed"),
            Outcome::Simulated => println!("sim"),
        }
    }
}
