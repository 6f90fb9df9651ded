//! Configuration fixtures.

use std::path::Path;

use colorlight_soc::config::{BoardRevision, FeatureConfig, FeatureKind, SocConfig};
use tempfile::TempDir;

/// Routes library logs to the test writer; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh output directory, removed on drop. Also installs test logging.
pub fn sandbox() -> TempDir {
    init_tracing();
    tempfile::tempdir().expect("create temp dir")
}

/// Default configuration writing into `dir`, toolchain disabled.
pub fn config_in(dir: &Path) -> SocConfig {
    SocConfig {
        output_dir: dir.to_path_buf(),
        compile_gateware: false,
        ..SocConfig::default()
    }
}

/// Configuration with the given features enabled, in order.
pub fn with_features(revision: BoardRevision, kinds: &[FeatureKind]) -> SocConfig {
    let features = kinds
        .iter()
        .fold(FeatureConfig::new(), |acc, kind| acc.with(*kind, true));
    SocConfig {
        revision,
        features,
        compile_gateware: false,
        ..SocConfig::default()
    }
}

/// Ethernet declared but disabled, Etherbone and SDRAM enabled.
pub fn etherbone_sdram() -> SocConfig {
    SocConfig {
        features: FeatureConfig::new()
            .with(FeatureKind::Ethernet, false)
            .with(FeatureKind::Etherbone, true)
            .with(FeatureKind::Sdram, true),
        compile_gateware: false,
        ..SocConfig::default()
    }
}
