//! openocd programmer tests.
//!
//! The mock runner inspects the filesystem at the moment each program would
//! start, so the lifetime of the adapter configuration is observable.

use std::fs;
use std::path::Path;

use colorlight_soc::SocError;
use colorlight_soc::build::programmer::{BIT_TO_FLASH, OPENOCD_CFG};
use colorlight_soc::build::{ArtifactLayout, OpenOcd, ToolInvocation};
use mockall::Sequence;
use pretty_assertions::assert_eq;

use crate::common::fixtures;
use crate::common::mocks::{MockRunner, exited};

fn layout(dir: &Path) -> ArtifactLayout {
    ArtifactLayout::for_soc(dir, "basesoc")
}

#[test]
fn write_config_creates_adapter_file() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());
    OpenOcd::write_config(&layout).expect("write");

    let text = fs::read_to_string(layout.openocd_cfg()).expect("read");
    assert_eq!(text, OPENOCD_CFG);
    assert!(text.contains("ftdi_vid_pid 0x0403 0x6010"));
    assert!(text.contains("-expected-id 0x41111043"));
}

#[test]
fn load_runs_openocd_with_the_svf() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());
    let cfg = layout.openocd_cfg();
    let expected_args = vec![
        "-f".to_string(),
        cfg.display().to_string(),
        "-c".to_string(),
        format!("transport select jtag; init; svf {}; exit", layout.svf().display()),
    ];

    let mut runner = MockRunner::new();
    let seen_cfg = cfg.clone();
    let _ = runner
        .expect_run()
        .withf(move |inv: &ToolInvocation| inv.program == "openocd" && inv.args == expected_args)
        .times(1)
        .returning(move |_| {
            assert!(seen_cfg.is_file(), "openocd.cfg must exist when openocd starts");
            Ok(exited(0))
        });

    OpenOcd::new(&runner).load(&layout).expect("load");
    assert!(cfg.is_file());
}

#[test]
fn flash_converts_then_programs_and_cleans_up() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());
    let cfg = layout.openocd_cfg();
    let script = layout.flash_script();
    let convert_args = vec![
        script.display().to_string(),
        layout.bitstream().display().to_string(),
        layout.flash_image().display().to_string(),
    ];
    let image = layout.flash_image().display().to_string();

    let mut seq = Sequence::new();
    let mut runner = MockRunner::new();
    let cfg_during_convert = cfg.clone();
    let _ = runner
        .expect_run()
        .withf(move |inv: &ToolInvocation| inv.program == "python3" && inv.args == convert_args)
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| {
            assert!(!cfg_during_convert.exists());
            Ok(exited(0))
        });
    let cfg_during_program = cfg.clone();
    let _ = runner
        .expect_run()
        .withf(move |inv: &ToolInvocation| {
            inv.program == "openocd" && inv.args.last().is_some_and(|c| c.contains(&image))
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| {
            assert!(cfg_during_program.is_file());
            Ok(exited(0))
        });

    OpenOcd::new(&runner).flash(&layout).expect("flash");
    assert!(!cfg.exists());
    assert_eq!(fs::read_to_string(&script).expect("script"), BIT_TO_FLASH);
}

#[test]
fn flash_removes_config_after_programming_failure() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());

    let mut runner = MockRunner::new();
    let _ = runner
        .expect_run()
        .withf(|inv: &ToolInvocation| inv.program == "python3")
        .times(1)
        .returning(|_| Ok(exited(0)));
    let _ = runner
        .expect_run()
        .withf(|inv: &ToolInvocation| inv.program == "openocd")
        .times(1)
        .returning(|_| Ok(exited(1)));

    let err = OpenOcd::new(&runner).flash(&layout).unwrap_err();
    assert!(matches!(err, SocError::ExternalToolFailure { ref tool, .. } if tool == "openocd"));
    assert!(!layout.openocd_cfg().exists());
}

#[test]
fn flash_stops_when_conversion_fails() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());

    let mut runner = MockRunner::new();
    let _ = runner
        .expect_run()
        .withf(|inv: &ToolInvocation| inv.program == "python3")
        .times(1)
        .returning(|_| Ok(exited(2)));
    let _ = runner
        .expect_run()
        .withf(|inv: &ToolInvocation| inv.program == "openocd")
        .never();

    let err = OpenOcd::new(&runner).flash(&layout).unwrap_err();
    assert!(matches!(err, SocError::ExternalToolFailure { ref tool, .. } if tool == "python3"));
    assert!(!layout.openocd_cfg().exists());
}

#[test]
fn load_failure_leaves_config_in_place() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());

    let mut runner = MockRunner::new();
    let _ = runner.expect_run().times(1).returning(|_| Ok(exited(1)));

    assert!(OpenOcd::new(&runner).load(&layout).is_err());
    assert!(layout.openocd_cfg().is_file());
}

/// openocd leaves the configuration path as a directory, so removal fails.
fn openocd_blocking_cleanup(cfg: &Path, code: i32) -> MockRunner {
    let mut runner = MockRunner::new();
    let _ = runner
        .expect_run()
        .withf(|inv: &ToolInvocation| inv.program == "python3")
        .times(1)
        .returning(|_| Ok(exited(0)));
    let cfg = cfg.to_path_buf();
    let _ = runner
        .expect_run()
        .withf(|inv: &ToolInvocation| inv.program == "openocd")
        .times(1)
        .returning(move |_| {
            fs::remove_file(&cfg).expect("remove cfg");
            fs::create_dir_all(cfg.join("held")).expect("replace cfg with a directory");
            Ok(exited(code))
        });
    runner
}

#[test]
fn flash_reports_tool_failure_over_cleanup_failure() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());
    let runner = openocd_blocking_cleanup(&layout.openocd_cfg(), 1);

    let err = OpenOcd::new(&runner).flash(&layout).unwrap_err();
    assert!(matches!(err, SocError::ExternalToolFailure { ref tool, .. } if tool == "openocd"));
}

#[test]
fn flash_reports_cleanup_failure_after_successful_programming() {
    let dir = fixtures::sandbox();
    let layout = layout(dir.path());
    let runner = openocd_blocking_cleanup(&layout.openocd_cfg(), 0);

    let err = OpenOcd::new(&runner).flash(&layout).unwrap_err();
    assert!(matches!(err, SocError::Io { .. }), "{err:?}");
}
