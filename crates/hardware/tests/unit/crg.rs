//! # Clock and Reset Generator Tests
//!
//! PLL divider search, output allocation limits and the reset tree wired into
//! the top module for each board revision.

use colorlight_soc::common::{Frequency, SocError, Unavailability};
use colorlight_soc::config::BoardRevision;
use colorlight_soc::crg::{Crg, Ecp5Pll};
use colorlight_soc::hdl::{ClockDomain, Expr, Module, Param, ResetPolicy};
use colorlight_soc::platform::{ClockRef, Platform};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn sys(freq: Frequency) -> ClockDomain {
    ClockDomain::new("sys", freq, ResetPolicy::AsyncReset)
}

fn resetless(name: &str, freq: Frequency) -> ClockDomain {
    ClockDomain::new(name, freq, ResetPolicy::ResetLess)
}

fn solve(domains: &[ClockDomain]) -> colorlight_soc::crg::PllConfig {
    let mut pll = Ecp5Pll::new(Frequency::mhz(25)).expect("clkin");
    for d in domains {
        pll.create_clkout(d).expect("clkout");
    }
    pll.compute_config().expect("solvable")
}

// ══════════════════════════════════════════════════════════
// 1. PLL solver
// ══════════════════════════════════════════════════════════

#[test]
fn sys_125_from_25() {
    let config = solve(&[sys(Frequency::mhz(125))]);
    assert_eq!(config.clki_div, 1);
    assert_eq!(config.clkfb_div, 20);
    assert!((config.vco_hz - 500e6).abs() < 1.0);

    let out = config.output("sys").expect("sys output");
    assert_eq!(out.port, "CLKOP");
    assert_eq!(out.div, 4);
    assert_eq!(out.cphase, 4);
    assert!((out.achieved_hz - 125e6).abs() < 1.0);
}

#[test]
fn phase_shifted_output_gets_coarse_phase() {
    let config = solve(&[
        sys(Frequency::mhz(125)),
        resetless("sys_ps", Frequency::mhz(125)).with_phase(90),
    ]);
    let ps = config.output("sys_ps").expect("sys_ps");
    assert_eq!(ps.port, "CLKOS");
    assert_eq!(ps.div, 4);
    assert_eq!(ps.cphase, 5);
    assert_eq!(ps.phase_deg, 90);
}

#[test]
fn half_rate_outputs() {
    let config = solve(&[
        sys(Frequency::mhz(125)),
        resetless("sys2x", Frequency::mhz(250)),
        resetless("sys2x_ps", Frequency::mhz(250)).with_phase(90),
    ]);
    let divs: Vec<(&str, u32, u32)> = config
        .outputs
        .iter()
        .map(|o| (o.port, o.div, o.cphase))
        .collect();
    assert_eq!(
        divs,
        vec![("CLKOP", 4, 4), ("CLKOS", 2, 2), ("CLKOS2", 2, 2)]
    );
}

#[rstest]
#[case(Frequency::mhz(50))]
#[case(Frequency::mhz(60))]
#[case(Frequency::mhz(75))]
#[case(Frequency::mhz(100))]
fn solved_outputs_stay_within_one_percent(#[case] target: Frequency) {
    let config = solve(&[sys(target)]);
    let out = config.output("sys").expect("sys");
    let target = target.as_hz() as f64;
    assert!((out.achieved_hz - target).abs() <= target * 0.01);
    assert!(config.vco_hz >= 400e6 && config.vco_hz <= 800e6);
}

#[test]
fn fourth_output_is_rejected() {
    let mut pll = Ecp5Pll::new(Frequency::mhz(25)).expect("clkin");
    for name in ["a", "b", "c"] {
        pll.create_clkout(&resetless(name, Frequency::mhz(50))).expect("free output");
    }
    let err = pll
        .create_clkout(&resetless("d", Frequency::mhz(50)))
        .unwrap_err();
    assert!(matches!(err, SocError::InvalidConfig(_)));
}

#[test]
fn reference_out_of_range() {
    let err = Ecp5Pll::new(Frequency::mhz(5)).unwrap_err();
    match err {
        SocError::UnreachableFrequency { domain, target_hz } => {
            assert_eq!(domain, "clkin");
            assert_eq!(target_hz, 5_000_000);
        }
        other => panic!("expected unreachable frequency, got {other:?}"),
    }
}

#[rstest]
#[case(Frequency::mhz(500))]
#[case(Frequency::mhz(2))]
fn output_out_of_range(#[case] freq: Frequency) {
    let mut pll = Ecp5Pll::new(Frequency::mhz(25)).expect("clkin");
    let err = pll.create_clkout(&sys(freq)).unwrap_err();
    assert!(matches!(
        err,
        SocError::UnreachableFrequency { ref domain, target_hz } if domain == "sys" && target_hz == freq.as_hz()
    ));
}

#[test]
fn pll_instance_carries_solved_dividers() {
    let config = solve(&[
        sys(Frequency::mhz(125)),
        resetless("sys_ps", Frequency::mhz(125)).with_phase(90),
    ]);
    let inst = Ecp5Pll::instance(&config, Expr::sig("clk25"), Expr::sig("pll_locked"));
    assert_eq!(inst.kind, "EHXPLLL");
    assert_eq!(inst.name, "pll");

    let param = |name: &str| inst.params.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone());
    assert_eq!(param("FEEDBK_PATH"), Some(Param::Str("INT_OS3".to_string())));
    assert_eq!(param("CLKI_DIV"), Some(Param::Int(1)));
    assert_eq!(param("CLKFB_DIV"), Some(Param::Int(20)));
    assert_eq!(param("CLKOP_DIV"), Some(Param::Int(4)));
    assert_eq!(param("CLKOS_CPHASE"), Some(Param::Int(5)));
    assert_eq!(param("CLKOS2_DIV"), None);

    let port = |name: &str| inst.ports.iter().find(|(n, _)| n == name).map(|(_, e)| e.clone());
    assert_eq!(port("CLKI"), Some(Expr::sig("clk25")));
    assert_eq!(port("CLKOP"), Some(Expr::sig("sys_clk")));
    assert_eq!(port("CLKOS"), Some(Expr::sig("sys_ps_clk")));
    assert_eq!(port("LOCK"), Some(Expr::sig("pll_locked")));
}

// ══════════════════════════════════════════════════════════
// 2. Clock tree
// ══════════════════════════════════════════════════════════

fn reset_request(top: &Module) -> Option<&Expr> {
    top.comb_statements()
        .iter()
        .find(|a| a.target == "crg_reset_req")
        .map(|a| &a.value)
}

#[test]
fn reset_follows_lock_and_button_on_7_0() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let mut top = Module::new("top");
    let crg = Crg::new(&mut platform, &mut top, Frequency::mhz(125), &[]).expect("crg");

    assert!(crg.has_button());
    assert_eq!(
        reset_request(&top),
        Some(&Expr::sig("pll_locked").not().or(Expr::sig("user_btn_n").not()))
    );
    assert!(top.ports().iter().any(|p| p.name == "user_btn_n"));
}

#[test]
fn reset_follows_lock_only_on_6_1() {
    let mut platform = Platform::new(BoardRevision::V6_1);
    let mut top = Module::new("top");
    let crg = Crg::new(&mut platform, &mut top, Frequency::mhz(125), &[]).expect("crg");

    assert!(!crg.has_button());
    assert_eq!(reset_request(&top), Some(&Expr::sig("pll_locked").not()));
    assert!(!top.ports().iter().any(|p| p.name == "user_btn_n"));
}

#[test]
fn sys_gets_a_two_stage_synchronizer() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let mut top = Module::new("top");
    let _ = Crg::new(&mut platform, &mut top, Frequency::mhz(125), &[]).expect("crg");

    let meta = top.instance("sys_rst_meta_ff").expect("first stage");
    let sync = top.instance("sys_rst_ff").expect("second stage");
    assert_eq!(meta.kind, "FD1S3BX");
    assert_eq!(sync.kind, "FD1S3BX");
    assert!(sync.ports.contains(&("Q".to_string(), Expr::sig("sys_rst"))));
    assert!(sync.ports.contains(&("D".to_string(), Expr::sig("sys_rst_meta"))));
    assert!(meta.ports.contains(&("PD".to_string(), Expr::sig("crg_reset_req"))));
}

#[test]
fn extra_domains_are_reset_less() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let mut top = Module::new("top");
    let extra = [resetless("sys_ps", Frequency::mhz(125)).with_phase(90)];
    let crg = Crg::new(&mut platform, &mut top, Frequency::mhz(125), &extra).expect("crg");

    let names: Vec<&str> = crg.domains().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["sys", "sys_ps"]);
    assert_eq!(crg.sys().reset, ResetPolicy::AsyncReset);
    assert!(top.instance("sys_ps_rst_ff").is_none());
    assert!(top.signals().iter().all(|s| s.name != "sys_ps_rst"));
    assert!(crg.pll().output("sys_ps").is_some());
}

#[test]
fn oscillator_period_is_constrained() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let mut top = Module::new("top");
    let _ = Crg::new(&mut platform, &mut top, Frequency::mhz(125), &[]).expect("crg");

    let periods: Vec<(ClockRef, Frequency)> = platform
        .constraints()
        .periods()
        .map(|(c, f)| (c.clone(), f))
        .collect();
    assert_eq!(
        periods,
        vec![(ClockRef::Pad("clk25".to_string()), Frequency::mhz(25))]
    );
}

#[test]
fn claimed_oscillator_is_reported() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let _ = platform.request("clk25", 0, "other").expect("pre-claim");
    let mut top = Module::new("top");

    let err = Crg::new(&mut platform, &mut top, Frequency::mhz(125), &[]).unwrap_err();
    assert!(matches!(
        err,
        SocError::ResourceUnavailable {
            reason: Unavailability::Claimed { ref owner },
            ..
        } if owner == "other"
    ));
}

#[test]
fn unreachable_sys_frequency() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let mut top = Module::new("top");
    let err = Crg::new(&mut platform, &mut top, Frequency::mhz(500), &[]).unwrap_err();
    assert!(matches!(err, SocError::UnreachableFrequency { .. }));
    assert_eq!(err.exit_code(), 3);
}
