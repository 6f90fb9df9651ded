//! # Platform Tests
//!
//! Resource presence per revision, exclusive pad ownership, top-level port
//! naming and the timing constraint set.

use std::collections::HashSet;

use colorlight_soc::common::{Frequency, SocError, Unavailability};
use colorlight_soc::config::BoardRevision;
use colorlight_soc::hdl::{Direction, Expr, Module};
use colorlight_soc::platform::pinout;
use colorlight_soc::platform::{ClockRef, Constraint, ConstraintSet, Platform};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn domain(name: &str) -> ClockRef {
    ClockRef::Domain(name.to_string())
}

// ══════════════════════════════════════════════════════════
// 1. Resource requests
// ══════════════════════════════════════════════════════════

#[test]
fn request_returns_bound_pads() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let clk = platform.request("clk25", 0, "crg").expect("clk25");

    assert_eq!(clk.owner, "crg");
    assert_eq!(clk.signals.len(), 1);
    assert_eq!(clk.signals[0].port, "clk25");
    assert_eq!(clk.signals[0].pins, vec!["P6".to_string()]);
    assert_eq!(clk.signals[0].dir, Direction::Input);
    assert_eq!(clk.signals[0].io_standard, "LVCMOS33");
    assert_eq!(clk.port("").expect("port"), Expr::sig("clk25"));
}

#[test]
fn second_claim_names_current_owner() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let _ = platform.request("eth", 0, "ethphy").expect("first claim");

    match platform.request("eth", 0, "other") {
        Err(SocError::ResourceUnavailable {
            resource,
            index,
            reason,
            ..
        }) => {
            assert_eq!(resource, "eth");
            assert_eq!(index, 0);
            assert_eq!(
                reason,
                Unavailability::Claimed {
                    owner: "ethphy".to_string()
                }
            );
        }
        other => panic!("expected claimed pads, got {other:?}"),
    }
}

#[test]
fn claims_are_per_index() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let _ = platform.request("eth", 0, "a").expect("eth:0");
    let _ = platform.request("eth", 1, "b").expect("eth:1");
    assert_eq!(platform.pads().len(), 2);
}

#[test]
fn button_absent_on_6_1() {
    let mut platform = Platform::new(BoardRevision::V6_1);
    assert!(!platform.has_resource("user_btn_n", 0));

    let err = platform.request("user_btn_n", 0, "crg").unwrap_err();
    assert!(matches!(
        err,
        SocError::ResourceUnavailable {
            reason: Unavailability::Absent,
            revision: BoardRevision::V6_1,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn is_free_tracks_presence_and_claims() {
    let v6 = Platform::new(BoardRevision::V6_1);
    assert!(!v6.is_free("user_btn_n", 0));

    let mut v7 = Platform::new(BoardRevision::V7_0);
    assert!(v7.is_free("user_btn_n", 0));
    let _ = v7.request("user_btn_n", 0, "crg").expect("claim");
    assert!(!v7.is_free("user_btn_n", 0));
    assert!(v7.is_free("user_led_n", 0));
}

#[rstest]
#[case(BoardRevision::V7_0, "user_led_n", "user_btn_n")]
#[case(BoardRevision::V6_1, "user_led_n", "")]
fn serial_overlays_led_and_button(
    #[case] revision: BoardRevision,
    #[case] led: &str,
    #[case] button: &str,
) {
    let mut platform = Platform::new(revision);
    let _ = platform.request("serial", 0, "soc_core").expect("serial");

    assert!(!platform.is_free(led, 0));
    if !button.is_empty() {
        assert!(!platform.is_free(button, 0));
    }
    match platform.request(led, 0, "led") {
        Err(SocError::ResourceUnavailable {
            reason: Unavailability::Claimed { owner },
            ..
        }) => assert_eq!(owner, "soc_core"),
        other => panic!("expected a shared-pin claim, got {other:?}"),
    }
}

#[test]
fn serial_is_refused_once_the_led_is_driven() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let _ = platform.request("user_led_n", 0, "led").expect("led");
    assert!(!platform.is_free("serial", 0));
    assert!(platform.request("serial", 0, "soc_core").is_err());
}

#[test]
fn unknown_index_is_absent() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let err = platform.request("eth", 2, "ethphy").unwrap_err();
    assert!(matches!(
        err,
        SocError::ResourceUnavailable {
            reason: Unavailability::Absent,
            ..
        }
    ));
}

// ══════════════════════════════════════════════════════════
// 2. Port naming
// ══════════════════════════════════════════════════════════

#[rstest]
#[case("clk25", 0, "", "clk25")]
#[case("j1", 0, "", "j1")]
#[case("j1", 2, "", "j1_2")]
#[case("eth", 0, "rx_data", "eth_rx_data")]
#[case("eth", 1, "rx_data", "eth_1_rx_data")]
#[case("eth_clocks", 1, "rx", "eth_clocks_1_rx")]
#[case("hub75", 0, "G0", "hub75_G0")]
fn port_names(#[case] resource: &str, #[case] index: u32, #[case] sub: &str, #[case] port: &str) {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let bundle = platform.request(resource, index, "t").expect("request");
    assert_eq!(bundle.port_name(sub).expect("subsignal"), port);
}

#[test]
fn multi_pin_subsignal_keeps_lsb_first() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let eth = platform.request("eth", 0, "ethphy").expect("eth");
    let rx = eth.signal("rx_data").expect("rx_data");
    assert_eq!(rx.pins, vec!["P20", "N19", "N20", "M19"]);
}

#[test]
fn missing_subsignal_is_invalid_config() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let eth = platform.request("eth", 1, "ethphy").expect("eth:1");
    assert!(matches!(eth.port_name("mdio"), Err(SocError::InvalidConfig(_))));
}

#[test]
fn declare_ports_adds_every_subsignal() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let mut top = Module::new("top");
    let eth = platform.request("eth", 0, "ethphy").expect("eth");
    eth.declare_ports(&mut top).expect("declare");

    let widths: Vec<(&str, u32)> = top.ports().iter().map(|p| (p.name.as_str(), p.width)).collect();
    assert_eq!(
        widths,
        vec![
            ("eth_mdio", 1),
            ("eth_mdc", 1),
            ("eth_rx_ctl", 1),
            ("eth_rx_data", 4),
            ("eth_tx_ctl", 1),
            ("eth_tx_data", 4),
        ]
    );
}

/// Resources whose balls deliberately overlay other resources.
const OVERLAYS: [&str; 1] = ["serial"];

#[rstest]
#[case(BoardRevision::V7_0)]
#[case(BoardRevision::V6_1)]
fn catalog_pins_are_unique(#[case] revision: BoardRevision) {
    let mut seen = HashSet::new();
    for resource in pinout::catalog(revision) {
        if OVERLAYS.contains(&resource.name) {
            continue;
        }
        for sub in resource.subsignals {
            for pin in sub.pins {
                assert!(seen.insert(*pin), "pin {pin} used twice on {revision}");
            }
        }
    }
}

#[rstest]
#[case(BoardRevision::V7_0)]
#[case(BoardRevision::V6_1)]
fn overlays_only_reuse_led_and_button(#[case] revision: BoardRevision) {
    let catalog = pinout::catalog(revision);
    let pins_of = |name: &str| -> Vec<&'static str> {
        catalog
            .iter()
            .filter(|r| r.name == name)
            .flat_map(|r| r.subsignals.iter().flat_map(|s| s.pins.iter().copied()))
            .collect()
    };
    let mut allowed = pins_of("user_led_n");
    allowed.extend(pins_of("user_btn_n"));
    let owned: HashSet<&str> = catalog
        .iter()
        .filter(|r| !OVERLAYS.contains(&r.name))
        .flat_map(|r| r.subsignals.iter().flat_map(|s| s.pins.iter().copied()))
        .collect();
    for pin in pins_of("serial") {
        assert!(
            !owned.contains(pin) || allowed.contains(&pin),
            "serial reuses {pin} on {revision}"
        );
    }
}

/// Rows of the CABGA256 ball grid (I, O and Q are skipped).
const CABGA256_ROWS: &str = "ABCDEFGHJKLMNPRT";

fn on_cabga256(site: &str) -> bool {
    let mut chars = site.chars();
    let Some(row) = chars.next() else {
        return false;
    };
    let column: Option<u32> = chars.as_str().parse().ok();
    CABGA256_ROWS.contains(row) && column.is_some_and(|c| (1..=16).contains(&c))
}

#[rstest]
#[case(BoardRevision::V7_0)]
#[case(BoardRevision::V6_1)]
fn catalog_sites_exist_on_the_package(#[case] revision: BoardRevision) {
    let off_grid: Vec<String> = pinout::catalog(revision)
        .iter()
        .flat_map(|r| {
            r.subsignals.iter().flat_map(move |s| {
                s.pins
                    .iter()
                    .filter(|p| !on_cabga256(p))
                    .map(move |p| format!("{}:{}:{}={p}", r.name, r.index, s.name))
            })
        })
        .collect();
    assert!(off_grid.is_empty(), "sites not on CABGA256: {off_grid:?}");
}

#[rstest]
#[case("A1", true)]
#[case("T16", true)]
#[case("U19", false)]
#[case("I3", false)]
#[case("K17", false)]
#[case("P0", false)]
fn cabga256_grid(#[case] site: &str, #[case] valid: bool) {
    assert_eq!(on_cabga256(site), valid);
}

#[test]
fn finish_yields_pads_in_claim_order() {
    let mut platform = Platform::new(BoardRevision::V7_0);
    let _ = platform.request("user_led_n", 0, "led").expect("led");
    let _ = platform.request("clk25", 0, "crg").expect("clk");
    platform.add_period_constraint(ClockRef::Pad("clk25".to_string()), Frequency::mhz(25));

    let (pads, constraints) = platform.finish();
    let order: Vec<&str> = pads.iter().map(|p| p.resource.as_str()).collect();
    assert_eq!(order, vec!["user_led_n", "clk25"]);
    assert_eq!(constraints.len(), 1);
}

// ══════════════════════════════════════════════════════════
// 3. Constraints
// ══════════════════════════════════════════════════════════

#[test]
fn false_paths_cover_every_pair_in_both_directions() {
    let mut set = ConstraintSet::new();
    set.add_false_paths(&[domain("sys"), domain("eth_rx"), domain("eth_tx")]);

    let pairs: Vec<(String, String)> = set
        .false_paths()
        .map(|(a, b)| (a.net(), b.net()))
        .collect();
    let expected = [
        ("sys_clk", "eth_rx_clk"),
        ("eth_rx_clk", "sys_clk"),
        ("sys_clk", "eth_tx_clk"),
        ("eth_tx_clk", "sys_clk"),
        ("eth_rx_clk", "eth_tx_clk"),
        ("eth_tx_clk", "eth_rx_clk"),
    ]
    .map(|(a, b)| (a.to_string(), b.to_string()));
    assert_eq!(pairs, expected.to_vec());
    assert!(set.has_false_path(&domain("eth_tx"), &domain("sys")));
    assert!(!set.has_false_path(&domain("sys"), &domain("sys_ps")));
}

#[test]
fn single_clock_has_no_false_path() {
    let mut set = ConstraintSet::new();
    set.add_false_paths(&[domain("sys")]);
    assert!(set.is_empty());
}

#[test]
fn extend_preserves_order() {
    let mut a = ConstraintSet::new();
    a.add_period(ClockRef::Pad("clk25".to_string()), Frequency::mhz(25));
    let mut b = ConstraintSet::new();
    b.add_period(domain("eth_rx"), Frequency::mhz(125));
    a.extend(b);

    let clocks: Vec<String> = a.periods().map(|(c, _)| c.to_string()).collect();
    assert_eq!(clocks, vec!["pad:clk25", "domain:eth_rx"]);
    assert!(matches!(
        a.iter().last(),
        Some(Constraint::Period { freq, .. }) if *freq == Frequency::mhz(125)
    ));
}

#[test]
fn clock_ref_nets() {
    assert_eq!(ClockRef::Pad("clk25".to_string()).net(), "clk25");
    assert_eq!(domain("eth_tx").net(), "eth_tx_clk");
}
