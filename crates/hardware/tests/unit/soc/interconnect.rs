//! Bus interconnect unit tests.
//!
//! Verifies the default memory map, slave attachment rules, address decoding,
//! master priority and CSR bank allocation.

use colorlight_soc::SocError;
use colorlight_soc::config::SocCoreConfig;
use colorlight_soc::hdl::{Channel, Expr, Instance, Module, Param};
use colorlight_soc::soc::interconnect::mem_map;
use colorlight_soc::soc::{Interconnect, MemoryRegion};
use proptest::prelude::*;

fn bus() -> Interconnect {
    Interconnect::new(&SocCoreConfig::default()).expect("default map")
}

// ══════════════════════════════════════════════════════════
// 1. Default map
// ══════════════════════════════════════════════════════════

#[test]
fn default_map_has_integrated_memories_and_csr() {
    let bus = bus();
    let names: Vec<&str> = bus.slaves().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["rom", "sram", "csr"]);

    let rom = bus.region("rom").expect("rom");
    assert_eq!((rom.origin, rom.size), (0, 0x8000));
    let sram = bus.region("sram").expect("sram");
    assert_eq!((sram.origin, sram.size), (0x0100_0000, 0x2000));
    assert!(!bus.region("csr").expect("csr").cached);

    assert_eq!(bus.csr_banks().len(), 1);
    let ctrl = bus.csr_bank(Interconnect::CTRL_BANK).expect("ctrl");
    assert_eq!((ctrl.index, ctrl.base), (0, 0x8200_0000));
    assert!(bus.masters().is_empty());
}

#[test]
fn zero_sized_integrated_memory_is_omitted() {
    let core = SocCoreConfig {
        integrated_rom_size: 0,
        ..SocCoreConfig::default()
    };
    let bus = Interconnect::new(&core).expect("map");
    assert!(bus.region("rom").is_none());
    assert!(bus.region("sram").is_some());
}

// ══════════════════════════════════════════════════════════
// 2. Slaves
// ══════════════════════════════════════════════════════════

#[test]
fn slaves_stay_sorted_by_origin() {
    let mut bus = bus();
    bus.add_slave(MemoryRegion::new("ethmac", mem_map::ETHMAC, mem_map::ETHMAC_SIZE, false))
        .expect("ethmac");
    bus.add_slave(MemoryRegion::new("main_ram", mem_map::MAIN_RAM, 0x80_0000, true))
        .expect("main_ram");

    let origins: Vec<u64> = bus.slaves().iter().map(|r| r.origin).collect();
    let mut sorted = origins.clone();
    sorted.sort_unstable();
    assert_eq!(origins, sorted);
    assert_eq!(bus.slaves().len(), 5);
}

#[test]
fn overlapping_slave_names_the_existing_region() {
    let mut bus = bus();
    let err = bus
        .add_slave(MemoryRegion::new("shadow", 0x4000, 0x1000, true))
        .unwrap_err();
    match err {
        SocError::ConfigurationConflict { first, second, detail } => {
            assert_eq!(first, "rom");
            assert_eq!(second, "shadow");
            assert!(detail.contains("overlap"));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(bus.slaves().len(), 3);
}

#[test]
fn duplicate_slave_name_is_a_conflict() {
    let mut bus = bus();
    let err = bus
        .add_slave(MemoryRegion::new("sram", 0x2000_0000, 0x100, true))
        .unwrap_err();
    assert!(matches!(err, SocError::ConfigurationConflict { .. }));
}

#[test]
fn zero_sized_slave_is_invalid() {
    let mut bus = bus();
    let err = bus
        .add_slave(MemoryRegion::new("empty", 0x2000_0000, 0, true))
        .unwrap_err();
    assert!(matches!(err, SocError::InvalidConfig(_)));
}

#[test]
fn decode_routes_to_owning_region() {
    let mut bus = bus();
    bus.add_slave(MemoryRegion::new("main_ram", mem_map::MAIN_RAM, 0x80_0000, true))
        .expect("main_ram");

    let name = |addr: u64| bus.decode(addr).map(|r| r.name.clone());
    assert_eq!(name(0x10).as_deref(), Some("rom"));
    assert_eq!(name(0x7fff).as_deref(), Some("rom"));
    assert_eq!(name(0x8000), None);
    assert_eq!(name(0x0100_1fff).as_deref(), Some("sram"));
    assert_eq!(name(0x4070_0000).as_deref(), Some("main_ram"));
    assert_eq!(name(0x4080_0000), None);
    assert_eq!(name(0x8200_0800).as_deref(), Some("csr"));
}

// ══════════════════════════════════════════════════════════
// 3. Masters and CSR banks
// ══════════════════════════════════════════════════════════

#[test]
fn masters_get_priority_in_registration_order() {
    let mut bus = bus();
    assert_eq!(bus.add_master("etherbone").expect("first"), 0);
    assert_eq!(bus.add_master("dma").expect("second"), 1);
    assert!(matches!(
        bus.add_master("etherbone"),
        Err(SocError::ConfigurationConflict { .. })
    ));
    assert_eq!(bus.masters(), ["etherbone".to_string(), "dma".to_string()]);
}

#[test]
fn csr_banks_are_strided() {
    let mut bus = bus();
    let phy = bus.add_csr_bank("ethphy").expect("ethphy").clone();
    let sdram = bus.add_csr_bank("sdram").expect("sdram").clone();
    assert_eq!((phy.index, phy.base), (1, 0x8200_0800));
    assert_eq!((sdram.index, sdram.base), (2, 0x8200_1000));
    assert!(matches!(
        bus.add_csr_bank("sdram"),
        Err(SocError::ConfigurationConflict { .. })
    ));
}

#[test]
fn csr_region_fills_up() {
    let mut bus = bus();
    let capacity = mem_map::CSR_SIZE / mem_map::CSR_BANK_STRIDE;
    for i in 1..capacity {
        let _ = bus.add_csr_bank(&format!("bank{i}")).expect("room left");
    }
    assert!(matches!(
        bus.add_csr_bank("overflow"),
        Err(SocError::InvalidConfig(_))
    ));
}

// ══════════════════════════════════════════════════════════
// 4. Fabric wiring
// ══════════════════════════════════════════════════════════

/// A top module where every default slave and `masters` are driven by stub instances.
fn wired_top(masters: &[&str]) -> Module {
    let mut top = Module::new("top");
    for name in masters.iter().chain(&["rom", "sram", "csr"]) {
        let channel = Channel::wishbone(name);
        channel.declare(&mut top).expect("declare");
        top.instantiate(channel.attach(Instance::new("Stub", *name), "bus"));
    }
    top
}

#[test]
fn fully_wired_bus_passes_the_check() {
    let mut bus = bus();
    let _ = bus.add_master("etherbone").expect("master");
    assert!(bus.check_wiring(&wired_top(&["etherbone"])).is_ok());
}

#[test]
fn undeclared_master_channel_is_rejected() {
    let mut bus = bus();
    let _ = bus.add_master("dma").expect("master");
    match bus.check_wiring(&wired_top(&[])) {
        Err(SocError::InvalidConfig(msg)) => assert!(msg.contains("wb_dma"), "{msg}"),
        other => panic!("expected unwired port, got {other:?}"),
    }
}

#[test]
fn declared_but_unattached_channel_is_rejected() {
    let mut bus = bus();
    let _ = bus.add_master("dma").expect("master");
    let mut top = wired_top(&[]);
    Channel::wishbone("dma").declare(&mut top).expect("declare");
    assert!(matches!(
        bus.check_wiring(&top),
        Err(SocError::InvalidConfig(_))
    ));
}

#[test]
fn fabric_lists_masters_by_priority_and_slaves_by_origin() {
    let mut bus = bus();
    let _ = bus.add_master("cpu_ibus").expect("ibus");
    let _ = bus.add_master("etherbone").expect("etherbone");
    bus.add_slave(MemoryRegion::new("main_ram", mem_map::MAIN_RAM, 0x80_0000, true))
        .expect("main_ram");
    let fabric = bus.instance();

    assert_eq!(fabric.kind, Interconnect::FABRIC_KIND);
    assert_eq!(fabric.name, Interconnect::FABRIC_NAME);
    let param = |name: &str| {
        fabric
            .params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(param("NMASTERS"), Some(Param::Int(2)));
    assert_eq!(param("NSLAVES"), Some(Param::Int(4)));
    assert_eq!(param("M1_NAME"), Some(Param::Str("etherbone".to_string())));
    assert_eq!(param("S2_NAME"), Some(Param::Str("main_ram".to_string())));
    assert_eq!(param("S2_ORIGIN"), Some(Param::Int(0x4000_0000)));

    let port = |name: &str| fabric.ports.iter().find(|(n, _)| n == name).map(|(_, e)| e);
    assert_eq!(port("m0_fwd"), Some(&Expr::sig("wb_cpu_ibus_fwd")));
    assert_eq!(port("m1_bwd"), Some(&Expr::sig("wb_etherbone_bwd")));
    assert_eq!(port("s3_fwd"), Some(&Expr::sig("wb_csr_fwd")));
}

proptest! {
    #[test]
    fn overlap_is_symmetric(
        a in 0u64..0x1_0000, a_len in 1u64..0x1000,
        b in 0u64..0x1_0000, b_len in 1u64..0x1000
    ) {
        let x = MemoryRegion::new("x", a, a_len, true);
        let y = MemoryRegion::new("y", b, b_len, true);
        prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
        let shared = (a..a + a_len).any(|addr| y.contains(addr));
        prop_assert_eq!(x.overlaps(&y), shared);
    }
}
