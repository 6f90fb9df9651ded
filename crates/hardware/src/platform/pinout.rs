//! Pinout catalog for the Colorlight 5A-75B.
//!
//! Each revision is a static table of resources. A resource is either a
//! single signal (unnamed subsignal) or a bundle of named subsignals; every
//! subsignal lists its package pins (CABGA256 balls) and IO standard.
//!
//! `serial` is an overlay: its TX and RX share balls with the user LED and the
//! button header. Only one of the overlapping resources can be claimed.

use crate::config::BoardRevision;
use crate::hdl::Direction;

/// One subsignal of a resource.
#[derive(Debug)]
pub struct Subsignal {
    /// Subsignal name; empty for single-signal resources.
    pub name: &'static str,
    /// Package pins, LSB first.
    pub pins: &'static [&'static str],
    /// Direction seen from the FPGA.
    pub dir: Direction,
    /// IO standard.
    pub io_standard: &'static str,
}

/// A named, indexed board resource.
#[derive(Debug)]
pub struct Resource {
    /// Resource name (`clk25`, `eth`, ...).
    pub name: &'static str,
    /// Resource index.
    pub index: u32,
    /// Subsignals.
    pub subsignals: &'static [Subsignal],
}

const LVCMOS33: &str = "LVCMOS33";

const fn single(pin: &'static [&'static str], dir: Direction) -> [Subsignal; 1] {
    [Subsignal {
        name: "",
        pins: pin,
        dir,
        io_standard: LVCMOS33,
    }]
}

const fn sub(name: &'static str, pins: &'static [&'static str], dir: Direction) -> Subsignal {
    Subsignal {
        name,
        pins,
        dir,
        io_standard: LVCMOS33,
    }
}

use Direction::{Inout, Input, Output};

static V7_0: &[Resource] = &[
    Resource { name: "clk25", index: 0, subsignals: &single(&["P6"], Input) },
    Resource { name: "user_led_n", index: 0, subsignals: &single(&["P11"], Output) },
    Resource { name: "user_btn_n", index: 0, subsignals: &single(&["M13"], Input) },
    Resource {
        name: "serial",
        index: 0,
        subsignals: &[sub("tx", &["P11"], Output), sub("rx", &["M13"], Input)],
    },
    Resource { name: "j1", index: 0, subsignals: &single(&["F3"], Output) },
    Resource { name: "j1", index: 1, subsignals: &single(&["F1"], Output) },
    Resource { name: "j1", index: 2, subsignals: &single(&["G3"], Output) },
    Resource {
        name: "hub75",
        index: 0,
        subsignals: &[
            sub("R0", &["K3"], Output),
            sub("G0", &["K4"], Output),
            sub("B0", &["K5"], Output),
        ],
    },
    Resource { name: "sdram_clock", index: 0, subsignals: &single(&["C6"], Output) },
    Resource {
        name: "sdram",
        index: 0,
        subsignals: &[
            sub("a", &["A9", "E10", "B12", "D13", "C12", "D11", "D10", "E9", "D9", "B7", "C8"], Output),
            sub(
                "dq",
                &[
                    "B13", "C11", "C10", "A11", "C9", "E8", "B6", "B9", "A6", "B5", "A5", "B4",
                    "B3", "C3", "A2", "B2", "E2", "D3", "A4", "E4", "D4", "C4", "E5", "D5", "E6",
                    "D6", "D8", "A8", "B8", "B10", "B11", "E11",
                ],
                Inout,
            ),
            sub("we_n", &["C7"], Output),
            sub("ras_n", &["D7"], Output),
            sub("cas_n", &["E7"], Output),
            sub("ba", &["A7", "A10"], Output),
        ],
    },
    Resource {
        name: "eth_clocks",
        index: 0,
        subsignals: &[sub("tx", &["G1"], Output), sub("rx", &["H2"], Input)],
    },
    Resource {
        name: "eth",
        index: 0,
        subsignals: &[
            sub("mdio", &["P3"], Inout),
            sub("mdc", &["N5"], Output),
            sub("rx_ctl", &["P2"], Input),
            sub("rx_data", &["K2", "L1", "N1", "P1"], Input),
            sub("tx_ctl", &["K1"], Output),
            sub("tx_data", &["G2", "H1", "J1", "J3"], Output),
        ],
    },
    Resource {
        name: "eth_clocks",
        index: 1,
        subsignals: &[sub("tx", &["J16"], Output), sub("rx", &["K16"], Input)],
    },
    Resource {
        name: "eth",
        index: 1,
        subsignals: &[
            sub("rx_ctl", &["M16"], Input),
            sub("rx_data", &["M15", "R16", "L15", "L16"], Input),
            sub("tx_ctl", &["K14"], Output),
            sub("tx_data", &["K15", "K13", "L13", "M14"], Output),
        ],
    },
];

static V6_1: &[Resource] = &[
    Resource { name: "clk25", index: 0, subsignals: &single(&["P6"], Input) },
    Resource { name: "user_led_n", index: 0, subsignals: &single(&["T6"], Output) },
    Resource {
        name: "serial",
        index: 0,
        subsignals: &[sub("tx", &["T6"], Output), sub("rx", &["R7"], Input)],
    },
    Resource { name: "j1", index: 0, subsignals: &single(&["F3"], Output) },
    Resource { name: "j1", index: 1, subsignals: &single(&["F1"], Output) },
    Resource { name: "j1", index: 2, subsignals: &single(&["G3"], Output) },
    Resource {
        name: "hub75",
        index: 0,
        subsignals: &[
            sub("R0", &["J16"], Output),
            sub("G0", &["K16"], Output),
            sub("B0", &["J15"], Output),
        ],
    },
    Resource { name: "sdram_clock", index: 0, subsignals: &single(&["C8"], Output) },
    Resource {
        name: "sdram",
        index: 0,
        subsignals: &[
            sub("a", &["A9", "B9", "B10", "C10", "D9", "C9", "E9", "D8", "E8", "C7", "B8"], Output),
            sub(
                "dq",
                &[
                    "B13", "C11", "C12", "D12", "E12", "D11", "E11", "D10", "A4", "B4", "A5",
                    "B5", "A6", "B6", "A7", "B7", "C4", "D4", "C5", "D5", "C6", "D6", "E6", "E7",
                    "B1", "C1", "C2", "D1", "D2", "E2", "E3", "F2",
                ],
                Inout,
            ),
            sub("we_n", &["A10"], Output),
            sub("ras_n", &["B11"], Output),
            sub("cas_n", &["A11"], Output),
            sub("ba", &["B12"], Output),
        ],
    },
    Resource {
        name: "eth_clocks",
        index: 0,
        subsignals: &[sub("tx", &["M2"], Output), sub("rx", &["M1"], Input)],
    },
    Resource {
        name: "eth",
        index: 0,
        subsignals: &[
            sub("mdio", &["P5"], Inout),
            sub("mdc", &["N5"], Output),
            sub("rx_ctl", &["N6"], Input),
            sub("rx_data", &["N1", "M5", "N3", "N4"], Input),
            sub("tx_ctl", &["M3"], Output),
            sub("tx_data", &["L1", "L3", "P2", "L4"], Output),
        ],
    },
    Resource {
        name: "eth_clocks",
        index: 1,
        subsignals: &[sub("tx", &["M12"], Output), sub("rx", &["M16"], Input)],
    },
    Resource {
        name: "eth",
        index: 1,
        subsignals: &[
            sub("rx_ctl", &["L15"], Input),
            sub("rx_data", &["P13", "N13", "P14", "M15"], Input),
            sub("tx_ctl", &["R15"], Output),
            sub("tx_data", &["T14", "R12", "R13", "R14"], Output),
        ],
    },
];

/// Resource table for `revision`.
pub const fn catalog(revision: BoardRevision) -> &'static [Resource] {
    match revision {
        BoardRevision::V7_0 => V7_0,
        BoardRevision::V6_1 => V6_1,
    }
}
