//! Timing constraint set.
//!
//! An ordered, append-only list of clock period and false-path declarations.
//! The composer appends in feature declaration order so that two compositions
//! of the same configuration produce identical constraint files.

use std::fmt;

use serde::Serialize;

use crate::common::Frequency;

/// What a constraint refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum ClockRef {
    /// A top-level clock input port (e.g. `clk25`).
    Pad(String),
    /// The clock net of a named clock domain (e.g. `eth_rx`).
    Domain(String),
}

impl ClockRef {
    /// Netlist name of the referenced clock.
    pub fn net(&self) -> String {
        match self {
            Self::Pad(port) => port.clone(),
            Self::Domain(domain) => format!("{domain}_clk"),
        }
    }
}

impl fmt::Display for ClockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pad(port) => write!(f, "pad:{port}"),
            Self::Domain(domain) => write!(f, "domain:{domain}"),
        }
    }
}

/// One timing declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// The clock toggles at `freq`.
    Period {
        /// Constrained clock.
        clock: ClockRef,
        /// Target frequency.
        freq: Frequency,
    },
    /// Paths between the two clocks are not timed.
    FalsePath {
        /// Launch clock.
        from: ClockRef,
        /// Capture clock.
        to: ClockRef,
    },
}

/// Ordered collection of timing constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConstraintSet {
    entries: Vec<Constraint>,
}

impl ConstraintSet {
    /// Creates an empty set.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declares the period of `clock`.
    pub fn add_period(&mut self, clock: ClockRef, freq: Frequency) {
        self.entries.push(Constraint::Period { clock, freq });
    }

    /// Declares every pair of `clocks` unrelated, in both directions.
    ///
    /// For `[a, b, c]` this appends `a→b, b→a, a→c, c→a, b→c, c→b`.
    pub fn add_false_paths(&mut self, clocks: &[ClockRef]) {
        for (i, a) in clocks.iter().enumerate() {
            for b in &clocks[i + 1..] {
                self.entries.push(Constraint::FalsePath {
                    from: a.clone(),
                    to: b.clone(),
                });
                self.entries.push(Constraint::FalsePath {
                    from: b.clone(),
                    to: a.clone(),
                });
            }
        }
    }

    /// Appends every constraint of `other`, preserving its order.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// All constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }

    /// Period constraints as `(clock, freq)` pairs, in order.
    pub fn periods(&self) -> impl Iterator<Item = (&ClockRef, Frequency)> {
        self.entries.iter().filter_map(|c| match c {
            Constraint::Period { clock, freq } => Some((clock, *freq)),
            Constraint::FalsePath { .. } => None,
        })
    }

    /// False-path constraints as `(from, to)` pairs, in order.
    pub fn false_paths(&self) -> impl Iterator<Item = (&ClockRef, &ClockRef)> {
        self.entries.iter().filter_map(|c| match c {
            Constraint::FalsePath { from, to } => Some((from, to)),
            Constraint::Period { .. } => None,
        })
    }

    /// Returns `true` if timing between `a` and `b` is cut in either direction.
    pub fn has_false_path(&self, a: &ClockRef, b: &ClockRef) -> bool {
        self.false_paths()
            .any(|(from, to)| (from == a && to == b) || (from == b && to == a))
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no constraint was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
