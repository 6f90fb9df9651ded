//! Module dependency graph.
//!
//! Nodes are appended in instantiation order and may only depend on nodes that
//! already exist, so insertion order is always a valid topological order.

use serde::Serialize;

use crate::common::{Result, SocError};

/// One instantiated subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleNode {
    /// Node name (`crg`, `led`, `sdram`, ...).
    pub name: String,
    /// Nodes this one was built on.
    pub depends_on: Vec<String>,
    /// Parameters recorded for the design descriptor.
    pub parameters: serde_json::Value,
}

/// Append-only, dependency-ordered list of subsystem instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ModuleGraph {
    nodes: Vec<ModuleNode>,
}

impl ModuleGraph {
    /// Creates an empty graph.
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Appends a node.
    ///
    /// # Errors
    ///
    /// [`SocError::ConfigurationConflict`] if the name is taken,
    /// [`SocError::InvalidConfig`] if a dependency has not been added yet.
    pub fn add(
        &mut self,
        name: &str,
        depends_on: &[&str],
        parameters: serde_json::Value,
    ) -> Result<()> {
        if self.contains(name) {
            return Err(SocError::ConfigurationConflict {
                first: name.to_string(),
                second: name.to_string(),
                detail: "module instantiated twice".to_string(),
            });
        }
        if let Some(missing) = depends_on.iter().find(|d| !self.contains(d)) {
            return Err(SocError::InvalidConfig(format!(
                "module `{name}` depends on `{missing}`, which is not instantiated"
            )));
        }
        self.nodes.push(ModuleNode {
            name: name.to_string(),
            depends_on: depends_on.iter().map(|d| (*d).to_string()).collect(),
            parameters,
        });
        Ok(())
    }

    /// Returns `true` if a node named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }

    /// Position of `name` in instantiation order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Looks up a node.
    pub fn node(&self, name: &str) -> Option<&ModuleNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes in instantiation order.
    pub fn nodes(&self) -> &[ModuleNode] {
        &self.nodes
    }

    /// Node names in instantiation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing was instantiated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
