//! Variable allocation
//!
//! All solver variables are drawn from one counter shared by four namespaces:
//! node signals, fault-control signals, faulty-output shadows and the unnamed
//! auxiliaries introduced by cardinality encodings. Ids are dense (`1..next_var`)
//! and never reused.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A solver variable (1-based, DIMACS numbering)
pub type VarId = u32;

/// Variable namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Node,
    Control,
    Faulty,
    Auxiliary,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Node => "nodes",
            Namespace::Control => "controls",
            Namespace::Faulty => "faulty_outputs",
            Namespace::Auxiliary => "auxiliary",
        }
    }
}

/// Observed id range of one namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarRange {
    pub count: usize,
    pub min: VarId,
    pub max: VarId,
}

impl VarRange {
    fn record(&mut self, var: VarId) {
        if self.count == 0 {
            self.min = var;
            self.max = var;
        } else {
            self.min = self.min.min(var);
            self.max = self.max.max(var);
        }
        self.count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl fmt::Display for VarRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}, ID range: {}-{}", self.count, self.min, self.max)
        }
    }
}

/// Per-namespace ranges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarRanges {
    pub nodes: VarRange,
    pub controls: VarRange,
    pub faulty_outputs: VarRange,
    pub auxiliary: VarRange,
}

impl VarRanges {
    fn get_mut(&mut self, namespace: Namespace) -> &mut VarRange {
        match namespace {
            Namespace::Node => &mut self.nodes,
            Namespace::Control => &mut self.controls,
            Namespace::Faulty => &mut self.faulty_outputs,
            Namespace::Auxiliary => &mut self.auxiliary,
        }
    }
}

// ============================================================================
// Allocator
// ============================================================================

/// Hands out variables during one compilation pass
#[derive(Debug)]
pub struct VariableAllocator {
    next_var: VarId,
    node_vars: IndexMap<String, VarId>,
    control_vars: IndexMap<String, VarId>,
    faulty_vars: IndexMap<String, VarId>,
    ranges: VarRanges,
}

impl VariableAllocator {
    pub fn new() -> Self {
        Self {
            next_var: 1,
            node_vars: IndexMap::new(),
            control_vars: IndexMap::new(),
            faulty_vars: IndexMap::new(),
            ranges: VarRanges::default(),
        }
    }

    fn draw(&mut self, namespace: Namespace) -> VarId {
        let var = self.next_var;
        self.next_var += 1;
        self.ranges.get_mut(namespace).record(var);
        var
    }

    /// Variable carrying the golden value of a node
    pub fn var_for_node(&mut self, id: &str) -> VarId {
        if let Some(&var) = self.node_vars.get(id) {
            return var;
        }
        let var = self.draw(Namespace::Node);
        self.node_vars.insert(id.to_string(), var);
        var
    }

    /// Variable activating the fault at a node
    pub fn control_var_for(&mut self, id: &str) -> VarId {
        if let Some(&var) = self.control_vars.get(id) {
            return var;
        }
        let var = self.draw(Namespace::Control);
        self.control_vars.insert(id.to_string(), var);
        var
    }

    /// Variable carrying the faulty shadow value of a node
    pub fn faulty_var_for(&mut self, id: &str) -> VarId {
        if let Some(&var) = self.faulty_vars.get(id) {
            return var;
        }
        let var = self.draw(Namespace::Faulty);
        self.faulty_vars.insert(id.to_string(), var);
        var
    }

    /// Unnamed variable for encoding internals
    pub fn fresh_auxiliary(&mut self) -> VarId {
        self.draw(Namespace::Auxiliary)
    }

    /// Node variable if one was already allocated
    pub fn lookup_node(&self, id: &str) -> Option<VarId> {
        self.node_vars.get(id).copied()
    }

    pub fn control_vars(&self) -> &IndexMap<String, VarId> {
        &self.control_vars
    }

    /// Number of variables allocated so far
    pub fn num_vars(&self) -> VarId {
        self.next_var - 1
    }

    /// Freeze the allocator into a read-only table
    pub fn finish(self) -> VariableTable {
        VariableTable {
            num_vars: self.next_var - 1,
            node_vars: self.node_vars,
            control_vars: self.control_vars,
            faulty_vars: self.faulty_vars,
            ranges: self.ranges,
        }
    }
}

impl Default for VariableAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Frozen table
// ============================================================================

/// Read-only translation layer between node ids and solver variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableTable {
    num_vars: VarId,
    node_vars: IndexMap<String, VarId>,
    control_vars: IndexMap<String, VarId>,
    faulty_vars: IndexMap<String, VarId>,
    ranges: VarRanges,
}

impl VariableTable {
    /// Rebuild a table from persisted mappings
    ///
    /// Auxiliary variables are not persisted; the variable count is the
    /// largest id present in any mapping.
    pub fn from_mappings(
        node_vars: IndexMap<String, VarId>,
        control_vars: IndexMap<String, VarId>,
        faulty_vars: IndexMap<String, VarId>,
    ) -> Self {
        let mut ranges = VarRanges::default();
        for &var in node_vars.values() {
            ranges.nodes.record(var);
        }
        for &var in control_vars.values() {
            ranges.controls.record(var);
        }
        for &var in faulty_vars.values() {
            ranges.faulty_outputs.record(var);
        }
        let num_vars = [ranges.nodes, ranges.controls, ranges.faulty_outputs]
            .iter()
            .map(|r| r.max)
            .max()
            .unwrap_or(0);

        Self {
            num_vars,
            node_vars,
            control_vars,
            faulty_vars,
            ranges,
        }
    }

    pub fn num_vars(&self) -> VarId {
        self.num_vars
    }

    pub fn node_var(&self, id: &str) -> Option<VarId> {
        self.node_vars.get(id).copied()
    }

    pub fn control_var(&self, id: &str) -> Option<VarId> {
        self.control_vars.get(id).copied()
    }

    pub fn faulty_var(&self, id: &str) -> Option<VarId> {
        self.faulty_vars.get(id).copied()
    }

    pub fn node_vars(&self) -> &IndexMap<String, VarId> {
        &self.node_vars
    }

    pub fn control_vars(&self) -> &IndexMap<String, VarId> {
        &self.control_vars
    }

    pub fn faulty_vars(&self) -> &IndexMap<String, VarId> {
        &self.faulty_vars
    }

    pub fn ranges(&self) -> &VarRanges {
        &self.ranges
    }

    pub fn log_summary(&self) {
        log::info!("Variable allocation statistics:");
        log::info!("  - Node variables: {}", self.ranges.nodes);
        log::info!("  - Control variables: {}", self.ranges.controls);
        log::info!("  - Faulty output variables: {}", self.ranges.faulty_outputs);
        log::info!("  - Auxiliary variables: {}", self.ranges.auxiliary);
    }
}
