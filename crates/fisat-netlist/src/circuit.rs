//! Validated circuit model
//!
//! A [`Circuit`] is produced only by [`CircuitDescription::validate`](crate::CircuitDescription::validate)
//! or [`Circuit::from_parts`]; once built it is never mutated.

use crate::error::{NetlistError, NetlistResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Id of the output node carrying the detection flag
pub const FLAG_NODE: &str = "flag";

/// Id prefix marking an `xor` node as a golden/faulty comparator
pub const COMPARATOR_PREFIX: &str = "cmp";

// ============================================================================
// Node kinds
// ============================================================================

/// The closed set of node kinds a circuit may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Input,
    Output,
    And,
    Or,
    Not,
    Xor,
    Mux,
    Reg,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Input,
        NodeKind::Output,
        NodeKind::And,
        NodeKind::Or,
        NodeKind::Not,
        NodeKind::Xor,
        NodeKind::Mux,
        NodeKind::Reg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::And => "and",
            NodeKind::Or => "or",
            NodeKind::Not => "not",
            NodeKind::Xor => "xor",
            NodeKind::Mux => "mux",
            NodeKind::Reg => "reg",
        }
    }

    /// Number of inputs the encoding consumes
    ///
    /// A `reg` may also have zero inputs (unconnected register).
    pub fn arity(&self) -> usize {
        match self {
            NodeKind::Input => 0,
            NodeKind::Output | NodeKind::Not | NodeKind::Reg => 1,
            NodeKind::And | NodeKind::Or | NodeKind::Xor => 2,
            NodeKind::Mux => 3,
        }
    }

    /// Whether a node of this kind must list at least one input
    pub fn requires_inputs(&self) -> bool {
        !matches!(self, NodeKind::Input | NodeKind::Reg)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

// ============================================================================
// Fault model
// ============================================================================

/// Fault semantics applied at every vulnerable node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FaultType {
    /// Faulty output is the golden output inverted when the fault is active
    #[default]
    #[serde(rename = "bit-flip")]
    BitFlip,
    /// Faulty output forced to 1 when the fault is active
    #[serde(rename = "set")]
    Set,
    /// Faulty output forced to 0 when the fault is active
    #[serde(rename = "reset")]
    Reset,
}

impl FaultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultType::BitFlip => "bit-flip",
            FaultType::Set => "set",
            FaultType::Reset => "reset",
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bit-flip" => Ok(FaultType::BitFlip),
            "set" => Ok(FaultType::Set),
            "reset" => Ok(FaultType::Reset),
            other => Err(format!(
                "invalid fault type '{}', valid types are: bit-flip, set, reset",
                other
            )),
        }
    }
}

/// Threat model attached to the whole circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultModel {
    /// Maximum number of simultaneous faults
    pub n_e: u32,
    /// Reserved; carried through but not enforced
    pub n_c: i64,
    pub fault_type: FaultType,
    /// Node kinds declared eligible for fault injection
    pub vulnerable_types: Vec<NodeKind>,
}

/// Countermeasure protecting the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Countermeasure {
    Detection,
    Correction,
}

impl Countermeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Countermeasure::Detection => "detection",
            Countermeasure::Correction => "correction",
        }
    }
}

impl fmt::Display for Countermeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Countermeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detection" => Ok(Countermeasure::Detection),
            "correction" => Ok(Countermeasure::Correction),
            other => Err(format!(
                "invalid countermeasure '{}', valid types are: detection, correction",
                other
            )),
        }
    }
}

// ============================================================================
// Nodes and circuits
// ============================================================================

/// A single gate or I/O node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub inputs: Vec<String>,
    pub vulnerable: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, inputs: &[&str]) -> Self {
        Self {
            id: id.into(),
            kind,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            vulnerable: false,
        }
    }

    pub fn vulnerable(mut self) -> Self {
        self.vulnerable = true;
        self
    }

    /// Comparators read the faulty shadow of their vulnerable inputs
    pub fn is_comparator(&self) -> bool {
        self.kind == NodeKind::Xor && self.id.starts_with(COMPARATOR_PREFIX)
    }

    /// The inputs the encoding consumes; extra entries are ignored
    pub fn used_inputs(&self) -> &[String] {
        let n = self.kind.arity().min(self.inputs.len());
        &self.inputs[..n]
    }
}

/// A validated circuit
#[derive(Debug, Clone)]
pub struct Circuit {
    pub name: String,
    nodes: Vec<Node>,
    index: IndexMap<String, usize>,
    pub fault_model: FaultModel,
    pub countermeasure: Countermeasure,
}

impl Circuit {
    /// Build a circuit from already-typed parts, applying the structural checks
    pub fn from_parts(
        name: impl Into<String>,
        nodes: Vec<Node>,
        fault_model: FaultModel,
        countermeasure: Countermeasure,
    ) -> NetlistResult<Self> {
        if fault_model.n_e == 0 {
            return Err(NetlistError::InvalidFaultBound(0));
        }

        let mut index = IndexMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), pos).is_some() {
                return Err(NetlistError::DuplicateNode(node.id.clone()));
            }
        }

        let circuit = Self {
            name: name.into(),
            nodes,
            index,
            fault_model,
            countermeasure,
        };
        circuit.check_structure()?;
        Ok(circuit)
    }

    fn check_structure(&self) -> NetlistResult<()> {
        for node in &self.nodes {
            if node.kind.requires_inputs() && node.inputs.is_empty() {
                return Err(NetlistError::MissingInputs(node.id.clone()));
            }

            let expected = node.kind.arity();
            if node.kind.requires_inputs() && node.inputs.len() < expected {
                return Err(NetlistError::Arity {
                    node: node.id.clone(),
                    kind: node.kind.to_string(),
                    expected,
                    found: node.inputs.len(),
                });
            }
            if node.inputs.len() > expected && node.kind != NodeKind::Input {
                log::warn!(
                    "Node {} is a {}-input {} gate but lists {} inputs; extra inputs ignored",
                    node.id,
                    expected,
                    node.kind,
                    node.inputs.len()
                );
            }

            for input in node.used_inputs() {
                if !self.index.contains_key(input) {
                    return Err(NetlistError::UnknownInput {
                        node: node.id.clone(),
                        input: input.clone(),
                    });
                }
            }
        }

        if self.countermeasure == Countermeasure::Detection {
            match self.node(FLAG_NODE) {
                None => return Err(NetlistError::MissingFlag("no 'flag' node".to_string())),
                Some(flag) if flag.kind != NodeKind::Output => {
                    return Err(NetlistError::MissingFlag(format!(
                        "'flag' is a {} node, expected output",
                        flag.kind
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Whether the node exists and is marked vulnerable
    pub fn is_vulnerable(&self, id: &str) -> bool {
        self.node(id).map(|n| n.vulnerable).unwrap_or(false)
    }

    pub fn vulnerable_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.vulnerable).count()
    }

    /// Node counts per kind, in order of first appearance
    pub fn kind_histogram(&self) -> IndexMap<NodeKind, usize> {
        let mut histogram = IndexMap::new();
        for node in &self.nodes {
            *histogram.entry(node.kind).or_insert(0) += 1;
        }
        histogram
    }

    /// Log node statistics
    pub fn log_statistics(&self) {
        log::info!("Circuit node statistics:");
        for (kind, count) in self.kind_histogram() {
            log::info!("  - {}: {}", kind, count);
        }
        log::info!("  - Vulnerable nodes: {}", self.vulnerable_count());
    }
}
