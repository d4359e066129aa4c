//! Raw circuit descriptions as they appear on disk
//!
//! The description is deserialized with every field optional so that missing
//! keys produce a [`NetlistError`] naming the field instead of a generic serde
//! message. [`CircuitDescription::validate`] turns it into a [`Circuit`].

use crate::circuit::{Circuit, Countermeasure, FaultModel, FaultType, Node, NodeKind};
use crate::error::{NetlistError, NetlistResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Circuit description before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitDescription {
    pub nodes: Option<Vec<RawNode>>,
    pub fault_model: Option<RawFaultModel>,
    pub countermeasure: Option<String>,
}

/// Node entry before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    pub id: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<String>,
    pub inputs: Option<Vec<String>>,
    #[serde(default)]
    pub vulnerable: bool,
}

/// Fault model entry before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFaultModel {
    pub n_e: Option<u32>,
    pub n_c: Option<i64>,
    pub fault_type: Option<String>,
    pub vulnerable_types: Option<Vec<String>>,
}

/// Command-line overrides applied on top of a description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitOverrides {
    pub n_e: Option<u32>,
    pub fault_type: Option<FaultType>,
    pub countermeasure: Option<Countermeasure>,
}

impl CircuitOverrides {
    pub fn is_empty(&self) -> bool {
        self.n_e.is_none() && self.fault_type.is_none() && self.countermeasure.is_none()
    }
}

impl CircuitDescription {
    pub fn from_json_str(json: &str) -> NetlistResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> NetlistResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Apply overrides in place; returns whether anything changed
    pub fn apply_overrides(&mut self, overrides: &CircuitOverrides) -> NetlistResult<bool> {
        let mut modified = false;

        if let Some(n_e) = overrides.n_e {
            if n_e == 0 {
                return Err(NetlistError::InvalidFaultBound(n_e));
            }
            self.fault_model.get_or_insert_with(Default::default).n_e = Some(n_e);
            log::info!("Override: n_e = {}", n_e);
            modified = true;
        }

        if let Some(fault_type) = overrides.fault_type {
            self.fault_model.get_or_insert_with(Default::default).fault_type =
                Some(fault_type.to_string());
            log::info!("Override: fault_type = {}", fault_type);
            modified = true;
        }

        if let Some(countermeasure) = overrides.countermeasure {
            self.countermeasure = Some(countermeasure.to_string());
            log::info!("Override: countermeasure = {}", countermeasure);
            modified = true;
        }

        Ok(modified)
    }

    /// Validate the description and build a [`Circuit`]
    pub fn validate(self, name: impl Into<String>) -> NetlistResult<Circuit> {
        let raw_nodes = self
            .nodes
            .ok_or_else(|| NetlistError::MissingField("nodes".to_string()))?;
        let raw_model = self
            .fault_model
            .ok_or_else(|| NetlistError::MissingField("fault_model".to_string()))?;
        let raw_countermeasure = self
            .countermeasure
            .ok_or_else(|| NetlistError::MissingField("countermeasure".to_string()))?;

        let fault_model = validate_fault_model(raw_model)?;
        let countermeasure = raw_countermeasure
            .parse::<Countermeasure>()
            .map_err(|_| NetlistError::InvalidCountermeasure(raw_countermeasure.clone()))?;

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for (pos, raw) in raw_nodes.into_iter().enumerate() {
            nodes.push(validate_node(pos, raw)?);
        }

        for node in nodes.iter().filter(|n| n.vulnerable) {
            if !fault_model.vulnerable_types.contains(&node.kind) {
                log::debug!(
                    "Node {} is marked vulnerable but {} is not listed in vulnerable_types",
                    node.id,
                    node.kind
                );
            }
        }

        let circuit = Circuit::from_parts(name, nodes, fault_model, countermeasure)?;
        circuit.log_statistics();
        log::info!(
            "Using fault type: {}, maximum number of faults: {}",
            circuit.fault_model.fault_type,
            circuit.fault_model.n_e
        );
        Ok(circuit)
    }
}

fn validate_fault_model(raw: RawFaultModel) -> NetlistResult<FaultModel> {
    let missing = |field: &str| NetlistError::MissingFaultModelField(field.to_string());

    let n_e = raw.n_e.ok_or_else(|| missing("n_e"))?;
    let n_c = raw.n_c.ok_or_else(|| missing("n_c"))?;
    let raw_fault_type = raw.fault_type.ok_or_else(|| missing("fault_type"))?;
    let raw_vulnerable_types = raw
        .vulnerable_types
        .ok_or_else(|| missing("vulnerable_types"))?;

    if n_e == 0 {
        return Err(NetlistError::InvalidFaultBound(n_e));
    }

    let fault_type = raw_fault_type.parse::<FaultType>().unwrap_or_else(|_| {
        log::warn!(
            "Invalid fault type {}, using default type '{}'",
            raw_fault_type,
            FaultType::default()
        );
        FaultType::default()
    });

    let mut vulnerable_types = Vec::with_capacity(raw_vulnerable_types.len());
    for entry in raw_vulnerable_types {
        match entry.parse::<NodeKind>() {
            Ok(kind) => vulnerable_types.push(kind),
            Err(_) => log::warn!("Ignoring unknown vulnerable type '{}'", entry),
        }
    }

    Ok(FaultModel {
        n_e,
        n_c,
        fault_type,
        vulnerable_types,
    })
}

fn validate_node(pos: usize, raw: RawNode) -> NetlistResult<Node> {
    let (id, raw_kind) = match (raw.id, raw.kind) {
        (Some(id), Some(kind)) => (id, kind),
        _ => return Err(NetlistError::IncompleteNode(pos)),
    };

    let kind = raw_kind
        .parse::<NodeKind>()
        .map_err(|kind| NetlistError::InvalidNodeKind {
            node: id.clone(),
            kind,
        })?;

    let inputs = match raw.inputs {
        Some(inputs) => inputs,
        None if kind.requires_inputs() => return Err(NetlistError::MissingInputs(id)),
        None => Vec::new(),
    };

    Ok(Node {
        id,
        kind,
        inputs,
        vulnerable: raw.vulnerable,
    })
}

/// Load, override and validate a circuit description file
///
/// The circuit is named after the file stem.
pub fn load_circuit(path: &Path, overrides: &CircuitOverrides) -> NetlistResult<Circuit> {
    log::info!("Starting to read circuit {}", path.display());
    let mut description = CircuitDescription::from_path(path)?;
    description.apply_overrides(overrides)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "circuit".to_string());
    description.validate(name)
}
