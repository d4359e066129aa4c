//! Circuit descriptions for fault-injection analysis
//!
//! This crate provides:
//! - The gate-level circuit model (nodes, fault model, countermeasure)
//! - JSON description parsing with field-level error reporting
//! - Structural validation and command-line overrides

pub mod circuit;
pub mod description;
pub mod error;

pub use circuit::{
    Circuit, Countermeasure, FaultModel, FaultType, Node, NodeKind, COMPARATOR_PREFIX, FLAG_NODE,
};
pub use description::{load_circuit, CircuitDescription, CircuitOverrides, RawFaultModel, RawNode};
pub use error::{NetlistError, NetlistResult};
