//! Error types for circuit description parsing and validation

use thiserror::Error;

/// Result type for netlist operations
pub type NetlistResult<T> = std::result::Result<T, NetlistError>;

/// Errors that can occur while loading or validating a circuit description
///
/// Every variant is a configuration error: the description cannot be compiled
/// and no solve attempt should be made.
#[derive(Debug, Error)]
pub enum NetlistError {
    /// Top-level key missing from the description
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Key missing from the fault model
    #[error("Missing required fault model field: {0}")]
    MissingFaultModelField(String),

    /// Countermeasure other than detection/correction
    #[error("Invalid countermeasure type: {0}, valid types are: detection, correction")]
    InvalidCountermeasure(String),

    /// Node entry without `id` or `type`
    #[error("Node at position {0} must contain 'id' and 'type' fields")]
    IncompleteNode(usize),

    /// Node kind outside the eight supported kinds
    #[error("Invalid node type '{kind}' for node '{node}'")]
    InvalidNodeKind { node: String, kind: String },

    /// Non-input, non-register node without inputs
    #[error("Non-input node {0} must contain an 'inputs' field")]
    MissingInputs(String),

    /// Two nodes share the same id
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// An input references a node that does not exist
    #[error("Node '{node}' references unknown input '{input}'")]
    UnknownInput { node: String, input: String },

    /// Too few inputs for the node kind
    #[error("Node '{node}' of type {kind} needs {expected} inputs, found {found}")]
    Arity {
        node: String,
        kind: String,
        expected: usize,
        found: usize,
    },

    /// Fault bound must be positive
    #[error("Invalid fault bound n_e = {0}: must be a positive integer")]
    InvalidFaultBound(u32),

    /// Detection requires a connected `flag` output
    #[error("Detection countermeasure requires an output node 'flag' with an input: {0}")]
    MissingFlag(String),

    /// Malformed JSON
    #[error("Failed to parse circuit description: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading the description
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
