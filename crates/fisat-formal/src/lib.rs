//! Fault-injection analysis via SAT
//!
//! This crate provides:
//! - Variable allocation over node, control and faulty-output namespaces
//! - Tseitin encoding of gates and fault semantics
//! - Cardinality and countermeasure constraints
//! - DIMACS and variable-map persistence
//! - Embedded and external SAT backends
//! - Decoding of solver models into fault vectors

pub mod cardinality;
pub mod cnf;
pub mod compiler;
pub mod constraints;
pub mod dimacs;
pub mod gate_encoder;
pub mod interpret;
pub mod solver;
pub mod var_map;
pub mod variables;

pub use cnf::{Clause, ClauseCategory, ClauseStats, Formula, Lit};
pub use compiler::{CompiledCircuit, FaultCompiler};
pub use dimacs::{
    parse_dimacs, verify_dimacs_file, write_dimacs, write_dimacs_file, DimacsProblem,
};
pub use interpret::{interpret, interpret_result, Interpretation};
pub use solver::{
    ExternalConfig, SatBackend, SatVerdict, SolverConfig, SolverResult, DEFAULT_EXTERNAL_SOLVER,
};
pub use var_map::VariableMap;
pub use variables::{VarId, VariableAllocator, VariableTable};

use fisat_netlist::Circuit;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormalError {
    #[error("Configuration error during {stage}{}: {message}", node_suffix(.node))]
    Configuration {
        stage: String,
        node: Option<String>,
        message: String,
    },
    #[error("SAT solver unavailable: {0}")]
    SolverUnavailable(String),
    #[error("Cannot decode solver output: {0}")]
    Decoding(String),
    #[error("Invalid DIMACS: {0}")]
    Dimacs(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormalError {
    pub fn configuration(stage: &str, node: &str, message: impl Into<String>) -> Self {
        FormalError::Configuration {
            stage: stage.to_string(),
            node: Some(node.to_string()),
            message: message.into(),
        }
    }
}

fn node_suffix(node: &Option<String>) -> String {
    node.as_ref()
        .map(|n| format!(" at node {}", n))
        .unwrap_or_default()
}

pub type FormalResult<T> = Result<T, FormalError>;

/// Everything produced by one analysis run
#[derive(Debug)]
pub struct AnalysisReport {
    pub compiled: CompiledCircuit,
    pub backend: String,
    pub result: SolverResult,
    pub interpretation: Interpretation,
    pub solve_time: Duration,
}

impl AnalysisReport {
    /// A definite verdict was reached
    pub fn is_conclusive(&self) -> bool {
        !self.result.is_indeterminate() && !self.interpretation.anomalous
    }
}

/// Compile, solve and interpret in one pass
pub fn analyze(
    circuit: &Circuit,
    n_e: Option<u32>,
    solver: &SolverConfig,
) -> FormalResult<AnalysisReport> {
    let compiled = FaultCompiler::new(circuit).with_fault_bound(n_e).compile()?;

    let mut backend = solver.build_for(&compiled);
    log::info!("Solving with {} backend", backend.name());
    let start = Instant::now();
    let result = backend.solve(&compiled.formula);
    let solve_time = start.elapsed();
    log::info!(
        "Solver verdict {} in {} ms",
        result.verdict,
        solve_time.as_millis()
    );

    let interpretation = interpret_result(&result, &compiled.variables, compiled.countermeasure);

    Ok(AnalysisReport {
        backend: backend.name().to_string(),
        compiled,
        result,
        interpretation,
        solve_time,
    })
}
