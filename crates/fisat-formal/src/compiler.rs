//! Circuit-to-CNF compilation pass

use crate::cnf::Formula;
use crate::constraints::{encode_countermeasure, encode_fault_bound};
use crate::gate_encoder::GateEncoder;
use crate::variables::{VarId, VariableAllocator, VariableTable};
use crate::{FormalError, FormalResult};
use fisat_netlist::{Circuit, Countermeasure, FaultType};

/// Output of one compilation pass
#[derive(Debug, Clone)]
pub struct CompiledCircuit {
    pub circuit_name: String,
    pub formula: Formula,
    pub variables: VariableTable,
    /// Fault bound after clamping to the number of control variables
    pub effective_n_e: u32,
    pub fault_type: FaultType,
    pub countermeasure: Countermeasure,
    /// Detection flag variable, if the countermeasure has one
    pub flag_var: Option<VarId>,
}

/// Compiles a validated circuit into a formula
///
/// Each call to [`compile`](Self::compile) owns a fresh allocator, so a
/// different fault bound always means a fresh compilation.
pub struct FaultCompiler<'a> {
    circuit: &'a Circuit,
    n_e: u32,
}

impl<'a> FaultCompiler<'a> {
    pub fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            n_e: circuit.fault_model.n_e,
        }
    }

    /// Replace the circuit's fault bound for this compilation
    pub fn with_fault_bound(mut self, n_e: Option<u32>) -> Self {
        if let Some(n_e) = n_e {
            self.n_e = n_e;
        }
        self
    }

    pub fn compile(&self) -> FormalResult<CompiledCircuit> {
        let circuit = self.circuit;
        if self.n_e == 0 {
            return Err(FormalError::Configuration {
                stage: "fault bound".to_string(),
                node: None,
                message: format!(
                    "n_e must be a positive integer for circuit {}",
                    circuit.name
                ),
            });
        }
        log::info!(
            "Compiling circuit {} ({} nodes, fault type {}, n_e={}, countermeasure {})",
            circuit.name,
            circuit.nodes().len(),
            circuit.fault_model.fault_type,
            self.n_e,
            circuit.countermeasure
        );

        let mut alloc = VariableAllocator::new();
        let mut formula = Formula::new();

        GateEncoder::new(circuit).encode_all(&mut alloc, &mut formula)?;
        let effective_n_e = encode_fault_bound(&mut alloc, &mut formula, self.n_e);
        let flag_var = encode_countermeasure(circuit, &mut alloc, &mut formula)?;

        let variables = alloc.finish();
        formula.declare_vars(variables.num_vars());

        variables.log_summary();
        formula.log_summary();

        Ok(CompiledCircuit {
            circuit_name: circuit.name.clone(),
            formula,
            variables,
            effective_n_e,
            fault_type: circuit.fault_model.fault_type,
            countermeasure: circuit.countermeasure,
            flag_var,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisat_netlist::{FaultModel, Node, NodeKind};

    fn duplicated_and(n_e: u32) -> Circuit {
        Circuit::from_parts(
            "dup_and",
            vec![
                Node::new("a", NodeKind::Input, &[]),
                Node::new("b", NodeKind::Input, &[]),
                Node::new("g0", NodeKind::And, &["a", "b"]).vulnerable(),
                Node::new("g1", NodeKind::And, &["a", "b"]).vulnerable(),
                Node::new("cmp0", NodeKind::Xor, &["g0", "g1"]),
                Node::new("flag", NodeKind::Output, &["cmp0"]),
            ],
            FaultModel {
                n_e,
                n_c: 0,
                fault_type: FaultType::BitFlip,
                vulnerable_types: vec![NodeKind::And],
            },
            Countermeasure::Detection,
        )
        .unwrap()
    }

    #[test]
    fn test_compile_counts() {
        let circuit = duplicated_and(1);
        let compiled = FaultCompiler::new(&circuit).compile().unwrap();
        let stats = compiled.formula.stats();

        assert_eq!(stats.normal_logic, 3 + 3 + 4 + 2);
        assert_eq!(stats.fault_logic, 8);
        assert!(stats.fault_constraints > 0);
        assert_eq!(stats.countermeasure_constraints, 1);
        assert_eq!(compiled.effective_n_e, 1);
        assert_eq!(compiled.flag_var, compiled.variables.node_var("flag"));
        assert_eq!(compiled.formula.num_vars(), compiled.variables.num_vars());
    }

    #[test]
    fn test_fault_bound_override_recompiles() {
        let circuit = duplicated_and(1);
        let compiled = FaultCompiler::new(&circuit)
            .with_fault_bound(Some(2))
            .compile()
            .unwrap();

        assert_eq!(compiled.effective_n_e, 2);
        assert_eq!(compiled.formula.stats().fault_constraints, 0);
        assert!(compiled.variables.ranges().auxiliary.is_empty());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let circuit = duplicated_and(1);
        let first = FaultCompiler::new(&circuit).compile().unwrap();
        let second = FaultCompiler::new(&circuit).compile().unwrap();
        assert_eq!(first.formula, second.formula);
        assert_eq!(first.variables, second.variables);
    }

    #[test]
    fn test_zero_fault_bound_is_rejected() {
        let circuit = duplicated_and(1);
        let err = FaultCompiler::new(&circuit)
            .with_fault_bound(Some(0))
            .compile()
            .unwrap_err();
        match err {
            FormalError::Configuration { stage, node, .. } => {
                assert_eq!(stage, "fault bound");
                assert_eq!(node, None);
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
