//! Fault-count bound and countermeasure conditions

use crate::cardinality::{at_least, at_most};
use crate::cnf::{neg, pos, ClauseCategory, Formula, Lit};
use crate::variables::{VarId, VariableAllocator};
use crate::{FormalError, FormalResult};
use fisat_netlist::{Circuit, Countermeasure, NodeKind, FLAG_NODE};

/// Bound the number of active control signals
///
/// Returns the effective bound after clamping to the number of control
/// variables.
pub fn encode_fault_bound(
    alloc: &mut VariableAllocator,
    formula: &mut Formula,
    n_e: u32,
) -> u32 {
    let controls: Vec<Lit> = alloc.control_vars().values().map(|&v| pos(v)).collect();
    let available = controls.len();

    let effective = if n_e as usize > available {
        log::warn!(
            "Fault bound n_e={} exceeds the {} available control variables; clamping to {}",
            n_e,
            available,
            available
        );
        available as u32
    } else {
        n_e
    };

    if (effective as usize) < available {
        let lower = at_least(&controls, 1, alloc);
        let upper = at_most(&controls, effective as usize, alloc);
        log::debug!(
            "Fault bound: {} at-least-1 clauses, {} at-most-{} clauses",
            lower.len(),
            upper.len(),
            effective
        );
        formula.extend(ClauseCategory::FaultConstraints, lower);
        formula.extend(ClauseCategory::FaultConstraints, upper);
    } else {
        log::warn!(
            "Fault bound n_e={} covers every control variable; no cardinality constraint emitted and fault-free paths stay admissible",
            effective
        );
    }

    effective
}

/// Emit the clause turning a defeated countermeasure into satisfiability
///
/// Returns the flag variable for detection.
pub fn encode_countermeasure(
    circuit: &Circuit,
    alloc: &mut VariableAllocator,
    formula: &mut Formula,
) -> FormalResult<Option<VarId>> {
    match circuit.countermeasure {
        Countermeasure::Detection => {
            let flag = circuit
                .node(FLAG_NODE)
                .filter(|node| node.kind == NodeKind::Output)
                .ok_or_else(|| {
                    FormalError::configuration(
                        "countermeasure",
                        FLAG_NODE,
                        "Detection countermeasure requires an output node named 'flag'",
                    )
                })?;
            if flag.inputs.is_empty() {
                return Err(FormalError::configuration(
                    "countermeasure",
                    FLAG_NODE,
                    "Flag output has no input",
                ));
            }

            let var = alloc.lookup_node(FLAG_NODE).ok_or_else(|| {
                FormalError::configuration(
                    "countermeasure",
                    FLAG_NODE,
                    "Flag output was not encoded",
                )
            })?;
            // The flag stays low: the fault goes undetected
            formula.add_clause(ClauseCategory::CountermeasureConstraints, vec![neg(var)]);
            log::info!("Detection flag variable: {}", var);
            Ok(Some(var))
        }
        Countermeasure::Correction => {
            log::warn!(
                "Correction countermeasure adds no constraint; any admissible fault placement is reported"
            );
            Ok(None)
        }
    }
}
