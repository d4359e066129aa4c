//! Decoding solver models into fault vectors

use crate::cnf::Lit;
use crate::solver::SolverResult;
use crate::variables::VariableTable;
use fisat_netlist::Countermeasure;
use std::collections::BTreeSet;
use std::fmt;

/// Classification of one solver outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub is_resistant: bool,
    /// Nodes whose fault control signal is active in the model
    pub fault_vector: BTreeSet<String>,
    /// Satisfiable but no model was available
    pub anomalous: bool,
    pub countermeasure: Countermeasure,
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.anomalous {
            return write!(
                f,
                "Circuit status unknown: solver reported SAT without a model"
            );
        }
        if self.is_resistant {
            return write!(f, "Circuit is fault resistant");
        }
        write!(f, "Circuit has vulnerability")?;
        let outcome = match self.countermeasure {
            Countermeasure::Detection => "undetected",
            Countermeasure::Correction => "uncorrected",
        };
        let nodes: Vec<&str> = self.fault_vector.iter().map(String::as_str).collect();
        write!(f, "\nFault vector ({}): {{{}}}", outcome, nodes.join(", "))
    }
}

/// Map a verdict and model onto the circuit's fault control signals
pub fn interpret(
    satisfiable: bool,
    model: Option<&[Lit]>,
    table: &VariableTable,
    countermeasure: Countermeasure,
) -> Interpretation {
    let mut result = Interpretation {
        is_resistant: !satisfiable,
        fault_vector: BTreeSet::new(),
        anomalous: false,
        countermeasure,
    };

    if !satisfiable {
        log::info!("Formula is unsatisfiable: circuit is fault resistant");
        return result;
    }

    let Some(model) = model else {
        log::warn!("Solver reported SAT without a model; fault vector unavailable");
        result.anomalous = true;
        return result;
    };

    for (id, &var) in table.control_vars() {
        // Variables outside the model count as unassigned
        let active = (var as usize)
            .checked_sub(1)
            .and_then(|index| model.get(index))
            .map(|&lit| lit > 0)
            .unwrap_or(false);
        if active {
            result.fault_vector.insert(id.clone());
        }
    }

    log::info!(
        "Formula is satisfiable: {} active fault(s) {:?}",
        result.fault_vector.len(),
        result.fault_vector
    );
    result
}

/// [`interpret`] applied to a [`SolverResult`]
pub fn interpret_result(
    result: &SolverResult,
    table: &VariableTable,
    countermeasure: Countermeasure,
) -> Interpretation {
    interpret(result.satisfiable(), result.model(), table, countermeasure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableAllocator;
    use indexmap::IndexMap;

    fn table() -> VariableTable {
        let mut alloc = VariableAllocator::new();
        alloc.var_for_node("a"); // 1
        alloc.var_for_node("g0"); // 2
        alloc.control_var_for("g0"); // 3
        alloc.faulty_var_for("g0"); // 4
        alloc.var_for_node("g1"); // 5
        alloc.control_var_for("g1"); // 6
        alloc.finish()
    }

    #[test]
    fn test_unsat_is_resistant() {
        let result = interpret(false, None, &table(), Countermeasure::Detection);
        assert!(result.is_resistant);
        assert!(result.fault_vector.is_empty());
        assert!(!result.anomalous);
        assert_eq!(result.to_string(), "Circuit is fault resistant");
    }

    #[test]
    fn test_sat_extracts_active_controls() {
        let model = [1, 2, 3, -4, 5, -6];
        let result = interpret(true, Some(&model), &table(), Countermeasure::Detection);
        assert!(!result.is_resistant);
        assert_eq!(result.fault_vector, BTreeSet::from(["g0".to_string()]));
        assert_eq!(
            result.to_string(),
            "Circuit has vulnerability\nFault vector (undetected): {g0}"
        );
    }

    #[test]
    fn test_short_model_counts_as_unassigned() {
        let model = [1, 2, 3];
        let result = interpret(true, Some(&model), &table(), Countermeasure::Correction);
        assert_eq!(result.fault_vector, BTreeSet::from(["g0".to_string()]));
    }

    #[test]
    fn test_sat_without_model_is_anomalous() {
        let result = interpret(true, None, &table(), Countermeasure::Detection);
        assert!(!result.is_resistant);
        assert!(result.anomalous);
        assert!(result.fault_vector.is_empty());
        assert_eq!(
            result.to_string(),
            "Circuit status unknown: solver reported SAT without a model"
        );
        assert!(!result.to_string().contains("vulnerability"));
    }

    #[test]
    fn test_out_of_range_control_ids_are_inactive() {
        let table = VariableTable::from_mappings(
            IndexMap::from([("a".to_string(), 1)]),
            IndexMap::from([("g0".to_string(), 0), ("g1".to_string(), 2)]),
            IndexMap::new(),
        );
        let model = [1, 2];
        let result = interpret(true, Some(&model), &table, Countermeasure::Detection);
        assert_eq!(result.fault_vector, BTreeSet::from(["g1".to_string()]));
    }

    #[test]
    fn test_indeterminate_reads_as_unsatisfiable() {
        let result = interpret_result(
            &SolverResult::indeterminate("timeout"),
            &table(),
            Countermeasure::Detection,
        );
        assert!(result.is_resistant);
    }
}
