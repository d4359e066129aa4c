//! In-process backend on varisat

use super::{dense_model, SatBackend, SolverResult};
use crate::cnf::{Formula, Lit};
use varisat::{CnfFormula, ExtendFormula, Solver};

#[derive(Debug, Default)]
pub struct EmbeddedSolver;

impl EmbeddedSolver {
    pub fn new() -> Self {
        Self
    }
}

fn to_varisat(formula: &Formula) -> CnfFormula {
    let mut cnf = CnfFormula::new();
    cnf.set_var_count(formula.num_vars() as usize);
    for clause in formula.clauses() {
        let lits: Vec<varisat::Lit> = clause
            .lits()
            .iter()
            .map(|&lit| varisat::Lit::from_dimacs(lit as isize))
            .collect();
        cnf.add_clause(&lits);
    }
    cnf
}

impl SatBackend for EmbeddedSolver {
    fn name(&self) -> &str {
        "embedded"
    }

    fn solve(&mut self, formula: &Formula) -> SolverResult {
        let start = std::time::Instant::now();
        let mut solver = Solver::new();
        solver.add_formula(&to_varisat(formula));

        let result = match solver.solve() {
            Ok(true) => {
                let model = solver.model().map(|lits| {
                    dense_model(
                        lits.iter().map(|lit| lit.to_dimacs() as Lit),
                        formula.num_vars(),
                    )
                });
                SolverResult::sat(model)
            }
            Ok(false) => SolverResult::unsat(),
            Err(e) => {
                log::warn!("Embedded SAT solver failed: {}", e);
                SolverResult::indeterminate(format!("SAT solver error: {}", e))
            }
        };

        log::info!(
            "Embedded solver finished in {} ms: {}",
            start.elapsed().as_millis(),
            result.verdict
        );
        result
    }
}
