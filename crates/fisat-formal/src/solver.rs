//! SAT solver dispatch
//!
//! Two interchangeable backends sit behind [`SatBackend`]: an in-process
//! solver and an external executable driven through DIMACS files. The
//! backend is chosen once from a [`SolverConfig`].

pub mod embedded;
pub mod external;

use crate::cnf::{neg, Formula, Lit};
use crate::compiler::CompiledCircuit;
use crate::dimacs::header_comments;
use crate::variables::VarId;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use embedded::EmbeddedSolver;
pub use external::{parse_result_file, ExternalSolver};

/// Default external solver executable
pub const DEFAULT_EXTERNAL_SOLVER: &str = "minisat";

/// Outcome of a solver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatVerdict {
    Sat,
    Unsat,
    /// No verdict could be obtained (launch failure, timeout, bad output)
    Indeterminate(String),
}

impl fmt::Display for SatVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatVerdict::Sat => write!(f, "SAT"),
            SatVerdict::Unsat => write!(f, "UNSAT"),
            SatVerdict::Indeterminate(reason) => write!(f, "INDETERMINATE ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverResult {
    pub verdict: SatVerdict,
    /// Dense model (`model[var - 1]`), present only for [`SatVerdict::Sat`]
    pub assignment: Option<Vec<Lit>>,
}

impl SolverResult {
    pub fn sat(assignment: Option<Vec<Lit>>) -> Self {
        Self {
            verdict: SatVerdict::Sat,
            assignment,
        }
    }

    pub fn unsat() -> Self {
        Self {
            verdict: SatVerdict::Unsat,
            assignment: None,
        }
    }

    pub fn indeterminate(reason: impl Into<String>) -> Self {
        Self {
            verdict: SatVerdict::Indeterminate(reason.into()),
            assignment: None,
        }
    }

    /// True only for a definite SAT verdict
    pub fn satisfiable(&self) -> bool {
        self.verdict == SatVerdict::Sat
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self.verdict, SatVerdict::Indeterminate(_))
    }

    pub fn model(&self) -> Option<&[Lit]> {
        self.assignment.as_deref()
    }
}

/// A satisfiability backend
pub trait SatBackend {
    fn name(&self) -> &str;

    /// Solve `formula`; failures are reported as indeterminate, never raised
    fn solve(&mut self, formula: &Formula) -> SolverResult;
}

/// Place literals by variable index; variables without a literal stay negative
pub fn dense_model(lits: impl IntoIterator<Item = Lit>, num_vars: VarId) -> Vec<Lit> {
    let mut model: Vec<Lit> = (1..=num_vars).map(neg).collect();
    for lit in lits {
        let index = lit.unsigned_abs() as usize;
        if lit != 0 && index <= model.len() {
            model[index - 1] = lit;
        } else if lit != 0 {
            log::debug!("Ignoring literal {} beyond variable count {}", lit, num_vars);
        }
    }
    model
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings for the external backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConfig {
    pub executable: PathBuf,
    pub timeout: Option<Duration>,
    /// Where to write the clause file; a scratch directory when unset
    pub cnf_path: Option<PathBuf>,
    /// Where the solver writes its result; a scratch directory when unset
    pub result_path: Option<PathBuf>,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXTERNAL_SOLVER),
            timeout: None,
            cnf_path: None,
            result_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SolverConfig {
    #[default]
    Embedded,
    External(ExternalConfig),
}

impl SolverConfig {
    /// Build a backend whose clause file carries the circuit's header comments
    pub fn build_for(&self, compiled: &CompiledCircuit) -> Box<dyn SatBackend> {
        match self {
            SolverConfig::Embedded => Box::new(EmbeddedSolver::new()),
            SolverConfig::External(config) => Box::new(
                ExternalSolver::new(config.clone()).with_comments(header_comments(compiled)),
            ),
        }
    }
}
