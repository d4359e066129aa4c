//! CNF clause and formula types
//!
//! Literals use DIMACS numbering: a positive integer is the variable, a
//! negative integer its negation. Zero never appears inside a clause.

use crate::variables::VarId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed DIMACS literal
pub type Lit = i32;

/// Positive literal of a variable
pub fn pos(var: VarId) -> Lit {
    var as Lit
}

/// Negative literal of a variable
pub fn neg(var: VarId) -> Lit {
    -(var as Lit)
}

/// Variable referenced by a literal
pub fn var_of(lit: Lit) -> VarId {
    lit.unsigned_abs()
}

/// A disjunction of literals
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause(Vec<Lit>);

impl Clause {
    pub fn new(lits: Vec<Lit>) -> Self {
        debug_assert!(lits.iter().all(|&l| l != 0), "literal 0 inside clause");
        Self(lits)
    }

    pub fn lits(&self) -> &[Lit] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluate under an assignment indexed by variable (`value(var)`)
    pub fn is_satisfied_by(&self, value: impl Fn(VarId) -> bool) -> bool {
        self.0
            .iter()
            .any(|&lit| value(var_of(lit)) == (lit > 0))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lit in &self.0 {
            write!(f, "{} ", lit)?;
        }
        write!(f, "0")
    }
}

// ============================================================================
// Categories
// ============================================================================

/// Which part of the encoding produced a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseCategory {
    /// Functional (golden) gate semantics
    NormalLogic,
    /// Golden/control/faulty linkage at vulnerable nodes
    FaultLogic,
    /// Cardinality bounds over control variables
    FaultConstraints,
    /// Countermeasure pass/fail condition
    CountermeasureConstraints,
}

impl ClauseCategory {
    pub const ALL: [ClauseCategory; 4] = [
        ClauseCategory::NormalLogic,
        ClauseCategory::FaultLogic,
        ClauseCategory::FaultConstraints,
        ClauseCategory::CountermeasureConstraints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseCategory::NormalLogic => "normal_logic",
            ClauseCategory::FaultLogic => "fault_logic",
            ClauseCategory::FaultConstraints => "fault_constraints",
            ClauseCategory::CountermeasureConstraints => "countermeasure_constraints",
        }
    }
}

/// Clause counts per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseStats {
    pub normal_logic: usize,
    pub fault_logic: usize,
    pub fault_constraints: usize,
    pub countermeasure_constraints: usize,
}

impl ClauseStats {
    pub fn get(&self, category: ClauseCategory) -> usize {
        match category {
            ClauseCategory::NormalLogic => self.normal_logic,
            ClauseCategory::FaultLogic => self.fault_logic,
            ClauseCategory::FaultConstraints => self.fault_constraints,
            ClauseCategory::CountermeasureConstraints => self.countermeasure_constraints,
        }
    }

    fn bump(&mut self, category: ClauseCategory) {
        match category {
            ClauseCategory::NormalLogic => self.normal_logic += 1,
            ClauseCategory::FaultLogic => self.fault_logic += 1,
            ClauseCategory::FaultConstraints => self.fault_constraints += 1,
            ClauseCategory::CountermeasureConstraints => self.countermeasure_constraints += 1,
        }
    }

    pub fn total(&self) -> usize {
        ClauseCategory::ALL.iter().map(|&c| self.get(c)).sum()
    }
}

// ============================================================================
// Formula
// ============================================================================

/// A CNF formula with per-category bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formula {
    clauses: Vec<Clause>,
    stats: ClauseStats,
    num_vars: VarId,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clause(&mut self, category: ClauseCategory, lits: Vec<Lit>) {
        for &lit in &lits {
            self.num_vars = self.num_vars.max(var_of(lit));
        }
        self.stats.bump(category);
        self.clauses.push(Clause::new(lits));
    }

    pub fn extend<I>(&mut self, category: ClauseCategory, clauses: I)
    where
        I: IntoIterator<Item = Vec<Lit>>,
    {
        for lits in clauses {
            self.add_clause(category, lits);
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn stats(&self) -> &ClauseStats {
        &self.stats
    }

    /// Declared variable count (at least the largest referenced variable)
    pub fn num_vars(&self) -> VarId {
        self.num_vars
    }

    /// Raise the declared variable count, e.g. to cover unconstrained inputs
    pub fn declare_vars(&mut self, num_vars: VarId) {
        self.num_vars = self.num_vars.max(num_vars);
    }

    /// Evaluate under a full assignment (`assignment[var - 1]`)
    pub fn is_satisfied_by(&self, assignment: &[bool]) -> bool {
        let value = |var: VarId| {
            assignment
                .get(var as usize - 1)
                .copied()
                .unwrap_or(false)
        };
        self.clauses.iter().all(|c| c.is_satisfied_by(&value))
    }

    pub fn log_summary(&self) {
        log::info!(
            "Variable count: {}, Clause count: {}",
            self.num_vars,
            self.clauses.len()
        );
        log::info!("Clause type statistics:");
        for category in ClauseCategory::ALL {
            log::info!("  - {}: {}", category.as_str(), self.stats.get(category));
        }
    }
}
