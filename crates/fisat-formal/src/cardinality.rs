//! Cardinality constraints over literals
//!
//! At-most-k uses the sequential counter encoding (Sinz, 2005): register
//! `s[i][j]` is true when at least `j + 1` of the first `i + 1` literals
//! hold. At-least-k is expressed as at-most-(n - k) over the negations.
//! Register variables come from the shared allocator so they never collide
//! with node, control or faulty ids.

use crate::cnf::{neg, pos, Lit};
use crate::variables::VariableAllocator;

/// Clauses forcing at most `k` of `lits` to be true
pub fn at_most(lits: &[Lit], k: usize, alloc: &mut VariableAllocator) -> Vec<Vec<Lit>> {
    let n = lits.len();
    if k >= n {
        return Vec::new();
    }
    if k == 0 {
        return lits.iter().map(|&lit| vec![-lit]).collect();
    }

    // s[i][j] for i in 0..n-1, j in 0..k
    let registers: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| pos(alloc.fresh_auxiliary())).collect())
        .collect();
    let s = |i: usize, j: usize| registers[i][j];

    let mut clauses = Vec::with_capacity(2 * n * k + n);

    clauses.push(vec![-lits[0], s(0, 0)]);
    for j in 1..k {
        clauses.push(vec![-s(0, j)]);
    }

    for i in 1..n - 1 {
        let x = lits[i];
        clauses.push(vec![-x, s(i, 0)]);
        clauses.push(vec![-s(i - 1, 0), s(i, 0)]);
        for j in 1..k {
            clauses.push(vec![-x, -s(i - 1, j - 1), s(i, j)]);
            clauses.push(vec![-s(i - 1, j), s(i, j)]);
        }
        clauses.push(vec![-x, -s(i - 1, k - 1)]);
    }

    clauses.push(vec![-lits[n - 1], -s(n - 2, k - 1)]);
    clauses
}

/// Clauses forcing at least `k` of `lits` to be true
///
/// An unreachable bound (`k > n`) yields a contradiction over a fresh
/// auxiliary variable so the formula stays well formed.
pub fn at_least(lits: &[Lit], k: usize, alloc: &mut VariableAllocator) -> Vec<Vec<Lit>> {
    let n = lits.len();
    if k == 0 {
        return Vec::new();
    }
    if k > n {
        let a = alloc.fresh_auxiliary();
        return vec![vec![pos(a)], vec![neg(a)]];
    }
    if k == 1 {
        return vec![lits.to_vec()];
    }
    let negated: Vec<Lit> = lits.iter().map(|&lit| -lit).collect();
    at_most(&negated, n - k, alloc)
}
