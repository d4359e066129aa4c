//! DIMACS CNF reading and writing

use crate::cnf::{ClauseCategory, Formula, Lit};
use crate::compiler::CompiledCircuit;
use crate::variables::VarId;
use crate::{FormalError, FormalResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A parsed DIMACS problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimacsProblem {
    pub num_vars: VarId,
    pub clauses: Vec<Vec<Lit>>,
}

/// Header comments describing a compiled circuit
pub fn header_comments(compiled: &CompiledCircuit) -> Vec<String> {
    let stats = compiled.formula.stats();
    let mut comments = vec![
        format!("Generated by fisat for circuit {}", compiled.circuit_name),
        format!(
            "countermeasure: {}, fault type: {}, n_e: {}",
            compiled.countermeasure, compiled.fault_type, compiled.effective_n_e
        ),
    ];
    comments.extend(
        ClauseCategory::ALL
            .iter()
            .map(|&category| format!("{}: {}", category.as_str(), stats.get(category))),
    );
    comments
}

/// Write `formula` in DIMACS format, preceded by `comments`
pub fn write_dimacs<W: Write>(
    writer: &mut W,
    formula: &Formula,
    comments: &[String],
) -> FormalResult<()> {
    for comment in comments {
        writeln!(writer, "c {}", comment)?;
    }
    writeln!(writer, "p cnf {} {}", formula.num_vars(), formula.len())?;
    for clause in formula.clauses() {
        writeln!(writer, "{}", clause)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn to_dimacs_string(formula: &Formula, comments: &[String]) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_dimacs(&mut buffer, formula, comments);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Write a DIMACS file, creating parent directories as needed
pub fn write_dimacs_file(path: &Path, formula: &Formula, comments: &[String]) -> FormalResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_dimacs(&mut writer, formula, comments)?;
    writer.flush()?;
    log::info!("CNF written to {}", path.display());
    Ok(())
}

/// Read a DIMACS file back and check it encodes exactly `formula`
pub fn verify_dimacs_file(path: &Path, formula: &Formula) -> FormalResult<()> {
    let text = std::fs::read_to_string(path)?;
    let problem = parse_dimacs(&text)?;
    if problem.num_vars != formula.num_vars() {
        return Err(FormalError::Dimacs(format!(
            "{} declares {} variables, formula has {}",
            path.display(),
            problem.num_vars,
            formula.num_vars()
        )));
    }
    let mismatch = problem.clauses.len() != formula.len()
        || problem
            .clauses
            .iter()
            .zip(formula.clauses())
            .any(|(read, clause)| read.as_slice() != clause.lits());
    if mismatch {
        return Err(FormalError::Dimacs(format!(
            "{} does not match the compiled clauses",
            path.display()
        )));
    }
    log::debug!("Verified {} ({} clauses)", path.display(), formula.len());
    Ok(())
}

/// Parse DIMACS text
///
/// Comment lines may appear anywhere and clauses may span lines. The
/// header counts are checked against the body.
pub fn parse_dimacs(text: &str) -> FormalResult<DimacsProblem> {
    let mut header: Option<(VarId, usize)> = None;
    let mut clauses = Vec::new();
    let mut current: Vec<Lit> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') || line.starts_with('%') {
            continue;
        }

        if line.starts_with('p') {
            if header.is_some() {
                return Err(FormalError::Dimacs(format!(
                    "line {}: duplicate problem line",
                    line_no + 1
                )));
            }
            header = Some(parse_header(line, line_no + 1)?);
            continue;
        }

        if header.is_none() {
            return Err(FormalError::Dimacs(format!(
                "line {}: clause before problem line",
                line_no + 1
            )));
        }

        for token in line.split_whitespace() {
            let lit: Lit = token.parse().map_err(|_| {
                FormalError::Dimacs(format!("line {}: invalid literal '{}'", line_no + 1, token))
            })?;
            if lit == 0 {
                clauses.push(std::mem::take(&mut current));
            } else {
                current.push(lit);
            }
        }
    }

    let (num_vars, num_clauses) =
        header.ok_or_else(|| FormalError::Dimacs("missing problem line".to_string()))?;
    if !current.is_empty() {
        return Err(FormalError::Dimacs(
            "last clause is not terminated by 0".to_string(),
        ));
    }
    if clauses.len() != num_clauses {
        return Err(FormalError::Dimacs(format!(
            "header declares {} clauses, found {}",
            num_clauses,
            clauses.len()
        )));
    }
    if let Some(lit) = clauses
        .iter()
        .flatten()
        .find(|lit| lit.unsigned_abs() > num_vars)
    {
        return Err(FormalError::Dimacs(format!(
            "literal {} exceeds declared variable count {}",
            lit, num_vars
        )));
    }

    Ok(DimacsProblem { num_vars, clauses })
}

fn parse_header(line: &str, line_no: usize) -> FormalResult<(VarId, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        ["p", "cnf", vars, clauses] => {
            let vars = vars.parse().map_err(|_| {
                FormalError::Dimacs(format!("line {}: invalid variable count", line_no))
            })?;
            let clauses = clauses.parse().map_err(|_| {
                FormalError::Dimacs(format!("line {}: invalid clause count", line_no))
            })?;
            Ok((vars, clauses))
        }
        _ => Err(FormalError::Dimacs(format!(
            "line {}: malformed problem line '{}'",
            line_no, line
        ))),
    }
}
