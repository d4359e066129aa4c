//! External solver driven through DIMACS files
//!
//! The executable is invoked as `<solver> <clause-file> <result-file>`.
//! The result file starts with `SAT` or `UNSAT`; a satisfiable result is
//! followed by the model as literals terminated by `0`. Exit codes are only
//! logged since MiniSat-style solvers exit with 10/20.

use super::{dense_model, ExternalConfig, SatBackend, SolverResult};
use crate::cnf::{Formula, Lit};
use crate::dimacs::{verify_dimacs_file, write_dimacs_file};
use crate::variables::VarId;
use crate::{FormalError, FormalResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use wait_timeout::ChildExt;

pub struct ExternalSolver {
    config: ExternalConfig,
    comments: Vec<String>,
}

impl ExternalSolver {
    pub fn new(config: ExternalConfig) -> Self {
        Self {
            config,
            comments: vec!["Generated by fisat".to_string()],
        }
    }

    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    fn run(&self, formula: &Formula) -> FormalResult<SolverResult> {
        // Held until the end of the run so scratch files outlive the child
        let scratch = match (&self.config.cnf_path, &self.config.result_path) {
            (Some(_), Some(_)) => None,
            _ => Some(tempfile::tempdir()?),
        };
        let scratch_path = |name: &str| -> PathBuf {
            scratch
                .as_ref()
                .map(|dir| dir.path().join(name))
                .unwrap_or_else(|| PathBuf::from(name))
        };
        let cnf_path = self
            .config
            .cnf_path
            .clone()
            .unwrap_or_else(|| scratch_path("formula.cnf"));
        let result_path = self
            .config
            .result_path
            .clone()
            .unwrap_or_else(|| scratch_path("result.out"));

        write_dimacs_file(&cnf_path, formula, &self.comments)?;
        verify_dimacs_file(&cnf_path, formula)?;
        if result_path.exists() {
            std::fs::remove_file(&result_path)?;
        }

        if let Some(status) = self.launch(&cnf_path, &result_path)? {
            return Ok(status);
        }

        let text = std::fs::read_to_string(&result_path).map_err(|e| {
            FormalError::Decoding(format!(
                "cannot read result file {}: {}",
                result_path.display(),
                e
            ))
        })?;
        parse_result_file(&text, formula.num_vars())
    }

    /// Run the executable; returns a result only when it was cut short
    fn launch(&self, cnf_path: &Path, result_path: &Path) -> FormalResult<Option<SolverResult>> {
        let executable = &self.config.executable;
        log::info!(
            "Running external solver {} on {}",
            executable.display(),
            cnf_path.display()
        );
        let start = Instant::now();

        let mut child = Command::new(executable)
            .arg(cnf_path)
            .arg(result_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                FormalError::SolverUnavailable(format!(
                    "failed to launch {}: {}",
                    executable.display(),
                    e
                ))
            })?;

        let status = match self.config.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::warn!(
                        "External solver timed out after {:.1} s",
                        timeout.as_secs_f64()
                    );
                    return Ok(Some(SolverResult::indeterminate(format!(
                        "solver timed out after {:.1} s",
                        timeout.as_secs_f64()
                    ))));
                }
            },
            None => child.wait()?,
        };

        log::info!(
            "External solver exited with {} after {} ms",
            status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            start.elapsed().as_millis()
        );
        Ok(None)
    }
}

impl SatBackend for ExternalSolver {
    fn name(&self) -> &str {
        "external"
    }

    fn solve(&mut self, formula: &Formula) -> SolverResult {
        match self.run(formula) {
            Ok(result) => {
                log::info!("External solver verdict: {}", result.verdict);
                result
            }
            Err(e) => {
                log::warn!("External solver gave no verdict: {}", e);
                SolverResult::indeterminate(e.to_string())
            }
        }
    }
}

/// Parse a MiniSat-style result file
///
/// The model is normalized to a dense list over `num_vars` variables.
pub fn parse_result_file(text: &str, num_vars: VarId) -> FormalResult<SolverResult> {
    let mut tokens = text.split_whitespace();
    match tokens.next() {
        Some("UNSAT") => Ok(SolverResult::unsat()),
        Some("SAT") => {
            let mut lits = Vec::new();
            let mut terminated = false;
            for token in tokens {
                let lit: Lit = token.parse().map_err(|_| {
                    FormalError::Decoding(format!("invalid literal '{}' in result file", token))
                })?;
                if lit == 0 {
                    terminated = true;
                    break;
                }
                lits.push(lit);
            }

            if lits.is_empty() && !terminated {
                return Ok(SolverResult::sat(None));
            }
            if !terminated {
                return Err(FormalError::Decoding(
                    "model line is not terminated by 0".to_string(),
                ));
            }
            Ok(SolverResult::sat(Some(dense_model(lits, num_vars))))
        }
        Some("INDET") => Ok(SolverResult::indeterminate("solver reported INDET")),
        Some(other) => Err(FormalError::Decoding(format!(
            "unexpected status '{}' in result file",
            other
        ))),
        None => Err(FormalError::Decoding("empty result file".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::ClauseCategory;
    use crate::solver::SatVerdict;

    fn formula() -> Formula {
        let mut formula = Formula::new();
        formula.add_clause(ClauseCategory::NormalLogic, vec![1, 2]);
        formula.add_clause(ClauseCategory::NormalLogic, vec![-1]);
        formula
    }

    #[test]
    fn test_parse_sat() {
        let result = parse_result_file("SAT\n-1 2 0\n", 3).unwrap();
        assert_eq!(result.verdict, SatVerdict::Sat);
        assert_eq!(result.model(), Some(&[-1, 2, -3][..]));
    }

    #[test]
    fn test_parse_unsat() {
        assert_eq!(parse_result_file("UNSAT\n", 3).unwrap(), SolverResult::unsat());
    }

    #[test]
    fn test_parse_sat_without_model() {
        let result = parse_result_file("SAT\n", 2).unwrap();
        assert!(result.satisfiable());
        assert!(result.model().is_none());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_result_file("", 1).is_err());
        assert!(parse_result_file("MAYBE\n", 1).is_err());
        assert!(parse_result_file("SAT\n1 x 0\n", 1).is_err());
        assert!(parse_result_file("SAT\n1 -2\n", 2).is_err());
        assert!(parse_result_file("INDET\n", 1).unwrap().is_indeterminate());
    }

    #[test]
    fn test_missing_executable_is_indeterminate() {
        let config = ExternalConfig {
            executable: PathBuf::from("/nonexistent/fisat-test-solver"),
            ..ExternalConfig::default()
        };
        let result = ExternalSolver::new(config).solve(&formula());
        assert!(result.is_indeterminate());
        assert!(result.assignment.is_none());
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("solver.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_script_solver_result_file_is_authoritative() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "printf 'SAT\\n-1 2 0\\n' > \"$2\"\nexit 10");
        let cnf_path = dir.path().join("out").join("f.cnf");
        let config = ExternalConfig {
            executable: exe,
            timeout: Some(std::time::Duration::from_secs(30)),
            cnf_path: Some(cnf_path.clone()),
            result_path: Some(dir.path().join("out").join("f.out")),
        };

        let result = ExternalSolver::new(config).solve(&formula());
        assert_eq!(result.verdict, SatVerdict::Sat);
        assert_eq!(result.model(), Some(&[-1, 2][..]));

        let cnf = std::fs::read_to_string(cnf_path).unwrap();
        assert!(cnf.contains("p cnf 2 2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_result_file_is_indeterminate() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "exit 0");
        let config = ExternalConfig {
            executable: exe,
            ..ExternalConfig::default()
        };
        assert!(ExternalSolver::new(config).solve(&formula()).is_indeterminate());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_solver() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "sleep 10");
        let config = ExternalConfig {
            executable: exe,
            timeout: Some(std::time::Duration::from_millis(200)),
            ..ExternalConfig::default()
        };

        let start = Instant::now();
        let result = ExternalSolver::new(config).solve(&formula());
        assert!(result.is_indeterminate());
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }
}
