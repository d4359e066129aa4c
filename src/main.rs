use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fisat_formal::dimacs::header_comments;
use fisat_formal::solver::parse_result_file;
use fisat_formal::{
    analyze, interpret_result, write_dimacs_file, CompiledCircuit, ExternalConfig, Interpretation,
    SolverConfig, SolverResult, VariableMap, DEFAULT_EXTERNAL_SOLVER,
};
use fisat_netlist::{load_circuit, CircuitOverrides, Countermeasure, FaultType};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// fisat - Fault-injection resistance checking via SAT
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a circuit for fault-injection vulnerabilities
    Check {
        /// Circuit description (JSON)
        circuit: PathBuf,

        /// Maximum number of simultaneous faults (overrides the description)
        #[arg(long = "n-e")]
        n_e: Option<u32>,

        /// Fault type: bit-flip, set or reset (overrides the description)
        #[arg(long)]
        fault_type: Option<FaultType>,

        /// Countermeasure: detection or correction (overrides the description)
        #[arg(long)]
        countermeasure: Option<Countermeasure>,

        /// Use an external DIMACS solver instead of the embedded one
        #[arg(long)]
        external: bool,

        /// External solver executable
        #[arg(long, env = "FISAT_SOLVER", default_value = DEFAULT_EXTERNAL_SOLVER)]
        solver_path: PathBuf,

        /// External solver timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output directory for the CNF, variable map and solver result
        #[arg(short, long, default_value = "outputs")]
        output: PathBuf,

        /// Do not write any output files
        #[arg(long)]
        no_write: bool,
    },

    /// Decode an external solver result against a saved variable map
    Decode {
        /// Variable map written by `check`
        variable_map: PathBuf,

        /// Solver result file
        result: PathBuf,

        /// Countermeasure the circuit was checked against
        #[arg(long, default_value = "detection")]
        countermeasure: Countermeasure,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let conclusive = match cli.command {
        Commands::Check {
            circuit,
            n_e,
            fault_type,
            countermeasure,
            external,
            solver_path,
            timeout,
            output,
            no_write,
        } => {
            let overrides = CircuitOverrides {
                n_e,
                fault_type,
                countermeasure,
            };
            let solver = external.then(|| ExternalConfig {
                executable: solver_path,
                timeout: timeout.map(Duration::from_secs),
                ..ExternalConfig::default()
            });
            let output_dir = (!no_write).then_some(output);
            check_circuit(&circuit, &overrides, solver, output_dir.as_deref())?
        }

        Commands::Decode {
            variable_map,
            result,
            countermeasure,
        } => decode_result(&variable_map, &result, countermeasure)?,
    };

    if !conclusive {
        std::process::exit(1);
    }
    Ok(())
}

/// Run the full pipeline; returns whether a definite verdict was reached
fn check_circuit(
    path: &Path,
    overrides: &CircuitOverrides,
    external: Option<ExternalConfig>,
    output_dir: Option<&Path>,
) -> Result<bool> {
    info!("Checking circuit {:?}", path);

    let circuit = load_circuit(path, overrides)
        .with_context(|| format!("Failed to load circuit {}", path.display()))?;

    let solver = match external {
        Some(mut config) => {
            if let Some(dir) = output_dir {
                config.cnf_path = Some(dir.join(format!("{}.cnf", circuit.name)));
                config.result_path = Some(dir.join(format!("{}.out", circuit.name)));
            }
            SolverConfig::External(config)
        }
        None => SolverConfig::Embedded,
    };

    let start = Instant::now();
    let report = analyze(&circuit, None, &solver)
        .with_context(|| format!("Failed to analyze circuit {}", circuit.name))?;
    info!(
        "Analyzed {} clauses over {} variables in {} ms",
        report.compiled.formula.len(),
        report.compiled.formula.num_vars(),
        start.elapsed().as_millis()
    );

    if let Some(dir) = output_dir {
        write_outputs(&report.compiled, dir, matches!(solver, SolverConfig::Embedded))?;
    }

    report_verdict(&report.compiled.circuit_name, &report.result, &report.interpretation);
    Ok(report.is_conclusive())
}

/// Write the variable map and, unless the external solver writes it, the CNF
fn write_outputs(compiled: &CompiledCircuit, dir: &Path, write_cnf: bool) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let map_path = dir.join(format!("{}_variable_map.json", compiled.circuit_name));
    VariableMap::from_table(&compiled.variables)
        .write_json(&map_path)
        .with_context(|| format!("Failed to write variable map {}", map_path.display()))?;

    if write_cnf {
        let cnf_path = dir.join(format!("{}.cnf", compiled.circuit_name));
        write_dimacs_file(&cnf_path, &compiled.formula, &header_comments(compiled))
            .with_context(|| format!("Failed to write CNF {}", cnf_path.display()))?;
    }
    Ok(())
}

fn decode_result(map_path: &Path, result_path: &Path, countermeasure: Countermeasure) -> Result<bool> {
    let map = VariableMap::read_json(map_path)
        .with_context(|| format!("Failed to read variable map {}", map_path.display()))?;
    let table = map.to_table().context("Invalid variable map")?;

    let text = fs::read_to_string(result_path)
        .with_context(|| format!("Failed to read solver result {}", result_path.display()))?;
    let result = match parse_result_file(&text, table.num_vars()) {
        Ok(result) => result,
        Err(e) => {
            warn!("Cannot decode {}: {}", result_path.display(), e);
            SolverResult::indeterminate(e.to_string())
        }
    };

    let interpretation = interpret_result(&result, &table, countermeasure);
    let name = result_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    report_verdict(&name, &result, &interpretation);
    Ok(!result.is_indeterminate() && !interpretation.anomalous)
}

fn report_verdict(name: &str, result: &SolverResult, interpretation: &Interpretation) {
    println!("Circuit: {}", name);
    println!("Solver verdict: {}", result.verdict);
    if result.is_indeterminate() {
        println!("No verdict could be reached");
        return;
    }
    println!("{}", interpretation);
}
