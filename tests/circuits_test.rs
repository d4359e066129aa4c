//! End-to-end runs over the sample circuits in `circuits/`

use fisat_formal::{analyze, AnalysisReport, SolverConfig};
use fisat_netlist::{load_circuit, CircuitOverrides, FaultType};
use std::collections::BTreeSet;
use std::path::PathBuf;

fn circuit_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("circuits")
        .join(format!("{}.json", name))
}

fn run(name: &str, overrides: CircuitOverrides) -> AnalysisReport {
    let circuit = load_circuit(&circuit_path(name), &overrides).unwrap();
    let report = analyze(&circuit, None, &SolverConfig::Embedded).unwrap();
    assert!(report.is_conclusive());
    report
}

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_xor_cipher_resists_single_fault() {
    let report = run("xor_cipher", CircuitOverrides::default());
    assert_eq!(report.compiled.circuit_name, "xor_cipher");
    assert!(report.interpretation.is_resistant);
    assert_eq!(
        report.interpretation.to_string(),
        "Circuit is fault resistant"
    );
}

#[test]
fn test_xor_cipher_two_faults_hit_both_copies() {
    let report = run(
        "xor_cipher",
        CircuitOverrides {
            n_e: Some(2),
            ..Default::default()
        },
    );
    assert_eq!(report.compiled.effective_n_e, 2);
    assert!(!report.interpretation.is_resistant);

    let vector = &report.interpretation.fault_vector;
    assert!(
        *vector == set(&["c0", "d0"]) || *vector == set(&["c1", "d1"]),
        "unexpected fault vector {:?}",
        vector
    );
}

#[test]
fn test_xor_cipher_set_fault_can_be_ineffective() {
    let report = run(
        "xor_cipher",
        CircuitOverrides {
            fault_type: Some(FaultType::Set),
            ..Default::default()
        },
    );
    assert!(!report.interpretation.is_resistant);
    assert_eq!(report.interpretation.fault_vector.len(), 1);
}

#[test]
fn test_mux_select_under_set_faults() {
    let report = run("mux_select", CircuitOverrides::default());
    assert!(!report.interpretation.is_resistant);
    let vector = &report.interpretation.fault_vector;
    assert!(*vector == set(&["m0"]) || *vector == set(&["m1"]));
}

#[test]
fn test_mux_select_resists_single_bit_flip() {
    let report = run(
        "mux_select",
        CircuitOverrides {
            fault_type: Some(FaultType::BitFlip),
            ..Default::default()
        },
    );
    assert!(report.interpretation.is_resistant);
}

#[test]
fn test_lfsr_correction_reports_single_fault() {
    let report = run("lfsr", CircuitOverrides::default());
    assert_eq!(report.compiled.flag_var, None);
    assert_eq!(report.compiled.formula.stats().countermeasure_constraints, 0);
    assert!(!report.interpretation.is_resistant);
    assert_eq!(report.interpretation.fault_vector.len(), 1);
    assert!(report
        .interpretation
        .fault_vector
        .is_subset(&set(&["fb", "r0", "r1"])));
}

#[test]
fn test_zero_fault_bound_override_is_rejected() {
    let err = load_circuit(
        &circuit_path("lfsr"),
        &CircuitOverrides {
            n_e: Some(0),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains('0'));
}
