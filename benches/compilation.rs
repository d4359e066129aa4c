//! Compilation and solving benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fisat_formal::solver::EmbeddedSolver;
use fisat_formal::{FaultCompiler, SatBackend};
use fisat_netlist::{
    Circuit, CircuitDescription, Countermeasure, FaultModel, FaultType, Node, NodeKind,
};
use std::time::Duration;

fn sample_circuits() -> Vec<(&'static str, Circuit)> {
    vec![
        ("xor_cipher", include_str!("../circuits/xor_cipher.json")),
        ("mux_select", include_str!("../circuits/mux_select.json")),
        ("lfsr", include_str!("../circuits/lfsr.json")),
    ]
    .into_iter()
    .map(|(name, json)| {
        let circuit = CircuitDescription::from_json_str(json)
            .and_then(|d| d.validate(name))
            .unwrap();
        (name, circuit)
    })
    .collect()
}

/// `width` duplicated xor lanes checked by per-lane comparators
fn duplicated_lanes(width: usize, n_e: u32) -> Circuit {
    let mut nodes = Vec::new();
    let mut compares = Vec::new();
    for i in 0..width {
        let (p, k) = (format!("p{}", i), format!("k{}", i));
        let (c, d, cmp) = (format!("c{}", i), format!("d{}", i), format!("cmp{}", i));
        nodes.push(Node::new(p.as_str(), NodeKind::Input, &[]));
        nodes.push(Node::new(k.as_str(), NodeKind::Input, &[]));
        nodes.push(Node::new(c.as_str(), NodeKind::Xor, &[p.as_str(), k.as_str()]).vulnerable());
        nodes.push(Node::new(d.as_str(), NodeKind::Xor, &[p.as_str(), k.as_str()]).vulnerable());
        nodes.push(Node::new(cmp.as_str(), NodeKind::Xor, &[c.as_str(), d.as_str()]));
        compares.push(cmp);
    }

    // Fold comparator outputs into one error signal
    let mut acc = compares[0].clone();
    for (i, cmp) in compares.iter().enumerate().skip(1) {
        let next = format!("err{}", i);
        nodes.push(Node::new(next.as_str(), NodeKind::Or, &[acc.as_str(), cmp.as_str()]));
        acc = next;
    }
    nodes.push(Node::new("flag", NodeKind::Output, &[acc.as_str()]));

    Circuit::from_parts(
        format!("lanes_{}", width),
        nodes,
        FaultModel {
            n_e,
            n_c: 0,
            fault_type: FaultType::BitFlip,
            vulnerable_types: vec![NodeKind::Xor],
        },
        Countermeasure::Detection,
    )
    .unwrap()
}

fn benchmark_sample_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_samples");

    for (name, circuit) in sample_circuits() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &circuit, |b, circuit| {
            b.iter(|| {
                let compiled = FaultCompiler::new(circuit).compile().unwrap();
                black_box(compiled.formula.len())
            });
        });
    }
    group.finish();
}

fn benchmark_scaled_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_lanes");

    for width in [8usize, 32, 128] {
        let circuit = duplicated_lanes(width, 2);
        group.bench_with_input(BenchmarkId::from_parameter(width), &circuit, |b, circuit| {
            b.iter(|| {
                let compiled = FaultCompiler::new(circuit).compile().unwrap();
                black_box(compiled.formula.stats().fault_constraints)
            });
        });
    }
    group.finish();
}

fn benchmark_embedded_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("embedded_solve");
    group.measurement_time(Duration::from_secs(10));

    for width in [8usize, 32] {
        let circuit = duplicated_lanes(width, 1);
        let compiled = FaultCompiler::new(&circuit).compile().unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(width),
            &compiled.formula,
            |b, formula| {
                b.iter(|| {
                    let result = EmbeddedSolver::new().solve(formula);
                    black_box(result.satisfiable())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_sample_compilation,
    benchmark_scaled_compilation,
    benchmark_embedded_solve
);
criterion_main!(benches);
