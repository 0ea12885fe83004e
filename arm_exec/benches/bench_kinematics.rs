//! # Kinematics and Dynamics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arm_lib::{
    dynamics::{DynParams, DynamicsSolver, NewtonEuler},
    kin::{KinParams, KinematicsSolver, Pose, SerialChain},
};
use nalgebra::DVector;

fn kinematics_benchmark(c: &mut Criterion) {
    // ---- Build the models ----

    let kin_params = KinParams::default();
    let chain = SerialChain::new(kin_params.clone()).unwrap();
    let dynamics = NewtonEuler::new(&kin_params, &DynParams::default()).unwrap();

    let home = DVector::from_column_slice(&[0.0, 0.5, -1.0, 0.0, 0.5, 0.0]);
    let rates = DVector::from_element(6, 0.2);
    let accels = DVector::from_element(6, 0.1);

    // Target 50 mm to the side of the home pose
    let target = Pose::translation(1.0, 0.05, 0.0);

    // ---- Benchmarks ----

    c.bench_function("forward_kinematics", |b| {
        b.iter(|| chain.forward_kinematics(black_box(&home)))
    });

    c.bench_function("jacobian", |b| b.iter(|| chain.jacobian(black_box(&home))));

    c.bench_function("inverse_kinematics", |b| {
        b.iter(|| chain.inverse_kinematics(black_box(&target), black_box(&home)))
    });

    c.bench_function("inverse_dynamics", |b| {
        b.iter(|| {
            dynamics.inverse_dynamics(
                black_box(&home),
                black_box(&rates),
                black_box(&accels),
                None,
            )
        })
    });

    c.bench_function("mass_matrix", |b| {
        b.iter(|| dynamics.mass_matrix(black_box(&home)))
    });
}

criterion_group!(benches, kinematics_benchmark);
criterion_main!(benches);
