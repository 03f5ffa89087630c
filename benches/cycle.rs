use criterion::{criterion_group, criterion_main, Criterion};
use encctl::control::{ControllerMatrices, PidGains};
use encctl::params::{ScalingParams, SchemeParams};
use encctl::session::SessionBuilder;

fn controller_cycle_benchmark(c: &mut Criterion) {
    let session = SessionBuilder::new(
        SchemeParams::insecure_d256(),
        ScalingParams::new(1e-3, 0.1, 1e-10).unwrap(),
        ControllerMatrices::pid(&PidGains {
            kp: 1.0,
            ki: 0.1,
            kd: 0.5,
            lp: 0.2,
            li: 0.1,
            ld: 0.3,
        }),
    )
    .with_seed(11)
    .build()
    .unwrap();

    let mut plant = session.plant().unwrap();
    let y = [0.25, -0.5];
    let y_ct = plant.encrypt_measurement(&y).unwrap();

    let mut group = c.benchmark_group("controller_cycle");

    group.bench_function("compute_output", |b| {
        let mut controller = session.controller().unwrap();
        controller.start().unwrap();
        b.iter(|| {
            let (u, pending) = controller.compute_output(&y_ct).unwrap();
            // Discard the update so the state does not drift across iterations.
            drop(pending);
            controller.finish();
            controller.start().unwrap();
            u
        });
    });

    group.bench_function("full_step", |b| {
        // Fresh controller per batch keeps the state far from the modulus.
        b.iter_batched(
            || {
                let mut controller = session.controller().unwrap();
                controller.start().unwrap();
                controller
            },
            |mut controller| controller.step(&y_ct).unwrap(),
            criterion::BatchSize::LargeInput,
        );
    });

    group.bench_function("plant_encrypt_decrypt", |b| {
        let mut controller = session.controller().unwrap();
        controller.start().unwrap();
        let u_ct = controller.step(&y_ct).unwrap();
        b.iter(|| {
            let y_ct = plant.encrypt_measurement(&y).unwrap();
            (y_ct, plant.decrypt_output(&u_ct).unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, controller_cycle_benchmark);
criterion_main!(benches);
