use criterion::{black_box, criterion_group, criterion_main, Criterion};

use traffic_signal_engine::signal::intersection::{
    Intersection, IntersectionId, OperationalStatus, SignalTiming,
};
use traffic_signal_engine::signal::state_machine::SignalMachine;

fn machine() -> SignalMachine {
    SignalMachine::new(Intersection {
        id: IntersectionId(1),
        name: "CBD Main Junction".to_string(),
        x: 35.0,
        y: 40.0,
        timing: SignalTiming {
            green_s: 45,
            red_s: 30,
        },
        status: OperationalStatus::Active,
        connected: vec![IntersectionId(2)],
    })
}

fn bench_signal_machine(c: &mut Criterion) {
    c.bench_function("tick_full_cycle", |b| {
        b.iter(|| {
            let mut m = machine();
            // One full green/yellow/red cycle.
            for _ in 0..80 {
                black_box(m.tick());
            }
            m
        })
    });

    c.bench_function("override_bind_release", |b| {
        b.iter(|| {
            let mut m = machine();
            m.bind_override();
            m.tick();
            black_box(m.release_override());
            m
        })
    });
}

criterion_group!(benches, bench_signal_machine);
criterion_main!(benches);
