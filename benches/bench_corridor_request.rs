use criterion::{black_box, criterion_group, criterion_main, Criterion};

use traffic_signal_engine::config::EngineConfig;
use traffic_signal_engine::engine::Engine;
use traffic_signal_engine::preemption::request::{EmergencyVehicle, Priority};
use traffic_signal_engine::signal::intersection::IntersectionId;

fn bench_corridor_request(c: &mut Criterion) {
    c.bench_function("submit_and_resolve_corridor", |b| {
        b.iter(|| {
            let engine = Engine::with_start_time(EngineConfig::demo(), 0).unwrap();
            let id = engine.submit_emergency_request(
                EmergencyVehicle::Ambulance,
                Priority::High,
                vec![IntersectionId(1), IntersectionId(2)],
            );
            black_box(engine.tick());
            black_box(id)
        })
    });

    c.bench_function("tick_idle_network", |b| {
        let engine = Engine::with_start_time(EngineConfig::demo(), 0).unwrap();
        b.iter(|| black_box(engine.tick()))
    });
}

criterion_group!(benches, bench_corridor_request);
criterion_main!(benches);
