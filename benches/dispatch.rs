use criterion::{criterion_group, criterion_main, Criterion};
use heep::clock::ManualClock;
use heep::config::EngineConfig;
use heep::control::{Control, ControlDirection};
use heep::HeepEngine;

fn make_engine() -> HeepEngine<ManualClock> {
    let mut engine = HeepEngine::new(EngineConfig::default(), ManualClock::new(0)).unwrap();
    for id in 0..4 {
        engine
            .device_mut()
            .add_control(Control::range(id, "ctl", ControlDirection::Input, 0, 100))
            .unwrap();
    }
    engine
}

fn bench_dispatch(c: &mut Criterion) {
    c.bench_function("dispatch_set_value", |b| {
        let mut engine = make_engine();
        b.iter(|| {
            engine.dispatch(&[0x0A, 0x01, 0x02, 0x02, 42]).unwrap();
        });
    });
    c.bench_function("dispatch_memory_dump", |b| {
        let mut engine = make_engine();
        b.iter(|| {
            engine.dispatch(&[0x09, 0x01]).unwrap();
        });
    });
    c.bench_function("ack_register_and_sweep", |b| {
        b.iter(|| {
            let mut engine = make_engine();
            for _ in 0..16 {
                engine.set_value_cop(1, 7).unwrap();
            }
            engine.sweep();
        });
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
