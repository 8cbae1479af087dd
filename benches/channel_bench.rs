//! Benchmarks for progress-watcher
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_progress_stream(c: &mut Criterion) {
    use progress_watcher::rendezvous::{stream, ProgressEvent, ProgressSample};

    c.bench_function("progress_push_pop", |b| {
        let (sender, receiver) = stream::channel();

        b.iter(|| {
            sender.push(ProgressSample::new(7, 0.42)).unwrap();
            let event = receiver.pop().unwrap();
            debug_assert!(matches!(event, ProgressEvent::Sample(_)));
            black_box(event);
        })
    });

    c.bench_function("progress_push_pop_with_snapshot", |b| {
        let (sender, receiver) = stream::channel();
        let snapshot: std::sync::Arc<str> = "digraph progress { a -> b -> c }".into();

        b.iter(|| {
            let sample = ProgressSample::new(7, 0.42).with_snapshot(snapshot.clone());
            sender.push(sample).unwrap();
            black_box(receiver.pop().unwrap());
        })
    });
}

fn benchmark_gate(c: &mut Criterion) {
    use progress_watcher::rendezvous::RendezvousGate;

    c.bench_function("gate_wait_released", |b| {
        let gate = RendezvousGate::pre_released();
        b.iter(|| black_box(gate.wait()))
    });

    c.bench_function("gate_release_cycle", |b| {
        b.iter(|| {
            let gate = RendezvousGate::new();
            gate.release();
            black_box(gate.wait())
        })
    });
}

fn benchmark_stop_poll(c: &mut Criterion) {
    use progress_watcher::rendezvous::stop;

    c.bench_function("stop_poll_running", |b| {
        let (_notifier, listener) = stop::channel();
        b.iter(|| black_box(listener.poll()))
    });
}

criterion_group!(benches, benchmark_progress_stream, benchmark_gate, benchmark_stop_poll);
criterion_main!(benches);
