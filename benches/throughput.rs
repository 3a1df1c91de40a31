use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};
use rulespec::{field, to_rule_node, RoundTripValidator, RuleNode, Specification};

fn build_shared_tree() -> (Arc<RoundTripValidator>, Arc<RuleNode>) {
    let n = 20;
    let leaves = (0..n)
        .map(|i| field(&format!("f{i}")).gte(1_i64))
        .collect();
    let spec = Specification::and(leaves);
    let node = to_rule_node(&spec).unwrap();
    (Arc::new(RoundTripValidator::default()), Arc::new(node))
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let (validator, node) = build_shared_tree();

        group.bench_function(&format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let v = Arc::clone(&validator);
                        let n = Arc::clone(&node);
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = v.validate(&n);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
