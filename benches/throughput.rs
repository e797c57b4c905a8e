use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ringmpmc_rs::{Queue, RingConfig, SentinelRing, StateRing};
use std::sync::Arc;
use std::thread;

const MESSAGES: u64 = 100_000;

/// N producers and N consumers move a fixed message count through the
/// queue; producers send `1`s as end markers, one per consumer.
fn run_mpmc<Q>(queue: &Arc<Q>, producers: u32, consumers: u32)
where
    Q: Queue<u32> + Send + Sync + 'static,
{
    let per_producer = (MESSAGES / u64::from(producers)) as u32;

    let mut handles = Vec::new();
    for _ in 0..producers {
        let queue = Arc::clone(queue);
        handles.push(thread::spawn(move || {
            for n in (1..=per_producer).rev() {
                queue.push(n);
            }
        }));
    }
    for _ in 0..consumers {
        let queue = Arc::clone(queue);
        handles.push(thread::spawn(move || {
            loop {
                let n = queue.pop();
                black_box(n);
                if n == 1 {
                    break;
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    group.throughput(Throughput::Elements(MESSAGES));

    group.bench_function("sentinel_2p2c", |b| {
        b.iter(|| {
            let queue = Arc::new(SentinelRing::<u32>::new(1024));
            run_mpmc(&queue, 2, 2);
        });
    });

    group.bench_function("state_2p2c", |b| {
        b.iter(|| {
            let queue = Arc::new(StateRing::<u32>::new(1024));
            run_mpmc(&queue, 2, 2);
        });
    });

    group.finish();
}

fn bench_ping_pong(c: &mut Criterion) {
    const ROUND_TRIPS: u32 = 10_000;

    let mut group = c.benchmark_group("ping_pong");
    group.throughput(Throughput::Elements(u64::from(ROUND_TRIPS)));

    group.bench_function("sentinel_pair", |b| {
        b.iter(|| {
            let config = RingConfig::new(8).minimize_contention(false);
            let a = Arc::new(SentinelRing::<u32>::with_config(config).unwrap());
            let bq = Arc::new(SentinelRing::<u32>::with_config(config).unwrap());

            let echo = {
                let (a, bq) = (Arc::clone(&a), Arc::clone(&bq));
                thread::spawn(move || {
                    for _ in 0..ROUND_TRIPS {
                        let v = a.pop();
                        bq.push(v);
                    }
                })
            };

            for i in 1..=ROUND_TRIPS {
                a.push(i);
                black_box(bq.pop());
            }
            echo.join().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_mpmc, bench_ping_pong);
criterion_main!(benches);
