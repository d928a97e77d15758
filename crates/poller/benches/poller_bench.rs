//! 폴링 세션 벤치마크
//!
//! 즉시 성공하는 세션의 고정 비용과, 일시정지된 시계에서
//! 다수의 시도를 도는 세션의 루프 비용을 측정합니다.

use std::time::Duration;

use appcert_poller::{PollConfig, PollConfigBuilder, ProbeResult, poll_until, probe_fn};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn bench_single_attempt(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("poll_session");
    group.throughput(Throughput::Elements(1));
    group.bench_function("immediate_success", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut probe = probe_fn(|| async { Ok(ProbeResult::ready(black_box(42u32))) });
                let outcome = poll_until(&mut probe, &PollConfig::once()).await.unwrap();
                black_box(outcome.is_succeeded())
            })
        })
    });
    group.finish();
}

fn bench_many_attempts(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    let config = PollConfigBuilder::new()
        .timeout(Duration::from_secs(3600))
        .interval(Duration::from_secs(1))
        .max_attempts(100)
        .build()
        .unwrap();

    let mut group = c.benchmark_group("poll_session");
    group.throughput(Throughput::Elements(100));
    group.bench_function("100_attempts_paused_clock", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut probe = probe_fn(|| async { Ok(ProbeResult::not_ready(())) });
                let outcome = poll_until(&mut probe, &config).await.unwrap();
                black_box(outcome.stats().attempts)
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_single_attempt, bench_many_attempts);
criterion_main!(benches);
