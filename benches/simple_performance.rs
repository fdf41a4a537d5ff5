use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use msg_core::truncate;
use msg_core::*;
use msg_web_generic::WebhookProcessor;
use msgkit::rate_limiter::{RateLimitConfig, RateLimiter};
use std::collections::HashMap;
use tokio::runtime::Runtime;

fn benchmark_truncation(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncation");

    let ascii = "a".repeat(500);
    let unicode = format!("©{}", "a".repeat(499));
    let escaped = "[]{}".repeat(125);

    group.bench_function("ascii_500", |b| {
        b.iter(|| black_box(truncate::truncate_for_sms(&ascii, 0)))
    });
    group.bench_function("unicode_500", |b| {
        b.iter(|| black_box(truncate::truncate_for_sms(&unicode, 0)))
    });
    group.bench_function("escape_heavy_500", |b| {
        b.iter(|| black_box(truncate::truncate_for_sms(&escaped, 0)))
    });
    group.bench_function("fits_without_allocation", |b| {
        b.iter(|| black_box(truncate::truncate_for_sms("short message", 0)))
    });

    group.finish();
}

fn benchmark_webhook_processing(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let registry = InboundRegistry::new();
    let processor = WebhookProcessor::new(registry);

    let payload_sizes = vec![100, 1000, 10000];
    let mut group = c.benchmark_group("webhook_processing");

    for size in payload_sizes {
        let payload = "x".repeat(size);
        let headers: Headers = vec![("content-type".to_string(), "application/json".to_string())];

        group.bench_with_input(
            BenchmarkId::new("process_webhook", size),
            &size,
            |b, &_size| {
                b.to_async(&rt).iter(|| async {
                    black_box(
                        processor
                            .process_webhook("test-provider", headers.clone(), "", payload.as_bytes())
                            .await,
                    )
                })
            },
        );
    }
    group.finish();
}

fn benchmark_rate_limiting(c: &mut Criterion) {
    let config = RateLimitConfig {
        enabled: true,
        max_requests: 1_000_000,
        window_seconds: 60,
        per_provider: HashMap::new(),
    };
    let limiter = RateLimiter::new(config);

    let mut group = c.benchmark_group("rate_limiting");

    group.bench_function("single_key_check", |b| {
        b.iter(|| black_box(limiter.check_rate_limit("twilio")))
    });

    group.bench_function("multiple_keys_check", |b| {
        b.iter(|| {
            for i in 0..10 {
                black_box(limiter.check_rate_limit(&format!("twilio:{}", i)));
            }
        })
    });

    group.finish();
}

fn benchmark_configuration_loading(c: &mut Criterion) {
    use msgkit::config::AppConfig;

    let mut group = c.benchmark_group("configuration");

    group.bench_function("create_default", |b| {
        b.iter(|| black_box(AppConfig::default()))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_truncation,
    benchmark_webhook_processing,
    benchmark_rate_limiting,
    benchmark_configuration_loading
);

criterion_main!(benches);
