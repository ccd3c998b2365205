use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rma_core::{AggregateRoot, ReturnAuthorizationId, StockLocationId};
use rma_events::{EventEnvelope, InMemoryEventBus};
use rma_infra::{InMemoryReturnAuthorizationRepository, NumberLookup, ReturnAuthorizationService, ReturnsConfig};
use rma_returns::testing::{RecordingGateway, StubOrder, StubReturnItem};
use rma_returns::{NumberGenerator, ReturnAuthorization};

type Service = ReturnAuthorizationService<
    StubReturnItem,
    InMemoryReturnAuthorizationRepository<StubReturnItem>,
    RecordingGateway,
    InMemoryEventBus<EventEnvelope<serde_json::Value>>,
>;

fn service(expedited_exchanges: bool) -> Service {
    let config = ReturnsConfig {
        expedited_exchanges,
        ..ReturnsConfig::default()
    };
    ReturnAuthorizationService::new(
        &config,
        InMemoryReturnAuthorizationRepository::new(),
        RecordingGateway::default(),
        Vec::new(),
        InMemoryEventBus::new(),
    )
}

fn draft(items: usize, exchange: bool) -> ReturnAuthorization<StubReturnItem> {
    let items = (0..items).map(|i| {
        let amount = 100 * (i as i64 + 1);
        if exchange {
            StubReturnItem::exchange(amount)
        } else {
            StubReturnItem::new(amount)
        }
    });
    ReturnAuthorization::new(ReturnAuthorizationId::new())
        .with_order(Arc::new(StubOrder::shipped()))
        .with_stock_location(StockLocationId::new())
        .with_items(items)
}

/// Number generation against an index that grows as numbers are taken.
fn bench_number_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("number_generation");
    group.throughput(Throughput::Elements(1));

    for prefill in [0usize, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(prefill), prefill, |b, &prefill| {
            let service = service(false);
            for _ in 0..prefill {
                let mut ra = draft(1, false);
                let _ = service.create(&mut ra);
            }
            let generator = NumberGenerator::default();
            let lookup = NumberLookup::<_, StubReturnItem>::new(service.repository());
            let mut rng = StdRng::seed_from_u64(7);

            b.iter(|| black_box(generator.generate_with(&mut rng, &lookup)));
        });
    }

    group.finish();
}

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    for items in [1usize, 10, 50].iter() {
        group.throughput(Throughput::Elements(*items as u64));
        group.bench_with_input(BenchmarkId::new("refund", items), items, |b, &items| {
            let service = service(false);
            b.iter(|| {
                let mut ra = draft(items, false);
                black_box(service.create(&mut ra))
            });
        });
        group.bench_with_input(BenchmarkId::new("expedited_exchange", items), items, |b, &items| {
            let service = service(true);
            b.iter(|| {
                let mut ra = draft(items, true);
                black_box(service.create(&mut ra))
            });
        });
    }

    group.finish();
}

fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");

    group.bench_function("create_then_cancel", |b| {
        let service = service(false);
        b.iter(|| {
            let mut ra = draft(5, false);
            let _ = service.create(&mut ra);
            black_box(service.cancel(*ra.id()))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_number_generation, bench_create, bench_cancel);
criterion_main!(benches);
