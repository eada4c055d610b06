use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::Value as JsonValue;

use bazaar_core::{SellerId, SystemClock, UserId};
use bazaar_events::{EventBus, EventEnvelope, InMemoryEventBus};
use bazaar_infra::engine::{AssessmentEngine, CommandMeta};
use bazaar_infra::event_store::InMemoryEventStore;
use bazaar_infra::projections::CatalogProjection;
use bazaar_infra::tiers::TierRegistry;
use bazaar_listings::{Category, ListingDraft, ListingId, Money, ReviewStage};

type Store = Arc<InMemoryEventStore>;
type Engine = AssessmentEngine<
    Store,
    Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
    TierRegistry<Store>,
    SystemClock,
>;

fn setup() -> Engine {
    AssessmentEngine::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(InMemoryEventBus::new()),
        TierRegistry::new(Arc::new(InMemoryEventStore::new())),
        SystemClock,
    )
}

fn draft() -> ListingDraft {
    ListingDraft {
        name: "Capiz Shell Lamp".to_string(),
        category: Category::named("Lighting"),
        base_price: Money::from_centavos(259_900).unwrap(),
        description: "Hand-cut capiz".to_string(),
        images: vec!["https://cdn.example/capiz.jpg".to_string()],
        variants: vec![],
    }
}

/// Bounce a listing through `loops` revision rounds, leaving it in digital review.
fn listing_with_loops(engine: &Engine, loops: usize) -> ListingId {
    let seller = SellerId::new();
    let reviewer = CommandMeta::by(UserId::new());
    let id = engine.submit(seller, UserId::new(), draft()).unwrap().id_typed();
    for _ in 0..loops {
        engine
            .request_revision(id, "Retake photos", Some(ReviewStage::Digital), reviewer)
            .unwrap();
        engine.resubmit(id, seller, draft(), reviewer).unwrap();
    }
    id
}

fn bench_command_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_latency");

    group.bench_function("submit_fresh", |b| {
        let engine = setup();
        b.iter(|| {
            black_box(
                engine
                    .submit(SellerId::new(), UserId::new(), draft())
                    .unwrap(),
            )
        });
    });

    group.bench_function("full_pipeline", |b| {
        let engine = setup();
        let reviewer = CommandMeta::by(UserId::new());
        b.iter(|| {
            let id = engine
                .submit(SellerId::new(), UserId::new(), draft())
                .unwrap()
                .id_typed();
            engine.approve_for_sample_submission(id, reviewer).unwrap();
            engine.record_sample_received(id, reviewer).unwrap();
            black_box(engine.pass_quality_check(id, reviewer).unwrap())
        });
    });

    group.finish();
}

fn bench_rehydration(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehydration");

    for loops in [0usize, 10, 100].iter() {
        let engine = setup();
        let id = listing_with_loops(&engine, *loops);
        group.throughput(Throughput::Elements((*loops * 2 + 1) as u64));
        group.bench_with_input(BenchmarkId::new("load", loops), loops, |b, _| {
            b.iter(|| black_box(engine.load(id).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("history", loops), loops, |b, _| {
            b.iter(|| black_box(engine.history(id).unwrap().to_vec().unwrap()));
        });
    }

    group.finish();
}

fn bench_catalog_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_rebuild");

    for listings in [10usize, 100, 1000].iter() {
        let engine = setup();
        let subscription = engine.bus().subscribe();
        let reviewer = CommandMeta::by(UserId::new());
        for _ in 0..*listings {
            let id = engine
                .submit(SellerId::new(), UserId::new(), draft())
                .unwrap()
                .id_typed();
            engine.approve_for_sample_submission(id, reviewer).unwrap();
            engine.record_sample_received(id, reviewer).unwrap();
            engine.pass_quality_check(id, reviewer).unwrap();
        }
        let envelopes = subscription.drain();

        group.throughput(Throughput::Elements(envelopes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(listings), listings, |b, _| {
            b.iter(|| {
                let catalog = CatalogProjection::new();
                catalog.rebuild_from_scratch(envelopes.clone()).unwrap();
                black_box(catalog.list().len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_command_latency,
    bench_rehydration,
    bench_catalog_rebuild
);
criterion_main!(benches);
