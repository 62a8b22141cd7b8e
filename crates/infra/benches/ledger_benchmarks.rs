use criterion::{
    BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};

use chrono::{Duration, Utc};
use std::sync::Arc;
use stockledger_core::{ItemId, MovementId, UserId};
use stockledger_infra::{Actor, InMemoryInventoryStore, LedgerService, ListingSettings};
use stockledger_inventory::{
    ItemForm, MOST_SOLD_LIMIT, MovementAction, MovementEntry, QUANTITY_MAX, StockAdjustment,
    most_sold,
};

/// Ledger with `size` entries spread over 50 items, a third of them outgoing.
fn synthetic_ledger(size: usize) -> Vec<MovementEntry> {
    let items: Vec<ItemId> = (0..50).map(|_| ItemId::new()).collect();
    let user = UserId::new();
    let start = Utc::now();

    (0..size)
        .map(|i| {
            let outgoing = i % 3 == 0;
            MovementEntry {
                id: MovementId::new(),
                // Every tenth entry belongs to a deleted item.
                item_id: (i % 10 != 0).then(|| items[i % items.len()]),
                item_name: format!("ITEM {}", i % items.len()),
                change: if outgoing { -((i % 7) as i64 + 1) } else { 5 },
                action: if outgoing {
                    MovementAction::Decrease
                } else {
                    MovementAction::Increase
                },
                timestamp: start + Duration::milliseconds(i as i64),
                user_id: Some(user),
                observation: None,
            }
        })
        .collect()
}

fn bench_most_sold(c: &mut Criterion) {
    let mut group = c.benchmark_group("most_sold_report");

    for size in [100, 1_000, 10_000].iter() {
        let ledger = synthetic_ledger(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("aggregate", size), &ledger, |b, ledger| {
            b.iter(|| black_box(most_sold(ledger.iter(), |_| None, MOST_SOLD_LIMIT)));
        });
    }

    group.finish();
}

fn bench_stock_adjustment(c: &mut Criterion) {
    let mut group = c.benchmark_group("stock_adjustment");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    group.bench_function("decrease_in_memory", |b| {
        let service = LedgerService::new(
            Arc::new(InMemoryInventoryStore::new()),
            ListingSettings::default(),
        );
        let actor = Actor::user(UserId::new());
        let id = runtime
            .block_on(service.create_item(
                actor,
                ItemForm {
                    name: Some("bench item".to_string()),
                    quantity: Some(QUANTITY_MAX),
                    category_id: None,
                },
            ))
            .unwrap()
            .item
            .id;

        b.iter(|| {
            let adjustment = StockAdjustment {
                quantity: Some(black_box(1)),
                observation: None,
            };
            runtime.block_on(service.decrease(actor, id, adjustment)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_most_sold, bench_stock_adjustment);
criterion_main!(benches);
