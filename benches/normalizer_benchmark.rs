//! Normalization and dispatch planning throughput
//!
//! A full run normalizes every extracted record once and plans the batch
//! against the registry once; both should stay negligible next to browser time.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use parcel_valuation_lib::adapters::AdapterRegistry;
use parcel_valuation_lib::application::{normalize_all, plan_dispatch};
use parcel_valuation_lib::domain::{RawRecord, WorkItem};

fn sample_records(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            RawRecord::new(format!("27-029-24-11-{i:04}"))
                .land(format!("${},{:03}", 40 + i % 60, i % 1000))
                .building(if i % 7 == 0 { String::new() } else { format!("{},{:03},{:03}", i % 3, i % 1000, i % 500) })
                .total("288,000")
                .year(if i % 5 == 0 { "2023 (estimate)" } else { "2024" })
        })
        .collect()
}

fn sample_items(count: usize) -> Vec<WorkItem> {
    let localities = [
        ("Hennepin", "MN"),
        ("Spokane", "WA"),
        ("Salem", "MA"),
        ("Mille Lacs", "MN"),
        ("Unknown", "ZZ"),
    ];
    (0..count)
        .map(|i| {
            let (locality, region) = localities[i % localities.len()];
            WorkItem::new(format!("P-{i}"), locality, region)
        })
        .collect()
}

fn normalization(c: &mut Criterion) {
    let records = sample_records(1_000);
    c.bench_function("normalize 1000 records", |b| b.iter(|| normalize_all(black_box(&records))));
}

fn dispatch_planning(c: &mut Criterion) {
    let Ok(registry) = AdapterRegistry::builtin() else {
        return;
    };
    let items = sample_items(1_000);
    c.bench_function("plan 1000 work items", |b| b.iter(|| plan_dispatch(registry, black_box(&items))));
}

criterion_group!(benches, normalization, dispatch_planning);
criterion_main!(benches);
