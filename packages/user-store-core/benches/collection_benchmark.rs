//! Criterion benchmarks for collection CRUD operations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use user_store_core::{Collection, ObjectId, UserFields};

fn fields(i: usize) -> UserFields {
    UserFields {
        name: Some(format!("user-{}", i)),
        kind: Some("low".to_string()),
    }
}

fn populated(count: usize) -> (Collection, Vec<ObjectId>) {
    let users = Collection::new("users");
    let ids = (0..count)
        .map(|i| users.insert(fields(i)).map(|u| u.id))
        .collect::<Result<Vec<_>, _>>()
        .expect("Failed to populate collection");
    (users, ids)
}

fn bench_insert(c: &mut Criterion) {
    let users = Collection::new("users");
    let mut i = 0;
    c.bench_function("collection_insert", |b| {
        b.iter(|| {
            i += 1;
            black_box(users.insert(fields(i)).expect("insert failed"));
        })
    });
}

fn bench_find_by_id(c: &mut Criterion) {
    let (users, ids) = populated(10_000);
    let mut i = 0;
    c.bench_function("collection_find_by_id", |b| {
        b.iter(|| {
            i = (i + 1) % ids.len();
            black_box(users.find_by_id(&ids[i]).expect("find failed"));
        })
    });
}

fn bench_find_all(c: &mut Criterion) {
    let (users, _) = populated(1_000);
    c.bench_function("collection_find_all_1k", |b| {
        b.iter(|| black_box(users.find_all().expect("list failed")))
    });
}

fn bench_replace(c: &mut Criterion) {
    let (users, ids) = populated(10_000);
    let mut i = 0;
    c.bench_function("collection_replace_by_id", |b| {
        b.iter(|| {
            i = (i + 1) % ids.len();
            black_box(users.replace_by_id(&ids[i], fields(i)).expect("replace failed"));
        })
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_find_by_id,
    bench_find_all,
    bench_replace
);
criterion_main!(benches);
