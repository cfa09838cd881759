use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use quill_core::{Document, ListChange};

fn bench_local_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("Local Edits");
    group.throughput(Throughput::Elements(1));

    group.bench_function("text_append", |b| {
        // measures appending to an ever-growing text
        let doc = Document::new();
        let text = doc.text("t").unwrap();
        b.iter(|| text.append(black_box("x")).unwrap())
    });

    group.bench_function("map_set", |b| {
        let doc = Document::new();
        let map = doc.map("m").unwrap();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            map.set(black_box("counter"), &i).unwrap()
        })
    });

    group.bench_function("list_append_observed", |b| {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        let _sub = list.observe(|changes: &[ListChange<u32>]| {
            black_box(changes.len());
        });
        b.iter(|| list.append(black_box(&7u32)).unwrap())
    });

    group.finish();
}

fn bench_batched_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Transactions");
    group.throughput(Throughput::Elements(100));

    group.bench_function("100_inserts_one_txn", |b| {
        b.iter_batched(
            Document::new,
            |doc| {
                let list = doc.list("l").unwrap();
                let mut txn = doc.transact(None).unwrap();
                for i in 0..100u32 {
                    list.append_in(&mut txn, &i).unwrap();
                }
                txn.free();
                black_box(list.len())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_apply_remote(c: &mut Criterion) {
    let mut group = c.benchmark_group("Remote Updates");

    let source = Document::new();
    let text = source.text("t").unwrap();
    for _ in 0..1_000 {
        text.append("lorem ").unwrap();
    }
    let full = source.encode_full_state().unwrap();
    group.throughput(Throughput::Bytes(full.len() as u64));

    group.bench_function("apply_full_state", |b| {
        b.iter_batched(
            Document::new,
            |doc| doc.apply_update(black_box(&full)).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("reapply_known_update", |b| {
        // already integrated, exercises the idempotent path
        let doc = Document::new();
        doc.apply_update(&full).unwrap();
        b.iter(|| doc.apply_update(black_box(&full)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_local_edits,
    bench_batched_transaction,
    bench_apply_remote
);
criterion_main!(benches);
