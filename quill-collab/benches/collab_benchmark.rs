use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use quill_collab::handshake;
use quill_collab::{OfflineQueue, SyncConfig, SyncMessage, SyncSession, UpdateFeed};
use quill_core::Document;

fn bench_frame_codec(c: &mut Criterion) {
    let config = SyncConfig::default();
    let mut group = c.benchmark_group("Framing");

    let small = SyncMessage::update(vec![0u8; 64]);
    group.throughput(Throughput::Bytes(64));
    group.bench_function("encode_64B", |b| {
        b.iter(|| black_box(small.encode(&config).unwrap()))
    });

    let large = SyncMessage::update((0..64 * 1024).map(|i| (i % 251) as u8).collect());
    let large_frame = large.encode(&config).unwrap();
    group.throughput(Throughput::Bytes(large.buffer.len() as u64));
    group.bench_function("encode_64KiB_lz4", |b| {
        b.iter(|| black_box(large.encode(&config).unwrap()))
    });
    group.bench_function("decode_64KiB_lz4", |b| {
        b.iter(|| black_box(SyncMessage::decode(black_box(&large_frame), &config).unwrap()))
    });

    group.finish();
}

fn bench_handshake(c: &mut Criterion) {
    let source = Document::new();
    let text = source.text("t").unwrap();
    for _ in 0..500 {
        text.append("lorem ipsum ").unwrap();
    }

    c.bench_function("full_handshake_to_empty_replica", |b| {
        b.iter_batched(
            Document::new,
            |replica| {
                let mut initiator = SyncSession::new(SyncConfig::default());
                let mut responder = SyncSession::new(SyncConfig::default());
                let mut inflight = vec![(true, initiator.start(&replica).unwrap())];
                // true: travelling to the responder
                while let Some((to_responder, msg)) = inflight.pop() {
                    let replies = if to_responder {
                        responder.handle(&source, &msg).unwrap()
                    } else {
                        initiator.handle(&replica, &msg).unwrap()
                    };
                    inflight.extend(replies.into_iter().map(|m| (!to_responder, m)));
                }
                black_box(replica)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("stateless_step1_reply", |b| {
        let empty = handshake::start(&Document::new()).unwrap();
        b.iter(|| black_box(handshake::handle_step1(&source, &empty.buffer).unwrap()))
    });
}

fn bench_offline_flush(c: &mut Criterion) {
    let doc = Document::new();
    let mut feed = UpdateFeed::new(&doc, &SyncConfig::default()).unwrap();
    let list = doc.list("l").unwrap();
    for i in 0..1_000u32 {
        list.append(&i).unwrap();
    }
    let updates = feed.drain();

    c.bench_function("offline_flush_1K_updates", |b| {
        b.iter_batched(
            || {
                let mut queue = OfflineQueue::new(10_000);
                for msg in &updates {
                    queue.enqueue(msg.buffer.clone()).unwrap();
                }
                queue
            },
            |mut queue| black_box(queue.flush().unwrap()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_frame_codec, bench_handshake, bench_offline_flush);
criterion_main!(benches);
