use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowgraph_core::{Packet, PacketBatch};

fn bench_push_pull_header(c: &mut Criterion) {
    c.bench_function("packet_push_pull_header", |b| {
        b.iter(|| {
            let mut packet = Packet::with_headroom(&[0u8; 64], 32, 0);
            packet.pull(14).unwrap();
            packet.push_header(14).unwrap();
            black_box(packet.len())
        });
    });
}

fn bench_uniqueify_shared(c: &mut Criterion) {
    c.bench_function("packet_uniqueify_shared", |b| {
        b.iter(|| {
            let packet = Packet::from_bytes(vec![0u8; 256]);
            let shared = packet.share();
            let mut owned = shared;
            owned.uniqueify();
            black_box(owned)
        });
    });
}

fn bench_batch_append_and_split(c: &mut Criterion) {
    c.bench_function("packet_batch_append_and_split", |b| {
        b.iter(|| {
            let mut batch = PacketBatch::make_from_packet(Packet::from_bytes(vec![0u8; 64]));
            for _ in 0..31 {
                batch.append_packet(Packet::from_bytes(vec![0u8; 64]));
            }
            let head = batch.split(16);
            black_box((head, batch))
        });
    });
}

criterion_group!(packet_ops, bench_push_pull_header, bench_uniqueify_shared, bench_batch_append_and_split);
criterion_main!(packet_ops);
