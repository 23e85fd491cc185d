use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowgraph_core::tcp::{ByteStreamMaintainer, ModificationList};

fn bench_map_seq_ack_round_trip(c: &mut Criterion) {
    let mut maintainer = ByteStreamMaintainer::new();
    maintainer.initialize(1_000_000).unwrap();
    maintainer.insert_in_seq_tree(1_000_100, -4);
    maintainer.insert_in_ack_tree(1_000_096, 4);

    c.bench_function("bytestream_map_seq_ack_round_trip", |b| {
        b.iter(|| {
            let wire = black_box(1_000_150u32);
            let seq = maintainer.map_seq(wire);
            black_box(maintainer.map_ack(seq))
        });
    });
}

fn bench_commit_modification_list(c: &mut Criterion) {
    c.bench_function("bytestream_commit_modification_list", |b| {
        b.iter(|| {
            let mut maintainer = ByteStreamMaintainer::new();
            maintainer.initialize(1000).unwrap();
            let mut list = ModificationList::new();
            list.add_modification(1000, 1005, -2);
            list.add_modification(1000, 1020, 3);
            list.commit(&mut maintainer);
            black_box(maintainer.map_seq(1021))
        });
    });
}

criterion_group!(bytestream, bench_map_seq_ack_round_trip, bench_commit_modification_list);
criterion_main!(bytestream);
