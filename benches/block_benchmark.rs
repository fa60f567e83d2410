//! Block id and block list benchmarks

use blockblob_uploadr::blob::{block_id, BlockList};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn benchmark_block_id_encode(c: &mut Criterion) {
    c.bench_function("block_id_encode_1000", |b| {
        b.iter(|| {
            for index in 0..1000u64 {
                black_box(block_id::encode(black_box(index)).ok());
            }
        });
    });
}

fn benchmark_block_list_xml(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_list_xml");

    for count in [10u64, 1_000, 50_000].iter() {
        let list: BlockList = (0..*count)
            .filter_map(|index| block_id::encode(index).ok())
            .collect::<Vec<_>>()
            .into();

        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &list, |b, list| {
            b.iter(|| black_box(list.to_xml().ok()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_block_id_encode, benchmark_block_list_xml);
criterion_main!(benches);
