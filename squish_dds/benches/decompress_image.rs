use criterion::{black_box, criterion_group, criterion_main, Criterion};
use squish_dds::{decompress_image, required_bytes, CompressionFormat, Format};

fn criterion_benchmark(c: &mut Criterion) {
    for compression in [CompressionFormat::Bc1, CompressionFormat::Bc3, CompressionFormat::Bc5] {
        let format = Format::new(compression);
        let blocks = vec![0u8; required_bytes(512, 512, compression)];
        let mut rgba = vec![0u8; 512 * 512 * 4];

        c.bench_function(&format!("decompress_image {compression:?}"), |b| {
            b.iter(|| {
                decompress_image(
                    black_box(&blocks),
                    512,
                    512,
                    None,
                    &mut rgba,
                    black_box(format),
                )
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
