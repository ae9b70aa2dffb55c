use criterion::{black_box, criterion_group, criterion_main, Criterion};
use squish_dds::{compress_image, required_bytes, CompressionFormat, Format, Quality};

fn criterion_benchmark(c: &mut Criterion) {
    let rgba: Vec<u8> = (0..512 * 512)
        .flat_map(|i| {
            let x = (i % 512) as u8;
            let y = (i / 512) as u8;
            [x, y, x ^ y, 255]
        })
        .collect();

    for compression in [CompressionFormat::Bc1, CompressionFormat::Bc3, CompressionFormat::Bc5] {
        let format = Format::new(compression).with_quality(Quality::Fast);
        let mut blocks = vec![0u8; required_bytes(512, 512, compression)];

        c.bench_function(&format!("compress_image {compression:?}"), |b| {
            b.iter(|| {
                compress_image(
                    black_box(&rgba),
                    512,
                    512,
                    None,
                    &mut blocks,
                    black_box(format),
                    None,
                )
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
