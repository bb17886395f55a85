use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use wafer_aligner::pipeline::{EdgeExtractor, PipelineStage};
use wafer_aligner::{NullSink, RasterImage, WaferAligner};

fn build_wafer(size: u32, radius: f32) -> RasterImage {
    let c = size as f32 / 2.0;
    let flat = radius * 0.85;
    let image = RgbImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - c;
        let dy = y as f32 - c;
        if dx * dx + dy * dy <= radius * radius && dy <= flat {
            Rgb([200; 3])
        } else {
            Rgb([0; 3])
        }
    });
    RasterImage::from_rgb_image(&image).expect("valid image")
}

fn bench_edge_extraction(c: &mut Criterion) {
    let wafer = build_wafer(1024, 400.0);
    let extractor = EdgeExtractor::default();

    c.bench_function("edge_extraction_1024", |b| {
        b.iter(|| {
            let maps = extractor.execute(black_box(wafer.as_mat()), &mut NullSink);
            black_box(maps.is_ok());
        });
    });
}

fn bench_full_alignment(c: &mut Criterion) {
    let aligner = WaferAligner::default();
    let mut group = c.benchmark_group("align");
    group.sample_size(10);

    for size in [800u32, 2000] {
        let wafer = build_wafer(size, size as f32 * 0.4);
        group.bench_function(format!("align_{}", size), |b| {
            b.iter(|| {
                let aligned = aligner.align(black_box(&wafer), "bench", &mut NullSink);
                black_box(aligned.is_ok());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_edge_extraction, bench_full_alignment);
criterion_main!(benches);
