use criterion::{criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use padmatch::kernel::scalar::ZnccScalar;
use padmatch::kernel::scan_best;
use padmatch::{
    DetectorConfig, ImageView, Method, PadDetector, StoreConfig, TemplatePlan, TemplateStore,
};
use std::hint::black_box;

fn make_image(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let value = ((x * 13) ^ (y * 7) ^ (x * y) ^ seed) & 0xFF;
        Luma([value as u8])
    })
}

fn bench_kernel(c: &mut Criterion) {
    let image = make_image(200, 200, 0);
    let patch = image::imageops::crop_imm(&image, 60, 50, 96, 96).to_image();
    let image_view = ImageView::from_gray(&image).unwrap();
    let plan = TemplatePlan::from_view(ImageView::from_gray(&patch).unwrap()).unwrap();

    c.bench_function("zncc_scan_scalar_200_96", |b| {
        b.iter(|| scan_best::<ZnccScalar>(black_box(image_view), black_box(&plan)).unwrap())
    });

    #[cfg(feature = "simd")]
    c.bench_function("zncc_scan_simd_200_96", |b| {
        b.iter(|| {
            scan_best::<padmatch::kernel::simd::ZnccSimd>(black_box(image_view), black_box(&plan))
                .unwrap()
        })
    });
}

fn bench_detector(c: &mut Criterion) {
    let store_cfg = StoreConfig {
        canonical_size: 96,
        ..StoreConfig::default()
    };
    let store = TemplateStore::from_images(
        (1..=4u32).map(|id| (id, format!("pad{id}"), make_image(96, 96, id * 37))),
        store_cfg,
    )
    .unwrap();
    let query = make_image(240, 240, 2 * 37);

    let template_only = PadDetector::with_store(
        DetectorConfig {
            methods: vec![Method::Template],
            ..DetectorConfig::default()
        },
        store.clone(),
    );
    c.bench_function("detect_template_only_4_pads", |b| {
        b.iter(|| template_only.detect(black_box(&query)))
    });

    let all = PadDetector::with_store(DetectorConfig::default(), store);
    c.bench_function("detect_all_methods_4_pads", |b| {
        b.iter(|| all.detect(black_box(&query)))
    });
}

/// Default configuration (canonical 200, six scales) on a VGA frame.
fn bench_multiscale_vga(c: &mut Criterion) {
    let store = TemplateStore::from_images(
        (1..=4u32).map(|id| (id, format!("pad{id}"), make_image(200, 200, id * 37))),
        StoreConfig::default(),
    )
    .unwrap();
    let frame = make_image(640, 480, 5);

    let multiscale = PadDetector::with_store(
        DetectorConfig {
            methods: vec![Method::MultiScale],
            ..DetectorConfig::default()
        },
        store.clone(),
    );
    let mut group = c.benchmark_group("vga_640x480");
    group.sample_size(10);
    group.bench_function("detect_multiscale_4_pads", |b| {
        b.iter(|| multiscale.detect(black_box(&frame)))
    });

    let all = PadDetector::with_store(DetectorConfig::default(), store);
    group.bench_function("detect_all_methods_4_pads", |b| {
        b.iter(|| all.detect(black_box(&frame)))
    });
    group.finish();
}

criterion_group!(benches, bench_kernel, bench_detector, bench_multiscale_vga);
criterion_main!(benches);
