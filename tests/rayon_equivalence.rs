#![cfg(feature = "rayon")]

mod common;

use common::textured;
use image::Luma;
use padmatch::kernel::rayon::{scan_all_par, scan_best_par};
use padmatch::kernel::scalar::ZnccScalar;
use padmatch::kernel::{scan_all, scan_best};
use padmatch::{DetectorConfig, ImageView, PadDetector, StoreConfig, TemplatePlan, TemplateStore};

#[test]
fn parallel_scan_matches_sequential() {
    let image = textured(2, 96);
    let patch = image::imageops::crop_imm(&image, 30, 25, 40, 40).to_image();
    let view = ImageView::from_gray(&image).unwrap();
    let plan = TemplatePlan::from_view(ImageView::from_gray(&patch).unwrap()).unwrap();

    let sequential = scan_best::<ZnccScalar>(view, &plan).unwrap().unwrap();
    let parallel = scan_best_par::<ZnccScalar>(view, &plan).unwrap().unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!((parallel.x, parallel.y), (30, 25));

    let all_sequential = scan_all::<ZnccScalar>(view, &plan).unwrap();
    let all_parallel = scan_all_par::<ZnccScalar>(view, &plan).unwrap();
    assert_eq!(all_sequential, all_parallel);
}

#[test]
fn parallel_detector_matches_sequential() {
    let store = TemplateStore::from_images(
        (1..=3).map(|pad| (pad, format!("pad{pad}"), textured(pad, 96))),
        StoreConfig {
            canonical_size: 96,
            ..StoreConfig::default()
        },
    )
    .unwrap();
    let sequential = PadDetector::with_store(DetectorConfig::default(), store.clone());
    let parallel = PadDetector::with_store(
        DetectorConfig {
            parallel: true,
            ..DetectorConfig::default()
        },
        store,
    );

    for pad in 1..=3 {
        let mut query = textured(pad, 110);
        query.put_pixel(5, 5, Luma([255]));
        assert_eq!(sequential.report(&query), parallel.report(&query));
    }
}
