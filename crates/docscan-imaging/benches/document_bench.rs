// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the docscan-imaging crate: boundary detection at
// both tiers and the perspective + colour-mode processing path.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use docscan_imaging::{
    BoundaryDetector, ColorMode, DetectionTier, DocumentBounds, Point, ScanEnhancer,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 1600x1200 photo stand-in: warm grey desk with a slightly skewed white page.
fn synthetic_photo() -> DynamicImage {
    let (width, height) = (1600u32, 1200u32);
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let skew = y as i64 / 20;
        let (x, y) = (x as i64, y as i64);
        if x >= 300 + skew && x < 1300 + skew && (200..1000).contains(&y) {
            Rgb([235, 232, 228])
        } else {
            Rgb([70, 60, 55])
        }
    }))
}

fn page_bounds() -> DocumentBounds {
    DocumentBounds::new(
        Point::new(310.0, 200.0),
        Point::new(1310.0, 200.0),
        Point::new(1350.0, 1000.0),
        Point::new(350.0, 1000.0),
    )
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_detection(c: &mut Criterion) {
    let photo = synthetic_photo();
    let detector = BoundaryDetector::new();

    c.bench_function("detect interactive (1600x1200)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&photo), DetectionTier::Interactive)));
    });

    c.bench_function("detect final capture (1600x1200)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&photo), DetectionTier::FinalCapture)));
    });
}

fn bench_processing(c: &mut Criterion) {
    let photo = synthetic_photo();
    let bounds = page_bounds();
    let enhancer = ScanEnhancer::new();

    let mut group = c.benchmark_group("process (1600x1200)");
    group.sample_size(20);
    for (name, mode) in [
        ("color", ColorMode::Color),
        ("grayscale", ColorMode::Grayscale),
        ("black_and_white", ColorMode::BlackAndWhite),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                black_box(enhancer.process(black_box(photo.clone()), Some(&bounds), mode, true))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detection, bench_processing);
criterion_main!(benches);
