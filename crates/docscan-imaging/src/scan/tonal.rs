// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tonal filters — contrast-limited adaptive histogram equalisation (CLAHE)
// on luminance, and Gaussian-weighted adaptive binarisation.

use std::borrow::Cow;

use image::{GrayImage, Luma, RgbImage, RgbaImage};
use imageproc::filter::separable_filter_equal;
use palette::{FromColor, IntoColor, Lab, Srgb};
use tracing::debug;

const BINS: usize = 256;

// -- CLAHE ----------------------------------------------------------------------

/// Contrast-limited adaptive histogram equalisation.
///
/// The image is split into a `grid x grid` array of equally sized tiles;
/// when its dimensions are not multiples of `grid` it is first extended on
/// the right and bottom by mirror reflection. Each tile gets its own
/// equalisation curve with histogram bins clipped at `clip_limit` times
/// the uniform bin height; the clipped excess is spread back over all bins.
/// Output pixels blend the curves of the four nearest tiles bilinearly so
/// tile seams do not show.
pub fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let grid = grid.max(1);
    let padded = pad_to_multiple(gray, grid);
    let tile_w = padded.width() / grid;
    let tile_h = padded.height() / grid;

    let mut luts: Vec<[u8; BINS]> = Vec::with_capacity((grid * grid) as usize);
    for ty in 0..grid {
        for tx in 0..grid {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            luts.push(tile_lut(&padded, x0, y0, x0 + tile_w, y0 + tile_h, clip_limit));
        }
    }
    drop(padded);
    debug!(grid, tile_w, tile_h, "CLAHE tile curves built");

    let lut = |tx: u32, ty: u32| &luts[(ty * grid + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y).0[0] as usize;

        let (tx0, tx1, ax) = neighbour_tiles(x, tile_w, grid);
        let (ty0, ty1, ay) = neighbour_tiles(y, tile_h, grid);

        let top = lut(tx0, ty0)[v] as f32 * (1.0 - ax) + lut(tx1, ty0)[v] as f32 * ax;
        let bottom = lut(tx0, ty1)[v] as f32 * (1.0 - ax) + lut(tx1, ty1)[v] as f32 * ax;
        let value = top * (1.0 - ay) + bottom * ay;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Extend `gray` to the next multiple of `grid` in both dimensions,
/// mirroring about the last row/column (`dcb|abcd|cba`).
fn pad_to_multiple(gray: &GrayImage, grid: u32) -> Cow<'_, GrayImage> {
    let (width, height) = gray.dimensions();
    let padded_w = width.div_ceil(grid) * grid;
    let padded_h = height.div_ceil(grid) * grid;
    if (padded_w, padded_h) == (width, height) {
        return Cow::Borrowed(gray);
    }
    Cow::Owned(GrayImage::from_fn(padded_w, padded_h, |x, y| {
        *gray.get_pixel(reflect_101(x, width), reflect_101(y, height))
    }))
}

/// Mirror index `i` into `0..len` without repeating the edge sample.
fn reflect_101(i: u32, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i % period;
    if m < len { m } else { period - m }
}

/// The two tiles whose centres bracket `pos` along one axis, and the blend
/// weight of the second.
fn neighbour_tiles(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    let last = tiles as i64 - 1;
    let lo = f.floor() as i64;
    let t0 = lo.clamp(0, last) as u32;
    let t1 = (lo + 1).clamp(0, last) as u32;
    let weight = if t0 == t1 { 0.0 } else { f - lo as f32 };
    (t0, t1, weight)
}

/// Clipped equalisation curve for the tile `[x0, x1) x [y0, y1)`.
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    let clip = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cdf = 0u32;
    for (entry, count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *entry = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// CLAHE on the L* channel of an RGB image. a* and b* pass through
/// untouched.
pub fn clahe_rgb(rgb: &RgbImage, clip_limit: f32, grid: u32) -> RgbImage {
    let mut out = rgb.clone();
    let (width, height) = out.dimensions();
    equalize_lightness(&mut out, width, height, 3, clip_limit, grid);
    out
}

/// As [`clahe_rgb`], preserving alpha.
pub fn clahe_rgba(rgba: &RgbaImage, clip_limit: f32, grid: u32) -> RgbaImage {
    let mut out = rgba.clone();
    let (width, height) = out.dimensions();
    equalize_lightness(&mut out, width, height, 4, clip_limit, grid);
    out
}

/// Rewrite the colour channels of interleaved `raw` pixels (stride
/// `channels`, RGB first) with CLAHE applied to L*.
fn equalize_lightness(
    raw: &mut [u8],
    width: u32,
    height: u32,
    channels: usize,
    clip_limit: f32,
    grid: u32,
) {
    let labs: Vec<Lab> = raw
        .chunks_exact(channels)
        .map(|px| Lab::from_color(Srgb::new(px[0], px[1], px[2]).into_format::<f32>()))
        .collect();

    // L* spans 0..=100; stretch it onto the 8-bit histogram range.
    let lightness = GrayImage::from_fn(width, height, |x, y| {
        let l = labs[(y * width + x) as usize].l;
        Luma([(l * 2.55).round().clamp(0.0, 255.0) as u8])
    });
    let equalized = clahe(&lightness, clip_limit, grid);

    for ((px, lab), l) in raw
        .chunks_exact_mut(channels)
        .zip(labs.iter())
        .zip(equalized.as_raw().iter())
    {
        let adjusted = Lab::new(*l as f32 / 2.55, lab.a, lab.b);
        let srgb: Srgb = adjusted.into_color();
        let srgb = Srgb::new(
            srgb.red.clamp(0.0, 1.0),
            srgb.green.clamp(0.0, 1.0),
            srgb.blue.clamp(0.0, 1.0),
        )
        .into_format::<u8>();
        px[0] = srgb.red;
        px[1] = srgb.green;
        px[2] = srgb.blue;
    }
}

// -- Adaptive binarisation --------------------------------------------------------

/// Binarise with a Gaussian-weighted local threshold.
///
/// For each pixel the threshold is the Gaussian-weighted mean of its
/// `block_size x block_size` neighbourhood minus `offset`. Pixels above the
/// threshold become white, the rest black. Borders replicate edge pixels.
/// Binary input comes back unchanged.
pub fn adaptive_threshold_gaussian(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let kernel = gaussian_kernel(block_size);
    let means = separable_filter_equal(gray, &kernel);

    GrayImage::from_fn(width, height, |x, y| {
        let mean = means.get_pixel(x, y).0[0] as i32;
        let value = gray.get_pixel(x, y).0[0] as i32;
        Luma([if value - mean > -offset { 255 } else { 0 }])
    })
}

/// Normalised 1-D Gaussian of odd length `size`, with sigma derived from
/// the size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) | 1;
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let weights: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    /// A low-contrast left-to-right gradient (values 100..=140).
    fn flat_gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| Luma([100 + (x * 40 / (w - 1)) as u8]))
    }

    fn spread(img: &GrayImage) -> u8 {
        let min = img.pixels().map(|p| p.0[0]).min().unwrap();
        let max = img.pixels().map(|p| p.0[0]).max().unwrap();
        max - min
    }

    #[test]
    fn clahe_stretches_low_contrast() {
        let img = flat_gradient(512, 256);
        let out = clahe(&img, 40.0, 8);
        assert_eq!(out.dimensions(), img.dimensions());
        assert!(spread(&out) > 100, "spread {} from {}", spread(&out), spread(&img));
    }

    #[test]
    fn clahe_keeps_flat_page_flat_at_any_size() {
        // Sizes that do not divide by the grid used to give the last tile
        // row/column a different curve, turning a flat page into a ramp.
        for (w, h, v) in [(100, 60, 128u8), (37, 23, 200), (513, 255, 64)] {
            let img = GrayImage::from_pixel(w, h, Luma([v]));
            let out = clahe(&img, 2.0, 8);
            let first = out.get_pixel(0, 0).0[0];
            assert!(
                out.pixels().all(|p| p.0[0] == first),
                "{w}x{h} value {v} came out uneven"
            );
            assert_eq!(out.get_pixel(w - 1, h / 2).0[0], first);
        }
    }

    #[test]
    fn reflect_101_mirrors_without_repeating_the_edge() {
        let mirrored: Vec<u32> = (0..9).map(|i| reflect_101(i, 4)).collect();
        assert_eq!(mirrored, [0, 1, 2, 3, 2, 1, 0, 1, 2]);
        assert_eq!(reflect_101(5, 1), 0);
    }

    #[test]
    fn clahe_handles_images_smaller_than_grid() {
        let img = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 40 + y * 10) as u8]));
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn neighbour_tiles_clamp_at_edges() {
        assert_eq!(neighbour_tiles(0, 10, 4), (0, 0, 0.0));
        assert_eq!(neighbour_tiles(39, 10, 4), (3, 3, 0.0));
        let (t0, t1, w) = neighbour_tiles(15, 10, 4);
        assert_eq!((t0, t1), (1, 2));
        assert!((w - 0.05).abs() < 1e-5);
    }

    #[test]
    fn clahe_rgb_keeps_neutral_pixels_neutral() {
        let img = RgbImage::from_fn(64, 64, |x, _| {
            let v = 90 + (x as u8) / 2;
            Rgb([v, v, v])
        });
        let out = clahe_rgb(&img, 2.0, 8);
        for px in out.pixels() {
            let [r, g, b] = px.0;
            assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "tinted pixel {:?}", px.0);
        }
    }

    #[test]
    fn clahe_rgba_keeps_alpha() {
        let img = RgbaImage::from_fn(32, 32, |x, y| Rgba([x as u8 * 4, 80, y as u8 * 4, 77]));
        let out = clahe_rgba(&img, 2.0, 8);
        assert!(out.pixels().all(|p| p.0[3] == 77));
    }

    #[test]
    fn gaussian_kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(11);
        assert_eq!(k.len(), 11);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        for i in 0..5 {
            assert!((k[i] - k[10 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn adaptive_threshold_handles_uneven_lighting() {
        // Background brightens left to right; dark strokes everywhere.
        let mut img = GrayImage::from_fn(120, 40, |x, _| Luma([60 + x as u8]));
        for x in (10..110).step_by(20) {
            for y in 10..30 {
                img.put_pixel(x, y, Luma([20 + x as u8 / 2]));
                img.put_pixel(x + 1, y, Luma([20 + x as u8 / 2]));
            }
        }
        let out = adaptive_threshold_gaussian(&img, 11, 2);
        for x in (10..110).step_by(20) {
            assert_eq!(out.get_pixel(x, 20).0[0], 0, "stroke at x={x} lost");
            assert_eq!(out.get_pixel(x + 6, 20).0[0], 255, "background at x={} dark", x + 6);
        }
    }

    #[test]
    fn adaptive_threshold_is_stable_on_binary_input() {
        let mut img = GrayImage::from_pixel(64, 48, Luma([255u8]));
        for x in 5..60 {
            img.put_pixel(x, 10, Luma([0]));
            img.put_pixel(x, 11, Luma([0]));
        }
        for y in 20..40 {
            img.put_pixel(30, y, Luma([0]));
        }
        let once = adaptive_threshold_gaussian(&img, 11, 2);
        let twice = adaptive_threshold_gaussian(&once, 11, 2);
        assert_eq!(once, img);
        assert_eq!(twice, once);
    }
}
