/// Frame similarity for the change filter
///
/// Consecutive captures of an idle log are near-identical; only frames that
/// score below the configured threshold against their predecessor are sent
/// to recognition.
use image::{GrayImage, Luma, RgbaImage};
use rayon::prelude::*;

/// Similarity score in `0.0..=1.0`, 1.0 meaning identical
pub trait FrameSimilarity {
    fn similarity(&self, other: &Self) -> f32;
}

/// Returns true when `current` should be dispatched
///
/// A frame with no predecessor always counts as changed.
pub fn is_changed<I: FrameSimilarity>(previous: Option<&I>, current: &I, threshold: f32) -> bool {
    match previous {
        None => true,
        Some(prev) => prev.similarity(current) < threshold,
    }
}

impl FrameSimilarity for String {
    fn similarity(&self, other: &Self) -> f32 {
        if self == other {
            1.0
        } else {
            0.0
        }
    }
}

impl FrameSimilarity for RgbaImage {
    fn similarity(&self, other: &Self) -> f32 {
        if self.dimensions() != other.dimensions() {
            return 0.0;
        }
        if self.as_raw() == other.as_raw() {
            return 1.0;
        }
        normalized_cross_correlation(&to_grayscale(self), &to_grayscale(other))
    }
}

/// Fixed-point luma: (77*R + 150*G + 29*B) / 256
fn to_grayscale(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = (77 * pixel[0] as u32 + 150 * pixel[1] as u32 + 29 * pixel[2] as u32) >> 8;
        gray.put_pixel(x, y, Luma([value as u8]));
    }
    gray
}

#[derive(Default, Clone, Copy)]
struct Sums {
    ab: f64,
    aa: f64,
    bb: f64,
    a: f64,
    b: f64,
}

impl Sums {
    fn merge(self, other: Sums) -> Sums {
        Sums {
            ab: self.ab + other.ab,
            aa: self.aa + other.aa,
            bb: self.bb + other.bb,
            a: self.a + other.a,
            b: self.b + other.b,
        }
    }
}

/// Zero-mean normalized cross-correlation of two equally sized images
///
/// Rows are summed in parallel. Flat images have no variance; two flat
/// images of the same value are handled by the exact-equality fast path in
/// the caller, anything else flat scores 0.0.
fn normalized_cross_correlation(a: &GrayImage, b: &GrayImage) -> f32 {
    let width = a.width() as usize;
    let count = a.as_raw().len() as f64;
    if width == 0 || count == 0.0 {
        return 0.0;
    }

    let sums = a
        .as_raw()
        .par_chunks(width)
        .zip(b.as_raw().par_chunks(width))
        .map(|(row_a, row_b)| {
            let mut sums = Sums::default();
            for (&va, &vb) in row_a.iter().zip(row_b) {
                let va = va as f64;
                let vb = vb as f64;
                sums.ab += va * vb;
                sums.aa += va * va;
                sums.bb += vb * vb;
                sums.a += va;
                sums.b += vb;
            }
            sums
        })
        .reduce(Sums::default, Sums::merge);

    let mean_a = sums.a / count;
    let mean_b = sums.b / count;
    let numerator = sums.ab - count * mean_a * mean_b;
    let denom_a = (sums.aa - count * mean_a * mean_a).max(0.0).sqrt();
    let denom_b = (sums.bb - count * mean_b * mean_b).max(0.0).sqrt();
    let denominator = denom_a * denom_b;

    if denominator < 1e-10 {
        return 0.0;
    }

    (numerator / denominator).clamp(0.0, 1.0) as f32
}
