//! Deterministic pixel comparison of two captures.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// A pixel counts as changed when its mean channel difference exceeds this.
pub const CHANGED_PIXEL_CUTOFF: u32 = 30;

const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);

const SSIM_WINDOW: usize = 11;
const SSIM_SIGMA: f64 = 1.5;
const SSIM_C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const SSIM_C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Sum of absolute channel differences over `pixels * 3 * 255`.
    pub difference_score: f64,
    pub changed_ratio: f64,
    /// Mean SSIM of the two grayscale captures; 1.0 when identical.
    pub similarity: f64,
    /// `difference_score > threshold`.
    pub significant: bool,
    /// Grayscale of the newer capture with changed pixels painted red.
    pub diff_image: RgbImage,
}

/// Compare an older capture with a newer one.
///
/// When dimensions differ the newer image is resized to the older one's with
/// a triangle filter, so the result depends only on the two inputs.
#[must_use]
pub fn compare_images(before: &DynamicImage, after: &DynamicImage, threshold: f64) -> DiffOutcome {
    let before = before.to_rgb8();
    let (width, height) = before.dimensions();
    if width == 0 || height == 0 {
        return DiffOutcome {
            difference_score: 0.0,
            changed_ratio: 0.0,
            similarity: 1.0,
            significant: false,
            diff_image: RgbImage::new(0, 0),
        };
    }

    let mut after = after.to_rgb8();
    if after.dimensions() != (width, height) {
        after = if after.width() == 0 || after.height() == 0 {
            RgbImage::new(width, height)
        } else {
            imageops::resize(&after, width, height, FilterType::Triangle)
        };
    }

    let mut total: u64 = 0;
    let mut changed: u64 = 0;
    let mut diff_image = RgbImage::new(width, height);

    for (x, y, old) in before.enumerate_pixels() {
        let new = after.get_pixel(x, y);
        let delta: u32 = old
            .0
            .iter()
            .zip(new.0.iter())
            .map(|(a, b)| u32::from(a.abs_diff(*b)))
            .sum();
        total += u64::from(delta);

        let out = if delta > CHANGED_PIXEL_CUTOFF * 3 {
            changed += 1;
            HIGHLIGHT
        } else {
            let gray = luma(new);
            Rgb([gray, gray, gray])
        };
        diff_image.put_pixel(x, y, out);
    }

    let pixels = u64::from(width) * u64::from(height);
    #[allow(clippy::cast_precision_loss)]
    let difference_score = total as f64 / (pixels * 3 * 255) as f64;
    #[allow(clippy::cast_precision_loss)]
    let changed_ratio = changed as f64 / pixels as f64;

    DiffOutcome {
        difference_score,
        changed_ratio,
        similarity: ssim(&before, &after),
        significant: difference_score > threshold,
        diff_image,
    }
}

/// Mean structural similarity over an 11x11 Gaussian window (sigma 1.5),
/// edges reflected without repeating the border pixel.
fn ssim(before: &RgbImage, after: &RgbImage) -> f64 {
    let width = before.width() as usize;
    let height = before.height() as usize;
    let x: Vec<f64> = before.pixels().map(|p| f64::from(luma(p))).collect();
    let y: Vec<f64> = after.pixels().map(|p| f64::from(luma(p))).collect();

    let kernel = gaussian_kernel();
    let smooth = |plane: &[f64]| blur(plane, width, height, &kernel);
    let product =
        |a: &[f64], b: &[f64]| -> Vec<f64> { a.iter().zip(b).map(|(p, q)| p * q).collect() };

    let mu_x = smooth(&x);
    let mu_y = smooth(&y);
    let xx = smooth(&product(&x, &x));
    let yy = smooth(&product(&y, &y));
    let xy = smooth(&product(&x, &y));

    let total: f64 = (0..width * height)
        .map(|i| {
            let (mx, my) = (mu_x[i], mu_y[i]);
            let var_x = xx[i] - mx * mx;
            let var_y = yy[i] - my * my;
            let cov = xy[i] - mx * my;
            ((2.0 * mx * my + SSIM_C1) * (2.0 * cov + SSIM_C2))
                / ((mx * mx + my * my + SSIM_C1) * (var_x + var_y + SSIM_C2))
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let pixels = (width * height) as f64;
    total / pixels
}

#[allow(clippy::cast_precision_loss)]
fn gaussian_kernel() -> [f64; SSIM_WINDOW] {
    let radius = (SSIM_WINDOW / 2) as f64;
    let mut kernel = [0.0; SSIM_WINDOW];
    for (i, weight) in kernel.iter_mut().enumerate() {
        let offset = i as f64 - radius;
        *weight = (-(offset * offset) / (2.0 * SSIM_SIGMA * SSIM_SIGMA)).exp();
    }
    let sum: f64 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// Separable convolution of a row-major plane, same size as the input.
fn blur(plane: &[f64], width: usize, height: usize, kernel: &[f64; SSIM_WINDOW]) -> Vec<f64> {
    let mut rows = vec![0.0; plane.len()];
    for row in 0..height {
        for col in 0..width {
            rows[row * width + col] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * plane[row * width + reflect(col + k, width)])
                .sum();
        }
    }

    let mut out = vec![0.0; plane.len()];
    for row in 0..height {
        for col in 0..width {
            out[row * width + col] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * rows[reflect(row + k, height) * width + col])
                .sum();
        }
    }
    out
}

/// Maps `shifted - radius` into `0..len`, mirroring around the end pixels.
fn reflect(shifted: usize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let radius = SSIM_WINDOW / 2;
    let last = len - 1;
    // Work in a non-negative frame offset by one period of the reflection.
    let period = 2 * last;
    let mut i = (shifted + period * (radius / period + 1) - radius) % period;
    if i > last {
        i = period - i;
    }
    i
}

/// ITU-R BT.601 luma, integer arithmetic.
fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let y = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b) + 500) / 1000;
    u8::try_from(y).unwrap_or(u8::MAX)
}
