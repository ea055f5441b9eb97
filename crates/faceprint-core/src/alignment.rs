//! Face alignment via 4-DOF similarity transform.
//!
//! Maps five observed landmarks onto canonical reference positions with a
//! least-squares similarity transform (uniform scale, rotation, translation),
//! then resamples the source into a fixed-size canonical-pose crop.

use crate::image::ImageBuffer;
use crate::types::FacialLandmarks;
use thiserror::Error;

/// Canonical five-point template for a 112×112 crop
/// (left eye, right eye, nose, left mouth, right mouth).
pub const CANONICAL_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

const CANONICAL_BASE_SIZE: f32 = 112.0;

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("expected exactly 5 landmarks, got {0}")]
    InvalidLandmarks(usize),
    #[error("source image has zero width or height")]
    EmptyImage,
}

/// The canonical template scaled to an arbitrary target size.
pub fn canonical_landmarks(target_width: u32, target_height: u32) -> [(f32, f32); 5] {
    let sx = target_width as f32 / CANONICAL_BASE_SIZE;
    let sy = target_height as f32 / CANONICAL_BASE_SIZE;
    CANONICAL_LANDMARKS_112.map(|(x, y)| (x * sx, y * sy))
}

/// Estimate a 2×3 similarity transform (4-DOF: scale, rotation, translation)
/// from `src` landmarks to `dst` landmarks using least-squares.
///
/// Returns [a, -b, tx, b, a, ty] representing the matrix:
/// ```text
/// | a  -b  tx |
/// | b   a  ty |
/// ```
fn estimate_similarity_transform(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> [f32; 6] {
    // Overdetermined system A * [a, b, tx, ty]^T = B; for each pair
    // (sx, sy) -> (dx, dy):
    //   sx * a - sy * b + tx = dx
    //   sy * a + sx * b + ty = dy
    let mut ata = [0.0f32; 16]; // 4x4, row-major
    let mut atb = [0.0f32; 4];

    for i in 0..5 {
        let (sx, sy) = src[i];
        let (dx, dy) = dst[i];

        let r1 = [sx, -sy, 1.0, 0.0];
        let r2 = [sy, sx, 0.0, 1.0];

        for j in 0..4 {
            for k in 0..4 {
                ata[j * 4 + k] += r1[j] * r1[k] + r2[j] * r2[k];
            }
            atb[j] += r1[j] * dx + r2[j] * dy;
        }
    }

    let x = solve_4x4(&ata, &atb);
    let (a, b, tx, ty) = (x[0], x[1], x[2], x[3]);

    [a, -b, tx, b, a, ty]
}

/// Solve a 4×4 linear system via Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(ata: &[f32; 16], atb: &[f32; 4]) -> [f32; 4] {
    // Augmented matrix [A | b] as 4x5
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        for j in 0..4 {
            m[i][j] = ata[i * 4 + j];
        }
        m[i][4] = atb[i];
    }

    for col in 0..4 {
        let mut max_row = col;
        let mut max_val = m[col][col].abs();
        for row in (col + 1)..4 {
            if m[row][col].abs() > max_val {
                max_val = m[row][col].abs();
                max_row = row;
            }
        }
        m.swap(col, max_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return [1.0, 0.0, 0.0, 0.0]; // degenerate landmarks: identity-ish
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }

    x
}

/// Apply a 2×3 similarity warp, producing an `out_width`×`out_height` buffer
/// with the source's channel count.
///
/// Bilinear interpolation; pixels mapped outside the source read 0 (black).
fn warp_similarity(
    image: &ImageBuffer,
    matrix: &[f32; 6],
    out_width: u32,
    out_height: u32,
) -> ImageBuffer {
    let (src_w, src_h, channels) = image.shape();
    let (a, tx) = (matrix[0], matrix[2]);
    let (b, ty) = (matrix[3], matrix[5]);

    // Invert the 2x2 part: M = [[a, -b], [b, a]], det = a^2 + b^2
    let det = a * a + b * b;
    if det.abs() < 1e-12 {
        return ImageBuffer::zeroed(out_width, out_height, channels);
    }
    let inv_det = 1.0 / det;
    let ia = a * inv_det;
    let ib = b * inv_det;

    let mut output = vec![0u8; (out_width * out_height * channels) as usize];

    for oy in 0..out_height {
        for ox in 0..out_width {
            // Map output pixel back to source: src = M_inv * (dst - t)
            let dx = ox as f32 - tx;
            let dy = oy as f32 - ty;
            let sx = ia * dx + ib * dy;
            let sy = -ib * dx + ia * dy;

            let x0 = sx.floor() as i64;
            let y0 = sy.floor() as i64;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            for c in 0..channels {
                let sample = |x: i64, y: i64| -> f32 {
                    if x >= 0 && x < src_w as i64 && y >= 0 && y < src_h as i64 {
                        image.pixel(x as u32, y as u32, c) as f32
                    } else {
                        0.0
                    }
                };

                let val = sample(x0, y0) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1) * fx * fy;

                output[((oy * out_width + ox) * channels + c) as usize] =
                    val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    // Length matches by construction
    ImageBuffer::from_pixels(out_width, out_height, channels, output)
        .unwrap_or_else(|| ImageBuffer::zeroed(out_width, out_height, channels))
}

/// Align a face to a canonical `target_width`×`target_height` crop.
///
/// Estimates the similarity transform taking the observed landmarks to the
/// scaled canonical template and warps the source through it. The output
/// keeps the source's channel count and is bit-for-bit reproducible for
/// identical inputs.
pub fn crop(
    image: &ImageBuffer,
    landmarks: &FacialLandmarks,
    target_width: u32,
    target_height: u32,
) -> Result<ImageBuffer, AlignError> {
    if image.is_empty() {
        return Err(AlignError::EmptyImage);
    }

    let template = canonical_landmarks(target_width, target_height);
    let matrix = estimate_similarity_transform(landmarks.points(), &template);
    Ok(warp_similarity(image, &matrix, target_width, target_height))
}
