//! Face alignment via 4-DOF similarity transform.
//!
//! Warps a detected face onto the canonical 112×112 ArcFace template using the
//! five InsightFace reference landmarks.

use image::{imageops, imageops::FilterType, Rgb, RgbImage};

/// ArcFace reference landmarks for a 112×112 output.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: u32 = 112;

/// Similarity transform `dst = [a -b; b a] * src + [tx; ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Closed-form least-squares estimate from point correspondences.
    ///
    /// Degenerate input (all source points coincide) yields the identity.
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        let n = src.len() as f32;
        let (msx, msy) = src.iter().fold((0.0, 0.0), |(x, y), p| (x + p.0 / n, y + p.1 / n));
        let (mdx, mdy) = dst.iter().fold((0.0, 0.0), |(x, y), p| (x + p.0 / n, y + p.1 / n));

        let mut num_a = 0.0f32;
        let mut num_b = 0.0f32;
        let mut den = 0.0f32;
        for (s, d) in src.iter().zip(dst.iter()) {
            let (sx, sy) = (s.0 - msx, s.1 - msy);
            let (dx, dy) = (d.0 - mdx, d.1 - mdy);
            num_a += sx * dx + sy * dy;
            num_b += sx * dy - sy * dx;
            den += sx * sx + sy * sy;
        }

        if den < 1e-12 {
            return Self { a: 1.0, b: 0.0, tx: 0.0, ty: 0.0 };
        }

        let a = num_a / den;
        let b = num_b / den;
        Self {
            a,
            b,
            tx: mdx - (a * msx - b * msy),
            ty: mdy - (b * msx + a * msy),
        }
    }

    /// Map an output (template) point back into the source image.
    fn invert(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let dx = x - self.tx;
        let dy = y - self.ty;
        Some((
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        ))
    }
}

/// Bilinear sample of one RGB pixel; out-of-bounds reads are black.
fn sample_bilinear(image: &RgbImage, sx: f32, sy: f32) -> Rgb<u8> {
    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;
    let (w, h) = (image.width() as i64, image.height() as i64);

    let fetch = |x: i64, y: i64| -> [f32; 3] {
        if x >= 0 && x < w && y >= 0 && y < h {
            let p = image.get_pixel(x as u32, y as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32]
        } else {
            [0.0; 3]
        }
    };

    let tl = fetch(x0, y0);
    let tr = fetch(x0 + 1, y0);
    let bl = fetch(x0, y0 + 1);
    let br = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = tl[c] * (1.0 - fx) * (1.0 - fy)
            + tr[c] * fx * (1.0 - fy)
            + bl[c] * (1.0 - fx) * fy
            + br[c] * fx * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Align a detected face to a canonical 112×112 RGB crop.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS_112);
    RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |ox, oy| {
        match transform.invert(ox as f32, oy as f32) {
            Some((sx, sy)) => sample_bilinear(image, sx, sy),
            None => Rgb([0, 0, 0]),
        }
    })
}

/// Crop used when no face was detected: the whole image squashed to 112×112.
pub fn whole_image_crop(image: &RgbImage) -> RgbImage {
    imageops::resize(image, ALIGNED_SIZE, ALIGNED_SIZE, FilterType::Triangle)
}
