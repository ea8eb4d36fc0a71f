//! SCRFD face detector via ONNX Runtime.
//!
//! Runs the SCRFD model on a letterboxed 640×640 RGB input, decodes the three
//! anchor-free stride heads and removes duplicates with NMS.

use crate::types::BoundingBox;
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download det_10g.onnx from insightface into the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("empty image")]
    EmptyImage,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Scale and padding applied when fitting the image into the square input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
    new_w: u32,
    new_h: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target);
        Self {
            scale,
            pad_x: (target - new_w) / 2,
            pad_y: (target - new_h) / 2,
            new_w,
            new_h,
        }
    }

    /// Map a point in letterboxed input space back to original image space.
    fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Output tensor indices for one stride: (score, bbox, kps).
type StrideOutputIndices = (usize, usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    /// Per-stride output indices for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires 9 outputs (3 strides × score/bbox/kps), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self { session, stride_indices })
    }

    /// Detect faces in an RGB image, sorted by descending confidence.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectorError::EmptyImage);
        }

        let (input, letterbox) = preprocess(image);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut detections = Vec::new();
        for (pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.stride_indices[pos];

            let extract = |idx: usize, what: &str| {
                outputs[idx]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}")))
            };

            let head = StrideHead {
                scores: extract(score_idx, "scores")?,
                bboxes: extract(bbox_idx, "bboxes")?,
                kps: extract(kps_idx, "kps")?,
                stride,
            };
            detections.extend(head.decode(&letterbox, SCRFD_CONFIDENCE_THRESHOLD));
        }

        let mut faces = nms(detections, SCRFD_NMS_THRESHOLD);
        faces.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(faces)
    }
}

/// Letterbox an RGB image into a normalized NCHW tensor.
///
/// Padding stays at 0.0, which is the normalized mean.
fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::fit(image.width(), image.height(), SCRFD_INPUT_SIZE);
    let resized = imageops::resize(image, letterbox.new_w, letterbox.new_h, FilterType::Triangle);

    let size = SCRFD_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = (x + letterbox.pad_x) as usize;
        let ty = (y + letterbox.pad_y) as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = (pixel[c] as f32 - SCRFD_MEAN) / SCRFD_STD;
        }
    }

    (tensor, letterbox)
}

/// Discover output tensor ordering by name.
///
/// Exports that name their heads "score_8", "bbox_16", "kps_32", ... are
/// mapped by name. Anything else uses the standard positional layout:
/// [0-2] scores, [3-5] bboxes, [6-8] kps.
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == target)
    };

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&s| Some((find("score", s)?, find("bbox", s)?, find("kps", s)?)))
        .collect();

    match named {
        Some(v) => {
            tracing::debug!("SCRFD: using name-based output tensor mapping");
            [v[0], v[1], v[2]]
        }
        None => [(0, 3, 6), (1, 4, 7), (2, 5, 8)],
    }
}

/// Raw outputs of one stride level.
struct StrideHead<'a> {
    scores: &'a [f32],
    bboxes: &'a [f32],
    kps: &'a [f32],
    stride: usize,
}

impl StrideHead<'_> {
    fn decode(&self, letterbox: &Letterbox, threshold: f32) -> Vec<BoundingBox> {
        let grid = SCRFD_INPUT_SIZE as usize / self.stride;
        let anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
        let step = self.stride as f32;

        let mut out = Vec::new();
        for idx in 0..anchors {
            let score = self.scores.get(idx).copied().unwrap_or(0.0);
            if score <= threshold {
                continue;
            }
            let Some(offsets) = self.bboxes.get(idx * 4..idx * 4 + 4) else {
                continue;
            };

            let cell = idx / SCRFD_ANCHORS_PER_CELL;
            let anchor_x = (cell % grid) as f32 * step;
            let anchor_y = (cell / grid) as f32 * step;

            let (x1, y1) = letterbox.to_original(anchor_x - offsets[0] * step, anchor_y - offsets[1] * step);
            let (x2, y2) = letterbox.to_original(anchor_x + offsets[2] * step, anchor_y + offsets[3] * step);

            let landmarks = self.kps.get(idx * 10..idx * 10 + 10).map(|k| {
                std::array::from_fn(|i| {
                    letterbox.to_original(anchor_x + k[i * 2] * step, anchor_y + k[i * 2 + 1] * step)
                })
            });

            out.push(BoundingBox {
                x: x1,
                y: y1,
                width: x2 - x1,
                height: y2 - y1,
                confidence: score,
                landmarks,
            });
        }
        out
    }
}

/// Non-Maximum Suppression: keep the strongest of each overlapping group.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(k, &det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let inter_h = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}
