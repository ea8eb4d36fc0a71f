//! facesift-core — face detection, recognition and pairwise verification.
//!
//! Uses SCRFD for face detection and ArcFace for face recognition,
//! both running via ONNX Runtime for CPU inference.

use std::path::PathBuf;

pub mod alignment;
pub mod detector;
pub mod recognizer;
pub mod types;
pub mod verify;

pub use detector::FaceDetector;
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, DistanceMetric, Embedding};
pub use verify::{FaceVerifier, OnnxVerifier, Verification, VerifyError, VerifyOptions, DEFAULT_MATCH_THRESHOLD};

/// SCRFD detection model file name inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model file name inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

/// Default model directory: `<data dir>/facesift/models`, or `./models`
/// when the platform has no data directory.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("facesift").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}
