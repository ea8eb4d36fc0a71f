//! Pairwise face verification.
//!
//! [`FaceVerifier`] answers "how far apart are the faces in these two images".
//! [`OnnxVerifier`] implements it with the SCRFD detector and the ArcFace
//! recognizer, caching reference embeddings per image path.

use crate::alignment;
use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, DistanceMetric, Embedding};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Distance at or below which two faces count as the same person.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Reference embeddings kept before the cache is flushed.
const REFERENCE_CACHE_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("cannot read image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no face detected in {}", .path.display())]
    NoFaceDetected { path: PathBuf },
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Per-call knobs.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Fail with [`VerifyError::NoFaceDetected`] instead of embedding the
    /// whole image when no face is found.
    pub enforce_detection: bool,
    pub metric: DistanceMetric,
    pub threshold: f32,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            enforce_detection: false,
            metric: DistanceMetric::Cosine,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Outcome of comparing two images.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub verified: bool,
    /// `None` when the embeddings could not be compared meaningfully.
    pub distance: Option<f32>,
    pub threshold: f32,
    pub metric: DistanceMetric,
    /// Face used for the first image; `None` means the whole image was used.
    pub reference_face: Option<BoundingBox>,
    pub candidate_face: Option<BoundingBox>,
}

/// Something that can compare the faces in two image files.
pub trait FaceVerifier {
    fn verify(
        &mut self,
        reference: &Path,
        candidate: &Path,
        options: &VerifyOptions,
    ) -> Result<Verification, VerifyError>;
}

/// An embedding together with the face it was taken from.
#[derive(Debug, Clone)]
pub struct FaceEmbedding {
    pub embedding: Embedding,
    pub face: Option<BoundingBox>,
}

/// Compare two embedded images under the given options.
pub fn compare(reference: &FaceEmbedding, candidate: &FaceEmbedding, options: &VerifyOptions) -> Verification {
    let raw = reference.embedding.distance(&candidate.embedding, options.metric);
    let distance = raw.is_finite().then_some(raw);

    Verification {
        verified: distance.is_some_and(|d| d <= options.threshold),
        distance,
        threshold: options.threshold,
        metric: options.metric,
        reference_face: reference.face.clone(),
        candidate_face: candidate.face.clone(),
    }
}

/// Embeddings of reference images, keyed by path and detection mode.
///
/// Candidates are embedded once per run and never enter the cache.
#[derive(Default)]
struct ReferenceCache {
    entries: HashMap<(PathBuf, bool), FaceEmbedding>,
}

impl ReferenceCache {
    fn get(&self, path: &Path, enforce_detection: bool) -> Option<FaceEmbedding> {
        self.entries.get(&(path.to_path_buf(), enforce_detection)).cloned()
    }

    fn insert(&mut self, path: &Path, enforce_detection: bool, embedding: FaceEmbedding) {
        if self.entries.len() >= REFERENCE_CACHE_CAPACITY {
            self.entries.clear();
        }
        self.entries.insert((path.to_path_buf(), enforce_detection), embedding);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// SCRFD + ArcFace verifier.
pub struct OnnxVerifier {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    references: ReferenceCache,
}

impl OnnxVerifier {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, VerifyError> {
        let detector = FaceDetector::load(&model_dir.join(crate::DETECTOR_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(crate::RECOGNIZER_MODEL_FILE))?;
        Ok(Self {
            detector,
            recognizer,
            references: ReferenceCache::default(),
        })
    }

    /// Embed the most confident face in an image (or the whole image when
    /// detection is not enforced and nothing was found).
    pub fn represent(&mut self, path: &Path, enforce_detection: bool) -> Result<FaceEmbedding, VerifyError> {
        let image = image::open(path)
            .map_err(|source| VerifyError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        let faces = self.detector.detect(&image)?;
        let represented = match faces.into_iter().find(|f| f.landmarks.is_some()) {
            Some(face) => {
                tracing::debug!(path = %path.display(), confidence = face.confidence, "face detected");
                FaceEmbedding {
                    embedding: self.recognizer.extract(&image, &face)?,
                    face: Some(face),
                }
            }
            None if enforce_detection => {
                return Err(VerifyError::NoFaceDetected { path: path.to_path_buf() });
            }
            None => {
                tracing::debug!(path = %path.display(), "no face detected; embedding whole image");
                FaceEmbedding {
                    embedding: self.recognizer.embed_crop(&alignment::whole_image_crop(&image))?,
                    face: None,
                }
            }
        };

        Ok(represented)
    }

    /// Like [`represent`](Self::represent), memoised for reference images.
    fn represent_reference(&mut self, path: &Path, enforce_detection: bool) -> Result<FaceEmbedding, VerifyError> {
        if let Some(hit) = self.references.get(path, enforce_detection) {
            return Ok(hit);
        }
        let embedded = self.represent(path, enforce_detection)?;
        self.references.insert(path, enforce_detection, embedded.clone());
        tracing::debug!(path = %path.display(), cached = self.references.len(), "reference embedded");
        Ok(embedded)
    }
}

impl FaceVerifier for OnnxVerifier {
    fn verify(
        &mut self,
        reference: &Path,
        candidate: &Path,
        options: &VerifyOptions,
    ) -> Result<Verification, VerifyError> {
        let reference = self.represent_reference(reference, options.enforce_detection)?;
        let candidate = self.represent(candidate, options.enforce_detection)?;
        Ok(compare(&reference, &candidate, options))
    }
}
