use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Cosine similarity in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Cosine distance in [0, 2]. Lower = more similar.
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        1.0 - self.similarity(other)
    }

    /// Euclidean distance between the L2-normalized embeddings, in [0, 2].
    pub fn euclidean_l2_distance(&self, other: &Embedding) -> f32 {
        let a = l2_normalize(&self.values);
        let b = l2_normalize(&other.values);
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Distance under the given metric.
    pub fn distance(&self, other: &Embedding, metric: DistanceMetric) -> f32 {
        match metric {
            DistanceMetric::Cosine => self.cosine_distance(other),
            DistanceMetric::EuclideanL2 => self.euclidean_l2_distance(other),
        }
    }
}

pub(crate) fn l2_normalize(values: &[f32]) -> Vec<f32> {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| x / norm).collect()
    } else {
        values.to_vec()
    }
}

/// How two embeddings are turned into a dissimilarity score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// `|a/|a| - b/|b||`.
    EuclideanL2,
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean_l2" | "euclidean-l2" | "l2" => Ok(DistanceMetric::EuclideanL2),
            _ => Err(format!("unknown distance metric: {s} (use cosine or euclidean_l2)")),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::EuclideanL2 => write!(f, "euclidean_l2"),
        }
    }
}
