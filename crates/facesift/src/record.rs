use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of checking one candidate image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "Yes")]
    Match,
    #[serde(rename = "No")]
    NoMatch,
    /// No reference comparison produced a usable distance.
    #[serde(rename = "N/A")]
    NotApplicable,
    /// The candidate could not be processed (unreadable, copy failed).
    #[serde(rename = "Failed")]
    Failed,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Match => "Yes",
            Verdict::NoMatch => "No",
            Verdict::NotApplicable => "N/A",
            Verdict::Failed => "Failed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One processed candidate. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub image_path: PathBuf,
    /// Minimum distance over all references; `INFINITY` when none was usable.
    pub distance: f32,
    #[serde(rename = "match")]
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRecord {
    /// Take the minimum of the collected distances and classify it.
    pub fn classify(image_path: &Path, distances: &[f32], threshold: f32) -> Self {
        let min = distances.iter().copied().reduce(f32::min);
        let (distance, verdict) = match min {
            Some(d) if d <= threshold => (d, Verdict::Match),
            Some(d) => (d, Verdict::NoMatch),
            None => (f32::INFINITY, Verdict::NotApplicable),
        };
        Self {
            image_path: image_path.to_path_buf(),
            distance,
            verdict,
            error: None,
        }
    }

    pub fn failed(image_path: &Path, distance: f32, error: impl Into<String>) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            distance,
            verdict: Verdict::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::Match
    }

    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_takes_minimum() {
        let r = ResultRecord::classify(Path::new("/x/a.jpg"), &[0.9, 0.3, 0.7], 0.6);
        assert!((r.distance - 0.3).abs() < 1e-6);
        assert_eq!(r.verdict, Verdict::Match);
        assert_eq!(r.error, None);
    }

    #[test]
    fn test_classify_threshold_inclusive() {
        let r = ResultRecord::classify(Path::new("a.jpg"), &[0.6], 0.6);
        assert_eq!(r.verdict, Verdict::Match);
        let r = ResultRecord::classify(Path::new("a.jpg"), &[0.61], 0.6);
        assert_eq!(r.verdict, Verdict::NoMatch);
    }

    #[test]
    fn test_classify_no_distances() {
        let r = ResultRecord::classify(Path::new("a.jpg"), &[], 0.6);
        assert!(r.distance.is_infinite() && r.distance > 0.0);
        assert_eq!(r.verdict, Verdict::NotApplicable);
        assert_eq!(r.verdict.label(), "N/A");
    }

    #[test]
    fn test_failed_record() {
        let r = ResultRecord::failed(Path::new("a.jpg"), 0.2, "copy failed");
        assert_eq!(r.verdict, Verdict::Failed);
        assert_eq!(r.error.as_deref(), Some("copy failed"));
        assert!(!r.is_match());
    }

    #[test]
    fn test_file_name() {
        let r = ResultRecord::classify(Path::new("/photos/party/b.png"), &[], 0.6);
        assert_eq!(r.file_name(), "b.png");
    }

    #[test]
    fn test_serialized_shape() {
        let hit = ResultRecord::classify(Path::new("a.jpg"), &[0.25], 0.6);
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["match"], "Yes");
        assert_eq!(json["image_path"], "a.jpg");
        assert!(json.get("error").is_none());

        let none = ResultRecord::classify(Path::new("b.jpg"), &[], 0.6);
        let json = serde_json::to_value(&none).unwrap();
        assert!(json["distance"].is_null());
        assert_eq!(json["match"], "N/A");
    }
}
