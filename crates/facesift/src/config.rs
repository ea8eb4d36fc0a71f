use facesift_core::{DistanceMetric, VerifyOptions, DEFAULT_MATCH_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
///
/// Precedence: defaults < TOML file < `FACESIFT_*` environment < CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing `det_10g.onnx` and `w600k_r50.onnx`.
    pub model_dir: PathBuf,
    /// Distance at or below which a candidate is a match.
    pub match_threshold: f32,
    pub distance_metric: DistanceMetric,
    /// Fail a comparison when no face is detected instead of using the whole image.
    pub enforce_detection: bool,
    /// Where matched candidates are copied.
    pub output_dir: PathBuf,
    /// HTML report, overwritten on every run.
    pub report_path: PathBuf,
    pub pdf_path: PathBuf,
    /// Write the PDF automatically at the end of a run.
    pub auto_pdf: bool,
    /// Optional JSON dump of all result records.
    pub results_json: Option<PathBuf>,
    /// Display width the report scales every image to.
    pub report_width: u32,
    /// Images per HTML table row.
    pub images_per_row: usize,
    /// Bounding box of the live-view thumbnails.
    pub thumbnail_size: u32,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: facesift_core::default_model_dir(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            distance_metric: DistanceMetric::Cosine,
            enforce_detection: false,
            output_dir: PathBuf::from("matched_images"),
            report_path: PathBuf::from("face_verification_output.html"),
            pdf_path: PathBuf::from("face_verification_output.pdf"),
            auto_pdf: false,
            results_json: None,
            report_width: 500,
            images_per_row: 1,
            thumbnail_size: 300,
            window_width: 550.0,
            window_height: 500.0,
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then apply `FACESIFT_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides read through `lookup`. Unparseable values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FACESIFT_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACESIFT_MATCH_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.match_threshold = v;
        }
        if let Some(v) = lookup("FACESIFT_DISTANCE_METRIC").and_then(|v| v.parse().ok()) {
            self.distance_metric = v;
        }
        if let Some(v) = lookup("FACESIFT_ENFORCE_DETECTION") {
            self.enforce_detection = v != "0" && !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = lookup("FACESIFT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACESIFT_REPORT_PATH") {
            self.report_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACESIFT_PDF_PATH") {
            self.pdf_path = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_threshold.is_finite() || self.match_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be a non-negative number, got {}",
                self.match_threshold
            )));
        }
        if self.images_per_row == 0 {
            return Err(ConfigError::Invalid("images_per_row must be at least 1".into()));
        }
        if self.report_width == 0 {
            return Err(ConfigError::Invalid("report_width must be at least 1".into()));
        }
        if self.thumbnail_size == 0 {
            return Err(ConfigError::Invalid("thumbnail_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            enforce_detection: self.enforce_detection,
            metric: self.distance_metric,
            threshold: self.match_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!((config.match_threshold - 0.6).abs() < 1e-6);
        assert_eq!(config.report_width, 500);
        assert_eq!(config.images_per_row, 1);
        assert_eq!(config.output_dir, PathBuf::from("matched_images"));
        assert_eq!(config.report_path, PathBuf::from("face_verification_output.html"));
        assert!(!config.enforce_detection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facesift.toml");
        std::fs::write(
            &path,
            "match_threshold = 0.45\ndistance_metric = \"euclidean_l2\"\nimages_per_row = 3\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!((config.match_threshold - 0.45).abs() < 1e-6);
        assert_eq!(config.distance_metric, DistanceMetric::EuclideanL2);
        assert_eq!(config.images_per_row, 3);
        assert_eq!(config.report_width, 500);
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "match_threshold = \"high\"").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = Config::from_file(Path::new("/nonexistent/facesift.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FACESIFT_MATCH_THRESHOLD", "0.3"),
            ("FACESIFT_DISTANCE_METRIC", "l2"),
            ("FACESIFT_ENFORCE_DETECTION", "1"),
            ("FACESIFT_OUTPUT_DIR", "/tmp/hits"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert!((config.match_threshold - 0.3).abs() < 1e-6);
        assert_eq!(config.distance_metric, DistanceMetric::EuclideanL2);
        assert!(config.enforce_detection);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/hits"));
    }

    #[test]
    fn test_unparseable_env_is_ignored() {
        let mut config = Config::default();
        config.apply_env_from(|k| (k == "FACESIFT_MATCH_THRESHOLD").then(|| "abc".to_string()));
        assert!((config.match_threshold - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.images_per_row = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.match_threshold = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verify_options_follow_config() {
        let config = Config { match_threshold: 0.4, enforce_detection: true, ..Config::default() };
        let opts = config.verify_options();
        assert!(opts.enforce_detection);
        assert!((opts.threshold - 0.4).abs() < 1e-6);
    }
}
