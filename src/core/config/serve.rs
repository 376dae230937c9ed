//! Top-level service configuration.
//!
//! A [`ServeConfig`] is read once at startup (usually from a JSON file), validated,
//! and then handed to the loader, the codec and the service. Every section has
//! defaults, so an empty JSON object is a valid configuration.

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use crate::core::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DETECTION_INPUT_SIZE, DEFAULT_IOU_THRESHOLD,
    DEFAULT_LETTERBOX_PAD_VALUE, DEFAULT_MAX_DETECTIONS, DEFAULT_MAX_ENCODED_BYTES,
    DEFAULT_MAX_IMAGE_DIMENSION,
};
use crate::core::registry::ModelType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the ONNX object detector backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Square input size used when the model declares dynamic spatial dimensions.
    pub input_size: u32,
    /// Maximum number of boxes kept after NMS.
    pub max_detections: usize,
    /// Gray level used for letterbox padding.
    pub pad_value: u8,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_DETECTION_INPUT_SIZE,
            max_detections: DEFAULT_MAX_DETECTIONS,
            pad_value: DEFAULT_LETTERBOX_PAD_VALUE,
        }
    }
}

/// Default per-call parameters used when a request omits them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterDefaults {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// Limits enforced by the image codec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest accepted payload after transport decoding, in bytes.
    pub max_encoded_bytes: usize,
    /// Largest accepted width or height, in pixels.
    pub max_dimension: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_encoded_bytes: DEFAULT_MAX_ENCODED_BYTES,
            max_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

/// A model to load when the service starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadModel {
    pub name: String,
    pub source_path: String,
    #[serde(default)]
    pub model_type: ModelType,
}

/// Configuration for the whole service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub session: OrtSessionConfig,
    pub detection: DetectorConfig,
    pub defaults: ParameterDefaults,
    pub codec: CodecConfig,
    pub models: Vec<PreloadModel>,
}

impl ServeConfig {
    /// Reads and validates a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: ServeConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigValidator for ServeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threads) = self.session.intra_threads {
            self.validate_thread_count(threads)?;
        }
        if let Some(threads) = self.session.inter_threads {
            self.validate_thread_count(threads)?;
        }

        self.validate_size(
            "detection.input_size",
            self.detection.input_size as usize,
            4096,
        )?;
        self.validate_size(
            "detection.max_detections",
            self.detection.max_detections,
            10_000,
        )?;

        self.validate_unit_interval(
            "defaults.confidence_threshold",
            self.defaults.confidence_threshold,
        )?;
        self.validate_unit_interval("defaults.iou_threshold", self.defaults.iou_threshold)?;

        if self.codec.max_encoded_bytes == 0 || self.codec.max_dimension == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "codec limits must be greater than 0".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() || model.source_path.trim().is_empty() {
                return Err(ConfigError::InvalidConfig {
                    message: "preloaded models need a name and a source_path".to_string(),
                });
            }
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::InvalidConfig {
                    message: format!("model '{}' is listed more than once", model.name),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = ServeConfig::from_json("{}").unwrap();
        assert_eq!(config, ServeConfig::default());
        assert_eq!(config.defaults.confidence_threshold, 0.5);
        assert_eq!(config.defaults.iou_threshold, 0.45);
        assert_eq!(config.detection.input_size, 640);
    }

    #[test]
    fn test_parses_models_and_session() {
        let config = ServeConfig::from_json(
            r#"{
                "session": {"intra_threads": 2, "optimization_level": "level3"},
                "models": [
                    {"name": "det1", "source_path": "models/det1.onnx", "model_type": "yolo"},
                    {"name": "seg", "source_path": "models/seg.onnx", "model_type": "segmentation"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.session.intra_threads, Some(2));
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].model_type, ModelType::ObjectDetection);
        assert_eq!(config.models[1].model_type, ModelType::Segmentation);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = ServeConfig::from_json(r#"{"defaults": {"iou_threshold": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }

    #[test]
    fn test_rejects_duplicate_preloads() {
        let err = ServeConfig::from_json(
            r#"{"models": [
                {"name": "a", "source_path": "x.onnx"},
                {"name": "a", "source_path": "y.onnx"}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"codec": {{"max_dimension": 1024}}}}"#).unwrap();

        let config = ServeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.codec.max_dimension, 1024);
        assert_eq!(config.codec.max_encoded_bytes, DEFAULT_MAX_ENCODED_BYTES);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ServeConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
