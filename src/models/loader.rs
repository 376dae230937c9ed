//! ONNX Runtime model loader.

use crate::core::config::{DetectorConfig, OrtSessionConfig, ServeConfig};
use crate::core::errors::ServeError;
use crate::core::inference::build_session;
use crate::core::registry::ModelType;
use crate::core::traits::{ModelBackend, ModelLoader};
use crate::models::detection::YoloDetector;
use crate::models::onnx::OnnxModel;
use tracing::info;

/// Builds backends from `.onnx` files.
///
/// Object detection models get a [`YoloDetector`]; every other type gets an
/// [`OnnxModel`] that only holds the session.
#[derive(Debug, Clone, Default)]
pub struct OrtModelLoader {
    session: OrtSessionConfig,
    detection: DetectorConfig,
}

impl OrtModelLoader {
    pub fn new(session: OrtSessionConfig, detection: DetectorConfig) -> Self {
        Self { session, detection }
    }

    pub fn from_config(config: &ServeConfig) -> Self {
        Self::new(config.session.clone(), config.detection.clone())
    }
}

impl ModelLoader for OrtModelLoader {
    fn load(
        &self,
        name: &str,
        source_path: &str,
        model_type: ModelType,
    ) -> Result<Box<dyn ModelBackend>, ServeError> {
        let session = build_session(name, source_path, &self.session)?;

        let backend: Box<dyn ModelBackend> = match model_type {
            ModelType::ObjectDetection => {
                let detector = YoloDetector::from_session(session, &self.detection).map_err(|e| {
                    ServeError::load_failed(
                        name,
                        source_path,
                        "model is not a usable object detector",
                        Some("export the detector with a single image input and output"),
                        Some(e),
                    )
                })?;
                Box::new(detector)
            }
            ModelType::Segmentation | ModelType::Ocr | ModelType::Generic => {
                Box::new(OnnxModel::new(session, model_type))
            }
        };

        info!(model = name, backend = %backend.describe(), "onnx backend ready");
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;

    #[test]
    fn test_missing_file_fails_for_every_type() {
        let loader = OrtModelLoader::default();
        for model_type in [
            ModelType::ObjectDetection,
            ModelType::Segmentation,
            ModelType::Ocr,
            ModelType::Generic,
        ] {
            let err = loader
                .load("m", "/no/such/file.onnx", model_type)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::LoadFailed);
        }
    }
}
