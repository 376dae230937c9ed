//! Routing of inference requests to model backends.

use crate::core::constants::{OCR_PENDING_NOTE, SEGMENTATION_PENDING_NOTE};
use crate::core::errors::{BackendError, Operation, ServeError, ServeResult};
use crate::core::registry::{ModelRecord, ModelRegistry, ModelType};
use crate::domain::{InferenceParams, NormalizedOutput, Normalizer};
use image::RgbImage;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error};

/// One decoded request, ready for dispatch.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    pub operation: Operation,
    pub model_name: &'a str,
    pub image: &'a RgbImage,
    pub params: InferenceParams,
}

impl<'a> InferenceRequest<'a> {
    pub fn new(operation: Operation, model_name: &'a str, image: &'a RgbImage) -> Self {
        Self {
            operation,
            model_name,
            image,
            params: InferenceParams::default(),
        }
    }

    pub fn with_params(mut self, params: InferenceParams) -> Self {
        self.params = params;
        self
    }
}

/// Looks up the model, selects the routine for its declared type, and
/// normalizes the result.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    normalizer: Normalizer,
    defaults: InferenceParams,
}

impl Dispatcher {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            normalizer: Normalizer::new(),
            defaults: InferenceParams::default(),
        }
    }

    /// Sets the values used when a request carries an unusable threshold.
    pub fn with_defaults(mut self, defaults: InferenceParams) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Runs one request.
    ///
    /// # Errors
    ///
    /// * `ModelNotFound` when no model is registered under the name.
    /// * `UnsupportedOperation` when detection targets a model of another type.
    /// * `InferenceFailed` when the backend returns an error or panics.
    pub fn infer(&self, request: &InferenceRequest<'_>) -> ServeResult<NormalizedOutput> {
        let record = self
            .registry
            .get(request.model_name)
            .ok_or_else(|| ServeError::model_not_found(request.model_name))?;

        debug!(
            model = request.model_name,
            model_type = %record.model_type(),
            operation = %request.operation,
            "dispatching request"
        );

        match request.operation {
            Operation::Detect if record.model_type() == ModelType::ObjectDetection => {
                self.run_detection(&record, request)
            }
            Operation::Detect => Err(ServeError::unsupported_operation(
                record.name(),
                record.model_type(),
                request.operation,
            )),
            Operation::Segment => Ok(NormalizedOutput::pending(SEGMENTATION_PENDING_NOTE)),
            Operation::Ocr => Ok(NormalizedOutput::pending(OCR_PENDING_NOTE)),
        }
    }

    fn run_detection(
        &self,
        record: &ModelRecord,
        request: &InferenceRequest<'_>,
    ) -> ServeResult<NormalizedOutput> {
        let params = request.params.sanitized(self.defaults);

        // The guard lives inside the closure so that a panicking backend
        // poisons its own lock.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut backend = record.lock_backend()?;
            Ok::<_, ServeError>(backend.invoke(request.image, &params))
        }));

        let raw = match outcome {
            Ok(Ok(Ok(raw))) => raw,
            Ok(Ok(Err(source))) => {
                error!(model = record.name(), error = %source, "inference failed");
                return Err(ServeError::inference_failed(
                    record.name(),
                    "backend invocation",
                    source,
                ));
            }
            Ok(Err(lock_error)) => {
                error!(model = record.name(), error = %lock_error, "model unavailable");
                return Err(lock_error);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(model = record.name(), panic = %message, "backend panicked");
                let source: BackendError = message.into();
                return Err(ServeError::inference_failed(
                    record.name(),
                    "backend panicked",
                    source,
                ));
            }
        };

        Ok(self.normalizer.normalize(record.name(), raw))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::core::traits::{ModelBackend, ModelLoader};
    use crate::domain::{RawDetection, RawOutput};
    use std::error::Error as _;

    /// Behaviour is selected by the source path.
    #[derive(Debug)]
    struct ScriptedBackend {
        script: String,
    }

    impl ModelBackend for ScriptedBackend {
        fn describe(&self) -> String {
            format!("scripted {}", self.script)
        }

        fn invoke(
            &mut self,
            _image: &RgbImage,
            params: &InferenceParams,
        ) -> Result<RawOutput, BackendError> {
            match self.script.as_str() {
                "fail" => Err("tensor shape mismatch".into()),
                "panic" => panic!("backend exploded"),
                _ => Ok(RawOutput::Detections {
                    detections: vec![
                        RawDetection::new(0, 1.5, [10.0, 10.0, 0.0, 0.0]),
                        RawDetection::new(1, params.confidence_threshold, [0.0, 0.0, 1.0, 1.0]),
                    ],
                    class_names: vec!["person".to_string()].into(),
                }),
            }
        }
    }

    #[derive(Debug)]
    struct ScriptedLoader;

    impl ModelLoader for ScriptedLoader {
        fn load(
            &self,
            _name: &str,
            source_path: &str,
            _model_type: ModelType,
        ) -> Result<Box<dyn ModelBackend>, ServeError> {
            Ok(Box::new(ScriptedBackend {
                script: source_path.to_string(),
            }))
        }
    }

    fn dispatcher() -> Dispatcher {
        let registry = Arc::new(ModelRegistry::new(Arc::new(ScriptedLoader)));
        registry.load("det", "ok", ModelType::ObjectDetection).unwrap();
        registry.load("seg", "ok", ModelType::Segmentation).unwrap();
        registry.load("ocr", "ok", ModelType::Ocr).unwrap();
        registry.load("gen", "ok", ModelType::Generic).unwrap();
        registry.load("broken", "fail", ModelType::ObjectDetection).unwrap();
        registry.load("bomb", "panic", ModelType::ObjectDetection).unwrap();
        Dispatcher::new(registry)
    }

    #[test]
    fn test_unknown_model() {
        let image = RgbImage::new(4, 4);
        let dispatcher = dispatcher();
        for operation in [Operation::Detect, Operation::Segment, Operation::Ocr] {
            let err = dispatcher
                .infer(&InferenceRequest::new(operation, "nope", &image))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ModelNotFound);
        }
    }

    #[test]
    fn test_detection_is_normalized() {
        let image = RgbImage::new(4, 4);
        let params = InferenceParams::default().with_confidence_threshold(0.3);
        let output = dispatcher()
            .infer(&InferenceRequest::new(Operation::Detect, "det", &image).with_params(params))
            .unwrap();

        let detections = output.detections().unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[0].confidence, 1.0);
        assert_eq!(detections[0].bounding_box, [0.0, 0.0, 10.0, 10.0]);
        assert_eq!(detections[1].label, "class_1");
        assert!((detections[1].confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_pending_routes() {
        let image = RgbImage::new(4, 4);
        let dispatcher = dispatcher();

        for name in ["seg", "det", "gen", "ocr"] {
            let seg = dispatcher
                .infer(&InferenceRequest::new(Operation::Segment, name, &image))
                .unwrap();
            assert!(seg.is_pending(), "{name}");
            assert_eq!(seg, NormalizedOutput::pending(SEGMENTATION_PENDING_NOTE));

            let ocr = dispatcher
                .infer(&InferenceRequest::new(Operation::Ocr, name, &image))
                .unwrap();
            assert_eq!(ocr, NormalizedOutput::pending(OCR_PENDING_NOTE));
        }

        // A pending route never touches the backend, even a failing one.
        let output = dispatcher
            .infer(&InferenceRequest::new(Operation::Segment, "bomb", &image))
            .unwrap();
        assert!(output.is_pending());
    }

    #[test]
    fn test_detect_on_other_types_is_unsupported() {
        let image = RgbImage::new(4, 4);
        let dispatcher = dispatcher();
        for name in ["gen", "seg", "ocr"] {
            let err = dispatcher
                .infer(&InferenceRequest::new(Operation::Detect, name, &image))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedOperation, "{name}");
        }
    }

    #[test]
    fn test_backend_error_keeps_source() {
        let image = RgbImage::new(4, 4);
        let err = dispatcher()
            .infer(&InferenceRequest::new(Operation::Detect, "broken", &image))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("tensor shape mismatch".to_string())
        );
    }

    #[test]
    fn test_panic_is_contained() {
        let image = RgbImage::new(4, 4);
        let dispatcher = dispatcher();

        let err = dispatcher
            .infer(&InferenceRequest::new(Operation::Detect, "bomb", &image))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert!(err.source().unwrap().to_string().contains("backend exploded"));

        // The poisoned model keeps failing; other models are unaffected.
        let err = dispatcher
            .infer(&InferenceRequest::new(Operation::Detect, "bomb", &image))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert!(
            dispatcher
                .infer(&InferenceRequest::new(Operation::Detect, "det", &image))
                .is_ok()
        );

        // Reloading clears the failure.
        dispatcher
            .registry()
            .load("bomb", "ok", ModelType::ObjectDetection)
            .unwrap();
        assert!(
            dispatcher
                .infer(&InferenceRequest::new(Operation::Detect, "bomb", &image))
                .is_ok()
        );
    }
}
