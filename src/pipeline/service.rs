//! The service facade: transport payloads in, response shapes out.
//!
//! Every request runs decode → dispatch → normalize to completion. Images are
//! decoded before the registry is consulted, so a malformed payload is reported
//! as a decode error regardless of the model name.

use super::api::{
    ApiRequest, ApiResponse, DetectRequest, DetectResponse, HealthResponse, ImageRequest,
    ListResponse, LoadRequest, LoadResponse, PendingResponse,
};
use super::dispatcher::{Dispatcher, InferenceRequest};
use crate::core::config::{PreloadModel, ServeConfig};
use crate::core::errors::{ErrorResponse, Operation, ServeError, ServeResult};
use crate::core::registry::{ModelRegistry, ModelType};
use crate::core::traits::ModelLoader;
use crate::domain::{InferenceParams, NormalizedOutput};
use crate::models::OrtModelLoader;
use crate::utils::ImageCodec;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keys that may hold a nested parameter object on a detect request.
const NESTED_OPTION_KEYS: [&str; 2] = ["params", "parameters"];

/// Entry point for all operations.
#[derive(Debug, Clone)]
pub struct VisionService {
    registry: Arc<ModelRegistry>,
    dispatcher: Dispatcher,
    codec: ImageCodec,
    defaults: InferenceParams,
}

impl VisionService {
    /// Creates a service around an existing registry.
    pub fn new(registry: Arc<ModelRegistry>, codec: ImageCodec, defaults: InferenceParams) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&registry)).with_defaults(defaults);
        Self {
            registry,
            dispatcher,
            codec,
            defaults,
        }
    }

    /// Creates a service with the given loader and configuration, then preloads
    /// the configured models.
    pub fn with_loader(loader: Arc<dyn ModelLoader>, config: &ServeConfig) -> Self {
        let service = Self::new(
            Arc::new(ModelRegistry::new(loader)),
            ImageCodec::from_config(&config.codec),
            InferenceParams::from(config.defaults),
        );
        service.preload(&config.models);
        service
    }

    /// Creates a service backed by ONNX Runtime.
    pub fn from_config(config: &ServeConfig) -> Self {
        Self::with_loader(Arc::new(OrtModelLoader::from_config(config)), config)
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Loads each listed model. Failures are logged and skipped.
    ///
    /// Returns the number of models that loaded.
    pub fn preload(&self, models: &[PreloadModel]) -> usize {
        let mut loaded = 0;
        for model in models {
            match self
                .registry
                .load(&model.name, &model.source_path, model.model_type)
            {
                Ok(()) => loaded += 1,
                Err(e) => warn!(model = %model.name, error = %e, "skipping preload"),
            }
        }
        if !models.is_empty() {
            info!(loaded, requested = models.len(), "preload finished");
        }
        loaded
    }

    /// Registers or replaces a model.
    pub fn load(&self, request: LoadRequest) -> ServeResult<LoadResponse> {
        let name = required(request.model_name, "modelName")?;
        let source_path = required(request.source_path, "sourcePath")?;
        let model_type = match request.model_type.as_deref() {
            None => ModelType::default(),
            Some(raw) => raw.parse::<ModelType>().map_err(|reason| {
                ServeError::load_failed(
                    &name,
                    &source_path,
                    reason,
                    Some("use object_detection, segmentation, ocr or generic"),
                    None,
                )
            })?,
        };

        self.registry.load(&name, &source_path, model_type)?;
        Ok(LoadResponse {
            ok: true,
            loaded_models: self.registry.list(),
        })
    }

    pub fn list(&self) -> ListResponse {
        let loaded_models = self.registry.list();
        ListResponse {
            count: loaded_models.len(),
            loaded_models,
        }
    }

    pub fn health(&self) -> HealthResponse {
        let models = self.registry.list();
        HealthResponse {
            status: "healthy".to_string(),
            models_loaded: models.len(),
            models,
        }
    }

    /// Runs object detection.
    pub fn detect(&self, request: DetectRequest) -> ServeResult<DetectResponse> {
        let name = required(request.model_name, "modelName")?;
        let image = self.codec.decode_base64(&required(request.image, "image")?)?;

        let mut params = self.defaults;
        for key in NESTED_OPTION_KEYS {
            if let Some(nested) = request.options.get(key) {
                params = params.merge_json(nested);
            }
        }
        params = params.merge_json(&Value::Object(request.options));

        let output = self.dispatcher.infer(
            &InferenceRequest::new(Operation::Detect, &name, &image).with_params(params),
        )?;
        match output {
            NormalizedOutput::Detections { detections } => {
                debug!(model = %name, count = detections.len(), "detect finished");
                Ok(DetectResponse::from(detections))
            }
            NormalizedOutput::Pending { note } => Err(unexpected_output(&name, &note)),
        }
    }

    /// Runs segmentation.
    pub fn segment(&self, request: ImageRequest) -> ServeResult<PendingResponse> {
        self.run_pending(Operation::Segment, request)
    }

    /// Runs OCR.
    pub fn ocr(&self, request: ImageRequest) -> ServeResult<PendingResponse> {
        self.run_pending(Operation::Ocr, request)
    }

    fn run_pending(
        &self,
        operation: Operation,
        request: ImageRequest,
    ) -> ServeResult<PendingResponse> {
        let name = required(request.model_name, "modelName")?;
        let image = self.codec.decode_base64(&required(request.image, "image")?)?;

        match self
            .dispatcher
            .infer(&InferenceRequest::new(operation, &name, &image))?
        {
            NormalizedOutput::Pending { note } => Ok(PendingResponse::new(note)),
            NormalizedOutput::Detections { .. } => {
                Err(unexpected_output(&name, "detections"))
            }
        }
    }

    /// Runs one request of the JSON interface.
    pub fn handle(&self, request: ApiRequest) -> ApiResponse {
        let result = match request {
            ApiRequest::Load(req) => self.load(req).map(ApiResponse::Load),
            ApiRequest::List => Ok(ApiResponse::List(self.list())),
            ApiRequest::Health => Ok(ApiResponse::Health(self.health())),
            ApiRequest::Detect(req) => self.detect(req).map(ApiResponse::Detect),
            ApiRequest::Segment(req) => self.segment(req).map(ApiResponse::Pending),
            ApiRequest::Ocr(req) => self.ocr(req).map(ApiResponse::Pending),
        };
        result.unwrap_or_else(|e| {
            debug!(kind = %e.kind(), error = %e, "request failed");
            ApiResponse::Error(ErrorResponse::from(&e))
        })
    }

    /// Parses and runs one JSON request line.
    pub fn handle_json(&self, line: &str) -> ApiResponse {
        match serde_json::from_str::<ApiRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => ApiResponse::Error(ErrorResponse::from(&ServeError::invalid_request(
                format!("malformed request: {}", e),
            ))),
        }
    }
}

fn required(value: Option<String>, field: &str) -> ServeResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ServeError::invalid_request(format!(
            "missing required field '{}'",
            field
        ))),
    }
}

fn unexpected_output(model_name: &str, got: &str) -> ServeError {
    ServeError::inference_failed(
        model_name,
        "unexpected output shape",
        format!("dispatcher produced {}", got).into(),
    )
}
