//! # OAR Serve
//!
//! An in-process model registry and inference dispatcher for ONNX vision models.
//!
//! Models are loaded by name and declared type. Requests name a model, carry an
//! encoded image, and are routed by the model's type: object detectors run on
//! ONNX Runtime and return normalized detections, while segmentation and OCR
//! models answer with a pending placeholder.
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, the model registry and backend traits
//! * [`domain`] - Parameters, raw and normalized results, the normalizer
//! * [`models`] - ONNX Runtime backends and the default loader
//! * [`pipeline`] - Dispatcher, service facade and wire types
//! * [`processors`] - Letterboxing, YOLO output decoding and NMS
//! * [`utils`] - Image decoding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_serve::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = VisionService::from_config(&ServeConfig::default());
//! service.load(LoadRequest {
//!     model_name: Some("det1".to_string()),
//!     source_path: Some("models/yolov8n.onnx".to_string()),
//!     model_type: Some("yolo".to_string()),
//! })?;
//!
//! let response = service.handle_json(r#"{"op": "list"}"#);
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_serve::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        ErrorKind, ModelLoader, ModelRegistry, ModelType, ServeConfig, ServeError, ServeResult,
    };
    pub use crate::domain::{Detection, InferenceParams, NormalizedOutput};
    pub use crate::pipeline::{
        ApiRequest, ApiResponse, DetectRequest, ImageRequest, LoadRequest, VisionService,
    };
    pub use crate::utils::ImageCodec;
}
