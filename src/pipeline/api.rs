//! Request and response shapes of the service interface.
//!
//! Field names are camelCase on the wire. The snake_case spellings used by older
//! clients (`model_name`, `source_path`, `confidence`, `iou`) are accepted as
//! aliases. Required fields are `Option`s so that their absence surfaces as an
//! `invalid_request` error rather than a parse failure.

use crate::core::errors::ErrorResponse;
use crate::domain::Detection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Register or replace a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    #[serde(default, alias = "model_name", alias = "name")]
    pub model_name: Option<String>,
    #[serde(default, alias = "source_path", alias = "model_path")]
    pub source_path: Option<String>,
    /// Defaults to object detection when omitted.
    #[serde(default, alias = "model_type")]
    pub model_type: Option<String>,
}

/// Run object detection.
///
/// Any extra top-level keys are kept in `options` and read as detection
/// parameters; unrecognized ones are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default, alias = "model_name")]
    pub model_name: Option<String>,
    /// Base64-encoded image, optionally as a `data:` URL.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Run segmentation or OCR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(default, alias = "model_name")]
    pub model_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One request line of the JSON interface, selected by `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    Load(LoadRequest),
    List,
    Health,
    Detect(DetectRequest),
    Segment(ImageRequest),
    Ocr(ImageRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub ok: bool,
    pub loaded_models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub loaded_models: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: usize,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub detections: Vec<Detection>,
    pub count: usize,
}

impl From<Vec<Detection>> for DetectResponse {
    fn from(detections: Vec<Detection>) -> Self {
        Self {
            count: detections.len(),
            detections,
        }
    }
}

/// Answer for operations that have no backend yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    /// Always `"pending"`.
    pub status: String,
    pub note: String,
}

impl PendingResponse {
    pub fn new(note: impl Into<String>) -> Self {
        Self {
            status: "pending".to_string(),
            note: note.into(),
        }
    }
}

/// Any response of the JSON interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Load(LoadResponse),
    List(ListResponse),
    Health(HealthResponse),
    Detect(DetectResponse),
    Pending(PendingResponse),
    Error(ErrorResponse),
}

impl ApiResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, ApiResponse::Error(_))
    }
}
