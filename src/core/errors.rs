//! Error types for the serving pipeline.
//!
//! Every failure a caller can observe is a [`ServeError`]. Each variant maps to a
//! stable, machine-readable [`ErrorKind`] so transports can surface the same
//! `{kind, message}` pair regardless of how they encode it. All errors are
//! request-local: none of them leave the registry in a modified state.

use crate::core::registry::ModelType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error produced inside a model backend.
///
/// Backends may fail for reasons the crate knows nothing about (ONNX Runtime,
/// tensor shape mismatches, custom runtimes), so their errors stay type-erased
/// until the dispatcher wraps them into [`ServeError::InferenceFailed`].
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Convenient result alias for serving operations.
pub type ServeResult<T> = Result<T, ServeError>;

/// The operation a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Object detection.
    Detect,
    /// Image segmentation.
    Segment,
    /// Optical character recognition.
    Ocr,
}

impl Operation {
    /// Returns a human-readable name for the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Detect => "object detection",
            Operation::Segment => "segmentation",
            Operation::Ocr => "ocr",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable error identifiers exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ModelNotFound,
    UnsupportedOperation,
    DecodeError,
    InferenceFailed,
    LoadFailed,
    InvalidRequest,
    ConfigError,
}

impl ErrorKind {
    /// Returns the wire identifier for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::UnsupportedOperation => "unsupported_operation",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::InferenceFailed => "inference_failed",
            ErrorKind::LoadFailed => "load_failed",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::ConfigError => "config_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enum representing the errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServeError {
    /// No model is registered under the requested name.
    #[error("model '{name}' not found")]
    ModelNotFound {
        /// The name that failed to resolve.
        name: String,
    },

    /// The model exists but its declared type cannot serve the operation.
    #[error("model '{model_name}' of type {model_type} does not support {operation}")]
    UnsupportedOperation {
        model_name: String,
        model_type: ModelType,
        operation: Operation,
    },

    /// The image payload could not be decoded.
    #[error("image decode: {message}")]
    Decode {
        /// A message describing what was wrong with the payload.
        message: String,
        /// The underlying decoder error, if any.
        #[source]
        source: Option<BackendError>,
    },

    /// The model backend failed while running.
    #[error("inference failed for model '{model_name}': {context}")]
    InferenceFailed {
        model_name: String,
        /// Where in the invocation the failure happened.
        context: String,
        /// The original backend error, kept for diagnostics.
        #[source]
        source: BackendError,
    },

    /// A model handle could not be constructed.
    #[error("failed to load model '{model_name}' from '{source_path}': {reason}{suggestion}")]
    LoadFailed {
        model_name: String,
        source_path: String,
        reason: String,
        /// Preformatted hint, empty when there is none.
        suggestion: String,
        #[source]
        source: Option<BackendError>,
    },

    /// The request itself was malformed.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// A message describing the invalid request.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },
}

impl ServeError {
    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServeError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            ServeError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            ServeError::Decode { .. } => ErrorKind::DecodeError,
            ServeError::InferenceFailed { .. } => ErrorKind::InferenceFailed,
            ServeError::LoadFailed { .. } => ErrorKind::LoadFailed,
            ServeError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ServeError::Config { .. } => ErrorKind::ConfigError,
        }
    }

    /// Creates a `ModelNotFound` error.
    pub fn model_not_found(name: impl Into<String>) -> Self {
        Self::ModelNotFound { name: name.into() }
    }

    /// Creates an `UnsupportedOperation` error.
    pub fn unsupported_operation(
        model_name: impl Into<String>,
        model_type: ModelType,
        operation: Operation,
    ) -> Self {
        Self::UnsupportedOperation {
            model_name: model_name.into(),
            model_type,
            operation,
        }
    }

    /// Creates a decode error without an underlying cause.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a decode error wrapping the decoder's own error.
    pub fn decode_with_source(
        message: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates an `InferenceFailed` error, retaining the backend's error as the source.
    ///
    /// # Arguments
    ///
    /// * `model_name` - The model whose invocation failed.
    /// * `context` - Which step of the invocation failed.
    /// * `source` - The original backend error.
    pub fn inference_failed(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: BackendError,
    ) -> Self {
        Self::InferenceFailed {
            model_name: model_name.into(),
            context: context.into(),
            source,
        }
    }

    /// Creates a `LoadFailed` error with an optional suggested fix.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Registry name the load was attempted under.
    /// * `source_path` - Where the model was supposed to come from.
    /// * `reason` - Short reason description.
    /// * `suggestion` - Optional suggestion message (without punctuation).
    /// * `source` - Optional underlying error.
    pub fn load_failed(
        model_name: impl Into<String>,
        source_path: impl Into<String>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<BackendError>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::LoadFailed {
            model_name: model_name.into(),
            source_path: source_path.into(),
            reason: reason.into(),
            suggestion,
            source,
        }
    }

    /// Creates an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<crate::core::config::ConfigError> for ServeError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Config {
            message: error.to_string(),
        }
    }
}

/// Wire shape of an error: a stable kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ServeError> for ErrorResponse {
    fn from(error: &ServeError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<ServeError> for ErrorResponse {
    fn from(error: ServeError) -> Self {
        Self::from(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kinds_are_stable_identifiers() {
        let cases = [
            (ServeError::model_not_found("a"), "model_not_found"),
            (
                ServeError::unsupported_operation("a", ModelType::Generic, Operation::Detect),
                "unsupported_operation",
            ),
            (ServeError::decode("bad"), "decode_error"),
            (
                ServeError::inference_failed("a", "forward pass", "boom".into()),
                "inference_failed",
            ),
            (
                ServeError::load_failed("a", "p", "missing", None, None),
                "load_failed",
            ),
            (ServeError::invalid_request("x"), "invalid_request"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.kind().as_str(), expected);
            let json = serde_json::to_value(error.kind()).unwrap();
            assert_eq!(json, serde_json::Value::String(expected.to_string()));
        }
    }

    #[test]
    fn test_inference_failed_keeps_source() {
        let error = ServeError::inference_failed("det1", "forward pass", "tensor mismatch".into());
        assert_eq!(
            error.source().map(|s| s.to_string()).as_deref(),
            Some("tensor mismatch")
        );
    }

    #[test]
    fn test_load_failed_formats_suggestion() {
        let error = ServeError::load_failed(
            "det1",
            "models/det1.onnx",
            "file not found",
            Some("check the path"),
            None,
        );
        assert_eq!(
            error.to_string(),
            "failed to load model 'det1' from 'models/det1.onnx': file not found; suggested fix: check the path"
        );
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse::from(ServeError::model_not_found("missing"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "model_not_found");
        assert_eq!(json["message"], "model 'missing' not found");
    }
}
