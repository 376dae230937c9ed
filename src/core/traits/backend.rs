//! Traits at the seam between the registry and concrete model runtimes.
//!
//! The registry and dispatcher only ever see these two traits. The ONNX Runtime
//! implementations live in [`crate::models`]; tests substitute in-memory fakes.

use crate::core::errors::{BackendError, ServeError};
use crate::core::registry::ModelType;
use crate::domain::{InferenceParams, RawOutput};
use image::RgbImage;
use std::fmt::Debug;

/// A loaded, invocable model.
///
/// Invocation takes `&mut self`; the registry guards each backend with its own
/// lock so calls on one model never overlap.
pub trait ModelBackend: Send + Debug {
    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    /// Runs the model on a decoded RGB image.
    ///
    /// # Arguments
    ///
    /// * `image` - The decoded input image.
    /// * `params` - Sanitized per-call options.
    ///
    /// # Returns
    ///
    /// The model-family-specific output, or the runtime's error.
    fn invoke(
        &mut self,
        image: &RgbImage,
        params: &InferenceParams,
    ) -> Result<RawOutput, BackendError>;
}

/// Builds backends from a source path.
pub trait ModelLoader: Send + Sync + Debug {
    /// Loads a model of the declared type.
    ///
    /// Implementations should report failures as [`ServeError::LoadFailed`];
    /// the registry wraps any other error kind into one.
    fn load(
        &self,
        name: &str,
        source_path: &str,
        model_type: ModelType,
    ) -> Result<Box<dyn ModelBackend>, ServeError>;
}
