//! Session holder for model families without an inference routine.

use crate::core::errors::BackendError;
use crate::core::inference::primary_input_shape;
use crate::core::registry::ModelType;
use crate::core::traits::ModelBackend;
use crate::domain::{InferenceParams, RawOutput};
use image::RgbImage;
use ort::session::Session;

/// A loaded ONNX model kept resident for a family that has no routine yet.
///
/// Loading validates that the file is a usable ONNX graph. Invocation always
/// fails; segmentation and OCR requests are answered without calling it.
pub struct OnnxModel {
    session: Session,
    model_type: ModelType,
}

impl OnnxModel {
    pub fn new(session: Session, model_type: ModelType) -> Self {
        Self {
            session,
            model_type,
        }
    }
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("model_type", &self.model_type)
            .field("inputs", &self.session.inputs.len())
            .field("outputs", &self.session.outputs.len())
            .finish()
    }
}

impl ModelBackend for OnnxModel {
    fn describe(&self) -> String {
        match primary_input_shape(&self.session) {
            Some(shape) => format!("{} onnx model, input {:?}", self.model_type, shape),
            None => format!("{} onnx model", self.model_type),
        }
    }

    fn invoke(
        &mut self,
        _image: &RgbImage,
        _params: &InferenceParams,
    ) -> Result<RawOutput, BackendError> {
        Err(format!("no inference routine is wired for {} models", self.model_type).into())
    }
}
