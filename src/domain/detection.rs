//! Raw and normalized prediction types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single box as produced by a detection backend, before normalization.
///
/// Coordinates are `[x1, y1, x2, y2]` in the pixel space of the image that was
/// passed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Index into the backend's class names.
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

impl RawDetection {
    pub fn new(class_id: usize, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Output of a model invocation, specific to the model family.
#[derive(Debug, Clone)]
pub enum RawOutput {
    /// Boxes from an object detector, in the detector's own output order.
    Detections {
        detections: Vec<RawDetection>,
        /// Class names indexed by `RawDetection::class_id`.
        class_names: Arc<[String]>,
    },
}

/// A normalized detection as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` with `x1 <= x2` and `y1 <= y2`.
    pub bounding_box: [f64; 4],
}

/// The fixed set of response shapes the pipeline produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedOutput {
    /// Detections in the model's native order.
    Detections { detections: Vec<Detection> },
    /// Placeholder for operation types that have no backend yet.
    Pending { note: String },
}

impl NormalizedOutput {
    /// Creates a pending placeholder with the given note.
    pub fn pending(note: impl Into<String>) -> Self {
        Self::Pending { note: note.into() }
    }

    /// Returns true for the pending placeholder.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Returns the detections, or `None` for non-detection outputs.
    pub fn detections(&self) -> Option<&[Detection]> {
        match self {
            Self::Detections { detections } => Some(detections),
            Self::Pending { .. } => None,
        }
    }
}
