//! Per-call inference parameters.
//!
//! Parsing is deliberately permissive: unknown keys are ignored, recognized keys
//! with an unusable value fall back to the default, and thresholds outside
//! `[0, 1]` are clamped. A request never fails because of its parameters.

use crate::core::config::ParameterDefaults;
use crate::core::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const CONFIDENCE_KEYS: [&str; 3] = ["confidenceThreshold", "confidence_threshold", "confidence"];
const IOU_KEYS: [&str; 3] = ["iouThreshold", "iou_threshold", "iou"];

/// Options recognized by the object detection routine.
///
/// Other model types currently take no options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceParams {
    /// Minimum confidence a box needs to be reported. Advisory to the backend.
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed.
    pub iou_threshold: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl From<ParameterDefaults> for InferenceParams {
    fn from(defaults: ParameterDefaults) -> Self {
        Self {
            confidence_threshold: defaults.confidence_threshold,
            iou_threshold: defaults.iou_threshold,
        }
    }
}

impl InferenceParams {
    /// Sets the confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Overrides `self` with any recognized option found in a JSON object.
    ///
    /// Non-object values and unknown keys are ignored.
    pub fn merge_json(mut self, options: &Value) -> Self {
        let Some(map) = options.as_object() else {
            return self;
        };

        if let Some(value) = first_number(map, &CONFIDENCE_KEYS) {
            self.confidence_threshold = value;
        }
        if let Some(value) = first_number(map, &IOU_KEYS) {
            self.iou_threshold = value;
        }
        self
    }

    /// Returns a copy with both thresholds forced into `[0, 1]`.
    ///
    /// Non-finite values are replaced by `fallback`'s value.
    pub fn sanitized(self, fallback: InferenceParams) -> Self {
        Self {
            confidence_threshold: unit_interval(
                "confidenceThreshold",
                self.confidence_threshold,
                fallback.confidence_threshold,
            ),
            iou_threshold: unit_interval("iouThreshold", self.iou_threshold, fallback.iou_threshold),
        }
    }
}

fn first_number(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f32> {
    for key in keys {
        match map.get(*key) {
            Some(Value::Number(n)) => return n.as_f64().map(|v| v as f32),
            Some(Value::Null) | None => continue,
            Some(other) => {
                warn!(parameter = key, value = %other, "ignoring non-numeric parameter");
            }
        }
    }
    None
}

fn unit_interval(name: &str, value: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        warn!(parameter = name, "non-finite threshold replaced by default");
        return fallback;
    }
    if !(0.0..=1.0).contains(&value) {
        warn!(parameter = name, value, "threshold clamped into [0, 1]");
    }
    value.clamp(0.0, 1.0)
}
