//! Result normalization.
//!
//! Converts model-family-specific [`RawOutput`] into the fixed
//! [`NormalizedOutput`] shapes. Order is preserved; values are coerced into
//! their documented ranges rather than rejected.

use super::detection::{Detection, NormalizedOutput, RawDetection, RawOutput};
use tracing::warn;

/// Stateless converter from raw backend output to response shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalizes one raw output.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Used only for log context.
    /// * `raw` - The backend's output.
    pub fn normalize(&self, model_name: &str, raw: RawOutput) -> NormalizedOutput {
        match raw {
            RawOutput::Detections {
                detections,
                class_names,
            } => {
                let total = detections.len();
                let detections: Vec<Detection> = detections
                    .into_iter()
                    .filter_map(|det| self.normalize_detection(&det, &class_names))
                    .collect();
                if detections.len() != total {
                    warn!(
                        model = model_name,
                        dropped = total - detections.len(),
                        "dropped detections with non-finite coordinates"
                    );
                }
                NormalizedOutput::Detections { detections }
            }
        }
    }

    /// Coerces a single raw box. Returns `None` when a coordinate is not finite.
    pub fn normalize_detection(
        &self,
        raw: &RawDetection,
        class_names: &[String],
    ) -> Option<Detection> {
        if raw.bbox.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let [ax, ay, bx, by] = raw.bbox.map(f64::from);
        let label = class_names
            .get(raw.class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", raw.class_id));

        Some(Detection {
            label,
            confidence: coerce_confidence(raw.confidence),
            bounding_box: [ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)],
        })
    }
}

fn coerce_confidence(raw: f32) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    f64::from(raw).clamp(0.0, 1.0)
}
