//! YOLO-family object detector on ONNX Runtime.
//!
//! The detector letterboxes the input, runs the session, decodes whichever
//! output layout the model uses, applies class-aware NMS and maps the boxes back
//! to the original image.

use crate::core::config::DetectorConfig;
use crate::core::errors::BackendError;
use crate::core::inference::primary_input_shape;
use crate::core::traits::ModelBackend;
use crate::domain::{InferenceParams, RawOutput};
use crate::processors::{
    Letterbox, YoloLayout, decode_yolo_output, non_max_suppression, to_chw_tensor,
};
use image::RgbImage;
use once_cell::sync::Lazy;
use ort::session::Session;
use ort::value::TensorRef;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

static CLASS_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#)
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

const MAX_CLASS_INDEX: usize = 65_535;

/// Parses a `names` metadata entry such as `{0: 'person', 1: 'bicycle'}`.
///
/// Missing indices are filled with `class_<index>`.
pub fn parse_class_names(raw: &str) -> Vec<String> {
    let mut entries: Vec<(usize, String)> = CLASS_NAME_REGEX
        .captures_iter(raw)
        .filter_map(|caps| {
            let index = caps.get(1)?.as_str().parse::<usize>().ok()?;
            if index > MAX_CLASS_INDEX {
                return None;
            }
            let name = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((index, name))
        })
        .collect();
    entries.sort_by_key(|(index, _)| *index);

    let Some(&(max_index, _)) = entries.last() else {
        return Vec::new();
    };
    let mut names: Vec<String> = (0..=max_index).map(|i| format!("class_{i}")).collect();
    for (index, name) in entries {
        names[index] = name;
    }
    names
}

/// An object detector backed by an ONNX Runtime session.
pub struct YoloDetector {
    session: Session,
    input_name: String,
    output_name: String,
    letterbox: Letterbox,
    class_names: Arc<[String]>,
    max_detections: usize,
}

impl YoloDetector {
    /// Wraps an existing session.
    ///
    /// The input size comes from the model when it is static, otherwise from
    /// `config.input_size`.
    pub fn from_session(session: Session, config: &DetectorConfig) -> Result<Self, BackendError> {
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or("model declares no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or("model declares no outputs")?;

        let (height, width) = match primary_input_shape(&session).as_deref() {
            Some([_, _, h, w]) if *h > 0 && *w > 0 => (*h as u32, *w as u32),
            _ => (config.input_size, config.input_size),
        };

        let class_names = read_class_names(&session);
        debug!(
            input = %input_name,
            output = %output_name,
            width,
            height,
            classes = class_names.len(),
            "yolo detector prepared"
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            letterbox: Letterbox::new(width, height, config.pad_value),
            class_names: class_names.into(),
            max_detections: config.max_detections,
        })
    }
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("letterbox", &self.letterbox)
            .field("classes", &self.class_names.len())
            .field("max_detections", &self.max_detections)
            .finish()
    }
}

fn read_class_names(session: &Session) -> Vec<String> {
    let raw = match session.metadata().and_then(|meta| meta.custom("names")) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "could not read model metadata");
            return Vec::new();
        }
    };
    parse_class_names(&raw)
}

impl ModelBackend for YoloDetector {
    fn describe(&self) -> String {
        let (width, height) = self.letterbox.target_size();
        format!(
            "yolo detector {}x{}, {} classes",
            width,
            height,
            self.class_names.len()
        )
    }

    fn invoke(
        &mut self,
        image: &RgbImage,
        params: &InferenceParams,
    ) -> Result<RawOutput, BackendError> {
        let (input, transform) = self.letterbox.apply(image);
        let tensor = to_chw_tensor(&input)?;

        let inputs = ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(tensor.view())?];
        let outputs = self.session.run(inputs)?;
        let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        let shape: Vec<i64> = shape.iter().copied().collect();

        let known_classes = (!self.class_names.is_empty()).then_some(self.class_names.len());
        let layout = YoloLayout::detect(&shape, known_classes)?;
        let decoded = decode_yolo_output(layout, &shape, data, params.confidence_threshold)?;

        let mut detections = if layout.is_end_to_end() {
            decoded
        } else {
            non_max_suppression(decoded, params.iou_threshold, self.max_detections)
        };
        detections.truncate(self.max_detections);
        for det in &mut detections {
            det.bbox = transform.to_original(det.bbox);
        }

        Ok(RawOutput::Detections {
            detections,
            class_names: Arc::clone(&self.class_names),
        })
    }
}
