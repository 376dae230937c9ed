//! Decoding of YOLO-family detector output tensors.
//!
//! Supported output layouts (batch size 1):
//!
//! | Layout          | Shape            | Row content                          |
//! |-----------------|------------------|--------------------------------------|
//! | `ChannelsFirst` | `[1, 4 + nc, N]` | `cx, cy, w, h, class scores...`      |
//! | `ChannelsLast`  | `[1, N, 4 + nc]` | `cx, cy, w, h, class scores...`      |
//! | `Objectness`    | `[1, N, 5 + nc]` | `cx, cy, w, h, obj, class scores...` |
//! | `EndToEnd`      | `[1, N, 6]`      | `x1, y1, x2, y2, score, class`       |
//!
//! When the class count is known from model metadata it decides between
//! ambiguous layouts. Without it, a last dimension of 6 is read as end-to-end
//! output, and otherwise the smaller of the two dimensions holds the channels.

use crate::domain::RawDetection;
use std::fmt;

/// How a detector lays out its output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YoloLayout {
    ChannelsFirst { num_classes: usize },
    ChannelsLast { num_classes: usize },
    Objectness { num_classes: usize },
    /// Boxes are already in corner form and suppressed by the model.
    EndToEnd,
}

impl YoloLayout {
    /// Infers the layout from an output shape.
    ///
    /// # Arguments
    ///
    /// * `shape` - Output tensor shape as reported by the runtime.
    /// * `num_classes` - Class count from metadata, if known.
    pub fn detect(shape: &[i64], num_classes: Option<usize>) -> Result<Self, YoloDecodeError> {
        let [batch, a, b] = shape else {
            return Err(YoloDecodeError::UnsupportedShape(shape.to_vec()));
        };
        if *batch != 1 || *a <= 0 || *b <= 0 {
            return Err(YoloDecodeError::UnsupportedShape(shape.to_vec()));
        }
        let (a, b) = (*a as usize, *b as usize);

        if let Some(nc) = num_classes.filter(|&nc| nc > 0) {
            if b == 4 + nc {
                return Ok(YoloLayout::ChannelsLast { num_classes: nc });
            }
            if a == 4 + nc {
                return Ok(YoloLayout::ChannelsFirst { num_classes: nc });
            }
            if b == 5 + nc {
                return Ok(YoloLayout::Objectness { num_classes: nc });
            }
            if b == 6 {
                return Ok(YoloLayout::EndToEnd);
            }
            return Err(YoloDecodeError::UnsupportedShape(shape.to_vec()));
        }

        if b == 6 {
            return Ok(YoloLayout::EndToEnd);
        }
        if a < b && a > 4 {
            return Ok(YoloLayout::ChannelsFirst { num_classes: a - 4 });
        }
        if b > 4 {
            return Ok(YoloLayout::ChannelsLast { num_classes: b - 4 });
        }
        Err(YoloDecodeError::UnsupportedShape(shape.to_vec()))
    }

    /// Returns true when the model output is already suppressed.
    pub fn is_end_to_end(&self) -> bool {
        matches!(self, YoloLayout::EndToEnd)
    }
}

/// Reasons a detector output cannot be decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum YoloDecodeError {
    UnsupportedShape(Vec<i64>),
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for YoloDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YoloDecodeError::UnsupportedShape(shape) => {
                write!(f, "unsupported detector output shape {:?}", shape)
            }
            YoloDecodeError::LengthMismatch { expected, actual } => write!(
                f,
                "detector output has {} values, shape implies {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for YoloDecodeError {}

/// Decodes raw output into corner-form boxes whose score reaches `confidence_threshold`.
///
/// Boxes stay in the detector's input pixel space. No suppression is applied.
pub fn decode_yolo_output(
    layout: YoloLayout,
    shape: &[i64],
    data: &[f32],
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>, YoloDecodeError> {
    let expected: usize = shape.iter().map(|&d| d.max(0) as usize).product();
    if expected != data.len() {
        return Err(YoloDecodeError::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }

    let mut detections = Vec::new();
    match layout {
        YoloLayout::ChannelsFirst { num_classes } => {
            let n = shape[2] as usize;
            let at = |channel: usize, i: usize| data[channel * n + i];
            for i in 0..n {
                let Some((class_id, score)) = best_class((0..num_classes).map(|c| at(4 + c, i)))
                else {
                    continue;
                };
                if score >= confidence_threshold {
                    let bbox = center_to_corners(at(0, i), at(1, i), at(2, i), at(3, i));
                    detections.push(RawDetection::new(class_id, score, bbox));
                }
            }
        }
        YoloLayout::ChannelsLast { num_classes } => {
            for row in data.chunks_exact(4 + num_classes) {
                let Some((class_id, score)) = best_class(row[4..].iter().copied()) else {
                    continue;
                };
                if score >= confidence_threshold {
                    let bbox = center_to_corners(row[0], row[1], row[2], row[3]);
                    detections.push(RawDetection::new(class_id, score, bbox));
                }
            }
        }
        YoloLayout::Objectness { num_classes } => {
            for row in data.chunks_exact(5 + num_classes) {
                let objectness = row[4];
                if objectness < confidence_threshold {
                    continue;
                }
                let Some((class_id, class_score)) = best_class(row[5..].iter().copied()) else {
                    continue;
                };
                let score = objectness * class_score;
                if score >= confidence_threshold {
                    let bbox = center_to_corners(row[0], row[1], row[2], row[3]);
                    detections.push(RawDetection::new(class_id, score, bbox));
                }
            }
        }
        YoloLayout::EndToEnd => {
            for row in data.chunks_exact(6) {
                let (score, class) = (row[4], row[5]);
                if score >= confidence_threshold && class.is_finite() && class >= 0.0 {
                    let bbox = [row[0], row[1], row[2], row[3]];
                    detections.push(RawDetection::new(class.round() as usize, score, bbox));
                }
            }
        }
    }
    Ok(detections)
}

fn best_class(scores: impl Iterator<Item = f32>) -> Option<(usize, f32)> {
    scores
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn center_to_corners(cx: f32, cy: f32, w: f32, h: f32) -> [f32; 4] {
    [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
}
