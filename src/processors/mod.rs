//! Pre- and post-processing for detector models.
//!
//! # Modules
//!
//! * `letterbox` - Aspect-preserving resize, padding and tensor conversion
//! * `nms` - Class-aware non-maximum suppression
//! * `yolo_decode` - Output layout detection and box decoding for YOLO-family models

pub mod letterbox;
pub mod nms;
pub mod yolo_decode;

pub use letterbox::{Letterbox, LetterboxTransform, to_chw_tensor};
pub use nms::{iou, non_max_suppression};
pub use yolo_decode::{YoloDecodeError, YoloLayout, decode_yolo_output};
