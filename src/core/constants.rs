//! Constants used throughout the serving pipeline.

/// Default confidence threshold for object detection.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Default IoU threshold used by non-maximum suppression.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Default square input size for detectors whose input shape is dynamic.
pub const DEFAULT_DETECTION_INPUT_SIZE: u32 = 640;

/// Maximum number of detections returned for one image.
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

/// Gray value used to pad letterboxed detector inputs.
pub const DEFAULT_LETTERBOX_PAD_VALUE: u8 = 114;

/// Largest encoded image payload accepted by the codec (32 MiB).
pub const DEFAULT_MAX_ENCODED_BYTES: usize = 32 * 1024 * 1024;

/// Largest width or height accepted by the codec.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Note returned for segmentation requests.
pub const SEGMENTATION_PENDING_NOTE: &str = "Segmentation implementation pending";

/// Note returned for OCR requests.
pub const OCR_PENDING_NOTE: &str = "OCR implementation pending";
