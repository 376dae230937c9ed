//! Object detection backends.

pub mod yolo;

pub use yolo::{YoloDetector, parse_class_names};
