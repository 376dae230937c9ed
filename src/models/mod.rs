//! Model backends built on ONNX Runtime.
//!
//! [`OrtModelLoader`] is the default [`crate::core::ModelLoader`]. It builds a
//! [`YoloDetector`] for object detection models and an [`OnnxModel`] for the
//! remaining families.

pub mod detection;
pub mod loader;
pub mod onnx;

pub use detection::YoloDetector;
pub use loader::OrtModelLoader;
pub use onnx::OnnxModel;
