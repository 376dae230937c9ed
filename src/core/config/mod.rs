//! Configuration management for the serving pipeline.
//!
//! This module provides configuration types, validation traits, and utilities
//! for loading a service configuration from disk.

pub mod errors;
pub mod onnx;
pub mod serve;

// Re-export commonly used types
pub use errors::{ConfigError, ConfigValidator};
pub use onnx::{OrtGraphOptimizationLevel, OrtSessionConfig};
pub use serve::{CodecConfig, DetectorConfig, ParameterDefaults, PreloadModel, ServeConfig};
