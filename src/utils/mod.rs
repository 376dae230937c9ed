//! Utility functions for the serving pipeline.

pub mod image;

pub use image::ImageCodec;
