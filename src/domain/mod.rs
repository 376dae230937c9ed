//! Domain types for the serving pipeline.
//!
//! This module holds the request parameters, the raw backend outputs, the
//! normalized response shapes, and the normalizer that converts between them.

pub mod detection;
pub mod normalize;
pub mod params;

pub use detection::{Detection, NormalizedOutput, RawDetection, RawOutput};
pub use normalize::Normalizer;
pub use params::InferenceParams;
