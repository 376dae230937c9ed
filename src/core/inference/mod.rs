//! ONNX Runtime integration.

pub mod session;

pub use session::{build_session, primary_input_shape};
