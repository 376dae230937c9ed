//! The core module of the serving pipeline.
//!
//! This module contains the fundamental components shared by every request path:
//! - Configuration management
//! - Constants used throughout the crate
//! - Error handling
//! - ONNX Runtime session helpers
//! - The model registry and the backend traits it stores
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod registry;
pub mod traits;

pub use config::{ConfigError, ConfigValidator, ServeConfig};
pub use constants::*;
pub use errors::{BackendError, ErrorKind, ErrorResponse, Operation, ServeError, ServeResult};
pub use registry::{ModelRecord, ModelRegistry, ModelType};
pub use traits::{ModelBackend, ModelLoader};

/// Initializes the tracing subscriber for logging.
///
/// Filtering follows `RUST_LOG`. Output goes to stderr so that stdout stays
/// free for responses.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
