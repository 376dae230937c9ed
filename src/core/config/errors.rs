//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse configuration: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that a resource limit has been exceeded.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// A trait for validating configuration parameters.
///
/// Implementors only provide [`ConfigValidator::validate`]; the helper methods
/// cover the checks shared by several configuration sections.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Validates that a threshold lies in `[0, 1]`.
    ///
    /// # Arguments
    ///
    /// * `field` - The field name, used in the error message.
    /// * `threshold` - The threshold to validate.
    fn validate_unit_interval(&self, field: &str, threshold: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be between 0.0 and 1.0, got {}", field, threshold),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a size is positive and below a limit.
    fn validate_size(&self, field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be greater than 0", field),
            })
        } else if value > max {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!("{} {} exceeds maximum of {}", field, value, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validates thread count.
    fn validate_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        const MAX_REASONABLE_THREADS: usize = 256;
        self.validate_size("thread count", thread_count, MAX_REASONABLE_THREADS)
    }
}
