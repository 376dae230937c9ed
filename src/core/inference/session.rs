//! Helpers for building ONNX Runtime sessions.

use crate::core::config::{OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::{ServeError, ServeResult};
use ort::logging::LogLevel;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::ValueType;
use std::path::Path;
use tracing::debug;

/// Builds a session for `source_path` with the shared session configuration.
///
/// Failures are reported as `LoadFailed` under `model_name`.
pub fn build_session(
    model_name: &str,
    source_path: &str,
    cfg: &OrtSessionConfig,
) -> ServeResult<Session> {
    let path = Path::new(source_path);
    if !path.is_file() {
        return Err(ServeError::load_failed(
            model_name,
            source_path,
            "model file not found",
            Some("verify the source path points to an existing .onnx file"),
            None,
        ));
    }

    let session = create_session(path, cfg).map_err(|e| {
        ServeError::load_failed(
            model_name,
            source_path,
            "failed to create ONNX session",
            Some("verify the file is a valid ONNX model supported by this runtime"),
            Some(Box::new(e)),
        )
    })?;

    debug!(
        model = model_name,
        inputs = session.inputs.len(),
        outputs = session.outputs.len(),
        "onnx session created"
    );
    Ok(session)
}

fn create_session(path: &Path, cfg: &OrtSessionConfig) -> Result<Session, ort::Error> {
    let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
    let builder = apply_ort_config(builder, cfg)?;
    builder.commit_from_file(path)
}

fn apply_ort_config(
    mut builder: SessionBuilder,
    cfg: &OrtSessionConfig,
) -> Result<SessionBuilder, ort::Error> {
    if let Some(intra) = cfg.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = cfg.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(level) = cfg.optimization_level {
        let mapped = match level {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    Ok(builder)
}

/// Returns the shape of the session's first input. Dynamic dimensions are `-1`.
pub fn primary_input_shape(session: &Session) -> Option<Vec<i64>> {
    let input = session.inputs.first()?;
    match &input.input_type {
        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_load_failed() {
        let err = build_session("det", "/no/such/model.onnx", &OrtSessionConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert!(err.to_string().contains("model file not found"));
        assert!(err.to_string().contains("suggested fix"));
    }

    #[test]
    fn test_garbage_file_is_load_failed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not protobuf").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let err = build_session("det", &path, &OrtSessionConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
    }
}
