//! In-memory model registry.
//!
//! The registry maps unique names to loaded models. `load` is the only mutator:
//! handles are built outside the map lock and swapped in with a single
//! write-locked insert, so readers observe either the old or the new record.
//! Loads for the same name are serialized through a per-name gate; loads for
//! different names run in parallel.

use crate::core::errors::{ServeError, ServeResult};
use crate::core::traits::{ModelBackend, ModelLoader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Declared model family. Fixed at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// YOLO-style object detector.
    #[default]
    #[serde(alias = "yolo", alias = "detection")]
    ObjectDetection,
    Segmentation,
    Ocr,
    /// A model with no dedicated routine.
    Generic,
}

impl ModelType {
    /// Returns the canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::ObjectDetection => "object_detection",
            ModelType::Segmentation => "segmentation",
            ModelType::Ocr => "ocr",
            ModelType::Generic => "generic",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object_detection" | "yolo" | "detection" => Ok(ModelType::ObjectDetection),
            "segmentation" => Ok(ModelType::Segmentation),
            "ocr" => Ok(ModelType::Ocr),
            "generic" => Ok(ModelType::Generic),
            other => Err(format!("unsupported model type '{}'", other)),
        }
    }
}

/// A registered model.
///
/// The backend handle never leaves the crate. It is released when the last
/// `Arc<ModelRecord>` is dropped, which happens once the record has been
/// replaced and every in-flight call holding it has finished.
pub struct ModelRecord {
    name: String,
    model_type: ModelType,
    source_path: String,
    sequence: u64,
    backend: Mutex<Box<dyn ModelBackend>>,
}

impl ModelRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Load sequence number; larger means loaded more recently.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Locks the backend for one invocation.
    ///
    /// A poisoned lock is reported as an error so that a backend which panicked
    /// mid-call is not reused silently.
    pub(crate) fn lock_backend(
        &self,
    ) -> Result<MutexGuard<'_, Box<dyn ModelBackend>>, ServeError> {
        self.backend.lock().map_err(|_| {
            ServeError::inference_failed(
                self.name.clone(),
                "model handle is poisoned by an earlier failure",
                "poisoned model lock".into(),
            )
        })
    }
}

impl fmt::Debug for ModelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRecord")
            .field("name", &self.name)
            .field("model_type", &self.model_type)
            .field("source_path", &self.source_path)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl Drop for ModelRecord {
    fn drop(&mut self) {
        debug!(model = %self.name, sequence = self.sequence, "releasing model handle");
    }
}

/// Thread-safe name → model mapping.
#[derive(Debug)]
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    models: RwLock<HashMap<String, Arc<ModelRecord>>>,
    load_gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    next_sequence: AtomicU64,
}

impl ModelRegistry {
    /// Creates an empty registry that builds handles with `loader`.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: RwLock::new(HashMap::new()),
            load_gates: Mutex::new(HashMap::new()),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Loads a model and registers it under `name`, replacing any prior record.
    ///
    /// On failure the registry is left untouched.
    ///
    /// # Arguments
    ///
    /// * `name` - Registry key. Must not be empty.
    /// * `source_path` - Where the loader reads the model from.
    /// * `model_type` - Declared family; decides the loader and the dispatch route.
    pub fn load(&self, name: &str, source_path: &str, model_type: ModelType) -> ServeResult<()> {
        if name.trim().is_empty() {
            return Err(ServeError::invalid_request("model name must not be empty"));
        }

        let gate = self.gate_for(name);
        let result = {
            let _serialized = gate.lock().unwrap_or_else(PoisonError::into_inner);
            self.load_locked(name, source_path, model_type)
        };
        self.release_gate(name, gate);
        result
    }

    /// Builds and swaps in the record. Callers hold the gate for `name`.
    fn load_locked(&self, name: &str, source_path: &str, model_type: ModelType) -> ServeResult<()> {
        let backend = self.build_backend(name, source_path, model_type)?;
        let description = backend.describe();
        let record = Arc::new(ModelRecord {
            name: name.to_string(),
            model_type,
            source_path: source_path.to_string(),
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            backend: Mutex::new(backend),
        });

        let previous = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), record);

        if let Some(previous) = previous {
            info!(
                model = name,
                model_type = %model_type,
                source = source_path,
                replaced = previous.source_path(),
                backend = %description,
                "model replaced"
            );
        } else {
            info!(
                model = name,
                model_type = %model_type,
                source = source_path,
                backend = %description,
                "model loaded"
            );
        }
        Ok(())
    }

    /// Returns the record registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<ModelRecord>> {
        self.read_models().get(name).cloned()
    }

    /// Returns registered names, oldest successful load first.
    pub fn list(&self) -> Vec<String> {
        let models = self.read_models();
        let mut records: Vec<&Arc<ModelRecord>> = models.values().collect();
        records.sort_by_key(|record| record.sequence);
        records
            .into_iter()
            .map(|record| record.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_models().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_models(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<ModelRecord>>> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut gates = self
            .load_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        gates.entry(name.to_string()).or_default().clone()
    }

    /// Drops the gate for `name` once no other load holds or waits on it.
    fn release_gate(&self, name: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self
            .load_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&gate) == 2 {
            gates.remove(name);
        }
    }

    #[cfg(test)]
    fn pending_gates(&self) -> usize {
        self.load_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn build_backend(
        &self,
        name: &str,
        source_path: &str,
        model_type: ModelType,
    ) -> ServeResult<Box<dyn ModelBackend>> {
        let loaded = catch_unwind(AssertUnwindSafe(|| {
            self.loader.load(name, source_path, model_type)
        }));

        match loaded {
            Ok(Ok(backend)) => Ok(backend),
            Ok(Err(err @ ServeError::LoadFailed { .. })) => {
                error!(model = name, source = source_path, error = %err, "model load failed");
                Err(err)
            }
            Ok(Err(other)) => {
                error!(model = name, source = source_path, error = %other, "model load failed");
                Err(ServeError::load_failed(
                    name,
                    source_path,
                    other.to_string(),
                    None,
                    Some(Box::new(other)),
                ))
            }
            Err(_) => {
                error!(model = name, source = source_path, "model loader panicked");
                Err(ServeError::load_failed(
                    name,
                    source_path,
                    "loader panicked",
                    None,
                    None,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{BackendError, ErrorKind};
    use crate::domain::{InferenceParams, RawOutput};
    use image::RgbImage;
    use std::sync::Weak;

    #[derive(Debug)]
    struct NullBackend;

    impl ModelBackend for NullBackend {
        fn describe(&self) -> String {
            "null".to_string()
        }

        fn invoke(
            &mut self,
            _image: &RgbImage,
            _params: &InferenceParams,
        ) -> Result<RawOutput, BackendError> {
            Ok(RawOutput::Detections {
                detections: Vec::new(),
                class_names: Vec::new().into(),
            })
        }
    }

    /// Accepts any path except ones starting with "missing".
    #[derive(Debug)]
    struct PathLoader;

    impl ModelLoader for PathLoader {
        fn load(
            &self,
            name: &str,
            source_path: &str,
            _model_type: ModelType,
        ) -> Result<Box<dyn ModelBackend>, ServeError> {
            if source_path.starts_with("missing") {
                return Err(ServeError::load_failed(
                    name,
                    source_path,
                    "file not found",
                    Some("check the model path"),
                    None,
                ));
            }
            if source_path.starts_with("weird") {
                return Err(ServeError::invalid_request("not a model"));
            }
            if source_path.starts_with("panic") {
                panic!("loader exploded");
            }
            Ok(Box::new(NullBackend))
        }
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::new(Arc::new(PathLoader))
    }

    #[test]
    fn test_model_type_parsing() {
        assert_eq!("yolo".parse::<ModelType>().unwrap(), ModelType::ObjectDetection);
        assert_eq!("OCR".parse::<ModelType>().unwrap(), ModelType::Ocr);
        assert!("diffusion".parse::<ModelType>().is_err());

        let parsed: ModelType = serde_json::from_str("\"detection\"").unwrap();
        assert_eq!(parsed, ModelType::ObjectDetection);
        assert_eq!(
            serde_json::to_string(&ModelType::ObjectDetection).unwrap(),
            "\"object_detection\""
        );
    }

    #[test]
    fn test_load_then_get() {
        let registry = registry();
        registry
            .load("det1", "models/det1.onnx", ModelType::ObjectDetection)
            .unwrap();

        let record = registry.get("det1").unwrap();
        assert_eq!(record.name(), "det1");
        assert_eq!(record.model_type(), ModelType::ObjectDetection);
        assert_eq!(record.source_path(), "models/det1.onnx");
        assert!(registry.get("other").is_none());
        assert_eq!(registry.list(), vec!["det1".to_string()]);
    }

    #[test]
    fn test_failed_load_leaves_prior_record() {
        let registry = registry();
        registry.load("m", "a.onnx", ModelType::Segmentation).unwrap();

        let err = registry
            .load("m", "missing.onnx", ModelType::ObjectDetection)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);

        let record = registry.get("m").unwrap();
        assert_eq!(record.source_path(), "a.onnx");
        assert_eq!(record.model_type(), ModelType::Segmentation);
    }

    #[test]
    fn test_loader_errors_become_load_failed() {
        let registry = registry();
        let err = registry
            .load("m", "weird.bin", ModelType::Generic)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);

        let err = registry
            .load("m", "panic.onnx", ModelType::Generic)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = registry()
            .load("  ", "a.onnx", ModelType::Generic)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_replacement_moves_name_to_end() {
        let registry = registry();
        registry.load("a", "a.onnx", ModelType::Generic).unwrap();
        registry.load("b", "b.onnx", ModelType::Generic).unwrap();
        registry.load("c", "c.onnx", ModelType::Generic).unwrap();
        registry.load("a", "a2.onnx", ModelType::Ocr).unwrap();

        assert_eq!(registry.list(), vec!["b", "c", "a"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("a").unwrap().source_path(), "a2.onnx");
    }

    #[test]
    fn test_replacement_releases_old_handle() {
        let registry = registry();
        registry.load("a", "a.onnx", ModelType::Generic).unwrap();

        let old: Weak<ModelRecord> = Arc::downgrade(&registry.get("a").unwrap());
        assert!(old.upgrade().is_some());

        registry.load("a", "b.onnx", ModelType::Generic).unwrap();
        assert!(old.upgrade().is_none());
    }

    #[test]
    fn test_load_gates_are_released() {
        let registry = registry();
        for i in 0..50 {
            let name = format!("ghost{}", i);
            assert!(
                registry
                    .load(&name, "missing.onnx", ModelType::Generic)
                    .is_err()
            );
        }
        registry.load("a", "a.onnx", ModelType::Generic).unwrap();
        let _ = registry.load("b", "panic.onnx", ModelType::Generic);

        assert_eq!(registry.pending_gates(), 0);
        assert_eq!(registry.list(), vec!["a"]);
    }

    #[test]
    fn test_in_flight_holder_keeps_old_handle_alive() {
        let registry = registry();
        registry.load("a", "a.onnx", ModelType::Generic).unwrap();
        let held = registry.get("a").unwrap();

        registry.load("a", "b.onnx", ModelType::Generic).unwrap();
        assert_eq!(held.source_path(), "a.onnx");
        assert!(held.lock_backend().is_ok());
        assert_eq!(registry.get("a").unwrap().source_path(), "b.onnx");
    }
}
