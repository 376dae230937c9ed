//! Shared fakes for integration tests.

#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use oar_serve::core::errors::BackendError;
use oar_serve::core::{ModelBackend, ModelLoader, ModelType, ServeError};
use oar_serve::domain::{InferenceParams, RawDetection, RawOutput};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Counters shared between a loader and the backends it creates.
#[derive(Debug, Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub released: AtomicUsize,
    pub invocations: AtomicUsize,
    in_flight: Mutex<HashMap<String, usize>>,
    pub max_same_name_in_flight: AtomicUsize,
    invoking: AtomicUsize,
    /// Most invocations seen running at once, across all backends.
    pub max_invoking: AtomicUsize,
}

/// Backend returning two fixed boxes.
#[derive(Debug)]
pub struct FakeBackend {
    pub source_path: String,
    counters: Arc<Counters>,
}

impl ModelBackend for FakeBackend {
    fn describe(&self) -> String {
        format!("fake backend for {}", self.source_path)
    }

    fn invoke(
        &mut self,
        _image: &RgbImage,
        params: &InferenceParams,
    ) -> Result<RawOutput, BackendError> {
        self.counters.invocations.fetch_add(1, Ordering::SeqCst);
        let running = self.counters.invoking.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_invoking.fetch_max(running, Ordering::SeqCst);
        thread::sleep(Duration::from_micros(200));
        self.counters.invoking.fetch_sub(1, Ordering::SeqCst);

        if self.source_path.contains("broken") {
            return Err("output tensor has unexpected rank".into());
        }
        Ok(RawOutput::Detections {
            detections: vec![
                RawDetection::new(0, 0.9, [1.0, 2.0, 30.0, 40.0]),
                RawDetection::new(1, params.confidence_threshold, [50.0, 60.0, 5.0, 6.0]),
            ],
            class_names: vec!["person".to_string(), "car".to_string()].into(),
        })
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loader that accepts any path ending in `.onnx`, optionally after a delay.
#[derive(Debug, Default)]
pub struct FakeLoader {
    pub counters: Arc<Counters>,
    pub delay: Duration,
}

impl FakeLoader {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            counters: Arc::default(),
            delay,
        }
    }
}

impl ModelLoader for FakeLoader {
    fn load(
        &self,
        name: &str,
        source_path: &str,
        _model_type: ModelType,
    ) -> Result<Box<dyn ModelBackend>, ServeError> {
        let concurrent = {
            let mut in_flight = self.counters.in_flight.lock().unwrap();
            let entry = in_flight.entry(name.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.counters
            .max_same_name_in_flight
            .fetch_max(concurrent, Ordering::SeqCst);

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        {
            let mut in_flight = self.counters.in_flight.lock().unwrap();
            if let Some(entry) = in_flight.get_mut(name) {
                *entry -= 1;
            }
        }

        if !source_path.ends_with(".onnx") {
            return Err(ServeError::load_failed(
                name,
                source_path,
                "unrecognized model format",
                None,
                None,
            ));
        }

        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBackend {
            source_path: source_path.to_string(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub fn png_base64(width: u32, height: u32) -> String {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, image::Rgb([20, 40, 60]))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(out.into_inner())
}
