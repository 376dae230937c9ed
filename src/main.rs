//! Line-oriented JSON driver for the vision service.
//!
//! Reads one request per stdin line and writes one response per stdout line.
//!
//! ```text
//! oar-serve --config serve.json --model det1=models/yolov8n.onnx:yolo
//! {"op": "detect", "modelName": "det1", "image": "<base64>"}
//! ```

use clap::Parser;
use oar_serve::core::config::{ConfigValidator, PreloadModel, ServeConfig};
use oar_serve::core::{ModelType, init_tracing};
use oar_serve::pipeline::VisionService;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for the service driver.
#[derive(Parser)]
#[command(name = "oar-serve")]
#[command(about = "Model registry and inference dispatch over JSON lines")]
struct Args {
    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model to load at startup, as `name=path` or `name=path:type`.
    ///
    /// May be repeated. The type defaults to object detection.
    #[arg(long = "model", value_parser = parse_model_spec)]
    models: Vec<PreloadModel>,

    /// Intra-op thread count for every ONNX Runtime session.
    #[arg(long)]
    intra_threads: Option<usize>,
}

fn parse_model_spec(spec: &str) -> Result<PreloadModel, String> {
    let (name, rest) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected name=path[:type], got '{}'", spec))?;
    if name.trim().is_empty() || rest.trim().is_empty() {
        return Err(format!("expected name=path[:type], got '{}'", spec));
    }

    // A trailing `:type` is only taken when it names a known type, so paths
    // containing colons still work.
    let (source_path, model_type) = match rest.rsplit_once(':') {
        Some((path, suffix)) if !path.is_empty() => match suffix.parse::<ModelType>() {
            Ok(model_type) => (path, model_type),
            Err(_) => (rest, ModelType::default()),
        },
        _ => (rest, ModelType::default()),
    };

    Ok(PreloadModel {
        name: name.trim().to_string(),
        source_path: source_path.to_string(),
        model_type,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServeConfig::from_file(path)?,
        None => ServeConfig::default(),
    };
    config.models.extend(args.models);
    if let Some(threads) = args.intra_threads {
        config.session = config.session.with_intra_threads(threads);
    }
    config.validate()?;

    let service = VisionService::from_config(&config);
    info!(models = service.registry().len(), "service ready");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = service.handle_json(&line);
        match serde_json::to_string(&response) {
            Ok(json) => writeln!(stdout, "{}", json)?,
            Err(e) => error!(error = %e, "failed to serialize response"),
        }
        stdout.flush()?;
    }

    Ok(())
}
