use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::{Array4, ArrayD, CowArray};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::SessionBuilder;
use ort::session::Session;
use tracing::info;

use crate::error::PipelineError;

/// ONNX session factory with a selectable execution provider.
pub struct OnnxModel {
    provider: [ort::execution_providers::ExecutionProviderDispatch; 1],
}

impl OnnxModel {
    pub fn new(cuda: bool) -> Self {
        let provider = if cuda {
            [CUDAExecutionProvider::default().build().error_on_failure()]
        } else {
            [CPUExecutionProvider::default().build()]
        };
        Self { provider }
    }

    pub fn load(&self, model_path: &Path) -> Result<Session> {
        let session = SessionBuilder::new()?
            .with_execution_providers(self.provider.clone())?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ONNX model {}", model_path.display()))?;
        Ok(session)
    }
}

/// The inference call the pipeline depends on: one preprocessed input batch
/// in, one raw output tensor out.
///
/// The session is constructed at startup and injected through this trait, so
/// tests can substitute an engine that never touches a real model.
pub trait InferenceEngine: Send {
    fn infer(&mut self, input: Array4<f32>) -> Result<ArrayD<f32>, PipelineError>;
}

/// Runs inference through an `ort` session.
pub struct OrtEngine {
    session: Session,
}

impl OrtEngine {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl InferenceEngine for OrtEngine {
    fn infer(&mut self, input: Array4<f32>) -> Result<ArrayD<f32>, PipelineError> {
        let input = CowArray::from(input.into_dyn());
        let inputs =
            ort::inputs![input.view()].map_err(|e| PipelineError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        let (_name, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| PipelineError::Inference("model produced no outputs".into()))?;
        let tensor = value
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        Ok(tensor.into_owned())
    }
}

/// Inference engine that replays a fixed output tensor.
///
/// For tests and benchmarks; the input batch is ignored.
pub struct FixedOutputEngine {
    output: ArrayD<f32>,
}

impl FixedOutputEngine {
    pub fn new(output: ArrayD<f32>) -> Self {
        Self { output }
    }
}

impl InferenceEngine for FixedOutputEngine {
    fn infer(&mut self, _input: Array4<f32>) -> Result<ArrayD<f32>, PipelineError> {
        Ok(self.output.clone())
    }
}

/// Resolves the model file, fetching it into the user cache when the local
/// path is missing and a URL was configured.
pub fn resolve_model(path: &str, url: Option<&str>) -> Result<PathBuf> {
    let local = Path::new(path);
    if local.exists() {
        return Ok(local.to_path_buf());
    }
    let Some(url) = url else {
        bail!("model file '{path}' not found and no model URL configured");
    };

    let file_name = local
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model.onnx".to_string());
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yolo-serve");
    fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache directory {}", cache_dir.display()))?;
    let dest = cache_dir.join(file_name);
    if dest.exists() {
        return Ok(dest);
    }

    info!(url, dest = %dest.display(), "fetching model");
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("failed to fetch model from {url}"))?;
    let mut file = fs::File::create(&dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    std::io::copy(&mut response.into_reader(), &mut file)?;
    Ok(dest)
}
