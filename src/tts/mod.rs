pub mod audio;
pub mod indextts;
pub mod xtts;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use crate::config::{Backend, WorkerConfig};
use crate::error::WorkerError;

pub use indextts::IndexTtsEngine;
pub use xtts::XttsEngine;

/// One synthesis call: text in, finished audio file at `output`.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub language: Option<String>,
}

/// Capability surface of a pretrained voice-cloning backend.
///
/// `load` is idempotent and safe to call from concurrent contexts: the
/// first call constructs the model, later calls observe it loaded.
/// `synthesize` blocks until a finished audio file exists at the
/// request's output path.
pub trait VoiceCloneEngine: Send + Sync {
    fn load(&self) -> Result<(), WorkerError>;

    fn synthesize(&self, request: &SynthesisRequest) -> Result<(), WorkerError>;

    /// Language code used when a job does not name one. Engines without
    /// language selection return `None` and jobs report no language.
    fn default_language(&self) -> Option<&str> {
        None
    }
}

/// Construct the configured backend. The returned engine is not loaded
/// yet; the entry point calls `load` before serving.
pub fn create_engine(config: &WorkerConfig) -> Arc<dyn VoiceCloneEngine> {
    match config.backend {
        Backend::Xtts => Arc::new(XttsEngine::new(&config.model_dir)),
        Backend::IndexTts => Arc::new(IndexTtsEngine::new(
            &config.model_dir,
            &config.checkpoint_dir,
        )),
    }
}

/// Process-lifetime slot for a loaded model. The first `get_or_load`
/// constructs; concurrent and later callers observe the stored model.
pub(crate) struct ModelSlot<T> {
    inner: RwLock<Option<Arc<T>>>,
}

impl<T> ModelSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.read().unwrap().clone()
    }

    pub fn get_or_load(
        &self,
        load: impl FnOnce() -> Result<T, WorkerError>,
    ) -> Result<Arc<T>, WorkerError> {
        if let Some(model) = self.inner.read().unwrap().clone() {
            return Ok(model);
        }

        let mut slot = self.inner.write().unwrap();
        // Another caller may have finished loading while we waited.
        if let Some(model) = slot.clone() {
            return Ok(model);
        }

        let model = Arc::new(load()?);
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }
}

/// Build an inference session for an exported model, preferring the CUDA
/// execution provider and falling back to CPU when it is unavailable.
pub(crate) fn build_session(model_path: &Path) -> Result<Session, WorkerError> {
    if !model_path.exists() {
        return Err(WorkerError::ModelLoad(format!(
            "model file not found: {}",
            model_path.display()
        )));
    }

    Session::builder()
        .map_err(|e| WorkerError::ModelLoad(format!("failed to create session builder: {}", e)))?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .map_err(|e| {
            WorkerError::ModelLoad(format!("failed to register execution providers: {}", e))
        })?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| WorkerError::ModelLoad(format!("failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| WorkerError::ModelLoad(format!("failed to set threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| WorkerError::ModelLoad(format!("failed to load model: {}", e)))
}

/// Map text characters to model token ids using the exported token map.
/// Characters the map does not know are skipped.
pub(crate) fn text_to_ids(text: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    let mut ids = Vec::new();

    if let Some(bos) = id_map.get("<bos>") {
        ids.extend(bos);
    }

    for ch in text.chars() {
        if let Some(mapped) = id_map.get(&ch.to_string()) {
            ids.extend(mapped);
        }
    }

    if let Some(eos) = id_map.get("<eos>") {
        ids.extend(eos);
    }

    ids
}
