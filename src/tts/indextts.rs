//! IndexTTS-style voice cloning: a checkpoint directory with a
//! `config.yaml` describing the export, weights in the model directory.
//!
//! Unlike the XTTS backend this model carries no language selection; the
//! output language follows the input text and reference audio.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;
use serde::Deserialize;

use super::{audio, build_session, text_to_ids, ModelSlot, SynthesisRequest, VoiceCloneEngine};
use crate::error::WorkerError;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexTtsConfig {
    pub audio: AudioSection,
    pub dataset: DatasetSection,
    pub synthesizer: SynthesizerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSection {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSection {
    /// Token map file, relative to the checkpoint directory.
    pub token_map: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizerSection {
    /// Exported model file, relative to the model directory.
    pub model: String,
}

struct LoadedModel {
    session: Mutex<Session>,
    token_id_map: HashMap<String, Vec<i64>>,
    sample_rate: u32,
}

pub struct IndexTtsEngine {
    model_dir: PathBuf,
    checkpoint_dir: PathBuf,
    model: ModelSlot<LoadedModel>,
}

impl IndexTtsEngine {
    pub fn new(model_dir: &Path, checkpoint_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            checkpoint_dir: checkpoint_dir.to_path_buf(),
            model: ModelSlot::new(),
        }
    }
}

impl VoiceCloneEngine for IndexTtsEngine {
    fn load(&self) -> Result<(), WorkerError> {
        if self.model.get().is_some() {
            tracing::info!("Model already loaded, skipping");
            return Ok(());
        }

        let model_dir = self.model_dir.clone();
        let checkpoint_dir = self.checkpoint_dir.clone();
        self.model.get_or_load(|| {
            tracing::info!(
                "Loading IndexTTS checkpoint from {}",
                checkpoint_dir.display()
            );

            let config_path = checkpoint_dir.join("config.yaml");
            let config_file = File::open(&config_path).map_err(|e| {
                WorkerError::ModelLoad(format!("missing config {}: {}", config_path.display(), e))
            })?;
            let config: IndexTtsConfig = serde_yaml::from_reader(config_file)
                .map_err(|e| WorkerError::ModelLoad(format!("invalid config: {}", e)))?;

            let token_map_path = checkpoint_dir.join(&config.dataset.token_map);
            let token_map_file = File::open(&token_map_path).map_err(|e| {
                WorkerError::ModelLoad(format!(
                    "missing token map {}: {}",
                    token_map_path.display(),
                    e
                ))
            })?;
            let token_id_map: HashMap<String, Vec<i64>> = serde_json::from_reader(token_map_file)
                .map_err(|e| WorkerError::ModelLoad(format!("invalid token map: {}", e)))?;

            let session = build_session(&model_dir.join(&config.synthesizer.model))?;

            tracing::info!(
                "IndexTTS model loaded ({} Hz output)",
                config.audio.sample_rate
            );

            Ok(LoadedModel {
                session: Mutex::new(session),
                token_id_map,
                sample_rate: config.audio.sample_rate,
            })
        })?;

        Ok(())
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<(), WorkerError> {
        let model = self
            .model
            .get()
            .ok_or_else(|| WorkerError::Synthesis("model not loaded".to_string()))?;

        let reference = audio::read_wav(&request.reference)?;
        let token_ids = text_to_ids(&request.text, &model.token_id_map);

        tracing::debug!(
            "Running IndexTTS inference ({} tokens, {} reference samples)",
            token_ids.len(),
            reference.len()
        );

        // tokens: [batch, sequence] = [1, token_count]
        let token_count = token_ids.len();
        let tokens = Value::from_array((vec![1, token_count], token_ids))
            .map_err(|e| WorkerError::Synthesis(format!("failed to create token tensor: {}", e)))?;

        // speaker: [batch, samples] = [1, reference_len]
        let reference_len = reference.len();
        let speaker = Value::from_array((vec![1, reference_len], reference)).map_err(|e| {
            WorkerError::Synthesis(format!("failed to create speaker tensor: {}", e))
        })?;

        let mut session = model.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![tokens, speaker])
            .map_err(|e| WorkerError::Synthesis(format!("inference failed: {}", e)))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| WorkerError::Synthesis("missing output tensor".to_string()))?;
        let output_view = output.try_extract_tensor::<f32>().map_err(|e| {
            WorkerError::Synthesis(format!("failed to extract output tensor: {}", e))
        })?;
        let samples: Vec<f32> = output_view.1.to_vec();

        audio::write_wav(&request.output, &samples, model.sample_rate)
    }
}
