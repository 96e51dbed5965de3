//! Multilingual XTTS-style voice cloning over an exported ONNX model.
//!
//! The model directory holds `model.onnx` plus a `config.json` describing
//! the token map, the supported languages, and the sampling parameters
//! the model was exported with.

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
pub struct XttsConfig {
    pub audio: AudioConfig,
    pub languages: Vec<String>,
    #[serde(default)]
    pub token_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_temperature() -> f32 {
    0.65
}

fn default_repetition_penalty() -> f32 {
    2.0
}

fn default_speed() -> f32 {
    1.0
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            repetition_penalty: default_repetition_penalty(),
            speed: default_speed(),
        }
    }
}

struct LoadedModel {
    session: Mutex<Session>,
    config: XttsConfig,
}

/// XTTS-style engine with per-job language selection.
pub struct XttsEngine {
    model_dir: PathBuf,
    model: ModelSlot<LoadedModel>,
}

impl XttsEngine {
    pub const DEFAULT_LANGUAGE: &'static str = "en";

    pub fn new(model_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            model: ModelSlot::new(),
        }
    }

    fn language_id(config: &XttsConfig, language: &str) -> Result<i64, WorkerError> {
        config
            .languages
            .iter()
            .position(|l| l == language)
            .map(|i| i as i64)
            .ok_or_else(|| WorkerError::Synthesis(format!("unsupported language '{}'", language)))
    }
}

impl VoiceCloneEngine for XttsEngine {
    fn load(&self) -> Result<(), WorkerError> {
        if self.model.get().is_some() {
            tracing::info!("Model already loaded, skipping");
            return Ok(());
        }

        let model_dir = self.model_dir.clone();
        self.model.get_or_load(|| {
            tracing::info!("Loading XTTS model from {}", model_dir.display());

            let config_path = model_dir.join("config.json");
            let config_file = File::open(&config_path).map_err(|e| {
                WorkerError::ModelLoad(format!("missing config {}: {}", config_path.display(), e))
            })?;
            let config: XttsConfig = serde_json::from_reader(config_file)
                .map_err(|e| WorkerError::ModelLoad(format!("invalid config: {}", e)))?;

            let session = build_session(&model_dir.join("model.onnx"))?;

            tracing::info!(
                "XTTS model loaded ({} languages, {} Hz output)",
                config.languages.len(),
                config.audio.sample_rate
            );

            Ok(LoadedModel {
                session: Mutex::new(session),
                config,
            })
        })?;

        Ok(())
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<(), WorkerError> {
        let model = self
            .model
            .get()
            .ok_or_else(|| WorkerError::Synthesis("model not loaded".to_string()))?;
        let config = &model.config;

        let language = request
            .language
            .as_deref()
            .unwrap_or(Self::DEFAULT_LANGUAGE);
        let language_id = Self::language_id(config, language)?;

        let reference = audio::read_wav(&request.reference)?;
        let token_ids = text_to_ids(&request.text, &config.token_id_map);
        let inference = config.inference.clone().unwrap_or_default();

        tracing::debug!(
            "Running XTTS inference ({} tokens, {} reference samples, language {})",
            token_ids.len(),
            reference.len(),
            language
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

        // language: [1]
        let language_value = Value::from_array((vec![1], vec![language_id])).map_err(|e| {
            WorkerError::Synthesis(format!("failed to create language tensor: {}", e))
        })?;

        // scales: [3] = [temperature, repetition_penalty, speed]
        let scales = Value::from_array((
            vec![3],
            vec![
                inference.temperature,
                inference.repetition_penalty,
                inference.speed,
            ],
        ))
        .map_err(|e| WorkerError::Synthesis(format!("failed to create scales tensor: {}", e)))?;

        let mut session = model.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![tokens, speaker, language_value, scales])
            .map_err(|e| WorkerError::Synthesis(format!("inference failed: {}", e)))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| WorkerError::Synthesis("missing output tensor".to_string()))?;
        let output_view = output.try_extract_tensor::<f32>().map_err(|e| {
            WorkerError::Synthesis(format!("failed to extract output tensor: {}", e))
        })?;
        let samples: Vec<f32> = output_view.1.to_vec();

        audio::write_wav(&request.output, &samples, config.audio.sample_rate)
    }

    fn default_language(&self) -> Option<&str> {
        Some(Self::DEFAULT_LANGUAGE)
    }
}
