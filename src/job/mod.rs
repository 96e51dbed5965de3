pub mod fetch;

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tempfile::{Builder, TempPath};

use crate::api::{JobInput, JobOutput, JobSuccess};
use crate::error::{error_chain, WorkerError};
use crate::tts::{SynthesisRequest, VoiceCloneEngine};

/// Runs one job at a time: fetch the reference audio, stage scratch
/// files, invoke the engine, and encode the result for transport.
pub struct JobHandler {
    engine: Arc<dyn VoiceCloneEngine>,
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl JobHandler {
    pub fn new(engine: Arc<dyn VoiceCloneEngine>, fetch_timeout: Duration) -> Self {
        Self {
            engine,
            client: reqwest::Client::new(),
            fetch_timeout,
        }
    }

    /// Run a single job to completion. Every failure past validation is
    /// absorbed here and reported in the result payload; a bad job never
    /// takes the worker down.
    pub async fn handle(&self, input: JobInput) -> JobOutput {
        let Some(text) = input.text.filter(|t| !t.is_empty()) else {
            return JobOutput::missing_parameter("text");
        };
        let Some(url) = input.reference_audio_url.filter(|u| !u.is_empty()) else {
            return JobOutput::missing_parameter("reference_audio_url");
        };

        match self.run(&text, &url, input.language.as_deref()).await {
            Ok(success) => JobOutput::Success(success),
            Err(err) => {
                tracing::error!("Job failed: {}", err);
                JobOutput::Error {
                    error: format!("Error during inference: {}", err),
                    traceback: Some(error_chain(&err)),
                }
            }
        }
    }

    async fn run(
        &self,
        text: &str,
        url: &str,
        language: Option<&str>,
    ) -> Result<JobSuccess, WorkerError> {
        let started = Instant::now();
        let text_length = text.chars().count();

        tracing::info!("Generating audio for {} chars of text", text_length);
        let reference = fetch::download_reference(&self.client, url, self.fetch_timeout).await?;

        let scratch = Scratch::stage(&reference)?;
        let result = self.synthesize(text, &scratch, language).await;
        scratch.remove();
        let audio = result?;

        let audio_base64 = STANDARD.encode(&audio);
        let generation_time = started.elapsed().as_secs_f64();
        tracing::info!(
            "Generation complete in {:.2}s ({} bytes)",
            generation_time,
            audio.len()
        );

        // Engines with language selection report the language they used.
        let language = self
            .engine
            .default_language()
            .map(|default| language.unwrap_or(default).to_string());

        Ok(JobSuccess {
            audio_base64,
            generation_time,
            audio_size_bytes: audio.len(),
            text_length,
            language,
        })
    }

    /// Run the blocking synthesis call off the async executor and read
    /// back the produced audio file.
    async fn synthesize(
        &self,
        text: &str,
        scratch: &Scratch,
        language: Option<&str>,
    ) -> Result<Vec<u8>, WorkerError> {
        let engine = Arc::clone(&self.engine);
        let request = SynthesisRequest {
            text: text.to_string(),
            reference: scratch.reference.to_path_buf(),
            output: scratch.output.to_path_buf(),
            language: language.map(str::to_string),
        };

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, WorkerError> {
            engine.synthesize(&request)?;
            Ok(std::fs::read(&request.output)?)
        })
        .await
        .map_err(|e| WorkerError::Synthesis(format!("synthesis task panicked: {}", e)))?
    }
}

/// Per-job scratch files: the fetched reference audio and the path the
/// engine writes its output to. Uniquely named so concurrent jobs never
/// collide; both are deleted when the job ends.
struct Scratch {
    reference: TempPath,
    output: TempPath,
}

impl Scratch {
    fn stage(reference_audio: &[u8]) -> Result<Self, WorkerError> {
        use std::io::Write;

        let mut reference = Builder::new()
            .prefix("reference-")
            .suffix(".wav")
            .tempfile()?;
        reference.write_all(reference_audio)?;

        let output = Builder::new()
            .prefix("generated-")
            .suffix(".wav")
            .tempfile()?;

        Ok(Self {
            reference: reference.into_temp_path(),
            output: output.into_temp_path(),
        })
    }

    /// Delete both files. A failure here is worth a log line, never a job
    /// error.
    fn remove(self) {
        for path in [self.reference, self.output] {
            let name = path.to_path_buf();
            if let Err(err) = path.close() {
                tracing::warn!(
                    "Failed to remove scratch file {}: {}",
                    name.display(),
                    err
                );
            }
        }
    }
}
