pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

/// Job envelope delivered by the serving runtime.
#[derive(Debug, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub input: JobInput,
}

/// Per-job input mapping. Every field is optional at the wire level;
/// missing required fields are reported as job errors, not rejections.
#[derive(Debug, Default, Deserialize)]
pub struct JobInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reference_audio_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Job result: the synthesized audio or a structured error. Errors travel
/// in the payload; the transport status stays 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JobOutput {
    Success(JobSuccess),
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct JobSuccess {
    pub audio_base64: String,
    pub generation_time: f64,
    pub audio_size_bytes: usize,
    pub text_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl JobOutput {
    pub fn missing_parameter(name: &str) -> Self {
        JobOutput::Error {
            error: format!("Missing required parameter: {}", name),
            traceback: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
