//! Serverless voice-cloning TTS worker.
//!
//! Accepts single-job payloads (text plus a reference audio URL), runs a
//! pretrained voice-cloning model, and returns the synthesized audio
//! base64-encoded. Two ONNX backends are supported: a multilingual
//! XTTS-style cloner and an IndexTTS-style checkpoint-directory cloner.

pub mod api;
pub mod config;
pub mod error;
pub mod job;
pub mod tts;
