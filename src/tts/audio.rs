use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::WorkerError;

/// Read a reference WAV into mono f32 samples in [-1, 1].
pub fn read_wav(path: &Path) -> Result<Vec<f32>, WorkerError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| WorkerError::Synthesis(format!("failed to read reference audio: {}", e)))?;
    let spec = reader.spec();

    let samples: Result<Vec<f32>, _> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect(),
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
    };
    let samples = samples
        .map_err(|e| WorkerError::Synthesis(format!("malformed reference audio: {}", e)))?;

    // Fold interleaved channels down to mono.
    if spec.channels > 1 {
        let channels = spec.channels as usize;
        Ok(samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect())
    } else {
        Ok(samples)
    }
}

/// Write f32 samples as 16-bit mono PCM WAV at the given path.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), WorkerError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .map_err(|e| WorkerError::Synthesis(format!("failed to create WAV writer: {}", e)))?;

    for sample in samples {
        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(scaled)
            .map_err(|e| WorkerError::Synthesis(format!("failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| WorkerError::Synthesis(format!("failed to finalize WAV: {}", e)))?;

    Ok(())
}
