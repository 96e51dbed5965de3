use std::time::Duration;

use crate::error::WorkerError;

/// Download the caller-supplied reference audio. The whole body is
/// buffered in memory; a non-success status or any transport failure is
/// a hard error.
pub async fn download_reference(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, WorkerError> {
    tracing::info!("Downloading reference audio from {}", url);

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| WorkerError::Download(e.to_string()))?
        .error_for_status()
        .map_err(|e| WorkerError::Download(e.to_string()))?;

    let body = response
        .bytes()
        .await
        .map_err(|e| WorkerError::Download(e.to_string()))?;

    tracing::info!("Downloaded {} bytes", body.len());
    Ok(body.to_vec())
}
