#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("Failed to download reference audio: {0}")]
    Download(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render an error and its source chain as a multi-line report, the
/// worker's stand-in for an exception traceback.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut report = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        report.push_str("\ncaused by: ");
        report.push_str(&cause.to_string());
        source = cause.source();
    }
    report
}
